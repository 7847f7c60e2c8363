// Copyright (C) 2025 the motorpool authors. This program is free software:
// you can redistribute it and/or modify it under the terms of the GNU General
// Public License as published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Payload field extraction helpers. A failed extraction is a business-rule
//! rejection, not a fault; the caller turns the message into a `422`.

use chrono::NaiveDate;
use rpc_common::Payload;

/// Contract dates arrive in day-first order, as the clients have always sent
/// them.
pub(crate) const DATE_FORMAT: &str = "%d-%m-%Y";

pub(crate) fn str_field(payload: &Payload, name: &str) -> Result<String, String> {
    match payload.get(name).and_then(|v| v.as_str()) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(format!("missing or empty field `{name}`")),
    }
}

pub(crate) fn opt_str_field(payload: &Payload, name: &str) -> Option<String> {
    payload
        .get(name)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Integer ids arrive either as JSON numbers or as digit strings typed into a
/// terminal; accept both.
pub(crate) fn id_field(payload: &Payload, name: &str) -> Result<i64, String> {
    let value = payload
        .get(name)
        .ok_or_else(|| format!("missing field `{name}`"))?;
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    if let Some(s) = value.as_str() {
        if let Ok(n) = s.trim().parse::<i64>() {
            return Ok(n);
        }
    }
    Err(format!("field `{name}` is not a valid id"))
}

pub(crate) fn date_field(payload: &Payload, name: &str) -> Result<NaiveDate, String> {
    let raw = str_field(payload, name)?;
    parse_date(&raw).ok_or_else(|| format!("field `{name}` is not a dd-mm-yyyy date"))
}

pub(crate) fn opt_date_field(payload: &Payload, name: &str) -> Result<Option<NaiveDate>, String> {
    match opt_str_field(payload, name) {
        None => Ok(None),
        Some(raw) => parse_date(&raw)
            .map(Some)
            .ok_or_else(|| format!("field `{name}` is not a dd-mm-yyyy date")),
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Payload {
        let mut p = Payload::new();
        p.insert("phone".into(), json!("+1"));
        p.insert("car_id".into(), json!("17"));
        p.insert("category_id".into(), json!(3));
        p.insert("date_start".into(), json!("02-06-2024"));
        p.insert("empty".into(), json!(""));
        p
    }

    #[test]
    fn ids_parse_from_numbers_and_strings() {
        let p = payload();
        assert_eq!(id_field(&p, "car_id").unwrap(), 17);
        assert_eq!(id_field(&p, "category_id").unwrap(), 3);
        assert!(id_field(&p, "phone").is_err());
        assert!(id_field(&p, "nope").is_err());
    }

    #[test]
    fn dates_are_day_first() {
        let p = payload();
        let date = date_field(&p, "date_start").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
        assert!(date_field(&p, "phone").is_err());
    }

    #[test]
    fn empty_strings_do_not_satisfy_required_fields() {
        let p = payload();
        assert!(str_field(&p, "empty").is_err());
        assert_eq!(str_field(&p, "phone").unwrap(), "+1");
    }
}
