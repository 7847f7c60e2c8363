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

//! Order handlers: creating and browsing rental contracts.

use serde_json::json;
use tracing::info;

use rpc_common::{Payload, Record, Response};

use crate::rental::{to_record, Contract, NewContract};
use crate::rpc::fields::{date_field, id_field, opt_str_field};
use crate::rpc::message_handler::{AuthedSession, HandlerError, RentalMessageHandler};

const STATUS_ACTIVE: i64 = 0;

impl RentalMessageHandler {
    pub(crate) fn add_order(
        &self,
        session: &AuthedSession,
        payload: &Payload,
    ) -> Result<Response, HandlerError> {
        let parsed = (|| -> Result<(i64, chrono::NaiveDate, chrono::NaiveDate), String> {
            Ok((
                id_field(payload, "car_id")?,
                date_field(payload, "date_start")?,
                date_field(payload, "date_end")?,
            ))
        })();
        let (car_id, date_start, date_end) = match parsed {
            Ok(parsed) => parsed,
            Err(msg) => return Ok(Response::rejected(msg)),
        };

        let Some(vehicle) = self.rental.vehicle(car_id)? else {
            return Ok(Response::not_found(format!(
                "vehicle with id {car_id} not found"
            )));
        };
        if date_end <= date_start {
            return Ok(Response::rejected(
                "rental end date must come after the start date",
            ));
        }

        let days = (date_end - date_start).num_days();
        let cost = days * vehicle.price;
        let commission = round2(vehicle.percent * 0.01 * cost as f64 + vehicle.fixed_rate);

        let contract = self.rental.create_contract(NewContract {
            client_id: session.subject,
            car_id,
            date_start,
            date_end,
            driver: false,
            note: opt_str_field(payload, "note").unwrap_or_default(),
            status: STATUS_ACTIVE,
            commission,
            cost,
        })?;
        info!(
            contract = contract.id,
            client = session.subject,
            cost,
            "order created"
        );
        Ok(Response::ok(format!(
            "order created! order id: {}",
            contract.id
        )))
    }

    pub(crate) fn get_order(
        &self,
        session: &AuthedSession,
        payload: &Payload,
    ) -> Result<Response, HandlerError> {
        let id = match id_field(payload, "id") {
            Ok(id) => id,
            Err(msg) => return Ok(Response::rejected(msg)),
        };
        let Some(contract) = self.rental.contract_for(session.subject, id)? else {
            return Ok(Response::not_found(format!("order with id {id} not found")));
        };
        let record = self.contract_record(&contract)?;
        Ok(Response::ok_with(
            format!("viewing order with id {id}"),
            vec![record],
        ))
    }

    pub(crate) fn get_orders(&self, session: &AuthedSession) -> Result<Response, HandlerError> {
        let contracts = self.rental.contracts_for(session.subject)?;
        if contracts.is_empty() {
            return Ok(Response::not_found("you have no orders"));
        }
        let mut content = Vec::with_capacity(contracts.len());
        for contract in &contracts {
            content.push(self.contract_record(contract)?);
        }
        Ok(Response::ok_with(
            format!("viewing orders of client with id {}", session.subject),
            content,
        ))
    }

    /// A contract record with the referenced vehicle rendered as its display
    /// label.
    fn contract_record(&self, contract: &Contract) -> Result<Record, HandlerError> {
        let mut record = to_record(contract);
        let label = match self.rental.vehicle(contract.car_id)? {
            Some(vehicle) => vehicle.label(),
            // The listing may have been withdrawn since the contract was cut.
            None => format!("id {}", contract.car_id),
        };
        record.insert("car".to_string(), json!(label));
        Ok(record)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
