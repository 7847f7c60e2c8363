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

//! Shared fixtures for handler-level tests.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use rpc_common::Payload;

use crate::rental::InMemoryRentalStore;
use crate::rpc::message_handler::RentalMessageHandler;
use crate::rpc::session_guard::SessionGuardConfig;
use crate::sessions::InMemorySessionStore;

pub(crate) const TEST_SALT: &str = "salt-of-the-earth";

/// A handler over fresh in-memory stores, with a 60s/30s sliding window.
pub(crate) fn test_handler() -> RentalMessageHandler {
    test_handler_with(Arc::new(InMemoryRentalStore::new()))
}

pub(crate) fn test_handler_with(rental: Arc<InMemoryRentalStore>) -> RentalMessageHandler {
    RentalMessageHandler::new(
        Arc::new(InMemorySessionStore::new()),
        SessionGuardConfig {
            ttl: Duration::from_secs(60),
            ttl_refresh: Duration::from_secs(30),
        },
        rental,
        TEST_SALT.to_string(),
    )
}

/// A complete registration payload for the given phone number.
pub(crate) fn sign_up_payload(phone: &str) -> Payload {
    let mut payload = Payload::new();
    payload.insert("name".into(), json!("Ada"));
    payload.insert("surname".into(), json!("Lovelace"));
    payload.insert("birthday".into(), json!("10-12-1985"));
    payload.insert("phone".into(), json!(phone));
    payload.insert("password".into(), json!("letmein"));
    payload.insert("license_categories".into(), json!("B"));
    payload.insert("license_number".into(), json!("0042"));
    payload
}
