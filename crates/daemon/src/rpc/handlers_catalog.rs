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

//! Catalog handlers: vehicle browsing.

use rpc_common::{Payload, Response};

use crate::rental::to_record;
use crate::rpc::fields::id_field;
use crate::rpc::message_handler::{HandlerError, RentalMessageHandler};

impl RentalMessageHandler {
    pub(crate) fn get_car(&self, payload: &Payload) -> Result<Response, HandlerError> {
        let id = match id_field(payload, "id") {
            Ok(id) => id,
            Err(msg) => return Ok(Response::rejected(msg)),
        };
        let Some(vehicle) = self.rental.vehicle(id)? else {
            return Ok(Response::not_found(format!(
                "vehicle with id {id} not found"
            )));
        };
        Ok(Response::ok_with(
            format!("viewing vehicle with id {id}"),
            vec![to_record(&vehicle)],
        ))
    }

    pub(crate) fn get_cars(&self, payload: &Payload) -> Result<Response, HandlerError> {
        let category_id = match id_field(payload, "category_id") {
            Ok(id) => id,
            Err(msg) => return Ok(Response::rejected(msg)),
        };
        if self.rental.category(category_id)?.is_none() {
            return Ok(Response::not_found(format!(
                "no category with id {category_id}"
            )));
        }
        let vehicles = self.rental.vehicles_in_category(category_id)?;
        if vehicles.is_empty() {
            return Ok(Response::not_found(format!(
                "no vehicles in category {category_id}"
            )));
        }
        let content = vehicles.iter().map(to_record).collect();
        Ok(Response::ok_with(
            format!("viewing vehicles in category {category_id}"),
            content,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::rental::{InMemoryRentalStore, VehicleSeed};
    use crate::rpc::message_handler::MessageHandler;
    use crate::rpc::testing::{sign_up_payload, test_handler_with};
    use rpc_common::{Operation, Payload, Request, Status};
    use serde_json::json;

    #[test]
    fn catalog_lookups_cover_hits_misses_and_empty_categories() {
        let rental = Arc::new(InMemoryRentalStore::new());
        let suv = rental.add_category("SUV");
        let empty = rental.add_category("cabrio");
        let car = rental.add_vehicle(VehicleSeed {
            brand: "Kia Sportage".into(),
            category_id: suv.id,
            price: 120,
            ..Default::default()
        });

        let handler = test_handler_with(rental);
        let token = handler
            .handle_request(Request::new(Operation::SignUp, sign_up_payload("+1")))
            .token
            .unwrap();

        let mut payload = Payload::new();
        payload.insert("id".into(), json!(car.id));
        let response = handler.handle_request(Request::with_token(
            Operation::GetCar,
            token.clone(),
            payload,
        ));
        assert_eq!(response.status, Status::Ok);
        assert_eq!(response.content[0]["brand"], json!("Kia Sportage"));

        let mut payload = Payload::new();
        payload.insert("id".into(), json!(999));
        let response = handler.handle_request(Request::with_token(
            Operation::GetCar,
            token.clone(),
            payload,
        ));
        assert_eq!(response.status, Status::NotFound);

        let mut payload = Payload::new();
        payload.insert("category_id".into(), json!(suv.id));
        let response = handler.handle_request(Request::with_token(
            Operation::GetCars,
            token.clone(),
            payload,
        ));
        assert_eq!(response.status, Status::Ok);
        assert_eq!(response.content.len(), 1);

        let mut payload = Payload::new();
        payload.insert("category_id".into(), json!(empty.id));
        let response = handler.handle_request(Request::with_token(
            Operation::GetCars,
            token.clone(),
            payload,
        ));
        assert_eq!(response.status, Status::NotFound);

        let mut payload = Payload::new();
        payload.insert("category_id".into(), json!(999));
        let response =
            handler.handle_request(Request::with_token(Operation::GetCars, token, payload));
        assert_eq!(response.status, Status::NotFound);
    }
}
