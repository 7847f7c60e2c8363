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

//! Favorites handlers.

use chrono::Utc;
use serde_json::json;

use rpc_common::{Payload, Record, Response};

use crate::rpc::fields::id_field;
use crate::rpc::message_handler::{AuthedSession, HandlerError, RentalMessageHandler};

impl RentalMessageHandler {
    pub(crate) fn add_favorite(
        &self,
        session: &AuthedSession,
        payload: &Payload,
    ) -> Result<Response, HandlerError> {
        let car_id = match id_field(payload, "car_id") {
            Ok(id) => id,
            Err(msg) => return Ok(Response::rejected(msg)),
        };
        let Some(vehicle) = self.rental.vehicle(car_id)? else {
            return Ok(Response::not_found(format!(
                "vehicle with id {car_id} not found"
            )));
        };
        if self.rental.favorite(session.subject, car_id)?.is_some() {
            return Ok(Response::rejected(format!(
                "vehicle with id {car_id} is already in favorites"
            )));
        }
        self.rental
            .create_favorite(session.subject, car_id, Utc::now().date_naive())?;
        Ok(Response::ok(format!(
            "vehicle added to favorites! vehicle id: {}",
            vehicle.id
        )))
    }

    pub(crate) fn del_favorite(
        &self,
        session: &AuthedSession,
        payload: &Payload,
    ) -> Result<Response, HandlerError> {
        let car_id = match id_field(payload, "car_id") {
            Ok(id) => id,
            Err(msg) => return Ok(Response::rejected(msg)),
        };
        let Some(favorite) = self.rental.favorite(session.subject, car_id)? else {
            return Ok(Response::not_found(format!(
                "vehicle with id {car_id} is not in favorites"
            )));
        };
        self.rental.delete_favorite(favorite.id)?;
        Ok(Response::ok(format!(
            "vehicle with id {car_id} removed from favorites"
        )))
    }

    pub(crate) fn get_favorites(&self, session: &AuthedSession) -> Result<Response, HandlerError> {
        let favorites = self.rental.favorites_for(session.subject)?;
        if favorites.is_empty() {
            return Ok(Response::not_found("your favorites list is empty"));
        }
        let mut content = Vec::with_capacity(favorites.len());
        for favorite in &favorites {
            let label = match self.rental.vehicle(favorite.car_id)? {
                Some(vehicle) => vehicle.label(),
                None => format!("id {}", favorite.car_id),
            };
            let mut record = Record::new();
            record.insert("car".to_string(), json!(label));
            record.insert("car_id".to_string(), json!(favorite.car_id));
            content.push(record);
        }
        Ok(Response::ok_with(
            format!("viewing favorites of client with id {}", session.subject),
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

    fn car_payload(car_id: i64) -> Payload {
        let mut payload = Payload::new();
        payload.insert("car_id".into(), json!(car_id));
        payload
    }

    #[test]
    fn favorites_full_cycle() {
        let rental = Arc::new(InMemoryRentalStore::new());
        let cat = rental.add_category("SUV");
        let car = rental.add_vehicle(VehicleSeed {
            brand: "Kia Sportage".into(),
            category_id: cat.id,
            ..Default::default()
        });
        let handler = test_handler_with(rental);
        let token = handler
            .handle_request(Request::new(Operation::SignUp, sign_up_payload("+1")))
            .token
            .unwrap();

        // Empty list reads as not-found.
        let response = handler.handle_request(Request::with_token(
            Operation::GetFavorites,
            token.clone(),
            Payload::new(),
        ));
        assert_eq!(response.status, Status::NotFound);

        let response = handler.handle_request(Request::with_token(
            Operation::AddFavorite,
            token.clone(),
            car_payload(car.id),
        ));
        assert_eq!(response.status, Status::Ok);

        // Adding twice is a rejection, not a fault.
        let response = handler.handle_request(Request::with_token(
            Operation::AddFavorite,
            token.clone(),
            car_payload(car.id),
        ));
        assert_eq!(response.status, Status::Rejected);

        let response = handler.handle_request(Request::with_token(
            Operation::GetFavorites,
            token.clone(),
            Payload::new(),
        ));
        assert_eq!(response.status, Status::Ok);
        assert_eq!(
            response.content[0]["car"],
            json!(format!("Kia Sportage: id {}", car.id))
        );

        let response = handler.handle_request(Request::with_token(
            Operation::DelFavorite,
            token.clone(),
            car_payload(car.id),
        ));
        assert_eq!(response.status, Status::Ok);

        let response = handler.handle_request(Request::with_token(
            Operation::DelFavorite,
            token.clone(),
            car_payload(car.id),
        ));
        assert_eq!(response.status, Status::NotFound);

        let response = handler.handle_request(Request::with_token(
            Operation::AddFavorite,
            token,
            car_payload(999),
        ));
        assert_eq!(response.status, Status::NotFound);
    }
}
