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

//! Account handlers: registration, authentication, profile, logout.

use std::time::SystemTime;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::info;

use rpc_common::{Payload, Response, SessionToken};

use crate::rental::{to_record, NewAccount, ProfileUpdate};
use crate::rpc::fields::{date_field, opt_date_field, opt_str_field, str_field};
use crate::rpc::message_handler::{AuthedSession, HandlerError, RentalMessageHandler};

impl RentalMessageHandler {
    /// Salted digest, as accounts have always stored their passwords.
    pub(crate) fn salted_digest(&self, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        hasher.update(self.password_salt.as_bytes());
        hasher
            .finalize()
            .iter()
            .fold(String::with_capacity(64), |mut out, byte| {
                out.push_str(&format!("{byte:02x}"));
                out
            })
    }

    fn open_session(&self, subject: i64) -> Result<SessionToken, HandlerError> {
        let token = SessionToken::mint();
        self.sessions.insert(&token, subject, SystemTime::now())?;
        Ok(token)
    }

    pub(crate) fn sign_up(&self, payload: &Payload) -> Result<Response, HandlerError> {
        let parsed = (|| -> Result<NewAccount, String> {
            Ok(NewAccount {
                name: str_field(payload, "name")?,
                surname: str_field(payload, "surname")?,
                birthday: date_field(payload, "birthday")?,
                phone: str_field(payload, "phone")?,
                password: str_field(payload, "password")?,
                email: opt_str_field(payload, "email"),
                license_categories: str_field(payload, "license_categories")?,
                license_number: str_field(payload, "license_number")?,
            })
        })();
        let mut new = match parsed {
            Ok(new) => new,
            Err(msg) => return Ok(Response::rejected(msg)),
        };

        if self.rental.account_by_phone(&new.phone)?.is_some() {
            return Ok(Response::rejected(
                "an account with this phone is already registered",
            ));
        }

        new.password = self.salted_digest(&new.password);
        let account = self.rental.create_account(new)?;
        let token = self.open_session(account.id)?;
        info!(account = account.id, "account registered");
        Ok(
            Response::ok(format!("you are registered! your id: {}", account.id))
                .with_token(token),
        )
    }

    pub(crate) fn sign_in(&self, payload: &Payload) -> Result<Response, HandlerError> {
        let (phone, password) = match (
            str_field(payload, "phone"),
            str_field(payload, "password"),
        ) {
            (Ok(phone), Ok(password)) => (phone, password),
            (Err(msg), _) | (_, Err(msg)) => return Ok(Response::rejected(msg)),
        };

        let digest = self.salted_digest(&password);
        let account = self
            .rental
            .account_by_phone(&phone)?
            .filter(|account| account.password == digest);
        let Some(account) = account else {
            return Ok(Response::not_found("wrong phone or password, try again"));
        };

        let token = self.open_session(account.id)?;
        info!(account = account.id, "account signed in");
        Ok(
            Response::ok(format!("you are signed in. your id: {}", account.id))
                .with_token(token),
        )
    }

    pub(crate) fn get_client(&self, session: &AuthedSession) -> Result<Response, HandlerError> {
        let Some(account) = self.rental.account_by_id(session.subject)? else {
            return Ok(Response::not_found("account not found"));
        };
        let mut record = to_record(&account);
        record.remove("password");
        Ok(Response::ok_with(
            format!("account details for id {}", account.id),
            vec![record],
        ))
    }

    pub(crate) fn del_client(&self, session: &AuthedSession) -> Result<Response, HandlerError> {
        let deleted = self
            .rental
            .soft_delete_account(session.subject, Utc::now().date_naive())?;
        // The session dies with the account either way.
        self.sessions.delete(&session.token)?;
        if !deleted {
            return Ok(Response::not_found("account not found"));
        }
        info!(account = session.subject, "account deleted");
        Ok(Response::ok(format!(
            "account with id {} deleted",
            session.subject
        )))
    }

    pub(crate) fn edit_pass(
        &self,
        session: &AuthedSession,
        payload: &Payload,
    ) -> Result<Response, HandlerError> {
        let password = match str_field(payload, "password") {
            Ok(password) => password,
            Err(msg) => return Ok(Response::rejected(msg)),
        };
        let digest = self.salted_digest(&password);
        if !self.rental.set_password(session.subject, digest)? {
            return Ok(Response::not_found("account not found"));
        }
        info!(account = session.subject, "password changed");
        Ok(Response::ok(format!(
            "password changed! your id: {}",
            session.subject
        )))
    }

    pub(crate) fn edit_client(
        &self,
        session: &AuthedSession,
        payload: &Payload,
    ) -> Result<Response, HandlerError> {
        if payload.contains_key("phone") || payload.contains_key("password") {
            return Ok(Response::rejected(
                "phone and password cannot be changed here",
            ));
        }
        let birthday = match opt_date_field(payload, "birthday") {
            Ok(birthday) => birthday,
            Err(msg) => return Ok(Response::rejected(msg)),
        };
        let update = ProfileUpdate {
            name: opt_str_field(payload, "name"),
            surname: opt_str_field(payload, "surname"),
            birthday,
            email: opt_str_field(payload, "email"),
            comment: opt_str_field(payload, "comment"),
            license_categories: opt_str_field(payload, "license_categories"),
            license_number: opt_str_field(payload, "license_number"),
        };

        let Some(account) = self.rental.update_profile(session.subject, update)? else {
            return Ok(Response::not_found("account not found"));
        };
        Ok(Response::ok(format!(
            "your account details were changed! your id: {}",
            account.id
        )))
    }

    pub(crate) fn log_out(&self, session: &AuthedSession) -> Result<Response, HandlerError> {
        self.sessions.delete(&session.token)?;
        info!(account = session.subject, "account signed out");
        Ok(Response::ok("you are signed out"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::message_handler::MessageHandler;
    use crate::rpc::testing::{sign_up_payload, test_handler};
    use rpc_common::{Operation, Request, Status};
    use serde_json::json;

    #[test]
    fn sign_up_then_sign_in() {
        let handler = test_handler();

        let response =
            handler.handle_request(Request::new(Operation::SignUp, sign_up_payload("+1")));
        assert_eq!(response.status, Status::Ok);
        let first_token = response.token.expect("sign_up must mint a token");

        let mut payload = Payload::new();
        payload.insert("phone".into(), json!("+1"));
        payload.insert("password".into(), json!("letmein"));
        let response = handler.handle_request(Request::new(Operation::SignIn, payload));
        assert_eq!(response.status, Status::Ok);
        assert!(response.content.is_empty());
        let second_token = response.token.expect("sign_in must mint a token");
        assert_ne!(first_token, second_token);
    }

    #[test]
    fn duplicate_phone_is_rejected_not_a_fault() {
        let handler = test_handler();
        handler.handle_request(Request::new(Operation::SignUp, sign_up_payload("+1")));
        let response =
            handler.handle_request(Request::new(Operation::SignUp, sign_up_payload("+1")));
        assert_eq!(response.status, Status::Rejected);
    }

    #[test]
    fn wrong_password_is_not_found() {
        let handler = test_handler();
        handler.handle_request(Request::new(Operation::SignUp, sign_up_payload("+1")));

        let mut payload = Payload::new();
        payload.insert("phone".into(), json!("+1"));
        payload.insert("password".into(), json!("不not-it"));
        let response = handler.handle_request(Request::new(Operation::SignIn, payload));
        assert_eq!(response.status, Status::NotFound);
        assert!(response.token.is_none());
    }

    #[test]
    fn get_client_strips_the_password_digest() {
        let handler = test_handler();
        let token = handler
            .handle_request(Request::new(Operation::SignUp, sign_up_payload("+1")))
            .token
            .unwrap();

        let response = handler.handle_request(Request::with_token(
            Operation::GetClient,
            token.clone(),
            Payload::new(),
        ));
        assert_eq!(response.status, Status::Ok);
        assert_eq!(response.content.len(), 1);
        assert!(response.content[0].get("password").is_none());
        assert_eq!(response.content[0]["phone"], json!("+1"));
        // The valid session is carried forward.
        assert_eq!(response.token, Some(token));
    }

    #[test]
    fn log_out_destroys_the_session_and_returns_no_token() {
        let handler = test_handler();
        let token = handler
            .handle_request(Request::new(Operation::SignUp, sign_up_payload("+1")))
            .token
            .unwrap();

        let response = handler.handle_request(Request::with_token(
            Operation::LogOut,
            token.clone(),
            Payload::new(),
        ));
        assert_eq!(response.status, Status::Ok);
        assert!(response.token.is_none());

        // The token no longer authorizes anything.
        let response =
            handler.handle_request(Request::with_token(Operation::GetClient, token, Payload::new()));
        assert_eq!(response.status, Status::Unauthorized);
    }

    #[test]
    fn edit_pass_changes_the_accepted_credential() {
        let handler = test_handler();
        let token = handler
            .handle_request(Request::new(Operation::SignUp, sign_up_payload("+1")))
            .token
            .unwrap();

        let mut payload = Payload::new();
        payload.insert("password".into(), json!("better-now"));
        let response =
            handler.handle_request(Request::with_token(Operation::EditPass, token, payload));
        assert_eq!(response.status, Status::Ok);

        let mut payload = Payload::new();
        payload.insert("phone".into(), json!("+1"));
        payload.insert("password".into(), json!("letmein"));
        let response = handler.handle_request(Request::new(Operation::SignIn, payload));
        assert_eq!(response.status, Status::NotFound);

        let mut payload = Payload::new();
        payload.insert("phone".into(), json!("+1"));
        payload.insert("password".into(), json!("better-now"));
        let response = handler.handle_request(Request::new(Operation::SignIn, payload));
        assert_eq!(response.status, Status::Ok);
    }

    #[test]
    fn edit_client_refuses_phone_and_password() {
        let handler = test_handler();
        let token = handler
            .handle_request(Request::new(Operation::SignUp, sign_up_payload("+1")))
            .token
            .unwrap();

        let mut payload = Payload::new();
        payload.insert("phone".into(), json!("+2"));
        let response = handler.handle_request(Request::with_token(
            Operation::EditClient,
            token.clone(),
            payload,
        ));
        assert_eq!(response.status, Status::Rejected);

        let mut payload = Payload::new();
        payload.insert("email".into(), json!("ada@example.com"));
        let response =
            handler.handle_request(Request::with_token(Operation::EditClient, token.clone(), payload));
        assert_eq!(response.status, Status::Ok);

        let response =
            handler.handle_request(Request::with_token(Operation::GetClient, token, Payload::new()));
        assert_eq!(response.content[0]["email"], json!("ada@example.com"));
    }

    #[test]
    fn del_client_soft_deletes_and_kills_the_session() {
        let handler = test_handler();
        let token = handler
            .handle_request(Request::new(Operation::SignUp, sign_up_payload("+1")))
            .token
            .unwrap();

        let response = handler.handle_request(Request::with_token(
            Operation::DelClient,
            token.clone(),
            Payload::new(),
        ));
        assert_eq!(response.status, Status::Ok);
        assert!(response.token.is_none());

        // Neither the session nor the credentials work any more.
        let response =
            handler.handle_request(Request::with_token(Operation::GetClient, token, Payload::new()));
        assert_eq!(response.status, Status::Unauthorized);

        let mut payload = Payload::new();
        payload.insert("phone".into(), json!("+1"));
        payload.insert("password".into(), json!("letmein"));
        let response = handler.handle_request(Request::new(Operation::SignIn, payload));
        assert_eq!(response.status, Status::NotFound);
    }
}
