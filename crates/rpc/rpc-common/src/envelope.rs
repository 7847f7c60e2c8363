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

//! The request/response envelope as it appears on the wire, plus the closed
//! table of operations the daemon routes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// A field map carried in a request (`payload`) or returned per record in a
/// response (`content` entries).
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// One result record in a response's `content` sequence.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// The resource domains requests are addressed to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Account,
    Catalog,
    Order,
    Favorites,
    /// Transport-level traffic (liveness probes), not a domain resource.
    System,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Resource::Account => "account",
            Resource::Catalog => "catalog",
            Resource::Order => "order",
            Resource::Favorites => "favorites",
            Resource::System => "system",
        };
        f.write_str(s)
    }
}

/// The closed enumeration of every (resource, action) pair the daemon knows.
/// Routing resolves against this table; a pair outside it is a routing error,
/// never a handler fault.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Operation {
    Ping,
    SignUp,
    SignIn,
    GetClient,
    DelClient,
    EditPass,
    EditClient,
    LogOut,
    GetCar,
    GetCars,
    AddOrder,
    GetOrder,
    GetOrders,
    AddFavorite,
    DelFavorite,
    GetFavorites,
}

impl Operation {
    /// Every operation, in routing-table order. Kept in sync with `resolve`
    /// by the tests below.
    pub const ALL: [Operation; 16] = [
        Operation::Ping,
        Operation::SignUp,
        Operation::SignIn,
        Operation::GetClient,
        Operation::DelClient,
        Operation::EditPass,
        Operation::EditClient,
        Operation::LogOut,
        Operation::GetCar,
        Operation::GetCars,
        Operation::AddOrder,
        Operation::GetOrder,
        Operation::GetOrders,
        Operation::AddFavorite,
        Operation::DelFavorite,
        Operation::GetFavorites,
    ];

    /// Look up the operation for a decoded envelope. `None` is a routing
    /// miss.
    pub fn resolve(resource: Resource, action: &str) -> Option<Operation> {
        let op = match (resource, action) {
            (Resource::System, "ping") => Operation::Ping,
            (Resource::Account, "sign_up") => Operation::SignUp,
            (Resource::Account, "sign_in") => Operation::SignIn,
            (Resource::Account, "get_client") => Operation::GetClient,
            (Resource::Account, "del_client") => Operation::DelClient,
            (Resource::Account, "edit_pass") => Operation::EditPass,
            (Resource::Account, "edit_client") => Operation::EditClient,
            (Resource::Account, "log_out") => Operation::LogOut,
            (Resource::Catalog, "get_car") => Operation::GetCar,
            (Resource::Catalog, "get_cars") => Operation::GetCars,
            (Resource::Order, "add_order") => Operation::AddOrder,
            (Resource::Order, "get_order") => Operation::GetOrder,
            (Resource::Order, "get_orders") => Operation::GetOrders,
            (Resource::Favorites, "add_favorite") => Operation::AddFavorite,
            (Resource::Favorites, "del_favorite") => Operation::DelFavorite,
            (Resource::Favorites, "get_favorites") => Operation::GetFavorites,
            _ => return None,
        };
        Some(op)
    }

    pub fn resource(&self) -> Resource {
        match self {
            Operation::Ping => Resource::System,
            Operation::SignUp
            | Operation::SignIn
            | Operation::GetClient
            | Operation::DelClient
            | Operation::EditPass
            | Operation::EditClient
            | Operation::LogOut => Resource::Account,
            Operation::GetCar | Operation::GetCars => Resource::Catalog,
            Operation::AddOrder | Operation::GetOrder | Operation::GetOrders => Resource::Order,
            Operation::AddFavorite | Operation::DelFavorite | Operation::GetFavorites => {
                Resource::Favorites
            }
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Operation::Ping => "ping",
            Operation::SignUp => "sign_up",
            Operation::SignIn => "sign_in",
            Operation::GetClient => "get_client",
            Operation::DelClient => "del_client",
            Operation::EditPass => "edit_pass",
            Operation::EditClient => "edit_client",
            Operation::LogOut => "log_out",
            Operation::GetCar => "get_car",
            Operation::GetCars => "get_cars",
            Operation::AddOrder => "add_order",
            Operation::GetOrder => "get_order",
            Operation::GetOrders => "get_orders",
            Operation::AddFavorite => "add_favorite",
            Operation::DelFavorite => "del_favorite",
            Operation::GetFavorites => "get_favorites",
        }
    }

    /// Whether the session guard runs before the handler. Only the probe and
    /// the two credential-presenting operations are open.
    pub fn requires_auth(&self) -> bool {
        !matches!(
            self,
            Operation::Ping | Operation::SignUp | Operation::SignIn
        )
    }
}

/// Response status, carried on the wire as a 3-digit code string.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Status {
    /// "200": the operation succeeded.
    Ok,
    /// "403": missing, invalid, or expired session.
    Unauthorized,
    /// "404": routing miss, or a referenced entity is absent.
    NotFound,
    /// "422": the request was understood but rejected by a business rule.
    Rejected,
    /// "500": a fault inside the daemon; the cause is not leaked.
    Fault,
}

impl Status {
    pub fn code(&self) -> &'static str {
        match self {
            Status::Ok => "200",
            Status::Unauthorized => "403",
            Status::NotFound => "404",
            Status::Rejected => "422",
            Status::Fault => "500",
        }
    }

    pub fn from_code(code: &str) -> Option<Status> {
        match code {
            "200" => Some(Status::Ok),
            "403" => Some(Status::Unauthorized),
            "404" => Some(Status::NotFound),
            "422" => Some(Status::Rejected),
            "500" => Some(Status::Fault),
            _ => None,
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Status::from_code(&code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown status code {code:?}")))
    }
}

/// Opaque session token minted on successful authentication. Its validity is
/// decided solely by the daemon's session store.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(pub String);

impl SessionToken {
    pub fn mint() -> Self {
        SessionToken(Uuid::new_v4().simple().to_string())
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A request envelope as published to the shared inbound destination.
/// `token` is absent until authentication has succeeded, and cleared again on
/// logout or expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub resource: Resource,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<SessionToken>,
    #[serde(default)]
    pub payload: Payload,
}

impl Request {
    pub fn new(op: Operation, payload: Payload) -> Self {
        Self {
            resource: op.resource(),
            action: op.action().to_string(),
            token: None,
            payload,
        }
    }

    pub fn with_token(op: Operation, token: SessionToken, payload: Payload) -> Self {
        Self {
            resource: op.resource(),
            action: op.action().to_string(),
            token: Some(token),
            payload,
        }
    }
}

/// A response envelope as published back to a caller's private reply topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    pub message: String,
    #[serde(default)]
    pub content: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<SessionToken>,
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            message: message.into(),
            content: vec![],
            token: None,
        }
    }

    pub fn ok_with(message: impl Into<String>, content: Vec<Record>) -> Self {
        Self {
            status: Status::Ok,
            message: message.into(),
            content,
            token: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: Status::Unauthorized,
            message: message.into(),
            content: vec![],
            token: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: Status::NotFound,
            message: message.into(),
            content: vec![],
            token: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            status: Status::Rejected,
            message: message.into(),
            content: vec![],
            token: None,
        }
    }

    /// The generic server-fault reply. The caller never learns the cause.
    pub fn fault() -> Self {
        Self {
            status: Status::Fault,
            message: "an error occurred on the server".to_string(),
            content: vec![],
            token: None,
        }
    }

    /// Carry the session token forward on a reply.
    pub fn with_token(mut self, token: SessionToken) -> Self {
        self.token = Some(token);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn request_wire_shape_is_field_exact() {
        let mut payload = Payload::new();
        payload.insert("phone".into(), json!("+1"));
        payload.insert("password".into(), json!("p"));
        let req = Request::new(Operation::SignIn, payload);

        let encoded = serde_json::to_value(&req).unwrap();
        assert_eq!(
            encoded,
            json!({
                "resource": "account",
                "action": "sign_in",
                "payload": {"phone": "+1", "password": "p"},
            })
        );
    }

    #[test]
    fn token_is_present_only_once_authenticated() {
        let req = Request::with_token(
            Operation::GetClient,
            SessionToken("deadbeef".into()),
            Payload::new(),
        );
        let encoded = serde_json::to_value(&req).unwrap();
        assert_eq!(encoded["token"], json!("deadbeef"));

        let resp = Response::ok("bye");
        let encoded = serde_json::to_value(&resp).unwrap();
        assert!(encoded.get("token").is_none());
    }

    #[test]
    fn status_codes_round_trip_as_strings() {
        for status in [
            Status::Ok,
            Status::Unauthorized,
            Status::NotFound,
            Status::Rejected,
            Status::Fault,
        ] {
            let encoded = serde_json::to_string(&status).unwrap();
            assert_eq!(encoded, format!("\"{}\"", status.code()));
            let decoded: Status = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, status);
        }
        assert!(serde_json::from_str::<Status>("\"666\"").is_err());
    }

    #[test]
    fn every_operation_resolves_to_itself() {
        for op in Operation::ALL {
            assert_eq!(Operation::resolve(op.resource(), op.action()), Some(op));
        }
    }

    #[test]
    fn unknown_pairs_do_not_resolve() {
        assert_eq!(Operation::resolve(Resource::Account, "get_car"), None);
        assert_eq!(Operation::resolve(Resource::Catalog, "sign_in"), None);
        assert_eq!(Operation::resolve(Resource::System, "sign_up"), None);
        assert_eq!(Operation::resolve(Resource::Order, "drop_table"), None);
    }

    #[test]
    fn only_probe_and_credential_operations_are_open() {
        for op in Operation::ALL {
            let open = matches!(op, Operation::Ping | Operation::SignUp | Operation::SignIn);
            assert_eq!(op.requires_auth(), !open, "{op:?}");
        }
    }
}
