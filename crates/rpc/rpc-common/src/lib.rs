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

use thiserror::Error;

pub use envelope::{
    Operation, Payload, Record, Request, Resource, Response, SessionToken, Status,
};

pub use codec::{
    pack_reply, pack_request, unpack_reply, unpack_request, Correlation, RequestDecodeError,
};

pub mod codec;
mod envelope;

/// Default endpoint the daemon binds its inbound (request) PULL socket on.
pub const DEFAULT_REQUESTS_ENDPOINT: &str = "ipc:///tmp/motorpool_requests.sock";

/// Default endpoint the daemon binds its reply PUB socket on.
pub const DEFAULT_REPLIES_ENDPOINT: &str = "ipc:///tmp/motorpool_replies.sock";

/// Errors at the RPC transport / encoding layer.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("could not attach to daemon: {0}")]
    CouldNotAttach(String),
    #[error("could not send RPC request: {0}")]
    CouldNotSend(String),
    #[error("could not receive RPC response: {0}")]
    CouldNotReceive(String),
    #[error("could not decode RPC response: {0}")]
    CouldNotDecode(String),
    #[error("no RPC response arrived within the deadline")]
    Timeout,
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}
