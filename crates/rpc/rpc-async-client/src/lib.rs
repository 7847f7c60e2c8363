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

//! The client call site: turns the daemon's publish/subscribe transport back
//! into ordinary call/return.
//!
//! Each client owns a private reply topic (its client id) and a table of
//! pending calls keyed by correlation id. A background task drains the reply
//! subscription and resolves each pending entry as its reply arrives, so a
//! single client may keep several calls outstanding concurrently. Every call
//! carries a bounded wait; a call that outlives it fails with
//! [`rpc_common::RpcError::Timeout`] rather than hanging.

pub use rpc_client::RpcSendClient;

pub mod pubsub_client;
pub mod rpc_client;
