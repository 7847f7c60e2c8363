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

//! The session store: `token → (subject, last activity)`.
//!
//! The store knows nothing about messaging or dispatch; the sliding-window
//! policy lives in the session guard and only the raw record operations live
//! here.

use std::time::{Duration, SystemTime};

use rpc_common::SessionToken;
use thiserror::Error;

pub use fjall_store::FjallSessionStore;
pub use in_memory::InMemorySessionStore;

mod fjall_store;
mod in_memory;

/// One live session. `last_active` is monotonically non-decreasing for the
/// lifetime of the token.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SessionRecord {
    /// The authenticated account id the token stands for.
    pub subject: i64,
    pub last_active: SystemTime,
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt session record for token {0}")]
    Corrupt(SessionToken),
}

/// Record operations every session store backend supports.
///
/// Implementations must apply `refresh` and `delete` atomically per token, so
/// that a concurrent refresh and expiry-delete of the same token resolve to
/// one of the two serial outcomes and never to a resurrected record.
pub trait SessionStore: Send + Sync {
    fn lookup(&self, token: &SessionToken) -> Result<Option<SessionRecord>, SessionStoreError>;

    /// Insert the record for a freshly minted token.
    fn insert(
        &self,
        token: &SessionToken,
        subject: i64,
        now: SystemTime,
    ) -> Result<(), SessionStoreError>;

    /// Move `last_active` forward to `now`. A no-op for a token that has been
    /// deleted in the meantime, and never moves the timestamp backwards.
    fn refresh(&self, token: &SessionToken, now: SystemTime) -> Result<(), SessionStoreError>;

    /// Remove the record. Returns whether it existed.
    fn delete(&self, token: &SessionToken) -> Result<bool, SessionStoreError>;

    /// Discard every record. Invoked once at daemon start so sessions from a
    /// prior run cannot authorize anything.
    fn clear_all(&self) -> Result<usize, SessionStoreError>;

    /// Remove every record whose idle time exceeds `ttl`, returning how many
    /// were reclaimed.
    fn sweep_expired(&self, ttl: Duration, now: SystemTime)
        -> Result<usize, SessionStoreError>;
}
