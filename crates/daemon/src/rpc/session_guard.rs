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

//! Sliding-window session expiration with lazy refresh.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use rpc_common::SessionToken;
use tracing::{debug, info};

use crate::sessions::{SessionStore, SessionStoreError};

#[derive(Debug, Copy, Clone)]
pub struct SessionGuardConfig {
    /// Maximum idle time before a session is reclaimed.
    pub ttl: Duration,
    /// Idle time past which an access writes a fresh `last_active` through to
    /// the store. Strictly less than `ttl`; accesses under it take the
    /// read-only fast path.
    pub ttl_refresh: Duration,
}

impl Default for SessionGuardConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(900),
            ttl_refresh: Duration::from_secs(300),
        }
    }
}

/// What the guard decided about a request's token.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Authorization {
    Authorized { subject: i64 },
    /// The token was live once but idled past the ttl; it has been deleted.
    Expired,
    /// No token, or a token the store has never heard of.
    Unauthorized,
}

/// Gatekeeper consulted before every protected handler.
pub struct SessionGuard {
    store: Arc<dyn SessionStore>,
    config: SessionGuardConfig,
}

impl SessionGuard {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionGuardConfig) -> Self {
        Self { store, config }
    }

    pub fn authorize(
        &self,
        token: Option<&SessionToken>,
    ) -> Result<Authorization, SessionStoreError> {
        self.authorize_at(token, SystemTime::now())
    }

    /// The decision ladder, with the clock passed in so the boundaries are
    /// testable.
    pub fn authorize_at(
        &self,
        token: Option<&SessionToken>,
        now: SystemTime,
    ) -> Result<Authorization, SessionStoreError> {
        let Some(token) = token else {
            return Ok(Authorization::Unauthorized);
        };
        let Some(record) = self.store.lookup(token)? else {
            debug!(%token, "unknown session token");
            return Ok(Authorization::Unauthorized);
        };

        let idle = now
            .duration_since(record.last_active)
            .unwrap_or(Duration::ZERO);

        if idle > self.config.ttl {
            self.store.delete(token)?;
            info!(%token, idle_secs = idle.as_secs(), "session expired, reclaimed");
            return Ok(Authorization::Expired);
        }
        if idle > self.config.ttl_refresh {
            self.store.refresh(token, now)?;
        }
        Ok(Authorization::Authorized {
            subject: record.subject,
        })
    }
}
