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

//! Pure in-memory session store. Sessions die with the process.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use rpc_common::SessionToken;

use super::{SessionRecord, SessionStore, SessionStoreError};

/// Mutex-guarded map. Every operation decides and mutates under one lock
/// hold, which is what makes per-token updates linearizable.
#[derive(Default)]
pub struct InMemorySessionStore {
    inner: Mutex<HashMap<String, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn lookup(&self, token: &SessionToken) -> Result<Option<SessionRecord>, SessionStoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.get(&token.0).copied())
    }

    fn insert(
        &self,
        token: &SessionToken,
        subject: i64,
        now: SystemTime,
    ) -> Result<(), SessionStoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.insert(
            token.0.clone(),
            SessionRecord {
                subject,
                last_active: now,
            },
        );
        Ok(())
    }

    fn refresh(&self, token: &SessionToken, now: SystemTime) -> Result<(), SessionStoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.get_mut(&token.0) {
            if now > record.last_active {
                record.last_active = now;
            }
        }
        Ok(())
    }

    fn delete(&self, token: &SessionToken) -> Result<bool, SessionStoreError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.remove(&token.0).is_some())
    }

    fn clear_all(&self) -> Result<usize, SessionStoreError> {
        let mut inner = self.inner.lock().unwrap();
        let discarded = inner.len();
        inner.clear();
        Ok(discarded)
    }

    fn sweep_expired(
        &self,
        ttl: Duration,
        now: SystemTime,
    ) -> Result<usize, SessionStoreError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.len();
        inner.retain(|_, record| {
            now.duration_since(record.last_active)
                .map(|idle| idle <= ttl)
                .unwrap_or(true)
        });
        Ok(before - inner.len())
    }
}
