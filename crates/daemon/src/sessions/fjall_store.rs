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

//! Fjall-backed session store. Sessions survive a daemon restart, which is
//! why the boot-time bulk clear exists at all.

use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bincode::{Decode, Encode};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use rpc_common::SessionToken;
use tracing::warn;

use super::{SessionRecord, SessionStore, SessionStoreError};

const SESSIONS_PARTITION: &str = "sessions";

/// On-disk value layout, keyed by the token string.
#[derive(Debug, Encode, Decode)]
struct StoredSession {
    subject: i64,
    last_active_secs: u64,
}

pub struct FjallSessionStore {
    _keyspace: Keyspace,
    sessions: PartitionHandle,
    // Serializes check-and-set mutations; fjall point writes alone cannot
    // keep refresh-vs-delete linearizable per token.
    write_lock: Mutex<()>,
}

impl FjallSessionStore {
    pub fn open(path: &Path) -> Result<Self, SessionStoreError> {
        let keyspace = fjall::Config::new(path)
            .open()
            .map_err(|e| SessionStoreError::Unavailable(e.to_string()))?;
        let sessions = keyspace
            .open_partition(SESSIONS_PARTITION, PartitionCreateOptions::default())
            .map_err(|e| SessionStoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            _keyspace: keyspace,
            sessions,
            write_lock: Mutex::new(()),
        })
    }

    fn decode(token: &SessionToken, bytes: &[u8]) -> Result<SessionRecord, SessionStoreError> {
        let (stored, _): (StoredSession, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|_| SessionStoreError::Corrupt(token.clone()))?;
        Ok(SessionRecord {
            subject: stored.subject,
            last_active: UNIX_EPOCH + Duration::from_secs(stored.last_active_secs),
        })
    }

    fn encode(subject: i64, last_active: SystemTime) -> Vec<u8> {
        let stored = StoredSession {
            subject,
            last_active_secs: unix_secs(last_active),
        };
        bincode::encode_to_vec(&stored, bincode::config::standard())
            .expect("session record encoding cannot fail")
    }
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl SessionStore for FjallSessionStore {
    fn lookup(&self, token: &SessionToken) -> Result<Option<SessionRecord>, SessionStoreError> {
        let Some(bytes) = self
            .sessions
            .get(&token.0)
            .map_err(|e| SessionStoreError::Unavailable(e.to_string()))?
        else {
            return Ok(None);
        };
        Ok(Some(Self::decode(token, &bytes)?))
    }

    fn insert(
        &self,
        token: &SessionToken,
        subject: i64,
        now: SystemTime,
    ) -> Result<(), SessionStoreError> {
        let _guard = self.write_lock.lock().unwrap();
        self.sessions
            .insert(&token.0, Self::encode(subject, now))
            .map_err(|e| SessionStoreError::Unavailable(e.to_string()))
    }

    fn refresh(&self, token: &SessionToken, now: SystemTime) -> Result<(), SessionStoreError> {
        let _guard = self.write_lock.lock().unwrap();
        let Some(bytes) = self
            .sessions
            .get(&token.0)
            .map_err(|e| SessionStoreError::Unavailable(e.to_string()))?
        else {
            // Deleted concurrently; refreshing nothing is the correct serial
            // outcome.
            return Ok(());
        };
        let record = Self::decode(token, &bytes)?;
        if now <= record.last_active {
            return Ok(());
        }
        self.sessions
            .insert(&token.0, Self::encode(record.subject, now))
            .map_err(|e| SessionStoreError::Unavailable(e.to_string()))
    }

    fn delete(&self, token: &SessionToken) -> Result<bool, SessionStoreError> {
        let _guard = self.write_lock.lock().unwrap();
        let existed = self
            .sessions
            .get(&token.0)
            .map_err(|e| SessionStoreError::Unavailable(e.to_string()))?
            .is_some();
        if existed {
            self.sessions
                .remove(&token.0)
                .map_err(|e| SessionStoreError::Unavailable(e.to_string()))?;
        }
        Ok(existed)
    }

    fn clear_all(&self) -> Result<usize, SessionStoreError> {
        let _guard = self.write_lock.lock().unwrap();
        let mut keys = Vec::new();
        for kv in self.sessions.iter() {
            let (key, _) = kv.map_err(|e| SessionStoreError::Unavailable(e.to_string()))?;
            keys.push(key);
        }
        let discarded = keys.len();
        for key in keys {
            self.sessions
                .remove(key)
                .map_err(|e| SessionStoreError::Unavailable(e.to_string()))?;
        }
        Ok(discarded)
    }

    fn sweep_expired(
        &self,
        ttl: Duration,
        now: SystemTime,
    ) -> Result<usize, SessionStoreError> {
        let _guard = self.write_lock.lock().unwrap();
        let mut expired = Vec::new();
        for kv in self.sessions.iter() {
            let (key, value) = kv.map_err(|e| SessionStoreError::Unavailable(e.to_string()))?;
            let token = SessionToken(String::from_utf8_lossy(&key).to_string());
            let record = match Self::decode(&token, &value) {
                Ok(record) => record,
                Err(_) => {
                    // Undecodable records cannot authorize anything; reclaim
                    // them along with the expired ones.
                    warn!(%token, "reclaiming corrupt session record");
                    expired.push(key);
                    continue;
                }
            };
            let idle = now
                .duration_since(record.last_active)
                .unwrap_or(Duration::ZERO);
            if idle > ttl {
                expired.push(key);
            }
        }
        let reclaimed = expired.len();
        for key in expired {
            self.sessions
                .remove(key)
                .map_err(|e| SessionStoreError::Unavailable(e.to_string()))?;
        }
        Ok(reclaimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let tok = SessionToken::mint();
        let now = SystemTime::now();

        {
            let store = FjallSessionStore::open(dir.path()).unwrap();
            store.insert(&tok, 42, now).unwrap();
        }

        let store = FjallSessionStore::open(dir.path()).unwrap();
        let record = store.lookup(&tok).unwrap().unwrap();
        assert_eq!(record.subject, 42);
        // Timestamps are stored at second granularity.
        assert_eq!(unix_secs(record.last_active), unix_secs(now));
    }

    #[test]
    fn clear_all_discards_a_prior_run() {
        let dir = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        {
            let store = FjallSessionStore::open(dir.path()).unwrap();
            for subject in 0..4 {
                store.insert(&SessionToken::mint(), subject, now).unwrap();
            }
        }
        let store = FjallSessionStore::open(dir.path()).unwrap();
        assert_eq!(store.clear_all().unwrap(), 4);
        assert_eq!(store.clear_all().unwrap(), 0);
    }

    #[test]
    fn sweep_and_refresh_behave_like_the_memory_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FjallSessionStore::open(dir.path()).unwrap();
        let now = SystemTime::now();
        let ttl = Duration::from_secs(60);

        let fresh = SessionToken::mint();
        let stale = SessionToken::mint();
        store.insert(&fresh, 1, now).unwrap();
        store
            .insert(&stale, 2, now - Duration::from_secs(120))
            .unwrap();

        assert_eq!(store.sweep_expired(ttl, now).unwrap(), 1);
        assert!(store.lookup(&fresh).unwrap().is_some());
        assert!(store.lookup(&stale).unwrap().is_none());

        // Refresh of the swept token must not bring it back.
        store.refresh(&stale, now).unwrap();
        assert!(store.lookup(&stale).unwrap().is_none());

        store.delete(&fresh).unwrap();
        assert!(store.lookup(&fresh).unwrap().is_none());
    }
}
