use std::collections::{HashMap, HashSet};
use std::fmt;
use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;

use base64::Engine;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::StoreError;
use crate::storage::SharedStore;

use super::principal::{UserId, UserIdentity};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn as_str(&self) -> &str { &self.0 }

    /// Leading characters only, for log lines.
    pub fn short(&self) -> &str {
        let end = self.0.char_indices().nth(8).map(|(i, _)| i).unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self { Self(s) }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self { Self(s.to_string()) }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persistence {
    /// Lives for the configured session TTL.
    Ephemeral,
    /// "Remember me": lives for the long remember TTL.
    Remembered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: SessionToken,
    pub owner_id: UserId,
    pub persistence: Persistence,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

fn gen_token(bytes: usize) -> Result<SessionToken, StoreError> {
    let mut buf = vec![0u8; bytes];
    getrandom::getrandom(&mut buf).map_err(|e| StoreError::Unavailable(format!("entropy: {e}")))?;
    Ok(SessionToken(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)))
}

fn expiry_after(now: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
    let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
    let ttl = TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX);
    now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

type Shard = RwLock<HashMap<SessionToken, Session>>;

/// Token → session store. Tokens are spread over independently locked shards so
/// operations on different tokens rarely contend; each token's entry is only
/// ever touched under its shard lock.
pub struct SessionManager {
    store: SharedStore,
    session_ttl_secs: u64,
    remember_ttl_secs: u64,
    token_bytes: usize,
    shards: Vec<Shard>,
    hasher: RandomState,
    user_index: RwLock<HashMap<UserId, HashSet<SessionToken>>>,
}

impl SessionManager {
    pub fn new(store: SharedStore, cfg: &AuthConfig) -> Self {
        let shards = (0..cfg.session_shards.max(1)).map(|_| RwLock::new(HashMap::new())).collect();
        Self {
            store,
            session_ttl_secs: cfg.session_ttl_secs,
            remember_ttl_secs: cfg.remember_ttl_secs,
            token_bytes: cfg.token_bytes.max(32),
            shards,
            hasher: RandomState::new(),
            user_index: RwLock::new(HashMap::new()),
        }
    }

    fn shard(&self, token: &SessionToken) -> &Shard {
        let idx = (self.hasher.hash_one(token) as usize) % self.shards.len();
        &self.shards[idx]
    }

    /// Issue a fresh session for an authenticated identity. Fails if the owner
    /// is no longer in the store or the OS entropy source fails. Expired
    /// sessions sharing the new token's shard are swept on the way.
    pub fn create_session(&self, identity: &UserIdentity, persistence: Persistence) -> Result<Session, StoreError> {
        if self.store.find_user(identity.id)?.is_none() {
            return Err(StoreError::NotFound { kind: "user", id: identity.id.0 });
        }
        let now = Utc::now();
        let ttl = match persistence {
            Persistence::Ephemeral => self.session_ttl_secs,
            Persistence::Remembered => self.remember_ttl_secs,
        };
        let token = gen_token(self.token_bytes)?;
        let session = Session {
            token: token.clone(),
            owner_id: identity.id,
            persistence,
            created_at: now,
            expires_at: expiry_after(now, ttl),
        };
        let mut shard = self.shard(&token).write();
        let mut expired = Vec::new();
        shard.retain(|t, s| {
            let live = !s.is_expired_at(now);
            if !live {
                expired.push((s.owner_id, t.clone()));
            }
            live
        });
        shard.insert(token.clone(), session.clone());
        // index under the shard lock so a concurrent revoke_user sees the token
        {
            let mut idx = self.user_index.write();
            for (owner, t) in expired.iter() {
                unlink(&mut idx, *owner, t);
            }
            idx.entry(identity.id).or_default().insert(token.clone());
        }
        drop(shard);
        if !expired.is_empty() {
            debug!(target: "micropost_auth::session", "session.sweep removed={}", expired.len());
        }
        info!(target: "micropost_auth::session", "session.create user={} token={}.. persistence={:?}", identity.id, token.short(), persistence);
        Ok(session)
    }

    /// The live session for a token, pruning it if expired.
    pub fn session(&self, token: &SessionToken) -> Option<Session> {
        let now = Utc::now();
        let found = self.shard(token).read().get(token).cloned()?;
        if found.is_expired_at(now) {
            debug!(target: "micropost_auth::session", "session.expired token={}..", token.short());
            self.remove(token);
            return None;
        }
        Some(found)
    }

    /// Identity behind a token. Unknown, revoked and expired tokens, and tokens
    /// whose owner has since been deleted, all resolve to `None`.
    pub fn resolve_session(&self, token: &SessionToken) -> Option<UserIdentity> {
        let session = self.session(token)?;
        match self.store.find_user(session.owner_id) {
            Ok(Some(rec)) => Some(rec.identity),
            Ok(None) => {
                debug!(target: "micropost_auth::session", "session.orphaned user={} token={}..", session.owner_id, token.short());
                self.remove(token);
                None
            }
            Err(e) => {
                warn!(target: "micropost_auth::session", "session.resolve store error: {e}");
                None
            }
        }
    }

    /// Sign-out. Unknown or already destroyed tokens are a no-op.
    pub fn destroy_session(&self, token: &SessionToken) {
        if self.remove(token) {
            info!(target: "micropost_auth::session", "session.destroy token={}..", token.short());
        }
    }

    /// Drop every session belonging to a user; returns how many were live.
    pub fn revoke_user(&self, user_id: UserId) -> usize {
        let tokens = self.user_index.write().remove(&user_id).unwrap_or_default();
        let mut count = 0usize;
        for t in tokens.iter() {
            if self.shard(t).write().remove(t).is_some() { count += 1; }
        }
        info!(target: "micropost_auth::session", "session.revoke user={} count={}", user_id, count);
        count
    }

    pub fn active_sessions(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    fn remove(&self, token: &SessionToken) -> bool {
        let Some(ent) = self.shard(token).write().remove(token) else { return false; };
        unlink(&mut self.user_index.write(), ent.owner_id, token);
        true
    }
}

fn unlink(idx: &mut HashMap<UserId, HashSet<SessionToken>>, owner: UserId, token: &SessionToken) {
    if let Some(set) = idx.get_mut(&owner) {
        set.remove(token);
        if set.is_empty() { idx.remove(&owner); }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
