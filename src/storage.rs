//!
//! micropost-auth storage seam
//! ---------------------------
//! The auth core treats persistence as an opaque collaborator. `UserStore` is the
//! minimal read/delete surface the credential check, session resolution and
//! ownership lookups need. `MemoryStore` is the in-process implementation used by
//! the console binary and the tests; it also carries the seeding helpers
//! (create user / micropost / relationship) that a real application would keep in
//! its registration and posting paths.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::identity::{MicropostId, RelationshipId, UserId, UserIdentity};
use crate::security;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub identity: UserIdentity,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MicropostRecord {
    pub id: MicropostId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationshipRecord {
    pub id: RelationshipId,
    pub follower_id: UserId,
    pub followed_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Input for seeding a user. Registration itself is outside the auth core.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub is_admin: bool,
}

impl NewUser {
    pub fn new(display_name: &str, email: &str, password: &str) -> Self {
        Self { display_name: display_name.to_string(), email: email.to_string(), password: password.to_string(), is_admin: false }
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }
}

/// Lookups the auth core performs against persistence. Calls are synchronous and
/// may fail; bounding them is the implementor's job.
pub trait UserStore: Send + Sync {
    fn find_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;
    fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;
    fn find_micropost(&self, id: MicropostId) -> Result<Option<MicropostRecord>, StoreError>;
    fn find_relationship(&self, id: RelationshipId) -> Result<Option<RelationshipRecord>, StoreError>;
    fn user_count(&self) -> Result<usize, StoreError>;
    /// Returns false when the user did not exist.
    fn delete_user(&self, id: UserId) -> Result<bool, StoreError>;
}

pub type SharedStore = Arc<dyn UserStore>;

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Default)]
struct Tables {
    next_id: u64,
    users: BTreeMap<UserId, UserRecord>,
    microposts: BTreeMap<MicropostId, MicropostRecord>,
    relationships: BTreeMap<RelationshipId, RelationshipRecord>,
}

impl Tables {
    fn bump(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory `UserStore`. Ids are allocated from one counter so a micropost and a
/// user never share a number, which keeps test scenarios unambiguous.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn shared(self) -> SharedStore { Arc::new(self) }

    pub fn create_user(&self, new: NewUser) -> Result<UserIdentity, StoreError> {
        let email = normalize_email(&new.email);
        if email.is_empty() {
            return Err(StoreError::Conflict("email must not be blank".into()));
        }
        let password_hash = security::hash_password(&new.password)?;
        let mut t = self.inner.write();
        if t.users.values().any(|u| u.identity.email == email) {
            return Err(StoreError::Conflict(format!("email '{}' already taken", email)));
        }
        let id = UserId(t.bump());
        let identity = UserIdentity { id, email, display_name: new.display_name, is_admin: new.is_admin };
        t.users.insert(id, UserRecord { identity: identity.clone(), password_hash, created_at: Utc::now() });
        debug!(target: "micropost_auth::store", "user.create id={} admin={}", id, identity.is_admin);
        Ok(identity)
    }

    pub fn create_micropost(&self, author: UserId, content: &str) -> Result<MicropostRecord, StoreError> {
        let mut t = self.inner.write();
        if !t.users.contains_key(&author) {
            return Err(StoreError::NotFound { kind: "user", id: author.0 });
        }
        let id = MicropostId(t.bump());
        let rec = MicropostRecord { id, user_id: author, content: content.to_string(), created_at: Utc::now() };
        t.microposts.insert(id, rec.clone());
        Ok(rec)
    }

    pub fn follow(&self, follower: UserId, followed: UserId) -> Result<RelationshipRecord, StoreError> {
        let mut t = self.inner.write();
        for uid in [follower, followed] {
            if !t.users.contains_key(&uid) {
                return Err(StoreError::NotFound { kind: "user", id: uid.0 });
            }
        }
        if t.relationships.values().any(|r| r.follower_id == follower && r.followed_id == followed) {
            return Err(StoreError::Conflict(format!("{} already follows {}", follower, followed)));
        }
        let id = RelationshipId(t.bump());
        let rec = RelationshipRecord { id, follower_id: follower, followed_id: followed, created_at: Utc::now() };
        t.relationships.insert(id, rec.clone());
        Ok(rec)
    }

    pub fn admin_count(&self) -> usize {
        self.inner.read().users.values().filter(|u| u.identity.is_admin).count()
    }

    pub fn micropost_count(&self) -> usize {
        self.inner.read().microposts.len()
    }
}

impl UserStore for MemoryStore {
    fn find_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.inner.read().users.get(&id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let email = normalize_email(email);
        Ok(self.inner.read().users.values().find(|u| u.identity.email == email).cloned())
    }

    fn find_micropost(&self, id: MicropostId) -> Result<Option<MicropostRecord>, StoreError> {
        Ok(self.inner.read().microposts.get(&id).cloned())
    }

    fn find_relationship(&self, id: RelationshipId) -> Result<Option<RelationshipRecord>, StoreError> {
        Ok(self.inner.read().relationships.get(&id).cloned())
    }

    fn user_count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.read().users.len())
    }

    fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let mut t = self.inner.write();
        if t.users.remove(&id).is_none() {
            return Ok(false);
        }
        // dependent rows go with the user
        t.microposts.retain(|_, m| m.user_id != id);
        t.relationships.retain(|_, r| r.follower_id != id && r.followed_id != id);
        debug!(target: "micropost_auth::store", "user.delete id={}", id);
        Ok(true)
    }
}
