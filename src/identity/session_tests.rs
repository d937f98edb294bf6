use super::*;
use crate::identity::{MicropostId, RelationshipId};
use crate::storage::{MemoryStore, MicropostRecord, NewUser, RelationshipRecord, UserRecord, UserStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn setup(cfg: AuthConfig) -> (Arc<MemoryStore>, SessionManager, UserIdentity) {
    let store = Arc::new(MemoryStore::new());
    let u = store.create_user(NewUser::new("Example User", "user@example.com", "foobar")).unwrap();
    let sm = SessionManager::new(store.clone(), &cfg);
    (store, sm, u)
}

#[test]
fn create_resolve_destroy_round_trip() {
    let (_store, sm, u) = setup(AuthConfig::default());
    let s = sm.create_session(&u, Persistence::Remembered).unwrap();
    assert_eq!(s.owner_id, u.id);
    assert_eq!(sm.resolve_session(&s.token), Some(u.clone()));

    sm.destroy_session(&s.token);
    assert_eq!(sm.resolve_session(&s.token), None);
    // idempotent
    sm.destroy_session(&s.token);
    sm.destroy_session(&SessionToken::from("never-issued"));
    assert_eq!(sm.active_sessions(), 0);
}

#[test]
fn tokens_are_long_unique_and_url_safe() {
    let (_store, sm, u) = setup(AuthConfig::default());
    let a = sm.create_session(&u, Persistence::Ephemeral).unwrap();
    let b = sm.create_session(&u, Persistence::Ephemeral).unwrap();
    assert_ne!(a.token, b.token);
    // 32 bytes base64url, no padding
    assert_eq!(a.token.as_str().len(), 43);
    assert!(a.token.as_str().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    assert_eq!(a.token.short().len(), 8);
    // both sessions for the same user stay live
    assert!(sm.resolve_session(&a.token).is_some());
    assert!(sm.resolve_session(&b.token).is_some());
}

#[test]
fn remembered_sessions_outlive_ephemeral_ones() {
    let (_store, sm, u) = setup(AuthConfig::default());
    let e = sm.create_session(&u, Persistence::Ephemeral).unwrap();
    let r = sm.create_session(&u, Persistence::Remembered).unwrap();
    assert!(r.expires_at > e.expires_at);
    assert_eq!(r.persistence, Persistence::Remembered);
}

#[test]
fn expired_sessions_resolve_to_none_and_are_pruned() {
    let cfg = AuthConfig { session_ttl_secs: 0, ..AuthConfig::default() };
    let (_store, sm, u) = setup(cfg);
    let s = sm.create_session(&u, Persistence::Ephemeral).unwrap();
    assert_eq!(sm.resolve_session(&s.token), None);
    assert_eq!(sm.active_sessions(), 0);
}

#[test]
fn huge_ttl_saturates_instead_of_overflowing() {
    let cfg = AuthConfig { remember_ttl_secs: u64::MAX, ..AuthConfig::default() };
    let (_store, sm, u) = setup(cfg);
    let s = sm.create_session(&u, Persistence::Remembered).unwrap();
    assert!(sm.resolve_session(&s.token).is_some());
}

#[test]
fn deleted_owner_invalidates_session() {
    let (store, sm, u) = setup(AuthConfig::default());
    let s = sm.create_session(&u, Persistence::Ephemeral).unwrap();
    assert!(store.delete_user(u.id).unwrap());
    assert_eq!(sm.resolve_session(&s.token), None);
    assert_eq!(sm.active_sessions(), 0);
}

#[test]
fn revoke_user_drops_only_that_users_sessions() {
    let (store, sm, u) = setup(AuthConfig::default());
    let other = store.create_user(NewUser::new("Other", "other@example.com", "foobar")).unwrap();
    let s1 = sm.create_session(&u, Persistence::Ephemeral).unwrap();
    let s2 = sm.create_session(&u, Persistence::Remembered).unwrap();
    let keep = sm.create_session(&other, Persistence::Ephemeral).unwrap();

    assert_eq!(sm.revoke_user(u.id), 2);
    assert!(sm.resolve_session(&s1.token).is_none());
    assert!(sm.resolve_session(&s2.token).is_none());
    assert_eq!(sm.resolve_session(&keep.token).map(|i| i.id), Some(other.id));
    assert_eq!(sm.revoke_user(u.id), 0);
}

#[test]
fn concurrent_sessions_never_cross_tokens() {
    let store = Arc::new(MemoryStore::new());
    let users: Vec<UserIdentity> = (0..4)
        .map(|i| store.create_user(NewUser::new(&format!("User {i}"), &format!("user{i}@example.com"), "pw")).unwrap())
        .collect();
    let sm = SessionManager::new(store.clone(), &AuthConfig::default());

    std::thread::scope(|scope| {
        for u in users.iter() {
            let sm = &sm;
            scope.spawn(move || {
                for _ in 0..50 {
                    let s = sm.create_session(u, Persistence::Ephemeral).unwrap();
                    assert_eq!(sm.resolve_session(&s.token).map(|i| i.id), Some(u.id));
                    sm.destroy_session(&s.token);
                    assert!(sm.resolve_session(&s.token).is_none());
                }
            });
        }
    });
    assert_eq!(sm.active_sessions(), 0);
}

#[test]
fn sessions_are_only_issued_to_stored_users() {
    let (store, sm, u) = setup(AuthConfig::default());
    let ghost = UserIdentity { id: UserId(999), email: "ghost@example.com".into(), display_name: "Ghost".into(), is_admin: false };
    let err = sm.create_session(&ghost, Persistence::Ephemeral).unwrap_err();
    assert_eq!(err, StoreError::NotFound { kind: "user", id: 999 });

    assert!(store.delete_user(u.id).unwrap());
    assert!(sm.create_session(&u, Persistence::Remembered).is_err());
    assert_eq!(sm.active_sessions(), 0);
}

#[test]
fn creating_a_session_sweeps_expired_ones_from_its_shard() {
    let cfg = AuthConfig { session_ttl_secs: 0, session_shards: 1, ..AuthConfig::default() };
    let (_store, sm, u) = setup(cfg);
    for _ in 0..10 {
        sm.create_session(&u, Persistence::Ephemeral).unwrap();
    }
    // nobody read the abandoned tokens; only the newest is still held
    assert_eq!(sm.active_sessions(), 1);
    let live = sm.create_session(&u, Persistence::Remembered).unwrap();
    assert_eq!(sm.active_sessions(), 1);
    assert_eq!(sm.resolve_session(&live.token).map(|i| i.id), Some(u.id));
    // the index forgot the swept tokens too
    assert_eq!(sm.revoke_user(u.id), 1);
}

/// Delegates to a memory store until switched off.
struct FlakyStore {
    inner: Arc<MemoryStore>,
    down: AtomicBool,
}

impl FlakyStore {
    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) { Err(StoreError::Unavailable("down".into())) } else { Ok(()) }
    }
}

impl UserStore for FlakyStore {
    fn find_user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> { self.check()?; self.inner.find_user(id) }
    fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> { self.check()?; self.inner.find_user_by_email(email) }
    fn find_micropost(&self, id: MicropostId) -> Result<Option<MicropostRecord>, StoreError> { self.check()?; self.inner.find_micropost(id) }
    fn find_relationship(&self, id: RelationshipId) -> Result<Option<RelationshipRecord>, StoreError> { self.check()?; self.inner.find_relationship(id) }
    fn user_count(&self) -> Result<usize, StoreError> { self.check()?; self.inner.user_count() }
    fn delete_user(&self, id: UserId) -> Result<bool, StoreError> { self.check()?; self.inner.delete_user(id) }
}

#[test]
fn store_outage_resolves_to_no_session_without_dropping_it() {
    let inner = Arc::new(MemoryStore::new());
    let u = inner.create_user(NewUser::new("Example User", "user@example.com", "foobar")).unwrap();
    let flaky = Arc::new(FlakyStore { inner, down: AtomicBool::new(false) });
    let sm = SessionManager::new(flaky.clone(), &AuthConfig::default());
    let s = sm.create_session(&u, Persistence::Ephemeral).unwrap();

    flaky.down.store(true, Ordering::SeqCst);
    assert_eq!(sm.resolve_session(&s.token), None);
    assert!(matches!(sm.create_session(&u, Persistence::Ephemeral), Err(StoreError::Unavailable(_))));
    assert_eq!(sm.active_sessions(), 1);

    flaky.down.store(false, Ordering::SeqCst);
    assert_eq!(sm.resolve_session(&s.token).map(|i| i.id), Some(u.id));
}
