use tracing::debug;

use crate::error::AuthFailure;
use crate::security;
use crate::storage::SharedStore;

use super::principal::UserIdentity;

/// Email + password check against the user store.
#[derive(Clone)]
pub struct CredentialStore {
    store: SharedStore,
}

impl CredentialStore {
    pub fn new(store: SharedStore) -> Self { Self { store } }

    /// Unknown email and wrong password both yield `InvalidCredentials`, and both
    /// cost one Argon2 verification.
    pub fn authenticate(&self, email: &str, raw_password: &str) -> Result<UserIdentity, AuthFailure> {
        let Some(record) = self.store.find_user_by_email(email)? else {
            security::verify_dummy(raw_password);
            debug!(target: "micropost_auth::auth", "authenticate: rejected");
            return Err(AuthFailure::InvalidCredentials);
        };
        if !security::verify_password(&record.password_hash, raw_password) {
            debug!(target: "micropost_auth::auth", "authenticate: rejected");
            return Err(AuthFailure::InvalidCredentials);
        }
        debug!(target: "micropost_auth::auth", "authenticate: ok user={}", record.identity.id);
        Ok(record.identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::identity::{MicropostId, RelationshipId, UserId};
    use crate::storage::{MemoryStore, MicropostRecord, NewUser, RelationshipRecord, UserRecord, UserStore};
    use std::sync::Arc;

    fn seeded() -> (CredentialStore, UserIdentity) {
        let store = MemoryStore::new();
        let u = store.create_user(NewUser::new("Example User", "user@example.com", "foobar")).unwrap();
        (CredentialStore::new(store.shared()), u)
    }

    #[test]
    fn correct_password_returns_the_user() {
        let (creds, u) = seeded();
        assert_eq!(creds.authenticate("user@example.com", "foobar").unwrap(), u);
        // email case and padding do not matter
        assert_eq!(creds.authenticate(" USER@example.com", "foobar").unwrap().id, u.id);
    }

    #[test]
    fn wrong_password_and_unknown_email_are_indistinguishable() {
        let (creds, _) = seeded();
        let wrong = creds.authenticate("user@example.com", "invalid").unwrap_err();
        let unknown = creds.authenticate("nobody@example.com", "foobar").unwrap_err();
        assert_eq!(wrong, AuthFailure::InvalidCredentials);
        assert_eq!(wrong, unknown);
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[test]
    fn blank_submission_is_rejected() {
        let (creds, _) = seeded();
        assert_eq!(creds.authenticate("", "").unwrap_err(), AuthFailure::InvalidCredentials);
    }

    struct DownStore;

    impl UserStore for DownStore {
        fn find_user(&self, _: UserId) -> Result<Option<UserRecord>, StoreError> { Err(StoreError::Unavailable("down".into())) }
        fn find_user_by_email(&self, _: &str) -> Result<Option<UserRecord>, StoreError> { Err(StoreError::Unavailable("down".into())) }
        fn find_micropost(&self, _: MicropostId) -> Result<Option<MicropostRecord>, StoreError> { Err(StoreError::Unavailable("down".into())) }
        fn find_relationship(&self, _: RelationshipId) -> Result<Option<RelationshipRecord>, StoreError> { Err(StoreError::Unavailable("down".into())) }
        fn user_count(&self) -> Result<usize, StoreError> { Err(StoreError::Unavailable("down".into())) }
        fn delete_user(&self, _: UserId) -> Result<bool, StoreError> { Err(StoreError::Unavailable("down".into())) }
    }

    #[test]
    fn store_failure_is_not_reported_as_bad_credentials() {
        let creds = CredentialStore::new(Arc::new(DownStore));
        let err = creds.authenticate("user@example.com", "foobar").unwrap_err();
        assert!(matches!(err, AuthFailure::Store(StoreError::Unavailable(_))));
    }
}
