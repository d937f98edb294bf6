use std::sync::Arc;

use tracing::info;

use crate::error::AuthFailure;

use super::credentials::CredentialStore;
use super::intent::{IntentTracker, VisitorId};
use super::principal::UserIdentity;
use super::session::{Persistence, Session, SessionManager, SessionToken};

#[derive(Debug, Clone)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
    pub visitor: VisitorId,
}

#[derive(Debug, Clone)]
pub struct SignInResponse {
    pub identity: UserIdentity,
    pub session: Session,
    /// Where to send the user next: the page they were bounced from, or their profile.
    pub redirect_to: String,
}

pub trait AuthProvider: Send + Sync {
    fn sign_in(&self, req: &SignInRequest) -> Result<SignInResponse, AuthFailure>;
    fn sign_out(&self, token: &SessionToken);
}

/// Credential check, session issue and intent hand-off against local stores.
pub struct LocalAuthProvider {
    pub credentials: CredentialStore,
    pub sessions: Arc<SessionManager>,
    pub intents: Arc<IntentTracker>,
}

impl LocalAuthProvider {
    pub fn new(credentials: CredentialStore, sessions: Arc<SessionManager>, intents: Arc<IntentTracker>) -> Self {
        Self { credentials, sessions, intents }
    }
}

impl AuthProvider for LocalAuthProvider {
    fn sign_in(&self, req: &SignInRequest) -> Result<SignInResponse, AuthFailure> {
        // a failed attempt returns here and leaves any pending intent in place
        let identity = self.credentials.authenticate(&req.email, &req.password)?;
        let persistence = if req.remember_me { Persistence::Remembered } else { Persistence::Ephemeral };
        let session = self.sessions.create_session(&identity, persistence)?;
        let redirect_to = self.intents.consume_intent(req.visitor, &identity.landing_path());
        info!(target: "micropost_auth::auth", "auth.sign_in user={} token={}.. redirect={}", identity.id, session.token.short(), redirect_to);
        Ok(SignInResponse { identity, session, redirect_to })
    }

    fn sign_out(&self, token: &SessionToken) {
        self.sessions.destroy_session(token);
    }
}
