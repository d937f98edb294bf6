//!
//! Request gate
//! ------------
//! The per-request sequence a web layer runs against the auth core, without any
//! web framework attached:
//! - resolve the session token (absent, unknown and expired all mean anonymous);
//! - ask the guard about the route's action and target;
//! - on a sign-in redirect for a page fetch, remember the page for after sign-in.
//!
//! Sign-in, sign-out and the admin user deletion also go through here so the
//! intent hand-off and the "delete only when allowed" rule live in one place.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use crate::identity::{
    AccessDecision, AuthProvider, CredentialStore, Guard, IntentTracker, LocalAuthProvider, OwnershipResolver,
    RedirectTarget, RequestContext, SessionManager, SignInRequest, SignInResponse, UserId, UserIdentity,
};
use crate::routes::{Method, Route};
use crate::storage::SharedStore;

#[derive(Debug, Clone, Serialize)]
pub struct GateOutcome {
    pub decision: AccessDecision,
    /// Who the request was evaluated as.
    pub identity: Option<UserIdentity>,
    /// Location header for denied requests.
    pub redirect_to: Option<String>,
}

pub struct RequestGate {
    cfg: AuthConfig,
    store: SharedStore,
    sessions: Arc<SessionManager>,
    intents: Arc<IntentTracker>,
    guard: Guard,
    provider: LocalAuthProvider,
}

impl RequestGate {
    pub fn new(store: SharedStore, cfg: AuthConfig) -> Self {
        let sessions = Arc::new(SessionManager::new(store.clone(), &cfg));
        let intents = Arc::new(IntentTracker::new(cfg.intent_ttl_secs));
        let guard = Guard::new(OwnershipResolver::new(store.clone()));
        let provider = LocalAuthProvider::new(CredentialStore::new(store.clone()), sessions.clone(), intents.clone());
        Self { cfg, store, sessions, intents, guard, provider }
    }

    pub fn config(&self) -> &AuthConfig { &self.cfg }
    pub fn sessions(&self) -> &SessionManager { &self.sessions }
    pub fn intents(&self) -> &IntentTracker { &self.intents }

    pub fn current_user(&self, ctx: &RequestContext) -> Option<UserIdentity> {
        ctx.session_token.as_ref().and_then(|t| self.sessions.resolve_session(t))
    }

    fn location(target: RedirectTarget) -> String {
        match target {
            RedirectTarget::SignInPage => Route::SignInPage.path(),
            RedirectTarget::RootPage => Route::Root.path(),
        }
    }

    pub fn handle(&self, ctx: &RequestContext, route: &Route) -> AppResult<GateOutcome> {
        let identity = self.current_user(ctx);
        let decision = match route.action() {
            None => AccessDecision::Allow,
            Some((action, resource)) => self.guard.evaluate(identity.as_ref(), action, resource.as_ref())?,
        };
        let redirect_to = match decision {
            AccessDecision::DenyRedirect(target) => {
                // submissions are bounced without remembering them
                if target == RedirectTarget::SignInPage && route.method() == Method::Get {
                    self.intents.record_intent(ctx.visitor, &route.path());
                }
                Some(Self::location(target))
            }
            AccessDecision::Allow | AccessDecision::DenyForbidden => None,
        };
        info!(
            target: "micropost_auth::gate",
            "gate req={} {} user={:?} -> {:?}",
            ctx.request_id, route, identity.as_ref().map(|i| i.id), decision
        );
        Ok(GateOutcome { decision, identity, redirect_to })
    }

    /// POST /sessions. On success the pending intent (or the profile page) is the
    /// redirect; on failure the intent is left for the next attempt.
    pub fn sign_in(&self, ctx: &RequestContext, email: &str, password: &str, remember_me: bool) -> AppResult<SignInResponse> {
        let req = SignInRequest { email: email.to_string(), password: password.to_string(), remember_me, visitor: ctx.visitor };
        self.provider.sign_in(&req).map_err(|e| {
            warn!(target: "micropost_auth::gate", "gate req={} sign-in rejected", ctx.request_id);
            AppError::from(e)
        })
    }

    /// DELETE /signout. Always ends on the root page.
    pub fn sign_out(&self, ctx: &RequestContext) -> String {
        if let Some(t) = ctx.session_token.as_ref() {
            self.provider.sign_out(t);
        }
        Route::Root.path()
    }

    /// DELETE /users/:id. The record is removed only on `Allow`; every other
    /// decision leaves the store untouched.
    pub fn destroy_user(&self, ctx: &RequestContext, target: UserId) -> AppResult<GateOutcome> {
        let outcome = self.handle(ctx, &Route::DestroyUser(target))?;
        if outcome.decision.is_allowed() {
            if self.store.delete_user(target)? {
                let revoked = self.sessions.revoke_user(target);
                info!(target: "micropost_auth::gate", "user {} deleted, {} sessions revoked", target, revoked);
            }
        }
        Ok(outcome)
    }
}
