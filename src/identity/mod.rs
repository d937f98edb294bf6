//! Identity, sessions and access control for the micropost application.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod credentials;
mod session;
mod ownership;
mod authorizer;
mod intent;
mod provider;
mod request_context;

pub use principal::{UserId, MicropostId, RelationshipId, UserIdentity};
pub use credentials::CredentialStore;
pub use session::{Persistence, Session, SessionManager, SessionToken};
pub use ownership::{OwnershipResolver, ResolveError, ResourceKind, ResourceRef};
pub use authorizer::{decide, AccessDecision, Action, Guard, Mode, RedirectTarget, Verb};
pub use intent::{IntentTracker, VisitorId};
pub use provider::{AuthProvider, LocalAuthProvider, SignInRequest, SignInResponse};
pub use request_context::RequestContext;
