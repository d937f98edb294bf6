//! Access decisions for page fetches and form submissions.
//!
//! `decide` is the whole policy and is a pure function of its inputs. `Guard`
//! wraps it with the ownership lookup so callers can pass a resource reference
//! instead of a pre-resolved owner.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;

use super::ownership::{OwnershipResolver, ResolveError, ResourceKind, ResourceRef};
use super::principal::{UserId, UserIdentity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    ViewPage,
    Submit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Read,
    List,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub mode: Mode,
    pub kind: ResourceKind,
    pub verb: Verb,
}

impl Action {
    pub const fn new(mode: Mode, kind: ResourceKind, verb: Verb) -> Self {
        Self { mode, kind, verb }
    }

    pub const fn page(kind: ResourceKind, verb: Verb) -> Self { Self::new(Mode::ViewPage, kind, verb) }

    pub const fn submit(kind: ResourceKind, verb: Verb) -> Self { Self::new(Mode::Submit, kind, verb) }

    /// Whether an anonymous visitor is bounced to sign-in.
    pub fn requires_authentication(&self) -> bool {
        match self.kind {
            // profile pages and sign-up stay public
            ResourceKind::User => matches!(self.verb, Verb::List | Verb::Update | Verb::Delete),
            ResourceKind::Micropost => matches!(self.verb, Verb::Create | Verb::Update | Verb::Delete),
            ResourceKind::Relationship => true,
        }
    }

    /// Whether the acting user must own the target.
    pub fn is_ownership_sensitive(&self) -> bool {
        matches!(self.verb, Verb::Update | Verb::Delete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectTarget {
    SignInPage,
    RootPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "decision", content = "target", rename_all = "snake_case")]
pub enum AccessDecision {
    Allow,
    DenyRedirect(RedirectTarget),
    DenyForbidden,
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool { matches!(self, AccessDecision::Allow) }
}

/// Decision table, first match wins:
/// 1. protected action, nobody signed in: redirect to sign-in;
/// 2. update/delete of someone else's resource by a non-admin: redirect to root;
/// 3. deleting your own user account: forbidden, admins included;
/// 4. allow.
///
/// `owner` is the resolved owner of the target, `None` when the action has no
/// target (index pages, create forms). An update or delete without an owner
/// names nothing that can be checked and is forbidden.
pub fn decide(identity: Option<&UserIdentity>, action: Action, owner: Option<UserId>) -> AccessDecision {
    let Some(who) = identity else {
        return if action.requires_authentication() {
            AccessDecision::DenyRedirect(RedirectTarget::SignInPage)
        } else {
            AccessDecision::Allow
        };
    };
    if action.is_ownership_sensitive() {
        let Some(owner) = owner else {
            return AccessDecision::DenyForbidden;
        };
        if owner != who.id && !who.is_admin {
            return AccessDecision::DenyRedirect(RedirectTarget::RootPage);
        }
        if action.kind == ResourceKind::User && action.verb == Verb::Delete && owner == who.id {
            return AccessDecision::DenyForbidden;
        }
    }
    AccessDecision::Allow
}

/// `decide` plus the ownership lookup. Safe to share across request threads.
#[derive(Clone)]
pub struct Guard {
    resolver: OwnershipResolver,
}

impl Guard {
    pub fn new(resolver: OwnershipResolver) -> Self { Self { resolver } }

    /// The resolver is consulted for every ownership-sensitive action with a
    /// target, and only once authentication has been established. A target that
    /// does not exist, or is not named at all, is never allowed.
    pub fn evaluate(
        &self,
        identity: Option<&UserIdentity>,
        action: Action,
        resource: Option<&ResourceRef>,
    ) -> Result<AccessDecision, StoreError> {
        if identity.is_none() && action.requires_authentication() {
            let d = AccessDecision::DenyRedirect(RedirectTarget::SignInPage);
            debug!(target: "micropost_auth::guard", "guard: anonymous {:?} -> {:?}", action, d);
            return Ok(d);
        }
        let owner = match resource {
            Some(r) if identity.is_some() && action.is_ownership_sensitive() => match self.resolver.resolve_owner(r) {
                Ok(owner) => Some(owner),
                Err(ResolveError::NotFound(missing)) => {
                    debug!(target: "micropost_auth::guard", "guard: {} missing -> DenyForbidden", missing);
                    return Ok(AccessDecision::DenyForbidden);
                }
                Err(ResolveError::Store(e)) => return Err(e),
            },
            None if identity.is_some() && action.is_ownership_sensitive() => {
                debug!(target: "micropost_auth::guard", "guard: {:?} without a target -> DenyForbidden", action);
                return Ok(AccessDecision::DenyForbidden);
            }
            _ => None,
        };
        let d = decide(identity, action, owner);
        debug!(
            target: "micropost_auth::guard",
            "guard: user={:?} action={:?} owner={:?} -> {:?}",
            identity.map(|i| i.id), action, owner, d
        );
        Ok(d)
    }
}

#[cfg(test)]
#[path = "authorizer_tests.rs"]
mod tests;
