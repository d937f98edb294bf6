use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::StoreError;
use crate::storage::SharedStore;

use super::principal::{MicropostId, RelationshipId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    User,
    Micropost,
    Relationship,
}

/// Reference to a record an action targets. The owner is looked up on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: u64,
}

impl ResourceRef {
    pub fn user(id: UserId) -> Self { Self { kind: ResourceKind::User, id: id.0 } }
    pub fn micropost(id: MicropostId) -> Self { Self { kind: ResourceKind::Micropost, id: id.0 } }
    pub fn relationship(id: RelationshipId) -> Self { Self { kind: ResourceKind::Relationship, id: id.0 } }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let k = match self.kind {
            ResourceKind::User => "user",
            ResourceKind::Micropost => "micropost",
            ResourceKind::Relationship => "relationship",
        };
        write!(f, "{}#{}", k, self.id)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{0} not found")]
    NotFound(ResourceRef),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Maps a resource to the user who controls it: a user owns itself, a micropost
/// belongs to its author, a relationship to the follower who created it.
#[derive(Clone)]
pub struct OwnershipResolver {
    store: SharedStore,
}

impl OwnershipResolver {
    pub fn new(store: SharedStore) -> Self { Self { store } }

    pub fn resolve_owner(&self, resource: &ResourceRef) -> Result<UserId, ResolveError> {
        let owner = match resource.kind {
            ResourceKind::User => self.store.find_user(UserId(resource.id))?.map(|u| u.identity.id),
            ResourceKind::Micropost => self.store.find_micropost(MicropostId(resource.id))?.map(|m| m.user_id),
            ResourceKind::Relationship => self.store.find_relationship(RelationshipId(resource.id))?.map(|r| r.follower_id),
        };
        owner.ok_or(ResolveError::NotFound(*resource))
    }
}
