use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! record_id {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $label, self.0)
            }
        }
    };
}

record_id!(UserId, "user");
record_id!(MicropostId, "micropost");
record_id!(RelationshipId, "relationship");

/// The signed-in user as seen by the auth core. The password credential never
/// leaves the store record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl UserIdentity {
    /// Default post sign-in destination: the user's profile page.
    pub fn landing_path(&self) -> String {
        format!("/users/{}", self.id.0)
    }
}
