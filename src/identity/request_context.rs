use uuid::Uuid;

use super::{SessionToken, VisitorId};

/// What a single request carries into the auth core: which visitor it came from
/// and the session token, if the visitor holds one.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub visitor: VisitorId,
    pub session_token: Option<SessionToken>,
    pub request_id: String,
}

impl RequestContext {
    pub fn anonymous(visitor: VisitorId) -> Self {
        Self { visitor, session_token: None, request_id: Uuid::new_v4().to_string() }
    }

    pub fn with_token(visitor: VisitorId, token: SessionToken) -> Self {
        Self { session_token: Some(token), ..Self::anonymous(visitor) }
    }
}
