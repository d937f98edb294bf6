//! Route catalogue for the micropost application.
//!
//! Each route knows its HTTP method, its canonical path and the `Action` (plus
//! target resource) it asks the guard about. Sign-in and sign-out are handled by
//! the gate directly and carry no action.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::identity::{Action, MicropostId, RelationshipId, ResourceKind, ResourceRef, UserId, Verb};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PATCH" | "PUT" => Some(Method::Patch),
            "DELETE" => Some(Method::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    Root,
    SignInPage,
    CreateSession,
    DestroySession,
    SignUpPage,
    UsersIndex,
    CreateUser,
    ShowUser(UserId),
    EditUser(UserId),
    UpdateUser(UserId),
    DestroyUser(UserId),
    Following(UserId),
    Followers(UserId),
    CreateMicropost,
    DestroyMicropost(MicropostId),
    CreateRelationship,
    DestroyRelationship(RelationshipId),
}

static USER_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/users/(\d+)(/edit|/following|/followers)?$").unwrap());
static MICROPOST_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/microposts/(\d+)$").unwrap());
static RELATIONSHIP_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/relationships/(\d+)$").unwrap());

fn id_from(re: &Regex, path: &str) -> Option<(u64, Option<String>)> {
    let caps = re.captures(path)?;
    let id = caps.get(1)?.as_str().parse().ok()?;
    Some((id, caps.get(2).map(|m| m.as_str().to_string())))
}

impl Route {
    pub fn method(&self) -> Method {
        match self {
            Route::Root
            | Route::SignInPage
            | Route::SignUpPage
            | Route::UsersIndex
            | Route::ShowUser(_)
            | Route::EditUser(_)
            | Route::Following(_)
            | Route::Followers(_) => Method::Get,
            Route::CreateSession | Route::CreateUser | Route::CreateMicropost | Route::CreateRelationship => Method::Post,
            Route::UpdateUser(_) => Method::Patch,
            Route::DestroySession | Route::DestroyUser(_) | Route::DestroyMicropost(_) | Route::DestroyRelationship(_) => Method::Delete,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Root => "/".to_string(),
            Route::SignInPage => "/signin".to_string(),
            Route::CreateSession => "/sessions".to_string(),
            Route::DestroySession => "/signout".to_string(),
            Route::SignUpPage => "/signup".to_string(),
            Route::UsersIndex | Route::CreateUser => "/users".to_string(),
            Route::ShowUser(id) | Route::UpdateUser(id) | Route::DestroyUser(id) => format!("/users/{}", id.0),
            Route::EditUser(id) => format!("/users/{}/edit", id.0),
            Route::Following(id) => format!("/users/{}/following", id.0),
            Route::Followers(id) => format!("/users/{}/followers", id.0),
            Route::CreateMicropost => "/microposts".to_string(),
            Route::DestroyMicropost(id) => format!("/microposts/{}", id.0),
            Route::CreateRelationship => "/relationships".to_string(),
            Route::DestroyRelationship(id) => format!("/relationships/{}", id.0),
        }
    }

    /// Query strings and a trailing slash are ignored.
    pub fn parse(method: Method, raw_path: &str) -> Option<Route> {
        let path = raw_path.split('?').next().unwrap_or("");
        let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };
        let fixed = match (method, path) {
            (Method::Get, "/") => Some(Route::Root),
            (Method::Get, "/signin") => Some(Route::SignInPage),
            (Method::Post, "/sessions") => Some(Route::CreateSession),
            (Method::Delete, "/signout") => Some(Route::DestroySession),
            (Method::Get, "/signup") => Some(Route::SignUpPage),
            (Method::Get, "/users") => Some(Route::UsersIndex),
            (Method::Post, "/users") => Some(Route::CreateUser),
            (Method::Post, "/microposts") => Some(Route::CreateMicropost),
            (Method::Post, "/relationships") => Some(Route::CreateRelationship),
            _ => None,
        };
        if fixed.is_some() {
            return fixed;
        }
        if let Some((id, suffix)) = id_from(&USER_PATH, path) {
            let uid = UserId(id);
            return match (method, suffix.as_deref()) {
                (Method::Get, None) => Some(Route::ShowUser(uid)),
                (Method::Get, Some("/edit")) => Some(Route::EditUser(uid)),
                (Method::Get, Some("/following")) => Some(Route::Following(uid)),
                (Method::Get, Some("/followers")) => Some(Route::Followers(uid)),
                (Method::Patch, None) => Some(Route::UpdateUser(uid)),
                (Method::Delete, None) => Some(Route::DestroyUser(uid)),
                _ => None,
            };
        }
        if let Some((id, _)) = id_from(&MICROPOST_PATH, path) {
            return (method == Method::Delete).then_some(Route::DestroyMicropost(MicropostId(id)));
        }
        if let Some((id, _)) = id_from(&RELATIONSHIP_PATH, path) {
            return (method == Method::Delete).then_some(Route::DestroyRelationship(RelationshipId(id)));
        }
        None
    }

    /// The guard question this route asks, `None` for routes open to everyone.
    pub fn action(&self) -> Option<(Action, Option<ResourceRef>)> {
        use ResourceKind::*;
        let r = match *self {
            Route::Root | Route::SignInPage | Route::CreateSession | Route::DestroySession => return None,
            Route::SignUpPage => (Action::page(User, Verb::Create), None),
            Route::CreateUser => (Action::submit(User, Verb::Create), None),
            Route::UsersIndex => (Action::page(User, Verb::List), None),
            Route::ShowUser(id) => (Action::page(User, Verb::Read), Some(ResourceRef::user(id))),
            Route::EditUser(id) => (Action::page(User, Verb::Update), Some(ResourceRef::user(id))),
            Route::UpdateUser(id) => (Action::submit(User, Verb::Update), Some(ResourceRef::user(id))),
            Route::DestroyUser(id) => (Action::submit(User, Verb::Delete), Some(ResourceRef::user(id))),
            Route::Following(id) | Route::Followers(id) => (Action::page(Relationship, Verb::List), Some(ResourceRef::user(id))),
            Route::CreateMicropost => (Action::submit(Micropost, Verb::Create), None),
            Route::DestroyMicropost(id) => (Action::submit(Micropost, Verb::Delete), Some(ResourceRef::micropost(id))),
            Route::CreateRelationship => (Action::submit(Relationship, Verb::Create), None),
            Route::DestroyRelationship(id) => (Action::submit(Relationship, Verb::Delete), Some(ResourceRef::relationship(id))),
        };
        Some(r)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}
