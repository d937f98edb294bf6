use serde::Serialize;

use crate::identity::UserIdentity;
use crate::routes::Route;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub label: &'static str,
    pub href: String,
}

impl NavLink {
    fn to(label: &'static str, route: Route) -> Self {
        Self { label, href: route.path() }
    }
}

/// Header links for the current visitor. Signed-in users get their profile,
/// settings and sign-out; everyone else only gets sign-in.
pub fn links(identity: Option<&UserIdentity>) -> Vec<NavLink> {
    let mut out = vec![NavLink::to("Home", Route::Root)];
    match identity {
        Some(u) => {
            out.push(NavLink::to("Users", Route::UsersIndex));
            out.push(NavLink::to("Profile", Route::ShowUser(u.id)));
            out.push(NavLink::to("Settings", Route::EditUser(u.id)));
            out.push(NavLink::to("Sign out", Route::DestroySession));
        }
        None => out.push(NavLink::to("Sign in", Route::SignInPage)),
    }
    out
}
