//! Identity of the caller, as forwarded by the fronting proxy.
//!
//! The `X-Username` and `X-Role` headers are trusted as sent. The service must
//! only be reachable through a proxy that authenticates the user, strips any
//! client-supplied copies of these headers and sets them itself; exposed
//! directly, any client can claim `admin`.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

pub const USERNAME_HEADER: &str = "x-username";
pub const ROLE_HEADER: &str = "x-role";

/// The user on whose behalf a request runs.
///
/// Identity is established upstream (login and token checks live outside this
/// service); handlers only read the forwarded username and role headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub username: String,
    pub role: String,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Actor {
            username: header(parts, USERNAME_HEADER).unwrap_or("anonymous").to_string(),
            role: header(parts, ROLE_HEADER).unwrap_or("employee").to_lowercase(),
        })
    }
}
