//! Session guard. Handlers that take a [`CurrentUser`] never run for an
//! anonymous request; the extractor redirects to the sign-in page first.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
    response::Redirect,
};
use tracing::debug;

pub const SIGN_IN_PATH: &str = "/auth";
pub const USER_HEADER: &str = "x-user-id";
pub const USER_COOKIE: &str = "uid";

const MAX_USER_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match user_from_headers(&parts.headers) {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                debug!(path = %parts.uri.path(), "no signed-in user, redirecting");
                Err(Redirect::to(SIGN_IN_PATH))
            }
        }
    }
}

/// Identity from the `x-user-id` header, falling back to the `uid` cookie.
pub fn user_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let from_cookie = || {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == USER_COOKIE)
            .map(|(_, value)| value.to_string())
    };

    from_header
        .or_else(from_cookie)
        .map(|user| user.trim().to_string())
        .filter(|user| is_valid_user_id(user))
}

pub fn is_valid_user_id(user: &str) -> bool {
    !user.is_empty()
        && user.len() <= MAX_USER_LEN
        && user
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '@'))
}

pub fn sign_in_cookie(user: &str) -> String {
    format!("{USER_COOKIE}={user}; Path=/; HttpOnly; SameSite=Lax")
}

pub fn sign_out_cookie() -> String {
    format!("{USER_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
