//! Bearer-token extractors.
//!
//! Tokens are validated against the store's session table; sessions are
//! issued elsewhere. A malformed or unknown token is always rejected, even
//! on routes that would otherwise fall back to the demo user.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use super::AppState;
use super::error::ApiError;

/// The acting user. Falls back to the configured demo user when the request
/// carries no `Authorization` header at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

/// The acting user, authenticated by bearer token. No fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

enum Credentials<'a> {
    Missing,
    Bearer(&'a str),
    Malformed,
}

fn credentials(parts: &Parts) -> Credentials<'_> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Credentials::Missing;
    };
    match value.to_str().ok().and_then(|v| v.strip_prefix("Bearer ")).map(str::trim) {
        Some(token) if !token.is_empty() => Credentials::Bearer(token),
        _ => Credentials::Malformed,
    }
}

fn authenticate(state: &AppState, token: &str) -> Result<String, ApiError> {
    match state.store.session_user(token) {
        Ok(Some(user_id)) => Ok(user_id),
        Ok(None) => Err(ApiError::Unauthorized(state.locale.unauthorized().to_string())),
        Err(e) => Err(ApiError::storage(state.locale.storage_failed(), e)),
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match credentials(parts) {
            Credentials::Bearer(token) => authenticate(state, token).map(CurrentUser),
            Credentials::Missing => match &state.config.server.demo_user {
                Some(demo) => Ok(CurrentUser(demo.clone())),
                None => Err(ApiError::Unauthorized(state.locale.unauthorized().to_string())),
            },
            Credentials::Malformed => Err(ApiError::Unauthorized(state.locale.unauthorized().to_string())),
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match credentials(parts) {
            Credentials::Bearer(token) => authenticate(state, token).map(AuthUser),
            Credentials::Missing | Credentials::Malformed => {
                Err(ApiError::Unauthorized(state.locale.unauthorized().to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/subscriptions");
        if let Some(a) = auth {
            builder = builder.header(header::AUTHORIZATION, a);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn credential_shapes() {
        assert!(matches!(credentials(&parts(None)), Credentials::Missing));
        assert!(matches!(credentials(&parts(Some("Bearer abc"))), Credentials::Bearer("abc")));
        assert!(matches!(credentials(&parts(Some("Bearer "))), Credentials::Malformed));
        assert!(matches!(credentials(&parts(Some("Basic dXNlcg=="))), Credentials::Malformed));
    }
}
