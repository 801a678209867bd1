use crate::domain::user::UserIdentity;
use crate::domain::user::driving_ports::IdentityPort;
use crate::routing_utils::UnauthorizedResponse;
use crate::{SharedData, domain};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use tracing::warn;

/// Cookie the identity provider's browser SDK keeps the access token in
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

/// The identity behind a request, if any. Requests without a token are anonymous; requests
/// with a token that fails verification are rejected with a 401.
pub struct CurrentUser(pub Option<UserIdentity>);

/// Pulls the raw access token off a request, preferring an `Authorization: Bearer` header
/// over the session cookie
fn access_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned);

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_owned())
    })
}

#[async_trait]
impl FromRequestParts<Arc<SharedData>> for CurrentUser {
    type Rejection = UnauthorizedResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<SharedData>,
    ) -> Result<Self, Self::Rejection> {
        // Single-user mode runs without a verifier and never needs to know who's asking
        let Some(verifier) = state.token_verifier.as_ref() else {
            return Ok(CurrentUser(None));
        };

        let token = access_token(&parts.headers);
        let user_service = domain::user::UserService {};
        let viewer = user_service
            .current_user(token.as_deref(), verifier)
            .map_err(|err| {
                warn!("Rejected request: {err:#}");
                UnauthorizedResponse::from(err)
            })?;

        Ok(CurrentUser(viewer))
    }
}
