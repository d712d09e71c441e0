/// Request authentication for Axum handlers
///
/// The API's auth layer pulls a token out of the request and hands it to
/// [`authenticate`], which checks the logout blacklist first and then the
/// token itself. On success the resulting [`AuthContext`] is inserted into
/// the request extensions.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use noticeboard_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, {}!", auth.name)
/// }
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::blacklist::{BlacklistError, TokenBlacklist};
use super::jwt::{validate_token, Claims, JwtError};

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// User email from the token
    pub email: String,

    /// User display name from the token
    pub name: String,

    /// The raw token, kept so logout can blacklist it
    #[serde(skip_serializing)]
    pub token: String,

    /// When the token stops being valid
    pub expires_at: DateTime<Utc>,
}

impl AuthContext {
    /// Creates auth context from validated claims
    pub fn from_claims(claims: &Claims, token: impl Into<String>) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email.clone(),
            name: claims.name.clone(),
            token: token.into(),
            expires_at: Utc
                .timestamp_opt(claims.exp, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }

    /// Rebuilds the claims this context was created from
    pub fn claims(&self) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: self.user_id,
            email: self.email.clone(),
            name: self.name.clone(),
            iss: super::jwt::ISSUER.to_string(),
            iat: now,
            exp: self.expires_at.timestamp(),
            nbf: now,
        }
    }
}

/// Error type for request authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No token in cookie or Authorization header
    #[error("Missing credentials")]
    MissingCredentials,

    /// Authorization header present but not a Bearer token
    #[error("Invalid authorization format: {0}")]
    InvalidFormat(String),

    /// Token was logged out
    #[error("Token has been revoked")]
    Revoked,

    /// Token failed validation
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Blacklist could not be consulted
    #[error("Blacklist unavailable: {0}")]
    BlacklistUnavailable(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
            other => {
                tracing::debug!(error = %other, "Token rejected");
                AuthError::InvalidToken("Invalid token".to_string())
            }
        }
    }
}

impl From<BlacklistError> for AuthError {
    fn from(err: BlacklistError) -> Self {
        AuthError::BlacklistUnavailable(err.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::MissingCredentials | AuthError::Revoked | AuthError::InvalidToken(_) => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            AuthError::BlacklistUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        (status, self.to_string()).into_response()
    }
}

/// Parses an `Authorization` header value into a bearer token
pub fn parse_bearer(header_value: &str) -> Result<&str, AuthError> {
    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    Ok(token)
}

/// Name of the cookie carrying the session token
pub const TOKEN_COOKIE: &str = "token";

/// Pulls the token out of request headers
///
/// The `token` cookie wins over an `Authorization: Bearer` header.
pub fn extract_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Ok(cookie.value().to_string());
        }
    }

    let header_value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Authorization header is not ASCII".to_string()))?;

    parse_bearer(header_value).map(str::to_string)
}

/// Authenticates a token
///
/// Order matters: a blacklisted token is rejected before its signature is
/// even looked at, so a logged-out token never authenticates.
///
/// # Errors
///
/// - `AuthError::Revoked` for logged-out tokens
/// - `AuthError::InvalidToken` for bad, expired or foreign tokens
/// - `AuthError::BlacklistUnavailable` when the denylist store is down
pub async fn authenticate(
    token: &str,
    secret: &str,
    blacklist: &dyn TokenBlacklist,
) -> Result<AuthContext, AuthError> {
    if blacklist.is_revoked(token).await? {
        tracing::debug!("Rejected blacklisted token");
        return Err(AuthError::Revoked);
    }

    let claims = validate_token(token, secret)?;

    Ok(AuthContext::from_claims(&claims, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::blacklist::MemoryTokenBlacklist;
    use crate::auth::jwt::create_token;
    use std::time::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn token_for(user_id: Uuid) -> String {
        let claims = Claims::new(user_id, "ada@example.com", "Ada");
        create_token(&claims, SECRET).unwrap()
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert!(matches!(
            parse_bearer("Basic dXNlcjpwYXNz"),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_bearer("Bearer "),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn test_extract_token_prefers_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "theme=dark; token=from-cookie".parse().unwrap());
        headers.insert(header::AUTHORIZATION, "Bearer from-header".parse().unwrap());

        assert_eq!(extract_token(&headers).unwrap(), "from-cookie");
    }

    #[test]
    fn test_extract_token_falls_back_to_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer from-header".parse().unwrap());

        assert_eq!(extract_token(&headers).unwrap(), "from-header");
    }

    #[test]
    fn test_extract_token_missing() {
        assert!(matches!(
            extract_token(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_valid_token() {
        let user_id = Uuid::new_v4();
        let token = token_for(user_id);
        let blacklist = MemoryTokenBlacklist::new();

        let ctx = authenticate(&token, SECRET, &blacklist).await.unwrap();

        assert_eq!(ctx.user_id, user_id);
        assert_eq!(ctx.email, "ada@example.com");
        assert_eq!(ctx.name, "Ada");
        assert_eq!(ctx.token, token);
        assert!(ctx.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn test_authenticate_revoked_token() {
        let token = token_for(Uuid::new_v4());
        let blacklist = MemoryTokenBlacklist::new();
        blacklist.revoke(&token, Duration::from_secs(60)).await.unwrap();

        let result = authenticate(&token, SECRET, &blacklist).await;
        assert!(matches!(result, Err(AuthError::Revoked)));
    }

    #[tokio::test]
    async fn test_authenticate_wrong_secret() {
        let token = token_for(Uuid::new_v4());
        let blacklist = MemoryTokenBlacklist::new();

        let result = authenticate(&token, "another-secret-at-least-32-bytes!!", &blacklist).await;
        match result {
            Err(AuthError::InvalidToken(msg)) => assert_eq!(msg, "Invalid token"),
            other => panic!("unexpected {:?}", other.map(|c| c.user_id)),
        }
    }

    #[test]
    fn test_context_claims_roundtrip() {
        let claims = Claims::new(Uuid::new_v4(), "ada@example.com", "Ada");
        let ctx = AuthContext::from_claims(&claims, "tok");
        let rebuilt = ctx.claims();

        assert_eq!(rebuilt.sub, claims.sub);
        assert_eq!(rebuilt.exp, claims.exp);
        assert_eq!(rebuilt.email, claims.email);
    }

    #[test]
    fn test_auth_error_into_response() {
        assert_eq!(
            AuthError::MissingCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::Revoked.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::InvalidFormat("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::BlacklistUnavailable("down".into())
                .into_response()
                .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
