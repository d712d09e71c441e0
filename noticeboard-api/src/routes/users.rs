/// User account endpoints
///
/// # Endpoints
///
/// - `POST /users/register` - Register a dashboard user
/// - `POST /users/login` - Exchange credentials for a token
/// - `GET /users/profile` - Current user (auth)
/// - `GET /users/logout` - Blacklist the current token (auth)
/// - `GET /users/all` - Every other user (auth)

use crate::{
    app::{removal_cookie, session_cookie, AppState},
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use noticeboard_shared::{
    auth::{
        blacklist::revocation_ttl,
        jwt::{self, Claims},
        middleware::AuthContext,
        password,
    },
    models::user::{CreateUser, User, UserSummary},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name
    #[validate(length(min = 2, message = "Name must be at least 2 characters long"))]
    pub name: String,

    /// Email address
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,

    /// Password
    #[validate(length(min = 3, message = "Password must be at least 3 characters long"))]
    pub password: String,
}

/// Register response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserSummary,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,

    /// Password
    #[validate(length(min = 3, message = "Password must be at least 3 characters long"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserSummary,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Register a new user
///
/// ```text
/// POST /users/register
/// Content-Type: application/json
///
/// { "name": "Ada Lovelace", "email": "ada@example.com", "password": "secret" }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `400 Bad Request`: Email is already registered
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    req.validate()?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name,
            email: req.email,
            password_hash,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: user.summary(),
        }),
    ))
}

/// Login endpoint
///
/// Returns the token in the body and also sets it as the `token` cookie.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `401 Unauthorized`: Unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Email is not registered".to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login with incorrect password");
        return Err(ApiError::Unauthorized("Incorrect password".to_string()));
    }

    let claims = Claims::with_expiration(
        user.id,
        user.email.clone(),
        user.name.clone(),
        chrono::Duration::hours(state.config.jwt.expiration_hours),
    );
    let token = jwt::create_token(&claims, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, "User logged in");

    let jar = jar.add(session_cookie(token.clone(), state.config.api.production));

    Ok((
        jar,
        Json(LoginResponse {
            user: user.summary(),
            token,
        }),
    ))
}

/// Current user, straight from the token
pub async fn profile(Extension(auth): Extension<AuthContext>) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        user: UserSummary {
            id: auth.user_id,
            name: auth.name,
            email: auth.email,
        },
    })
}

/// Logout endpoint
///
/// Blacklists the presented token until it would have expired and clears
/// the `token` cookie.
///
/// # Errors
///
/// - `503 Service Unavailable`: Blacklist store unreachable
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<MessageResponse>)> {
    let ttl = revocation_ttl(&auth.claims());
    state.blacklist.revoke(&auth.token, ttl).await?;

    tracing::info!(user_id = %auth.user_id, ttl_secs = ttl.as_secs(), "User logged out");

    Ok((
        jar.remove(removal_cookie()),
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    ))
}

/// Every registered user except the caller
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UsersResponse>> {
    let users = User::list_except(&state.db, auth.user_id).await?;

    Ok(Json(UsersResponse {
        users: users.iter().map(UserSummary::from).collect(),
    }))
}
