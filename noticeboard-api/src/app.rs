/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use noticeboard_api::{app::AppState, config::Config};
/// use noticeboard_shared::auth::blacklist::{RedisTokenBlacklist, TokenBlacklist};
/// use noticeboard_shared::redis::{RedisClient, RedisConfig};
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let redis = RedisClient::new(RedisConfig::with_url(&config.redis.url)).await?;
/// let blacklist: Arc<dyn TokenBlacklist> = Arc::new(RedisTokenBlacklist::new(redis));
/// let state = AppState::new(pool, blacklist, config);
/// let app = noticeboard_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config, error::ApiError, middleware::security::SecurityHeadersLayer,
    upload::UploadStore,
};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use noticeboard_shared::auth::{
    blacklist::TokenBlacklist,
    middleware::{authenticate, extract_token, AuthError, TOKEN_COOKIE},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Denylist of logged-out tokens
    pub blacklist: Arc<dyn TokenBlacklist>,

    /// Upload directory
    pub uploads: UploadStore,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, blacklist: Arc<dyn TokenBlacklist>, config: Config) -> Self {
        let uploads = UploadStore::new(config.uploads.dir.clone(), config.uploads.max_file_size);

        Self {
            db,
            blacklist,
            uploads,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the `token` cookie for a freshly issued token
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie that clears the `token` cookie in the browser
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE).path("/").build()
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health
/// ├── /users/
/// │   ├── POST /register
/// │   ├── POST /login
/// │   ├── GET  /profile              (auth)
/// │   ├── GET  /logout               (auth)
/// │   └── GET  /all                  (auth)
/// ├── /api/
/// │   ├── POST   /upload                       (auth)
/// │   ├── GET    /get-files
/// │   ├── GET    /files-by-category/:category
/// │   ├── GET    /categories
/// │   ├── PUT    /edit-file/:category/:id      (auth)
/// │   ├── DELETE /delete-file/:category/:id    (auth)
/// │   ├── GET    /gallery
/// │   ├── POST   /gallery                      (auth)
/// │   ├── GET    /gallery/:id
/// │   ├── PUT    /gallery/:id                  (auth)
/// │   └── DELETE /gallery/:id                  (auth)
/// └── GET /files/*                   (uploaded files)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Authentication and body limits (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let auth = || axum::middleware::from_fn_with_state(state.clone(), auth_layer);
    let upload_limit = DefaultBodyLimit::max(state.config.uploads.body_limit());

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_user_routes = Router::new()
        .route("/register", post(routes::users::register))
        .route("/login", post(routes::users::login));

    let private_user_routes = Router::new()
        .route("/profile", get(routes::users::profile))
        .route("/logout", get(routes::users::logout))
        .route("/all", get(routes::users::list_users))
        .route_layer(auth());

    let public_api_routes = Router::new()
        .route("/get-files", get(routes::files::list_files))
        .route(
            "/files-by-category/:category",
            get(routes::files::list_files_by_category),
        )
        .route("/categories", get(routes::files::list_categories))
        .route("/gallery", get(routes::gallery::list_albums))
        .route("/gallery/:id", get(routes::gallery::get_album));

    let private_api_routes = Router::new()
        .route("/upload", post(routes::files::upload_files))
        .route("/edit-file/:category/:id", put(routes::files::edit_file))
        .route(
            "/delete-file/:category/:id",
            axum::routing::delete(routes::files::delete_file),
        )
        .route("/gallery", post(routes::gallery::create_album))
        .route(
            "/gallery/:id",
            put(routes::gallery::update_album).delete(routes::gallery::delete_album),
        )
        .layer(upload_limit)
        .route_layer(auth());

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest(
            "/users",
            public_user_routes.merge(private_user_routes),
        )
        .nest("/api", public_api_routes.merge(private_api_routes))
        .nest_service("/files", ServeDir::new(state.uploads.dir()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Authentication middleware layer
///
/// Takes the token from the `token` cookie or the `Authorization` header,
/// rejects logged-out tokens (clearing the cookie), validates the rest and
/// injects [`AuthContext`](noticeboard_shared::auth::middleware::AuthContext)
/// into request extensions.
pub async fn auth_layer(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let token = match extract_token(req.headers()) {
        Ok(token) => token,
        Err(err) => return ApiError::from(err).into_response(),
    };

    match authenticate(&token, state.jwt_secret(), state.blacklist.as_ref()).await {
        Ok(auth_context) => {
            req.extensions_mut().insert(auth_context);
            next.run(req).await
        }
        Err(AuthError::Revoked) => {
            tracing::debug!("Blacklisted token presented, clearing cookie");
            (
                jar.remove(removal_cookie()),
                ApiError::from(AuthError::Revoked),
            )
                .into_response()
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}
