//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - Test database setup and cleanup
//! - Temporary upload directory
//! - Test user creation and JWT token generation
//! - Request helpers (JSON and multipart bodies)
//!
//! Tests need PostgreSQL at `TEST_DATABASE_URL` (falls back to
//! `DATABASE_URL`). The token blacklist is kept in memory.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response};
use noticeboard_api::app::{build_router, AppState};
use noticeboard_api::config::Config;
use noticeboard_shared::auth::blacklist::{MemoryTokenBlacklist, TokenBlacklist};
use noticeboard_shared::auth::jwt::{create_token, Claims};
use noticeboard_shared::auth::password::hash_password;
use noticeboard_shared::models::user::{CreateUser, User};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const BOUNDARY: &str = "noticeboard-test-boundary";

/// Password of the user created by [`TestContext::new`]
pub const TEST_PASSWORD: &str = "correct horse";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
    pub blacklist: Arc<MemoryTokenBlacklist>,
    pub user: User,
    pub jwt_token: String,
    pub uploads: TempDir,
}

impl TestContext {
    /// Creates a new test context with a migrated database and a fresh user
    pub async fn new() -> anyhow::Result<Self> {
        let uploads = TempDir::new()?;
        let mut config = Config::for_tests(uploads.path());
        if let Ok(url) = std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            config.database.url = url;
        }

        let db = PgPool::connect(&config.database.url).await?;

        // Path relative to Cargo.toml, not this file
        sqlx::migrate!("../migrations").run(&db).await?;

        let user = User::create(
            &db,
            CreateUser {
                name: "Test User".to_string(),
                email: format!("test-{}@example.com", Uuid::new_v4()),
                password_hash: hash_password(TEST_PASSWORD)?,
            },
        )
        .await?;

        let claims = Claims::with_expiration(
            user.id,
            user.email.clone(),
            user.name.clone(),
            chrono::Duration::hours(config.jwt.expiration_hours),
        );
        let jwt_token = create_token(&claims, &config.jwt.secret)?;

        let blacklist = Arc::new(MemoryTokenBlacklist::new());
        let shared: Arc<dyn TokenBlacklist> = blacklist.clone();
        let app = build_router(AppState::new(db.clone(), shared, config.clone()));

        Ok(TestContext {
            db,
            app,
            config,
            blacklist,
            user,
            jwt_token,
            uploads,
        })
    }

    /// Returns authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.jwt_token)
    }

    /// Sends one request through the router
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Number of files currently in the upload directory
    pub fn stored_file_count(&self) -> usize {
        std::fs::read_dir(self.uploads.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// Cleans up test data
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        User::delete(&self.db, self.user.id).await?;
        Ok(())
    }
}

/// Reads a response body as JSON
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Builds a JSON request
pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).expect("valid request")
}

/// Builds a bodiless request
pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("valid request")
}

/// One part of a multipart body
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        field: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

/// Encodes parts as `multipart/form-data` with [`BOUNDARY`]
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                field,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        field, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Builds a multipart request
pub fn multipart_request(method: &str, uri: &str, token: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .expect("valid request")
}
