/// Logout blacklist for JWT tokens
///
/// JWTs stay valid until they expire, so logging out has to be enforced on
/// the server: the token is written to a denylist that the auth middleware
/// consults before accepting any token. Entries expire together with the
/// token they deny, so the list never grows beyond the set of live tokens.
///
/// Two stores implement [`TokenBlacklist`]:
///
/// - [`RedisTokenBlacklist`]: production store, `SET key "logout" EX ttl`
/// - [`MemoryTokenBlacklist`]: in-process store for tests and local runs
///
/// Tokens are keyed by their SHA-256 digest (`blacklist:<hex>`), so raw
/// bearer credentials never sit in Redis.
///
/// # Example
///
/// ```
/// use noticeboard_shared::auth::blacklist::{MemoryTokenBlacklist, TokenBlacklist};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let blacklist = MemoryTokenBlacklist::new();
///
/// blacklist.revoke("eyJ...", Duration::from_secs(3600)).await?;
/// assert!(blacklist.is_revoked("eyJ...").await?);
/// # Ok(())
/// # }
/// ```

use crate::auth::jwt::Claims;
use crate::redis::client::RedisClient;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Key prefix for blacklisted tokens
pub const KEY_PREFIX: &str = "blacklist:";

/// Blacklist errors
#[derive(Debug, thiserror::Error)]
pub enum BlacklistError {
    /// Backing store could not be reached or rejected the command
    #[error("Blacklist store error: {0}")]
    Store(String),
}

impl From<redis::RedisError> for BlacklistError {
    fn from(err: redis::RedisError) -> Self {
        BlacklistError::Store(err.to_string())
    }
}

/// Denylist of logged-out tokens
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    /// Denies `token` for `ttl`
    async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), BlacklistError>;

    /// Whether `token` is currently denied
    async fn is_revoked(&self, token: &str) -> Result<bool, BlacklistError>;

    /// Whether the backing store is reachable
    async fn is_healthy(&self) -> bool;
}

/// Builds the storage key for a token
pub fn blacklist_key(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{}{}", KEY_PREFIX, hex::encode(digest))
}

/// How long a token must stay blacklisted
///
/// Matches the token's remaining lifetime, never less than one second so the
/// entry is always written.
pub fn revocation_ttl(claims: &Claims) -> Duration {
    let seconds = claims
        .time_until_expiration()
        .map(|d| d.num_seconds())
        .unwrap_or(0)
        .max(1);

    Duration::from_secs(seconds as u64)
}

/// Awaits a store command, giving up after `limit`
async fn within<T>(
    limit: Duration,
    command: impl Future<Output = Result<T, redis::RedisError>>,
) -> Result<T, BlacklistError> {
    tokio::time::timeout(limit, command)
        .await
        .map_err(|_| {
            BlacklistError::Store(format!("Command timed out after {}ms", limit.as_millis()))
        })?
        .map_err(BlacklistError::from)
}

/// Redis-backed blacklist
///
/// Every command is bounded by the client's command timeout.
#[derive(Clone)]
pub struct RedisTokenBlacklist {
    client: RedisClient,
}

impl RedisTokenBlacklist {
    /// Creates a blacklist on top of a connected client
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenBlacklist for RedisTokenBlacklist {
    async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), BlacklistError> {
        let mut conn = self.client.get_connection();
        let key = blacklist_key(token);

        let _: () = within(
            self.client.command_timeout(),
            redis::cmd("SET")
                .arg(&key)
                .arg("logout")
                .arg("EX")
                .arg(ttl.as_secs().max(1))
                .query_async(&mut conn),
        )
        .await?;

        tracing::debug!(ttl_secs = ttl.as_secs(), "Token blacklisted");
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, BlacklistError> {
        let mut conn = self.client.get_connection();

        let exists: bool = within(
            self.client.command_timeout(),
            redis::cmd("EXISTS")
                .arg(blacklist_key(token))
                .query_async(&mut conn),
        )
        .await?;

        Ok(exists)
    }

    async fn is_healthy(&self) -> bool {
        self.client.ping().await.unwrap_or(false)
    }
}

/// In-memory blacklist
///
/// Entries expire lazily on lookup. Uses tokio's clock, so tests can drive
/// expiry with `tokio::time::pause` / `advance`.
#[derive(Default)]
pub struct MemoryTokenBlacklist {
    entries: RwLock<HashMap<String, Instant>>,
}

impl MemoryTokenBlacklist {
    /// Creates an empty blacklist
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no entries are stored
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops expired entries
    pub async fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.write().await.retain(|_, expires_at| *expires_at > now);
    }
}

#[async_trait]
impl TokenBlacklist for MemoryTokenBlacklist {
    async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), BlacklistError> {
        let ttl = ttl.max(Duration::from_secs(1));
        self.entries
            .write()
            .await
            .insert(blacklist_key(token), Instant::now() + ttl);
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, BlacklistError> {
        let key = blacklist_key(token);
        let expires_at = self.entries.read().await.get(&key).copied();

        match expires_at {
            Some(at) if at > Instant::now() => Ok(true),
            Some(_) => {
                self.entries.write().await.remove(&key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn is_healthy(&self) -> bool {
        true
    }
}
