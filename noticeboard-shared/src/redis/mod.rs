/// Redis integration
///
/// Redis holds the logout blacklist: one key per logged-out token, expiring
/// with the token (see [`crate::auth::blacklist`]).
///
/// # Example
///
/// ```no_run
/// use noticeboard_shared::redis::client::{RedisClient, RedisConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = RedisConfig::with_url("redis://localhost:6379");
/// let client = RedisClient::new(config).await?;
///
/// let healthy = client.ping().await?;
/// println!("Redis healthy: {}", healthy);
/// # Ok(())
/// # }
/// ```

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig};
