/// Authentication utilities
///
/// This module provides the authentication primitives for Noticeboard:
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: JWT token generation and validation
/// - [`blacklist`]: Denylist of logged-out tokens (Redis or in-memory)
/// - [`middleware`]: Request-level auth context and token extraction
///
/// # Example
///
/// ```no_run
/// use noticeboard_shared::auth::password::{hash_password, verify_password};
/// use noticeboard_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// // Password authentication
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// // JWT token generation
/// let claims = Claims::new(Uuid::new_v4(), "ada@example.com", "Ada");
/// let token = create_token(&claims, "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod blacklist;
pub mod jwt;
pub mod middleware;
pub mod password;
