//! Authentication utilities library
//!
//! Provides reusable authentication infrastructure for the user service:
//! - Password hashing (Argon2id)
//! - Secure random token generation for one-time-use links
//! - Typed JWT session tokens (access/refresh)
//!
//! The service defines its own domain traits and adapts these implementations.
//! Nothing in here performs I/O; all state (signing secret, cost parameters,
//! token lifetimes) is injected at construction.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! let is_valid = hasher.verify("my_password", &hash).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Session Tokens
//! ```
//! use auth::{TokenService, TokenKind};
//! use uuid::Uuid;
//!
//! let tokens = TokenService::new(b"secret_key_at_least_32_bytes_long!", 15, 15);
//! let user_id = Uuid::new_v4();
//! let access = tokens.issue_access(user_id).unwrap();
//! let subject = tokens.validate(&access, TokenKind::Access).unwrap();
//! assert_eq!(subject, user_id);
//! ```
//!
//! ## One-time tokens
//! ```
//! let token = auth::generate_secure_token();
//! assert!(token.len() >= 32);
//! ```

pub mod jwt;
pub mod password;
pub mod token;

// Re-export commonly used items
pub use jwt::SessionClaims;
pub use jwt::TokenError;
pub use jwt::TokenKind;
pub use jwt::TokenService;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use token::generate_secure_token;
