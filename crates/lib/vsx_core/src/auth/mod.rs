//! OAuth token lifecycle.
//!
//! Stores, refreshes, and serves per-user access tokens for the identity
//! providers the registry supports. Consumers go through
//! [`lifecycle::TokenManager`]; the other modules are its collaborators.

pub mod lifecycle;
pub mod provider;
pub mod queries;
pub mod refresh;
pub mod store;

use thiserror::Error;

pub use lifecycle::{TokenManager, TokenUpdate};
pub use provider::{ECLIPSE, GITHUB};

/// Result type for token store and lifecycle operations.
pub type Result<T> = std::result::Result<T, TokenError>;

/// Token persistence errors.
///
/// Missing users and unknown providers are not errors; refresh failures are
/// absorbed by the lifecycle manager. Only backend failures surface here.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(String),
}
