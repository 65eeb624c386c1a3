//! HTTP surface for CredVault.
//!
//! This module provides:
//! - The `/secrets` axum router and its handlers
//! - Owner identity extraction (resolved upstream, trusted here)
//! - Error-to-status mapping for the vault taxonomy
//!
//! The handlers hold no policy: every rule lives in `credvault-vault`.

pub mod auth;
pub mod error;
pub mod routes;

pub use auth::{OwnerIdentity, RESOLVED_USER_HEADER};
pub use error::ApiError;
pub use routes::{router, AppState};
