//! Authentication module for managing the portal session.
//!
//! This module provides:
//! - `TokenStore`: atomic, persisted holder of the access/refresh pair
//! - `SessionGuard`: admission check + redirect policy for protected screens
//! - `CredentialStore`: secure OS-level credential storage via keyring
//!
//! The session survives restarts; it is cleared on logout or whenever the
//! API client detects an authentication failure.

pub mod credentials;
pub mod guard;
pub mod store;

pub use credentials::CredentialStore;
pub use guard::SessionGuard;
pub use store::{Session, TokenStore};
