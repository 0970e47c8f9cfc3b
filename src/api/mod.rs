//! REST API client module for the Pretium portal backend.
//!
//! This module provides the `ApiClient` for the credential exchange, TOTP
//! provisioning, registration, and profile endpoints.
//!
//! The API uses JWT bearer token authentication; the token is read live
//! from the shared `TokenStore` on every request, and a 401 response
//! clears that store before the error reaches the caller.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
