//! Login flow state machine: `Idle -> Submitting -> {Authenticated, Failed}`.
//!
//! The machine holds the form fields and the phase; the app drives it by
//! calling `begin_submit` (which validates and hands back the credentials
//! to send) and `complete` (with the exchange result). Network I/O stays
//! outside, which keeps every transition testable without a server.

use tracing::{error, info, warn};

use crate::api::ApiError;
use crate::auth::TokenStore;
use crate::models::{Credentials, TokenPair};

/// Maximum length for username input
pub const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length for the TOTP code. Standard codes are 6 digits; 8
/// covers longer configurations.
pub const MAX_SECOND_FACTOR_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPhase {
    Idle,
    Submitting,
    Authenticated,
    Failed,
}

pub struct LoginFlow {
    pub username: String,
    pub password: String,
    pub second_factor: String,
    phase: LoginPhase,
    pub error: Option<String>,
}

impl LoginFlow {
    pub fn new(username: String) -> Self {
        Self {
            username,
            password: String::new(),
            second_factor: String::new(),
            phase: LoginPhase::Idle,
            error: None,
        }
    }

    pub fn phase(&self) -> LoginPhase {
        self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == LoginPhase::Submitting
    }

    /// Start a submission. Returns the credentials to exchange, or `None`
    /// when nothing should be sent: a submit while one is already in
    /// flight is ignored, and empty username/password fails validation
    /// before any network call.
    ///
    /// The second factor is always included, empty or not - the backend
    /// is the sole authority on whether the account requires it.
    pub fn begin_submit(&mut self) -> Option<Credentials> {
        if self.phase == LoginPhase::Submitting {
            return None;
        }

        if self.username.is_empty() || self.password.is_empty() {
            let err = ApiError::Validation("Username and password are required.".to_string());
            self.phase = LoginPhase::Failed;
            self.error = Some(err.user_message());
            return None;
        }

        self.phase = LoginPhase::Submitting;
        self.error = None;
        Some(Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
            second_factor: self.second_factor.trim().to_string(),
        })
    }

    /// Finish a submission with the exchange result.
    ///
    /// Success stores both tokens together and discards the transient
    /// secrets from the form. Failure keeps the typed fields so the user
    /// can correct and resubmit; the displayed error is the backend's
    /// detail when it provided one.
    pub fn complete(&mut self, result: Result<TokenPair, ApiError>, store: &TokenStore) {
        match result {
            Ok(tokens) => {
                if let Err(e) = store.set(tokens.access, tokens.refresh) {
                    warn!(error = %e, "Failed to persist session");
                }
                self.password.clear();
                self.second_factor.clear();
                self.error = None;
                self.phase = LoginPhase::Authenticated;
                info!("Login successful");
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                self.error = Some(e.user_message());
                self.phase = LoginPhase::Failed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow_with_input() -> LoginFlow {
        let mut flow = LoginFlow::new("alice".to_string());
        flow.password = "x".to_string();
        flow.second_factor = "000000".to_string();
        flow
    }

    fn token_pair() -> TokenPair {
        TokenPair {
            access: "access-jwt".to_string(),
            refresh: Some("refresh-jwt".to_string()),
        }
    }

    #[test]
    fn test_successful_exchange_authenticates_and_stores_tokens() {
        let store = TokenStore::in_memory();
        let mut flow = flow_with_input();

        let credentials = flow.begin_submit().expect("submit should start");
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.second_factor, "000000");
        assert_eq!(flow.phase(), LoginPhase::Submitting);

        flow.complete(Ok(token_pair()), &store);

        assert_eq!(flow.phase(), LoginPhase::Authenticated);
        let session = store.get();
        assert_eq!(session.access_token.as_deref(), Some("access-jwt"));
        assert_eq!(session.refresh_token.as_deref(), Some("refresh-jwt"));
        // Transient secrets are discarded once authenticated
        assert!(flow.password.is_empty());
        assert!(flow.second_factor.is_empty());
    }

    #[test]
    fn test_rejected_second_factor_surfaces_backend_detail_verbatim() {
        let store = TokenStore::in_memory();
        let mut flow = flow_with_input();
        flow.begin_submit().unwrap();

        let err = ApiError::from_status(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"error": "Invalid 2FA token."}"#,
        );
        flow.complete(Err(err), &store);

        assert_eq!(flow.phase(), LoginPhase::Failed);
        assert_eq!(flow.error.as_deref(), Some("Invalid 2FA token."));
        // The store is unchanged from its pre-attempt value
        assert!(!store.get().is_authenticated());
        // Typed fields survive for correction
        assert_eq!(flow.password, "x");
    }

    #[test]
    fn test_password_does_not_outlive_the_attempt() {
        let store = TokenStore::in_memory();
        let mut flow = flow_with_input();

        let credentials = flow.begin_submit().expect("submit should start");
        // The request task holds the only copy outside the form; it is
        // gone once the exchange resolves
        drop(credentials);

        flow.complete(Ok(token_pair()), &store);

        // Nothing retains the password afterwards: the form is cleared
        // and the session holds tokens only
        assert!(flow.password.is_empty());
        assert!(flow.second_factor.is_empty());
        let session = store.get();
        assert_eq!(session.access_token.as_deref(), Some("access-jwt"));
        assert_eq!(session.refresh_token.as_deref(), Some("refresh-jwt"));
    }

    #[test]
    fn test_second_submit_while_submitting_is_ignored() {
        let mut flow = flow_with_input();
        assert!(flow.begin_submit().is_some());
        // Still submitting: the duplicate is dropped, not queued
        assert!(flow.begin_submit().is_none());
        assert_eq!(flow.phase(), LoginPhase::Submitting);
    }

    #[test]
    fn test_resubmission_after_failure_is_allowed() {
        let store = TokenStore::in_memory();
        let mut flow = flow_with_input();
        flow.begin_submit().unwrap();
        flow.complete(
            Err(ApiError::from_status(
                reqwest::StatusCode::UNAUTHORIZED,
                r#"{"error": "Invalid username or password."}"#,
            )),
            &store,
        );
        assert_eq!(flow.phase(), LoginPhase::Failed);

        // The user corrects the password and tries again
        flow.password = "better".to_string();
        assert!(flow.begin_submit().is_some());
        assert_eq!(flow.phase(), LoginPhase::Submitting);
    }

    #[test]
    fn test_empty_fields_fail_validation_before_network() {
        let mut flow = LoginFlow::new(String::new());
        assert!(flow.begin_submit().is_none());
        assert_eq!(flow.phase(), LoginPhase::Failed);
        assert_eq!(
            flow.error.as_deref(),
            Some("Username and password are required.")
        );
    }

    #[test]
    fn test_empty_second_factor_is_still_sent() {
        let mut flow = LoginFlow::new("bob".to_string());
        flow.password = "pw".to_string();

        let credentials = flow.begin_submit().unwrap();
        // Accounts without 2FA log in with an empty code; the backend
        // decides whether that is acceptable
        assert_eq!(credentials.second_factor, "");
    }
}
