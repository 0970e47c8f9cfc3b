//! Account registration flow: `Idle -> Submitting -> {Created, Failed}`.

use tracing::{error, info};

use crate::api::ApiError;
use crate::models::{RegisterRequest, Role, UserProfile};

/// Maximum length for email input
pub const MAX_EMAIL_LENGTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterPhase {
    Idle,
    Submitting,
    Created,
    Failed,
}

pub struct RegisterFlow {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    phase: RegisterPhase,
    pub error: Option<String>,
    pub notice: Option<String>,
}

impl RegisterFlow {
    pub fn new() -> Self {
        Self {
            username: String::new(),
            email: String::new(),
            password: String::new(),
            role: Role::default(),
            phase: RegisterPhase::Idle,
            error: None,
            notice: None,
        }
    }

    pub fn phase(&self) -> RegisterPhase {
        self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == RegisterPhase::Submitting
    }

    /// Start a submission, validating required fields first. Returns the
    /// request to send, or `None` when validation failed or one is
    /// already in flight.
    pub fn begin_submit(&mut self) -> Option<RegisterRequest> {
        if self.phase == RegisterPhase::Submitting {
            return None;
        }

        if self.username.trim().is_empty()
            || self.email.trim().is_empty()
            || self.password.is_empty()
        {
            let err =
                ApiError::Validation("Username, email, and password are required.".to_string());
            self.phase = RegisterPhase::Failed;
            self.error = Some(err.user_message());
            return None;
        }

        self.phase = RegisterPhase::Submitting;
        self.error = None;
        self.notice = None;
        Some(RegisterRequest {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            role: self.role,
        })
    }

    pub fn complete(&mut self, result: Result<UserProfile, ApiError>) {
        match result {
            Ok(profile) => {
                info!(username = %profile.username, "Account created");
                self.username.clear();
                self.email.clear();
                self.password.clear();
                self.role = Role::default();
                self.error = None;
                self.notice = Some("Account created. You can now sign in.".to_string());
                self.phase = RegisterPhase::Created;
            }
            Err(e) => {
                error!(error = %e, "Registration failed");
                self.error = Some(e.user_message());
                self.phase = RegisterPhase::Failed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow_with_input() -> RegisterFlow {
        let mut flow = RegisterFlow::new();
        flow.username = "carol".to_string();
        flow.email = "carol@example.com".to_string();
        flow.password = "pw".to_string();
        flow.role = Role::Accountant;
        flow
    }

    #[test]
    fn test_successful_registration() {
        let mut flow = flow_with_input();
        let request = flow.begin_submit().expect("submit should start");
        assert_eq!(request.username, "carol");
        assert_eq!(request.role, Role::Accountant);

        flow.complete(Ok(UserProfile {
            id: 1,
            username: "carol".to_string(),
            email: Some("carol@example.com".to_string()),
            role: Some("accountant".to_string()),
        }));

        assert_eq!(flow.phase(), RegisterPhase::Created);
        assert_eq!(
            flow.notice.as_deref(),
            Some("Account created. You can now sign in.")
        );
        // Form is reset for the next account
        assert!(flow.password.is_empty());
    }

    #[test]
    fn test_missing_fields_fail_validation() {
        let mut flow = RegisterFlow::new();
        flow.username = "carol".to_string();
        assert!(flow.begin_submit().is_none());
        assert_eq!(flow.phase(), RegisterPhase::Failed);
        assert_eq!(
            flow.error.as_deref(),
            Some("Username, email, and password are required.")
        );
    }

    #[test]
    fn test_duplicate_username_error_passes_through() {
        let mut flow = flow_with_input();
        flow.begin_submit().unwrap();
        flow.complete(Err(ApiError::from_status(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error": "Username already exists."}"#,
        )));

        assert_eq!(flow.phase(), RegisterPhase::Failed);
        assert_eq!(flow.error.as_deref(), Some("Username already exists."));
        // Input survives so the user can pick another name
        assert_eq!(flow.email, "carol@example.com");
    }

    #[test]
    fn test_second_submit_while_submitting_is_ignored() {
        let mut flow = flow_with_input();
        assert!(flow.begin_submit().is_some());
        assert!(flow.begin_submit().is_none());
    }
}
