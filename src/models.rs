//! Domain types exchanged with the Pretium portal API.
//!
//! These are the shapes the flows and screens work with. Wire-level
//! request/response structs that never leave the API client live in
//! `api::client` instead.

use serde::{Deserialize, Serialize};

/// A login attempt's input, held only for the duration of the attempt.
/// The second factor is always sent, empty or not - the backend decides
/// whether the account requires it.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub second_factor: String,
}

/// Tokens returned by a successful credential exchange.
/// The refresh token is stored but never exchanged by this client.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// A freshly provisioned TOTP enrollment artifact.
///
/// Held only by the enrollment screen and discarded when it is left;
/// every request produces a brand-new secret server-side, so an old
/// artifact must never be shown again.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentArtifact {
    /// Decoded PNG bytes of the QR code.
    pub qr_png: Vec<u8>,
    /// Full otpauth:// provisioning URI, shown untruncated as a
    /// copyable fallback to scanning.
    pub provisioning_uri: String,
}

/// Account role accepted by the registration endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Accountant,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Owner => "Owner",
            Role::Accountant => "Accountant",
        }
    }

    /// Toggle between the two roles (for the registration form selector).
    pub fn toggled(&self) -> Self {
        match self {
            Role::Owner => Role::Accountant,
            Role::Accountant => Role::Owner,
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Owner
    }
}

/// Payload for the account registration endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Profile information for the authenticated user.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"owner\"");
        assert_eq!(
            serde_json::to_string(&Role::Accountant).unwrap(),
            "\"accountant\""
        );
    }

    #[test]
    fn test_role_toggled() {
        assert_eq!(Role::Owner.toggled(), Role::Accountant);
        assert_eq!(Role::Accountant.toggled(), Role::Owner);
    }

    #[test]
    fn test_token_pair_refresh_optional() {
        let with: TokenPair = serde_json::from_str(r#"{"access":"a","refresh":"r"}"#).unwrap();
        assert_eq!(with.access, "a");
        assert_eq!(with.refresh.as_deref(), Some("r"));

        let without: TokenPair = serde_json::from_str(r#"{"access":"a"}"#).unwrap();
        assert!(without.refresh.is_none());
    }

    #[test]
    fn test_user_profile_parses_backend_shape() {
        let json = r#"{"id": 7, "username": "alice", "email": "alice@example.com", "role": "owner"}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.id, 7);
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.email.as_deref(), Some("alice@example.com"));
        assert_eq!(profile.role.as_deref(), Some("owner"));
    }
}
