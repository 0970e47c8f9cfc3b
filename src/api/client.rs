//! API client for the Pretium portal backend.
//!
//! Every outbound call goes through this client: it attaches the stored
//! access token as a bearer credential when one is present, and it is the
//! single place where an authentication failure (HTTP 401) clears the
//! token store. All other failures are propagated unchanged - no retries,
//! nothing swallowed.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::TokenStore;
use crate::models::{Credentials, EnrollmentArtifact, RegisterRequest, TokenPair, UserProfile};

use super::ApiError;

/// HTTP request timeout in seconds.
/// A timed-out request is a network failure, never an auth failure.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Wire shape of the credential exchange request. The second factor is
/// always included - the backend decides whether the account needs it.
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    token: &'a str,
}

/// Wire shape of the TOTP provisioning response.
#[derive(Debug, Deserialize)]
struct TwoFactorResponse {
    otp_uri: String,
    qr_code_base64: String,
}

/// API client for the portal.
/// Clone is cheap - reqwest::Client and the token store are both handles.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: TokenStore,
}

impl ApiClient {
    /// Create a new API client. `base_url` must end with a slash
    /// (see `Config::api_base_url`).
    pub fn new(base_url: String, store: TokenStore) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url,
            store,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the current access token, if any. The store is read live on
    /// every call so a session set or cleared by another flow is picked up
    /// immediately.
    fn with_bearer(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.store.get().access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Convert a non-2xx status into an `ApiError`, clearing the token
    /// store when the status is an authentication failure. This is the
    /// only path that invalidates the session, so a 401 produces exactly
    /// one `clear()` no matter which flow issued the request.
    fn failure_from(status: StatusCode, body: &str, store: &TokenStore) -> ApiError {
        let err = ApiError::from_status(status, body);
        if err.is_auth_failure() {
            warn!(status = %status, "Authentication failure, clearing stored session");
            if let Err(e) = store.clear() {
                warn!(error = %e, "Failed to clear persisted session");
            }
        }
        err
    }

    async fn check_response(&self, response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Self::failure_from(status, &body, &self.store))
        }
    }

    async fn parse_body<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self.with_bearer(self.client.get(&url)).send().await?;
        let response = self.check_response(response).await?;
        Self::parse_body(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(%url, "POST");
        let response = self
            .with_bearer(self.client.post(&url))
            .json(body)
            .send()
            .await?;
        let response = self.check_response(response).await?;
        Self::parse_body(response).await
    }

    // ===== Operations =====

    /// Exchange credentials (plus second factor) for a token pair.
    /// The caller decides what to do with the tokens; a rejected exchange
    /// surfaces the backend's error detail, e.g. "Invalid 2FA token."
    pub async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        let request = LoginRequest {
            username: &credentials.username,
            password: &credentials.password,
            token: &credentials.second_factor,
        };
        self.post("login/", &request).await
    }

    /// Request a fresh TOTP provisioning artifact (authenticated).
    /// Every call produces a new artifact server-side; nothing is cached.
    pub async fn generate_two_factor(&self) -> Result<EnrollmentArtifact, ApiError> {
        let response: TwoFactorResponse = self.get("generate-2fa/").await?;
        Self::decode_artifact(response)
    }

    /// Create a new portal account.
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ApiError> {
        self.post("register/", request).await
    }

    /// Fetch the authenticated user's profile.
    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        self.get("profile/").await
    }

    fn decode_artifact(response: TwoFactorResponse) -> Result<EnrollmentArtifact, ApiError> {
        let qr_png = BASE64
            .decode(response.qr_code_base64.as_bytes())
            .map_err(|e| ApiError::InvalidResponse(format!("Bad QR image encoding: {}", e)))?;
        Ok(EnrollmentArtifact {
            qr_png,
            provisioning_uri: response.otp_uri,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_wire_field_names() {
        let request = LoginRequest {
            username: "alice",
            password: "x",
            token: "000000",
        };
        let value = serde_json::to_value(&request).unwrap();
        // The backend expects exactly these keys
        assert_eq!(
            value,
            serde_json::json!({"username": "alice", "password": "x", "token": "000000"})
        );
    }

    #[test]
    fn test_auth_failure_clears_store_exactly_once() {
        let store = TokenStore::in_memory();
        store.set("access".into(), Some("refresh".into())).unwrap();

        let err = ApiClient::failure_from(
            StatusCode::UNAUTHORIZED,
            r#"{"error": "Invalid 2FA token."}"#,
            &store,
        );
        assert!(err.is_auth_failure());
        // Both tokens are gone together
        assert!(!store.get().is_authenticated());
        assert!(store.get().refresh_token.is_none());
    }

    #[test]
    fn test_non_auth_failure_leaves_store_alone() {
        let store = TokenStore::in_memory();
        store.set("access".into(), None).unwrap();

        let err = ApiClient::failure_from(StatusCode::INTERNAL_SERVER_ERROR, "boom", &store);
        assert!(!err.is_auth_failure());
        assert!(store.get().is_authenticated());

        let err = ApiClient::failure_from(StatusCode::BAD_REQUEST, "{}", &store);
        assert!(!err.is_auth_failure());
        assert!(store.get().is_authenticated());
    }

    #[test]
    fn test_two_factor_response_parses_backend_shape() {
        let json = r#"{"otp_uri": "otpauth://totp/Pretium%20Investment:alice?secret=ABC234", "qr_code_base64": "aGVsbG8="}"#;
        let response: TwoFactorResponse = serde_json::from_str(json).unwrap();
        let artifact = ApiClient::decode_artifact(response).unwrap();
        assert_eq!(artifact.qr_png, b"hello");
        assert!(artifact.provisioning_uri.starts_with("otpauth://totp/"));
    }

    #[test]
    fn test_bad_qr_encoding_is_invalid_response() {
        let response = TwoFactorResponse {
            otp_uri: "otpauth://totp/x".to_string(),
            qr_code_base64: "!!! not base64 !!!".to_string(),
        };
        let err = ApiClient::decode_artifact(response).unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_url_joins_against_trailing_slash_base() {
        let client = ApiClient::new(
            "http://127.0.0.1:8000/api/".to_string(),
            TokenStore::in_memory(),
        )
        .unwrap();
        assert_eq!(client.url("login/"), "http://127.0.0.1:8000/api/login/");
        assert_eq!(
            client.url("generate-2fa/"),
            "http://127.0.0.1:8000/api/generate-2fa/"
        );
    }
}
