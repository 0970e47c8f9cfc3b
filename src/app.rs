//! Application state management for the Pretium terminal client.
//!
//! This module contains the core `App` struct that wires the token store,
//! session guard, API client, and the per-flow state machines together,
//! and owns screen navigation. Flow requests run as background tasks and
//! report back over an mpsc channel so the UI thread never blocks on the
//! network.

use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::{SessionGuard, TokenStore};
use crate::config::Config;
use crate::flows::{EnrollFlow, LoginFlow, LoginPhase, RegisterFlow};
use crate::models::{EnrollmentArtifact, TokenPair, UserProfile};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the flow result channel.
/// At most a handful of requests are ever outstanding at once.
const CHANNEL_BUFFER_SIZE: usize = 16;

/// File name for a saved enrollment QR image, next to the session file
const QR_IMAGE_FILE: &str = "totp-qr.png";

/// Environment variables for non-interactive login prefill
const USERNAME_ENV: &str = "PRETIUM_USERNAME";
const PASSWORD_ENV: &str = "PRETIUM_PASSWORD";

// ============================================================================
// Navigation
// ============================================================================

/// The client's screens - the routing table of the original portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Register,
    Dashboard,
    TwoFactorSetup,
}

impl Screen {
    /// Whether the screen may only be rendered for an admitted session.
    pub fn requires_auth(&self) -> bool {
        matches!(self, Screen::Dashboard | Screen::TwoFactorSetup)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Screen::Login => "Sign in",
            Screen::Register => "Create account",
            Screen::Dashboard => "Dashboard",
            Screen::TwoFactorSetup => "Two-factor authentication",
        }
    }
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Username,
    Password,
    SecondFactor,
    Button,
}

impl LoginFocus {
    pub fn next(&self) -> Self {
        match self {
            LoginFocus::Username => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::SecondFactor,
            LoginFocus::SecondFactor => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::Username,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            LoginFocus::Username => LoginFocus::Button,
            LoginFocus::Password => LoginFocus::Username,
            LoginFocus::SecondFactor => LoginFocus::Password,
            LoginFocus::Button => LoginFocus::SecondFactor,
        }
    }
}

/// Registration form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterFocus {
    Username,
    Email,
    Password,
    Role,
    Button,
}

impl RegisterFocus {
    pub fn next(&self) -> Self {
        match self {
            RegisterFocus::Username => RegisterFocus::Email,
            RegisterFocus::Email => RegisterFocus::Password,
            RegisterFocus::Password => RegisterFocus::Role,
            RegisterFocus::Role => RegisterFocus::Button,
            RegisterFocus::Button => RegisterFocus::Username,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            RegisterFocus::Username => RegisterFocus::Button,
            RegisterFocus::Email => RegisterFocus::Username,
            RegisterFocus::Password => RegisterFocus::Email,
            RegisterFocus::Role => RegisterFocus::Password,
            RegisterFocus::Button => RegisterFocus::Role,
        }
    }
}

/// Whether a character may be appended to a text field.
/// Control characters are rejected everywhere.
pub fn can_add_input_char(current_len: usize, max_len: usize, c: char) -> bool {
    current_len < max_len && !c.is_control()
}

// ============================================================================
// Flow task results
// ============================================================================

/// Results sent from background flow tasks back to the main loop.
pub enum FlowEvent {
    Login(Result<TokenPair, ApiError>),
    Enroll(Result<EnrollmentArtifact, ApiError>),
    Register(Result<UserProfile, ApiError>),
    Profile(Result<UserProfile, ApiError>),
}

// ============================================================================
// Main application struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    pub store: TokenStore,
    pub guard: SessionGuard,
    pub api: ApiClient,

    // Navigation
    pub screen: Screen,

    // Flow state machines
    pub login: LoginFlow,
    pub enroll: EnrollFlow,
    pub register: RegisterFlow,

    // Form focus
    pub login_focus: LoginFocus,
    pub register_focus: RegisterFocus,

    // Dashboard data
    pub profile: Option<UserProfile>,

    // Status message
    pub status_message: Option<String>,

    // Username of the outstanding login attempt, remembered on success.
    // Only the username: the password lives in the flow and the spawned
    // request, nowhere else.
    pending_username: Option<String>,

    // Flow task channel
    events_rx: mpsc::Receiver<FlowEvent>,
    events_tx: mpsc::Sender<FlowEvent>,
}

impl App {
    /// Create a new application instance
    pub fn new() -> Result<Self> {
        debug!("App::new() starting");
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
        debug!(?cache_dir, "Cache directory configured");

        let store = TokenStore::open(&cache_dir);
        let guard = SessionGuard::new(store.clone());
        let api = ApiClient::new(config.api_base_url(), store.clone())?;

        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        // Prefill the login form from env vars or the remembered username
        let login_username = std::env::var(USERNAME_ENV)
            .ok()
            .or_else(|| config.last_username.clone())
            .unwrap_or_default();
        let mut login = LoginFlow::new(login_username);
        login.password = std::env::var(PASSWORD_ENV).unwrap_or_default();

        let screen = if guard.is_admitted() {
            Screen::Dashboard
        } else {
            Screen::Login
        };

        let login_focus = if login.username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };

        Ok(Self {
            config,
            store,
            guard,
            api,
            screen,
            login,
            enroll: EnrollFlow::new(),
            register: RegisterFlow::new(),
            login_focus,
            register_focus: RegisterFocus::Username,
            profile: None,
            status_message: None,
            pending_username: None,
            events_rx: rx,
            events_tx: tx,
        })
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Navigate to a screen, subject to the session guard. Leaving the
    /// enrollment screen discards any displayed artifact.
    pub fn navigate(&mut self, target: Screen) {
        let resolved = self.guard.resolve(target);
        if self.screen == Screen::TwoFactorSetup && resolved != Screen::TwoFactorSetup {
            self.enroll.discard();
        }
        self.screen = resolved;
    }

    /// Re-check admission for the current screen. Called before every
    /// draw so protected content is never rendered after the session has
    /// been cleared (for example by a 401 on a background request).
    pub fn enforce_guard(&mut self) {
        if self.screen.requires_auth() && !self.guard.is_admitted() {
            warn!(screen = ?self.screen, "Session no longer valid, returning to login");
            self.profile = None;
            self.navigate(Screen::Login);
            self.status_message = Some("Session expired. Please sign in again.".to_string());
        }
    }

    // =========================================================================
    // Flow actions
    // =========================================================================

    /// Submit the login form. A submit while one is in flight is ignored
    /// by the flow; validation failures never reach the network.
    pub fn submit_login(&mut self) {
        let Some(credentials) = self.login.begin_submit() else {
            return;
        };
        self.pending_username = Some(credentials.username.clone());

        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = api.login(&credentials).await;
            let _ = tx.send(FlowEvent::Login(result)).await;
        });
    }

    /// Request a fresh TOTP provisioning artifact.
    pub fn request_two_factor(&mut self) {
        if !self.enroll.begin_request() {
            return;
        }
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = api.generate_two_factor().await;
            let _ = tx.send(FlowEvent::Enroll(result)).await;
        });
    }

    /// Submit the registration form.
    pub fn submit_register(&mut self) {
        let Some(request) = self.register.begin_submit() else {
            return;
        };
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = api.register(&request).await;
            let _ = tx.send(FlowEvent::Register(result)).await;
        });
    }

    /// Fetch the authenticated user's profile for the dashboard.
    pub fn fetch_profile(&mut self) {
        let api = self.api.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = api.profile().await;
            let _ = tx.send(FlowEvent::Profile(result)).await;
        });
    }

    /// Explicit logout: clear both tokens and return to the login screen.
    pub fn logout(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }
        self.profile = None;
        self.login = LoginFlow::new(self.config.last_username.clone().unwrap_or_default());
        self.login_focus = if self.login.username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };
        self.navigate(Screen::Login);
        self.status_message = Some("Signed out.".to_string());
        info!("Signed out");
    }

    /// Write the displayed QR image next to the session file so it can be
    /// scanned from another device.
    pub fn save_qr_image(&mut self) {
        let Some(artifact) = self.enroll.artifact() else {
            return;
        };
        let dir = self.config.cache_dir().unwrap_or_else(|_| PathBuf::from("."));
        let path = dir.join(QR_IMAGE_FILE);
        let result = std::fs::create_dir_all(&dir).and_then(|_| std::fs::write(&path, &artifact.qr_png));
        match result {
            Ok(()) => {
                info!(?path, "QR image saved");
                self.status_message = Some(format!("QR code saved to {}", path.display()));
            }
            Err(e) => {
                warn!(error = %e, "Failed to save QR image");
                self.status_message = Some("Failed to save QR image.".to_string());
            }
        }
    }

    // =========================================================================
    // Flow task results
    // =========================================================================

    /// Drain completed flow tasks. Called once per loop iteration.
    pub fn check_flow_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: FlowEvent) {
        match event {
            FlowEvent::Login(result) => {
                self.login.complete(result, &self.store);
                let pending = self.pending_username.take();

                if self.login.phase() == LoginPhase::Authenticated {
                    if let Some(username) = pending {
                        self.config.last_username = Some(username.clone());
                        if let Err(e) = self.config.save() {
                            warn!(error = %e, "Failed to save config");
                        }
                        self.status_message = Some(format!("Signed in as {}", username));
                    }
                    self.navigate(Screen::Dashboard);
                    self.fetch_profile();
                }
            }
            FlowEvent::Enroll(result) => {
                // Only surface the artifact while the user is still on the
                // enrollment screen; otherwise it was discarded on leave
                if self.screen == Screen::TwoFactorSetup {
                    self.enroll.complete(result);
                }
            }
            FlowEvent::Register(result) => {
                self.register.complete(result);
            }
            FlowEvent::Profile(result) => match result {
                Ok(profile) => {
                    debug!(username = %profile.username, "Profile loaded");
                    self.profile = Some(profile);
                }
                Err(e) => {
                    // A 401 has already cleared the store; enforce_guard
                    // redirects on the next draw
                    warn!(error = %e, "Failed to load profile");
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_requires_auth() {
        assert!(!Screen::Login.requires_auth());
        assert!(!Screen::Register.requires_auth());
        assert!(Screen::Dashboard.requires_auth());
        assert!(Screen::TwoFactorSetup.requires_auth());
    }

    #[test]
    fn test_login_focus_cycle() {
        assert_eq!(LoginFocus::Username.next(), LoginFocus::Password);
        assert_eq!(LoginFocus::Password.next(), LoginFocus::SecondFactor);
        assert_eq!(LoginFocus::SecondFactor.next(), LoginFocus::Button);
        assert_eq!(LoginFocus::Button.next(), LoginFocus::Username); // Wraps around

        assert_eq!(LoginFocus::Username.prev(), LoginFocus::Button); // Wraps around
        assert_eq!(LoginFocus::Button.prev(), LoginFocus::SecondFactor);
    }

    #[test]
    fn test_register_focus_cycle_covers_all_fields() {
        let mut focus = RegisterFocus::Username;
        let mut seen = vec![focus];
        for _ in 0..4 {
            focus = focus.next();
            seen.push(focus);
        }
        assert_eq!(focus.next(), RegisterFocus::Username);
        assert!(seen.contains(&RegisterFocus::Role));
        assert!(seen.contains(&RegisterFocus::Button));
    }

    #[test]
    fn test_can_add_input_char() {
        assert!(can_add_input_char(0, 50, 'a'));
        assert!(can_add_input_char(49, 50, 'z'));
        // At the cap
        assert!(!can_add_input_char(50, 50, 'a'));
        // Control characters rejected
        assert!(!can_add_input_char(0, 50, '\x00'));
        assert!(!can_add_input_char(0, 50, '\n'));
        assert!(!can_add_input_char(0, 50, '\t'));
    }
}
