//! Pretium TUI - a terminal client for the Pretium Investment portal.
//!
//! Sign in with username/password plus a TOTP second factor, manage
//! two-factor enrollment, and register accounts, all against the portal's
//! REST API. The session survives restarts until it is logged out or
//! rejected by the server.

mod api;
mod app;
mod auth;
mod config;
mod flows;
mod models;
mod ui;

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use auth::{CredentialStore, TokenStore};
use config::Config;
use models::Credentials;
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "--login" {
        return login_cli().await;
    }
    if args.len() > 1 && args[1] == "--logout" {
        return logout_cli();
    }

    info!("Pretium client starting");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app; a persisted session drops us straight on the dashboard
    let mut app = App::new()?;
    if app.guard.is_admitted() {
        app.fetch_profile();
    }

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("Pretium client shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Collect completed flow tasks, then re-check admission before
        // drawing so protected content never flashes after a 401
        app.check_flow_events();
        app.enforce_guard();

        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow flow results through
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key)? {
                    return Ok(());
                }
            }
        }
    }
}

/// Sign in from the command line and persist the session for the TUI.
async fn login_cli() -> Result<()> {
    println!("\n=== Pretium login ===\n");

    let mut config = Config::load().unwrap_or_default();
    let cache_dir = config.cache_dir()?;
    let store = TokenStore::open(&cache_dir);
    let api = api::ApiClient::new(config.api_base_url(), store.clone())?;

    let username = if let Some(ref last_user) = config.last_username {
        print!("Username [{}]: ", last_user);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();

        if input.is_empty() {
            last_user.clone()
        } else {
            input.to_string()
        }
    } else {
        prompt_username()?
    };

    let (password, from_keychain) = if CredentialStore::has_credentials(&username) {
        print!("Use stored password? [Y/n]: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if input.trim().to_lowercase() != "n" {
            (CredentialStore::get_password(&username)?, true)
        } else {
            (rpassword::prompt_password("Password: ")?, false)
        }
    } else {
        (rpassword::prompt_password("Password: ")?, false)
    };

    print!("2FA code (leave empty if not enrolled): ");
    io::stdout().flush()?;
    let mut second_factor = String::new();
    io::stdin().read_line(&mut second_factor)?;

    println!("\nAuthenticating...");

    let credentials = Credentials {
        username: username.clone(),
        password: password.clone(),
        second_factor: second_factor.trim().to_string(),
    };

    match api.login(&credentials).await {
        Ok(tokens) => {
            store.set(tokens.access, tokens.refresh)?;

            // Keychain storage is strictly opt-in; a typed password is
            // dropped unless the user asks to keep it
            if !from_keychain && prompt_yes_no("Remember password in system keychain? [y/N]: ")? {
                if let Err(e) = CredentialStore::store(&username, &password) {
                    tracing::warn!(error = %e, "Failed to store credentials");
                }
            }
            config.last_username = Some(username);
            config.save()?;

            println!("Login successful!\n");
            Ok(())
        }
        Err(e) => anyhow::bail!("{}", e.user_message()),
    }
}

/// Clear the persisted session and any remembered password.
fn logout_cli() -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let store = TokenStore::open(&config.cache_dir()?);
    store.clear()?;

    if let Some(ref username) = config.last_username {
        if CredentialStore::has_credentials(username) {
            CredentialStore::delete(username)?;
            println!("Removed stored password for {}.", username);
        }
    }

    println!("Signed out.");
    Ok(())
}

fn prompt_yes_no(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_lowercase() == "y")
}

fn prompt_username() -> Result<String> {
    print!("Username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    Ok(username.trim().to_string())
}
