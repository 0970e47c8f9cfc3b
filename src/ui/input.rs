//! Keyboard input handling for the terminal client.
//!
//! This module translates key events into navigation and flow actions.
//! Returns `Ok(true)` from `handle_input` when the app should quit.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{can_add_input_char, App, LoginFocus, RegisterFocus, Screen};
use crate::flows::login::{MAX_PASSWORD_LENGTH, MAX_SECOND_FACTOR_LENGTH, MAX_USERNAME_LENGTH};
use crate::flows::register::MAX_EMAIL_LENGTH;
use crate::flows::RegisterPhase;

pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.screen {
        Screen::Login => handle_login_input(app, key),
        Screen::Register => handle_register_input(app, key),
        Screen::Dashboard => handle_dashboard_input(app, key),
        Screen::TwoFactorSetup => handle_two_factor_input(app, key),
    }
}

fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => return Ok(true),
        KeyCode::F(2) => app.navigate(Screen::Register),
        KeyCode::Tab | KeyCode::Down => app.login_focus = app.login_focus.next(),
        KeyCode::BackTab | KeyCode::Up => app.login_focus = app.login_focus.prev(),
        KeyCode::Enter => match app.login_focus {
            // Enter on the last field or the button submits; earlier
            // fields just advance
            LoginFocus::SecondFactor | LoginFocus::Button => app.submit_login(),
            _ => app.login_focus = app.login_focus.next(),
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Username => {
                app.login.username.pop();
            }
            LoginFocus::Password => {
                app.login.password.pop();
            }
            LoginFocus::SecondFactor => {
                app.login.second_factor.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Username => {
                if can_add_input_char(app.login.username.len(), MAX_USERNAME_LENGTH, c) {
                    app.login.username.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_input_char(app.login.password.len(), MAX_PASSWORD_LENGTH, c) {
                    app.login.password.push(c);
                }
            }
            LoginFocus::SecondFactor => {
                if c.is_ascii_digit()
                    && can_add_input_char(
                        app.login.second_factor.len(),
                        MAX_SECOND_FACTOR_LENGTH,
                        c,
                    )
                {
                    app.login.second_factor.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

fn handle_register_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // After a successful registration, Enter or Esc returns to sign-in
    if app.register.phase() == RegisterPhase::Created
        && matches!(key.code, KeyCode::Enter | KeyCode::Esc)
    {
        app.navigate(Screen::Login);
        return Ok(false);
    }

    match key.code {
        KeyCode::Esc => app.navigate(Screen::Login),
        KeyCode::Tab | KeyCode::Down => app.register_focus = app.register_focus.next(),
        KeyCode::BackTab | KeyCode::Up => app.register_focus = app.register_focus.prev(),
        KeyCode::Enter => match app.register_focus {
            RegisterFocus::Button => app.submit_register(),
            _ => app.register_focus = app.register_focus.next(),
        },
        KeyCode::Backspace => match app.register_focus {
            RegisterFocus::Username => {
                app.register.username.pop();
            }
            RegisterFocus::Email => {
                app.register.email.pop();
            }
            RegisterFocus::Password => {
                app.register.password.pop();
            }
            RegisterFocus::Role | RegisterFocus::Button => {}
        },
        KeyCode::Left | KeyCode::Right => {
            if app.register_focus == RegisterFocus::Role {
                app.register.role = app.register.role.toggled();
            }
        }
        KeyCode::Char(' ') if app.register_focus == RegisterFocus::Role => {
            app.register.role = app.register.role.toggled();
        }
        KeyCode::Char(c) => match app.register_focus {
            RegisterFocus::Username => {
                if can_add_input_char(app.register.username.len(), MAX_USERNAME_LENGTH, c) {
                    app.register.username.push(c);
                }
            }
            RegisterFocus::Email => {
                if can_add_input_char(app.register.email.len(), MAX_EMAIL_LENGTH, c) {
                    app.register.email.push(c);
                }
            }
            RegisterFocus::Password => {
                if can_add_input_char(app.register.password.len(), MAX_PASSWORD_LENGTH, c) {
                    app.register.password.push(c);
                }
            }
            RegisterFocus::Role | RegisterFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

fn handle_dashboard_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Char('q') => return Ok(true),
        KeyCode::Char('2') => app.navigate(Screen::TwoFactorSetup),
        KeyCode::Char('l') => app.logout(),
        _ => {}
    }
    Ok(false)
}

fn handle_two_factor_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => app.navigate(Screen::Dashboard),
        KeyCode::Char('g') => app.request_two_factor(),
        KeyCode::Char('s') => app.save_qr_image(),
        _ => {}
    }
    Ok(false)
}
