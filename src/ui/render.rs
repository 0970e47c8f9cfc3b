//! Screen rendering for the Pretium terminal client.
//!
//! The guard has already been enforced by the time `render` runs, so a
//! protected screen is only ever drawn for an admitted session.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, LoginFocus, RegisterFocus, Screen};
use crate::flows::EnrollPhase;

use super::styles;

/// Visible width of a form input field
const FIELD_WIDTH: usize = 24;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);

    match app.screen {
        Screen::Login => render_login(frame, app, chunks[1]),
        Screen::Register => render_register(frame, app, chunks[1]),
        Screen::Dashboard => render_dashboard(frame, app, chunks[1]),
        Screen::TwoFactorSetup => render_two_factor(frame, app, chunks[1]),
    }

    render_status_bar(frame, app, chunks[2]);
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Pretium Investment";
    let screen_title = app.screen.title();

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.len() + screen_title.len() + 3),
        )),
        Span::styled(screen_title, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

/// A single labeled form field with a block cursor when focused.
fn field_line(label: &str, value: &str, focused: bool, masked: bool) -> Line<'static> {
    let shown: String = if masked {
        "*".repeat(value.chars().count().min(FIELD_WIDTH))
    } else {
        value.chars().take(FIELD_WIDTH).collect()
    };
    let cursor = if focused { "▌" } else { "" };
    let style = if focused {
        styles::selected_style()
    } else {
        styles::field_style()
    };

    Line::from(vec![
        Span::raw("   "),
        Span::styled(format!("{:>10}: [", label), styles::muted_style()),
        Span::styled(format!("{:<width$}{}", shown, cursor, width = FIELD_WIDTH), style),
        Span::styled("]", styles::muted_style()),
    ])
}

fn button_line(label: &str, focused: bool) -> Line<'static> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::field_style()
    };
    if focused {
        Line::from(vec![
            Span::raw("              ["),
            Span::styled(format!(" ▶ {} ◀ ", label), style),
            Span::raw("]"),
        ])
    } else {
        Line::from(vec![
            Span::raw("              ["),
            Span::styled(format!("   {}   ", label), style),
            Span::raw("]"),
        ])
    }
}

fn render_login(frame: &mut Frame, app: &App, area: Rect) {
    let height = if app.login.error.is_some() { 15 } else { 13 };
    let dialog = centered_rect_fixed(48, height, area);

    let mut lines = vec![
        Line::from(Span::styled("   Sign in to your portal account", styles::highlight_style())),
        Line::from(""),
        field_line("Username", &app.login.username, app.login_focus == LoginFocus::Username, false),
        field_line("Password", &app.login.password, app.login_focus == LoginFocus::Password, true),
        field_line("2FA Token", &app.login.second_factor, app.login_focus == LoginFocus::SecondFactor, false),
        Line::from(""),
    ];

    if app.login.is_submitting() {
        lines.push(Line::from(Span::styled(
            "              Signing in...",
            styles::muted_style(),
        )));
    } else {
        lines.push(button_line("Sign in", app.login_focus == LoginFocus::Button));
    }

    if let Some(ref error) = app.login.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("   No account? Press ", styles::muted_style()),
        Span::styled("F2", styles::key_hint_style()),
        Span::styled(" to register", styles::muted_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), dialog);
}

fn render_register(frame: &mut Frame, app: &App, area: Rect) {
    let extra = app.register.error.is_some() || app.register.notice.is_some();
    let dialog = centered_rect_fixed(48, if extra { 16 } else { 14 }, area);

    let mut lines = vec![
        Line::from(Span::styled("   Create a portal account", styles::highlight_style())),
        Line::from(""),
        field_line("Username", &app.register.username, app.register_focus == RegisterFocus::Username, false),
        field_line("Email", &app.register.email, app.register_focus == RegisterFocus::Email, false),
        field_line("Password", &app.register.password, app.register_focus == RegisterFocus::Password, true),
        field_line(
            "Role",
            &format!("{} (space to change)", app.register.role.display_name()),
            app.register_focus == RegisterFocus::Role,
            false,
        ),
        Line::from(""),
    ];

    if app.register.is_submitting() {
        lines.push(Line::from(Span::styled(
            "              Creating account...",
            styles::muted_style(),
        )));
    } else {
        lines.push(button_line("Create", app.register_focus == RegisterFocus::Button));
    }

    if let Some(ref notice) = app.register.notice {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", notice), styles::success_style())));
    } else if let Some(ref error) = app.register.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("   Press ", styles::muted_style()),
        Span::styled("Esc", styles::key_hint_style()),
        Span::styled(" to go back to sign in", styles::muted_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), dialog);
}

fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("  Welcome to the dashboard", styles::title_style())),
        Line::from(""),
    ];

    match app.profile {
        Some(ref profile) => {
            lines.push(Line::from(vec![
                Span::styled("  Signed in as: ", styles::muted_style()),
                Span::styled(profile.username.clone(), styles::field_style()),
            ]));
            if let Some(ref email) = profile.email {
                lines.push(Line::from(vec![
                    Span::styled("  Email:        ", styles::muted_style()),
                    Span::styled(email.clone(), styles::field_style()),
                ]));
            }
            if let Some(ref role) = profile.role {
                lines.push(Line::from(vec![
                    Span::styled("  Role:         ", styles::muted_style()),
                    Span::styled(role.clone(), styles::field_style()),
                ]));
            }
        }
        None => {
            lines.push(Line::from(Span::styled("  Loading profile...", styles::muted_style())));
        }
    }

    if let Some(at) = app.store.signed_in_at() {
        lines.push(Line::from(vec![
            Span::styled("  Session from: ", styles::muted_style()),
            Span::styled(at.format("%Y-%m-%d %H:%M UTC").to_string(), styles::field_style()),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("  [2]", styles::key_hint_style()),
        Span::styled(" Manage two-factor auth   ", styles::field_style()),
        Span::styled("[l]", styles::key_hint_style()),
        Span::styled(" Logout   ", styles::field_style()),
        Span::styled("[q]", styles::key_hint_style()),
        Span::styled(" Quit", styles::field_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_two_factor(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![Line::from("")];

    match app.enroll.phase() {
        EnrollPhase::Idle => {
            lines.push(Line::from(Span::styled(
                "  Enrol an authenticator app (TOTP) for this account.",
                styles::field_style(),
            )));
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled("  Press ", styles::muted_style()),
                Span::styled("g", styles::key_hint_style()),
                Span::styled(" to generate a new QR code.", styles::muted_style()),
            ]));
        }
        EnrollPhase::Requesting => {
            lines.push(Line::from(Span::styled("  Generating...", styles::muted_style())));
        }
        EnrollPhase::Ready => {
            if let Some(artifact) = app.enroll.artifact() {
                lines.push(Line::from(Span::styled(
                    "  Scan the QR code with your authenticator app.",
                    styles::highlight_style(),
                )));
                lines.push(Line::from(""));
                lines.push(Line::from(vec![
                    Span::styled("  QR image: ", styles::muted_style()),
                    Span::styled(
                        format!("{} bytes (press [s] to save as PNG)", artifact.qr_png.len()),
                        styles::field_style(),
                    ),
                ]));
                lines.push(Line::from(""));
                // The URI is the copyable fallback to scanning: always
                // shown in full, wrapped but never truncated
                lines.push(Line::from(Span::styled("  Provisioning URI:", styles::muted_style())));
                lines.push(Line::from(Span::styled(
                    format!("  {}", artifact.provisioning_uri),
                    styles::field_style(),
                )));
            }
        }
        EnrollPhase::Failed => {
            if let Some(ref error) = app.enroll.error {
                lines.push(Line::from(Span::styled(format!("  {}", error), styles::error_style())));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled("  Press ", styles::muted_style()),
                Span::styled("g", styles::key_hint_style()),
                Span::styled(" to request a new QR code.", styles::muted_style()),
            ]));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("  [g]", styles::key_hint_style()),
        Span::styled(" New QR   ", styles::field_style()),
        Span::styled("[s]", styles::key_hint_style()),
        Span::styled(" Save image   ", styles::field_style()),
        Span::styled("[Esc]", styles::key_hint_style()),
        Span::styled(" Back", styles::field_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
        area,
    );
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let left_text = if let Some(ref msg) = app.status_message {
        format!(" {} ", msg)
    } else {
        format!(" {} ", app.config.api_base_url())
    };
    let right_text = " [Ctrl+C] Quit ";

    let padding = (area.width as usize)
        .saturating_sub(left_text.len())
        .saturating_sub(right_text.len());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    frame.render_widget(
        Paragraph::new(status_line).style(styles::status_bar_style()),
        area,
    );
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
