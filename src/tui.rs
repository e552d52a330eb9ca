use std::time::{Duration, Instant};

use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::config::AppPaths;
use crate::errors::{PinError, Result};
use crate::gateway::StoreGateway;
use crate::storage::sqlite::SqliteStore;

#[derive(PartialEq)]
enum Mode {
    Normal,
    AddPin,
    AddPhoto,
    ConfirmDeletePin(i64),
    ConfirmDeletePhoto(i64),
}

struct App {
    list_state: ListState,
    mode: Mode,
    input: String,
    status: String,
    status_time: Option<Instant>,
    photo_index: usize,
    adding_pin: bool,
    should_quit: bool,
}

impl App {
    fn new() -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            list_state,
            mode: Mode::Normal,
            input: String::new(),
            status: String::new(),
            status_time: None,
            photo_index: 0,
            adding_pin: false,
            should_quit: false,
        }
    }

    fn set_status(&mut self, msg: String) {
        self.status = msg;
        self.status_time = Some(Instant::now());
    }

    fn selected_pin_id(&self, gateway: &StoreGateway<SqliteStore>) -> Option<i64> {
        self.list_state
            .selected()
            .and_then(|i| gateway.pins().get(i))
            .map(|p| p.id)
    }

    fn selected_photo_id(&self, gateway: &StoreGateway<SqliteStore>) -> Option<i64> {
        let pin_id = self.selected_pin_id(gateway)?;
        gateway
            .photos_for(pin_id)
            .get(self.photo_index)
            .map(|p| p.id)
    }

    fn select_next(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
        self.photo_index = 0;
    }

    fn select_prev(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let i = self.list_state.selected().unwrap_or(0).saturating_sub(1);
        self.list_state.select(Some(i));
        self.photo_index = 0;
    }

    fn select_first(&mut self, len: usize) {
        if len > 0 {
            self.list_state.select(Some(0));
            self.photo_index = 0;
        }
    }

    fn select_last(&mut self, len: usize) {
        if len > 0 {
            self.list_state.select(Some(len - 1));
            self.photo_index = 0;
        }
    }

    fn clamp_selection(&mut self, gateway: &StoreGateway<SqliteStore>) {
        let len = gateway.pins().len();
        if len == 0 {
            self.list_state.select(None);
        } else if let Some(i) = self.list_state.selected() {
            if i >= len {
                self.list_state.select(Some(len - 1));
            }
        } else {
            self.list_state.select(Some(0));
        }

        let photo_len = self
            .selected_pin_id(gateway)
            .map(|id| gateway.photos_for(id).len())
            .unwrap_or(0);
        if photo_len == 0 {
            self.photo_index = 0;
        } else if self.photo_index >= photo_len {
            self.photo_index = photo_len - 1;
        }
    }

    fn submit_pin(&mut self, gateway: &mut StoreGateway<SqliteStore>) {
        // Overlapping creation intents are dropped, not queued.
        if self.adding_pin {
            return;
        }
        self.adding_pin = true;
        let result = parse_pin_input(&self.input)
            .and_then(|(lat, lon, title)| gateway.create_pin(lat, lon, title.as_deref()));
        match result {
            Ok(id) => {
                self.set_status(format!("Added pin #{id}"));
                self.list_state.select(Some(0));
                self.photo_index = 0;
            }
            Err(e) => self.set_status(format!("Add failed: {e}")),
        }
        self.adding_pin = false;
        self.input.clear();
    }

    fn submit_photo(&mut self, gateway: &mut StoreGateway<SqliteStore>) {
        let Some(pin_id) = self.selected_pin_id(gateway) else {
            self.set_status("No pin selected".to_string());
            self.input.clear();
            return;
        };
        let uri = self.input.trim().to_string();
        match gateway.add_photo(pin_id, &uri) {
            Ok(id) => {
                self.set_status(format!("Attached photo #{id} to pin #{pin_id}"));
                self.photo_index = 0;
            }
            Err(e) => self.set_status(format!("Attach failed: {e}")),
        }
        self.input.clear();
    }

    fn confirm_delete_pin(&mut self, gateway: &mut StoreGateway<SqliteStore>, id: i64) {
        match gateway.delete_pin(id) {
            Ok(()) => {
                self.set_status(format!("Deleted pin #{id}"));
                self.clamp_selection(gateway);
            }
            Err(e) => self.set_status(format!("Delete error: {e}")),
        }
    }

    fn confirm_delete_photo(&mut self, gateway: &mut StoreGateway<SqliteStore>, id: i64) {
        match gateway.delete_photo(id) {
            Ok(()) => {
                self.set_status(format!("Removed photo #{id}"));
                self.clamp_selection(gateway);
            }
            Err(e) => self.set_status(format!("Remove error: {e}")),
        }
    }
}

/// Parses typed pin input of the form `lat,lon` or `lat,lon,title`.
fn parse_pin_input(input: &str) -> Result<(f64, f64, Option<String>)> {
    let mut parts = input.splitn(3, ',');
    let lat = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PinError::InvalidInput("expected lat,lon[,title]".to_string()))?;
    let lon = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PinError::InvalidInput("expected lat,lon[,title]".to_string()))?;

    let latitude: f64 = lat
        .parse()
        .map_err(|_| PinError::InvalidInput(format!("bad latitude: {lat}")))?;
    let longitude: f64 = lon
        .parse()
        .map_err(|_| PinError::InvalidInput(format!("bad longitude: {lon}")))?;
    let title = parts
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    Ok((latitude, longitude, title))
}

fn format_age(dt: chrono::DateTime<Utc>) -> String {
    let dur = Utc::now() - dt;
    if dur.num_seconds() < 60 {
        "now".to_string()
    } else if dur.num_minutes() < 60 {
        format!("{}m", dur.num_minutes())
    } else if dur.num_hours() < 24 {
        format!("{}h", dur.num_hours())
    } else {
        format!("{}d", dur.num_days())
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{truncated}…")
    } else {
        truncated
    }
}

// ── UI rendering ───────────────────────────────────────────────────

fn draw(frame: &mut Frame, app: &mut App, gateway: &StoreGateway<SqliteStore>) {
    let [title_area, body_area, help_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    // Title bar
    let store_info = if gateway.is_ready() {
        String::new()
    } else {
        " — store unavailable".to_string()
    };
    let title = format!(
        " PINMAP — {} pins — {} photos{store_info} ",
        gateway.pins().len(),
        gateway.photos().len()
    );
    frame.render_widget(
        Paragraph::new(title).style(Style::new().fg(Color::Black).bg(Color::Cyan)),
        title_area,
    );

    // Body: two-pane split
    let [list_area, detail_area] =
        Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)])
            .areas(body_area);

    // Left pane: pin list
    let items: Vec<ListItem> = gateway
        .pins()
        .iter()
        .map(|pin| {
            let photo_count = gateway.photos_for(pin.id).len();
            let marker = if photo_count > 0 { "◉" } else { "○" };
            let age = format_age(pin.created_at);
            ListItem::new(format!(
                "{:>4} {} {:>4}  {}",
                pin.id,
                marker,
                age,
                truncate_chars(&pin.title, 24)
            ))
        })
        .collect();

    let list_title = if app.mode == Mode::AddPin {
        format!("New pin (lat,lon[,title]): {}_", app.input)
    } else {
        "Pins".to_string()
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(list_title))
        .highlight_style(
            Style::new()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, list_area, &mut app.list_state);

    // Right pane: pin detail and photos
    let detail_content = if let Some(idx) = app.list_state.selected() {
        if let Some(pin) = gateway.pins().get(idx) {
            let mut lines = vec![
                Line::from(vec![
                    Span::styled("ID:       ", Style::new().fg(Color::DarkGray)),
                    Span::raw(pin.id.to_string()),
                ]),
                Line::from(vec![
                    Span::styled("Title:    ", Style::new().fg(Color::DarkGray)),
                    Span::raw(pin.title.clone()),
                ]),
                Line::from(vec![
                    Span::styled("Position: ", Style::new().fg(Color::DarkGray)),
                    Span::raw(format!("{:.6}, {:.6}", pin.latitude, pin.longitude)),
                ]),
                Line::from(vec![
                    Span::styled("Created:  ", Style::new().fg(Color::DarkGray)),
                    Span::raw(pin.created_at.format("%Y-%m-%d %H:%M").to_string()),
                ]),
                Line::raw("─────────────────────────"),
            ];

            let photos = gateway.photos_for(pin.id);
            if photos.is_empty() {
                lines.push(Line::raw("No photos attached"));
            } else {
                for (i, photo) in photos.iter().enumerate() {
                    let cursor = if i == app.photo_index { "▸" } else { " " };
                    let line = format!(
                        "{cursor} {:>4}  {:>4}  {}",
                        photo.id,
                        format_age(photo.created_at),
                        photo.uri
                    );
                    if i == app.photo_index {
                        lines.push(Line::styled(line, Style::new().add_modifier(Modifier::BOLD)));
                    } else {
                        lines.push(Line::raw(line));
                    }
                }
            }

            lines
        } else {
            vec![Line::raw("No pin selected")]
        }
    } else {
        vec![Line::raw("No pins — press [a] to add one")]
    };

    let detail_title = match app.mode {
        Mode::AddPhoto => format!("Photo URI: {}_", app.input),
        _ => "Detail".to_string(),
    };

    let detail = Paragraph::new(detail_content)
        .block(Block::default().borders(Borders::ALL).title(detail_title))
        .wrap(Wrap { trim: false });

    frame.render_widget(detail, detail_area);

    // Auto-clear status after 3 seconds
    if let Some(t) = app.status_time
        && t.elapsed() > Duration::from_secs(3)
    {
        app.status.clear();
        app.status_time = None;
    }

    // Help bar
    let help_text = match app.mode {
        Mode::Normal | Mode::ConfirmDeletePin(_) | Mode::ConfirmDeletePhoto(_) => {
            if app.status.is_empty() {
                " [q]uit [a]dd pin [p]hoto [d]elete pin [x]remove photo [r]eload [J/K]photos"
                    .to_string()
            } else {
                format!(" {} ", app.status)
            }
        }
        Mode::AddPin => " Type lat,lon[,title] · [Enter] add · [Esc] cancel".to_string(),
        Mode::AddPhoto => " Type photo URI · [Enter] attach · [Esc] cancel".to_string(),
    };

    frame.render_widget(
        Paragraph::new(help_text).style(Style::new().fg(Color::Black).bg(Color::White)),
        help_area,
    );
}

// ── Event handling ─────────────────────────────────────────────────

fn handle_event(app: &mut App, gateway: &mut StoreGateway<SqliteStore>) -> std::io::Result<()> {
    if !event::poll(Duration::from_millis(250))? {
        return Ok(());
    }

    let Event::Key(key) = event::read()? else {
        return Ok(());
    };
    if key.kind != KeyEventKind::Press {
        return Ok(());
    }

    match app.mode {
        Mode::Normal => {
            let shifted = key.modifiers.contains(KeyModifiers::SHIFT);
            let pin_count = gateway.pins().len();
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
                KeyCode::Char('J') if shifted => {
                    let photo_len = app
                        .selected_pin_id(gateway)
                        .map(|id| gateway.photos_for(id).len())
                        .unwrap_or(0);
                    if photo_len > 0 {
                        app.photo_index = (app.photo_index + 1).min(photo_len - 1);
                    }
                }
                KeyCode::Char('K') if shifted => {
                    app.photo_index = app.photo_index.saturating_sub(1);
                }
                KeyCode::Char('j') | KeyCode::Down => app.select_next(pin_count),
                KeyCode::Char('k') | KeyCode::Up => app.select_prev(pin_count),
                KeyCode::Char('g') | KeyCode::Home => app.select_first(pin_count),
                KeyCode::Char('G') | KeyCode::End => app.select_last(pin_count),
                KeyCode::Char('a') => {
                    if app.adding_pin {
                        return Ok(());
                    }
                    app.mode = Mode::AddPin;
                    app.input.clear();
                    app.status.clear();
                    app.status_time = None;
                }
                KeyCode::Char('p') => {
                    if app.selected_pin_id(gateway).is_none() {
                        app.set_status("No pin selected".to_string());
                    } else {
                        app.mode = Mode::AddPhoto;
                        app.input.clear();
                        app.status.clear();
                        app.status_time = None;
                    }
                }
                KeyCode::Char('d') => {
                    if let Some(id) = app.selected_pin_id(gateway) {
                        app.mode = Mode::ConfirmDeletePin(id);
                        app.set_status(format!("Delete pin #{id} and its photos? [y/n]"));
                    }
                }
                KeyCode::Char('x') => {
                    if let Some(id) = app.selected_photo_id(gateway) {
                        app.mode = Mode::ConfirmDeletePhoto(id);
                        app.set_status(format!("Remove photo #{id}? [y/n]"));
                    }
                }
                KeyCode::Char('r') => match gateway.reload() {
                    Ok(()) => {
                        app.clamp_selection(gateway);
                        app.set_status("Reloaded".to_string());
                    }
                    Err(e) => app.set_status(format!("Reload error: {e}")),
                },
                _ => {}
            }
        }
        Mode::ConfirmDeletePin(id) => match key.code {
            KeyCode::Char('y') => {
                app.mode = Mode::Normal;
                app.confirm_delete_pin(gateway, id);
            }
            _ => {
                app.mode = Mode::Normal;
                app.set_status("Delete cancelled".to_string());
            }
        },
        Mode::ConfirmDeletePhoto(id) => match key.code {
            KeyCode::Char('y') => {
                app.mode = Mode::Normal;
                app.confirm_delete_photo(gateway, id);
            }
            _ => {
                app.mode = Mode::Normal;
                app.set_status("Remove cancelled".to_string());
            }
        },
        Mode::AddPin => match key.code {
            KeyCode::Esc => {
                app.mode = Mode::Normal;
                app.input.clear();
            }
            KeyCode::Enter => {
                app.submit_pin(gateway);
                app.mode = Mode::Normal;
            }
            KeyCode::Backspace => {
                app.input.pop();
            }
            KeyCode::Char(c) => {
                app.input.push(c);
            }
            _ => {}
        },
        Mode::AddPhoto => match key.code {
            KeyCode::Esc => {
                app.mode = Mode::Normal;
                app.input.clear();
            }
            KeyCode::Enter => {
                app.submit_photo(gateway);
                app.mode = Mode::Normal;
            }
            KeyCode::Backspace => {
                app.input.pop();
            }
            KeyCode::Char(c) => {
                app.input.push(c);
            }
            _ => {}
        },
    }

    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────

pub fn run(paths: &AppPaths) -> Result<()> {
    let mut gateway = StoreGateway::open_or_detached(paths);

    let mut app = App::new();
    app.clamp_selection(&gateway);
    if !gateway.is_ready() {
        app.set_status("Store unavailable — showing no data".to_string());
    }

    let mut terminal = ratatui::init();

    let result = (|| {
        loop {
            terminal.draw(|frame| draw(frame, &mut app, &gateway))?;
            handle_event(&mut app, &mut gateway)?;
            if app.should_quit {
                break;
            }
        }
        Ok::<(), std::io::Error>(())
    })();

    ratatui::restore();

    result.map_err(PinError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pin_input_coords_only() {
        let (lat, lon, title) = parse_pin_input("58.0105, 56.2502").unwrap();
        assert_eq!(lat, 58.0105);
        assert_eq!(lon, 56.2502);
        assert!(title.is_none());
    }

    #[test]
    fn test_parse_pin_input_with_title() {
        let (lat, lon, title) = parse_pin_input("58.01,56.25, Perm, city center").unwrap();
        assert_eq!(lat, 58.01);
        assert_eq!(lon, 56.25);
        // Title may itself contain commas.
        assert_eq!(title.as_deref(), Some("Perm, city center"));
    }

    #[test]
    fn test_parse_pin_input_negative_coords() {
        let (lat, lon, _) = parse_pin_input("-33.8688,151.2093").unwrap();
        assert_eq!(lat, -33.8688);
        assert_eq!(lon, 151.2093);
    }

    #[test]
    fn test_parse_pin_input_missing_lon() {
        assert!(matches!(
            parse_pin_input("58.01"),
            Err(PinError::InvalidInput(_))
        ));
        assert!(matches!(
            parse_pin_input("58.01,"),
            Err(PinError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_parse_pin_input_garbage() {
        assert!(matches!(
            parse_pin_input("north,south"),
            Err(PinError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("a longer title", 8), "a longer…");
    }

    #[test]
    fn test_format_age_recent() {
        assert_eq!(format_age(Utc::now()), "now");
    }
}
