// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Terminal UI for the bridge.
//!
//! Provides a ratatui-based interface with a MIDI input list, a serial
//! device list, Connect/Disconnect actions, relay activity and a modal
//! message box for connection failures.

mod activity;
mod device_list;

pub use activity::{format_bytes, ActivityWidget};
pub use device_list::{DeviceList, DeviceListWidget};

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::devices::{serial_device_names, ComNameFilter, DeviceRegistry};
use crate::midi::MidiBackend;
use crate::relay::RelaySnapshot;
use crate::serial::SerialBackend;
use crate::session::Session;

/// Which list receives Up/Down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Midi,
    Serial,
}

impl Focus {
    pub fn toggle(self) -> Self {
        match self {
            Focus::Midi => Focus::Serial,
            Focus::Serial => Focus::Midi,
        }
    }
}

/// Modal dialog text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBox {
    pub title: String,
    pub text: String,
}

impl MessageBox {
    /// A failed connect attempt
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Self {
            title: "Connection failed".to_string(),
            text: reason.into(),
        }
    }

    /// Something the user has to do before continuing
    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            title: "Notice".to_string(),
            text: text.into(),
        }
    }
}

/// UI state
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// MIDI input devices
    pub midi_devices: DeviceList,
    /// Serial-capable devices
    pub serial_devices: DeviceList,
    /// Focused list
    pub focus: Focus,
    /// Active (MIDI device, serial port), if connected
    pub connection: Option<(String, String)>,
    /// Configured baud rate, for display
    pub baud_rate: u32,
    /// Modal message; blocks other input until dismissed
    pub message_box: Option<MessageBox>,
    /// Help overlay visible
    pub show_help: bool,
    /// Status message
    pub status_message: Option<String>,
    /// Status message timestamp
    pub status_time: Option<Instant>,
    /// Relay counters
    pub activity: RelaySnapshot,
}

impl UiState {
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Set a status message that will be displayed temporarily
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_time = Some(Instant::now());
    }

    /// Clear expired status message
    pub fn clear_expired_status(&mut self) {
        if let Some(time) = self.status_time {
            if time.elapsed() > Duration::from_secs(3) {
                self.status_message = None;
                self.status_time = None;
            }
        }
    }

    fn focused_list(&mut self) -> &mut DeviceList {
        match self.focus {
            Focus::Midi => &mut self.midi_devices,
            Focus::Serial => &mut self.serial_devices,
        }
    }
}

/// Key event result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// No action needed
    None,
    /// Disconnect and quit
    Quit,
    /// Open the selected pair
    Connect,
    /// Close the active connection
    Disconnect,
    /// Re-enumerate devices
    Refresh,
    /// Switch focus between the lists
    SwitchFocus,
    /// Move selection down
    SelectNext,
    /// Move selection up
    SelectPrevious,
    /// Close the message box
    DismissMessage,
    /// Toggle help
    ToggleHelp,
}

/// Map a key press to an action.
///
/// Connect is only offered while disconnected and Disconnect only while
/// connected. A visible message box swallows everything but Enter/Esc.
pub fn map_key(state: &UiState, code: KeyCode, modifiers: KeyModifiers) -> KeyAction {
    if state.message_box.is_some() {
        return match code {
            KeyCode::Enter | KeyCode::Esc => KeyAction::DismissMessage,
            _ => KeyAction::None,
        };
    }

    match (code, modifiers) {
        (KeyCode::Char('q'), KeyModifiers::NONE)
        | (KeyCode::Char('c'), KeyModifiers::CONTROL) => KeyAction::Quit,

        (KeyCode::Char('c'), KeyModifiers::NONE) | (KeyCode::Enter, _) => {
            if state.is_connected() {
                KeyAction::None
            } else {
                KeyAction::Connect
            }
        }
        (KeyCode::Char('d'), KeyModifiers::NONE) => {
            if state.is_connected() {
                KeyAction::Disconnect
            } else {
                KeyAction::None
            }
        }

        (KeyCode::Char('r'), KeyModifiers::NONE) => KeyAction::Refresh,

        (KeyCode::Tab, _) | (KeyCode::BackTab, _) | (KeyCode::Left, _) | (KeyCode::Right, _) => {
            KeyAction::SwitchFocus
        }
        (KeyCode::Down, _) | (KeyCode::Char('j'), KeyModifiers::NONE) => KeyAction::SelectNext,
        (KeyCode::Up, _) | (KeyCode::Char('k'), KeyModifiers::NONE) => KeyAction::SelectPrevious,

        (KeyCode::Char('?'), _) | (KeyCode::Char('h'), KeyModifiers::NONE) => KeyAction::ToggleHelp,
        (KeyCode::Esc, _) if state.show_help => KeyAction::ToggleHelp,

        _ => KeyAction::None,
    }
}

/// Applies actions to the session and keeps the UI state in step with it
pub struct Controller<M: MidiBackend, S: SerialBackend> {
    session: Session<M, S>,
    registry: Box<dyn DeviceRegistry>,
    filter: ComNameFilter,
    state: UiState,
    running: bool,
}

impl<M: MidiBackend, S: SerialBackend> Controller<M, S> {
    pub fn new(session: Session<M, S>, registry: Box<dyn DeviceRegistry>, filter: ComNameFilter) -> Self {
        let state = UiState {
            baud_rate: session.config().serial.baud_rate,
            ..Default::default()
        };
        let mut controller = Self {
            session,
            registry,
            filter,
            state,
            running: true,
        };
        controller.refresh();
        controller
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn session(&self) -> &Session<M, S> {
        &self.session
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Re-enumerate both device lists
    pub fn refresh(&mut self) {
        match self.session.midi_devices() {
            Ok(names) => self.state.midi_devices.replace(names),
            Err(e) => {
                self.state.midi_devices.replace(Vec::new());
                self.state.set_status(format!("MIDI enumeration failed: {}", e));
            }
        }

        match serial_device_names(self.registry.as_ref(), &self.filter) {
            Ok(names) => self.state.serial_devices.replace(names),
            Err(e) => {
                self.state.serial_devices.replace(Vec::new());
                self.state.set_status(format!("Serial enumeration failed: {}", e));
            }
        }
    }

    /// Pull relay counters and expire old status text
    pub fn tick(&mut self) {
        self.state.activity = self.session.relay_snapshot();
        self.state.clear_expired_status();
    }

    pub fn apply(&mut self, action: KeyAction) {
        match action {
            KeyAction::None => {}
            KeyAction::Quit => {
                self.session.disconnect();
                self.state.connection = None;
                self.running = false;
            }
            KeyAction::Connect => self.connect(),
            KeyAction::Disconnect => {
                self.session.disconnect();
                self.state.connection = None;
                self.state.set_status("Disconnected");
            }
            KeyAction::Refresh => {
                self.refresh();
                self.state.set_status("Device lists refreshed");
            }
            KeyAction::SwitchFocus => self.state.focus = self.state.focus.toggle(),
            KeyAction::SelectNext => {
                if !self.state.is_connected() {
                    self.state.focused_list().select_next();
                }
            }
            KeyAction::SelectPrevious => {
                if !self.state.is_connected() {
                    self.state.focused_list().select_previous();
                }
            }
            KeyAction::DismissMessage => self.state.message_box = None,
            KeyAction::ToggleHelp => self.state.show_help = !self.state.show_help,
        }
    }

    fn connect(&mut self) {
        if self.session.is_connected() {
            return;
        }

        let (midi, serial) = match (
            self.state.midi_devices.selected_name(),
            self.state.serial_devices.selected_name(),
        ) {
            (Some(midi), Some(serial)) => (midi.to_string(), serial.to_string()),
            _ => {
                self.state.message_box = Some(MessageBox::notice(
                    "Select a MIDI input and a serial device first.",
                ));
                return;
            }
        };

        match self.session.connect(&midi, &serial) {
            Ok(()) => {
                let port = self
                    .session
                    .connection()
                    .map(|c| c.serial_port().to_string())
                    .unwrap_or_default();
                self.state.set_status(format!("Connected {} -> {}", midi, port));
                self.state.connection = Some((midi, port));
            }
            Err(e) => {
                self.state.connection = None;
                self.state.message_box = Some(MessageBox::connection_failed(e.to_string()));
            }
        }
    }
}

/// Terminal UI application
pub struct App<M: MidiBackend, S: SerialBackend> {
    controller: Controller<M, S>,
    terminal: Terminal<CrosstermBackend<Stdout>>,
    frame_rate: u32,
}

impl<M: MidiBackend, S: SerialBackend> App<M, S> {
    /// Take over the terminal
    pub fn new(controller: Controller<M, S>, frame_rate: u32) -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            controller,
            terminal,
            frame_rate: frame_rate.clamp(1, 120),
        })
    }

    /// Run until the user quits
    pub fn run(&mut self) -> io::Result<()> {
        while self.controller.is_running() {
            self.controller.tick();
            self.draw()?;

            if let Some(Event::Key(key)) = self.poll_event()? {
                if key.kind == KeyEventKind::Press {
                    let action = map_key(self.controller.state(), key.code, key.modifiers);
                    self.controller.apply(action);
                }
            }
        }
        Ok(())
    }

    /// Poll for events with timeout
    fn poll_event(&self) -> io::Result<Option<Event>> {
        let timeout = Duration::from_millis(1000 / self.frame_rate as u64);
        if event::poll(timeout)? {
            Ok(Some(event::read()?))
        } else {
            Ok(None)
        }
    }

    fn draw(&mut self) -> io::Result<()> {
        let state = self.controller.state().clone();
        self.terminal.draw(|frame| render(frame, &state))?;
        Ok(())
    }

    fn cleanup(&mut self) -> io::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl<M: MidiBackend, S: SerialBackend> Drop for App<M, S> {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Draw the whole screen
pub fn render(frame: &mut Frame, state: &UiState) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Connection header
            Constraint::Min(6),    // Device lists
            Constraint::Length(3), // Buttons
            Constraint::Length(7), // Relay activity
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header(frame, chunks[0], state);
    render_lists(frame, chunks[1], state);
    render_buttons(frame, chunks[2], state);
    frame.render_widget(ActivityWidget::new(&state.activity), chunks[3]);
    render_status_bar(frame, chunks[4], state);

    if state.show_help {
        render_help_overlay(frame, area);
    }
    if let Some(message) = &state.message_box {
        render_message_box(frame, area, message);
    }
}

fn render_header(frame: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default().borders(Borders::ALL).title(" midi2com ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let line = match &state.connection {
        Some((midi, port)) => Line::from(vec![
            Span::styled(
                "● CONNECTED ",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("{} -> {} @ {} baud", midi, port, state.baud_rate)),
        ]),
        None => Line::from(Span::styled(
            "○ DISCONNECTED",
            Style::default().fg(Color::Yellow),
        )),
    };
    frame.render_widget(Paragraph::new(line), inner);
}

fn render_lists(frame: &mut Frame, area: Rect, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let enabled = !state.is_connected();
    frame.render_widget(
        DeviceListWidget::new(&state.midi_devices, "MIDI Input")
            .focused(state.focus == Focus::Midi)
            .enabled(enabled),
        chunks[0],
    );
    frame.render_widget(
        DeviceListWidget::new(&state.serial_devices, "Serial Device")
            .focused(state.focus == Focus::Serial)
            .enabled(enabled),
        chunks[1],
    );
}

fn render_buttons(frame: &mut Frame, area: Rect, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(18),
            Constraint::Length(18),
            Constraint::Min(0),
        ])
        .split(area);

    let connected = state.is_connected();
    frame.render_widget(button("Connect (c)", !connected, Color::Green), chunks[0]);
    frame.render_widget(button("Disconnect (d)", connected, Color::Red), chunks[1]);
}

fn button(label: &str, enabled: bool, color: Color) -> Paragraph<'_> {
    let style = if enabled {
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Paragraph::new(Span::styled(label, style))
        .block(Block::default().borders(Borders::ALL).border_style(style))
}

fn render_status_bar(frame: &mut Frame, area: Rect, state: &UiState) {
    let text = if let Some(ref msg) = state.status_message {
        Span::styled(msg, Style::default().fg(Color::Yellow))
    } else {
        Span::styled(
            " Tab: Switch list | Up/Down: Select | c: Connect | d: Disconnect | r: Refresh | h: Help | q: Quit",
            Style::default().fg(Color::DarkGray),
        )
    };

    frame.render_widget(Paragraph::new(text), area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}

fn render_message_box(frame: &mut Frame, area: Rect, message: &MessageBox) {
    let box_area = centered(area, 60, 7);
    frame.render_widget(Clear, box_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(format!(" {} ", message.title));
    let inner = block.inner(box_area);
    frame.render_widget(block, box_area);

    let lines = vec![
        Line::from(message.text.clone()),
        Line::from(""),
        Line::from(Span::styled(
            "Enter: OK",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let help_area = centered(area, 46, 13);
    frame.render_widget(Clear, help_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .style(Style::default().bg(Color::Black));

    let inner = block.inner(help_area);
    frame.render_widget(block, help_area);

    let help_text = vec![
        Line::from(Span::styled("Devices", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  Tab/Left/Right  Switch list"),
        Line::from("  Up/Down         Select device"),
        Line::from("  r               Refresh lists"),
        Line::from(""),
        Line::from(Span::styled("Connection", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  c/Enter         Connect"),
        Line::from("  d               Disconnect"),
        Line::from(""),
        Line::from("  h/?             Toggle help"),
        Line::from("  q/Ctrl+c        Quit"),
    ];

    frame.render_widget(Paragraph::new(help_text), inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn disconnected() -> UiState {
        UiState::default()
    }

    fn connected() -> UiState {
        UiState {
            connection: Some(("Keystation 49".to_string(), "COM3".to_string())),
            ..Default::default()
        }
    }

    #[test]
    fn test_connect_only_while_disconnected() {
        let state = disconnected();
        assert_eq!(map_key(&state, KeyCode::Char('c'), KeyModifiers::NONE), KeyAction::Connect);
        assert_eq!(map_key(&state, KeyCode::Enter, KeyModifiers::NONE), KeyAction::Connect);
        assert_eq!(map_key(&state, KeyCode::Char('d'), KeyModifiers::NONE), KeyAction::None);

        let state = connected();
        assert_eq!(map_key(&state, KeyCode::Char('c'), KeyModifiers::NONE), KeyAction::None);
        assert_eq!(map_key(&state, KeyCode::Char('d'), KeyModifiers::NONE), KeyAction::Disconnect);
    }

    #[test]
    fn test_quit_keys() {
        let state = connected();
        assert_eq!(map_key(&state, KeyCode::Char('q'), KeyModifiers::NONE), KeyAction::Quit);
        assert_eq!(map_key(&state, KeyCode::Char('c'), KeyModifiers::CONTROL), KeyAction::Quit);
    }

    #[test]
    fn test_message_box_is_modal() {
        let state = UiState {
            message_box: Some(MessageBox::connection_failed("no serial port matches 'X'")),
            ..Default::default()
        };
        assert_eq!(map_key(&state, KeyCode::Char('q'), KeyModifiers::NONE), KeyAction::None);
        assert_eq!(map_key(&state, KeyCode::Down, KeyModifiers::NONE), KeyAction::None);
        assert_eq!(map_key(&state, KeyCode::Enter, KeyModifiers::NONE), KeyAction::DismissMessage);
        assert_eq!(map_key(&state, KeyCode::Esc, KeyModifiers::NONE), KeyAction::DismissMessage);
    }

    #[test]
    fn test_navigation_keys() {
        let state = disconnected();
        assert_eq!(map_key(&state, KeyCode::Tab, KeyModifiers::NONE), KeyAction::SwitchFocus);
        assert_eq!(map_key(&state, KeyCode::Down, KeyModifiers::NONE), KeyAction::SelectNext);
        assert_eq!(map_key(&state, KeyCode::Up, KeyModifiers::NONE), KeyAction::SelectPrevious);
        assert_eq!(map_key(&state, KeyCode::Char('r'), KeyModifiers::NONE), KeyAction::Refresh);
    }

    #[test]
    fn test_focus_toggle() {
        assert_eq!(Focus::Midi.toggle(), Focus::Serial);
        assert_eq!(Focus::Serial.toggle(), Focus::Midi);
    }

    #[test]
    fn test_ui_state_status() {
        let mut state = UiState::default();
        assert!(state.status_message.is_none());

        state.set_status("Connected");
        assert_eq!(state.status_message, Some("Connected".to_string()));
        state.clear_expired_status();
        assert!(state.status_message.is_some());
    }

    #[test]
    fn test_render_with_message_box() {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let state = UiState {
            midi_devices: DeviceList::new(vec!["Keystation 49".to_string()]),
            serial_devices: DeviceList::new(vec!["USB Serial Device (COM3)".to_string()]),
            message_box: Some(MessageBox::connection_failed("Access is denied.")),
            ..Default::default()
        };

        terminal.draw(|frame| render(frame, &state)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Connection failed"));
        assert!(text.contains("Access is denied."));
        assert!(text.contains("DISCONNECTED"));
    }

    #[test]
    fn test_render_notice_title() {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let state = UiState {
            message_box: Some(MessageBox::notice("Select a MIDI input and a serial device first.")),
            ..Default::default()
        };

        terminal.draw(|frame| render(frame, &state)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains(" Notice "));
        assert!(!text.contains("Connection failed"));
    }
}
