// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Relay activity display widget.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::relay::RelaySnapshot;

/// Widget for displaying relay counters and recent messages
pub struct ActivityWidget<'a> {
    snapshot: &'a RelaySnapshot,
}

impl<'a> ActivityWidget<'a> {
    /// Create a new activity widget
    pub fn new(snapshot: &'a RelaySnapshot) -> Self {
        Self { snapshot }
    }
}

impl Widget for ActivityWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = match self.snapshot.fault {
            Some(_) => Span::styled(
                " Relay [STOPPED] ",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            None => Span::raw(" Relay "),
        };

        let block = Block::default().borders(Borders::ALL).title(title);

        let inner = block.inner(area);
        block.render(area, buf);

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(inner);

        render_counters(chunks[0], buf, self.snapshot);
        render_recent(chunks[1], buf, &self.snapshot.recent);
    }
}

fn render_counters(area: Rect, buf: &mut Buffer, snapshot: &RelaySnapshot) {
    let label = Style::default().fg(Color::Cyan);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Forwarded ", label),
            Span::raw(format!(
                "{} msgs / {} bytes",
                snapshot.forwarded, snapshot.bytes_written
            )),
        ]),
        Line::from(vec![
            Span::styled("Discarded ", label),
            Span::raw(format!("{} reply bytes", snapshot.bytes_drained)),
        ]),
        Line::from(vec![
            Span::styled("Dropped   ", label),
            Span::raw(snapshot.dropped.to_string()),
        ]),
    ];

    if let Some(fault) = &snapshot.fault {
        lines.push(Line::from(Span::styled(
            fault.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    Paragraph::new(lines).render(area, buf);
}

/// Render the most recent messages first, as many as fit under the header
fn render_recent(area: Rect, buf: &mut Buffer, recent: &[Vec<u8>]) {
    let max = area.height.saturating_sub(1) as usize;
    let mut lines = vec![Line::from(Span::styled(
        " Last sent ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ))];

    for (i, message) in recent.iter().rev().take(max).enumerate() {
        let color = if i == 0 { Color::White } else { Color::DarkGray };
        lines.push(Line::from(Span::styled(
            format_bytes(message),
            Style::default().fg(color),
        )));
    }

    Paragraph::new(lines).render(area, buf);
}

/// Hex dump, e.g. `90 3C 64`
pub fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
