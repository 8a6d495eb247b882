// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Selectable device list.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, StatefulWidget, Widget},
};

/// Device names plus the current selection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceList {
    items: Vec<String>,
    selected: Option<usize>,
}

impl DeviceList {
    /// Create a list with the first entry selected
    pub fn new(items: Vec<String>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    /// Replace the entries, keeping the selected name if it is still present
    pub fn replace(&mut self, items: Vec<String>) {
        let previous = self.selected_name().map(str::to_string);
        self.items = items;
        self.selected = match previous {
            Some(name) => self.items.iter().position(|i| *i == name),
            None => None,
        }
        .or(if self.items.is_empty() { None } else { Some(0) });
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.items.get(i))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Move the selection down, wrapping to the top
    pub fn select_next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = Some(match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        });
    }

    /// Move the selection up, wrapping to the bottom
    pub fn select_previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let last = self.items.len() - 1;
        self.selected = Some(match self.selected {
            Some(0) | None => last,
            Some(i) => i - 1,
        });
    }
}

/// Widget for a device list
pub struct DeviceListWidget<'a> {
    list: &'a DeviceList,
    title: &'a str,
    focused: bool,
    enabled: bool,
}

impl<'a> DeviceListWidget<'a> {
    pub fn new(list: &'a DeviceList, title: &'a str) -> Self {
        Self {
            list,
            title,
            focused: false,
            enabled: true,
        }
    }

    /// Highlight the border when the list has keyboard focus
    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Dim the list while selection changes have no effect
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Widget for DeviceListWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(format!(" {} ", self.title));

        if self.list.is_empty() {
            let inner = block.inner(area);
            block.render(area, buf);
            Paragraph::new("No devices found (r: refresh)")
                .style(Style::default().fg(Color::DarkGray))
                .render(inner, buf);
            return;
        }

        let item_style = if self.enabled {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let items: Vec<ListItem> = self
            .list
            .items()
            .iter()
            .map(|name| ListItem::new(name.as_str()).style(item_style))
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan))
            .highlight_symbol("> ");

        let mut state = ListState::default().with_selected(self.list.selected());
        StatefulWidget::render(list, area, buf, &mut state);
    }
}
