//! Single-line text input used by the form screens

use crossterm::event::KeyCode;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Editable text buffer with a character-based cursor
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    value: String,
    /// Cursor position in characters, not bytes
    cursor_pos: usize,
    placeholder: String,
    max_length: Option<usize>,
}

impl TextInput {
    pub fn new(placeholder: &str) -> Self {
        Self {
            placeholder: placeholder.to_string(),
            ..Self::default()
        }
    }

    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, new_value: &str) {
        self.value = new_value.to_string();
        self.cursor_pos = self.value.chars().count();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor_pos = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    fn byte_index(&self, char_pos: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_pos)
            .map_or(self.value.len(), |(i, _)| i)
    }

    /// Handle a key event, returns true if the value changed
    pub fn handle_key(&mut self, key: KeyCode) -> bool {
        let len = self.value.chars().count();
        match key {
            KeyCode::Char(c) => {
                if self.max_length.is_some_and(|m| len >= m) {
                    return false;
                }
                let at = self.byte_index(self.cursor_pos);
                self.value.insert(at, c);
                self.cursor_pos += 1;
                true
            }
            KeyCode::Backspace if self.cursor_pos > 0 => {
                self.cursor_pos -= 1;
                let at = self.byte_index(self.cursor_pos);
                self.value.remove(at);
                true
            }
            KeyCode::Delete if self.cursor_pos < len => {
                let at = self.byte_index(self.cursor_pos);
                self.value.remove(at);
                true
            }
            KeyCode::Left => {
                self.cursor_pos = self.cursor_pos.saturating_sub(1);
                false
            }
            KeyCode::Right => {
                self.cursor_pos = (self.cursor_pos + 1).min(len);
                false
            }
            KeyCode::Home => {
                self.cursor_pos = 0;
                false
            }
            KeyCode::End => {
                self.cursor_pos = len;
                false
            }
            _ => false,
        }
    }

    /// Spans for the value, with a block cursor when focused
    fn value_spans(&self, focused: bool) -> Vec<Span<'static>> {
        if self.value.is_empty() && !focused {
            return vec![Span::styled(
                self.placeholder.clone(),
                Style::default().fg(Color::DarkGray),
            )];
        }
        if !focused {
            return vec![Span::raw(self.value.clone())];
        }
        let at = self.byte_index(self.cursor_pos);
        let (before, rest) = self.value.split_at(at);
        let mut chars = rest.chars();
        let under = chars.next().map_or_else(|| " ".to_string(), |c| c.to_string());
        vec![
            Span::raw(before.to_string()),
            Span::styled(under, Style::default().add_modifier(Modifier::REVERSED)),
            Span::raw(chars.as_str().to_string()),
        ]
    }

    /// Render as `label: value`, with the first error below when present
    pub fn render(
        &self,
        frame: &mut Frame,
        area: Rect,
        label: &str,
        focused: bool,
        error: Option<&str>,
    ) {
        let label_style = if focused {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let mut spans = vec![Span::styled(format!("{label}: "), label_style)];
        spans.extend(self.value_spans(focused));

        let mut lines = vec![Line::from(spans)];
        if let Some(error) = error {
            lines.push(Line::from(Span::styled(
                format!("  {error}"),
                Style::default().fg(Color::Red),
            )));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }
}
