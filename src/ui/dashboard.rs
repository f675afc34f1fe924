use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::api::resources::ResourceKind;
use crate::config::Config;

/// Entries of the main menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEntry {
    Consulta,
    Resumen,
    NuevoCliente,
    List(ResourceKind),
}

impl MenuEntry {
    pub fn all() -> Vec<MenuEntry> {
        let mut entries = vec![MenuEntry::Consulta, MenuEntry::Resumen, MenuEntry::NuevoCliente];
        entries.extend(ResourceKind::ALL.into_iter().map(MenuEntry::List));
        entries
    }

    pub fn label(self) -> String {
        match self {
            MenuEntry::Consulta => "Consulta de cliente (migración)".to_string(),
            MenuEntry::Resumen => "Resumen de cliente".to_string(),
            MenuEntry::NuevoCliente => "Nuevo cliente".to_string(),
            MenuEntry::List(kind) => kind.label().to_string(),
        }
    }

    /// Shortcut key shown next to the label
    pub fn shortcut(self) -> Option<char> {
        match self {
            MenuEntry::Consulta => Some('m'),
            MenuEntry::Resumen => Some('s'),
            MenuEntry::NuevoCliente => Some('a'),
            MenuEntry::List(_) => None,
        }
    }
}

pub struct Dashboard {
    entries: Vec<MenuEntry>,
    pub state: ListState,
    base_url: String,
    status: Option<String>,
}

impl Dashboard {
    pub fn new(config: &Config) -> Self {
        let mut state = ListState::default();
        state.select(Some(0));
        Self {
            entries: MenuEntry::all(),
            state,
            base_url: config.api.base_url.clone(),
            status: None,
        }
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn selected(&self) -> Option<MenuEntry> {
        self.state.selected().and_then(|i| self.entries.get(i).copied())
    }

    pub fn entry_for_shortcut(&self, c: char) -> Option<MenuEntry> {
        self.entries.iter().copied().find(|e| e.shortcut() == Some(c))
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    pub fn select_next(&mut self) {
        let len = self.entries.len();
        let i = self
            .state
            .selected()
            .map_or(0, |i| if i >= len - 1 { 0 } else { i + 1 });
        self.state.select(Some(i));
    }

    pub fn select_prev(&mut self) {
        let len = self.entries.len();
        let i = self
            .state
            .selected()
            .map_or(0, |i| if i == 0 { len - 1 } else { i - 1 });
        self.state.select(Some(i));
    }

    /// Header, content area and status bar; returns the content area
    pub fn render_frame(&self, frame: &mut Frame, title: &str, help: &str) -> Rect {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Header
                Constraint::Min(10),   // Main content
                Constraint::Length(2), // Status bar
            ])
            .split(frame.area());

        let header = Line::from(vec![
            Span::styled(
                " Back-office",
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" v{}", env!("CARGO_PKG_VERSION")),
                Style::default().fg(Color::Gray),
            ),
            Span::styled("  │  ", Style::default().fg(Color::DarkGray)),
            Span::styled(title.to_string(), Style::default().fg(Color::Cyan)),
            Span::styled("  │  ", Style::default().fg(Color::DarkGray)),
            Span::styled(self.base_url.clone(), Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(
            Paragraph::new(header).block(Block::default().borders(Borders::BOTTOM)),
            chunks[0],
        );

        let status = match &self.status {
            Some(message) => Span::styled(message.clone(), Style::default().fg(Color::Yellow)),
            None => Span::styled(help.to_string(), Style::default().fg(Color::DarkGray)),
        };
        frame.render_widget(
            Paragraph::new(Line::from(status)).block(Block::default().borders(Borders::TOP)),
            chunks[2],
        );

        chunks[1]
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = self.render_frame(
            frame,
            "Menú",
            "[j/k] mover  [Enter] abrir  [m]igrar  re[s]umen  [a]lta  [q] salir",
        );

        let items: Vec<ListItem> = self
            .entries
            .iter()
            .map(|entry| {
                let key = entry
                    .shortcut()
                    .map_or_else(|| "   ".to_string(), |c| format!("[{c}]"));
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{key} "), Style::default().fg(Color::Yellow)),
                    Span::raw(entry.label()),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().title(" Menú ").borders(Borders::ALL))
            .highlight_style(
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, area, &mut self.state);
    }
}
