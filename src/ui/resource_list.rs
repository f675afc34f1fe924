//! Paginated list screen shared by every back-office collection

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use serde_json::Value;
use tracing::warn;

use super::centered_rect;
use super::form_field::TextInput;
use crate::api::error::ApiError;
use crate::api::resources::{
    Cliente, Componente, EquipoOnu, EstadoEquipo, Lote, Marca, Modelo, Permiso, Plan, Resource,
    ResourceKind, Rol, TipoEquipo, Usuario,
};
use crate::listing::{EquipoStats, Filterable, ListView, LoteStats, PaginatedList, RolStats};

/// What the app should do after a key press on a list
#[derive(Debug, Clone, PartialEq)]
pub enum ListAction {
    None,
    Back,
    Refresh,
    Delete { id: i64 },
    /// Open the selected record (as JSON) for editing
    Open(Value),
}

/// A record type that can be shown on a list screen
pub trait ListRow: Filterable + Resource {
    /// Counter line shown above the list
    fn summary(_items: &[Self]) -> Option<String> {
        None
    }
}

impl ListRow for Rol {
    fn summary(items: &[Self]) -> Option<String> {
        let s = RolStats::from_roles(items);
        Some(format!(
            "{} roles · {} activos · {} inactivos · {} con usuarios · {} usuarios asignados",
            s.total,
            s.activos,
            s.inactivos(),
            s.con_usuarios,
            s.total_usuarios
        ))
    }
}

impl ListRow for EquipoOnu {
    fn summary(items: &[Self]) -> Option<String> {
        let s = EquipoStats::from_equipos(items);
        Some(format!(
            "{} equipos · {} disponibles ({}%) · {} asignados · {} en mantenimiento · {} dañados",
            s.total, s.disponibles, s.pct_disponible, s.asignados, s.mantenimiento, s.danados
        ))
    }
}

impl ListRow for Lote {
    fn summary(items: &[Self]) -> Option<String> {
        let s = LoteStats::from_lotes(items);
        Some(format!(
            "{} lotes · {} pendientes · {} completos · {}/{} equipos registrados",
            s.total, s.pendientes, s.completos, s.equipos_registrados, s.equipos_esperados
        ))
    }
}

impl ListRow for Componente {
    fn summary(items: &[Self]) -> Option<String> {
        let en_uso = items.iter().filter(|c| c.modelos_usando > 0).count();
        Some(format!(
            "{} componentes · {} en uso · {} sin uso",
            items.len(),
            en_uso,
            items.len() - en_uso
        ))
    }
}

impl ListRow for EstadoEquipo {
    fn summary(items: &[Self]) -> Option<String> {
        let con_equipos = items.iter().filter(|e| e.equipos_count > 0).count();
        Some(format!(
            "{} estados · {} con equipos · {} sin equipos",
            items.len(),
            con_equipos,
            items.len() - con_equipos
        ))
    }
}

impl ListRow for Usuario {
    fn summary(items: &[Self]) -> Option<String> {
        let activos = items.iter().filter(|u| u.is_active).count();
        let migrados = items.iter().filter(|u| u.es_usuario_migrado).count();
        Some(format!(
            "{} usuarios · {} activos · {} migrados · {} manuales",
            items.len(),
            activos,
            migrados,
            items.len() - migrados
        ))
    }
}

impl ListRow for TipoEquipo {}
impl ListRow for Permiso {}
impl ListRow for Marca {}
impl ListRow for Modelo {}
impl ListRow for Cliente {}
impl ListRow for Plan {}

/// Object-safe view of a list screen, so the app can hold any collection
pub trait ListPane: Send {
    fn kind(&self) -> ResourceKind;
    fn set_loading(&mut self);
    /// Replace the items with a freshly fetched JSON list
    fn load(&mut self, values: Vec<Value>);
    fn load_failed(&mut self, error: &ApiError);
    fn set_status(&mut self, message: String);
    fn handle_key(&mut self, key: KeyCode) -> ListAction;
    fn render(&mut self, frame: &mut Frame, area: Rect);
}

pub struct ResourceListScreen<T> {
    kind: ResourceKind,
    view: ListView<T>,
    search: TextInput,
    search_focused: bool,
    loading: bool,
    error: Option<String>,
    status: Option<String>,
    pending_delete: Option<i64>,
}

impl<T: ListRow> ResourceListScreen<T> {
    pub fn new(kind: ResourceKind, page_size: usize) -> Self {
        Self {
            kind,
            view: ListView::new(page_size),
            search: TextInput::new("escriba para buscar"),
            search_focused: false,
            loading: true,
            error: None,
            status: None,
            pending_delete: None,
        }
    }

    pub fn view(&self) -> &ListView<T> {
        &self.view
    }

    /// Cycle the first boolean filter: any, yes, no
    fn cycle_flag(&mut self) {
        let Some(key) = T::FLAG_KEYS.first() else {
            return;
        };
        let next = match self.view.filter().flag_value(key) {
            None => Some(true),
            Some(true) => Some(false),
            Some(false) => None,
        };
        self.view.set_flag(key, next);
        self.status = Some(match next {
            None => format!("{key}: todos"),
            Some(v) => format!("{key} = {v}"),
        });
    }

    fn handle_search_key(&mut self, key: KeyCode) -> ListAction {
        match key {
            KeyCode::Esc | KeyCode::Enter => self.search_focused = false,
            other => {
                if self.search.handle_key(other) {
                    self.view.set_search(self.search.value());
                }
            }
        }
        ListAction::None
    }
}

impl<T: ListRow> ListPane for ResourceListScreen<T> {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn set_loading(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn load(&mut self, values: Vec<Value>) {
        let total = values.len();
        let items: Vec<T> = values
            .into_iter()
            .filter_map(|v| match serde_json::from_value(v) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(resource = %self.kind, error = %e, "Skipping undecodable record");
                    None
                }
            })
            .collect();
        if items.len() < total {
            self.status = Some(format!("{} registros no se pudieron leer", total - items.len()));
        }
        self.view.set_items(items);
        self.loading = false;
        self.error = None;
    }

    fn load_failed(&mut self, error: &ApiError) {
        self.loading = false;
        self.error = Some(error.banner_message());
    }

    fn set_status(&mut self, message: String) {
        self.status = Some(message);
    }

    fn handle_key(&mut self, key: KeyCode) -> ListAction {
        if self.search_focused {
            return self.handle_search_key(key);
        }
        if let Some(id) = self.pending_delete.take() {
            if key == KeyCode::Char('y') {
                return ListAction::Delete { id };
            }
            self.status = Some("Eliminación cancelada".to_string());
            return ListAction::None;
        }

        match key {
            KeyCode::Esc | KeyCode::Char('q') => ListAction::Back,
            KeyCode::Char('/') => {
                self.search_focused = true;
                ListAction::None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.view.pages_mut().select_prev();
                ListAction::None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.view.pages_mut().select_next();
                ListAction::None
            }
            KeyCode::Right | KeyCode::Char('n') => {
                self.view.pages_mut().next_page();
                ListAction::None
            }
            KeyCode::Left | KeyCode::Char('p') => {
                self.view.pages_mut().prev_page();
                ListAction::None
            }
            KeyCode::Char('f') => {
                self.cycle_flag();
                ListAction::None
            }
            KeyCode::Char('c') => {
                self.search.clear();
                self.view.clear_filters();
                ListAction::None
            }
            KeyCode::Char('r') => ListAction::Refresh,
            KeyCode::Char('d') => {
                if let Some(item) = self.view.selected() {
                    if let Some(id) = item.id() {
                        self.status = Some(format!(
                            "¿Eliminar '{}'? (y/n)",
                            item.display_line()
                        ));
                        self.pending_delete = Some(id);
                    }
                }
                ListAction::None
            }
            KeyCode::Enter | KeyCode::Char('e') => self
                .view
                .selected()
                .and_then(|item| serde_json::to_value(item).ok())
                .map_or(ListAction::None, ListAction::Open),
            _ => ListAction::None,
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Summary
                Constraint::Length(1), // Search
                Constraint::Min(3),    // List
                Constraint::Length(1), // Footer
                Constraint::Length(1), // Status
            ])
            .split(area);

        if let Some(summary) = T::summary(self.view.all_items()) {
            frame.render_widget(
                Paragraph::new(summary).style(Style::default().fg(Color::Gray)),
                chunks[0],
            );
        }
        self.search
            .render(frame, chunks[1], "Buscar", self.search_focused, None);

        let title = format!("{} ({})", T::LABEL, self.view.all_items().len());
        if self.loading {
            frame.render_widget(
                Paragraph::new("Cargando...")
                    .block(Block::default().title(format!(" {title} ")).borders(Borders::ALL)),
                chunks[2],
            );
        } else if self.view.is_filtered_empty() {
            frame.render_widget(
                Paragraph::new("Sin resultados para los filtros actuales")
                    .style(Style::default().fg(Color::DarkGray))
                    .block(Block::default().title(format!(" {title} ")).borders(Borders::ALL)),
                chunks[2],
            );
        } else {
            render_paginated_list(frame, chunks[2], self.view.pages(), &title, |item: &T, _| {
                ListItem::new(item.display_line())
            });
        }

        frame.render_widget(
            Paragraph::new(footer_line(self.view.pages(), &self.view.footer_text())),
            chunks[3],
        );

        let status = match (&self.error, &self.status) {
            (Some(err), _) => Span::styled(err.clone(), Style::default().fg(Color::Red)),
            (None, Some(msg)) => Span::styled(msg.clone(), Style::default().fg(Color::Yellow)),
            (None, None) => Span::styled(
                "[/] buscar [f] filtro [c] limpiar [e] abrir [d] eliminar [r] recargar [Esc] volver",
                Style::default().fg(Color::DarkGray),
            ),
        };
        frame.render_widget(Paragraph::new(Line::from(status)), chunks[4]);

        if self.pending_delete.is_some() {
            let popup = centered_rect(50, 20, area);
            frame.render_widget(Clear, popup);
            frame.render_widget(
                Paragraph::new(self.status.clone().unwrap_or_default())
                    .wrap(Wrap { trim: true })
                    .block(
                        Block::default()
                            .title(" Confirmar ")
                            .borders(Borders::ALL)
                            .border_style(Style::default().fg(Color::Red)),
                    ),
                popup,
            );
        }
    }
}

/// Footer with page info and paging hints
fn footer_line<T>(list: &PaginatedList<T>, text: &str) -> Line<'static> {
    if list.total_pages() <= 1 {
        Line::from(Span::styled(
            text.to_string(),
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(vec![
            Span::styled(text.to_string(), Style::default().fg(Color::Cyan)),
            Span::raw("  "),
            Span::styled("[n]", Style::default().fg(Color::Yellow)),
            Span::styled(" siguiente  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[p]", Style::default().fg(Color::Yellow)),
            Span::styled(" anterior", Style::default().fg(Color::DarkGray)),
        ])
    }
}

/// Render the current page with a custom item renderer
pub fn render_paginated_list<T, F>(
    frame: &mut Frame,
    area: Rect,
    list: &PaginatedList<T>,
    title: &str,
    item_renderer: F,
) where
    F: Fn(&T, bool) -> ListItem<'static>,
{
    let selected = list.selected_in_page();
    let items: Vec<ListItem> = list
        .current_page_items()
        .iter()
        .enumerate()
        .map(|(i, item)| item_renderer(item, i == selected))
        .collect();

    let block = Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let list_widget = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select((!list.is_empty()).then_some(selected));
    frame.render_stateful_widget(list_widget, area, &mut state);
}

/// Build an empty list screen for `kind`
pub fn list_pane_for(kind: ResourceKind, page_size: usize) -> Box<dyn ListPane> {
    match kind {
        ResourceKind::Usuarios => Box::new(ResourceListScreen::<Usuario>::new(kind, page_size)),
        ResourceKind::Roles => Box::new(ResourceListScreen::<Rol>::new(kind, page_size)),
        ResourceKind::Permisos => Box::new(ResourceListScreen::<Permiso>::new(kind, page_size)),
        ResourceKind::Marcas => Box::new(ResourceListScreen::<Marca>::new(kind, page_size)),
        ResourceKind::Modelos => Box::new(ResourceListScreen::<Modelo>::new(kind, page_size)),
        ResourceKind::TiposEquipo => {
            Box::new(ResourceListScreen::<TipoEquipo>::new(kind, page_size))
        }
        ResourceKind::EstadosEquipo => {
            Box::new(ResourceListScreen::<EstadoEquipo>::new(kind, page_size))
        }
        ResourceKind::Componentes => {
            Box::new(ResourceListScreen::<Componente>::new(kind, page_size))
        }
        ResourceKind::Lotes => Box::new(ResourceListScreen::<Lote>::new(kind, page_size)),
        ResourceKind::Equipos => Box::new(ResourceListScreen::<EquipoOnu>::new(kind, page_size)),
        ResourceKind::Clientes => Box::new(ResourceListScreen::<Cliente>::new(kind, page_size)),
        ResourceKind::Planes => Box::new(ResourceListScreen::<Plan>::new(kind, page_size)),
    }
}
