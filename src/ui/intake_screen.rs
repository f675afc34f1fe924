//! Customer intake screen driving [`IntakeWizard`]

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::form_field::TextInput;
use crate::api::error::ApiError;
use crate::api::resources::{Cliente, Coverage, Plan, Resource, TipoCliente, Vivienda};
use crate::intake::{
    IntakeError, IntakeResult, IntakeStep, IntakeWizard, Submission, LOCATION_FIELDS,
    PERSONAL_FIELDS,
};

/// What the app should do after a key press
#[derive(Debug)]
pub enum IntakeAction {
    None,
    Close,
    Submit(Submission),
}

pub struct IntakeScreen {
    wizard: IntakeWizard,
    inputs: Vec<(&'static str, &'static str, TextInput)>,
    focus: usize,
    plan_cursor: usize,
    status: Option<String>,
}

impl IntakeScreen {
    pub fn new(wizard: IntakeWizard) -> Self {
        let inputs = PERSONAL_FIELDS
            .iter()
            .chain(LOCATION_FIELDS)
            .map(|(key, label)| {
                let mut input = TextInput::new(label).with_max_length(200);
                if let Some(value) = wizard.draft().text_field(key) {
                    input.set_value(value);
                }
                (*key, *label, input)
            })
            .collect();
        Self {
            wizard,
            inputs,
            focus: 0,
            plan_cursor: 0,
            status: None,
        }
    }

    pub fn wizard(&self) -> &IntakeWizard {
        &self.wizard
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_plans(&mut self, result: Result<Vec<Plan>, ApiError>) {
        match result {
            Ok(plans) => {
                self.wizard.set_plans(plans);
                let selected = self.wizard.draft().plan_id;
                self.plan_cursor = self
                    .wizard
                    .plans()
                    .iter()
                    .position(|p| p.id.is_some() && p.id == selected)
                    .unwrap_or(0);
            }
            Err(e) => self.status = Some(e.banner_message()),
        }
    }

    /// Apply the answer to a submission started from [`IntakeAction::Submit`]
    pub fn finish_submit(&mut self, result: Result<Cliente, ApiError>) -> Option<Cliente> {
        match self.wizard.finish_submit(result) {
            Ok(cliente) => {
                self.status = Some(match cliente.id {
                    Some(id) => format!("Cliente guardado (id {id})"),
                    None => "Cliente guardado".to_string(),
                });
                Some(cliente)
            }
            Err(_) => {
                self.status = None;
                None
            }
        }
    }

    /// Text fields shown on the current step, as indices into `inputs`
    fn visible_fields(&self) -> Vec<usize> {
        let draft = self.wizard.draft();
        let keys: &[(&str, &str)] = match self.wizard.step() {
            IntakeStep::Personal => PERSONAL_FIELDS,
            IntakeStep::Location => LOCATION_FIELDS,
            IntakeStep::Plan | IntakeStep::Confirm => return Vec::new(),
        };
        self.inputs
            .iter()
            .enumerate()
            .filter(|(_, (key, _, _))| keys.iter().any(|(k, _)| k == key))
            .filter(|(_, (key, _, _))| match *key {
                "ci" => draft.personal.tipo_cliente == TipoCliente::Comun,
                "nit" | "razon_social" => draft.personal.tipo_cliente == TipoCliente::Empresa,
                "piso" => draft.location.vivienda == Vivienda::Departamento,
                _ => true,
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn focused_input(&self) -> Option<usize> {
        let visible = self.visible_fields();
        if visible.is_empty() {
            None
        } else {
            Some(visible[self.focus.min(visible.len() - 1)])
        }
    }

    fn move_focus(&mut self, forward: bool) {
        let count = self.visible_fields().len();
        if count == 0 {
            return;
        }
        self.focus = self.focus.min(count - 1);
        self.focus = if forward {
            (self.focus + 1) % count
        } else {
            (self.focus + count - 1) % count
        };
    }

    fn after_step_change(&mut self) {
        self.focus = 0;
    }

    fn cycle_coverage(&mut self) {
        let next = match self.wizard.draft().coverage() {
            None | Some(Coverage::Uncovered) => Coverage::Covered,
            Some(Coverage::Covered) => Coverage::Uncovered,
        };
        self.wizard.select_coverage(next);
    }

    fn edit_focused(&mut self, key: KeyCode) {
        let Some(index) = self.focused_input() else {
            return;
        };
        let field = self.inputs[index].0;
        let input = &mut self.inputs[index].2;
        if input.handle_key(key) {
            let value = input.value().to_string();
            if let Some(slot) = self.wizard.text_field_mut(field) {
                *slot = value;
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) -> IntakeAction {
        if self.wizard.is_busy() {
            return IntakeAction::None;
        }
        self.status = None;

        match key {
            KeyCode::Esc => {
                if self.wizard.go_back() == IntakeResult::Cancel {
                    return IntakeAction::Close;
                }
                self.after_step_change();
            }
            KeyCode::Enter => match self.wizard.advance() {
                IntakeResult::Submit => match self.wizard.begin_submit() {
                    Ok(submission) => return IntakeAction::Submit(submission),
                    Err(IntakeError::Validation(_) | IntakeError::Busy) => {}
                    Err(IntakeError::Api(e)) => self.status = Some(e.banner_message()),
                },
                IntakeResult::Continue => self.after_step_change(),
                IntakeResult::Blocked | IntakeResult::Cancel => {}
            },
            KeyCode::Tab | KeyCode::Down if self.wizard.step() != IntakeStep::Plan => {
                self.move_focus(true);
            }
            KeyCode::BackTab | KeyCode::Up if self.wizard.step() != IntakeStep::Plan => {
                self.move_focus(false);
            }
            KeyCode::F(2) => match self.wizard.step() {
                IntakeStep::Personal => self.wizard.toggle_tipo_cliente(),
                IntakeStep::Location => self.wizard.toggle_vivienda(),
                _ => {}
            },
            KeyCode::F(3) if self.wizard.step() == IntakeStep::Location => self.cycle_coverage(),
            _ if self.wizard.step() == IntakeStep::Plan => self.handle_plan_key(key),
            other => self.edit_focused(other),
        }
        IntakeAction::None
    }

    fn handle_plan_key(&mut self, key: KeyCode) {
        let count = self.wizard.plans().len();
        if count == 0 {
            return;
        }
        match key {
            KeyCode::Down | KeyCode::Char('j') => self.plan_cursor = (self.plan_cursor + 1) % count,
            KeyCode::Up | KeyCode::Char('k') => {
                self.plan_cursor = (self.plan_cursor + count - 1) % count;
            }
            KeyCode::Char(' ') => {
                if let Some(id) = self.wizard.plans().get(self.plan_cursor).and_then(|p| p.id) {
                    self.wizard.select_plan(id);
                }
            }
            _ => {}
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Step tabs
                Constraint::Min(6),    // Body
                Constraint::Length(1), // Banner / status
                Constraint::Length(1), // Help
            ])
            .split(area);

        let mut tabs = Vec::new();
        for step in IntakeStep::ALL {
            let style = if step == self.wizard.step() {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            tabs.push(Span::styled(
                format!(" {}. {} ", step.index() + 1, step.title()),
                style,
            ));
        }
        if let Some(id) = self.wizard.editing_id() {
            tabs.push(Span::styled(
                format!("  editando #{id}"),
                Style::default().fg(Color::Yellow),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(tabs)), chunks[0]);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} ", self.wizard.step().title()));
        let inner = block.inner(chunks[1]);
        frame.render_widget(block, chunks[1]);

        match self.wizard.step() {
            IntakeStep::Personal | IntakeStep::Location => self.render_form(frame, inner),
            IntakeStep::Plan => self.render_plans(frame, inner),
            IntakeStep::Confirm => self.render_confirm(frame, inner),
        }

        let (message, color) = match (self.wizard.banner(), &self.status) {
            (Some(banner), _) => (banner.to_string(), Color::Red),
            (None, Some(status)) => (status.clone(), Color::Green),
            (None, None) if self.wizard.is_busy() => ("Guardando...".to_string(), Color::Yellow),
            (None, None) => (String::new(), Color::Reset),
        };
        frame.render_widget(
            Paragraph::new(message).style(Style::default().fg(color)),
            chunks[2],
        );

        let help = match self.wizard.step() {
            IntakeStep::Personal => "[Tab] campo  [F2] tipo de cliente  [Enter] siguiente  [Esc] salir",
            IntakeStep::Location => {
                "[Tab] campo  [F2] vivienda  [F3] cobertura  [Enter] siguiente  [Esc] atrás"
            }
            IntakeStep::Plan => "[j/k] mover  [Espacio] elegir  [Enter] siguiente  [Esc] atrás",
            IntakeStep::Confirm => "[Enter] guardar  [Esc] atrás",
        };
        frame.render_widget(
            Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
            chunks[3],
        );
    }

    fn render_form(&self, frame: &mut Frame, area: Rect) {
        let draft = self.wizard.draft();
        let errors = self.wizard.field_errors();
        let toggle = match self.wizard.step() {
            IntakeStep::Personal => {
                let tipo = match draft.personal.tipo_cliente {
                    TipoCliente::Comun => "Común",
                    TipoCliente::Empresa => "Empresa",
                };
                vec![Line::from(vec![
                    Span::styled("Tipo de cliente: ", Style::default().fg(Color::Gray)),
                    Span::styled(tipo, Style::default().fg(Color::Yellow)),
                ])]
            }
            _ => {
                let cobertura = draft.coverage().map_or("sin seleccionar", Coverage::label);
                let mut lines = vec![
                    Line::from(vec![
                        Span::styled("Vivienda: ", Style::default().fg(Color::Gray)),
                        Span::styled(draft.location.vivienda.as_str(), Style::default().fg(Color::Yellow)),
                    ]),
                    Line::from(vec![
                        Span::styled("Cobertura: ", Style::default().fg(Color::Gray)),
                        Span::styled(cobertura, Style::default().fg(Color::Yellow)),
                    ]),
                ];
                if let Some(error) = errors.first("cobertura") {
                    lines.push(Line::from(Span::styled(
                        format!("  {error}"),
                        Style::default().fg(Color::Red),
                    )));
                }
                lines
            }
        };

        let visible = self.visible_fields();
        let focused = self.focused_input();
        let mut constraints = vec![Constraint::Length(u16::try_from(toggle.len()).unwrap_or(1))];
        for index in &visible {
            let key = self.inputs[*index].0;
            constraints.push(Constraint::Length(if errors.contains(key) { 2 } else { 1 }));
        }
        constraints.push(Constraint::Min(0));
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        frame.render_widget(Paragraph::new(toggle), rows[0]);
        for (row, index) in visible.iter().enumerate() {
            let (key, label, input) = &self.inputs[*index];
            input.render(
                frame,
                rows[row + 1],
                label,
                focused == Some(*index),
                errors.first(key),
            );
        }
    }

    fn render_plans(&self, frame: &mut Frame, area: Rect) {
        let plans = self.wizard.plans();
        if plans.is_empty() {
            frame.render_widget(
                Paragraph::new("No hay planes activos disponibles")
                    .style(Style::default().fg(Color::DarkGray)),
                area,
            );
            return;
        }

        let chosen = self.wizard.draft().plan_id;
        let mut items: Vec<ListItem> = plans
            .iter()
            .map(|plan| {
                let mark = if plan.id.is_some() && plan.id == chosen { "(•) " } else { "( ) " };
                ListItem::new(format!("{mark}{}", plan.display_line()))
            })
            .collect();
        if let Some(error) = self.wizard.field_errors().first("plan_id") {
            items.push(ListItem::new(Span::styled(
                error.to_string(),
                Style::default().fg(Color::Red),
            )));
        }

        let list = List::new(items)
            .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        state.select(Some(self.plan_cursor));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_confirm(&self, frame: &mut Frame, area: Rect) {
        let mut lines: Vec<Line> = self
            .wizard
            .summary_lines()
            .into_iter()
            .map(|(label, value)| {
                Line::from(vec![
                    Span::styled(format!("{label:<12}"), Style::default().fg(Color::Gray)),
                    Span::raw(value),
                ])
            })
            .collect();

        let errors = self.wizard.field_errors();
        for (field, messages) in errors.iter() {
            for message in messages {
                lines.push(Line::from(Span::styled(
                    format!("{field}: {message}"),
                    Style::default().fg(Color::Red),
                )));
            }
        }
        frame.render_widget(Paragraph::new(lines), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(screen: &mut IntakeScreen, text: &str) {
        for c in text.chars() {
            screen.handle_key(KeyCode::Char(c));
        }
    }

    fn plan(id: i64) -> Plan {
        Plan {
            id: Some(id),
            descripcion: format!("Plan {id}"),
            codigo: format!("P{id}"),
            estado: true,
            ..Plan::default()
        }
    }

    #[test]
    fn test_typing_updates_focused_field() {
        let mut screen = IntakeScreen::new(IntakeWizard::new());
        type_text(&mut screen, "Ana");
        screen.handle_key(KeyCode::Tab);
        type_text(&mut screen, "Rojas");
        let draft = screen.wizard().draft();
        assert_eq!(draft.personal.nombre, "Ana");
        assert_eq!(draft.personal.apellido, "Rojas");
    }

    #[test]
    fn test_business_customer_shows_nit_fields() {
        let mut screen = IntakeScreen::new(IntakeWizard::new());
        let keys = |s: &IntakeScreen| -> Vec<&str> {
            s.visible_fields().iter().map(|i| s.inputs[*i].0).collect()
        };
        assert!(keys(&screen).contains(&"ci"));
        assert!(!keys(&screen).contains(&"nit"));

        screen.handle_key(KeyCode::F(2));
        assert!(!keys(&screen).contains(&"ci"));
        assert!(keys(&screen).contains(&"razon_social"));
    }

    #[test]
    fn test_coverage_required_before_leaving_location() {
        let mut screen = IntakeScreen::new(IntakeWizard::new());
        screen.handle_key(KeyCode::Enter);
        assert_eq!(screen.wizard().step(), IntakeStep::Location);

        screen.handle_key(KeyCode::Enter);
        assert_eq!(screen.wizard().step(), IntakeStep::Location);
        assert!(screen.wizard().field_errors().contains("cobertura"));

        screen.handle_key(KeyCode::F(3));
        screen.handle_key(KeyCode::Enter);
        assert_eq!(screen.wizard().step(), IntakeStep::Plan);
    }

    #[test]
    fn test_plan_selection_with_space() {
        let mut screen = IntakeScreen::new(IntakeWizard::new());
        screen.set_plans(Ok(vec![plan(1), plan(2)]));
        screen.handle_key(KeyCode::Enter);
        screen.handle_key(KeyCode::F(3));
        screen.handle_key(KeyCode::Enter);

        screen.handle_key(KeyCode::Down);
        screen.handle_key(KeyCode::Char(' '));
        assert_eq!(screen.wizard().draft().plan_id, Some(2));
    }

    #[test]
    fn test_escape_on_first_step_closes() {
        let mut screen = IntakeScreen::new(IntakeWizard::new());
        assert!(matches!(screen.handle_key(KeyCode::Esc), IntakeAction::Close));
    }

    #[test]
    fn test_confirm_with_invalid_draft_does_not_submit() {
        let mut screen = IntakeScreen::new(IntakeWizard::new());
        screen.handle_key(KeyCode::Enter);
        screen.handle_key(KeyCode::F(3));
        screen.handle_key(KeyCode::F(3));
        screen.handle_key(KeyCode::Enter);
        assert_eq!(screen.wizard().step(), IntakeStep::Confirm);

        let action = screen.handle_key(KeyCode::Enter);
        assert!(matches!(action, IntakeAction::None));
        assert!(screen.wizard().banner().is_some());
        assert!(!screen.wizard().is_busy());
    }
}
