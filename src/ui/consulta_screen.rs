//! Migration wizard screen: document input, step progress and summary

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use super::form_field::TextInput;
use crate::api::consulta::ResumenCliente;
use crate::busy::CancelSignal;
use crate::consulta::{ConsultaError, MigrationSnapshot, RunOutcome, StepKind, StepStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsultaMode {
    /// Migrate then summarize
    Full,
    /// Read the local summary only
    SummaryOnly,
}

impl ConsultaMode {
    fn label(self) -> &'static str {
        match self {
            ConsultaMode::Full => "Consulta completa",
            ConsultaMode::SummaryOnly => "Solo resumen",
        }
    }

    fn toggle(self) -> Self {
        match self {
            ConsultaMode::Full => ConsultaMode::SummaryOnly,
            ConsultaMode::SummaryOnly => ConsultaMode::Full,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsultaAction {
    None,
    Back,
    Start { documento: String, mode: ConsultaMode },
}

pub struct ConsultaScreen {
    input: TextInput,
    mode: ConsultaMode,
    snapshot: MigrationSnapshot,
    summary: Option<ResumenCliente>,
    error: Option<ConsultaError>,
    cancel: Option<CancelSignal>,
    cancelled: bool,
    /// Id of the latest started run; answers tagged with another id are stale
    run_id: u64,
}

impl Default for ConsultaScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsultaScreen {
    pub fn new() -> Self {
        Self {
            input: TextInput::new("número de documento").with_max_length(20),
            mode: ConsultaMode::Full,
            snapshot: MigrationSnapshot::default(),
            summary: None,
            error: None,
            cancel: None,
            cancelled: false,
            run_id: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn mode(&self) -> ConsultaMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ConsultaMode) {
        self.mode = mode;
    }

    pub fn snapshot(&self) -> &MigrationSnapshot {
        &self.snapshot
    }

    pub fn summary(&self) -> Option<&ResumenCliente> {
        self.summary.as_ref()
    }

    pub fn error(&self) -> Option<&ConsultaError> {
        self.error.as_ref()
    }

    /// A run was started with `cancel` as its signal
    ///
    /// Returns the id that the run's snapshots and result must carry.
    pub fn begin(&mut self, cancel: CancelSignal) -> u64 {
        self.snapshot = MigrationSnapshot::default();
        self.summary = None;
        self.error = None;
        self.cancelled = false;
        self.cancel = Some(cancel);
        self.run_id += 1;
        self.run_id
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    fn is_current(&self, run: u64) -> bool {
        run == self.run_id
    }

    pub fn apply_snapshot(&mut self, run: u64, snapshot: MigrationSnapshot) {
        if self.is_current(run) && !self.cancelled {
            self.snapshot = snapshot;
        }
    }

    pub fn finish_run(&mut self, run: u64, result: Result<RunOutcome, ConsultaError>) {
        if !self.is_current(run) {
            return;
        }
        self.cancel = None;
        match result {
            Ok(RunOutcome::Completed(resumen)) => self.summary = Some(resumen),
            Ok(RunOutcome::Cancelled) => self.cancelled = true,
            Err(e) => self.error = Some(e),
        }
    }

    pub fn finish_summary(&mut self, run: u64, result: Result<ResumenCliente, ConsultaError>) {
        if !self.is_current(run) {
            return;
        }
        self.cancel = None;
        match result {
            Ok(resumen) => self.summary = Some(resumen),
            Err(e) => self.error = Some(e),
        }
    }

    fn reset(&mut self) {
        self.snapshot = MigrationSnapshot::default();
        self.summary = None;
        self.error = None;
        self.cancelled = false;
    }

    pub fn handle_key(&mut self, key: KeyCode) -> ConsultaAction {
        if let Some(cancel) = &self.cancel {
            if key == KeyCode::Esc {
                cancel.cancel();
                self.cancelled = true;
                self.cancel = None;
            }
            return ConsultaAction::None;
        }

        match key {
            KeyCode::Esc => ConsultaAction::Back,
            KeyCode::Tab => {
                self.mode = self.mode.toggle();
                ConsultaAction::None
            }
            KeyCode::Enter => ConsultaAction::Start {
                documento: self.input.value().trim().to_string(),
                mode: self.mode,
            },
            other => {
                if self.input.handle_key(other) {
                    self.reset();
                }
                ConsultaAction::None
            }
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Input + mode
                Constraint::Length(6), // Steps
                Constraint::Length(3), // Gauge
                Constraint::Min(4),    // Summary / error
                Constraint::Length(1), // Help
            ])
            .split(area);

        let input_area = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(chunks[0]);
        self.input
            .render(frame, input_area[0], "Documento", !self.is_running(), None);
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled("Modo: ", Style::default().fg(Color::Gray)),
                Span::styled(self.mode.label(), Style::default().fg(Color::Yellow)),
            ])),
            input_area[1],
        );

        if self.mode == ConsultaMode::Full {
            self.render_steps(frame, chunks[1]);
            let gauge = Gauge::default()
                .block(Block::default().borders(Borders::ALL).title(" Progreso "))
                .gauge_style(Style::default().fg(Color::Green))
                .percent(u16::from(self.snapshot.progress));
            frame.render_widget(gauge, chunks[2]);
        }

        self.render_result(frame, chunks[3]);

        let help = if self.is_running() {
            "[Esc] cancelar"
        } else {
            "[Enter] consultar  [Tab] cambiar modo  [Esc] volver"
        };
        frame.render_widget(
            Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
            chunks[4],
        );
    }

    fn render_steps(&self, frame: &mut Frame, area: Rect) {
        let lines: Vec<Line> = StepKind::ALL
            .iter()
            .map(|step| {
                let (icon, style) = match self.snapshot.step_status(*step) {
                    StepStatus::Pending => ("○", Style::default().fg(Color::DarkGray)),
                    StepStatus::Active => ("◐", Style::default().fg(Color::Yellow)),
                    StepStatus::Done => ("●", Style::default().fg(Color::Green)),
                    StepStatus::Failed => ("✗", Style::default().fg(Color::Red)),
                };
                let mut spans = vec![
                    Span::styled(format!("{icon} "), style),
                    Span::styled(step.title(), style.add_modifier(Modifier::BOLD)),
                ];
                if self.snapshot.step_status(*step) == StepStatus::Active {
                    spans.push(Span::styled(
                        format!("  {}", step.description()),
                        Style::default().fg(Color::Gray),
                    ));
                }
                Line::from(spans)
            })
            .collect();
        frame.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Pasos ")),
            area,
        );
    }

    fn render_result(&self, frame: &mut Frame, area: Rect) {
        let mut lines = Vec::new();

        if self.cancelled {
            lines.push(Line::from(Span::styled(
                "Consulta cancelada",
                Style::default().fg(Color::Yellow),
            )));
        }
        if let Some(error) = &self.error {
            lines.push(Line::from(Span::styled(
                error.user_message(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
            if let Some(hint) = error.hint() {
                lines.push(Line::from(Span::styled(hint, Style::default().fg(Color::Yellow))));
            }
        }

        if let Some(resumen) = &self.summary {
            if self.mode == ConsultaMode::Full {
                let (cliente, servicios, facturas) = self.snapshot.results.migrated_counts();
                lines.push(Line::from(format!(
                    "Migrados: cliente {cliente} · servicios {servicios} · facturas {facturas}"
                )));
            }
            lines.extend(summary_lines(resumen));
        }

        frame.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .block(Block::default().borders(Borders::ALL).title(" Resumen ")),
            area,
        );
    }
}

/// Text rows for a customer summary: header, one row per service, totals
pub fn summary_lines(resumen: &ResumenCliente) -> Vec<Line<'static>> {
    let c = &resumen.cliente;
    let mut lines = vec![Line::from(Span::styled(
        format!(
            "{} · doc {} · cód. {}",
            c.nombres.as_deref().unwrap_or("-"),
            c.nro_documento.as_deref().unwrap_or("-"),
            c.cod_cliente.as_deref().unwrap_or("-"),
        ),
        Style::default().add_modifier(Modifier::BOLD),
    ))];

    if resumen.servicios.is_empty() {
        lines.push(Line::from(Span::styled(
            "Sin servicios registrados",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for s in &resumen.servicios {
        let monto = s
            .facturas_resumen
            .total_monto
            .map_or_else(|| "-".to_string(), |m| format!("Bs. {m:.2}"));
        lines.push(Line::from(format!(
            "  Contrato {} · {} · {} factura(s) pendiente(s) · {}",
            s.servicio.contrato.as_deref().unwrap_or("-"),
            s.servicio.plan_comercial.as_deref().unwrap_or("sin plan"),
            s.facturas_resumen.cantidad_facturas,
            monto
        )));
    }
    lines.push(Line::from(Span::styled(
        format!(
            "Total: {} servicio(s) · {} factura(s) · Bs. {:.2}",
            resumen.servicios.len(),
            resumen.total_facturas(),
            resumen.total_monto()
        ),
        Style::default().fg(Color::Cyan),
    )));
    lines
}
