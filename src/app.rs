use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::Frame;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::api::consulta::{HttpLegacyGateway, LegacyGateway, ResumenCliente};
use crate::api::error::ApiError;
use crate::api::resources::{Cliente, Plan, ResourceKind};
use crate::api::ApiClient;
use crate::busy::CancelSignal;
use crate::config::Config;
use crate::consulta::{
    fetch_resumen, ConsultaError, MigrationOrchestrator, MigrationSnapshot, RunOutcome,
};
use crate::intake::{ClienteGateway, HttpClienteGateway, IntakeWizard, Submission};
use crate::ui::{
    install_panic_hook, list_pane_for, ConsultaAction, ConsultaMode, ConsultaScreen, Dashboard,
    IntakeAction, IntakeScreen, ListAction, ListPane, MenuEntry, TerminalGuard,
};

/// Results of background work, delivered to the UI loop
///
/// Consulta events carry the id of the run that produced them and intake
/// events the id of the form they belong to, so answers for a run or form
/// that has since been replaced are dropped.
#[derive(Debug)]
pub enum AppEvent {
    Snapshot {
        run: u64,
        snapshot: MigrationSnapshot,
    },
    ConsultaDone {
        run: u64,
        result: Result<RunOutcome, ConsultaError>,
    },
    ResumenDone {
        run: u64,
        result: Result<ResumenCliente, ConsultaError>,
    },
    ListLoaded {
        kind: ResourceKind,
        result: Result<Vec<Value>, ApiError>,
    },
    Deleted {
        kind: ResourceKind,
        id: i64,
        result: Result<(), ApiError>,
    },
    PlansLoaded {
        form: u64,
        result: Result<Vec<Plan>, ApiError>,
    },
    /// The submission comes back with its answer so the form stays busy
    /// until the answer is applied
    IntakeSaved {
        form: u64,
        submission: Submission,
        result: Result<Cliente, ApiError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Menu,
    Consulta,
    List,
    Intake,
}

pub struct App {
    config: Config,
    client: ApiClient,
    legacy: Arc<dyn LegacyGateway>,
    clientes: Arc<dyn ClienteGateway>,
    dashboard: Dashboard,
    screen: Screen,
    consulta: ConsultaScreen,
    list: Option<Box<dyn ListPane>>,
    intake: Option<IntakeScreen>,
    /// Id of the latest opened intake form
    intake_form: u64,
    /// Where closing the intake form returns to
    intake_origin: Screen,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let client = ApiClient::from_config(&config.api)?;
        let legacy: Arc<dyn LegacyGateway> = Arc::new(HttpLegacyGateway::new(
            client.clone(),
            &config.api.consulta_prefix,
        ));
        let clientes: Arc<dyn ClienteGateway> = Arc::new(HttpClienteGateway::new(client.clone()));
        Ok(Self::with_gateways(config, client, legacy, clientes))
    }

    /// Build with explicit gateways; lists and deletes still go through `client`
    pub fn with_gateways(
        config: Config,
        client: ApiClient,
        legacy: Arc<dyn LegacyGateway>,
        clientes: Arc<dyn ClienteGateway>,
    ) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        Self {
            dashboard: Dashboard::new(&config),
            config,
            client,
            legacy,
            clientes,
            screen: Screen::Menu,
            consulta: ConsultaScreen::new(),
            list: None,
            intake: None,
            intake_form: 0,
            intake_origin: Screen::Menu,
            events_tx,
            events_rx,
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        install_panic_hook();
        let (_guard, mut terminal) = TerminalGuard::enter()?;

        let tick_rate = Duration::from_millis(self.config.ui.tick_rate_ms);
        info!(base_url = %self.client.base_url(), "TUI started");

        while !self.should_quit {
            terminal.draw(|f| self.render(f))?;

            if event::poll(tick_rate)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }

            self.drain_events();
        }

        info!("TUI exiting");
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        match self.screen {
            Screen::Menu => self.dashboard.render(frame),
            Screen::Consulta => {
                let title = match self.consulta.mode() {
                    ConsultaMode::Full => "Consulta de cliente",
                    ConsultaMode::SummaryOnly => "Resumen de cliente",
                };
                let area = self.dashboard.render_frame(frame, title, "");
                self.consulta.render(frame, area);
            }
            Screen::List => {
                if let Some(pane) = &mut self.list {
                    let area = self.dashboard.render_frame(frame, pane.kind().label(), "");
                    pane.render(frame, area);
                }
            }
            Screen::Intake => {
                if let Some(intake) = &self.intake {
                    let title = if intake.wizard().is_editing() {
                        "Editar cliente"
                    } else {
                        "Nuevo cliente"
                    };
                    let area = self.dashboard.render_frame(frame, title, "");
                    intake.render(frame, area);
                }
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        match self.screen {
            Screen::Menu => self.handle_menu_key(key),
            Screen::Consulta => match self.consulta.handle_key(key) {
                ConsultaAction::Back => self.screen = Screen::Menu,
                ConsultaAction::Start { documento, mode } => self.start_consulta(documento, mode),
                ConsultaAction::None => {}
            },
            Screen::List => {
                let action = match &mut self.list {
                    Some(pane) => pane.handle_key(key),
                    None => ListAction::Back,
                };
                self.handle_list_action(action);
            }
            Screen::Intake => {
                let action = match &mut self.intake {
                    Some(intake) => intake.handle_key(key),
                    None => IntakeAction::Close,
                };
                match action {
                    IntakeAction::Close => self.close_intake(),
                    IntakeAction::Submit(submission) => self.submit_intake(submission),
                    IntakeAction::None => {}
                }
            }
        }
    }

    fn handle_menu_key(&mut self, key: KeyCode) {
        self.dashboard.clear_status();
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.dashboard.select_next(),
            KeyCode::Up | KeyCode::Char('k') => self.dashboard.select_prev(),
            KeyCode::Enter => {
                if let Some(entry) = self.dashboard.selected() {
                    self.open(entry);
                }
            }
            KeyCode::Char(c) => {
                if let Some(entry) = self.dashboard.entry_for_shortcut(c) {
                    self.open(entry);
                }
            }
            _ => {}
        }
    }

    fn open(&mut self, entry: MenuEntry) {
        debug!(?entry, "Opening menu entry");
        match entry {
            MenuEntry::Consulta => {
                self.consulta.set_mode(ConsultaMode::Full);
                self.screen = Screen::Consulta;
            }
            MenuEntry::Resumen => {
                self.consulta.set_mode(ConsultaMode::SummaryOnly);
                self.screen = Screen::Consulta;
            }
            MenuEntry::NuevoCliente => self.open_intake(IntakeWizard::new(), Screen::Menu),
            MenuEntry::List(kind) => self.open_list(kind),
        }
    }

    fn start_consulta(&mut self, documento: String, mode: ConsultaMode) {
        let cancel = CancelSignal::new();
        let run = self.consulta.begin(cancel.clone());
        let gateway = Arc::clone(&self.legacy);
        let tx = self.events_tx.clone();
        info!(documento = %documento, ?mode, run, "Starting customer lookup");

        match mode {
            ConsultaMode::Full => {
                tokio::spawn(async move {
                    let observer_tx = tx.clone();
                    let mut orchestrator = MigrationOrchestrator::new(gateway).with_observer(
                        move |snapshot| {
                            let _ = observer_tx.send(AppEvent::Snapshot {
                                run,
                                snapshot: snapshot.clone(),
                            });
                        },
                    );
                    let result = orchestrator.run(&documento, &cancel).await;
                    let _ = tx.send(AppEvent::ConsultaDone { run, result });
                });
            }
            ConsultaMode::SummaryOnly => {
                tokio::spawn(async move {
                    let result = fetch_resumen(gateway.as_ref(), &documento).await;
                    let _ = tx.send(AppEvent::ResumenDone { run, result });
                });
            }
        }
    }

    fn open_list(&mut self, kind: ResourceKind) {
        self.list = Some(list_pane_for(kind, self.config.ui.page_size));
        self.screen = Screen::List;
        self.fetch_list(kind);
    }

    fn fetch_list(&mut self, kind: ResourceKind) {
        if let Some(pane) = &mut self.list {
            pane.set_loading();
        }
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = client.get_list::<Value>(kind.path(), &[]).await;
            let _ = tx.send(AppEvent::ListLoaded { kind, result });
        });
    }

    fn handle_list_action(&mut self, action: ListAction) {
        let Some(kind) = self.list.as_ref().map(|p| p.kind()) else {
            self.screen = Screen::Menu;
            return;
        };
        match action {
            ListAction::None => {}
            ListAction::Back => {
                self.list = None;
                self.screen = Screen::Menu;
            }
            ListAction::Refresh => self.fetch_list(kind),
            ListAction::Delete { id } => {
                let client = self.client.clone();
                let tx = self.events_tx.clone();
                let path = format!("{}{}/", kind.path(), id);
                info!(resource = %kind, id, "Deleting record");
                tokio::spawn(async move {
                    let result = client.delete(&path).await;
                    let _ = tx.send(AppEvent::Deleted { kind, id, result });
                });
            }
            ListAction::Open(value) => {
                if kind != ResourceKind::Clientes {
                    if let Some(pane) = &mut self.list {
                        pane.set_status(format!("{}: edición no disponible en la terminal", kind.label()));
                    }
                    return;
                }
                match serde_json::from_value::<Cliente>(value) {
                    Ok(cliente) => self.open_intake(IntakeWizard::from_cliente(&cliente), Screen::List),
                    Err(e) => {
                        warn!(error = %e, "Could not decode customer for editing");
                        if let Some(pane) = &mut self.list {
                            pane.set_status(format!("No se pudo abrir el cliente: {e}"));
                        }
                    }
                }
            }
        }
    }

    fn open_intake(&mut self, wizard: IntakeWizard, origin: Screen) {
        self.intake = Some(IntakeScreen::new(wizard));
        self.intake_form += 1;
        self.intake_origin = origin;
        self.screen = Screen::Intake;

        let form = self.intake_form;
        let gateway = Arc::clone(&self.clientes);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = gateway.active_plans().await;
            let _ = tx.send(AppEvent::PlansLoaded { form, result });
        });
    }

    fn close_intake(&mut self) {
        let saved = self
            .intake
            .take()
            .and_then(|s| s.wizard().saved().cloned());
        self.screen = self.intake_origin;
        if self.screen == Screen::List {
            if let Some(kind) = self.list.as_ref().map(|p| p.kind()) {
                if saved.is_some() {
                    self.fetch_list(kind);
                }
            }
        }
    }

    fn submit_intake(&mut self, submission: Submission) {
        let form = self.intake_form;
        let gateway = Arc::clone(&self.clientes);
        let tx = self.events_tx.clone();
        debug!(update = submission.is_update(), form, "Submitting customer");
        tokio::spawn(async move {
            let result = submission.send(gateway.as_ref()).await;
            let _ = tx.send(AppEvent::IntakeSaved {
                form,
                submission,
                result,
            });
        });
    }

    /// Apply every pending background result
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
        }
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Snapshot { run, snapshot } => self.consulta.apply_snapshot(run, snapshot),
            AppEvent::ConsultaDone { run, result } => self.consulta.finish_run(run, result),
            AppEvent::ResumenDone { run, result } => self.consulta.finish_summary(run, result),
            AppEvent::ListLoaded { kind, result } => {
                // Drop answers for a list that is no longer open
                let Some(pane) = self.list.as_mut().filter(|p| p.kind() == kind) else {
                    return;
                };
                match result {
                    Ok(values) => pane.load(values),
                    Err(e) => pane.load_failed(&e),
                }
            }
            AppEvent::Deleted { kind, id, result } => match result {
                Ok(()) => {
                    info!(resource = %kind, id, "Record deleted");
                    if let Some(pane) = self.list.as_mut().filter(|p| p.kind() == kind) {
                        pane.set_status("Registro eliminado".to_string());
                    }
                    if self.list.as_ref().is_some_and(|p| p.kind() == kind) {
                        self.fetch_list(kind);
                    }
                }
                Err(e) => {
                    warn!(resource = %kind, id, error = %e, "Delete failed");
                    if let Some(pane) = self.list.as_mut().filter(|p| p.kind() == kind) {
                        pane.set_status(e.banner_message());
                    }
                }
            },
            AppEvent::PlansLoaded { form, result } => {
                if form != self.intake_form {
                    debug!(form, "Dropping plans for a closed intake form");
                    return;
                }
                if let Some(intake) = &mut self.intake {
                    intake.set_plans(result);
                }
            }
            AppEvent::IntakeSaved {
                form,
                submission,
                result,
            } => {
                if form == self.intake_form {
                    if let Some(intake) = &mut self.intake {
                        if let Some(cliente) = intake.finish_submit(result) {
                            self.dashboard
                                .set_status(format!("Cliente guardado: {}", cliente.full_name()));
                        }
                    }
                } else if let Ok(cliente) = result {
                    info!(id = ?cliente.id, "Customer saved after its form was closed");
                }
                // Released only now, once the answer is visible to the form
                drop(submission);
            }
        }
    }
}
