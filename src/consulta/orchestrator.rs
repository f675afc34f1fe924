use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::error::ConsultaError;
use super::steps::{MigrationResults, StepKind};
use crate::api::consulta::{codigo_local, LegacyGateway, MigrationStatus, ResumenCliente};
use crate::api::error::ApiError;
use crate::busy::CancelSignal;

/// Where a run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Running {
        step: StepKind,
    },
    Completed,
    Failed {
        step: StepKind,
    },
}

impl RunState {
    pub fn is_running(self) -> bool {
        matches!(self, RunState::Running { .. })
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed { .. })
    }
}

/// Display status of a single step within a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Active,
    Done,
    Failed,
}

/// Observable state of the orchestrator, cloned out to observers
#[derive(Debug, Clone, Default)]
pub struct MigrationSnapshot {
    pub documento: String,
    pub state: RunState,
    /// 0..=100, in steps of 25
    pub progress: u8,
    /// 0-based index of the current (or last) step
    pub step_index: usize,
    pub results: MigrationResults,
    pub error: Option<ConsultaError>,
}

impl MigrationSnapshot {
    pub fn current_step(&self) -> StepKind {
        StepKind::ALL[self.step_index.min(StepKind::ALL.len() - 1)]
    }

    pub fn step_status(&self, step: StepKind) -> StepStatus {
        match self.state {
            RunState::Idle => StepStatus::Pending,
            RunState::Completed => StepStatus::Done,
            RunState::Running { step: active } | RunState::Failed { step: active }
                if step.index() < active.index() =>
            {
                StepStatus::Done
            }
            RunState::Running { step: active } if step == active => StepStatus::Active,
            RunState::Failed { step: failed } if step == failed => StepStatus::Failed,
            _ => StepStatus::Pending,
        }
    }

    /// The final summary, only once every step has succeeded
    pub fn summary(&self) -> Option<&ResumenCliente> {
        if self.state == RunState::Completed {
            self.results.resumen.as_ref()
        } else {
            None
        }
    }
}

/// How a run ended when it did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(ResumenCliente),
    Cancelled,
}

pub type SnapshotObserver = Box<dyn Fn(&MigrationSnapshot) + Send + Sync>;

/// Runs the four migration steps in order against a [`LegacyGateway`]
///
/// Steps never overlap. The first failure stops the run and is kept in the
/// snapshot together with whatever results were gathered before it.
pub struct MigrationOrchestrator {
    gateway: Arc<dyn LegacyGateway>,
    snapshot: MigrationSnapshot,
    observer: Option<SnapshotObserver>,
}

impl std::fmt::Debug for MigrationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationOrchestrator")
            .field("snapshot", &self.snapshot)
            .field("observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl MigrationOrchestrator {
    pub fn new(gateway: Arc<dyn LegacyGateway>) -> Self {
        Self {
            gateway,
            snapshot: MigrationSnapshot::default(),
            observer: None,
        }
    }

    /// Call `observer` after every state change
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&MigrationSnapshot) + Send + Sync + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn snapshot(&self) -> &MigrationSnapshot {
        &self.snapshot
    }

    pub fn state(&self) -> RunState {
        self.snapshot.state
    }

    pub fn progress(&self) -> u8 {
        self.snapshot.progress
    }

    pub fn step_index(&self) -> usize {
        self.snapshot.step_index
    }

    pub fn results(&self) -> &MigrationResults {
        &self.snapshot.results
    }

    pub fn error(&self) -> Option<&ConsultaError> {
        self.snapshot.error.as_ref()
    }

    /// Back to idle: no progress, no results, no error
    pub fn reset(&mut self) {
        self.snapshot = MigrationSnapshot::default();
        self.notify();
    }

    fn notify(&self) {
        if let Some(observer) = &self.observer {
            observer(&self.snapshot);
        }
    }

    fn fail(&mut self, error: ConsultaError) -> ConsultaError {
        warn!(
            documento = %self.snapshot.documento,
            error = %error,
            "Migration run failed"
        );
        if let Some(step) = error.step() {
            self.snapshot.state = RunState::Failed { step };
        }
        self.snapshot.error = Some(error.clone());
        self.notify();
        error
    }

    /// Run one gateway call as `step`; `Ok(None)` means the run was cancelled
    async fn step<T, F>(
        &mut self,
        step: StepKind,
        cancel: &CancelSignal,
        call: F,
    ) -> Result<Option<T>, ConsultaError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        self.snapshot.state = RunState::Running { step };
        self.snapshot.step_index = step.index();
        self.notify();
        info!(step = step.key(), "{}", step.description());

        let result = call.await;
        if cancel.is_cancelled() {
            info!(step = step.key(), "Migration run cancelled, dropping result");
            return Ok(None);
        }
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) => Err(self.fail(ConsultaError::from_api(step, e))),
        }
    }

    fn complete(&mut self, step: StepKind, store: impl FnOnce(&mut MigrationResults)) {
        store(&mut self.snapshot.results);
        self.snapshot.progress = step.progress_after();
        match step.next() {
            Some(next) => self.snapshot.step_index = next.index(),
            None => self.snapshot.state = RunState::Completed,
        }
        self.notify();
    }

    /// Migrate and summarize the customer identified by `nro_documento`
    ///
    /// A blank document is rejected before any call and leaves the run idle.
    pub async fn run(
        &mut self,
        nro_documento: &str,
        cancel: &CancelSignal,
    ) -> Result<RunOutcome, ConsultaError> {
        let documento = nro_documento.trim().to_string();
        if documento.is_empty() {
            self.snapshot = MigrationSnapshot {
                error: Some(ConsultaError::EmptyDocument),
                ..MigrationSnapshot::default()
            };
            self.notify();
            return Err(ConsultaError::EmptyDocument);
        }

        self.snapshot = MigrationSnapshot {
            documento: documento.clone(),
            ..MigrationSnapshot::default()
        };
        info!(documento = %documento, "Starting migration run");
        let gateway = Arc::clone(&self.gateway);

        let Some(mut cliente) = self
            .step(StepKind::Cliente, cancel, gateway.consultar_cliente(&documento))
            .await?
        else {
            return Ok(RunOutcome::Cancelled);
        };
        if cliente.status.is_not_found() {
            return Err(self.fail(ConsultaError::NotFound {
                step: StepKind::Cliente,
            }));
        }
        let cod_cliente = match cliente.customer_id().map(str::to_string) {
            Some(id) => id,
            None if cliente.status == MigrationStatus::Existe => {
                info!(documento = %documento, "Customer already migrated, reading its code locally");
                let Some(found) = self
                    .step(StepKind::Cliente, cancel, codigo_local(gateway.as_ref(), &documento))
                    .await?
                else {
                    return Ok(RunOutcome::Cancelled);
                };
                let Some(id) = found else {
                    return Err(self.fail(ConsultaError::MissingCustomerId));
                };
                cliente.cod_cliente = Some(id.clone());
                id
            }
            None => return Err(self.fail(ConsultaError::MissingCustomerId)),
        };
        self.complete(StepKind::Cliente, |r| r.cliente = Some(cliente));

        let Some(servicios) = self
            .step(StepKind::Servicios, cancel, gateway.consultar_servicios(&cod_cliente))
            .await?
        else {
            return Ok(RunOutcome::Cancelled);
        };
        self.complete(StepKind::Servicios, |r| r.servicios = Some(servicios));

        let Some(facturas) = self
            .step(StepKind::Facturas, cancel, gateway.consultar_facturas(&cod_cliente))
            .await?
        else {
            return Ok(RunOutcome::Cancelled);
        };
        self.complete(StepKind::Facturas, |r| r.facturas = Some(facturas));

        let Some(resumen) = self
            .step(StepKind::Resumen, cancel, gateway.resumen_cliente(&documento))
            .await?
        else {
            return Ok(RunOutcome::Cancelled);
        };
        self.complete(StepKind::Resumen, |r| r.resumen = Some(resumen.clone()));

        info!(
            documento = %documento,
            servicios = resumen.servicios.len(),
            facturas = resumen.total_facturas(),
            "Migration run completed"
        );
        Ok(RunOutcome::Completed(resumen))
    }
}

/// Summary only, from local data; no migration is attempted
pub async fn fetch_resumen<G: LegacyGateway + ?Sized>(
    gateway: &G,
    nro_documento: &str,
) -> Result<ResumenCliente, ConsultaError> {
    let documento = nro_documento.trim();
    if documento.is_empty() {
        return Err(ConsultaError::EmptyDocument);
    }
    gateway
        .resumen_cliente(documento)
        .await
        .map_err(|e| ConsultaError::from_api(StepKind::Resumen, e))
}
