//! Integration tests for the legacy migration flow
//!
//! These tests drive [`MigrationOrchestrator`] against the in-memory legacy
//! gateway and check:
//! - The four steps run in order and report 25/50/75/100 progress
//! - Not-found answers stop the run at the failing step with a hint
//! - The summary-only path never touches the migration endpoints
//! - A second lookup of a migrated customer resolves its code locally
//! - Cancelling mid-step drops the step's answer

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use telco_backoffice::api::consulta::{
    ClienteConsulta, ClienteLocal, FacturasConsulta, LegacyGateway, MigrationStatus,
    MockLegacyGateway, ResumenCliente, ServiciosConsulta,
};
use telco_backoffice::api::error::ApiError;
use telco_backoffice::busy::CancelSignal;
use telco_backoffice::consulta::{
    fetch_resumen, ConsultaError, MigrationOrchestrator, RunOutcome, RunState, StepKind,
    StepStatus,
};

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn gateway_with_customer() -> Arc<MockLegacyGateway> {
    let mock = Arc::new(MockLegacyGateway::new());
    mock.add_legacy_customer(
        "4819716",
        "100234",
        "JUAN PEREZ",
        &[("5001", 2, 240.0), ("5002", 0, 0.0)],
    );
    mock
}

/// Orchestrator that records the progress of every published snapshot
fn recording_orchestrator(
    mock: &Arc<MockLegacyGateway>,
) -> (MigrationOrchestrator, Arc<Mutex<Vec<u8>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let gateway: Arc<dyn LegacyGateway> = mock.clone();
    let orchestrator = MigrationOrchestrator::new(gateway).with_observer(move |snapshot| {
        sink.lock().unwrap().push(snapshot.progress);
    });
    (orchestrator, seen)
}

/// Gateway that fires a cancel signal while the services call is in flight
struct CancelDuringServicios {
    inner: MockLegacyGateway,
    cancel: CancelSignal,
}

#[async_trait]
impl LegacyGateway for CancelDuringServicios {
    async fn consultar_cliente(&self, nro_documento: &str) -> Result<ClienteConsulta, ApiError> {
        self.inner.consultar_cliente(nro_documento).await
    }

    async fn consultar_servicios(&self, cod_cliente: &str) -> Result<ServiciosConsulta, ApiError> {
        let answer = self.inner.consultar_servicios(cod_cliente).await;
        self.cancel.cancel();
        answer
    }

    async fn consultar_facturas(&self, cod_cliente: &str) -> Result<FacturasConsulta, ApiError> {
        self.inner.consultar_facturas(cod_cliente).await
    }

    async fn resumen_cliente(&self, nro_documento: &str) -> Result<ResumenCliente, ApiError> {
        self.inner.resumen_cliente(nro_documento).await
    }

    async fn clientes_locales(&self) -> Result<Vec<ClienteLocal>, ApiError> {
        self.inner.clientes_locales().await
    }

    async fn buscar_por_nombre(&self, nombre: &str) -> Result<Vec<ClienteLocal>, ApiError> {
        self.inner.buscar_por_nombre(nombre).await
    }
}

// ─── Full run ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_run_migrates_and_summarizes() {
    let mock = gateway_with_customer();
    let (mut orchestrator, seen) = recording_orchestrator(&mock);

    let outcome = orchestrator
        .run("4819716", &CancelSignal::new())
        .await
        .unwrap();

    let RunOutcome::Completed(resumen) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(resumen.cliente.cod_cliente.as_deref(), Some("100234"));
    assert_eq!(resumen.servicios.len(), 2);
    assert_eq!(resumen.total_facturas(), 2);
    assert!((resumen.total_monto() - 240.0).abs() < f64::EPSILON);

    assert_eq!(
        mock.operations(),
        vec![
            "consultar_cliente",
            "consultar_servicios",
            "consultar_facturas",
            "resumen_cliente"
        ]
    );
    // Steps after the first one are keyed by the legacy customer code
    let args: Vec<String> = mock.call_log().into_iter().map(|c| c.arg).collect();
    assert_eq!(args, vec!["4819716", "100234", "100234", "4819716"]);

    let progress = seen.lock().unwrap().clone();
    for expected in [25, 50, 75, 100] {
        assert!(progress.contains(&expected), "missing {expected} in {progress:?}");
    }
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));

    assert_eq!(orchestrator.state(), RunState::Completed);
    assert_eq!(orchestrator.progress(), 100);
    assert_eq!(orchestrator.results().migrated_counts(), (1, 2, 2));
    assert!(orchestrator.results().is_complete());
    assert!(StepKind::ALL
        .iter()
        .all(|s| orchestrator.snapshot().step_status(*s) == StepStatus::Done));
}

#[tokio::test]
async fn test_reset_returns_to_idle() {
    let mock = gateway_with_customer();
    let (mut orchestrator, _) = recording_orchestrator(&mock);
    orchestrator
        .run("4819716", &CancelSignal::new())
        .await
        .unwrap();

    orchestrator.reset();
    assert_eq!(orchestrator.state(), RunState::Idle);
    assert_eq!(orchestrator.progress(), 0);
    assert_eq!(orchestrator.step_index(), 0);
    assert!(orchestrator.results().is_empty());
    assert!(orchestrator.error().is_none());
}

#[tokio::test]
async fn test_already_migrated_customer_can_be_looked_up_again() {
    let mock = gateway_with_customer();
    let (mut first, _) = recording_orchestrator(&mock);
    first.run("4819716", &CancelSignal::new()).await.unwrap();

    let (mut second, seen) = recording_orchestrator(&mock);
    let outcome = second.run("4819716", &CancelSignal::new()).await.unwrap();

    let RunOutcome::Completed(resumen) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!(resumen.servicios.len(), 2);
    assert_eq!(
        second.results().cliente.as_ref().map(|c| c.status),
        Some(MigrationStatus::Existe)
    );
    let later: Vec<(&str, String)> = mock
        .call_log()
        .into_iter()
        .skip(4)
        .map(|c| (c.operation, c.arg))
        .collect();
    assert_eq!(
        later,
        vec![
            ("consultar_cliente", "4819716".to_string()),
            ("clientes_locales", String::new()),
            ("consultar_servicios", "100234".to_string()),
            ("consultar_facturas", "100234".to_string()),
            ("resumen_cliente", "4819716".to_string()),
        ]
    );
    assert!(seen.lock().unwrap().contains(&100));
}

#[tokio::test]
async fn test_document_is_trimmed_before_lookup() {
    let mock = gateway_with_customer();
    let (mut orchestrator, _) = recording_orchestrator(&mock);

    let outcome = orchestrator.run("  4819716 ", &CancelSignal::new()).await;
    assert!(matches!(outcome, Ok(RunOutcome::Completed(_))));
    assert_eq!(mock.call_log()[0].arg, "4819716");
}

// ─── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_document_fails_on_first_step() {
    let mock = gateway_with_customer();
    let (mut orchestrator, seen) = recording_orchestrator(&mock);

    let err = orchestrator
        .run("0000000", &CancelSignal::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConsultaError::NotFound {
            step: StepKind::Cliente
        }
    ));
    assert_eq!(err.hint(), Some("Verifique el número de documento."));
    assert_eq!(
        orchestrator.state(),
        RunState::Failed {
            step: StepKind::Cliente
        }
    );
    assert_eq!(mock.operations(), vec!["consultar_cliente"]);
    assert!(!seen.lock().unwrap().contains(&25));
}

#[tokio::test]
async fn test_server_error_on_invoices_keeps_earlier_results() {
    let mock = gateway_with_customer();
    mock.fail("consultar_facturas", ApiError::http(500, "boom"));
    let (mut orchestrator, _) = recording_orchestrator(&mock);

    let err = orchestrator
        .run("4819716", &CancelSignal::new())
        .await
        .unwrap_err();

    assert_eq!(err.step(), Some(StepKind::Facturas));
    assert_eq!(orchestrator.progress(), 50);
    assert!(orchestrator.results().cliente.is_some());
    assert!(orchestrator.results().servicios.is_some());
    assert!(orchestrator.results().facturas.is_none());
    assert_eq!(
        orchestrator.snapshot().step_status(StepKind::Facturas),
        StepStatus::Failed
    );
}

#[tokio::test]
async fn test_empty_document_makes_no_calls() {
    let mock = gateway_with_customer();
    let (mut orchestrator, _) = recording_orchestrator(&mock);

    let err = orchestrator
        .run("   ", &CancelSignal::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ConsultaError::EmptyDocument));
    assert_eq!(orchestrator.state(), RunState::Idle);
    assert!(mock.operations().is_empty());
}

#[tokio::test]
async fn test_cancelled_before_start_does_nothing() {
    let mock = gateway_with_customer();
    let (mut orchestrator, _) = recording_orchestrator(&mock);
    let cancel = CancelSignal::new();
    cancel.cancel();

    let outcome = orchestrator.run("4819716", &cancel).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Cancelled));
    assert!(orchestrator.error().is_none());
    assert!(orchestrator.results().cliente.is_none());
}

#[tokio::test]
async fn test_cancel_during_a_step_drops_its_answer() {
    let mock = gateway_with_customer();
    let cancel = CancelSignal::new();
    let gateway: Arc<dyn LegacyGateway> = Arc::new(CancelDuringServicios {
        inner: (*mock).clone(),
        cancel: cancel.clone(),
    });
    let mut orchestrator = MigrationOrchestrator::new(gateway);

    let outcome = orchestrator.run("4819716", &cancel).await.unwrap();

    assert!(matches!(outcome, RunOutcome::Cancelled));
    assert!(orchestrator.error().is_none());
    // Only the customer step made it into the accumulator
    assert!(orchestrator.results().cliente.is_some());
    assert!(orchestrator.results().servicios.is_none());
    assert!(orchestrator.results().facturas.is_none());
    assert_eq!(orchestrator.progress(), 25);
    assert!(!matches!(orchestrator.state(), RunState::Failed { .. }));
    assert_eq!(
        mock.operations(),
        vec!["consultar_cliente", "consultar_servicios"]
    );
}

// ─── Summary only ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_summary_only_uses_local_data() {
    let mock = gateway_with_customer();

    let resumen = fetch_resumen(mock.as_ref(), "4819716").await.unwrap();
    assert_eq!(resumen.servicios.len(), 2);
    assert_eq!(mock.operations(), vec!["resumen_cliente"]);
}

#[tokio::test]
async fn test_summary_only_not_migrated_suggests_full_lookup() {
    let mock = MockLegacyGateway::new();

    let err = fetch_resumen(&mock, "4819716").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        err.hint(),
        Some("Cliente no encontrado en datos locales. Use la consulta completa para migrar los datos.")
    );
}
