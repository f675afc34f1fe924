//! Tests for the intake wizard

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use super::types::*;
use super::{IntakeWizard, MockClienteGateway};
use crate::api::error::{ApiError, FieldErrors};
use crate::api::resources::{Cliente, ClienteEstado, Coverage, Plan, TipoCliente, Vivienda};

fn plan(id: i64, descripcion: &str, activo: bool) -> Plan {
    Plan {
        id: Some(id),
        descripcion: descripcion.to_string(),
        codigo: format!("P{id}"),
        monto_basico: Some(150.0),
        tipo_basico: Some("Mensual".to_string()),
        estado: activo,
    }
}

fn filled_wizard() -> IntakeWizard {
    let mut wizard = IntakeWizard::new();
    {
        let p = wizard.personal_mut();
        p.nombre = " Ana ".to_string();
        p.apellido = "Quispe".to_string();
        p.ci = "4819716".to_string();
        p.telefono = "+59171234567".to_string();
    }
    {
        let l = wizard.location_mut();
        l.calle = "Av. Arce".to_string();
        l.zona = "Sopocachi".to_string();
        l.direccion_completa = "Av. Arce 2030, Sopocachi".to_string();
        l.numero_puerta = "2030".to_string();
    }
    wizard.set_plans(vec![plan(1, "Fibra 50", true), plan(2, "Fibra 100", true), plan(3, "Legacy", false)]);
    wizard
}

#[test]
fn test_wizard_starts_at_personal_step() {
    let wizard = IntakeWizard::new();
    assert_eq!(wizard.step(), IntakeStep::Personal);
    assert!(!wizard.is_editing());
    assert!(wizard.banner().is_none());
}

#[test]
fn test_back_from_first_step_cancels() {
    let mut wizard = IntakeWizard::new();
    assert_eq!(wizard.go_back(), IntakeResult::Cancel);
    assert_eq!(wizard.step(), IntakeStep::Personal);
}

#[test]
fn test_coverage_gate_blocks_without_selection() {
    let mut wizard = filled_wizard();
    assert_eq!(wizard.advance(), IntakeResult::Continue);
    assert_eq!(wizard.step(), IntakeStep::Location);

    assert_eq!(wizard.advance(), IntakeResult::Blocked);
    assert_eq!(wizard.step(), IntakeStep::Location);
    assert!(wizard.field_errors().contains("cobertura"));

    wizard.select_coverage(Coverage::Covered);
    assert!(!wizard.field_errors().contains("cobertura"));
    assert_eq!(wizard.advance(), IntakeResult::Continue);
    assert_eq!(wizard.step(), IntakeStep::Plan);
}

#[test]
fn test_no_coverage_skips_plan_step_both_ways() {
    let mut wizard = filled_wizard();
    wizard.advance();
    wizard.select_coverage(Coverage::Uncovered);
    assert_eq!(wizard.advance(), IntakeResult::Continue);
    assert_eq!(wizard.step(), IntakeStep::Confirm);

    assert_eq!(wizard.go_back(), IntakeResult::Continue);
    assert_eq!(wizard.step(), IntakeStep::Location);
}

#[test]
fn test_plan_step_requires_selection() {
    let mut wizard = filled_wizard();
    wizard.advance();
    wizard.select_coverage(Coverage::Covered);
    wizard.advance();

    assert_eq!(wizard.advance(), IntakeResult::Blocked);
    assert_eq!(wizard.step(), IntakeStep::Plan);
    assert!(wizard.field_errors().contains("plan_id"));

    assert!(wizard.select_plan(2));
    assert_eq!(wizard.advance(), IntakeResult::Continue);
    assert_eq!(wizard.step(), IntakeStep::Confirm);
    assert_eq!(wizard.go_back(), IntakeResult::Continue);
    assert_eq!(wizard.step(), IntakeStep::Plan);
}

#[test]
fn test_inactive_or_unknown_plan_rejected() {
    let mut wizard = filled_wizard();
    wizard.select_coverage(Coverage::Covered);
    assert_eq!(wizard.plans().len(), 2);
    assert!(!wizard.select_plan(3));
    assert!(!wizard.select_plan(99));
    assert_eq!(wizard.draft().plan_id, None);
}

#[test]
fn test_switching_to_no_coverage_discards_plan() {
    let mut wizard = filled_wizard();
    wizard.select_coverage(Coverage::Covered);
    assert!(wizard.select_plan(1));
    wizard.select_coverage(Coverage::Uncovered);
    assert_eq!(wizard.draft().plan_id, None);
    assert!(!wizard.select_plan(1));
}

#[test]
fn test_confirm_step_requests_submit() {
    let mut wizard = filled_wizard();
    wizard.advance();
    wizard.select_coverage(Coverage::Uncovered);
    wizard.advance();
    assert_eq!(wizard.advance(), IntakeResult::Submit);
}

#[test]
fn test_summary_shows_plan_only_with_coverage() {
    let mut wizard = filled_wizard();
    wizard.select_coverage(Coverage::Covered);
    let labels: Vec<_> = wizard.summary_lines().iter().map(|(l, _)| *l).collect();
    assert!(!labels.contains(&"Plan"));

    wizard.select_plan(2);
    let lines = wizard.summary_lines();
    let plan_line = lines.iter().find(|(l, _)| *l == "Plan").unwrap();
    assert!(plan_line.1.contains("Fibra 100"));
    let estado = lines.iter().find(|(l, _)| *l == "Estado").unwrap();
    assert_eq!(estado.1, "Pendiente por equipo");
}

#[test]
fn test_text_field_edit_clears_its_error() {
    let mut wizard = IntakeWizard::new();
    let _ = wizard.begin_submit();
    assert!(wizard.field_errors().contains("nombre"));

    *wizard.text_field_mut("nombre").unwrap() = "Luis".to_string();
    assert!(!wizard.field_errors().contains("nombre"));
    assert_eq!(wizard.draft().text_field("nombre"), Some("Luis"));
    assert!(wizard.text_field_mut("desconocido").is_none());
}

#[test]
fn test_toggles() {
    let mut wizard = IntakeWizard::new();
    wizard.toggle_tipo_cliente();
    assert_eq!(wizard.draft().personal.tipo_cliente, TipoCliente::Empresa);
    wizard.toggle_vivienda();
    assert_eq!(wizard.draft().location.vivienda, Vivienda::Departamento);
}

#[test]
fn test_payload_without_coverage() {
    let mut wizard = filled_wizard();
    wizard.select_coverage(Coverage::Uncovered);
    wizard.location_mut().latitud = "-16.500123456".to_string();
    wizard.location_mut().longitud = String::new();

    let submission = wizard.begin_submit().unwrap();
    let body = submission.payload();
    assert_eq!(body["plan_id"], Value::Null);
    assert_eq!(body["estado"], json!("PEND_COBERTURA"));
    assert_eq!(body["cobertura"], json!("SIN_COBERTURA"));
    assert_eq!(body["nombre"], json!("Ana"));
    assert_eq!(body["latitud"].as_f64(), Some(-16.500_123));
    assert!(!body.contains_key("longitud"));
    assert!(!body.contains_key("email"));
    assert!(!body.contains_key("piso"));
    assert!(!submission.is_update());
}

#[test]
fn test_validation_blocks_submission() {
    let mut wizard = IntakeWizard::new();
    wizard.personal_mut().telefono = "12ab".to_string();
    wizard.personal_mut().email = "no-es-correo".to_string();

    match wizard.begin_submit() {
        Err(IntakeError::Validation(errors)) => {
            assert!(errors.contains("nombre"));
            assert!(errors.contains("email"));
            assert!(errors.contains("cobertura"));
            assert_eq!(
                errors.first("telefono"),
                Some("Formato inválido. Use 9 a 15 dígitos, opcionalmente con '+' al inicio")
            );
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(wizard.banner().is_some());
    assert!(!wizard.is_busy());
}

#[tokio::test]
async fn test_second_submit_while_busy_is_rejected() {
    let gateway = MockClienteGateway::new();
    let mut wizard = filled_wizard();
    wizard.select_coverage(Coverage::Uncovered);

    let first = wizard.begin_submit().unwrap();
    assert!(wizard.is_busy());
    assert!(matches!(wizard.begin_submit(), Err(IntakeError::Busy)));
    assert!(gateway.saved_payloads().is_empty());

    let result = first.send(&gateway).await;
    drop(first);
    assert!(!wizard.is_busy());
    wizard.finish_submit(result).unwrap();
    assert_eq!(gateway.saved_payloads().len(), 1);
}

#[tokio::test]
async fn test_successful_submit_invokes_callback() {
    let gateway = MockClienteGateway::new().with_plans(vec![plan(2, "Fibra 100", true)]);
    let seen: Arc<Mutex<Vec<Option<i64>>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    let mut wizard = filled_wizard().with_on_save(move |c| seen_clone.lock().unwrap().push(c.id));

    wizard.select_coverage(Coverage::Covered);
    wizard.select_plan(2);
    let saved = wizard.submit(&gateway).await.unwrap();

    assert_eq!(saved.estado, ClienteEstado::PendEquipo);
    assert_eq!(saved.plan.as_ref().and_then(|p| p.id), Some(2));
    assert_eq!(*seen.lock().unwrap(), vec![Some(1)]);
    assert_eq!(gateway.saved_payloads()[0].payload["plan_id"], json!(2));
    // The wizard stays open and later saves update the same record
    assert_eq!(wizard.editing_id(), Some(1));
}

#[tokio::test]
async fn test_server_field_errors_merge_with_banner() {
    let gateway = MockClienteGateway::new();
    let mut server = FieldErrors::new();
    server.add("ci", "Ya existe un cliente con este CI");
    server.add_non_field("No se pudo registrar el cliente");
    gateway.fail_with(ApiError::Validation(server));

    let mut wizard = filled_wizard();
    wizard.select_coverage(Coverage::Uncovered);
    let err = wizard.submit(&gateway).await.unwrap_err();

    assert!(matches!(err, IntakeError::Api(ApiError::Validation(_))));
    assert_eq!(
        wizard.field_errors().first("ci"),
        Some("Ya existe un cliente con este CI")
    );
    assert_eq!(wizard.banner(), Some("No se pudo registrar el cliente"));
    assert!(wizard.saved().is_none());
}

#[tokio::test]
async fn test_network_failure_sets_banner() {
    let gateway = MockClienteGateway::new();
    gateway.fail_with(ApiError::network("connection refused"));
    let mut wizard = filled_wizard();
    wizard.select_coverage(Coverage::Uncovered);

    assert!(wizard.submit(&gateway).await.is_err());
    assert_eq!(wizard.banner(), Some("No se pudo conectar con el servidor"));
    assert!(!wizard.field_errors().has_field_errors());
}

#[tokio::test]
async fn test_load_plans_keeps_active_only() {
    let gateway =
        MockClienteGateway::new().with_plans(vec![plan(1, "Fibra 50", true), plan(3, "Legacy", false)]);
    let mut wizard = IntakeWizard::new();
    wizard.load_plans(&gateway).await.unwrap();
    assert_eq!(wizard.plans().len(), 1);
}

#[tokio::test]
async fn test_edit_mode_updates_and_keeps_status() {
    let cliente: Cliente = serde_json::from_value(json!({
        "id": 42,
        "nombre": "Ana",
        "apellido": "Quispe",
        "ci": "4819716",
        "telefono": "71234567890",
        "vivienda": "Departamento",
        "piso": "3",
        "calle": "Av. Arce",
        "zona": "Sopocachi",
        "direccion_completa": "Av. Arce 2030",
        "numero_puerta": "2030",
        "latitud": "-16.509876",
        "longitud": "-68.123456",
        "tipo_cliente": "COMUN",
        "cobertura": "SIN_COBERTURA",
        "estado": "SUSPENDIDO"
    }))
    .unwrap();

    let gateway = MockClienteGateway::new();
    let mut wizard = IntakeWizard::from_cliente(&cliente);
    assert!(wizard.is_editing());
    assert_eq!(wizard.draft().location.latitud, "-16.509876");
    assert_eq!(wizard.status_to_send(), ClienteEstado::Suspendido);

    wizard.submit(&gateway).await.unwrap();
    let saved = gateway.saved_payloads()[0].clone();
    assert_eq!(saved.id, Some(42));
    assert_eq!(saved.payload["estado"], json!("SUSPENDIDO"));
    assert_eq!(saved.payload["piso"], json!("3"));
}

#[test]
fn test_edit_mode_coverage_change_rederives_status() {
    let cliente: Cliente = serde_json::from_value(json!({
        "id": 7,
        "nombre": "Ana",
        "apellido": "Quispe",
        "cobertura": "SIN_COBERTURA",
        "estado": "PEND_COBERTURA"
    }))
    .unwrap();
    let mut wizard = IntakeWizard::from_cliente(&cliente);
    wizard.select_coverage(Coverage::Covered);
    assert_eq!(wizard.status_to_send(), ClienteEstado::PendEquipo);
}
