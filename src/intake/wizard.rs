use serde_json::{Map, Value};
use tracing::{info, warn};

use super::draft::IntakeDraft;
use super::gateway::ClienteGateway;
use super::types::{IntakeError, IntakeResult, IntakeStep, LocationData, PersonalData};
use crate::api::error::{ApiError, FieldErrors};
use crate::api::resources::{
    Cliente, ClienteEstado, Coverage, Plan, Resource, TipoCliente, Vivienda,
};
use crate::busy::{BusyFlag, BusyGuard};

const REVIEW_FIELDS: &str = "Revise los campos marcados";

pub type SaveCallback = Box<dyn Fn(&Cliente) + Send + Sync>;

/// Record being edited, when the wizard was opened on an existing customer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EditTarget {
    id: i64,
    estado: ClienteEstado,
    cobertura: Coverage,
}

/// A validated request ready to be sent
///
/// Holds the wizard's busy guard until dropped.
#[derive(Debug)]
pub struct Submission {
    id: Option<i64>,
    payload: Map<String, Value>,
    _guard: BusyGuard,
}

impl Submission {
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn is_update(&self) -> bool {
        self.id.is_some()
    }

    pub async fn send<G: ClienteGateway + ?Sized>(&self, gateway: &G) -> Result<Cliente, ApiError> {
        match self.id {
            Some(id) => gateway.update_cliente(id, &self.payload).await,
            None => gateway.create_cliente(&self.payload).await,
        }
    }
}

/// Four-step customer intake
///
/// Personal data, then location and coverage, then plan, then confirmation.
/// Without coverage the plan step is skipped in both directions.
pub struct IntakeWizard {
    step: IntakeStep,
    draft: IntakeDraft,
    editing: Option<EditTarget>,
    plans: Vec<Plan>,
    field_errors: FieldErrors,
    banner: Option<String>,
    busy: BusyFlag,
    on_save: Option<SaveCallback>,
    saved: Option<Cliente>,
}

impl std::fmt::Debug for IntakeWizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntakeWizard")
            .field("step", &self.step)
            .field("draft", &self.draft)
            .field("editing", &self.editing)
            .field("field_errors", &self.field_errors)
            .field("banner", &self.banner)
            .finish_non_exhaustive()
    }
}

impl Default for IntakeWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl IntakeWizard {
    pub fn new() -> Self {
        Self {
            step: IntakeStep::Personal,
            draft: IntakeDraft::default(),
            editing: None,
            plans: Vec::new(),
            field_errors: FieldErrors::new(),
            banner: None,
            busy: BusyFlag::new(),
            on_save: None,
            saved: None,
        }
    }

    /// Wizard pre-filled from an existing customer; submit updates it
    pub fn from_cliente(cliente: &Cliente) -> Self {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        let coord = |v: Option<f64>| v.map(|c| c.to_string()).unwrap_or_default();

        let draft = IntakeDraft {
            personal: PersonalData {
                nombre: cliente.nombre.clone(),
                apellido: cliente.apellido.clone(),
                ci: opt(&cliente.ci),
                email: opt(&cliente.email),
                telefono: cliente.telefono.clone(),
                tipo_cliente: cliente.tipo_cliente,
                nit: opt(&cliente.nit),
                razon_social: opt(&cliente.razon_social),
                observaciones: opt(&cliente.observaciones),
            },
            location: LocationData {
                vivienda: cliente.vivienda,
                piso: opt(&cliente.piso),
                calle: cliente.calle.clone(),
                zona: cliente.zona.clone(),
                direccion_completa: cliente.direccion_completa.clone(),
                numero_puerta: cliente.numero_puerta.clone(),
                referencias: opt(&cliente.referencias),
                latitud: coord(cliente.latitud),
                longitud: coord(cliente.longitud),
                cobertura: Some(cliente.cobertura),
            },
            plan_id: cliente.plan.as_ref().and_then(|p| p.id),
        };

        Self {
            draft,
            editing: cliente.id.map(|id| EditTarget {
                id,
                estado: cliente.estado,
                cobertura: cliente.cobertura,
            }),
            plans: cliente.plan.iter().cloned().collect(),
            ..Self::new()
        }
    }

    /// Called with the server's record after every successful save
    pub fn with_on_save<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Cliente) + Send + Sync + 'static,
    {
        self.on_save = Some(Box::new(callback));
        self
    }

    pub fn step(&self) -> IntakeStep {
        self.step
    }

    pub fn draft(&self) -> &IntakeDraft {
        &self.draft
    }

    pub fn personal_mut(&mut self) -> &mut PersonalData {
        &mut self.draft.personal
    }

    pub fn location_mut(&mut self) -> &mut LocationData {
        &mut self.draft.location
    }

    /// Editable text field by wire name; clears that field's errors
    pub fn text_field_mut(&mut self, key: &str) -> Option<&mut String> {
        self.field_errors.clear_field(key);
        self.draft.text_field_mut(key)
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn editing_id(&self) -> Option<i64> {
        self.editing.map(|e| e.id)
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    /// Top-level message for failures not tied to a field
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Last record returned by the server
    pub fn saved(&self) -> Option<&Cliente> {
        self.saved.as_ref()
    }

    /// Offer only active plans
    pub fn set_plans(&mut self, plans: Vec<Plan>) {
        self.plans = plans.into_iter().filter(Plan::is_active).collect();
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    /// Fetch the plan list through `gateway`
    pub async fn load_plans<G: ClienteGateway + ?Sized>(&mut self, gateway: &G) -> Result<(), ApiError> {
        match gateway.active_plans().await {
            Ok(plans) => {
                self.set_plans(plans);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to load plans");
                self.banner = Some(e.banner_message());
                Err(e)
            }
        }
    }

    pub fn toggle_tipo_cliente(&mut self) {
        let personal = &mut self.draft.personal;
        personal.tipo_cliente = match personal.tipo_cliente {
            TipoCliente::Comun => TipoCliente::Empresa,
            TipoCliente::Empresa => TipoCliente::Comun,
        };
    }

    pub fn toggle_vivienda(&mut self) {
        let location = &mut self.draft.location;
        location.vivienda = match location.vivienda {
            Vivienda::Casa => Vivienda::Departamento,
            Vivienda::Departamento => Vivienda::Casa,
        };
    }

    /// Choosing "no coverage" discards any plan selection
    pub fn select_coverage(&mut self, coverage: Coverage) {
        self.draft.location.cobertura = Some(coverage);
        if coverage == Coverage::Uncovered {
            self.draft.plan_id = None;
        }
        self.field_errors.clear_field("cobertura");
    }

    /// Select one of the offered plans; ignored without coverage
    pub fn select_plan(&mut self, plan_id: i64) -> bool {
        if !self.draft.has_coverage() || !self.plans.iter().any(|p| p.id == Some(plan_id)) {
            return false;
        }
        self.draft.plan_id = Some(plan_id);
        self.field_errors.clear_field("plan_id");
        true
    }

    pub fn selected_plan(&self) -> Option<&Plan> {
        let id = self.draft.effective_plan_id()?;
        self.plans.iter().find(|p| p.id == Some(id))
    }

    /// Status to send: derived from coverage for new customers, kept for
    /// edits unless the coverage changed
    pub fn status_to_send(&self) -> ClienteEstado {
        let coverage = self.draft.coverage().unwrap_or(Coverage::Uncovered);
        match self.editing {
            Some(target) if target.cobertura == coverage => target.estado,
            _ => coverage.initial_status(),
        }
    }

    pub fn advance(&mut self) -> IntakeResult {
        match self.step {
            IntakeStep::Personal => {
                self.step = IntakeStep::Location;
                IntakeResult::Continue
            }
            IntakeStep::Location => match self.draft.coverage() {
                None => {
                    self.field_errors
                        .add("cobertura", "Seleccione si hay cobertura en la zona");
                    IntakeResult::Blocked
                }
                Some(Coverage::Covered) => {
                    self.step = IntakeStep::Plan;
                    IntakeResult::Continue
                }
                Some(Coverage::Uncovered) => {
                    self.draft.plan_id = None;
                    self.step = IntakeStep::Confirm;
                    IntakeResult::Continue
                }
            },
            IntakeStep::Plan => {
                if self.draft.plan_id.is_none() {
                    self.field_errors.add("plan_id", "Seleccione un plan");
                    IntakeResult::Blocked
                } else {
                    self.step = IntakeStep::Confirm;
                    IntakeResult::Continue
                }
            }
            IntakeStep::Confirm => IntakeResult::Submit,
        }
    }

    pub fn go_back(&mut self) -> IntakeResult {
        self.step = match self.step {
            IntakeStep::Personal => return IntakeResult::Cancel,
            IntakeStep::Location => IntakeStep::Personal,
            IntakeStep::Plan => IntakeStep::Location,
            IntakeStep::Confirm if self.draft.has_coverage() => IntakeStep::Plan,
            IntakeStep::Confirm => IntakeStep::Location,
        };
        IntakeResult::Continue
    }

    /// Label/value rows for the confirmation step
    pub fn summary_lines(&self) -> Vec<(&'static str, String)> {
        let p = &self.draft.personal;
        let l = &self.draft.location;
        let documento = match p.tipo_cliente {
            TipoCliente::Comun => format!("CI {}", p.ci.trim()),
            TipoCliente::Empresa => format!("NIT {} ({})", p.nit.trim(), p.razon_social.trim()),
        };
        let mut lines = vec![
            ("Nombre", format!("{} {}", p.nombre.trim(), p.apellido.trim())),
            ("Documento", documento),
            ("Teléfono", p.telefono.trim().to_string()),
        ];
        if !p.email.trim().is_empty() {
            lines.push(("Email", p.email.trim().to_string()));
        }
        let vivienda = match l.vivienda {
            Vivienda::Casa => "Casa".to_string(),
            Vivienda::Departamento => format!("Departamento, piso {}", l.piso.trim()),
        };
        lines.push(("Vivienda", vivienda));
        lines.push((
            "Dirección",
            format!(
                "{} #{}, {}",
                l.calle.trim(),
                l.numero_puerta.trim(),
                l.zona.trim()
            ),
        ));
        if !l.latitud.trim().is_empty() && !l.longitud.trim().is_empty() {
            lines.push((
                "Coordenadas",
                format!("{}, {}", l.latitud.trim(), l.longitud.trim()),
            ));
        }
        if let Some(coverage) = self.draft.coverage() {
            lines.push(("Cobertura", coverage.label().to_string()));
        }
        if let Some(plan) = self.selected_plan() {
            lines.push(("Plan", plan.display_line()));
        }
        lines.push(("Estado", self.status_to_send().label().to_string()));
        lines
    }

    /// Validate and take the busy guard
    ///
    /// Fails with [`IntakeError::Busy`] while another submission is alive
    /// and with [`IntakeError::Validation`] when the draft has errors; in
    /// both cases nothing is sent.
    pub fn begin_submit(&mut self) -> Result<Submission, IntakeError> {
        let guard = self.busy.try_begin().ok_or(IntakeError::Busy)?;

        let errors = self.draft.validate();
        if !errors.is_empty() {
            self.field_errors = errors.clone();
            self.banner = Some(REVIEW_FIELDS.to_string());
            return Err(IntakeError::Validation(errors));
        }

        self.field_errors = FieldErrors::new();
        self.banner = None;
        Ok(Submission {
            id: self.editing_id(),
            payload: self.draft.build_payload(self.status_to_send()),
            _guard: guard,
        })
    }

    /// Apply the server's answer to a submission
    pub fn finish_submit(&mut self, result: Result<Cliente, ApiError>) -> Result<Cliente, IntakeError> {
        match result {
            Ok(cliente) => {
                info!(id = ?cliente.id, nombre = %cliente.full_name(), "Customer saved");
                self.field_errors = FieldErrors::new();
                self.banner = None;
                if let Some(id) = cliente.id {
                    self.editing = Some(EditTarget {
                        id,
                        estado: cliente.estado,
                        cobertura: cliente.cobertura,
                    });
                }
                if let Some(on_save) = &self.on_save {
                    on_save(&cliente);
                }
                self.saved = Some(cliente.clone());
                Ok(cliente)
            }
            Err(err) => {
                warn!(error = %err, "Customer save failed");
                match &err {
                    ApiError::Validation(fields) => {
                        self.field_errors.merge(fields.clone());
                        self.banner = Some(
                            fields
                                .non_field()
                                .first()
                                .cloned()
                                .unwrap_or_else(|| REVIEW_FIELDS.to_string()),
                        );
                    }
                    other => self.banner = Some(other.banner_message()),
                }
                Err(IntakeError::Api(err))
            }
        }
    }

    /// Validate, send and apply the answer
    pub async fn submit<G: ClienteGateway + ?Sized>(&mut self, gateway: &G) -> Result<Cliente, IntakeError> {
        let submission = self.begin_submit()?;
        let result = submission.send(gateway).await;
        drop(submission);
        self.finish_submit(result)
    }
}
