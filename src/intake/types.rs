//! Type definitions for the intake wizard

use thiserror::Error;

use crate::api::error::{ApiError, FieldErrors};
use crate::api::resources::{Coverage, TipoCliente, Vivienda};

/// Wizard stages, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntakeStep {
    #[default]
    Personal,
    Location,
    Plan,
    Confirm,
}

impl IntakeStep {
    pub const ALL: [IntakeStep; 4] = [
        IntakeStep::Personal,
        IntakeStep::Location,
        IntakeStep::Plan,
        IntakeStep::Confirm,
    ];

    pub fn index(self) -> usize {
        match self {
            IntakeStep::Personal => 0,
            IntakeStep::Location => 1,
            IntakeStep::Plan => 2,
            IntakeStep::Confirm => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            IntakeStep::Personal => "Datos personales",
            IntakeStep::Location => "Ubicación y cobertura",
            IntakeStep::Plan => "Plan",
            IntakeStep::Confirm => "Confirmación",
        }
    }
}

/// Result of wizard navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeResult {
    /// Moved (or stayed) within the wizard
    Continue,
    /// The step gate refused to advance; see the wizard's field errors
    Blocked,
    /// Confirmation accepted, the caller should submit
    Submit,
    /// Backed out of the first step
    Cancel,
}

/// Why a submission did not produce a saved record
#[derive(Debug, Clone, Error)]
pub enum IntakeError {
    #[error("a submission is already in progress")]
    Busy,

    #[error("the form has {} invalid field(s)", .0.len())]
    Validation(FieldErrors),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Editable text fields of the personal step: (key, label)
pub const PERSONAL_FIELDS: &[(&str, &str)] = &[
    ("nombre", "Nombre"),
    ("apellido", "Apellido"),
    ("ci", "CI"),
    ("nit", "NIT"),
    ("razon_social", "Razón social"),
    ("email", "Email"),
    ("telefono", "Teléfono"),
    ("observaciones", "Observaciones"),
];

/// Editable text fields of the location step: (key, label)
pub const LOCATION_FIELDS: &[(&str, &str)] = &[
    ("calle", "Calle"),
    ("numero_puerta", "Número de puerta"),
    ("zona", "Zona"),
    ("direccion_completa", "Dirección completa"),
    ("piso", "Piso"),
    ("referencias", "Referencias"),
    ("latitud", "Latitud"),
    ("longitud", "Longitud"),
];

/// Step 0 form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonalData {
    pub nombre: String,
    pub apellido: String,
    pub ci: String,
    pub email: String,
    pub telefono: String,
    pub tipo_cliente: TipoCliente,
    pub nit: String,
    pub razon_social: String,
    pub observaciones: String,
}

/// Step 1 form; coordinates are kept as typed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationData {
    pub vivienda: Vivienda,
    pub piso: String,
    pub calle: String,
    pub zona: String,
    pub direccion_completa: String,
    pub numero_puerta: String,
    pub referencias: String,
    pub latitud: String,
    pub longitud: String,
    pub cobertura: Option<Coverage>,
}
