use thiserror::Error;

use super::steps::StepKind;
use crate::api::error::ApiError;

/// Why a migration run stopped
#[derive(Debug, Clone, Error)]
pub enum ConsultaError {
    #[error("document number is required")]
    EmptyDocument,

    /// Upstream has no such record (404 or a `no_encontrado` body)
    #[error("{}: not found", .step.title())]
    NotFound { step: StepKind },

    /// The customer step succeeded but returned no customer code
    #[error("customer lookup returned no customer code")]
    MissingCustomerId,

    #[error("{}: {source}", .step.title())]
    Api {
        step: StepKind,
        #[source]
        source: ApiError,
    },
}

impl ConsultaError {
    /// Map a gateway failure for the given step
    pub fn from_api(step: StepKind, source: ApiError) -> Self {
        if source.is_not_found() {
            ConsultaError::NotFound { step }
        } else {
            ConsultaError::Api { step, source }
        }
    }

    /// Step that failed, if the run got that far
    pub fn step(&self) -> Option<StepKind> {
        match self {
            ConsultaError::EmptyDocument => None,
            ConsultaError::NotFound { step } | ConsultaError::Api { step, .. } => Some(*step),
            ConsultaError::MissingCustomerId => Some(StepKind::Cliente),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ConsultaError::NotFound { .. })
    }

    /// Follow-up advice for the user, when there is one
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ConsultaError::NotFound {
                step: StepKind::Resumen,
            } => Some(
                "Cliente no encontrado en datos locales. Use la consulta completa para migrar los datos.",
            ),
            ConsultaError::NotFound {
                step: StepKind::Cliente,
            } => Some("Verifique el número de documento."),
            _ => None,
        }
    }

    /// Single-line message for banners and the CLI
    pub fn user_message(&self) -> String {
        match self {
            ConsultaError::EmptyDocument => "Ingrese un número de documento".to_string(),
            ConsultaError::NotFound {
                step: StepKind::Cliente,
            } => "Cliente no encontrado".to_string(),
            ConsultaError::NotFound { step } => format!("{}: sin datos", step.title()),
            ConsultaError::MissingCustomerId => {
                "El cliente no tiene código asignado en el sistema externo".to_string()
            }
            ConsultaError::Api { step, source } => {
                format!("{}: {}", step.title(), source.banner_message())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_mapping() {
        let err = ConsultaError::from_api(StepKind::Servicios, ApiError::not_found("/soli/x/"));
        assert!(err.is_not_found());
        assert_eq!(err.step(), Some(StepKind::Servicios));

        let err = ConsultaError::from_api(StepKind::Facturas, ApiError::network("timeout"));
        assert!(matches!(err, ConsultaError::Api { .. }));
    }

    #[test]
    fn test_summary_not_found_has_hint() {
        let err = ConsultaError::NotFound {
            step: StepKind::Resumen,
        };
        assert!(err.hint().unwrap().contains("consulta completa"));
        assert!(ConsultaError::MissingCustomerId.hint().is_none());
    }
}
