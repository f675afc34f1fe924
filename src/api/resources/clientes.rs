//! Customers, plans and their enumerations

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{CrudResource, Resource};
use crate::api::error::ApiError;
use crate::api::lenient;

/// Network coverage at the customer's address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coverage {
    #[serde(rename = "CON_COBERTURA")]
    Covered,
    #[serde(rename = "SIN_COBERTURA")]
    Uncovered,
}

impl Coverage {
    pub fn as_str(self) -> &'static str {
        match self {
            Coverage::Covered => "CON_COBERTURA",
            Coverage::Uncovered => "SIN_COBERTURA",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Coverage::Covered => "Con cobertura",
            Coverage::Uncovered => "Sin cobertura",
        }
    }

    /// Status a new customer starts in
    pub fn initial_status(self) -> ClienteEstado {
        match self {
            Coverage::Covered => ClienteEstado::PendEquipo,
            Coverage::Uncovered => ClienteEstado::PendCobertura,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClienteEstado {
    PendCobertura,
    PendEquipo,
    PendInstalacion,
    Activo,
    Suspendido,
}

impl ClienteEstado {
    pub fn as_str(self) -> &'static str {
        match self {
            ClienteEstado::PendCobertura => "PEND_COBERTURA",
            ClienteEstado::PendEquipo => "PEND_EQUIPO",
            ClienteEstado::PendInstalacion => "PEND_INSTALACION",
            ClienteEstado::Activo => "ACTIVO",
            ClienteEstado::Suspendido => "SUSPENDIDO",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ClienteEstado::PendCobertura => "Pendiente por cobertura",
            ClienteEstado::PendEquipo => "Pendiente por equipo",
            ClienteEstado::PendInstalacion => "Pendiente por instalación",
            ClienteEstado::Activo => "Activo",
            ClienteEstado::Suspendido => "Suspendido",
        }
    }
}

impl fmt::Display for ClienteEstado {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TipoCliente {
    #[default]
    Comun,
    Empresa,
}

impl TipoCliente {
    pub fn as_str(self) -> &'static str {
        match self {
            TipoCliente::Comun => "COMUN",
            TipoCliente::Empresa => "EMPRESA",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vivienda {
    #[default]
    Casa,
    Departamento,
}

impl Vivienda {
    pub fn as_str(self) -> &'static str {
        match self {
            Vivienda::Casa => "Casa",
            Vivienda::Departamento => "Departamento",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Casa" | "casa" => Some(Vivienda::Casa),
            "Departamento" | "departamento" => Some(Vivienda::Departamento),
            _ => None,
        }
    }
}

/// Commercial plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub descripcion: String,
    #[serde(default)]
    pub codigo: String,
    #[serde(default, deserialize_with = "lenient::opt_amount")]
    pub monto_basico: Option<f64>,
    #[serde(default)]
    pub tipo_basico: Option<String>,
    #[serde(default)]
    pub estado: bool,
}

impl Plan {
    pub fn is_active(&self) -> bool {
        self.estado
    }
}

impl Resource for Plan {
    const PATH: &'static str = "/planes/planes/";
    const LABEL: &'static str = "Planes";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn display_line(&self) -> String {
        match (self.monto_basico, &self.tipo_basico) {
            (Some(monto), Some(tipo)) => {
                format!("{} ({}) Bs. {:.2} {}", self.descripcion, self.codigo, monto, tipo)
            }
            (Some(monto), None) => format!("{} ({}) Bs. {:.2}", self.descripcion, self.codigo, monto),
            _ => format!("{} ({})", self.descripcion, self.codigo),
        }
    }
}

/// Customer record as returned by the server
///
/// Writes go through the intake payload instead of serializing this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cliente {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub nombre: String,
    pub apellido: String,
    #[serde(default)]
    pub ci: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telefono: String,
    #[serde(default)]
    pub vivienda: Vivienda,
    #[serde(default)]
    pub piso: Option<String>,
    #[serde(default)]
    pub calle: String,
    #[serde(default)]
    pub zona: String,
    #[serde(default)]
    pub direccion_completa: String,
    #[serde(default)]
    pub numero_puerta: String,
    #[serde(default)]
    pub referencias: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_amount")]
    pub latitud: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_amount")]
    pub longitud: Option<f64>,
    #[serde(default)]
    pub tipo_cliente: TipoCliente,
    #[serde(default)]
    pub nit: Option<String>,
    #[serde(default)]
    pub razon_social: Option<String>,
    #[serde(default = "default_coverage")]
    pub cobertura: Coverage,
    #[serde(default = "default_estado")]
    pub estado: ClienteEstado,
    #[serde(default)]
    pub observaciones: Option<String>,
    #[serde(default)]
    pub plan: Option<Plan>,
}

fn default_coverage() -> Coverage {
    Coverage::Uncovered
}

fn default_estado() -> ClienteEstado {
    ClienteEstado::PendCobertura
}

impl Cliente {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.nombre, self.apellido)
    }
}

impl Resource for Cliente {
    const PATH: &'static str = "/planes/clientes/";
    const LABEL: &'static str = "Clientes";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn display_line(&self) -> String {
        let doc = match self.tipo_cliente {
            TipoCliente::Comun => self.ci.clone().unwrap_or_default(),
            TipoCliente::Empresa => self.nit.clone().unwrap_or_default(),
        };
        format!("{} [{}] {}", self.full_name(), doc, self.estado)
    }
}

/// Customer counts computed by the server over the whole table
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EstadisticasClientes {
    #[serde(default)]
    pub resumen: ResumenEstadisticas,
    #[serde(default)]
    pub por_estado: Vec<ConteoEstado>,
    #[serde(default)]
    pub por_tipo: Vec<ConteoTipo>,
    #[serde(default)]
    pub por_cobertura: Vec<ConteoCobertura>,
    /// At most five zones, busiest first
    #[serde(default)]
    pub top_zonas: Vec<ConteoZona>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResumenEstadisticas {
    #[serde(default, deserialize_with = "lenient::count")]
    pub total_clientes: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub total_activos: u64,
    /// Customers in any of the three pending states
    #[serde(default, deserialize_with = "lenient::count")]
    pub total_pendientes: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub total_suspendidos: u64,
    #[serde(default, deserialize_with = "lenient::opt_amount")]
    pub porcentaje_activos: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConteoEstado {
    pub estado: ClienteEstado,
    #[serde(default, deserialize_with = "lenient::count")]
    pub total: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub con_cobertura: u64,
    #[serde(default, deserialize_with = "lenient::count")]
    pub sin_cobertura: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConteoTipo {
    pub tipo_cliente: TipoCliente,
    #[serde(default, deserialize_with = "lenient::count")]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConteoCobertura {
    pub cobertura: Coverage,
    #[serde(default, deserialize_with = "lenient::count")]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConteoZona {
    #[serde(default)]
    pub zona: Option<String>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub total: u64,
}

impl CrudResource<Cliente> {
    pub async fn estadisticas(&self) -> Result<EstadisticasClientes, ApiError> {
        let path = format!("{}estadisticas/", Cliente::PATH);
        self.client.get(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initial_status_from_coverage() {
        assert_eq!(Coverage::Covered.initial_status(), ClienteEstado::PendEquipo);
        assert_eq!(
            Coverage::Uncovered.initial_status(),
            ClienteEstado::PendCobertura
        );
    }

    #[test]
    fn test_cliente_decodes_decimal_strings_and_nested_plan() {
        let cliente: Cliente = serde_json::from_value(json!({
            "id": 5,
            "nombre": "Ana",
            "apellido": "Quispe",
            "ci": "4819716",
            "telefono": "+59171234567",
            "vivienda": "Departamento",
            "piso": "3",
            "calle": "Av. Arce",
            "zona": "Sopocachi",
            "direccion_completa": "Av. Arce 2030",
            "numero_puerta": "2030",
            "latitud": "-16.509876",
            "longitud": "-68.123456",
            "tipo_cliente": "COMUN",
            "cobertura": "CON_COBERTURA",
            "estado": "PEND_EQUIPO",
            "plan": {"id": 2, "descripcion": "Fibra 100", "codigo": "F100",
                     "monto_basico": "199.00", "tipo_basico": "Mensual", "estado": true}
        }))
        .unwrap();

        assert_eq!(cliente.vivienda, Vivienda::Departamento);
        assert_eq!(cliente.latitud, Some(-16.509_876));
        assert_eq!(cliente.cobertura, Coverage::Covered);
        let plan = cliente.plan.unwrap();
        assert_eq!(plan.monto_basico, Some(199.0));
        assert!(plan.is_active());
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_value(ClienteEstado::PendInstalacion).unwrap(),
            json!("PEND_INSTALACION")
        );
        assert_eq!(serde_json::to_value(Coverage::Uncovered).unwrap(), json!("SIN_COBERTURA"));
        assert_eq!(serde_json::to_value(TipoCliente::Empresa).unwrap(), json!("EMPRESA"));
    }

    #[test]
    fn test_estadisticas_decode() {
        let stats: EstadisticasClientes = serde_json::from_value(json!({
            "resumen": {
                "total_clientes": 10,
                "total_activos": 4,
                "total_pendientes": 5,
                "total_suspendidos": 1,
                "porcentaje_activos": 40.0
            },
            "por_estado": [
                {"estado": "ACTIVO", "total": 4, "con_cobertura": 4, "sin_cobertura": 0},
                {"estado": "PEND_COBERTURA", "total": 5, "con_cobertura": 0, "sin_cobertura": 5}
            ],
            "por_tipo": [{"tipo_cliente": "COMUN", "total": 9}, {"tipo_cliente": "EMPRESA", "total": 1}],
            "por_cobertura": [{"cobertura": "SIN_COBERTURA", "total": 5}],
            "top_zonas": [{"zona": "Sopocachi", "total": 3}, {"zona": null, "total": 1}]
        }))
        .unwrap();

        assert_eq!(stats.resumen.total_pendientes, 5);
        assert_eq!(stats.resumen.porcentaje_activos, Some(40.0));
        assert_eq!(stats.por_estado[1].estado, ClienteEstado::PendCobertura);
        assert_eq!(stats.por_tipo[1].tipo_cliente, TipoCliente::Empresa);
        assert_eq!(stats.top_zonas[1].zona, None);
    }

    #[test]
    fn test_estadisticas_of_empty_table() {
        let stats: EstadisticasClientes = serde_json::from_value(json!({
            "resumen": {"total_clientes": 0, "total_activos": 0, "total_pendientes": 0,
                        "total_suspendidos": 0, "porcentaje_activos": 0},
            "por_estado": [], "por_tipo": [], "por_cobertura": [], "top_zonas": []
        }))
        .unwrap();
        assert_eq!(stats.resumen.total_clientes, 0);
        assert!(stats.top_zonas.is_empty());
    }
}
