//! Equipment catalog: brands, models, lots and ONU devices

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{CrudResource, Resource};
use crate::api::error::{ApiError, FieldErrors};
use crate::api::lenient;
use crate::validation;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Marca {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default = "default_true")]
    pub activo: bool,
    #[serde(default, skip_serializing)]
    pub modelos_count: u32,
    #[serde(default, skip_serializing)]
    pub equipos_count: u32,
}

impl Resource for Marca {
    const PATH: &'static str = "/almacenes/marcas/";
    const LABEL: &'static str = "Marcas";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> FieldErrors {
        validation::validate_marca(self)
    }

    fn display_line(&self) -> String {
        format!("{} ({} modelos)", self.nombre, self.modelos_count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Modelo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub nombre: String,
    #[serde(default)]
    pub codigo_modelo: Option<i64>,
    #[serde(default)]
    pub marca: Option<i64>,
    #[serde(default, skip_serializing)]
    pub marca_nombre: Option<String>,
    #[serde(default)]
    pub tipo_equipo: Option<i64>,
    #[serde(default, skip_serializing)]
    pub tipo_equipo_nombre: Option<String>,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default, skip_serializing)]
    pub equipos_count: u32,
    #[serde(default, skip_serializing)]
    pub equipos_disponibles: u32,
}

impl Resource for Modelo {
    const PATH: &'static str = "/almacenes/modelos/";
    const LABEL: &'static str = "Modelos";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> FieldErrors {
        validation::validate_modelo(self)
    }

    fn display_line(&self) -> String {
        let codigo = self
            .codigo_modelo
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{} [{}] {}",
            self.nombre,
            codigo,
            self.marca_nombre.as_deref().unwrap_or("")
        )
        .trim_end()
        .to_string()
    }
}

/// Device type (ONU, router, ...), referenced by models
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TipoEquipo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default, skip_serializing)]
    pub modelos_count: u32,
}

impl Resource for TipoEquipo {
    const PATH: &'static str = "/almacenes/tipos-equipo/";
    const LABEL: &'static str = "Tipos de equipo";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> FieldErrors {
        validation::validate_catalogo(&self.nombre, self.descripcion.as_deref(), 50)
    }

    fn display_line(&self) -> String {
        format!("{} ({} modelos)", self.nombre, self.modelos_count)
    }
}

/// Inventory state a device can be in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EstadoEquipo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default, skip_serializing)]
    pub equipos_count: u32,
}

impl Resource for EstadoEquipo {
    const PATH: &'static str = "/almacenes/estados-equipo/";
    const LABEL: &'static str = "Estados de equipo";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> FieldErrors {
        validation::validate_catalogo(&self.nombre, self.descripcion.as_deref(), 50)
    }

    fn display_line(&self) -> String {
        format!("{} ({} equipos)", self.nombre, self.equipos_count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Componente {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    /// Models that list this component
    #[serde(default, skip_serializing)]
    pub modelos_usando: u32,
}

impl Resource for Componente {
    const PATH: &'static str = "/almacenes/componentes/";
    const LABEL: &'static str = "Componentes";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> FieldErrors {
        validation::validate_catalogo(&self.nombre, self.descripcion.as_deref(), 100)
    }

    fn display_line(&self) -> String {
        if self.modelos_usando == 0 {
            format!("{} (sin uso)", self.nombre)
        } else {
            format!("{} (usado en {} modelos)", self.nombre, self.modelos_usando)
        }
    }
}

/// One model line of a lot: how many units were received
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoteDetalle {
    #[serde(default)]
    pub modelo: Option<i64>,
    #[serde(default, skip_serializing)]
    pub modelo_nombre: Option<String>,
    #[serde(default)]
    pub cantidad: u32,
}

/// Supplier delivery that devices are registered against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub numero_lote: String,
    #[serde(default)]
    pub proveedor: String,
    #[serde(default)]
    pub tipo_servicio: Option<i64>,
    #[serde(default, skip_serializing)]
    pub tipo_servicio_nombre: Option<String>,
    #[serde(default)]
    pub observaciones: Option<String>,
    #[serde(default)]
    pub detalles: Vec<LoteDetalle>,
    #[serde(default, skip_serializing, deserialize_with = "lenient::count")]
    pub cantidad_total: u64,
    #[serde(default, skip_serializing, deserialize_with = "lenient::count")]
    pub equipos_registrados: u64,
    #[serde(default, skip_serializing, deserialize_with = "lenient::count")]
    pub equipos_pendientes: u64,
    #[serde(default, skip_serializing)]
    pub fecha_ingreso: Option<String>,
}

impl Lote {
    /// Every unit of the lot has been registered as a device
    pub fn is_complete(&self) -> bool {
        self.equipos_pendientes == 0 && self.cantidad_total > 0
    }
}

impl Resource for Lote {
    const PATH: &'static str = "/almacenes/lotes/";
    const LABEL: &'static str = "Lotes";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> FieldErrors {
        validation::validate_lote(self)
    }

    fn display_line(&self) -> String {
        format!(
            "{} {} {}/{} registrados{}",
            self.numero_lote,
            self.proveedor,
            self.equipos_registrados,
            self.cantidad_total,
            if self.equipos_pendientes > 0 {
                format!(" ({} pendientes)", self.equipos_pendientes)
            } else {
                String::new()
            }
        )
    }
}

/// ONU device in inventory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipoOnu {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub codigo_interno: String,
    #[serde(default)]
    pub modelo: Option<i64>,
    #[serde(default, skip_serializing)]
    pub modelo_nombre: Option<String>,
    #[serde(default, skip_serializing)]
    pub marca_nombre: Option<String>,
    #[serde(default)]
    pub tipo_equipo: Option<i64>,
    #[serde(default)]
    pub lote: Option<i64>,
    #[serde(default, skip_serializing)]
    pub lote_numero: Option<String>,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub gpon_serial: String,
    #[serde(default)]
    pub serial_manufacturer: String,
    #[serde(default)]
    pub estado: Option<i64>,
    #[serde(default, skip_serializing)]
    pub estado_nombre: Option<String>,
    #[serde(default)]
    pub observaciones: Option<String>,
    #[serde(default, skip_serializing)]
    pub esta_asignado: bool,
    #[serde(default, skip_serializing)]
    pub fecha_ingreso: Option<String>,
}

impl EquipoOnu {
    /// Lowercased state name, empty when unknown
    pub fn estado_key(&self) -> String {
        self.estado_nombre
            .as_deref()
            .unwrap_or_default()
            .to_lowercase()
    }
}

impl Resource for EquipoOnu {
    const PATH: &'static str = "/almacenes/equipos/";
    const LABEL: &'static str = "Equipos ONU";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> FieldErrors {
        validation::validate_equipo(self)
    }

    fn display_line(&self) -> String {
        format!(
            "{} {} [{}]{}",
            self.codigo_interno,
            self.mac_address,
            self.estado_nombre.as_deref().unwrap_or("sin estado"),
            if self.esta_asignado { " asignado" } else { "" }
        )
    }
}

/// Body of the device state change action
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CambioEstado {
    pub estado_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observaciones: Option<String>,
}

impl CambioEstado {
    pub fn new(estado_id: i64, observaciones: Option<String>) -> Self {
        Self {
            estado_id: Some(estado_id),
            observaciones: observaciones.filter(|o| !o.trim().is_empty()),
        }
    }
}

impl CrudResource<EquipoOnu> {
    /// Move a device to another inventory state
    ///
    /// Validation failures return before any request is sent.
    pub async fn cambiar_estado(&self, id: i64, cambio: &CambioEstado) -> Result<(), ApiError> {
        let errors = validation::validate_cambio_estado(cambio);
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        let path = format!("{}cambiar_estado/", Self::item_path(id));
        self.client.post_action(&path, cambio).await?;
        info!(equipo = id, estado = ?cambio.estado_id, "Device state changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equipo_read_only_fields_not_sent() {
        let equipo: EquipoOnu = serde_json::from_value(json!({
            "id": 9,
            "codigo_interno": "ONU-0009",
            "modelo": 2,
            "modelo_nombre": "HG8245",
            "mac_address": "AA:BB:CC:DD:EE:FF",
            "gpon_serial": "HWTC12345678",
            "serial_manufacturer": "SN1234",
            "estado": 1,
            "estado_nombre": "Disponible",
            "esta_asignado": false
        }))
        .unwrap();
        assert_eq!(equipo.estado_key(), "disponible");

        let out = serde_json::to_value(&equipo).unwrap();
        assert!(out.get("estado_nombre").is_none());
        assert!(out.get("esta_asignado").is_none());
        assert_eq!(out["estado"], 1);
    }

    #[test]
    fn test_modelo_display_without_brand() {
        let modelo = Modelo {
            nombre: "F660".to_string(),
            codigo_modelo: Some(1200),
            ..Modelo::default()
        };
        assert_eq!(modelo.display_line(), "F660 [1200]");
    }

    #[test]
    fn test_lote_counts_accept_strings_and_are_not_sent() {
        let lote: Lote = serde_json::from_value(json!({
            "id": 3,
            "numero_lote": "L-2025-01",
            "proveedor": "Huawei",
            "tipo_servicio": 1,
            "tipo_servicio_nombre": "FTTH",
            "detalles": [{"modelo": 2, "modelo_nombre": "HG8245", "cantidad": 50}],
            "cantidad_total": "50",
            "equipos_registrados": 48,
            "equipos_pendientes": 2
        }))
        .unwrap();
        assert_eq!(lote.cantidad_total, 50);
        assert!(!lote.is_complete());
        assert_eq!(lote.display_line(), "L-2025-01 Huawei 48/50 registrados (2 pendientes)");

        let out = serde_json::to_value(&lote).unwrap();
        assert!(out.get("equipos_pendientes").is_none());
        assert!(out.get("tipo_servicio_nombre").is_none());
        assert_eq!(out["detalles"], json!([{"modelo": 2, "cantidad": 50}]));
    }

    #[test]
    fn test_empty_lote_is_not_complete() {
        let lote = Lote {
            numero_lote: "L-1".to_string(),
            ..Lote::default()
        };
        assert!(!lote.is_complete());
    }

    #[test]
    fn test_cambio_estado_body_drops_blank_note() {
        let body = serde_json::to_value(CambioEstado::new(4, Some("  ".to_string()))).unwrap();
        assert_eq!(body, json!({"estado_id": 4}));
    }

    #[tokio::test]
    async fn test_cambiar_estado_rejects_missing_state_before_request() {
        let client = crate::api::ApiClient::new(
            "http://127.0.0.1:9/api",
            std::time::Duration::from_millis(200),
            std::sync::Arc::new(crate::api::auth::NoAuth),
        )
        .unwrap();
        let equipos = CrudResource::<EquipoOnu>::new(client);

        let err = equipos
            .cambiar_estado(9, &CambioEstado::default())
            .await
            .unwrap_err();
        assert!(err.field_errors().is_some_and(|e| e.contains("estado_id")));
    }
}
