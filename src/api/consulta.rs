//! Legacy-system consultation endpoints
//!
//! Each `consulta-*` call checks the local store and, when the record is
//! missing, migrates it from the legacy system before answering. The
//! summary endpoint only reads the local store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::ApiClient;
use super::error::ApiError;
use super::lenient;

/// Minimum trimmed length for a name search to reach the server
pub const MIN_SEARCH_CHARS: usize = 2;

/// Outcome reported by a consultation endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    /// Already present locally, nothing migrated
    Existe,
    /// Copied from the legacy system in this call
    Migrado,
    NoEncontrado,
    SinServicios,
    #[serde(other)]
    Unknown,
}

impl MigrationStatus {
    pub fn is_not_found(self) -> bool {
        matches!(self, MigrationStatus::NoEncontrado | MigrationStatus::SinServicios)
    }

    pub fn label(self) -> &'static str {
        match self {
            MigrationStatus::Existe => "ya existía",
            MigrationStatus::Migrado => "migrado",
            MigrationStatus::NoEncontrado => "no encontrado",
            MigrationStatus::SinServicios => "sin servicios",
            MigrationStatus::Unknown => "desconocido",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClienteConsultaData {
    #[serde(default, deserialize_with = "lenient::opt_code")]
    pub cod_cliente: Option<String>,
}

/// Response of `consulta-cliente`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClienteConsulta {
    pub status: MigrationStatus,
    #[serde(default, deserialize_with = "lenient::count")]
    pub registros: u64,
    #[serde(default)]
    pub data: Option<ClienteConsultaData>,
    #[serde(default, deserialize_with = "lenient::opt_code")]
    pub cod_cliente: Option<String>,
}

impl ClienteConsulta {
    /// Customer code, from `data.cod_cliente` or the top-level field
    pub fn customer_id(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.cod_cliente.as_deref())
            .or(self.cod_cliente.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContratosData {
    #[serde(default, deserialize_with = "lenient::code_list")]
    pub contratos: Vec<String>,
}

/// Response of `consulta-servicio`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiciosConsulta {
    pub status: MigrationStatus,
    #[serde(default, deserialize_with = "lenient::count")]
    pub registros: u64,
    #[serde(default)]
    pub data: Option<ContratosData>,
}

impl ServiciosConsulta {
    pub fn contratos(&self) -> &[String] {
        self.data.as_ref().map_or(&[], |d| d.contratos.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacturasContrato {
    #[serde(default, deserialize_with = "lenient::opt_code")]
    pub contrato: Option<String>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub facturas_migradas: u64,
}

/// Response of `consulta-factura-cliente`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacturasConsulta {
    pub status: MigrationStatus,
    #[serde(default, deserialize_with = "lenient::count")]
    pub total_facturas: u64,
    #[serde(default)]
    pub detalle: Vec<FacturasContrato>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumenClienteInfo {
    #[serde(default, deserialize_with = "lenient::opt_code")]
    pub cod_cliente: Option<String>,
    #[serde(default)]
    pub nombres: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_code")]
    pub nro_documento: Option<String>,
}

/// Service contract as stored locally after migration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicioLocal {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_code")]
    pub contrato: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_code")]
    pub cod_cliente: Option<String>,
    #[serde(default)]
    pub plan_comercial: Option<String>,
    #[serde(default)]
    pub forma_pago: Option<String>,
    #[serde(default)]
    pub direccion: Option<String>,
    #[serde(default)]
    pub cod_estado_contrato: Option<String>,
    #[serde(default)]
    pub anulado: Option<String>,
    #[serde(default)]
    pub cod_servicio: Option<String>,
}

/// Outstanding-invoice aggregate for one service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacturasResumen {
    #[serde(default, deserialize_with = "lenient::count")]
    pub cantidad_facturas: u64,
    /// Null when the service has no outstanding invoices
    #[serde(default, deserialize_with = "lenient::opt_amount")]
    pub total_monto: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicioResumen {
    pub servicio: ServicioLocal,
    #[serde(default)]
    pub facturas_resumen: FacturasResumen,
}

/// Response of `cliente-servicios-facturas-resumido`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumenCliente {
    pub cliente: ResumenClienteInfo,
    #[serde(default)]
    pub servicios: Vec<ServicioResumen>,
}

impl ResumenCliente {
    pub fn total_facturas(&self) -> u64 {
        self.servicios
            .iter()
            .map(|s| s.facturas_resumen.cantidad_facturas)
            .sum()
    }

    pub fn total_monto(&self) -> f64 {
        self.servicios
            .iter()
            .filter_map(|s| s.facturas_resumen.total_monto)
            .sum()
    }
}

/// Migrated customer row from `clientes-locales` / `clientes-buscar`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClienteLocal {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_code")]
    pub cod_cliente: Option<String>,
    #[serde(default)]
    pub nombres: Option<String>,
    #[serde(default)]
    pub ape_paterno: Option<String>,
    #[serde(default)]
    pub ape_materno: Option<String>,
    #[serde(default)]
    pub nombre_pila: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_code")]
    pub nro_documento: Option<String>,
    #[serde(default)]
    pub direccion: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub fecha_migracion: Option<String>,
}

impl ClienteLocal {
    /// Best available display name
    pub fn display_name(&self) -> String {
        if let Some(pila) = self.nombre_pila.as_deref().filter(|s| !s.trim().is_empty()) {
            return pila.trim().to_string();
        }
        [&self.nombres, &self.ape_paterno, &self.ape_materno]
            .iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Access to the consultation endpoints
#[async_trait]
pub trait LegacyGateway: Send + Sync {
    /// Resolve a customer by document number, migrating it if needed
    async fn consultar_cliente(&self, nro_documento: &str) -> Result<ClienteConsulta, ApiError>;

    /// Resolve the customer's service contracts, migrating them if needed
    async fn consultar_servicios(&self, cod_cliente: &str) -> Result<ServiciosConsulta, ApiError>;

    /// Migrate invoices for every contract of the customer
    async fn consultar_facturas(&self, cod_cliente: &str) -> Result<FacturasConsulta, ApiError>;

    /// Summary of services and outstanding invoices (local data only)
    async fn resumen_cliente(&self, nro_documento: &str) -> Result<ResumenCliente, ApiError>;

    async fn clientes_locales(&self) -> Result<Vec<ClienteLocal>, ApiError>;

    /// Server-side name search; prefer [`buscar_clientes`]
    async fn buscar_por_nombre(&self, nombre: &str) -> Result<Vec<ClienteLocal>, ApiError>;
}

/// Name search that skips the network call for inputs shorter than
/// [`MIN_SEARCH_CHARS`] (after trimming)
pub async fn buscar_clientes<G: LegacyGateway + ?Sized>(
    gateway: &G,
    nombre: &str,
) -> Result<Vec<ClienteLocal>, ApiError> {
    let nombre = nombre.trim();
    if nombre.chars().count() < MIN_SEARCH_CHARS {
        return Ok(Vec::new());
    }
    gateway.buscar_por_nombre(nombre).await
}

/// Customer code of an already-migrated document, from the local store
///
/// `consulta-cliente` answers a bare `existe` for documents migrated
/// earlier, without the code that later steps need.
pub async fn codigo_local<G: LegacyGateway + ?Sized>(
    gateway: &G,
    nro_documento: &str,
) -> Result<Option<String>, ApiError> {
    let locales = gateway.clientes_locales().await?;
    Ok(locales
        .into_iter()
        .find(|c| c.nro_documento.as_deref().map(str::trim) == Some(nro_documento))
        .and_then(|c| c.cod_cliente))
}

/// HTTP implementation over [`ApiClient`]
#[derive(Debug, Clone)]
pub struct HttpLegacyGateway {
    client: ApiClient,
    prefix: String,
}

impl HttpLegacyGateway {
    pub fn new(client: ApiClient, prefix: &str) -> Self {
        Self {
            client,
            prefix: prefix.trim_matches('/').to_string(),
        }
    }

    fn path(&self, endpoint: &str) -> String {
        if self.prefix.is_empty() {
            format!("/{endpoint}/")
        } else {
            format!("/{}/{}/", self.prefix, endpoint)
        }
    }
}

#[async_trait]
impl LegacyGateway for HttpLegacyGateway {
    async fn consultar_cliente(&self, nro_documento: &str) -> Result<ClienteConsulta, ApiError> {
        self.client
            .get_with_query(
                &self.path("consulta-cliente"),
                &[("nro_documento", nro_documento)],
            )
            .await
    }

    async fn consultar_servicios(&self, cod_cliente: &str) -> Result<ServiciosConsulta, ApiError> {
        self.client
            .get_with_query(
                &self.path("consulta-servicio"),
                &[("cod_cliente", cod_cliente)],
            )
            .await
    }

    async fn consultar_facturas(&self, cod_cliente: &str) -> Result<FacturasConsulta, ApiError> {
        self.client
            .get_with_query(
                &self.path("consulta-factura-cliente"),
                &[("cod_cliente", cod_cliente)],
            )
            .await
    }

    async fn resumen_cliente(&self, nro_documento: &str) -> Result<ResumenCliente, ApiError> {
        self.client
            .get_with_query(
                &self.path("cliente-servicios-facturas-resumido"),
                &[("nro_documento", nro_documento)],
            )
            .await
    }

    async fn clientes_locales(&self) -> Result<Vec<ClienteLocal>, ApiError> {
        self.client
            .get_list(&self.path("clientes-locales"), &[])
            .await
    }

    async fn buscar_por_nombre(&self, nombre: &str) -> Result<Vec<ClienteLocal>, ApiError> {
        self.client
            .get_list(&self.path("clientes-buscar"), &[("nombre", nombre)])
            .await
    }
}

/// Recorded call on [`MockLegacyGateway`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub operation: &'static str,
    pub arg: String,
}

/// In-memory gateway for tests
///
/// Unknown keys answer like the server does: 404 with `no_encontrado`. A
/// customer answers `migrado` with its code once, then a bare `existe`.
#[derive(Default, Clone)]
pub struct MockLegacyGateway {
    clientes: Arc<Mutex<HashMap<String, ClienteConsulta>>>,
    servicios: Arc<Mutex<HashMap<String, ServiciosConsulta>>>,
    facturas: Arc<Mutex<HashMap<String, FacturasConsulta>>>,
    resumenes: Arc<Mutex<HashMap<String, ResumenCliente>>>,
    locales: Arc<Mutex<Vec<ClienteLocal>>>,
    /// Forced failures by operation name
    failures: Arc<Mutex<HashMap<&'static str, ApiError>>>,
    /// Record of calls made
    pub calls: Arc<Mutex<Vec<MockCall>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_found(path: &str, status: &str) -> ApiError {
    ApiError::NotFound {
        path: path.to_string(),
        status: Some(status.to_string()),
    }
}

impl MockLegacyGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a customer that the legacy system knows, with one entry per
    /// contract: `(contrato, outstanding invoices, outstanding amount)`
    pub fn add_legacy_customer(
        &self,
        nro_documento: &str,
        cod_cliente: &str,
        nombres: &str,
        contratos: &[(&str, u64, f64)],
    ) {
        lock(&self.clientes).insert(
            nro_documento.to_string(),
            ClienteConsulta {
                status: MigrationStatus::Migrado,
                registros: 1,
                data: Some(ClienteConsultaData {
                    cod_cliente: Some(cod_cliente.to_string()),
                }),
                cod_cliente: None,
            },
        );
        lock(&self.servicios).insert(
            cod_cliente.to_string(),
            ServiciosConsulta {
                status: MigrationStatus::Migrado,
                registros: contratos.len() as u64,
                data: Some(ContratosData {
                    contratos: contratos.iter().map(|(c, _, _)| (*c).to_string()).collect(),
                }),
            },
        );
        lock(&self.facturas).insert(
            cod_cliente.to_string(),
            FacturasConsulta {
                status: MigrationStatus::Migrado,
                total_facturas: contratos.iter().map(|(_, n, _)| n).sum(),
                detalle: contratos
                    .iter()
                    .filter(|(_, n, _)| *n > 0)
                    .map(|(c, n, _)| FacturasContrato {
                        contrato: Some((*c).to_string()),
                        facturas_migradas: *n,
                    })
                    .collect(),
            },
        );
        lock(&self.resumenes).insert(
            nro_documento.to_string(),
            ResumenCliente {
                cliente: ResumenClienteInfo {
                    cod_cliente: Some(cod_cliente.to_string()),
                    nombres: Some(nombres.to_string()),
                    nro_documento: Some(nro_documento.to_string()),
                },
                servicios: contratos
                    .iter()
                    .map(|(c, n, monto)| ServicioResumen {
                        servicio: ServicioLocal {
                            contrato: Some((*c).to_string()),
                            cod_cliente: Some(cod_cliente.to_string()),
                            ..ServicioLocal::default()
                        },
                        facturas_resumen: FacturasResumen {
                            cantidad_facturas: *n,
                            total_monto: if *n > 0 { Some(*monto) } else { None },
                        },
                    })
                    .collect(),
            },
        );
        let mut locales = lock(&self.locales);
        let next_id = locales.len() as i64 + 1;
        locales.push(ClienteLocal {
            id: Some(next_id),
            cod_cliente: Some(cod_cliente.to_string()),
            nombres: Some(nombres.to_string()),
            nro_documento: Some(nro_documento.to_string()),
            ..ClienteLocal::default()
        });
    }

    /// Override the customer-step response for a document
    pub fn set_cliente_response(&self, nro_documento: &str, response: ClienteConsulta) {
        lock(&self.clientes).insert(nro_documento.to_string(), response);
    }

    /// Make an operation fail with the given error
    pub fn fail(&self, operation: &'static str, error: ApiError) {
        lock(&self.failures).insert(operation, error);
    }

    pub fn call_log(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    pub fn operations(&self) -> Vec<&'static str> {
        lock(&self.calls).iter().map(|c| c.operation).collect()
    }

    fn record(&self, operation: &'static str, arg: &str) -> Result<(), ApiError> {
        lock(&self.calls).push(MockCall {
            operation,
            arg: arg.to_string(),
        });
        match lock(&self.failures).get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LegacyGateway for MockLegacyGateway {
    async fn consultar_cliente(&self, nro_documento: &str) -> Result<ClienteConsulta, ApiError> {
        self.record("consultar_cliente", nro_documento)?;
        let mut clientes = lock(&self.clientes);
        let response = clientes
            .get(nro_documento)
            .cloned()
            .ok_or_else(|| not_found("/soli/consulta-cliente/", "no_encontrado"))?;
        if response.status == MigrationStatus::Migrado {
            clientes.insert(
                nro_documento.to_string(),
                ClienteConsulta {
                    status: MigrationStatus::Existe,
                    registros: 0,
                    data: None,
                    cod_cliente: None,
                },
            );
        }
        Ok(response)
    }

    async fn consultar_servicios(&self, cod_cliente: &str) -> Result<ServiciosConsulta, ApiError> {
        self.record("consultar_servicios", cod_cliente)?;
        lock(&self.servicios)
            .get(cod_cliente)
            .cloned()
            .ok_or_else(|| not_found("/soli/consulta-servicio/", "no_encontrado"))
    }

    async fn consultar_facturas(&self, cod_cliente: &str) -> Result<FacturasConsulta, ApiError> {
        self.record("consultar_facturas", cod_cliente)?;
        lock(&self.facturas)
            .get(cod_cliente)
            .cloned()
            .ok_or_else(|| not_found("/soli/consulta-factura-cliente/", "sin_servicios"))
    }

    async fn resumen_cliente(&self, nro_documento: &str) -> Result<ResumenCliente, ApiError> {
        self.record("resumen_cliente", nro_documento)?;
        lock(&self.resumenes)
            .get(nro_documento)
            .cloned()
            .ok_or_else(|| not_found("/soli/cliente-servicios-facturas-resumido/", "no_encontrado"))
    }

    async fn clientes_locales(&self) -> Result<Vec<ClienteLocal>, ApiError> {
        self.record("clientes_locales", "")?;
        Ok(lock(&self.locales).clone())
    }

    async fn buscar_por_nombre(&self, nombre: &str) -> Result<Vec<ClienteLocal>, ApiError> {
        self.record("buscar_por_nombre", nombre)?;
        let needle = nombre.to_lowercase();
        Ok(lock(&self.locales)
            .iter()
            .filter(|c| c.display_name().to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cliente_consulta_migrated_shape() {
        let resp: ClienteConsulta = serde_json::from_value(json!({
            "status": "migrado",
            "registros": 1,
            "data": {"cod_cliente": "100234"}
        }))
        .unwrap();
        assert_eq!(resp.status, MigrationStatus::Migrado);
        assert_eq!(resp.customer_id(), Some("100234"));
    }

    #[test]
    fn test_cliente_consulta_top_level_code_fallback() {
        let resp: ClienteConsulta =
            serde_json::from_value(json!({"status": "existe", "cod_cliente": 77})).unwrap();
        assert_eq!(resp.customer_id(), Some("77"));

        let bare: ClienteConsulta = serde_json::from_value(json!({"status": "existe"})).unwrap();
        assert_eq!(bare.customer_id(), None);
    }

    #[test]
    fn test_unknown_status_tolerated() {
        let resp: ServiciosConsulta =
            serde_json::from_value(json!({"status": "parcial"})).unwrap();
        assert_eq!(resp.status, MigrationStatus::Unknown);
        assert!(resp.contratos().is_empty());
    }

    #[test]
    fn test_resumen_totals_skip_null_amounts() {
        let resumen: ResumenCliente = serde_json::from_value(json!({
            "cliente": {"cod_cliente": "100234", "nombres": "JUAN", "nro_documento": "4819716"},
            "servicios": [
                {"servicio": {"id": 1, "contrato": "5001"},
                 "facturas_resumen": {"cantidad_facturas": 3, "total_monto": "450.75"}},
                {"servicio": {"id": 2, "contrato": "5002"},
                 "facturas_resumen": {"cantidad_facturas": 0, "total_monto": null}}
            ]
        }))
        .unwrap();
        assert_eq!(resumen.total_facturas(), 3);
        assert!((resumen.total_monto() - 450.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_http_gateway_paths() {
        let client = ApiClient::new(
            "http://localhost:8000/api",
            std::time::Duration::from_secs(1),
            Arc::new(crate::api::auth::NoAuth),
        )
        .unwrap();
        let gateway = HttpLegacyGateway::new(client.clone(), "/soli/");
        assert_eq!(gateway.path("consulta-cliente"), "/soli/consulta-cliente/");
        let bare = HttpLegacyGateway::new(client, "");
        assert_eq!(bare.path("clientes-locales"), "/clientes-locales/");
    }

    #[tokio::test]
    async fn test_short_search_skips_network() {
        let mock = MockLegacyGateway::new();
        mock.add_legacy_customer("4819716", "100234", "JUAN PEREZ", &[]);

        assert!(buscar_clientes(&mock, " j ").await.unwrap().is_empty());
        assert!(mock.call_log().is_empty());

        let found = buscar_clientes(&mock, " juan ").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(
            mock.call_log(),
            vec![MockCall {
                operation: "buscar_por_nombre",
                arg: "juan".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_mock_second_lookup_answers_existe() {
        let mock = MockLegacyGateway::new();
        mock.add_legacy_customer("4819716", "100234", "JUAN PEREZ", &[]);

        let first = mock.consultar_cliente("4819716").await.unwrap();
        assert_eq!(first.status, MigrationStatus::Migrado);
        let second = mock.consultar_cliente("4819716").await.unwrap();
        assert_eq!(second.status, MigrationStatus::Existe);
        assert_eq!(second.customer_id(), None);

        assert_eq!(
            codigo_local(&mock, "4819716").await.unwrap().as_deref(),
            Some("100234")
        );
        assert_eq!(codigo_local(&mock, "123").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mock_unknown_document_is_not_found() {
        let mock = MockLegacyGateway::new();
        let err = mock.consultar_cliente("000").await.unwrap_err();
        match err {
            ApiError::NotFound { status, .. } => assert_eq!(status.as_deref(), Some("no_encontrado")),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
