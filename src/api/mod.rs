//! Back-office REST API client
//!
//! This module provides:
//! - [`ApiClient`]: base URL, timeout and injected bearer token
//! - Typed CRUD resources bound to their collection paths
//! - The legacy consultation gateway used by the migration flow
//! - Error mapping for the server's field-error convention

pub mod auth;
pub mod client;
pub mod consulta;
pub mod error;
pub mod lenient;
pub mod resources;

pub use auth::{EnvToken, NoAuth, StaticToken, TokenSource};
pub use client::{ApiClient, ListEnvelope};
pub use consulta::{
    buscar_clientes, codigo_local, ClienteConsulta, ClienteLocal, FacturasConsulta,
    HttpLegacyGateway, LegacyGateway, MigrationStatus, MockLegacyGateway, ResumenCliente,
    ServiciosConsulta,
};
pub use error::{ApiError, FieldErrors};
pub use resources::{
    CambioEstado, Cliente, ClienteEstado, Componente, Coverage, CrudResource, EquipoOnu,
    EstadisticasClientes, EstadoEquipo, Lote, Marca, Modelo, Permiso, Plan, Resource,
    ResourceKind, Rol, TipoCliente, TipoEquipo, Usuario, Vivienda,
};
