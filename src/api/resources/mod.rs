//! Typed CRUD access to the back-office collections

mod almacenes;
mod clientes;
mod usuarios;

pub use almacenes::{
    CambioEstado, Componente, EquipoOnu, EstadoEquipo, Lote, LoteDetalle, Marca, Modelo,
    TipoEquipo,
};
pub use clientes::{
    Cliente, ClienteEstado, ConteoCobertura, ConteoEstado, ConteoTipo, ConteoZona, Coverage,
    EstadisticasClientes, Plan, ResumenEstadisticas, TipoCliente, Vivienda,
};
pub use usuarios::{Permiso, Rol, Usuario};

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::client::ApiClient;
use super::error::{ApiError, FieldErrors};

/// A record type bound to one REST collection
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection path, with leading and trailing slash
    const PATH: &'static str;
    /// Human-readable plural label
    const LABEL: &'static str;

    /// Server-assigned id (`None` for unsaved drafts)
    fn id(&self) -> Option<i64>;

    /// One-line description for list rows
    fn display_line(&self) -> String;

    /// Client-side checks run before any write
    fn validate(&self) -> FieldErrors {
        FieldErrors::new()
    }
}

/// CRUD operations for a resource collection
pub struct CrudResource<T: Resource> {
    client: ApiClient,
    _marker: PhantomData<T>,
}

impl<T: Resource> Clone for CrudResource<T> {
    fn clone(&self) -> Self {
        Self::new(self.client.clone())
    }
}

impl<T: Resource> CrudResource<T> {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &'static str {
        T::PATH
    }

    /// Path of a single record
    pub fn item_path(id: i64) -> String {
        format!("{}{}/", T::PATH, id)
    }

    pub async fn list(&self) -> Result<Vec<T>, ApiError> {
        self.client.get_list(T::PATH, &[]).await
    }

    pub async fn list_with_query(&self, query: &[(&str, &str)]) -> Result<Vec<T>, ApiError> {
        self.client.get_list(T::PATH, query).await
    }

    pub async fn get(&self, id: i64) -> Result<T, ApiError> {
        self.client.get(&Self::item_path(id)).await
    }

    pub async fn create<B: Serialize + ?Sized>(&self, body: &B) -> Result<T, ApiError> {
        self.client.post(T::PATH, body).await
    }

    pub async fn update<B: Serialize + ?Sized>(&self, id: i64, body: &B) -> Result<T, ApiError> {
        self.client.put(&Self::item_path(id), body).await
    }

    pub async fn partial_update(&self, id: i64, changes: &Value) -> Result<T, ApiError> {
        self.client.patch(&Self::item_path(id), changes).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.client.delete(&Self::item_path(id)).await
    }

    /// Validate, then create (no id) or update (with id)
    ///
    /// Validation failures return before any request is sent.
    pub async fn save(&self, record: &T) -> Result<T, ApiError> {
        let errors = record.validate();
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        match record.id() {
            Some(id) => self.update(id, record).await,
            None => self.create(record).await,
        }
    }
}

/// Every collection the client knows about, for CLI and menu dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Usuarios,
    Roles,
    Permisos,
    Marcas,
    Modelos,
    TiposEquipo,
    EstadosEquipo,
    Componentes,
    Lotes,
    Equipos,
    Clientes,
    Planes,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 12] = [
        ResourceKind::Usuarios,
        ResourceKind::Roles,
        ResourceKind::Permisos,
        ResourceKind::Marcas,
        ResourceKind::Modelos,
        ResourceKind::TiposEquipo,
        ResourceKind::EstadosEquipo,
        ResourceKind::Componentes,
        ResourceKind::Lotes,
        ResourceKind::Equipos,
        ResourceKind::Clientes,
        ResourceKind::Planes,
    ];

    pub fn path(self) -> &'static str {
        match self {
            ResourceKind::Usuarios => Usuario::PATH,
            ResourceKind::Roles => Rol::PATH,
            ResourceKind::Permisos => Permiso::PATH,
            ResourceKind::Marcas => Marca::PATH,
            ResourceKind::Modelos => Modelo::PATH,
            ResourceKind::TiposEquipo => TipoEquipo::PATH,
            ResourceKind::EstadosEquipo => EstadoEquipo::PATH,
            ResourceKind::Componentes => Componente::PATH,
            ResourceKind::Lotes => Lote::PATH,
            ResourceKind::Equipos => EquipoOnu::PATH,
            ResourceKind::Clientes => Cliente::PATH,
            ResourceKind::Planes => Plan::PATH,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Usuarios => Usuario::LABEL,
            ResourceKind::Roles => Rol::LABEL,
            ResourceKind::Permisos => Permiso::LABEL,
            ResourceKind::Marcas => Marca::LABEL,
            ResourceKind::Modelos => Modelo::LABEL,
            ResourceKind::TiposEquipo => TipoEquipo::LABEL,
            ResourceKind::EstadosEquipo => EstadoEquipo::LABEL,
            ResourceKind::Componentes => Componente::LABEL,
            ResourceKind::Lotes => Lote::LABEL,
            ResourceKind::Equipos => EquipoOnu::LABEL,
            ResourceKind::Clientes => Cliente::LABEL,
            ResourceKind::Planes => Plan::LABEL,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Usuarios => "usuarios",
            ResourceKind::Roles => "roles",
            ResourceKind::Permisos => "permisos",
            ResourceKind::Marcas => "marcas",
            ResourceKind::Modelos => "modelos",
            ResourceKind::TiposEquipo => "tipos-equipo",
            ResourceKind::EstadosEquipo => "estados-equipo",
            ResourceKind::Componentes => "componentes",
            ResourceKind::Lotes => "lotes",
            ResourceKind::Equipos => "equipos",
            ResourceKind::Clientes => "clientes",
            ResourceKind::Planes => "planes",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.name() == lower)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|k| k.name()).collect();
                format!("unknown resource '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_path() {
        assert_eq!(CrudResource::<Rol>::item_path(3), "/usuarios/roles/3/");
        assert_eq!(CrudResource::<Cliente>::item_path(12), "/planes/clientes/12/");
    }

    #[test]
    fn test_resource_paths() {
        assert_eq!(ResourceKind::Permisos.path(), "/usuarios/permisos/");
        assert_eq!(ResourceKind::Marcas.path(), "/almacenes/marcas/");
        assert_eq!(ResourceKind::Modelos.path(), "/almacenes/modelos/");
        assert_eq!(ResourceKind::Equipos.path(), "/almacenes/equipos/");
        assert_eq!(ResourceKind::Planes.path(), "/planes/planes/");
        assert_eq!(ResourceKind::Usuarios.path(), "/usuarios/usuarios/");
        assert_eq!(ResourceKind::TiposEquipo.path(), "/almacenes/tipos-equipo/");
        assert_eq!(ResourceKind::EstadosEquipo.path(), "/almacenes/estados-equipo/");
        assert_eq!(ResourceKind::Componentes.path(), "/almacenes/componentes/");
        assert_eq!(ResourceKind::Lotes.path(), "/almacenes/lotes/");
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_record_before_request() {
        // Port 9 (discard) would fail with a network error if a request were sent
        let client = ApiClient::new(
            "http://127.0.0.1:9/api",
            std::time::Duration::from_millis(200),
            std::sync::Arc::new(crate::api::auth::NoAuth),
        )
        .unwrap();
        let roles = CrudResource::<Rol>::new(client);

        let err = roles.save(&Rol::default()).await.unwrap_err();
        let errors = err.field_errors().expect("validation errors");
        assert!(errors.contains("nombre"));
    }

    #[test]
    fn test_resource_kind_parse() {
        assert_eq!("Equipos".parse::<ResourceKind>(), Ok(ResourceKind::Equipos));
        assert_eq!("tipos-equipo".parse::<ResourceKind>(), Ok(ResourceKind::TiposEquipo));
        let err = "facturas".parse::<ResourceKind>().unwrap_err();
        assert!(err.contains("usuarios, roles, permisos"));
    }
}
