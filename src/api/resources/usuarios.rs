use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{CrudResource, Resource};
use crate::api::error::{ApiError, FieldErrors};
use crate::api::lenient;
use crate::validation;

fn default_true() -> bool {
    true
}

/// User role
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rol {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default = "default_true")]
    pub activo: bool,
    /// Read-only count maintained by the server
    #[serde(default, skip_serializing)]
    pub cantidad_usuarios: u32,
    #[serde(default)]
    pub permisos_ids: Vec<i64>,
}

impl Resource for Rol {
    const PATH: &'static str = "/usuarios/roles/";
    const LABEL: &'static str = "Roles";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> FieldErrors {
        validation::validate_rol(self)
    }

    fn display_line(&self) -> String {
        format!(
            "{} [{}] {} usuario(s)",
            self.nombre,
            if self.activo { "activo" } else { "inactivo" },
            self.cantidad_usuarios
        )
    }
}

/// Permission on a resource/action pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Permiso {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub recurso: String,
    pub accion: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default, skip_serializing)]
    pub esta_en_uso: bool,
}

impl Resource for Permiso {
    const PATH: &'static str = "/usuarios/permisos/";
    const LABEL: &'static str = "Permisos";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> FieldErrors {
        validation::validate_permiso(self)
    }

    fn display_line(&self) -> String {
        match &self.descripcion {
            Some(d) if !d.is_empty() => format!("{}:{} - {}", self.recurso, self.accion, d),
            _ => format!("{}:{}", self.recurso, self.accion),
        }
    }
}

/// Back-office user account
///
/// Accounts come from the legacy staff table (migrated) or are created here
/// (manual). Only the name parts and the role are writable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usuario {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Login code, assigned by the server
    #[serde(default, skip_serializing, deserialize_with = "lenient::opt_code")]
    pub codigocotel: Option<String>,
    pub nombres: String,
    #[serde(default)]
    pub apellidopaterno: String,
    #[serde(default)]
    pub apellidomaterno: String,
    #[serde(default)]
    pub rol: Option<i64>,
    #[serde(default, skip_serializing)]
    pub rol_nombre: Option<String>,
    #[serde(default = "default_true", skip_serializing)]
    pub is_active: bool,
    #[serde(default, skip_serializing)]
    pub password_changed: bool,
    #[serde(default, skip_serializing)]
    pub es_usuario_migrado: bool,
    #[serde(default, skip_serializing)]
    pub fecha_creacion: Option<String>,
}

impl Usuario {
    pub fn nombre_completo(&self) -> String {
        [&self.nombres, &self.apellidopaterno, &self.apellidomaterno]
            .into_iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `migrado` or `manual`
    pub fn tipo(&self) -> &'static str {
        if self.es_usuario_migrado {
            "migrado"
        } else {
            "manual"
        }
    }
}

impl Resource for Usuario {
    const PATH: &'static str = "/usuarios/usuarios/";
    const LABEL: &'static str = "Usuarios";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> FieldErrors {
        validation::validate_usuario(self)
    }

    fn display_line(&self) -> String {
        format!(
            "{} {} [{}] {}{}",
            self.codigocotel.as_deref().unwrap_or("-"),
            self.nombre_completo(),
            self.rol_nombre.as_deref().unwrap_or("sin rol"),
            if self.is_active { "activo" } else { "inactivo" },
            if self.password_changed { "" } else { " (contraseña inicial)" }
        )
    }
}

impl CrudResource<Usuario> {
    fn action_path(id: i64, action: &str) -> String {
        format!("{}{}/", Self::item_path(id), action)
    }

    /// Re-enable a deactivated account
    pub async fn activar(&self, id: i64) -> Result<(), ApiError> {
        self.client
            .post_action(&Self::action_path(id, "activar"), &json!({}))
            .await?;
        info!(usuario = id, "User activated");
        Ok(())
    }

    /// Reset the password to the server default; returns the server's message if any
    pub async fn resetear_password(&self, id: i64) -> Result<Option<String>, ApiError> {
        let reply = self
            .client
            .post_action(&Self::action_path(id, "resetear_password"), &json!({}))
            .await?;
        info!(usuario = id, "User password reset");
        Ok(reply
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    pub async fn cambiar_rol(&self, id: i64, rol_id: i64) -> Result<(), ApiError> {
        self.client
            .post_action(&Self::action_path(id, "cambiar_rol"), &json!({ "rol_id": rol_id }))
            .await?;
        info!(usuario = id, rol = rol_id, "User role changed");
        Ok(())
    }
}
