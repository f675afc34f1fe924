//! API error types and the back-office field-error convention
//!
//! A rejected write (HTTP 400) carries a JSON object mapping field name to a
//! list of messages. Object-level problems arrive under `non_field_errors`
//! (or `detail` / `error` / `message`). The same [`FieldErrors`] shape is
//! produced by client-side validation so both sources merge per field.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Key used for messages that do not belong to a single field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Body keys treated as object-level messages
const OBJECT_LEVEL_KEYS: &[&str] = &[NON_FIELD_ERRORS, "detail", "error", "message"];

/// Per-field validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message for a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Add an object-level message
    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.add(NON_FIELD_ERRORS, message);
    }

    /// Messages for one field (empty if none)
    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map_or(&[], Vec::as_slice)
    }

    /// First message for a field, for single-line inline display
    pub fn first(&self, field: &str) -> Option<&str> {
        self.get(field).first().map(String::as_str)
    }

    pub fn non_field(&self) -> &[String] {
        self.get(NON_FIELD_ERRORS)
    }

    /// Whether any message is attached to an actual field
    pub fn has_field_errors(&self) -> bool {
        self.fields.keys().any(|k| k != NON_FIELD_ERRORS)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Field names with messages, object-level key excluded
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields
            .keys()
            .map(String::as_str)
            .filter(|k| *k != NON_FIELD_ERRORS)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Merge another set of messages, keeping both sources per field
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.fields {
            let entry = self.fields.entry(field).or_default();
            for message in messages {
                if !entry.contains(&message) {
                    entry.push(message);
                }
            }
        }
    }

    /// Drop messages for a field (e.g. when the user edits it again)
    pub fn clear_field(&mut self, field: &str) {
        self.fields.remove(field);
    }

    /// Parse a 400 response body into field errors
    ///
    /// Values may be a list of strings, a single string, or anything else
    /// (rendered as JSON text). Non-object bodies become one object-level
    /// message.
    pub fn from_body(body: &Value) -> Self {
        let mut errors = Self::new();
        match body {
            Value::Object(map) => {
                for (key, value) in map {
                    let target = if OBJECT_LEVEL_KEYS.contains(&key.as_str()) {
                        NON_FIELD_ERRORS
                    } else {
                        key.as_str()
                    };
                    for message in messages_of(value) {
                        errors.add(target, message);
                    }
                }
            }
            Value::Null => {}
            other => {
                for message in messages_of(other) {
                    errors.add_non_field(message);
                }
            }
        }
        errors
    }
}

fn messages_of(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(messages_of).collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

/// Errors that can occur when talking to the back-office API
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Client-side validation or HTTP 400 with per-field messages
    #[error("validation failed: {}", summarize(.0))]
    Validation(FieldErrors),

    /// HTTP 400 with only object-level messages
    #[error("{message}")]
    Rejected { message: String },

    /// 401 Unauthorized - token missing, invalid or expired
    #[error("unauthorized (401)")]
    Unauthorized,

    /// 403 Forbidden - token lacks required permissions
    #[error("forbidden (403): {path}")]
    Forbidden { path: String },

    /// 404 - resource not found in the local store
    #[error("not found: {path}")]
    NotFound {
        path: String,
        /// Value of the body's `status` key, when the server sent one
        status: Option<String>,
    },

    /// Network or timeout error
    #[error("network error: {message}")]
    Network { message: String },

    /// Other non-success HTTP responses
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Response body could not be decoded
    #[error("could not decode response from {path}: {message}")]
    Decode { path: String, message: String },

    /// Something required to make the call is missing
    #[error("not configured: {what}")]
    NotConfigured { what: String },
}

fn summarize(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        ApiError::Network {
            message: message.into(),
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        ApiError::Http {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        ApiError::NotFound {
            path: path.into(),
            status: None,
        }
    }

    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn not_configured(what: impl Into<String>) -> Self {
        ApiError::NotConfigured { what: what.into() }
    }

    /// Build the error for a non-success response
    pub fn from_response(status: u16, path: &str, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        match status {
            400 => {
                let errors = match &parsed {
                    Some(value) => FieldErrors::from_body(value),
                    None if body.trim().is_empty() => FieldErrors::new(),
                    None => {
                        let mut errors = FieldErrors::new();
                        errors.add_non_field(body.trim());
                        errors
                    }
                };
                if errors.has_field_errors() {
                    ApiError::Validation(errors)
                } else if errors.non_field().is_empty() {
                    ApiError::Rejected {
                        message: "El servidor rechazó la solicitud".to_string(),
                    }
                } else {
                    ApiError::Rejected {
                        message: errors.non_field().join("; "),
                    }
                }
            }
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden {
                path: path.to_string(),
            },
            404 => ApiError::NotFound {
                path: path.to_string(),
                status: parsed
                    .as_ref()
                    .and_then(|v| v.get("status"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            _ => {
                let message = parsed
                    .as_ref()
                    .and_then(|v| {
                        OBJECT_LEVEL_KEYS[1..]
                            .iter()
                            .find_map(|k| v.get(*k).and_then(Value::as_str))
                    })
                    .map(str::to_string)
                    .unwrap_or_else(|| body.trim().to_string());
                ApiError::Http { status, message }
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::Forbidden { .. })
    }

    /// Per-field messages, if this error carries any
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ApiError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Single message suitable for a banner
    pub fn banner_message(&self) -> String {
        match self {
            ApiError::Validation(errors) => {
                if let Some(first) = errors.non_field().first() {
                    first.clone()
                } else {
                    "Corrija los campos marcados".to_string()
                }
            }
            ApiError::Rejected { message } => message.clone(),
            ApiError::Unauthorized => "La sesión expiró, vuelva a iniciar sesión".to_string(),
            ApiError::Forbidden { .. } => "No tiene permisos para esta acción".to_string(),
            ApiError::NotFound { .. } => "No se encontró el registro solicitado".to_string(),
            ApiError::Network { .. } => "No se pudo conectar con el servidor".to_string(),
            ApiError::Http { status, .. } => format!("Error del servidor ({status})"),
            ApiError::Decode { .. } => "Respuesta inesperada del servidor".to_string(),
            ApiError::NotConfigured { what } => format!("Falta configuración: {what}"),
        }
    }
}
