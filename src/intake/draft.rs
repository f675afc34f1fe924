//! Composite draft, its validation and the submit payload

use serde_json::{Map, Value};

use super::types::{LocationData, PersonalData};
use crate::api::error::FieldErrors;
use crate::api::resources::{ClienteEstado, Coverage, TipoCliente, Vivienda};
use crate::validation::{is_valid_email, is_valid_phone, require};

/// Decimal places kept for coordinates
pub const COORD_DECIMALS: i32 = 6;

/// Round a coordinate to [`COORD_DECIMALS`] places
pub fn round_coordinate(value: f64) -> f64 {
    let factor = 10f64.powi(COORD_DECIMALS);
    (value * factor).round() / factor
}

/// Parse a typed coordinate; blank input is `Ok(None)`
pub(crate) fn parse_coordinate(raw: &str) -> Result<Option<f64>, ()> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or(())
}

/// Trimmed text, or `Null` when empty
fn text(value: &str) -> Value {
    match value.trim() {
        "" => Value::Null,
        v => Value::String(v.to_string()),
    }
}

/// Everything the wizard has collected so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntakeDraft {
    pub personal: PersonalData,
    pub location: LocationData,
    pub plan_id: Option<i64>,
}

impl IntakeDraft {
    pub fn coverage(&self) -> Option<Coverage> {
        self.location.cobertura
    }

    pub fn has_coverage(&self) -> bool {
        self.coverage() == Some(Coverage::Covered)
    }

    /// Plan id that will be sent; always `None` without coverage
    pub fn effective_plan_id(&self) -> Option<i64> {
        if self.has_coverage() {
            self.plan_id
        } else {
            None
        }
    }

    /// Text field by wire name, for form widgets
    pub fn text_field(&self, key: &str) -> Option<&str> {
        let p = &self.personal;
        let l = &self.location;
        let value = match key {
            "nombre" => &p.nombre,
            "apellido" => &p.apellido,
            "ci" => &p.ci,
            "email" => &p.email,
            "telefono" => &p.telefono,
            "nit" => &p.nit,
            "razon_social" => &p.razon_social,
            "observaciones" => &p.observaciones,
            "piso" => &l.piso,
            "calle" => &l.calle,
            "zona" => &l.zona,
            "direccion_completa" => &l.direccion_completa,
            "numero_puerta" => &l.numero_puerta,
            "referencias" => &l.referencias,
            "latitud" => &l.latitud,
            "longitud" => &l.longitud,
            _ => return None,
        };
        Some(value.as_str())
    }

    pub fn text_field_mut(&mut self, key: &str) -> Option<&mut String> {
        let p = &mut self.personal;
        let l = &mut self.location;
        Some(match key {
            "nombre" => &mut p.nombre,
            "apellido" => &mut p.apellido,
            "ci" => &mut p.ci,
            "email" => &mut p.email,
            "telefono" => &mut p.telefono,
            "nit" => &mut p.nit,
            "razon_social" => &mut p.razon_social,
            "observaciones" => &mut p.observaciones,
            "piso" => &mut l.piso,
            "calle" => &mut l.calle,
            "zona" => &mut l.zona,
            "direccion_completa" => &mut l.direccion_completa,
            "numero_puerta" => &mut l.numero_puerta,
            "referencias" => &mut l.referencias,
            "latitud" => &mut l.latitud,
            "longitud" => &mut l.longitud,
            _ => return None,
        })
    }

    /// Field checks run before submitting
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let p = &self.personal;
        let l = &self.location;

        require(&mut errors, "nombre", &p.nombre, "El nombre es requerido");
        require(&mut errors, "apellido", &p.apellido, "El apellido es requerido");
        if require(&mut errors, "telefono", &p.telefono, "El teléfono es requerido")
            && !is_valid_phone(&p.telefono)
        {
            errors.add(
                "telefono",
                "Formato inválido. Use 9 a 15 dígitos, opcionalmente con '+' al inicio",
            );
        }
        if !p.email.trim().is_empty() && !is_valid_email(&p.email) {
            errors.add("email", "Ingrese un correo electrónico válido");
        }
        match p.tipo_cliente {
            TipoCliente::Comun => {
                require(&mut errors, "ci", &p.ci, "El CI es requerido para clientes comunes");
            }
            TipoCliente::Empresa => {
                require(&mut errors, "nit", &p.nit, "El NIT es requerido para empresas");
                require(
                    &mut errors,
                    "razon_social",
                    &p.razon_social,
                    "La razón social es requerida para empresas",
                );
            }
        }

        require(&mut errors, "calle", &l.calle, "La calle es requerida");
        require(&mut errors, "zona", &l.zona, "La zona es requerida");
        require(
            &mut errors,
            "direccion_completa",
            &l.direccion_completa,
            "La dirección completa es requerida",
        );
        require(
            &mut errors,
            "numero_puerta",
            &l.numero_puerta,
            "El número de puerta es requerido",
        );
        if l.vivienda == Vivienda::Departamento {
            require(&mut errors, "piso", &l.piso, "El piso es requerido para departamentos");
        }
        for (field, raw, limit) in [("latitud", &l.latitud, 90.0), ("longitud", &l.longitud, 180.0)] {
            match parse_coordinate(raw) {
                Ok(Some(v)) if v.abs() > limit => {
                    errors.add(field, format!("Debe estar entre -{limit} y {limit}"));
                }
                Ok(_) => {}
                Err(()) => errors.add(field, "Debe ser un número"),
            }
        }

        match self.coverage() {
            None => errors.add("cobertura", "Seleccione la cobertura"),
            Some(Coverage::Covered) if self.plan_id.is_none() => {
                errors.add("plan_id", "Seleccione un plan");
            }
            Some(_) => {}
        }
        errors
    }

    /// Request body for create/update
    ///
    /// Text is trimmed and blank text becomes null; null fields are then
    /// dropped, except `plan_id` which is always sent. Blank coordinates are
    /// omitted and present ones are rounded. `estado` is the status to send.
    pub fn build_payload(&self, estado: ClienteEstado) -> Map<String, Value> {
        let p = &self.personal;
        let l = &self.location;
        let mut body = Map::new();

        body.insert("nombre".into(), text(&p.nombre));
        body.insert("apellido".into(), text(&p.apellido));
        body.insert("ci".into(), text(&p.ci));
        body.insert("email".into(), text(&p.email));
        body.insert("telefono".into(), text(&p.telefono));
        body.insert("tipo_cliente".into(), p.tipo_cliente.as_str().into());
        let (nit, razon_social) = match p.tipo_cliente {
            TipoCliente::Comun => (Value::Null, Value::Null),
            TipoCliente::Empresa => (text(&p.nit), text(&p.razon_social)),
        };
        body.insert("nit".into(), nit);
        body.insert("razon_social".into(), razon_social);
        body.insert("observaciones".into(), text(&p.observaciones));

        body.insert("vivienda".into(), l.vivienda.as_str().into());
        let piso = match l.vivienda {
            Vivienda::Casa => Value::Null,
            Vivienda::Departamento => text(&l.piso),
        };
        body.insert("piso".into(), piso);
        body.insert("calle".into(), text(&l.calle));
        body.insert("zona".into(), text(&l.zona));
        body.insert("direccion_completa".into(), text(&l.direccion_completa));
        body.insert("numero_puerta".into(), text(&l.numero_puerta));
        body.insert("referencias".into(), text(&l.referencias));
        for (field, raw) in [("latitud", &l.latitud), ("longitud", &l.longitud)] {
            if let Ok(Some(v)) = parse_coordinate(raw) {
                body.insert(field.into(), round_coordinate(v).into());
            }
        }

        if let Some(coverage) = self.coverage() {
            body.insert("cobertura".into(), coverage.as_str().into());
        }
        body.insert("estado".into(), estado.as_str().into());

        body.retain(|_, v| !v.is_null());
        body.insert(
            "plan_id".into(),
            self.effective_plan_id().map_or(Value::Null, Value::from),
        );
        body
    }
}
