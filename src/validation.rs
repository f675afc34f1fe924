//! Client-side form validation
//!
//! Rules mirror the server's so most mistakes are caught before a request.
//! Results use [`FieldErrors`], the same shape the server returns for 400s.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::api::error::FieldErrors;
use crate::api::resources::{CambioEstado, EquipoOnu, Lote, Marca, Modelo, Permiso, Rol, Usuario};

static RECURSO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_-]+$").expect("valid regex"));

static MAC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([0-9A-F]{2}[:-]){5}[0-9A-F]{2}$").expect("valid regex"));

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?1?\d{9,15}$").expect("valid regex"));

pub const CODIGO_MODELO_RANGE: std::ops::RangeInclusive<i64> = 1000..=9999;

pub const LOTE_CANTIDAD_RANGE: std::ops::RangeInclusive<u32> = 1..=10_000;

fn char_len(value: &str) -> usize {
    value.trim().chars().count()
}

/// Record `message` when the trimmed value is empty; returns whether present
pub fn require(errors: &mut FieldErrors, field: &str, value: &str, message: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, message);
        false
    } else {
        true
    }
}

pub fn require_some<T>(errors: &mut FieldErrors, field: &str, value: Option<T>, message: &str) {
    if value.is_none() {
        errors.add(field, message);
    }
}

pub fn min_chars(errors: &mut FieldErrors, field: &str, value: &str, min: usize, message: &str) {
    if char_len(value) < min {
        errors.add(field, message);
    }
}

pub fn max_chars(errors: &mut FieldErrors, field: &str, value: &str, max: usize, message: &str) {
    if char_len(value) > max {
        errors.add(field, message);
    }
}

/// Phone number: optional `+`, 9 to 15 digits, spaces ignored
pub fn is_valid_phone(value: &str) -> bool {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    PHONE_RE.is_match(&compact)
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}

/// MAC address as six hex pairs separated by `:` or `-`
pub fn is_valid_mac(value: &str) -> bool {
    MAC_RE.is_match(value.trim())
}

pub fn is_valid_recurso(value: &str) -> bool {
    RECURSO_RE.is_match(value.trim())
}

pub fn validate_rol(rol: &Rol) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if require(&mut errors, "nombre", &rol.nombre, "El nombre es requerido") {
        min_chars(
            &mut errors,
            "nombre",
            &rol.nombre,
            2,
            "El nombre debe tener al menos 2 caracteres",
        );
    }
    errors
}

pub fn validate_permiso(permiso: &Permiso) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if require(&mut errors, "recurso", &permiso.recurso, "El recurso es requerido")
        && !is_valid_recurso(&permiso.recurso)
    {
        errors.add(
            "recurso",
            "Solo letras minúsculas, números, guiones y guiones bajos",
        );
    }
    require(&mut errors, "accion", &permiso.accion, "La acción es requerida");
    errors
}

pub fn validate_marca(marca: &Marca) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if require(&mut errors, "nombre", &marca.nombre, "El nombre es obligatorio") {
        min_chars(&mut errors, "nombre", &marca.nombre, 2, "Debe tener al menos 2 caracteres");
        max_chars(&mut errors, "nombre", &marca.nombre, 100, "No puede exceder 100 caracteres");
    }
    if let Some(descripcion) = &marca.descripcion {
        max_chars(&mut errors, "descripcion", descripcion, 500, "No puede exceder 500 caracteres");
    }
    errors
}

pub fn validate_modelo(modelo: &Modelo) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require_some(&mut errors, "marca", modelo.marca, "Debe seleccionar una marca");
    require_some(
        &mut errors,
        "tipo_equipo",
        modelo.tipo_equipo,
        "Debe seleccionar un tipo de equipo",
    );
    if require(
        &mut errors,
        "nombre",
        &modelo.nombre,
        "El nombre del modelo es obligatorio",
    ) {
        min_chars(&mut errors, "nombre", &modelo.nombre, 2, "Debe tener al menos 2 caracteres");
        max_chars(&mut errors, "nombre", &modelo.nombre, 100, "No puede exceder 100 caracteres");
    }
    match modelo.codigo_modelo {
        None => errors.add("codigo_modelo", "El código interno es obligatorio"),
        Some(c) if c < *CODIGO_MODELO_RANGE.start() => {
            errors.add("codigo_modelo", "Debe ser mayor a 1000");
        }
        Some(c) if c > *CODIGO_MODELO_RANGE.end() => {
            errors.add("codigo_modelo", "Debe ser menor a 10000");
        }
        Some(_) => {}
    }
    if let Some(descripcion) = &modelo.descripcion {
        max_chars(&mut errors, "descripcion", descripcion, 500, "No puede exceder 500 caracteres");
    }
    errors
}

pub fn validate_equipo(equipo: &EquipoOnu) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if require(
        &mut errors,
        "codigo_interno",
        &equipo.codigo_interno,
        "El código interno es requerido",
    ) {
        min_chars(
            &mut errors,
            "codigo_interno",
            &equipo.codigo_interno,
            3,
            "El código debe tener al menos 3 caracteres",
        );
    }
    require_some(&mut errors, "modelo", equipo.modelo, "El modelo es requerido");
    require_some(
        &mut errors,
        "tipo_equipo",
        equipo.tipo_equipo,
        "El tipo de equipo es requerido",
    );
    require_some(&mut errors, "lote", equipo.lote, "El lote es requerido");

    if require(
        &mut errors,
        "mac_address",
        &equipo.mac_address,
        "La MAC Address es requerida",
    ) && !is_valid_mac(&equipo.mac_address)
    {
        errors.add("mac_address", "Formato de MAC inválido (XX:XX:XX:XX:XX:XX)");
    }

    if require(
        &mut errors,
        "gpon_serial",
        &equipo.gpon_serial,
        "El GPON Serial es requerido",
    ) {
        min_chars(
            &mut errors,
            "gpon_serial",
            &equipo.gpon_serial,
            8,
            "El GPON Serial debe tener al menos 8 caracteres",
        );
        max_chars(
            &mut errors,
            "gpon_serial",
            &equipo.gpon_serial,
            100,
            "El GPON Serial no puede exceder 100 caracteres",
        );
    }

    if require(
        &mut errors,
        "serial_manufacturer",
        &equipo.serial_manufacturer,
        "El serial del fabricante es requerido",
    ) {
        min_chars(
            &mut errors,
            "serial_manufacturer",
            &equipo.serial_manufacturer,
            4,
            "El serial debe tener al menos 4 caracteres",
        );
        max_chars(
            &mut errors,
            "serial_manufacturer",
            &equipo.serial_manufacturer,
            100,
            "El serial no puede exceder 100 caracteres",
        );
    }

    if let Some(observaciones) = &equipo.observaciones {
        max_chars(
            &mut errors,
            "observaciones",
            observaciones,
            1000,
            "Las observaciones no pueden exceder 1000 caracteres",
        );
    }
    errors
}

/// Name-and-description catalogs: device types, device states, components
pub fn validate_catalogo(nombre: &str, descripcion: Option<&str>, max_nombre: usize) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if require(&mut errors, "nombre", nombre, "El nombre es obligatorio") {
        min_chars(&mut errors, "nombre", nombre, 2, "Debe tener al menos 2 caracteres");
        max_chars(
            &mut errors,
            "nombre",
            nombre,
            max_nombre,
            &format!("No puede exceder {max_nombre} caracteres"),
        );
    }
    if let Some(descripcion) = descripcion {
        max_chars(&mut errors, "descripcion", descripcion, 500, "No puede exceder 500 caracteres");
    }
    errors
}

/// Detail errors are keyed `detalles.<index>.<field>`
pub fn validate_lote(lote: &Lote) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if require(
        &mut errors,
        "numero_lote",
        &lote.numero_lote,
        "El número de lote es obligatorio",
    ) {
        min_chars(
            &mut errors,
            "numero_lote",
            &lote.numero_lote,
            3,
            "Debe tener al menos 3 caracteres",
        );
    }
    if require(&mut errors, "proveedor", &lote.proveedor, "El proveedor es obligatorio") {
        min_chars(&mut errors, "proveedor", &lote.proveedor, 2, "Debe tener al menos 2 caracteres");
    }
    require_some(
        &mut errors,
        "tipo_servicio",
        lote.tipo_servicio,
        "Debe seleccionar un tipo de servicio",
    );
    if lote.detalles.is_empty() {
        errors.add("detalles", "Debe agregar al menos un modelo");
    }
    for (i, detalle) in lote.detalles.iter().enumerate() {
        require_some(
            &mut errors,
            &format!("detalles.{i}.modelo"),
            detalle.modelo,
            "Debe seleccionar un modelo",
        );
        if !LOTE_CANTIDAD_RANGE.contains(&detalle.cantidad) {
            errors.add(
                format!("detalles.{i}.cantidad"),
                "La cantidad debe estar entre 1 y 10000",
            );
        }
    }
    errors
}

pub fn validate_cambio_estado(cambio: &CambioEstado) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require_some(&mut errors, "estado_id", cambio.estado_id, "Debe seleccionar un estado");
    if let Some(observaciones) = &cambio.observaciones {
        max_chars(
            &mut errors,
            "observaciones",
            observaciones,
            500,
            "Las observaciones no pueden exceder 500 caracteres",
        );
    }
    errors
}

pub fn validate_usuario(usuario: &Usuario) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let partes = [
        ("nombres", &usuario.nombres, "Los nombres son obligatorios"),
        (
            "apellidopaterno",
            &usuario.apellidopaterno,
            "El apellido paterno es obligatorio",
        ),
        (
            "apellidomaterno",
            &usuario.apellidomaterno,
            "El apellido materno es obligatorio",
        ),
    ];
    for (field, value, message) in partes {
        if require(&mut errors, field, value, message) {
            min_chars(&mut errors, field, value, 2, "Debe tener al menos 2 caracteres");
        }
    }
    require_some(&mut errors, "rol", usuario.rol, "El rol es obligatorio");
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_equipo() -> EquipoOnu {
        EquipoOnu {
            codigo_interno: "ONU-001".to_string(),
            modelo: Some(1),
            tipo_equipo: Some(1),
            lote: Some(4),
            mac_address: "aa:bb:cc:dd:ee:ff".to_string(),
            gpon_serial: "HWTC1234ABCD".to_string(),
            serial_manufacturer: "SN-9988".to_string(),
            ..EquipoOnu::default()
        }
    }

    #[test]
    fn test_rol_nombre_rules() {
        let mut rol = Rol::default();
        assert_eq!(validate_rol(&rol).first("nombre"), Some("El nombre es requerido"));
        rol.nombre = "A".to_string();
        assert_eq!(
            validate_rol(&rol).first("nombre"),
            Some("El nombre debe tener al menos 2 caracteres")
        );
        rol.nombre = "Admin".to_string();
        assert!(validate_rol(&rol).is_empty());
    }

    #[test]
    fn test_permiso_recurso_pattern() {
        let mut permiso = Permiso {
            recurso: "Clientes".to_string(),
            accion: "ver".to_string(),
            ..Permiso::default()
        };
        assert!(validate_permiso(&permiso).contains("recurso"));
        permiso.recurso = "equipos_onu-2".to_string();
        assert!(validate_permiso(&permiso).is_empty());
        permiso.accion = "  ".to_string();
        assert!(validate_permiso(&permiso).contains("accion"));
    }

    #[test]
    fn test_marca_lengths() {
        let marca = Marca {
            nombre: "Huawei".to_string(),
            descripcion: Some("x".repeat(501)),
            ..Marca::default()
        };
        let errors = validate_marca(&marca);
        assert!(!errors.contains("nombre"));
        assert!(errors.contains("descripcion"));
    }

    #[test]
    fn test_modelo_codigo_range() {
        let mut modelo = Modelo {
            nombre: "HG8245H".to_string(),
            marca: Some(1),
            tipo_equipo: Some(2),
            codigo_modelo: Some(999),
            ..Modelo::default()
        };
        assert_eq!(
            validate_modelo(&modelo).first("codigo_modelo"),
            Some("Debe ser mayor a 1000")
        );
        modelo.codigo_modelo = Some(10_000);
        assert_eq!(
            validate_modelo(&modelo).first("codigo_modelo"),
            Some("Debe ser menor a 10000")
        );
        modelo.codigo_modelo = Some(1000);
        assert!(validate_modelo(&modelo).is_empty());
        modelo.marca = None;
        assert!(validate_modelo(&modelo).contains("marca"));
    }

    #[test]
    fn test_equipo_valid_and_mac_formats() {
        assert!(validate_equipo(&valid_equipo()).is_empty());

        let mut equipo = valid_equipo();
        equipo.mac_address = "AA-BB-CC-DD-EE-FF".to_string();
        assert!(validate_equipo(&equipo).is_empty());

        equipo.mac_address = "AABBCCDDEEFF".to_string();
        assert!(validate_equipo(&equipo).contains("mac_address"));
    }

    #[test]
    fn test_equipo_collects_every_field() {
        let errors = validate_equipo(&EquipoOnu::default());
        let names: Vec<&str> = errors.field_names().collect();
        assert_eq!(
            names,
            vec![
                "codigo_interno",
                "gpon_serial",
                "lote",
                "mac_address",
                "modelo",
                "serial_manufacturer",
                "tipo_equipo"
            ]
        );
    }

    #[test]
    fn test_phone_and_email() {
        assert!(is_valid_phone("+591 712 34567"));
        assert!(is_valid_phone("71234567 9"));
        assert!(!is_valid_phone("7123"));
        assert!(!is_valid_phone("+59171234567890123"));
        assert!(is_valid_email("ana@example.com"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana example@x.com"));
    }

    #[test]
    fn test_catalogo_name_limit_depends_on_collection() {
        let long = "x".repeat(60);
        assert_eq!(
            validate_catalogo(&long, None, 50).first("nombre"),
            Some("No puede exceder 50 caracteres")
        );
        assert!(validate_catalogo(&long, None, 100).is_empty());
        assert_eq!(
            validate_catalogo("A", Some(""), 50).first("nombre"),
            Some("Debe tener al menos 2 caracteres")
        );
        let errors = validate_catalogo("Activo", Some("d".repeat(501).as_str()), 50);
        assert_eq!(errors.field_names().collect::<Vec<_>>(), vec!["descripcion"]);
    }

    #[test]
    fn test_lote_rules() {
        use crate::api::resources::LoteDetalle;

        let mut lote = Lote {
            numero_lote: "L1".to_string(),
            proveedor: "Huawei".to_string(),
            tipo_servicio: Some(1),
            ..Lote::default()
        };
        let errors = validate_lote(&lote);
        assert_eq!(errors.first("numero_lote"), Some("Debe tener al menos 3 caracteres"));
        assert_eq!(errors.first("detalles"), Some("Debe agregar al menos un modelo"));

        lote.numero_lote = "L-2025-01".to_string();
        lote.detalles = vec![
            LoteDetalle {
                modelo: Some(2),
                cantidad: 50,
                ..LoteDetalle::default()
            },
            LoteDetalle {
                modelo: None,
                cantidad: 10_001,
                ..LoteDetalle::default()
            },
        ];
        let errors = validate_lote(&lote);
        assert!(!errors.contains("detalles.0.cantidad"));
        assert!(errors.contains("detalles.1.modelo"));
        assert_eq!(
            errors.first("detalles.1.cantidad"),
            Some("La cantidad debe estar entre 1 y 10000")
        );

        lote.detalles.truncate(1);
        assert!(validate_lote(&lote).is_empty());
    }

    #[test]
    fn test_cambio_estado_rules() {
        assert!(validate_cambio_estado(&CambioEstado::default()).contains("estado_id"));
        let cambio = CambioEstado::new(2, Some("o".repeat(501)));
        assert_eq!(
            validate_cambio_estado(&cambio).field_names().collect::<Vec<_>>(),
            vec!["observaciones"]
        );
    }

    #[test]
    fn test_usuario_requires_all_name_parts_and_role() {
        let mut usuario = Usuario {
            nombres: "Ana".to_string(),
            apellidopaterno: "Q".to_string(),
            ..Usuario::default()
        };
        let errors = validate_usuario(&usuario);
        assert_eq!(errors.first("apellidopaterno"), Some("Debe tener al menos 2 caracteres"));
        assert_eq!(
            errors.first("apellidomaterno"),
            Some("El apellido materno es obligatorio")
        );
        assert_eq!(errors.first("rol"), Some("El rol es obligatorio"));

        usuario.apellidopaterno = "Quispe".to_string();
        usuario.apellidomaterno = "Mamani".to_string();
        usuario.rol = Some(2);
        assert!(validate_usuario(&usuario).is_empty());
    }
}
