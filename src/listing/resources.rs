//! Filter declarations for each back-office record type

use super::filter::Filterable;
use crate::api::consulta::ClienteLocal;
use crate::api::resources::{
    Cliente, Componente, EquipoOnu, EstadoEquipo, Lote, Marca, Modelo, Permiso, Plan, Rol,
    TipoEquipo, Usuario,
};

impl Filterable for Rol {
    const FLAG_KEYS: &'static [&'static str] = &["activo", "con_usuarios"];

    fn search_fields(&self) -> Vec<String> {
        vec![self.nombre.clone()]
    }

    fn flag(&self, key: &str) -> Option<bool> {
        match key {
            "activo" => Some(self.activo),
            "con_usuarios" => Some(self.cantidad_usuarios > 0),
            _ => None,
        }
    }
}

impl Filterable for Usuario {
    const EQUALITY_KEYS: &'static [&'static str] = &["tipo", "rol"];
    const FLAG_KEYS: &'static [&'static str] = &["activo"];

    fn search_fields(&self) -> Vec<String> {
        let mut fields = vec![self.nombre_completo()];
        fields.extend(self.codigocotel.clone());
        fields
    }

    fn field_value(&self, key: &str) -> Option<String> {
        match key {
            "tipo" => Some(self.tipo().to_string()),
            "rol" => self.rol.map(|id| id.to_string()),
            _ => None,
        }
    }

    fn flag(&self, key: &str) -> Option<bool> {
        (key == "activo").then_some(self.is_active)
    }
}

impl Filterable for Permiso {
    const EQUALITY_KEYS: &'static [&'static str] = &["recurso", "accion"];

    fn search_fields(&self) -> Vec<String> {
        let mut fields = vec![self.recurso.clone(), self.accion.clone()];
        fields.extend(self.descripcion.clone());
        fields
    }

    fn field_value(&self, key: &str) -> Option<String> {
        match key {
            "recurso" => Some(self.recurso.clone()),
            "accion" => Some(self.accion.clone()),
            _ => None,
        }
    }
}

impl Filterable for Marca {
    const FLAG_KEYS: &'static [&'static str] = &["activo"];

    fn search_fields(&self) -> Vec<String> {
        let mut fields = vec![self.nombre.clone()];
        fields.extend(self.descripcion.clone());
        fields
    }

    fn flag(&self, key: &str) -> Option<bool> {
        (key == "activo").then_some(self.activo)
    }
}

impl Filterable for Modelo {
    const EQUALITY_KEYS: &'static [&'static str] = &["marca"];

    fn search_fields(&self) -> Vec<String> {
        let mut fields = vec![self.nombre.clone()];
        fields.extend(self.codigo_modelo.map(|c| c.to_string()));
        fields.extend(self.marca_nombre.clone());
        fields
    }

    fn field_value(&self, key: &str) -> Option<String> {
        match key {
            "marca" => self.marca.map(|id| id.to_string()),
            _ => None,
        }
    }
}

impl Filterable for TipoEquipo {
    fn search_fields(&self) -> Vec<String> {
        let mut fields = vec![self.nombre.clone()];
        fields.extend(self.descripcion.clone());
        fields
    }
}

impl Filterable for EstadoEquipo {
    const FLAG_KEYS: &'static [&'static str] = &["con_equipos"];

    fn search_fields(&self) -> Vec<String> {
        let mut fields = vec![self.nombre.clone()];
        fields.extend(self.descripcion.clone());
        fields
    }

    fn flag(&self, key: &str) -> Option<bool> {
        (key == "con_equipos").then_some(self.equipos_count > 0)
    }
}

impl Filterable for Componente {
    const FLAG_KEYS: &'static [&'static str] = &["en_uso"];

    fn search_fields(&self) -> Vec<String> {
        let mut fields = vec![self.nombre.clone()];
        fields.extend(self.descripcion.clone());
        fields
    }

    fn flag(&self, key: &str) -> Option<bool> {
        (key == "en_uso").then_some(self.modelos_usando > 0)
    }
}

impl Filterable for Lote {
    const EQUALITY_KEYS: &'static [&'static str] = &["proveedor"];
    const FLAG_KEYS: &'static [&'static str] = &["pendiente"];

    fn search_fields(&self) -> Vec<String> {
        let mut fields = vec![self.numero_lote.clone(), self.proveedor.clone()];
        fields.extend(self.observaciones.clone());
        fields
    }

    fn field_value(&self, key: &str) -> Option<String> {
        (key == "proveedor").then(|| self.proveedor.clone())
    }

    fn flag(&self, key: &str) -> Option<bool> {
        (key == "pendiente").then_some(self.equipos_pendientes > 0)
    }
}

impl Filterable for EquipoOnu {
    const EQUALITY_KEYS: &'static [&'static str] = &["estado", "modelo"];
    const FLAG_KEYS: &'static [&'static str] = &["asignado"];

    fn search_fields(&self) -> Vec<String> {
        vec![
            self.codigo_interno.clone(),
            self.mac_address.clone(),
            self.gpon_serial.clone(),
        ]
    }

    fn field_value(&self, key: &str) -> Option<String> {
        match key {
            "estado" => self.estado_nombre.clone(),
            "modelo" => self.modelo.map(|id| id.to_string()),
            _ => None,
        }
    }

    fn flag(&self, key: &str) -> Option<bool> {
        (key == "asignado").then_some(self.esta_asignado)
    }
}

impl Filterable for Cliente {
    const EQUALITY_KEYS: &'static [&'static str] = &["estado", "cobertura", "tipo_cliente"];

    fn search_fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.nombre.clone(),
            self.apellido.clone(),
            self.telefono.clone(),
        ];
        fields.extend(self.ci.clone());
        fields.extend(self.email.clone());
        fields.extend(self.razon_social.clone());
        fields
    }

    fn field_value(&self, key: &str) -> Option<String> {
        match key {
            "estado" => Some(self.estado.as_str().to_string()),
            "cobertura" => Some(self.cobertura.as_str().to_string()),
            "tipo_cliente" => Some(self.tipo_cliente.as_str().to_string()),
            _ => None,
        }
    }
}

impl Filterable for Plan {
    const FLAG_KEYS: &'static [&'static str] = &["activo"];

    fn search_fields(&self) -> Vec<String> {
        vec![self.descripcion.clone(), self.codigo.clone()]
    }

    fn flag(&self, key: &str) -> Option<bool> {
        (key == "activo").then_some(self.estado)
    }
}

impl Filterable for ClienteLocal {
    fn search_fields(&self) -> Vec<String> {
        [
            &self.nombres,
            &self.ape_paterno,
            &self.ape_materno,
            &self.nombre_pila,
            &self.nro_documento,
            &self.cod_cliente,
        ]
        .into_iter()
        .filter_map(|f| f.clone())
        .collect()
    }
}
