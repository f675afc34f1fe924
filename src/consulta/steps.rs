use serde::Serialize;

use crate::api::consulta::{ClienteConsulta, FacturasConsulta, ResumenCliente, ServiciosConsulta};

/// The four migration steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Cliente,
    Servicios,
    Facturas,
    Resumen,
}

impl StepKind {
    pub const ALL: [StepKind; 4] = [
        StepKind::Cliente,
        StepKind::Servicios,
        StepKind::Facturas,
        StepKind::Resumen,
    ];

    /// 0-based position in the run
    pub fn index(self) -> usize {
        match self {
            StepKind::Cliente => 0,
            StepKind::Servicios => 1,
            StepKind::Facturas => 2,
            StepKind::Resumen => 3,
        }
    }

    /// Accumulator key
    pub fn key(self) -> &'static str {
        match self {
            StepKind::Cliente => "cliente",
            StepKind::Servicios => "servicios",
            StepKind::Facturas => "facturas",
            StepKind::Resumen => "resumen",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            StepKind::Cliente => "Buscando cliente",
            StepKind::Servicios => "Obteniendo servicios",
            StepKind::Facturas => "Procesando facturas",
            StepKind::Resumen => "Generando resumen",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            StepKind::Cliente => "Consultando datos del cliente...",
            StepKind::Servicios => "Migrando servicios del cliente...",
            StepKind::Facturas => "Migrando facturas de todos los contratos...",
            StepKind::Resumen => "Preparando resumen final...",
        }
    }

    pub fn next(self) -> Option<StepKind> {
        StepKind::ALL.get(self.index() + 1).copied()
    }

    /// Progress after this step completes: (completed / 4) * 100
    pub fn progress_after(self) -> u8 {
        ((self.index() + 1) * 100 / StepKind::ALL.len()) as u8
    }
}

/// Per-step results of one run, filled in step order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cliente: Option<ClienteConsulta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servicios: Option<ServiciosConsulta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facturas: Option<FacturasConsulta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resumen: Option<ResumenCliente>,
}

impl MigrationResults {
    fn has(&self, step: StepKind) -> bool {
        match step {
            StepKind::Cliente => self.cliente.is_some(),
            StepKind::Servicios => self.servicios.is_some(),
            StepKind::Facturas => self.facturas.is_some(),
            StepKind::Resumen => self.resumen.is_some(),
        }
    }

    /// Keys present, in step order
    pub fn keys(&self) -> Vec<&'static str> {
        StepKind::ALL
            .into_iter()
            .filter(|s| self.has(*s))
            .map(StepKind::key)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All four steps recorded
    pub fn is_complete(&self) -> bool {
        self.len() == StepKind::ALL.len()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Migrated counts shown next to the summary: (customer migrated, services, invoices)
    pub fn migrated_counts(&self) -> (u64, u64, u64) {
        use crate::api::consulta::MigrationStatus;

        let cliente = self
            .cliente
            .as_ref()
            .map_or(0, |c| u64::from(c.status == MigrationStatus::Migrado));
        let servicios = self.servicios.as_ref().map_or(0, |s| s.registros);
        let facturas = self.facturas.as_ref().map_or(0, |f| f.total_facturas);
        (cliente, servicios, facturas)
    }
}
