//! Summary counters shown above list screens

use crate::api::resources::{EquipoOnu, Lote, Rol};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RolStats {
    pub total: usize,
    pub activos: usize,
    pub con_usuarios: usize,
    pub total_usuarios: u64,
}

impl RolStats {
    pub fn from_roles(roles: &[Rol]) -> Self {
        Self {
            total: roles.len(),
            activos: roles.iter().filter(|r| r.activo).count(),
            con_usuarios: roles.iter().filter(|r| r.cantidad_usuarios > 0).count(),
            total_usuarios: roles.iter().map(|r| u64::from(r.cantidad_usuarios)).sum(),
        }
    }

    pub fn inactivos(&self) -> usize {
        self.total - self.activos
    }

    pub fn sin_usuarios(&self) -> usize {
        self.total - self.con_usuarios
    }
}

/// Device counts by state; states are matched by name substring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EquipoStats {
    pub total: usize,
    pub disponibles: usize,
    pub asignados: usize,
    pub mantenimiento: usize,
    pub danados: usize,
    /// Share of available devices, rounded to a whole percent
    pub pct_disponible: u32,
}

impl EquipoStats {
    pub fn from_equipos(equipos: &[EquipoOnu]) -> Self {
        let count_state = |needle: &str| {
            equipos
                .iter()
                .filter(|e| e.estado_key().contains(needle))
                .count()
        };
        let total = equipos.len();
        let disponibles = count_state("disponible");
        let pct_disponible = if total == 0 {
            0
        } else {
            ((disponibles as f64 / total as f64) * 100.0).round() as u32
        };

        Self {
            total,
            disponibles,
            asignados: equipos.iter().filter(|e| e.esta_asignado).count(),
            mantenimiento: count_state("mantenimiento"),
            danados: count_state("dañado"),
            pct_disponible,
        }
    }
}

/// Lot registration progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoteStats {
    pub total: usize,
    /// Lots with units still to register
    pub pendientes: usize,
    pub completos: usize,
    pub equipos_esperados: u64,
    pub equipos_registrados: u64,
}

impl LoteStats {
    pub fn from_lotes(lotes: &[Lote]) -> Self {
        Self {
            total: lotes.len(),
            pendientes: lotes.iter().filter(|l| l.equipos_pendientes > 0).count(),
            completos: lotes.iter().filter(|l| l.is_complete()).count(),
            equipos_esperados: lotes.iter().map(|l| l.cantidad_total).sum(),
            equipos_registrados: lotes.iter().map(|l| l.equipos_registrados).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equipo(estado: &str, asignado: bool) -> EquipoOnu {
        EquipoOnu {
            estado_nombre: Some(estado.to_string()),
            esta_asignado: asignado,
            ..EquipoOnu::default()
        }
    }

    #[test]
    fn test_rol_stats() {
        let roles = vec![
            Rol {
                activo: true,
                cantidad_usuarios: 3,
                ..Rol::default()
            },
            Rol {
                activo: false,
                cantidad_usuarios: 0,
                ..Rol::default()
            },
            Rol {
                activo: true,
                cantidad_usuarios: 2,
                ..Rol::default()
            },
        ];
        let stats = RolStats::from_roles(&roles);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.activos, 2);
        assert_eq!(stats.inactivos(), 1);
        assert_eq!(stats.con_usuarios, 2);
        assert_eq!(stats.sin_usuarios(), 1);
        assert_eq!(stats.total_usuarios, 5);
    }

    #[test]
    fn test_equipo_stats_and_rounding() {
        let equipos = vec![
            equipo("Disponible", false),
            equipo("No disponible", true),
            equipo("En mantenimiento", false),
            equipo("Dañado", false),
            equipo("Asignado", true),
            equipo("Disponible", false),
        ];
        let stats = EquipoStats::from_equipos(&equipos);
        assert_eq!(stats.total, 6);
        // "No disponible" also contains "disponible"
        assert_eq!(stats.disponibles, 3);
        assert_eq!(stats.asignados, 2);
        assert_eq!(stats.mantenimiento, 1);
        assert_eq!(stats.danados, 1);
        assert_eq!(stats.pct_disponible, 50);
    }

    #[test]
    fn test_equipo_stats_empty() {
        assert_eq!(EquipoStats::from_equipos(&[]), EquipoStats::default());
    }

    #[test]
    fn test_lote_stats_skip_empty_lots() {
        let lote = |total, registrados, pendientes| Lote {
            cantidad_total: total,
            equipos_registrados: registrados,
            equipos_pendientes: pendientes,
            ..Lote::default()
        };
        let stats = LoteStats::from_lotes(&[lote(10, 10, 0), lote(20, 5, 15), lote(0, 0, 0)]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pendientes, 1);
        // A lot with no units is neither pending nor complete
        assert_eq!(stats.completos, 1);
        assert_eq!(stats.equipos_esperados, 30);
        assert_eq!(stats.equipos_registrados, 15);
    }
}
