//! Local filtering and pagination for list screens
//!
//! Lists are fetched whole and filtered in memory: search text is matched
//! case-insensitively, equality and boolean filters are conjunctive, and an
//! unset filter never excludes anything.

mod filter;
mod paginated;
mod resources;
mod stats;
mod view;

pub use filter::{FilterError, Filterable, ListFilter};
pub use paginated::PaginatedList;
pub use stats::{EquipoStats, LoteStats, RolStats};
pub use view::ListView;
