//! Customer migration wizard
//!
//! Given a document number, the orchestrator resolves the customer, then its
//! services, then its invoices, and finally reads the local summary. Each
//! step depends on the previous one, so the calls are strictly sequential.

mod error;
mod orchestrator;
mod steps;

pub use error::ConsultaError;
pub use orchestrator::{
    fetch_resumen, MigrationOrchestrator, MigrationSnapshot, RunOutcome, RunState,
    SnapshotObserver, StepStatus,
};
pub use steps::{MigrationResults, StepKind};
