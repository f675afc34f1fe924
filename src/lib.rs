//! Back-office client for telecom customer operations
//!
//! Covers legacy customer migration, customer intake, and the paginated
//! catalogs of roles, permissions, equipment and plans. The binary adds a
//! terminal UI and a small CLI on top of these modules.

pub mod api;
pub mod app;
pub mod busy;
pub mod config;
pub mod consulta;
pub mod intake;
pub mod listing;
pub mod logging;
pub mod ui;
pub mod validation;
