//! Customer intake wizard
//!
//! Collects personal data, location with coverage, and a plan across four
//! steps, then sends one create or update request. Without coverage the plan
//! step is skipped and the customer starts as pending coverage.

mod draft;
mod gateway;
mod types;
mod wizard;

pub use draft::{round_coordinate, IntakeDraft, COORD_DECIMALS};
pub use gateway::{ClienteGateway, HttpClienteGateway, MockClienteGateway, SavedPayload};
pub use types::{
    IntakeError, IntakeResult, IntakeStep, LocationData, PersonalData, LOCATION_FIELDS,
    PERSONAL_FIELDS,
};
pub use wizard::{IntakeWizard, SaveCallback, Submission};

#[cfg(test)]
mod tests;
