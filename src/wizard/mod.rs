//! Resumable training-request wizard.
//!
//! - [`store`] persists fields and the step index in a key-value medium
//! - [`sequencer`] computes the next/previous navigable step
//! - [`validation`] holds per-step and full-form rules
//! - [`controller`] ties them together behind [`FormWizard`]

pub mod controller;
pub mod sequencer;
pub mod store;
pub mod types;
pub mod validation;

pub use controller::{DatasetOptions, FetchTicket, FormWizard, WizardError};
pub use sequencer::{next_step, prev_step};
pub use store::{
    has_meaningful_value, is_meaningful, FileStorage, KeyValueStore, MemoryStorage,
    PersistedFormStore, StorageError,
};
pub use types::*;
pub use validation::{validate_step, validate_submission};
