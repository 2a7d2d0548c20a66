//! feddash - training-request wizard and dataset tooling for a federated
//! learning platform dashboard.
//!
//! The binary drives the wizard from the command line; the library exposes the
//! wizard, the backend collaborators and the dataset/task matching helpers.

pub mod api;
pub mod config;
pub mod logging;
pub mod matching;
pub mod wizard;
