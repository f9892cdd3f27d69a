//! Credit risk scoring library.
//!
//! Turns raw loan applications into default probabilities and policy
//! decisions using immutable model artifacts loaded at startup.

pub mod config;
pub mod error;
pub mod scoring;
pub mod telemetry;
