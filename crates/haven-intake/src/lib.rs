//! Survivor-centered intake for domestic-violence and homeless-services programs.
//!
//! `workflows::intake` drives the ten-stage intake, `workflows::psde` keeps the
//! versioned, auditable record of program-specific data elements, and the
//! ambient modules carry configuration, errors, and tracing setup.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
