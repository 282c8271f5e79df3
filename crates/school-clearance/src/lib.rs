//! Clearance approval workflow and disciplinary sanction escalation.
//!
//! The crate owns the domain rules only. Persistence, notification transport and
//! identity are reached through the collaborator traits in
//! [`workflows::clearance::repository`] and [`workflows::discipline::repository`].

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
