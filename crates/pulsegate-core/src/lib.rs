//! `pulsegate-core` — shared config, error, identifiers and capability
//! traits used across every Pulsegate crate.
//!
//! # Overview
//!
//! This crate carries no business logic of its own; it is the "ambient
//! stack" every other crate in the workspace depends on, the same role
//! `skynet-core` plays for the `skynet-*` family.

pub mod capability;
pub mod config;
pub mod error;
pub mod ids;

pub use config::PulsegateConfig;
pub use error::{CoreError, Result};
pub use ids::{AgentId, RoutineId, SessionId};
