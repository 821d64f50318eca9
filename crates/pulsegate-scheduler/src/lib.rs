//! `pulsegate-scheduler` — the Scheduler, Concurrency Gate, and Pulse
//! Executor (spec §4.1–§4.3). SQLite-persisted routine/legacy-schedule
//! state, `dashmap` for hot in-process indices, following the shape of
//! `skynet-scheduler` (persisted `jobs` table + a polling/timer-driven
//! engine) generalized to arbitrary next-fire computation, blackout
//! windows, and two-level concurrency gating.

pub mod db;
pub mod error;
pub mod executor;
pub mod gate;
pub mod schedule;
pub mod scheduler;
pub mod types;

pub use error::{Result, SchedulerError};
pub use executor::{ContextProvider, MemoryConsolidator, PulseEventPublisher, PulseExecutor, PulseObserver};
pub use gate::{ConcurrencyGate, GateDecision};
pub use scheduler::Scheduler;
pub use types::{
    Blackout, Conflict, ConflictSeverity, LegacySchedule, PulseResult, PulseRoutine, PulseSource,
    RoutineOverrides, RoutineStats, ScheduledPulse, Timeline,
};
