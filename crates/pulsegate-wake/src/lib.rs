//! `pulsegate-wake` — the shared counter store and the four wake
//! guardrails (spec §4.4), plus the subscription loop that forwards
//! accepted wakes to the Pulse Executor.

pub mod counter;
pub mod error;
pub mod gate;
pub mod subsystem;

pub use counter::{CounterStore, InMemoryCounterStore};
pub use error::{Result, WakeError};
pub use gate::{WakeDecision, WakeGate, WakeGateConfig, WakeRejection};
pub use subsystem::WakeSubsystem;
