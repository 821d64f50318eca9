//! Client Stream State Machine (spec §4.7): reconciles replayed history
//! with live bus events on reconnect, without dropping or duplicating.

pub mod observer;
pub mod state;

pub use observer::ClientStreamObserver;
pub use state::ClientStreamState;
