//! Session Streamer (spec §4.6): assembles agent-runner events into
//! ordered structural messages plus coalesced token deltas.

pub mod observer;
pub mod streamer;
pub mod types;

pub use observer::{NullObserver, StreamObserver};
pub use streamer::SessionStreamer;
pub use types::{ActiveBlock, MessageKind, StructuralMessage};
