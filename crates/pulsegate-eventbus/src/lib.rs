//! `pulsegate-eventbus` — pub/sub (spec §6 wake/credential/RPC patterns)
//! and the durable, replay-capable per-session event stream (spec §4.5).

pub mod bus;
pub mod error;
pub mod pubsub;

pub use bus::{EventBus, Replay};
pub use error::{EventBusError, Result};
pub use pubsub::{InMemoryPubSub, PubSub, PubSubMessage};
