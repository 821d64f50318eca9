//! `pulsegate-protocol` — wire frames, RPC method names, and event-type
//! constants shared by every crate in the workspace, mirroring the role
//! `skynet-protocol` plays for the `skynet-*` family.

pub mod events;
pub mod frames;
pub mod methods;

pub use frames::{CredentialsChanged, RpcReply, RpcRequest, StreamEvent, WakePayload};
