//! Channel Bridge Framework (spec §4.8): the adapter contract every
//! channel crate implements, plus the shared single-writer lock,
//! credential hot-reload, inbound pipeline, outbound formatting/chunking,
//! and RPC surface every bridge reuses.

pub mod channel;
pub mod credentials;
pub mod error;
pub mod lock;
pub mod manager;
pub mod outbound;
pub mod pipeline;
pub mod rpc;
pub mod types;

pub use channel::Channel;
pub use credentials::{AdapterRebuilder, CredentialWatcher};
pub use error::{ChannelError, Result};
pub use lock::ChannelLock;
pub use manager::ChannelManager;
pub use outbound::{chunk_text, OutboundFormatter};
pub use pipeline::{
    AttachmentUploader, CommandDispatcher, InboundPipeline, PipelineConfig, ReadReceiptSender,
    SessionRunnerBridge, TypingIndicator,
};
pub use rpc::{RpcHandler, RpcListener};
pub use types::{Attachment, ChannelStatus, InboundMessage, MessageFormat, OutboundMessage};
