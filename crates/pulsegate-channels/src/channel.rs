use async_trait::async_trait;

use crate::error::ChannelError;
use crate::types::{ChannelStatus, OutboundMessage};

/// Common interface every channel adapter implements (spec §4.8: "each
/// adapter owns a single OS-level connection to the channel provider").
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    async fn connect(&mut self) -> Result<(), ChannelError>;

    async fn disconnect(&mut self) -> Result<(), ChannelError>;

    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError>;

    fn status(&self) -> ChannelStatus;
}
