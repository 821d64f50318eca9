use async_trait::async_trait;

use pulsegate_channels::{ReadReceiptSender, TypingIndicator};

/// Default typing indicator for channels whose adapter has no native
/// keepalive of its own (spec §9 "callbacks as capability sets": absent
/// capability degrades predictably rather than failing the pipeline).
pub struct NullTypingIndicator;

#[async_trait]
impl TypingIndicator for NullTypingIndicator {
    async fn start(&self, _recipient_id: &str) {}
    async fn stop(&self, _recipient_id: &str) {}
}

/// Default read-receipt sender for channels without a native "mark read"
/// call (spec §6 "mark-read (where supported)").
pub struct NullReadReceipts;

#[async_trait]
impl ReadReceiptSender for NullReadReceipts {
    async fn acknowledge(&self, _recipient_id: &str) {}
}
