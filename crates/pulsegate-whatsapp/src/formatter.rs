use pulsegate_channels::OutboundFormatter;

/// WhatsApp's text message limit is 4096 characters.
const CHUNK_MAX: usize = 4000;

/// WhatsApp supports a small asterisk/underscore markup subset; session
/// markdown is forwarded unchanged since `*bold*` and `_italic_` already
/// match WhatsApp's own syntax closely enough for display purposes.
pub struct WhatsAppFormatter;

impl OutboundFormatter for WhatsAppFormatter {
    fn format(&self, markdown: &str) -> String {
        markdown.to_string()
    }

    fn chunk_limit(&self) -> usize {
        CHUNK_MAX
    }
}
