use pulsegate_channels::OutboundFormatter;

/// signal-cli imposes no hard message length limit; this keeps messages a
/// sane size for mobile rendering.
const CHUNK_MAX: usize = 4000;

pub struct SignalFormatter;

impl OutboundFormatter for SignalFormatter {
    fn format(&self, markdown: &str) -> String {
        markdown.to_string()
    }

    fn chunk_limit(&self) -> usize {
        CHUNK_MAX
    }
}
