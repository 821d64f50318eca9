use pulsegate_channels::OutboundFormatter;

/// Telegram's message limit is 4096 characters; 4090 leaves headroom for
/// the MarkdownV2 escaping this formatter applies.
const CHUNK_MAX: usize = 4090;

/// Escapes MarkdownV2 special characters so the session's markdown output
/// survives Telegram's stricter parser.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '#' | '+' | '-' | '=' | '|' | '{' | '}' | '.' | '!' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

pub struct TelegramFormatter;

impl OutboundFormatter for TelegramFormatter {
    fn format(&self, markdown: &str) -> String {
        escape_markdown_v2(markdown)
    }

    fn chunk_limit(&self) -> usize {
        CHUNK_MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_specials() {
        let escaped = escape_markdown_v2("Hello. World! (test)");
        assert!(escaped.contains("\\."));
        assert!(escaped.contains("\\!"));
        assert!(escaped.contains("\\("));
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(escape_markdown_v2("hello world 123"), "hello world 123");
    }
}
