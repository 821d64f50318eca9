/// Converts the session's markdown output into a channel-native wire
/// format (spec §4.8 "Outbound formatting": HTML for one family,
/// asterisk-bold for another). Each channel-adapter crate supplies its
/// own implementation.
pub trait OutboundFormatter: Send + Sync {
    fn format(&self, markdown: &str) -> String;

    /// Maximum message length the channel accepts, in characters.
    fn chunk_limit(&self) -> usize;
}

/// Splits `text` into pieces no longer than `limit` characters, preferring
/// paragraph breaks, then line breaks, then word breaks, and hard-cutting
/// only as a last resort (spec §4.8 "Chunking preserves paragraph then
/// line then word boundaries" and never splits inside a fenced code
/// block). Mirrors the teacher's `split_chunks_smart` fence-tracking
/// splitter (`skynet-telegram::send::split_chunks_smart`): a fence open
/// at a chunk boundary is closed before the boundary and reopened with
/// the same language tag at the start of the next chunk.
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit || limit == 0 {
        return vec![text.to_string()];
    }

    let lines: Vec<&str> = text.split('\n').collect();
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut fence_lang: Option<String> = None;

    for line in &lines {
        let line_len = line.chars().count();
        let cost = if current.is_empty() { line_len } else { 1 + line_len };

        if !current.is_empty() && current.chars().count() + cost > limit {
            if fence_lang.is_some() {
                current.push_str("\n```");
            }
            chunks.push(current.trim().to_string());
            current = String::new();
            if let Some(ref lang) = fence_lang {
                current.push_str("```");
                current.push_str(lang);
                current.push('\n');
            }
        }

        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);

        let trimmed = line.trim_start();
        if let Some(after_fence) = trimmed.strip_prefix("```") {
            if fence_lang.is_some() {
                fence_lang = None;
            } else {
                fence_lang = Some(after_fence.trim().to_string());
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current.trim().to_string());
    }

    // Safety net: a single line longer than `limit` (inside or outside a
    // fence) still needs a forced split, preferring a word boundary.
    let mut result = Vec::new();
    for chunk in chunks {
        if chunk.chars().count() <= limit {
            result.push(chunk);
            continue;
        }
        let chars: Vec<char> = chunk.chars().collect();
        let mut start = 0;
        while chars.len() - start > limit {
            let window = &chars[start..start + limit];
            let split_at = window.iter().rposition(|&c| c == '\n').or_else(|| window.iter().rposition(|&c| c == ' ')).unwrap_or(limit);
            let piece: String = chars[start..start + split_at].iter().collect();
            let piece = piece.trim();
            if !piece.is_empty() {
                result.push(piece.to_string());
            }
            start += split_at;
            while start < chars.len() && chars[start].is_whitespace() {
                start += 1;
            }
        }
        if start < chars.len() {
            let piece: String = chars[start..].iter().collect();
            let piece = piece.trim();
            if !piece.is_empty() {
                result.push(piece.to_string());
            }
        }
    }
    result.retain(|c| !c.is_empty());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        assert_eq!(chunk_text("hello", 100), vec!["hello".to_string()]);
    }

    #[test]
    fn splits_on_paragraph_boundary_when_available() {
        let text = format!("{}\n\n{}", "a".repeat(10), "b".repeat(10));
        let chunks = chunk_text(&text, 15);
        assert_eq!(chunks[0], "a".repeat(10));
        assert_eq!(chunks[1], "b".repeat(10));
    }

    #[test]
    fn falls_back_to_word_boundary() {
        let text = "one two three four five six seven";
        let chunks = chunk_text(text, 10);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn hard_cuts_a_single_unbroken_word() {
        let text = "a".repeat(25);
        let chunks = chunk_text(&text, 10);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn code_fence_is_closed_and_reopened_across_chunks() {
        let mut text = String::from("Intro.\n```rust\n");
        for i in 0..40 {
            text.push_str(&format!("let variable_name_{i:04} = {i:05};\n"));
        }
        text.push_str("```\nAfter fence.");

        let chunks = chunk_text(&text, 200);
        assert!(chunks.len() >= 2, "expected multiple chunks, got {}", chunks.len());
        for c in &chunks[..chunks.len() - 1] {
            let fence_count = c.matches("```").count();
            assert_eq!(fence_count % 2, 0, "chunk left a fence unclosed: {c}");
        }
        assert!(
            chunks[1].starts_with("```rust"),
            "second chunk should reopen with ```rust, got: {}",
            &chunks[1][..chunks[1].len().min(60)]
        );
    }
}
