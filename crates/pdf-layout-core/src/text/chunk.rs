//! Splitting long text into translator-sized pieces.

/// Split `text` into chunks of at most `max_chars` characters.
///
/// A cut that is not the last one lands on the nearest space within
/// `lookback` characters before the limit; without such a space the text is
/// cut hard at the limit. Chunks are trimmed and never empty.
pub fn chunk_text(text: &str, max_chars: usize, lookback: usize) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let max_chars = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut cursor = 0;

    while cursor < chars.len() {
        let mut end = (cursor + max_chars).min(chars.len());
        if end < chars.len() {
            let window_start = end.saturating_sub(lookback).max(cursor + 1);
            if let Some(space) = (window_start..end).rev().find(|&i| chars[i] == ' ') {
                end = space;
            }
        }

        let part: String = chars[cursor..end].iter().collect();
        let part = part.trim();
        if !part.is_empty() {
            chunks.push(part.to_string());
        }
        cursor = end;
    }

    chunks
}

/// Rejoin translated chunks in their original order.
pub fn join_chunks<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::normalize;

    fn words(count: usize) -> String {
        (0..count)
            .map(|i| format!("word{}", i % 17))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_short_text_is_single_trimmed_chunk() {
        assert_eq!(chunk_text("  Hello world ", 100, 150), vec!["Hello world"]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunk_text("   ", 100, 150).is_empty());
    }

    #[test]
    fn test_chunks_respect_limit_and_cut_on_spaces() {
        let text = words(400);
        let chunks = chunk_text(&text, 200, 150);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 200);
            assert!(!chunk.is_empty());
            assert!(!chunk.starts_with(' ') && !chunk.ends_with(' '));
        }
        // Every cut landed between words
        for chunk in &chunks {
            for word in chunk.split(' ') {
                assert!(word.starts_with("word"), "split inside a word: {word}");
            }
        }
    }

    #[test]
    fn test_rejoin_reconstructs_normalized_input() {
        let text = words(1000);
        let chunks = chunk_text(&text, 300, 150);
        let rejoined = normalize(&join_chunks(&chunks));
        assert_eq!(rejoined, text);
    }

    #[test]
    fn test_hard_cut_without_spaces() {
        let text = "x".repeat(250);
        let chunks = chunk_text(&text, 100, 150);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 100);
        assert_eq!(chunks[2].len(), 50);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_space_outside_lookback_is_ignored() {
        // The only space sits 20 chars into a 100-char window with a 10-char lookback
        let text = format!("{} {}", "a".repeat(20), "b".repeat(200));
        let chunks = chunk_text(&text, 100, 10);
        assert_eq!(chunks[0].chars().count(), 100);
    }

    #[test]
    fn test_multibyte_text_is_cut_on_char_boundaries() {
        let text = "çğış ".repeat(100);
        let chunks = chunk_text(&text, 50, 150);
        assert!(chunks.iter().all(|c| c.chars().count() <= 50));
        assert_eq!(normalize(&join_chunks(&chunks)), normalize(&text));
    }

    #[test]
    fn test_join_chunks_uses_line_breaks() {
        assert_eq!(join_chunks(&["Merhaba", "dünya "]), "Merhaba\ndünya");
    }
}
