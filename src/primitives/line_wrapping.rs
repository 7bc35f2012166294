//! Fixed-width line chunking
//!
//! Pipeline: prompt + line text → fixed-width chunks → tail selection → rendering
//!
//! Chunks are counted in characters, not bytes or display columns, so the
//! cursor math in [`crate::model::line::Line`] and the rendered rows always
//! agree. A double-width glyph counts as one column.

/// Split `text` into consecutive chunks of at most `width` characters.
///
/// Empty text produces no chunks. A width of zero is treated as one column
/// so that a collapsed pane never loops forever.
pub fn wrap_chunks(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == width {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Keep only the last `max` chunks.
pub fn tail(mut chunks: Vec<String>, max: usize) -> Vec<String> {
    if chunks.len() > max {
        chunks.drain(..chunks.len() - max);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(wrap_chunks("", 10).is_empty());
    }

    #[test]
    fn test_exact_multiple_of_width() {
        let text = "x".repeat(30);
        let chunks = wrap_chunks(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() == 10));
    }

    #[test]
    fn test_partial_last_chunk() {
        assert_eq!(wrap_chunks("abcdefg", 3), vec!["abc", "def", "g"]);
    }

    #[test]
    fn test_zero_width_does_not_hang() {
        assert_eq!(wrap_chunks("ab", 0), vec!["a", "b"]);
    }

    #[test]
    fn test_multibyte_counts_chars() {
        assert_eq!(wrap_chunks("héllo", 2), vec!["hé", "ll", "o"]);
    }

    #[test]
    fn test_tail_keeps_most_recent() {
        let chunks = wrap_chunks("aabbcc", 2);
        assert_eq!(tail(chunks.clone(), 1), vec!["cc"]);
        assert_eq!(tail(chunks.clone(), 5), chunks);
        assert!(tail(chunks, 0).is_empty());
    }
}
