//! Overlapping text windows for the classifier.

/// A window of page text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Window text
    pub text: String,
    /// Char offset of the window in the page text
    pub start: usize,
}

/// Split `text` into windows of `chunk_chars` chars, each overlapping the
/// previous one by `overlap_chars`.
///
/// An entity cut by one window boundary lies wholly inside the next window as
/// long as it is shorter than the overlap.
///
/// # Examples
///
/// ```
/// use docveil::classify::chunk_text;
///
/// let chunks = chunk_text("abcdefghij", 4, 1);
/// let starts: Vec<usize> = chunks.iter().map(|c| c.start).collect();
/// assert_eq!(starts, vec![0, 3, 6]);
/// assert_eq!(chunks[2].text, "ghij");
/// ```
pub fn chunk_text(text: &str, chunk_chars: usize, overlap_chars: usize) -> Vec<TextChunk> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let chunk_chars = chunk_chars.max(1);
    let step = chunk_chars.saturating_sub(overlap_chars).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_chars).min(chars.len());
        chunks.push(TextChunk {
            text: chars[start..end].iter().collect(),
            start,
        });
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}
