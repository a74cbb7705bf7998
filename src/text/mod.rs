//! Text utilities shared by detection and location.
//!
//! Offsets exposed by this crate are char indices into the page text. Regex engines
//! and string slicing work in bytes, so [`OffsetMap`] converts between the two.

pub mod hyphenation;

pub use hyphenation::{line_break_variants, LineBreakJoin, LineBreakVariant};

/// Default number of chars shown on each side of a match in a context snippet.
pub const SNIPPET_RADIUS: usize = 40;

/// Byte/char offset conversion for one string.
#[derive(Debug, Clone)]
pub struct OffsetMap {
    /// Byte offset of every char, plus the total length as a final entry
    starts: Vec<usize>,
}

impl OffsetMap {
    /// Index the char boundaries of `text`.
    pub fn new(text: &str) -> Self {
        let mut starts: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        starts.push(text.len());
        Self { starts }
    }

    /// Number of chars in the indexed text.
    pub fn char_len(&self) -> usize {
        self.starts.len() - 1
    }

    /// Char index of a byte offset. Offsets inside a char round down.
    pub fn char_index(&self, byte: usize) -> usize {
        match self.starts.binary_search(&byte) {
            Ok(index) => index,
            Err(index) => index.saturating_sub(1),
        }
    }

    /// Byte offset of a char index, clamped to the text length.
    pub fn byte_offset(&self, char_index: usize) -> usize {
        self.starts[char_index.min(self.starts.len() - 1)]
    }
}

/// Text around `[start, end)` (char indices), with `radius` chars on each side and
/// newlines flattened to spaces.
pub fn context_snippet(text: &str, start: usize, end: usize, radius: usize) -> String {
    let from = start.saturating_sub(radius);
    let snippet: String = text
        .chars()
        .skip(from)
        .take(end.saturating_sub(from) + radius)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    snippet.trim().to_string()
}

/// Slice `text` by char indices.
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let map = OffsetMap::new(text);
    &text[map.byte_offset(start)..map.byte_offset(end.max(start))]
}

/// Whether the text contains a line break.
pub fn has_line_break(text: &str) -> bool {
    text.contains('\n') || text.contains('\r')
}
