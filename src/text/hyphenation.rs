//! Line-break variants for searching text that wraps across lines.
//!
//! Extracted page text often contains a word broken at a line end, either with a
//! hard hyphen (U+002D) or a soft hyphen (U+00AD):
//!
//! - "John-" (line 1) + "son" (line 2) is extracted as `"John-\nson"`
//!
//! A literal search for that string usually finds nothing, because the rendered
//! page has no such character sequence. The span locator retries with the variants
//! produced here, in this order:
//!
//! 1. hyphen before the break removed: `"John\nson"`
//! 2. hyphen and break both removed: `"Johnson"`
//! 3. break only removed: `"John-son"`

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LINE_BREAK: Regex = Regex::new(r"([-\x{00AD}]?)[ \t]*(?:\r\n|\n|\r)[ \t]*").unwrap();
}

/// How a line break (and the hyphen before it) is rewritten in a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineBreakJoin {
    /// Hyphen dropped, break kept as `\n`
    Newline,
    /// Hyphen and break both dropped
    Remove,
    /// Break dropped, hyphen kept
    KeepHyphen,
}

impl LineBreakJoin {
    const ALL: [LineBreakJoin; 3] = [LineBreakJoin::Newline, LineBreakJoin::Remove, LineBreakJoin::KeepHyphen];

    fn replacement(&self) -> &'static str {
        match self {
            LineBreakJoin::Newline => "\n",
            LineBreakJoin::Remove => "",
            LineBreakJoin::KeepHyphen => "$1",
        }
    }

    /// Rewrite every line break of `text` this way.
    ///
    /// Applying the same join to the page text keeps occurrence counting in step
    /// with a search for the variant.
    pub fn apply(&self, text: &str) -> String {
        LINE_BREAK.replace_all(text, self.replacement()).into_owned()
    }
}

/// A search variant and the join that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBreakVariant {
    /// How line breaks were rewritten
    pub join: LineBreakJoin,
    /// Text to search for
    pub text: String,
}

/// Produce the search variants for a string containing line breaks.
///
/// Variants identical to the input or to an earlier variant are dropped. Text
/// without a line break yields no variants.
///
/// # Examples
///
/// ```
/// use docveil::text::line_break_variants;
///
/// let variants: Vec<String> = line_break_variants("John-\nson").into_iter().map(|v| v.text).collect();
/// assert_eq!(variants, vec!["John\nson", "Johnson", "John-son"]);
/// ```
pub fn line_break_variants(text: &str) -> Vec<LineBreakVariant> {
    if !LINE_BREAK.is_match(text) {
        return Vec::new();
    }

    let mut variants: Vec<LineBreakVariant> = Vec::with_capacity(LineBreakJoin::ALL.len());
    for join in LineBreakJoin::ALL {
        let candidate = join.apply(text);
        if candidate != text && !candidate.is_empty() && !variants.iter().any(|v| v.text == candidate) {
            variants.push(LineBreakVariant { join, text: candidate });
        }
    }
    variants
}
