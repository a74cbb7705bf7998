//! Span location: from a text offset to a box on the page.
//!
//! The locator asks the backend to search the page for the matched string and
//! turns the raw quads into one bottom-left [`BoundingBox`]. The search is
//! literal, so text that wraps across lines in the extracted text is retried with
//! the line-break variants from [`crate::text::line_break_variants`]. When the
//! backend finds nothing at all, the box is estimated from the text run that
//! contains the offset.
//!
//! Hits of a multi-line match arrive as one quad list per line and are merged
//! back together, never past the line count of the searched string. Hits of a
//! single-line string are never merged: two hits on adjacent lines are two
//! occurrences, not one. This holds for a variant too, so a hyphenated name found
//! through its joined form keeps a one-line box.

pub mod quads;

pub use quads::{flatten_hits, group_bbox, merge_line_groups, Quad, RawQuad, RawSearchHit};

use crate::backend::{DocumentBackend, TextRun};
use crate::geometry::BoundingBox;
use crate::text::{char_slice, has_line_break, line_break_variants, OffsetMap};

/// Maximum hits requested per search.
pub const MAX_SEARCH_HITS: usize = 100;

/// Horizontal merge distance as a share of the page width.
pub const MERGE_HORIZONTAL_SHARE: f32 = 0.3;

/// Fallback padding on each side, as a share of one char width.
pub const FALLBACK_PADDING: f32 = 0.1;

/// Share of the line height below the baseline.
pub const DESCENT_SHARE: f32 = 0.2;

/// How a box was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateMethod {
    /// The literal text was found
    Search,
    /// A line-break variant of the text was found
    Variant,
    /// Estimated from the enclosing text run
    Fallback,
}

/// A located span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocateOutcome {
    /// Box in bottom-left page space
    pub bbox: BoundingBox,
    /// How it was found
    pub method: LocateMethod,
}

/// Maps text matches to page boxes.
#[derive(Debug, Clone, Copy)]
pub struct SpanLocator {
    max_hits: usize,
    horizontal_share: f32,
}

impl Default for SpanLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SpanLocator {
    /// Locator with the default limits.
    pub fn new() -> Self {
        Self {
            max_hits: MAX_SEARCH_HITS,
            horizontal_share: MERGE_HORIZONTAL_SHARE,
        }
    }

    /// Set the maximum hits requested per search.
    pub fn with_max_hits(mut self, max_hits: usize) -> Self {
        self.max_hits = max_hits.max(1);
        self
    }

    /// Locate `text`, found at char `offset` of `page_text`, on `page`.
    ///
    /// Returns `None` when neither search nor the text-run estimate finds it.
    /// Backend errors are logged and treated as "not found".
    pub fn locate(
        &self,
        backend: &dyn DocumentBackend,
        page: usize,
        page_text: &str,
        offset: usize,
        text: &str,
    ) -> Option<LocateOutcome> {
        if text.is_empty() {
            return None;
        }
        let bounds = match backend.page_bounds(page) {
            Ok(bounds) => bounds,
            Err(e) => {
                log::warn!("Cannot locate '{}' on page {}: {}", text, page, e);
                return None;
            }
        };

        let mut method = LocateMethod::Search;
        let mut join = None;
        let mut literal = text.to_string();
        let mut hits = self.search(backend, page, text);
        if hits.is_empty() && has_line_break(text) {
            for variant in line_break_variants(text) {
                hits = self.search(backend, page, &variant.text);
                if !hits.is_empty() {
                    log::debug!("Located '{}' on page {} via variant {:?}", text, page, variant.text);
                    method = LocateMethod::Variant;
                    join = Some(variant.join);
                    literal = variant.text;
                    break;
                }
            }
        }

        if !hits.is_empty() {
            let mut groups = flatten_hits(&hits);
            if has_line_break(&literal) {
                let lines = literal.lines().count().max(2);
                groups = merge_line_groups(groups, bounds.width, self.horizontal_share, lines);
            }
            // Count earlier occurrences of what was actually searched for, in the
            // page text rewritten the same way.
            let nth = match join {
                Some(join) => {
                    let start = join.apply(char_slice(page_text, 0, offset)).chars().count();
                    occurrence_index(&join.apply(page_text), &literal, start)
                }
                None => occurrence_index(page_text, text, offset),
            };
            let group = groups.get(nth).or_else(|| groups.first())?;
            return group_bbox(group, bounds.height).map(|bbox| LocateOutcome { bbox, method });
        }

        let runs = match backend.text_runs(page) {
            Ok(runs) => runs,
            Err(e) => {
                log::warn!("Text runs unavailable on page {}: {}", page, e);
                return None;
            }
        };
        let bbox = estimate_from_runs(&runs, offset, text.chars().count())?;
        log::debug!("Located '{}' on page {} from text run estimate", text, page);
        Some(LocateOutcome {
            bbox,
            method: LocateMethod::Fallback,
        })
    }

    fn search(&self, backend: &dyn DocumentBackend, page: usize, literal: &str) -> Vec<RawSearchHit> {
        backend
            .search_text(page, literal, self.max_hits)
            .unwrap_or_else(|e| {
                log::warn!("Search for '{}' failed on page {}: {}", literal, page, e);
                Vec::new()
            })
    }
}

/// Number of case-exact, non-overlapping occurrences of `needle` in `haystack`
/// that start before char `offset`.
pub fn occurrence_index(haystack: &str, needle: &str, offset: usize) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let offsets = OffsetMap::new(haystack);
    haystack
        .match_indices(needle)
        .take_while(|(byte, _)| offsets.char_index(*byte) < offset)
        .count()
}

/// Estimate the box of `len` chars at `offset` from the run containing it.
///
/// Uses the run's average char width, padded by [`FALLBACK_PADDING`] of a char
/// on each side. The span is cut at the end of the run.
pub fn estimate_from_runs(runs: &[TextRun], offset: usize, len: usize) -> Option<BoundingBox> {
    let run = runs.iter().find(|r| r.contains_offset(offset))?;
    let run_len = run.char_len();
    let char_width = run.width / run_len as f32;
    let local = offset - run.start_offset;
    let span = len.min(run_len - local).max(1);

    let [_, _, _, d, e, f] = run.transform;
    let scale = if d == 0.0 { 1.0 } else { d.abs() };
    let height = run.font_size * scale;
    let padding = char_width * FALLBACK_PADDING;

    Some(BoundingBox::new(
        e + local as f32 * char_width - padding,
        f - DESCENT_SHARE * height,
        span as f32 * char_width + 2.0 * padding,
        height,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, MemoryPage};

    const PAGE_H: f32 = 792.0;

    fn locate(backend: &MemoryBackend, text: &str, offset: usize) -> Option<LocateOutcome> {
        let page_text = backend.page_text(0).unwrap().to_string();
        SpanLocator::new().locate(backend, 0, &page_text, offset, text)
    }

    #[test]
    fn test_locate_by_search() {
        let backend = MemoryBackend::new().with_text_page("Name: Jane Roe");
        let outcome = locate(&backend, "Jane Roe", 6).unwrap();
        assert_eq!(outcome.method, LocateMethod::Search);
        assert_eq!(outcome.bbox, MemoryBackend::span_box(PAGE_H, 0, 6, 8));
    }

    #[test]
    fn test_repeated_string_uses_nth_hit() {
        let backend = MemoryBackend::new().with_text_page("Jane met Jane");
        let first = locate(&backend, "Jane", 0).unwrap();
        let second = locate(&backend, "Jane", 9).unwrap();
        assert_eq!(first.bbox, MemoryBackend::span_box(PAGE_H, 0, 0, 4));
        assert_eq!(second.bbox, MemoryBackend::span_box(PAGE_H, 0, 9, 4));
    }

    #[test]
    fn test_nth_beyond_hits_falls_back_to_first() {
        let page = MemoryPage::new("Jane and Jane").with_layout_text("Jane and Joan");
        let backend = MemoryBackend::new().with_page(page);
        let outcome = locate(&backend, "Jane", 9).unwrap();
        assert_eq!(outcome.bbox, MemoryBackend::span_box(PAGE_H, 0, 0, 4));
    }

    #[test]
    fn test_single_line_hits_not_merged() {
        let backend = MemoryBackend::new().with_text_page("Ann Bob\nAnn Bob");
        let first = locate(&backend, "Ann Bob", 0).unwrap();
        let second = locate(&backend, "Ann Bob", 8).unwrap();
        assert_eq!(first.bbox.height, MemoryBackend::LINE_HEIGHT);
        assert_eq!(second.bbox, MemoryBackend::span_box(PAGE_H, 1, 0, 7));
    }

    #[test]
    fn test_multi_line_hits_merged() {
        let backend = MemoryBackend::new().with_text_page("Ann\nBob");
        let outcome = locate(&backend, "Ann\nBob", 0).unwrap();
        let expected = MemoryBackend::span_box(PAGE_H, 0, 0, 3)
            .union(&MemoryBackend::span_box(PAGE_H, 1, 0, 3));
        assert_eq!(outcome.bbox, expected);
        assert_eq!(outcome.bbox.height, 2.0 * MemoryBackend::LINE_HEIGHT);
    }

    #[test]
    fn test_hyphenation_variant() {
        let page = MemoryPage::new("Dr. John-\nson").with_layout_text("Dr. Johnson");
        let backend = MemoryBackend::new().with_page(page);
        let outcome = locate(&backend, "John-\nson", 4).unwrap();
        assert_eq!(outcome.method, LocateMethod::Variant);
        assert_eq!(outcome.bbox, MemoryBackend::span_box(PAGE_H, 0, 4, 7));
    }

    #[test]
    fn test_variant_after_plain_occurrence() {
        let page = MemoryPage::new("Project Falcon\n\n\n\nRef Pro-\nject Falcon")
            .with_layout_text("Project Falcon\n\n\n\nRef Project Falcon");
        let backend = MemoryBackend::new().with_page(page);
        let outcome = locate(&backend, "Pro-\nject Falcon", 22).unwrap();
        assert_eq!(outcome.method, LocateMethod::Variant);
        assert_eq!(outcome.bbox, MemoryBackend::span_box(PAGE_H, 4, 4, 14));
    }

    #[test]
    fn test_variant_on_one_line_not_widened() {
        let page = MemoryPage::new("Project Falcon and Pro-\nject Falcon")
            .with_layout_text("Project Falcon and Project Falcon");
        let backend = MemoryBackend::new().with_page(page);
        let outcome = locate(&backend, "Pro-\nject Falcon", 19).unwrap();
        assert_eq!(outcome.bbox, MemoryBackend::span_box(PAGE_H, 0, 19, 14));
    }

    #[test]
    fn test_stacked_multi_line_occurrences() {
        let backend = MemoryBackend::new().with_text_page("Project\nFalcon\nProject\nFalcon");
        let first = locate(&backend, "Project\nFalcon", 0).unwrap();
        let second = locate(&backend, "Project\nFalcon", 15).unwrap();
        assert_eq!(
            first.bbox,
            MemoryBackend::span_box(PAGE_H, 0, 0, 7).union(&MemoryBackend::span_box(PAGE_H, 1, 0, 6))
        );
        assert_eq!(
            second.bbox,
            MemoryBackend::span_box(PAGE_H, 2, 0, 7).union(&MemoryBackend::span_box(PAGE_H, 3, 0, 6))
        );
    }

    #[test]
    fn test_fallback_estimate() {
        let backend =
            MemoryBackend::new().with_page(MemoryPage::new("Call 555-0100 now").unsearchable());
        let outcome = locate(&backend, "555-0100", 5).unwrap();
        assert_eq!(outcome.method, LocateMethod::Fallback);

        let exact = MemoryBackend::span_box(PAGE_H, 0, 5, 8);
        let padding = MemoryBackend::CHAR_WIDTH * FALLBACK_PADDING;
        assert!((outcome.bbox.x - (exact.x - padding)).abs() < 1e-3);
        assert!((outcome.bbox.width - (exact.width + 2.0 * padding)).abs() < 1e-3);
        assert!((outcome.bbox.y - exact.y).abs() < 1e-3);
        assert!((outcome.bbox.height - exact.height).abs() < 1e-3);
    }

    #[test]
    fn test_locator_miss() {
        let backend = MemoryBackend::new().with_page(MemoryPage::new("short").unsearchable());
        assert!(locate(&backend, "elsewhere", 40).is_none());
    }

    #[test]
    fn test_occurrence_index() {
        assert_eq!(occurrence_index("aa aa aa", "aa", 0), 0);
        assert_eq!(occurrence_index("aa aa aa", "aa", 3), 1);
        assert_eq!(occurrence_index("aa aa aa", "aa", 7), 3);
        // case-exact
        assert_eq!(occurrence_index("Jane jane Jane", "Jane", 10), 1);
        // non-overlapping
        assert_eq!(occurrence_index("aaaa", "aa", 3), 2);
    }
}
