//! Tests for span location against raw backend search payloads.

use docveil::backend::{DocumentBackend, FormField, RegionId, SaveMode, TextRun};
use docveil::locate::{LocateMethod, RawSearchHit, SpanLocator};
use docveil::{BoundingBox, Error, Result};

const PAGE_W: f32 = 612.0;
const PAGE_H: f32 = 792.0;

/// Backend answering every search with the same JSON payload.
struct FixedBackend {
    hits: Option<String>,
    runs: Vec<TextRun>,
}

impl FixedBackend {
    fn with_hits(json: &str) -> Self {
        Self {
            hits: Some(json.to_string()),
            runs: Vec::new(),
        }
    }

    fn failing_search(runs: Vec<TextRun>) -> Self {
        Self { hits: None, runs }
    }
}

impl DocumentBackend for FixedBackend {
    fn page_count(&self) -> usize {
        1
    }

    fn page_bounds(&self, _page: usize) -> Result<BoundingBox> {
        Ok(BoundingBox::new(0.0, 0.0, PAGE_W, PAGE_H))
    }

    fn search_text(&self, _page: usize, _literal: &str, max_hits: usize) -> Result<Vec<RawSearchHit>> {
        match &self.hits {
            Some(json) => {
                let mut hits = RawSearchHit::parse_list(json)?;
                hits.truncate(max_hits);
                Ok(hits)
            }
            None => Err(Error::backend("search_text", "index unavailable")),
        }
    }

    fn text_runs(&self, _page: usize) -> Result<Vec<TextRun>> {
        Ok(self.runs.clone())
    }

    fn list_form_fields(&self, _page: usize) -> Result<Vec<FormField>> {
        Ok(Vec::new())
    }

    fn delete_field(&mut self, _page: usize, _field_id: &str) -> Result<()> {
        Err(Error::backend("delete_field", "read-only"))
    }

    fn create_redaction_region(&mut self, _page: usize, _rect: BoundingBox) -> Result<RegionId> {
        Err(Error::backend("create_redaction_region", "read-only"))
    }

    fn apply_content_removal(&mut self, _page: usize, _region: RegionId) -> Result<()> {
        Err(Error::backend("apply_content_removal", "read-only"))
    }

    fn save(&mut self, _mode: SaveMode) -> Result<Vec<u8>> {
        Err(Error::fatal("save", "read-only"))
    }
}

/// Quad as four `[x, y]` points, top-left space.
fn points(x: f32, top: f32, w: f32, h: f32) -> String {
    format!(
        "[[{x},{top}],[{r},{top}],[{x},{b}],[{r},{b}]]",
        x = x,
        top = top,
        r = x + w,
        b = top + h
    )
}

/// Quad as eight numbers, top-left space.
fn flat(x: f32, top: f32, w: f32, h: f32) -> String {
    format!("[{x},{top},{r},{top},{x},{b},{r},{b}]", x = x, top = top, r = x + w, b = top + h)
}

mod quad_shapes {
    use super::*;

    #[test]
    fn test_bare_point_quad() {
        let backend = FixedBackend::with_hits(&format!("[{}]", points(50.0, 100.0, 40.0, 12.0)));
        let outcome = SpanLocator::new().locate(&backend, 0, "Jane", 0, "Jane").unwrap();
        assert_eq!(outcome.method, LocateMethod::Search);
        assert!(outcome.bbox.approx_eq(&BoundingBox::new(50.0, 680.0, 40.0, 12.0), 1e-3));
    }

    #[test]
    fn test_flat_quad_list() {
        let json = format!("[[{}, {}]]", flat(50.0, 100.0, 20.0, 12.0), flat(70.0, 100.0, 30.0, 12.0));
        let backend = FixedBackend::with_hits(&json);
        let outcome = SpanLocator::new().locate(&backend, 0, "Jane Roe", 0, "Jane Roe").unwrap();
        assert!(outcome.bbox.approx_eq(&BoundingBox::new(50.0, 680.0, 50.0, 12.0), 1e-3));
    }

    #[test]
    fn test_doubly_wrapped_quad() {
        let json = format!("[[[{}]]]", points(10.0, 0.0, 30.0, 10.0));
        let hits = RawSearchHit::parse_list(&json).unwrap();
        assert!(matches!(hits[0], RawSearchHit::Nested(_)));

        let backend = FixedBackend::with_hits(&json);
        let outcome = SpanLocator::new().locate(&backend, 0, "Roe", 0, "Roe").unwrap();
        assert!(outcome.bbox.approx_eq(&BoundingBox::new(10.0, 782.0, 30.0, 10.0), 1e-3));
    }

    #[test]
    fn test_malformed_payload_is_a_miss() {
        let backend = FixedBackend::with_hits(r#"[{"x": 1}]"#);
        assert!(SpanLocator::new().locate(&backend, 0, "Jane", 0, "Jane").is_none());
    }
}

mod merging {
    use super::*;

    #[test]
    fn test_single_line_hits_stay_separate() {
        // Two occurrences of "A B" next to each other on one line.
        let json = format!("[{}, {}]", points(50.0, 100.0, 18.0, 12.0), points(74.0, 100.0, 18.0, 12.0));
        let backend = FixedBackend::with_hits(&json);
        let page_text = "A B A B";
        let locator = SpanLocator::new();

        let first = locator.locate(&backend, 0, page_text, 0, "A B").unwrap();
        let second = locator.locate(&backend, 0, page_text, 4, "A B").unwrap();
        assert!(first.bbox.approx_eq(&BoundingBox::new(50.0, 680.0, 18.0, 12.0), 1e-3));
        assert!(second.bbox.approx_eq(&BoundingBox::new(74.0, 680.0, 18.0, 12.0), 1e-3));
    }

    #[test]
    fn test_multi_line_hit_merged() {
        let json = format!(
            "[[[{}]], [[{}]]]",
            points(100.0, 100.0, 60.0, 12.0),
            points(72.0, 112.0, 30.0, 12.0)
        );
        let backend = FixedBackend::with_hits(&json);
        let outcome = SpanLocator::new().locate(&backend, 0, "A\nB", 0, "A\nB").unwrap();
        let expected = BoundingBox::from_points(72.0, PAGE_H - 124.0, 160.0, PAGE_H - 100.0);
        assert!(outcome.bbox.approx_eq(&expected, 1e-3));
    }

    #[test]
    fn test_distant_lines_not_merged() {
        // Same text found twice, far apart vertically.
        let json = format!(
            "[[[{}]], [[{}]]]",
            points(72.0, 100.0, 30.0, 12.0),
            points(72.0, 500.0, 30.0, 12.0)
        );
        let backend = FixedBackend::with_hits(&json);
        let outcome = SpanLocator::new().locate(&backend, 0, "A\nB", 0, "A\nB").unwrap();
        assert!((outcome.bbox.height - 12.0).abs() < 1e-3);
    }

    #[test]
    fn test_stacked_occurrences_split_at_line_count() {
        let json = format!(
            "[[[{}]], [[{}]], [[{}]], [[{}]]]",
            points(72.0, 100.0, 30.0, 12.0),
            points(72.0, 112.0, 30.0, 12.0),
            points(72.0, 124.0, 30.0, 12.0),
            points(72.0, 136.0, 30.0, 12.0)
        );
        let backend = FixedBackend::with_hits(&json);
        let outcome = SpanLocator::new().locate(&backend, 0, "A\nB\nA\nB", 4, "A\nB").unwrap();
        let expected = BoundingBox::from_points(72.0, PAGE_H - 148.0, 102.0, PAGE_H - 124.0);
        assert!(outcome.bbox.approx_eq(&expected, 1e-3));
    }

    #[test]
    fn test_hit_limit_passed_to_backend() {
        let json = format!("[{}, {}]", points(50.0, 100.0, 24.0, 12.0), points(110.0, 100.0, 24.0, 12.0));
        let backend = FixedBackend::with_hits(&json);
        let outcome = SpanLocator::new()
            .with_max_hits(1)
            .locate(&backend, 0, "Jane and Jane", 9, "Jane")
            .unwrap();
        assert!((outcome.bbox.x - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_nth_beyond_hits_uses_first() {
        let backend = FixedBackend::with_hits(&format!("[{}]", points(50.0, 100.0, 40.0, 12.0)));
        let outcome = SpanLocator::new()
            .locate(&backend, 0, "Jane and Jane and Jane", 18, "Jane")
            .unwrap();
        assert!((outcome.bbox.x - 50.0).abs() < 1e-3);
    }
}

mod fallback {
    use super::*;

    fn run() -> TextRun {
        TextRun {
            text: "Name: Jane Roe".to_string(),
            start_offset: 0,
            transform: [1.0, 0.0, 0.0, 1.0, 100.0, 500.0],
            width: 84.0,
            font_size: 10.0,
        }
    }

    #[test]
    fn test_search_failure_uses_text_runs() {
        let backend = FixedBackend::failing_search(vec![run()]);
        let outcome = SpanLocator::new()
            .locate(&backend, 0, "Name: Jane Roe", 6, "Jane Roe")
            .unwrap();
        assert_eq!(outcome.method, LocateMethod::Fallback);
        // 6 units per char, 10% padding on each side
        let expected = BoundingBox::new(100.0 + 36.0 - 0.6, 498.0, 48.0 + 1.2, 10.0);
        assert!(outcome.bbox.approx_eq(&expected, 1e-3));
    }

    #[test]
    fn test_no_runs_is_a_miss() {
        let backend = FixedBackend::failing_search(Vec::new());
        assert!(SpanLocator::new().locate(&backend, 0, "Jane", 0, "Jane").is_none());
    }
}
