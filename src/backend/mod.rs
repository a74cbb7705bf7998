//! The document backend contract.
//!
//! The core never touches a container format directly. Everything it needs from a
//! loaded document goes through [`DocumentBackend`]: page geometry, literal text
//! search, text runs for fallback positioning, form fields, and the destructive
//! operations used by the redaction coordinator. Adapters for concrete backends
//! implement this trait at the boundary.
//!
//! [`MemoryBackend`] is a complete in-memory implementation with a monospace
//! layout model. It is what the test suite runs against.

mod memory;

pub use memory::{
    FailPoint, MemoryBackend, MemoryDocument, MemoryLoader, MemoryPage, MemorySnapshot,
    RecordedRegion, REMOVED_CHAR,
};

use crate::error::Result;
use crate::geometry::BoundingBox;
use crate::locate::RawSearchHit;
use serde::{Deserialize, Serialize};

/// How the backend serializes the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveMode {
    /// Append an update section; earlier revisions stay recoverable
    Incremental,
    /// Rewrite the whole document; removed content is purged
    Full,
}

/// Handle of a redaction region created on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionId(pub u32);

/// An interactive form field.
///
/// `bounds` uses the bottom-left page origin, like entity boxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    /// Backend identifier
    pub id: String,
    /// Human-readable label
    #[serde(default)]
    pub label: String,
    /// Current value
    #[serde(default)]
    pub value: String,
    /// Widget rectangle
    pub bounds: BoundingBox,
}

/// A run of text drawn with one transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// Text of the run
    pub text: String,
    /// Char index of the run's first char in the page text
    pub start_offset: usize,
    /// Text matrix `[a b c d e f]` in bottom-left page space; `e`/`f` is the
    /// baseline origin, `d` the vertical scale
    pub transform: [f32; 6],
    /// Advance width of the whole run in page units
    pub width: f32,
    /// Nominal font size
    pub font_size: f32,
}

impl TextRun {
    /// Number of chars in the run.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the run covers the char index `offset` of the page text.
    pub fn contains_offset(&self, offset: usize) -> bool {
        offset >= self.start_offset && offset < self.start_offset + self.char_len()
    }
}

/// Capabilities the core needs from a loaded document.
///
/// Read operations take `&self`; destructive ones take `&mut self`, so one
/// redaction pass holds the document exclusively.
pub trait DocumentBackend {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Page rectangle. Its height is used to convert between origins.
    fn page_bounds(&self, page: usize) -> Result<BoundingBox>;

    /// Search a page for a literal string, returning raw quads in top-left space.
    fn search_text(&self, page: usize, literal: &str, max_hits: usize) -> Result<Vec<RawSearchHit>>;

    /// Text runs of a page, used when search finds nothing.
    fn text_runs(&self, page: usize) -> Result<Vec<TextRun>>;

    /// Form fields on a page.
    fn list_form_fields(&self, page: usize) -> Result<Vec<FormField>>;

    /// Delete a form field together with its value.
    fn delete_field(&mut self, page: usize, field_id: &str) -> Result<()>;

    /// Mark a top-left rectangle for redaction.
    fn create_redaction_region(&mut self, page: usize, rect: BoundingBox) -> Result<RegionId>;

    /// Remove the content under a region and paint it opaque.
    fn apply_content_removal(&mut self, page: usize, region: RegionId) -> Result<()>;

    /// Strip metadata and hidden content.
    fn sanitize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Serialize the document.
    fn save(&mut self, mode: SaveMode) -> Result<Vec<u8>>;
}

/// Opens documents from bytes.
pub trait BackendLoader {
    /// Load a document. Failures are fatal for the job.
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn DocumentBackend>>;
}
