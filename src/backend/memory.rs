//! In-memory document backend.
//!
//! Pages hold plain text laid out in a fixed monospace grid: every char is
//! [`MemoryBackend::CHAR_WIDTH`] wide, every line [`MemoryBackend::LINE_HEIGHT`]
//! tall, starting [`MemoryBackend::MARGIN`] from the top-left corner. Search,
//! text runs and content removal all work on that grid, so positions computed by
//! the locator can be checked exactly.

use super::{BackendLoader, DocumentBackend, FormField, RegionId, SaveMode, TextRun};
use crate::error::{Error, Result};
use crate::geometry::BoundingBox;
use crate::locate::{Quad, RawQuad, RawSearchHit};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Char painted over removed content.
pub const REMOVED_CHAR: char = '\u{2588}';

fn default_width() -> f32 {
    612.0
}

fn default_height() -> f32 {
    792.0
}

fn default_true() -> bool {
    true
}

/// Page description used to build a [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryPage {
    /// Extracted page text, as detection sees it
    pub text: String,
    /// Text as drawn, when it differs from the extracted text
    #[serde(default)]
    pub layout_text: Option<String>,
    /// Page width
    #[serde(default = "default_width")]
    pub width: f32,
    /// Page height
    #[serde(default = "default_height")]
    pub height: f32,
    /// Form fields on the page
    #[serde(default)]
    pub fields: Vec<FormField>,
    /// Whether literal search returns hits
    #[serde(default = "default_true")]
    pub searchable: bool,
}

impl MemoryPage {
    /// Letter-sized page with `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            layout_text: None,
            width: default_width(),
            height: default_height(),
            fields: Vec::new(),
            searchable: true,
        }
    }

    /// Draw different text than the extracted text.
    pub fn with_layout_text(mut self, text: impl Into<String>) -> Self {
        self.layout_text = Some(text.into());
        self
    }

    /// Set the page size.
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Add a form field.
    pub fn with_field(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    /// Make literal search return nothing on this page.
    pub fn unsearchable(mut self) -> Self {
        self.searchable = false;
        self
    }
}

/// Serialized input of [`MemoryLoader`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDocument {
    /// Pages in order
    pub pages: Vec<MemoryPage>,
    /// Document information entries
    #[serde(default)]
    pub metadata: IndexMap<String, String>,
}

/// Operations that can be told to fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailPoint {
    /// Every literal search
    Search,
    /// Deleting the field with this id
    DeleteField(String),
    /// Creating a region on this page
    CreateRegion(usize),
    /// Applying removal on this page
    ApplyRemoval(usize),
    /// Sanitizing
    Sanitize,
    /// Saving
    Save,
}

/// What [`MemoryBackend::save`] writes, as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Mode used for the save
    pub mode: SaveMode,
    /// Drawn text of each page after removals
    pub pages: Vec<String>,
    /// Remaining form fields of each page
    pub fields: Vec<Vec<FormField>>,
    /// Remaining metadata
    pub metadata: IndexMap<String, String>,
    /// Original drawn text, still present after an incremental save
    pub previous_revision: Option<Vec<String>>,
}

impl MemorySnapshot {
    /// Parse bytes written by [`MemoryBackend::save`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// A created redaction region.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRegion {
    /// Page index
    pub page: usize,
    /// Rectangle in top-left space
    pub rect: BoundingBox,
    /// Whether content removal was applied
    pub applied: bool,
}

#[derive(Debug, Clone)]
struct PageState {
    page: MemoryPage,
    lines: Vec<Vec<char>>,
}

impl PageState {
    fn new(page: MemoryPage) -> Self {
        let drawn = page.layout_text.as_deref().unwrap_or(&page.text);
        let lines = drawn.split('\n').map(|line| line.chars().collect()).collect();
        Self { page, lines }
    }

    fn drawn_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// In-memory [`DocumentBackend`].
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    pages: Vec<PageState>,
    metadata: IndexMap<String, String>,
    original: Vec<String>,
    failures: HashSet<FailPoint>,
    deleted_fields: Vec<(usize, String)>,
    regions: Vec<RecordedRegion>,
    saves: Vec<SaveMode>,
    sanitized: bool,
}

impl MemoryBackend {
    /// Width of every char.
    pub const CHAR_WIDTH: f32 = 6.0;
    /// Height of every line.
    pub const LINE_HEIGHT: f32 = 12.0;
    /// Distance of the text grid from the left and top page edges.
    pub const MARGIN: f32 = 72.0;

    /// Backend without pages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend built from a document description.
    pub fn from_document(document: MemoryDocument) -> Self {
        let mut backend = Self::new();
        backend.metadata = document.metadata;
        for page in document.pages {
            backend = backend.with_page(page);
        }
        backend
    }

    /// Append a page.
    pub fn with_page(mut self, page: MemoryPage) -> Self {
        let state = PageState::new(page);
        self.original.push(state.drawn_text());
        self.pages.push(state);
        self
    }

    /// Append a letter-sized page with `text`.
    pub fn with_text_page(self, text: impl Into<String>) -> Self {
        self.with_page(MemoryPage::new(text))
    }

    /// Set a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Make an operation fail.
    pub fn fail_on(mut self, point: FailPoint) -> Self {
        self.failures.insert(point);
        self
    }

    /// Extracted text of a page.
    pub fn page_text(&self, page: usize) -> Option<&str> {
        self.pages.get(page).map(|p| p.page.text.as_str())
    }

    /// Drawn text of a page after removals.
    pub fn drawn_text(&self, page: usize) -> Option<String> {
        self.pages.get(page).map(PageState::drawn_text)
    }

    /// Fields deleted so far, as `(page, id)`.
    pub fn deleted_fields(&self) -> &[(usize, String)] {
        &self.deleted_fields
    }

    /// Regions created so far.
    pub fn regions(&self) -> &[RecordedRegion] {
        &self.regions
    }

    /// Save modes used so far.
    pub fn saves(&self) -> &[SaveMode] {
        &self.saves
    }

    /// Whether sanitize ran.
    pub fn is_sanitized(&self) -> bool {
        self.sanitized
    }

    /// Bottom-left box of `len` chars starting at `col` on `line`.
    pub fn span_box(page_height: f32, line: usize, col: usize, len: usize) -> BoundingBox {
        let top = Self::MARGIN + line as f32 * Self::LINE_HEIGHT;
        BoundingBox::new(
            Self::MARGIN + col as f32 * Self::CHAR_WIDTH,
            page_height - top - Self::LINE_HEIGHT,
            len as f32 * Self::CHAR_WIDTH,
            Self::LINE_HEIGHT,
        )
    }

    fn check(&self, point: FailPoint, operation: &str) -> Result<()> {
        if self.failures.contains(&point) {
            Err(Error::backend(operation, "injected failure"))
        } else {
            Ok(())
        }
    }

    fn state(&self, page: usize, operation: &str) -> Result<&PageState> {
        self.pages
            .get(page)
            .ok_or_else(|| Error::backend(operation, format!("page {} out of range", page)))
    }

    fn line_quad(line: usize, col: usize, len: usize) -> RawQuad {
        let quad = Quad::from_rect(
            Self::MARGIN + col as f32 * Self::CHAR_WIDTH,
            Self::MARGIN + line as f32 * Self::LINE_HEIGHT,
            len as f32 * Self::CHAR_WIDTH,
            Self::LINE_HEIGHT,
        );
        RawQuad::from(&quad)
    }
}

impl DocumentBackend for MemoryBackend {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_bounds(&self, page: usize) -> Result<BoundingBox> {
        let state = self.state(page, "page_bounds")?;
        Ok(BoundingBox::new(0.0, 0.0, state.page.width, state.page.height))
    }

    fn search_text(&self, page: usize, literal: &str, max_hits: usize) -> Result<Vec<RawSearchHit>> {
        self.check(FailPoint::Search, "search_text")?;
        let state = self.state(page, "search_text")?;
        if literal.is_empty() || !state.page.searchable {
            return Ok(Vec::new());
        }

        let drawn = state.drawn_text();
        let mut hits = Vec::new();
        for (byte_start, _) in drawn.match_indices(literal).take(max_hits) {
            let char_start = drawn[..byte_start].chars().count();

            // Walk the occurrence, emitting one quad per line it touches.
            let (mut line, mut col) = (0usize, 0usize);
            for ch in drawn.chars().take(char_start) {
                if ch == '\n' {
                    line += 1;
                    col = 0;
                } else {
                    col += 1;
                }
            }
            let mut segments: Vec<(usize, usize, usize)> = Vec::new();
            let mut run = (line, col, 0usize);
            for ch in literal.chars() {
                if ch == '\n' {
                    segments.push(run);
                    line += 1;
                    run = (line, 0, 0);
                } else {
                    run.2 += 1;
                }
            }
            segments.push(run);
            segments.retain(|&(_, _, len)| len > 0);

            match segments.as_slice() {
                [] => {}
                [(line, col, len)] => hits.push(RawSearchHit::Quad(Self::line_quad(*line, *col, *len))),
                many => {
                    for &(line, col, len) in many {
                        hits.push(RawSearchHit::Nested(vec![vec![Self::line_quad(line, col, len)]]));
                    }
                }
            }
        }
        Ok(hits)
    }

    fn text_runs(&self, page: usize) -> Result<Vec<TextRun>> {
        let state = self.state(page, "text_runs")?;
        let height = state.page.height;
        let mut runs = Vec::new();
        let mut offset = 0usize;
        for (index, line) in state.page.text.split('\n').enumerate() {
            let len = line.chars().count();
            if len > 0 {
                let bottom = Self::span_box(height, index, 0, len).y;
                runs.push(TextRun {
                    text: line.to_string(),
                    start_offset: offset,
                    transform: [1.0, 0.0, 0.0, 1.0, Self::MARGIN, bottom + 0.2 * Self::LINE_HEIGHT],
                    width: len as f32 * Self::CHAR_WIDTH,
                    font_size: Self::LINE_HEIGHT,
                });
            }
            offset += len + 1;
        }
        Ok(runs)
    }

    fn list_form_fields(&self, page: usize) -> Result<Vec<FormField>> {
        Ok(self.state(page, "list_form_fields")?.page.fields.clone())
    }

    fn delete_field(&mut self, page: usize, field_id: &str) -> Result<()> {
        self.check(FailPoint::DeleteField(field_id.to_string()), "delete_field")?;
        self.state(page, "delete_field")?;
        let fields = &mut self.pages[page].page.fields;
        let before = fields.len();
        fields.retain(|f| f.id != field_id);
        if fields.len() == before {
            return Err(Error::backend("delete_field", format!("no field '{}'", field_id)));
        }
        self.deleted_fields.push((page, field_id.to_string()));
        Ok(())
    }

    fn create_redaction_region(&mut self, page: usize, rect: BoundingBox) -> Result<RegionId> {
        self.check(FailPoint::CreateRegion(page), "create_redaction_region")?;
        self.state(page, "create_redaction_region")?;
        self.regions.push(RecordedRegion {
            page,
            rect,
            applied: false,
        });
        Ok(RegionId((self.regions.len() - 1) as u32))
    }

    fn apply_content_removal(&mut self, page: usize, region: RegionId) -> Result<()> {
        self.check(FailPoint::ApplyRemoval(page), "apply_content_removal")?;
        let rect = match self.regions.get(region.0 as usize) {
            Some(recorded) if recorded.page == page => recorded.rect,
            _ => return Err(Error::backend("apply_content_removal", "unknown region")),
        };

        let state = &mut self.pages[page];
        for (line_index, line) in state.lines.iter_mut().enumerate() {
            let center_y = Self::MARGIN + (line_index as f32 + 0.5) * Self::LINE_HEIGHT;
            if center_y < rect.y || center_y > rect.y + rect.height {
                continue;
            }
            for (col, ch) in line.iter_mut().enumerate() {
                let center_x = Self::MARGIN + (col as f32 + 0.5) * Self::CHAR_WIDTH;
                if center_x >= rect.x && center_x <= rect.x + rect.width {
                    *ch = REMOVED_CHAR;
                }
            }
        }
        self.regions[region.0 as usize].applied = true;
        Ok(())
    }

    fn sanitize(&mut self) -> Result<()> {
        self.check(FailPoint::Sanitize, "sanitize")?;
        self.metadata.clear();
        self.sanitized = true;
        Ok(())
    }

    fn save(&mut self, mode: SaveMode) -> Result<Vec<u8>> {
        self.check(FailPoint::Save, "save")?;
        self.saves.push(mode);
        let snapshot = MemorySnapshot {
            mode,
            pages: self.pages.iter().map(PageState::drawn_text).collect(),
            fields: self.pages.iter().map(|p| p.page.fields.clone()).collect(),
            metadata: self.metadata.clone(),
            previous_revision: match mode {
                SaveMode::Incremental => Some(self.original.clone()),
                SaveMode::Full => None,
            },
        };
        Ok(serde_json::to_vec(&snapshot)?)
    }
}

/// Loads [`MemoryDocument`] JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryLoader;

impl BackendLoader for MemoryLoader {
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn DocumentBackend>> {
        let document: MemoryDocument =
            serde_json::from_slice(bytes).map_err(|e| Error::fatal("load", e.to_string()))?;
        Ok(Box::new(MemoryBackend::from_document(document)))
    }
}
