//! Applying confirmed redactions to a document.
//!
//! [`RedactionCoordinator`] takes the entities a reviewer confirmed and removes
//! them through the [`DocumentBackend`]:
//!
//! - entities found in form field values delete the field, located by id first
//!   and by its bounds second
//! - text entities become a redaction region slightly larger than the entity
//!   box, and the content under it is removed rather than covered
//!
//! The document is then optionally sanitized and always written with a full
//! save, so removed content does not survive in an earlier revision.
//!
//! One failed field or region is logged and counted; the job goes on. Load,
//! sanitize and save failures end the job without output.
//!
//! Container formats built on XML text runs are handled by [`xml`] instead.

pub mod xml;

use crate::backend::{BackendLoader, DocumentBackend, FormField, SaveMode};
use crate::config::RedactionOptions;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::geometry::BoundingBox;
use crate::progress::{check_cancelled, report, CancellationToken, ProgressFn, Stage};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

/// Outcome of a redaction job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RedactionResult {
    /// Whether redacted bytes were produced
    pub success: bool,
    /// Redacted document, present only on success
    #[serde(skip)]
    pub bytes: Option<Vec<u8>>,
    /// Failure message
    pub error: Option<String>,
    /// Entities removed from the document
    pub redacted_count: usize,
    /// Field entities whose field could not be found
    pub skipped_count: usize,
    /// Entities whose backend operation failed
    pub failed_count: usize,
    /// Wall time of the job
    pub elapsed_ms: u64,
}

impl RedactionResult {
    fn failure(error: &Error, elapsed_ms: u64) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            elapsed_ms,
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    redacted: usize,
    skipped: usize,
    failed: usize,
}

/// Removes confirmed entities from a loaded document.
#[derive(Debug, Clone, Default)]
pub struct RedactionCoordinator {
    options: RedactionOptions,
}

impl RedactionCoordinator {
    /// Coordinator with the given options.
    pub fn new(options: RedactionOptions) -> Self {
        Self { options }
    }

    /// Options in use.
    pub fn options(&self) -> &RedactionOptions {
        &self.options
    }

    /// Load `bytes` with `loader` and redact the result.
    ///
    /// A load failure fails the job.
    pub fn redact_bytes(
        &self,
        loader: &dyn BackendLoader,
        bytes: &[u8],
        entities: &[Entity],
        progress: Option<ProgressFn<'_>>,
        cancel: Option<&CancellationToken>,
    ) -> RedactionResult {
        let started = Instant::now();
        match loader.load(bytes) {
            Ok(mut backend) => {
                let mut result = self.redact(backend.as_mut(), entities, progress, cancel);
                result.elapsed_ms = started.elapsed().as_millis() as u64;
                result
            }
            Err(e) => {
                log::error!("Document load failed: {}", e);
                RedactionResult::failure(&e, started.elapsed().as_millis() as u64)
            }
        }
    }

    /// Redact `entities` in `backend` and serialize the document.
    ///
    /// Entities that are not confirmed or modified are ignored.
    pub fn redact(
        &self,
        backend: &mut dyn DocumentBackend,
        entities: &[Entity],
        progress: Option<ProgressFn<'_>>,
        cancel: Option<&CancellationToken>,
    ) -> RedactionResult {
        let started = Instant::now();
        let mut tally = Tally::default();
        let outcome = self.run(backend, entities, progress, cancel, &mut tally);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(bytes) => {
                log::info!(
                    "Redaction finished: {} redacted, {} skipped, {} failed in {} ms",
                    tally.redacted,
                    tally.skipped,
                    tally.failed,
                    elapsed_ms
                );
                RedactionResult {
                    success: true,
                    bytes: Some(bytes),
                    error: None,
                    redacted_count: tally.redacted,
                    skipped_count: tally.skipped,
                    failed_count: tally.failed,
                    elapsed_ms,
                }
            }
            Err(e) => {
                log::error!("Redaction failed: {}", e);
                RedactionResult::failure(&e, elapsed_ms)
            }
        }
    }

    fn run(
        &self,
        backend: &mut dyn DocumentBackend,
        entities: &[Entity],
        progress: Option<ProgressFn<'_>>,
        cancel: Option<&CancellationToken>,
        tally: &mut Tally,
    ) -> Result<Vec<u8>> {
        let mut pages: BTreeMap<usize, Vec<&Entity>> = BTreeMap::new();
        for entity in entities {
            if entity.status.is_redactable() {
                pages.entry(entity.page()).or_default().push(entity);
            } else {
                log::debug!("Ignoring {:?} entity {}", entity.status, entity.id);
            }
        }

        let total = pages.len();
        for (done, (page, page_entities)) in pages.into_iter().enumerate() {
            check_cancelled(cancel)?;
            let (fields, texts): (Vec<&Entity>, Vec<&Entity>) =
                page_entities.into_iter().partition(|e| e.position.is_field());
            self.redact_fields(backend, page, &fields, tally);
            self.redact_texts(backend, page, &texts, tally);
            report(progress, Stage::Redact, done + 1, total);
        }
        check_cancelled(cancel)?;

        if self.options.sanitize {
            backend.sanitize().map_err(|e| Error::fatal("sanitize", e.to_string()))?;
        }
        backend
            .save(SaveMode::Full)
            .map_err(|e| Error::fatal("save", e.to_string()))
    }

    fn redact_fields(
        &self,
        backend: &mut dyn DocumentBackend,
        page: usize,
        entities: &[&Entity],
        tally: &mut Tally,
    ) {
        if entities.is_empty() {
            return;
        }
        let mut fields = match backend.list_form_fields(page) {
            Ok(fields) => fields,
            Err(e) => {
                log::warn!("Cannot list form fields on page {}: {}", page, e);
                tally.failed += entities.len();
                return;
            }
        };
        let mut deleted: Vec<String> = Vec::new();

        for entity in entities {
            let Some(field_id) = self.match_field(entity, &fields, &deleted) else {
                log::warn!(
                    "No form field matches entity {} on page {}; skipped",
                    entity.id,
                    page
                );
                tally.skipped += 1;
                continue;
            };
            if deleted.contains(&field_id) {
                tally.redacted += 1;
                continue;
            }
            match backend.delete_field(page, &field_id) {
                Ok(()) => {
                    log::debug!("Deleted form field '{}' on page {}", field_id, page);
                    fields.retain(|f| f.id != field_id);
                    deleted.push(field_id);
                    tally.redacted += 1;
                }
                Err(e) => {
                    log::warn!("Deleting form field '{}' failed: {}", field_id, e);
                    tally.failed += 1;
                }
            }
        }
    }

    /// Id of the field behind a field entity: exact id first, bounds second.
    fn match_field(&self, entity: &Entity, fields: &[FormField], deleted: &[String]) -> Option<String> {
        if let Some(id) = entity.position.source_field_id.as_deref() {
            if deleted.iter().any(|d| d == id) || fields.iter().any(|f| f.id == id) {
                return Some(id.to_string());
            }
        }
        fields
            .iter()
            .find(|f| f.bounds.approx_eq(&entity.position.bbox, self.options.field_tolerance))
            .map(|f| f.id.clone())
    }

    fn redact_texts(
        &self,
        backend: &mut dyn DocumentBackend,
        page: usize,
        entities: &[&Entity],
        tally: &mut Tally,
    ) {
        if entities.is_empty() {
            return;
        }
        let bounds = match backend.page_bounds(page) {
            Ok(bounds) => bounds,
            Err(e) => {
                log::warn!("Cannot read bounds of page {}: {}", page, e);
                tally.failed += entities.len();
                return;
            }
        };

        for entity in entities {
            let rect = self.region_rect(&entity.position.bbox, &bounds);
            let applied = backend
                .create_redaction_region(page, rect)
                .and_then(|region| backend.apply_content_removal(page, region));
            match applied {
                Ok(()) => tally.redacted += 1,
                Err(e) => {
                    log::warn!("Redacting entity {} on page {} failed: {}", entity.id, page, e);
                    tally.failed += 1;
                }
            }
        }
    }

    /// Entity box in the backend's top-left space, grown by the margin and
    /// clipped to the page.
    fn region_rect(&self, bbox: &BoundingBox, page: &BoundingBox) -> BoundingBox {
        bbox.expand(self.options.margin)
            .flip_y(page.height)
            .clip_to(page)
    }
}
