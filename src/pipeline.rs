//! Staged detection over a whole document.
//!
//! ```text
//! page text ──► script sample ──► pattern pass ─┐
//!                                 field values ─┼─► locate ──► reconcile ──► review filter
//!                 classifier pass (chunked) ────┘
//! ```
//!
//! Every stage walks the document page by page (or chunk by chunk for the
//! classifier), reports [`Progress`](crate::progress::Progress) after each unit
//! and checks the cancellation token before the next one. Per-item problems
//! never stop the run: validator rejections, locator misses and an unavailable
//! classifier are counted in [`DetectionStats`] and logged.

use crate::backend::DocumentBackend;
use crate::classify::{chunk_text, dedupe_entities, AggregatedEntity, ClassifierService, TokenAggregator};
use crate::config::{ConfidenceTier, DetectionConfig};
use crate::entity::{DetectionMethod, Entity, EntityType, Position};
use crate::error::{Error, Result};
use crate::locate::SpanLocator;
use crate::patterns::script::SAMPLE_CHARS;
use crate::patterns::{PatternCatalog, ScriptClassifier, ScriptSet};
use crate::progress::{check_cancelled, report, CancellationToken, ProgressFn, Stage};
use crate::reconcile::{filter_for_review, EntityReconciler};
use crate::text::{char_slice, context_snippet, SNIPPET_RADIUS};
use serde::Serialize;

/// Counters collected during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectionStats {
    /// Pages processed
    pub pages: usize,
    /// Pattern matches in page text
    pub pattern_matches: usize,
    /// Pattern hits rejected by a validator
    pub validator_rejections: usize,
    /// Entities found in form field values
    pub field_entities: usize,
    /// Chunks sent to the classifier
    pub classifier_chunks: usize,
    /// Classifier entities after deduplication
    pub classifier_entities: usize,
    /// Whether the classifier pass was requested but could not run
    pub classifier_skipped: bool,
    /// Candidates given a position
    pub located: usize,
    /// Candidates dropped because no position was found
    pub locator_misses: usize,
    /// Entities folded together by reconciliation
    pub merged: usize,
    /// Entities removed by the review filter
    pub filtered: usize,
    /// Surfaced entities per review tier
    pub tiers: TierCounts,
}

/// Surfaced entities per confidence tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    /// At or above the high cut-off
    pub high: usize,
    /// Between medium and high
    pub medium: usize,
    /// Between low and medium
    pub low: usize,
}

impl TierCounts {
    fn record(&mut self, tier: Option<ConfidenceTier>) {
        match tier {
            Some(ConfidenceTier::High) => self.high += 1,
            Some(ConfidenceTier::Medium) => self.medium += 1,
            Some(ConfidenceTier::Low) => self.low += 1,
            None => {}
        }
    }
}

/// Output of a run.
#[derive(Debug, Clone, Default)]
pub struct DetectionReport {
    /// Entities for review, most confident first
    pub entities: Vec<Entity>,
    /// Counters
    pub stats: DetectionStats,
    /// Scripts detected in the document sample
    pub scripts: ScriptSet,
}

/// A text span waiting for a position.
#[derive(Debug, Clone)]
struct Candidate {
    text: String,
    entity_type: EntityType,
    confidence: f32,
    start: usize,
    method: DetectionMethod,
    context: String,
}

/// Detection over a loaded document.
///
/// The pipeline borrows the classifier service; the host owns its lifecycle.
pub struct DetectionPipeline<'a> {
    config: DetectionConfig,
    catalog: PatternCatalog,
    locator: SpanLocator,
    classifier: Option<&'a ClassifierService>,
}

impl<'a> DetectionPipeline<'a> {
    /// Pipeline with the built-in patterns.
    pub fn new(config: DetectionConfig) -> Self {
        let locator = SpanLocator::new().with_max_hits(config.max_search_hits);
        Self {
            config,
            catalog: PatternCatalog::new(),
            locator,
            classifier: None,
        }
    }

    /// Use a catalog holding user patterns.
    pub fn with_catalog(mut self, catalog: PatternCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Attach a classifier service.
    pub fn with_classifier(mut self, classifier: &'a ClassifierService) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// The pattern catalog, for adding or removing user patterns between runs.
    pub fn catalog_mut(&mut self) -> &mut PatternCatalog {
        &mut self.catalog
    }

    /// Detect entities in `backend`, whose page `i` has the extracted text
    /// `pages[i]`.
    pub fn run(
        &mut self,
        backend: &dyn DocumentBackend,
        pages: &[String],
        progress: Option<ProgressFn<'_>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<DetectionReport> {
        self.config.validate()?;
        let mut stats = DetectionStats {
            pages: pages.len(),
            ..DetectionStats::default()
        };

        let scripts = document_scripts(pages);
        log::info!("Detecting entities in {} pages, scripts {:?}", pages.len(), scripts);

        let mut candidates: Vec<Vec<Candidate>> = vec![Vec::new(); pages.len()];
        let mut entities: Vec<Entity> = Vec::new();

        for (page, text) in pages.iter().enumerate() {
            check_cancelled(cancel)?;
            let outcome = self.catalog.scan(text, scripts);
            stats.pattern_matches += outcome.matches.len();
            stats.validator_rejections += outcome.rejected;
            candidates[page].extend(outcome.matches.into_iter().map(|m| Candidate {
                text: m.text,
                entity_type: m.entity_type,
                confidence: m.confidence,
                start: m.start,
                method: DetectionMethod::Pattern,
                context: m.context,
            }));

            let fields = self.field_entities(backend, page, scripts);
            stats.field_entities += fields.len();
            entities.extend(fields);
            report(progress, Stage::Patterns, page + 1, pages.len());
        }

        if self.config.use_classifier {
            match self.classifier.filter(|service| service.is_ready()) {
                Some(service) => {
                    self.classifier_pass(service, pages, &mut candidates, &mut stats, progress, cancel)?
                }
                None => {
                    log::warn!("Classifier pass requested but no classifier is ready; using patterns only");
                    stats.classifier_skipped = true;
                }
            }
        }

        for (page, page_candidates) in candidates.into_iter().enumerate() {
            check_cancelled(cancel)?;
            let text = &pages[page];
            for candidate in page_candidates {
                match self.locator.locate(backend, page, text, candidate.start, &candidate.text) {
                    Some(outcome) => {
                        stats.located += 1;
                        let position = Position::text(page, outcome.bbox, candidate.start);
                        if let Some(entity) = Entity::new(
                            candidate.text,
                            candidate.entity_type,
                            candidate.confidence,
                            position,
                            candidate.method,
                        ) {
                            entities.push(entity.with_context(candidate.context));
                        }
                    }
                    None => {
                        log::debug!("No position for '{}' on page {}; dropped", candidate.text, page);
                        stats.locator_misses += 1;
                    }
                }
            }
            report(progress, Stage::Locate, page + 1, pages.len());
        }

        let reconciled = EntityReconciler::new(self.config.reconcile).reconcile(entities);
        stats.merged = reconciled.merged;
        let before = reconciled.entities.len();
        let entities = filter_for_review(reconciled.entities, &self.config);
        stats.filtered = before - entities.len();
        for entity in &entities {
            stats.tiers.record(self.config.thresholds.tier(entity.confidence));
        }

        log::info!(
            "Detection finished: {} entities ({} merged, {} filtered, {} unlocated)",
            entities.len(),
            stats.merged,
            stats.filtered,
            stats.locator_misses
        );
        Ok(DetectionReport {
            entities,
            stats,
            scripts,
        })
    }

    /// Pattern matches in form field values. These carry the field's bounds and
    /// id, not a text offset.
    fn field_entities(&mut self, backend: &dyn DocumentBackend, page: usize, scripts: ScriptSet) -> Vec<Entity> {
        let fields = match backend.list_form_fields(page) {
            Ok(fields) => fields,
            Err(e) => {
                log::warn!("Cannot list form fields on page {}: {}", page, e);
                return Vec::new();
            }
        };

        let mut entities = Vec::new();
        for field in fields.iter().filter(|f| !f.value.trim().is_empty()) {
            for m in self.catalog.scan(&field.value, scripts).matches {
                let position = Position::field(page, field.bounds, field.id.clone());
                let context = if field.label.is_empty() {
                    m.context
                } else {
                    format!("{}: {}", field.label, field.value)
                };
                if let Some(entity) = Entity::new(m.text, m.entity_type, m.confidence, position, DetectionMethod::Pattern) {
                    entities.push(entity.with_context(context));
                }
            }
        }
        entities
    }

    fn classifier_pass(
        &self,
        service: &ClassifierService,
        pages: &[String],
        candidates: &mut [Vec<Candidate>],
        stats: &mut DetectionStats,
        progress: Option<ProgressFn<'_>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<()> {
        let chunking = self.config.chunking;
        let chunked: Vec<_> = pages
            .iter()
            .map(|text| chunk_text(text, chunking.chunk_chars, chunking.overlap_chars))
            .collect();
        let total: usize = chunked.iter().map(Vec::len).sum();
        let aggregator = TokenAggregator::new(self.config.aggregation);

        let mut done = 0;
        for (page, chunks) in chunked.iter().enumerate() {
            let mut found: Vec<AggregatedEntity> = Vec::new();
            for chunk in chunks {
                check_cancelled(cancel)?;
                let tokens = match service.classify(&chunk.text) {
                    Ok(tokens) => tokens,
                    Err(Error::ClassifierUnavailable(reason)) => {
                        log::warn!("Classifier became unavailable: {}; skipping remaining chunks", reason);
                        stats.classifier_skipped = true;
                        return Ok(());
                    }
                    Err(e) => {
                        log::warn!("Classifier failed on page {} chunk at {}: {}", page, chunk.start, e);
                        Vec::new()
                    }
                };
                stats.classifier_chunks += 1;
                found.extend(aggregator.aggregate(&tokens).into_iter().map(|mut entity| {
                    entity.start += chunk.start;
                    entity.end += chunk.start;
                    entity
                }));
                done += 1;
                report(progress, Stage::Classifier, done, total);
            }

            let text = &pages[page];
            for entity in dedupe_entities(found) {
                stats.classifier_entities += 1;
                // Prefer the page text over the joined token text so search finds it.
                let span = char_slice(text, entity.start, entity.end);
                let span = if span.trim().is_empty() { entity.text.as_str() } else { span };
                candidates[page].push(Candidate {
                    text: span.to_string(),
                    entity_type: entity.entity_type,
                    confidence: entity.score,
                    start: entity.start,
                    method: DetectionMethod::Classifier,
                    context: context_snippet(text, entity.start, entity.end, SNIPPET_RADIUS),
                });
            }
        }
        Ok(())
    }
}

/// Scripts of the first [`SAMPLE_CHARS`] chars of the document.
fn document_scripts(pages: &[String]) -> ScriptSet {
    let mut sample = String::new();
    let mut taken = 0;
    for text in pages {
        if taken >= SAMPLE_CHARS {
            break;
        }
        sample.extend(text.chars().take(SAMPLE_CHARS - taken));
        sample.push('\n');
        taken += text.chars().count().min(SAMPLE_CHARS - taken);
    }
    ScriptClassifier::classify(&sample).scripts
}
