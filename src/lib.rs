// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::new_without_default)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # docveil
//!
//! Detection, aggregation and redaction core for client-side document privacy.
//!
//! ## Core Features
//!
//! ### Detection
//! - **Pattern Catalog**: built-in and user-defined regular expressions with
//!   checksum validators (Luhn, IBAN mod-97, national identifiers) and keyword
//!   context boosts
//! - **Script Awareness**: patterns for CJK, Cyrillic or Hangul numbers only fire
//!   in documents written in those scripts
//! - **Token Classifier Support**: BIO token aggregation over overlapping text
//!   chunks with sub-word merging and document-level deduplication
//! - **Span Location**: literal search with soft-hyphen recovery, multi-line quad
//!   merging and a text-run fallback
//! - **Reconciliation**: overlapping detections from different sources collapse
//!   into one canonical entity list for review
//!
//! ### Redaction
//! - **Content Removal**: redaction regions remove content instead of covering it,
//!   followed by a full (non-incremental) save
//! - **Form Fields**: sensitive field values are deleted with their field
//! - **XML Containers**: text-node splicing with type placeholders for DOCX
//!   (feature `office`)
//!
//! ## Architecture
//! - **Backend Contract**: container formats stay behind [`backend::DocumentBackend`]
//! - **Explicit State**: the classifier service and pattern cache are values owned
//!   by the caller, not globals
//! - **Cooperative Jobs**: progress callbacks and cancellation between pages
//!
//! ## Quick Start
//!
//! ```
//! use docveil::backend::MemoryBackend;
//! use docveil::{DetectionConfig, DetectionPipeline, RedactionCoordinator, ReviewSet};
//!
//! # fn main() -> docveil::Result<()> {
//! let mut backend = MemoryBackend::new().with_text_page("Contact: john@example.com");
//! let pages = vec!["Contact: john@example.com".to_string()];
//!
//! let report = DetectionPipeline::new(DetectionConfig::default()).run(&backend, &pages, None, None)?;
//! let mut review = ReviewSet::new(report.entities);
//! review.confirm_all_pending();
//!
//! let result = RedactionCoordinator::default().redact(&mut backend, &review.confirmed(), None, None);
//! assert!(result.success);
//! assert_eq!(result.redacted_count, 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Data model
pub mod entity;
pub mod geometry;

// Configuration
pub mod config;

// Text utilities
pub mod text;

// Detection
pub mod classify;
pub mod locate;
pub mod patterns;
pub mod reconcile;

// Document access
pub mod backend;

// Redaction
pub mod redact;

// Orchestration
pub mod pipeline;
pub mod progress;

// Office containers (optional)
#[cfg(feature = "office")]
#[cfg_attr(docsrs, doc(cfg(feature = "office")))]
pub mod office;

// Re-exports
pub use backend::{BackendLoader, DocumentBackend};
pub use classify::{AggregationStrategy, ClassifierService, TokenClassifier};
pub use config::{Aggressiveness, ConfidenceThresholds, ConfidenceTier, DetectionConfig, RedactionOptions};
pub use entity::{
    DetectionMethod, Entity, EntityId, EntityStatus, EntityType, Position, ReviewSet,
};
pub use error::{Error, Result};
pub use geometry::BoundingBox;
pub use patterns::{PatternCatalog, UserPattern};
pub use pipeline::{DetectionPipeline, DetectionReport, DetectionStats, TierCounts};
pub use progress::{CancellationToken, Progress, Stage};
pub use reconcile::EntityReconciler;
pub use redact::{RedactionCoordinator, RedactionResult};
