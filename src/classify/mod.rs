//! Statistical token classification support.
//!
//! The classifier model itself lives outside the crate behind [`TokenClassifier`].
//! This module owns everything around it: the [`ClassifierService`] lifecycle,
//! chunking page text into overlapping windows, aggregating raw tokens into
//! entities and deduplicating entities seen by more than one window.

pub mod aggregate;
pub mod chunk;

pub use aggregate::{AggregatedEntity, ClassifiedToken, TokenAggregator, CONTINUATION_MARKER};
pub use chunk::{chunk_text, TextChunk};

use crate::entity::EntityType;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One token as reported by the classifier.
///
/// Offsets are char offsets into the classified text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawToken {
    /// Surface form, possibly carrying a continuation marker
    pub word: String,
    /// BIO tag such as `B-PER`, `I-ORG` or `O`
    #[serde(alias = "entity")]
    pub tag: String,
    /// Classifier score
    pub score: f32,
    /// Start char offset
    pub start: usize,
    /// End char offset (exclusive)
    pub end: usize,
}

impl RawToken {
    /// Create a token.
    pub fn new(word: impl Into<String>, tag: impl Into<String>, score: f32, start: usize, end: usize) -> Self {
        Self {
            word: word.into(),
            tag: tag.into(),
            score,
            start,
            end,
        }
    }
}

/// How the tokens of one word are reduced to a single tag and score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStrategy {
    /// Tag and score of the word's first token
    #[default]
    First,
    /// Tag and score of the highest-scoring token
    Max,
    /// First token's tag, mean score
    Average,
}

/// Map a bare classifier tag to an entity type.
pub fn map_tag(tag: &str) -> EntityType {
    match tag.to_ascii_uppercase().as_str() {
        "PER" | "PERSON" => EntityType::Person,
        "ORG" | "ORGANIZATION" => EntityType::Organization,
        "LOC" | "GPE" | "LOCATION" => EntityType::Location,
        "ADDRESS" | "STREET" => EntityType::Address,
        "EMAIL" => EntityType::Email,
        "PHONE" | "TEL" => EntityType::Phone,
        "DATE" | "DOB" => EntityType::DateOfBirth,
        _ => EntityType::Other,
    }
}

/// A token classification model.
pub trait TokenClassifier {
    /// Classify one chunk of text.
    fn classify(&self, text: &str) -> Result<Vec<RawToken>>;
}

/// Lifecycle state of a [`ClassifierService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierState {
    /// No model loaded yet
    Uninitialized,
    /// Model loaded and usable
    Ready,
    /// Loading failed; initialization may be retried
    Failed(String),
    /// Disposed; the service cannot be used again
    Disposed,
}

/// Owns a classifier model and its lifecycle.
///
/// The service is created once by the host and passed to the pipeline; there is
/// no process-wide model instance.
pub struct ClassifierService {
    state: ClassifierState,
    model: Option<Box<dyn TokenClassifier>>,
}

impl std::fmt::Debug for ClassifierService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierService")
            .field("state", &self.state)
            .finish()
    }
}

impl Default for ClassifierService {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierService {
    /// Service without a model.
    pub fn new() -> Self {
        Self {
            state: ClassifierState::Uninitialized,
            model: None,
        }
    }

    /// Service wrapping an already loaded model.
    pub fn ready(model: Box<dyn TokenClassifier>) -> Self {
        Self {
            state: ClassifierState::Ready,
            model: Some(model),
        }
    }

    /// Load the model with `load`. A failure leaves the service in
    /// [`ClassifierState::Failed`].
    pub fn initialize<F>(&mut self, load: F) -> Result<()>
    where
        F: FnOnce() -> Result<Box<dyn TokenClassifier>>,
    {
        match self.state {
            ClassifierState::Ready => return Ok(()),
            ClassifierState::Disposed => {
                return Err(Error::ClassifierUnavailable("service disposed".to_string()))
            }
            _ => {}
        }
        match load() {
            Ok(model) => {
                log::info!("Token classifier ready");
                self.model = Some(model);
                self.state = ClassifierState::Ready;
                Ok(())
            }
            Err(e) => {
                log::warn!("Token classifier failed to load: {}", e);
                self.state = ClassifierState::Failed(e.to_string());
                Err(Error::ClassifierUnavailable(e.to_string()))
            }
        }
    }

    /// Current state.
    pub fn state(&self) -> &ClassifierState {
        &self.state
    }

    /// Whether `classify` can be called.
    pub fn is_ready(&self) -> bool {
        self.state == ClassifierState::Ready
    }

    /// Release the model.
    pub fn dispose(&mut self) {
        self.model = None;
        self.state = ClassifierState::Disposed;
    }

    /// Classify one chunk.
    pub fn classify(&self, text: &str) -> Result<Vec<RawToken>> {
        match (&self.state, &self.model) {
            (ClassifierState::Ready, Some(model)) => model.classify(text),
            (state, _) => Err(Error::ClassifierUnavailable(format!("classifier is {:?}", state))),
        }
    }
}

/// Drop entities repeated by overlapping chunks.
///
/// Entities are keyed by text, type and absolute start offset; the
/// highest-scoring copy of each key is kept, in first-seen order.
pub fn dedupe_entities(entities: Vec<AggregatedEntity>) -> Vec<AggregatedEntity> {
    let mut unique: IndexMap<(String, EntityType, usize), AggregatedEntity> = IndexMap::new();
    for entity in entities {
        let key = (entity.text.clone(), entity.entity_type, entity.start);
        match unique.get_mut(&key) {
            Some(existing) if existing.score >= entity.score => {}
            Some(existing) => *existing = entity,
            None => {
                unique.insert(key, entity);
            }
        }
    }
    unique.into_values().collect()
}
