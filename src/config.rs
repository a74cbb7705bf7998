//! Configuration for detection and redaction.
//!
//! All settings are plain values. The presentation layer can build them with the
//! `with_*` builders or hand them over as JSON through [`DetectionConfig::from_json`].

use crate::classify::AggregationStrategy;
use crate::entity::{Entity, EntityType};
use crate::error::{Error, Result};
use crate::locate::MAX_SEARCH_HITS;
use serde::{Deserialize, Serialize};

/// Confidence cut-offs for the three review tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    /// Minimum confidence of the high tier
    pub high: f32,
    /// Minimum confidence of the medium tier
    pub medium: f32,
    /// Minimum confidence of the low tier
    pub low: f32,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.9,
            medium: 0.7,
            low: 0.5,
        }
    }
}

impl ConfidenceThresholds {
    /// Tier of a confidence value, `None` below the low cut-off.
    pub fn tier(&self, confidence: f32) -> Option<ConfidenceTier> {
        if confidence >= self.high {
            Some(ConfidenceTier::High)
        } else if confidence >= self.medium {
            Some(ConfidenceTier::Medium)
        } else if confidence >= self.low {
            Some(ConfidenceTier::Low)
        } else {
            None
        }
    }

    fn validate(&self) -> Result<()> {
        let in_range = |v: f32| (0.0..=1.0).contains(&v);
        if !(in_range(self.high) && in_range(self.medium) && in_range(self.low)) {
            return Err(Error::InvalidConfig(
                "confidence thresholds must lie in [0, 1]".to_string(),
            ));
        }
        if !(self.low <= self.medium && self.medium <= self.high) {
            return Err(Error::InvalidConfig(format!(
                "confidence thresholds must satisfy low <= medium <= high (got {}/{}/{})",
                self.low, self.medium, self.high
            )));
        }
        Ok(())
    }
}

/// Review tier of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    /// Below the medium cut-off
    Low,
    /// Between medium and high
    Medium,
    /// At or above the high cut-off
    High,
}

/// How eagerly low-confidence detections are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggressiveness {
    /// Only high-tier detections
    Conservative,
    /// Medium tier and above
    #[default]
    Balanced,
    /// Everything from the low tier up
    Aggressive,
}

impl Aggressiveness {
    /// Minimum confidence this level lets through.
    pub fn min_confidence(&self, thresholds: &ConfidenceThresholds) -> f32 {
        match self {
            Aggressiveness::Conservative => thresholds.high,
            Aggressiveness::Balanced => thresholds.medium,
            Aggressiveness::Aggressive => thresholds.low,
        }
    }
}

/// Classifier input windowing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window length in chars
    pub chunk_chars: usize,
    /// Overlap between consecutive windows in chars
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 1500,
            overlap_chars: 200,
        }
    }
}

/// Tunable reconciliation constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Boxes overlapping at least this much are the same detection
    pub iou_threshold: f32,
    /// Max per-dimension difference for same-text duplicates
    pub position_tolerance: f32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.8,
            position_tolerance: 5.0,
        }
    }
}

/// Detection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Entity types to surface; empty means all
    pub enabled_entity_types: Vec<EntityType>,
    /// Tier cut-offs
    pub thresholds: ConfidenceThresholds,
    /// Tier selection
    pub aggressiveness: Aggressiveness,
    /// Run the statistical classifier pass when a classifier is ready
    pub use_classifier: bool,
    /// Strip metadata and hidden content before saving
    pub sanitize: bool,
    /// Subword reduction strategy
    pub aggregation: AggregationStrategy,
    /// Classifier windowing
    pub chunking: ChunkingConfig,
    /// Reconciliation constants
    pub reconcile: ReconcileConfig,
    /// Hits requested from the backend per search
    pub max_search_hits: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionConfig {
    /// Create configuration with defaults.
    pub fn new() -> Self {
        Self {
            enabled_entity_types: Vec::new(),
            thresholds: ConfidenceThresholds::default(),
            aggressiveness: Aggressiveness::default(),
            use_classifier: false,
            sanitize: true,
            aggregation: AggregationStrategy::default(),
            chunking: ChunkingConfig::default(),
            reconcile: ReconcileConfig::default(),
            max_search_hits: MAX_SEARCH_HITS,
        }
    }

    /// Parse and validate configuration from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: DetectionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        if self.chunking.chunk_chars == 0 {
            return Err(Error::InvalidConfig("chunk_chars must be positive".to_string()));
        }
        if self.chunking.overlap_chars >= self.chunking.chunk_chars {
            return Err(Error::InvalidConfig(format!(
                "overlap_chars ({}) must be smaller than chunk_chars ({})",
                self.chunking.overlap_chars, self.chunking.chunk_chars
            )));
        }
        if !(0.0..=1.0).contains(&self.reconcile.iou_threshold) {
            return Err(Error::InvalidConfig("iou_threshold must lie in [0, 1]".to_string()));
        }
        if self.max_search_hits == 0 {
            return Err(Error::InvalidConfig("max_search_hits must be positive".to_string()));
        }
        Ok(())
    }

    /// Restrict detection to the given types.
    pub fn with_entity_types(mut self, types: Vec<EntityType>) -> Self {
        self.enabled_entity_types = types;
        self
    }

    /// Set the aggressiveness level.
    pub fn with_aggressiveness(mut self, level: Aggressiveness) -> Self {
        self.aggressiveness = level;
        self
    }

    /// Set the tier cut-offs.
    pub fn with_thresholds(mut self, thresholds: ConfidenceThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Enable the classifier pass.
    pub fn with_classifier(mut self, enable: bool) -> Self {
        self.use_classifier = enable;
        self
    }

    /// Enable metadata sanitization on save.
    pub fn with_sanitize(mut self, enable: bool) -> Self {
        self.sanitize = enable;
        self
    }

    /// Set the subword reduction strategy.
    pub fn with_aggregation(mut self, strategy: AggregationStrategy) -> Self {
        self.aggregation = strategy;
        self
    }

    /// Set classifier windowing.
    pub fn with_chunking(mut self, chunk_chars: usize, overlap_chars: usize) -> Self {
        self.chunking = ChunkingConfig {
            chunk_chars,
            overlap_chars,
        };
        self
    }

    /// Set the number of hits requested per search.
    pub fn with_max_search_hits(mut self, max_hits: usize) -> Self {
        self.max_search_hits = max_hits;
        self
    }

    /// Whether the entity type is enabled.
    pub fn is_type_enabled(&self, entity_type: EntityType) -> bool {
        self.enabled_entity_types.is_empty() || self.enabled_entity_types.contains(&entity_type)
    }

    /// Minimum confidence surfaced for review.
    pub fn min_confidence(&self) -> f32 {
        self.aggressiveness.min_confidence(&self.thresholds)
    }

    /// Whether an entity passes type and confidence filtering.
    pub fn accepts(&self, entity: &Entity) -> bool {
        self.is_type_enabled(entity.entity_type) && entity.confidence >= self.min_confidence()
    }
}

/// Settings for the destructive redaction pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionOptions {
    /// Extra space around each text box, in page units
    pub margin: f32,
    /// Max per-dimension difference when matching a field by its bounds
    pub field_tolerance: f32,
    /// Run the backend's sanitize step before the final save
    pub sanitize: bool,
}

impl Default for RedactionOptions {
    fn default() -> Self {
        Self {
            margin: 1.0,
            field_tolerance: 1.0,
            sanitize: true,
        }
    }
}

impl RedactionOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the box margin.
    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin.max(0.0);
        self
    }

    /// Enable or disable sanitization.
    pub fn with_sanitize(mut self, enable: bool) -> Self {
        self.sanitize = enable;
        self
    }
}

impl From<&DetectionConfig> for RedactionOptions {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            sanitize: config.sanitize,
            ..Self::default()
        }
    }
}
