//! Detected entity model and review state.
//!
//! Entities are created by the pattern catalog and the token aggregator, positioned
//! by the span locator, merged by the reconciler and finally confirmed or rejected
//! during human review. The redaction coordinator only reads them.

use crate::geometry::BoundingBox;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Sentinel source offset for entities that do not come from page text
/// (form field values).
pub const NO_SOURCE_OFFSET: i64 = -1;

/// Closed set of sensitive entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Person name
    Person,
    /// Organization name
    Organization,
    /// Geographic location
    Location,
    /// Postal address
    Address,
    /// Email address
    Email,
    /// Telephone number
    Phone,
    /// US Social Security Number
    Ssn,
    /// Payment card number
    CreditCard,
    /// International bank account number
    Iban,
    /// IP address
    IpAddress,
    /// Date of birth
    DateOfBirth,
    /// National identity number (non-US)
    NationalId,
    /// Passport number
    Passport,
    /// Match of a user-defined pattern
    Custom,
    /// Generic fallback for unmapped classifier labels
    Other,
}

impl EntityType {
    /// All entity types, in declaration order.
    pub const ALL: [EntityType; 15] = [
        EntityType::Person,
        EntityType::Organization,
        EntityType::Location,
        EntityType::Address,
        EntityType::Email,
        EntityType::Phone,
        EntityType::Ssn,
        EntityType::CreditCard,
        EntityType::Iban,
        EntityType::IpAddress,
        EntityType::DateOfBirth,
        EntityType::NationalId,
        EntityType::Passport,
        EntityType::Custom,
        EntityType::Other,
    ];

    /// Upper-case label, used for placeholders written into redacted text.
    pub fn label(&self) -> &'static str {
        match self {
            EntityType::Person => "PERSON",
            EntityType::Organization => "ORGANIZATION",
            EntityType::Location => "LOCATION",
            EntityType::Address => "ADDRESS",
            EntityType::Email => "EMAIL",
            EntityType::Phone => "PHONE",
            EntityType::Ssn => "SSN",
            EntityType::CreditCard => "CREDIT_CARD",
            EntityType::Iban => "IBAN",
            EntityType::IpAddress => "IP_ADDRESS",
            EntityType::DateOfBirth => "DATE_OF_BIRTH",
            EntityType::NationalId => "NATIONAL_ID",
            EntityType::Passport => "PASSPORT",
            EntityType::Custom => "CUSTOM",
            EntityType::Other => "OTHER",
        }
    }

    /// Placeholder text written in place of a removed entity, e.g. `[EMAIL]`.
    pub fn placeholder(&self) -> String {
        format!("[{}]", self.label())
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How an entity was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Regular-expression pattern catalog
    Pattern,
    /// Statistical token classifier
    Classifier,
    /// Added by the user during review
    Manual,
}

impl DetectionMethod {
    /// Preference when two methods report the same span; higher wins.
    pub(crate) fn merge_rank(&self) -> u8 {
        match self {
            DetectionMethod::Classifier => 2,
            DetectionMethod::Manual => 1,
            DetectionMethod::Pattern => 0,
        }
    }
}

/// Review status of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    /// Awaiting review
    #[default]
    Pending,
    /// Confirmed for redaction
    Confirmed,
    /// Rejected by the reviewer
    Rejected,
    /// Edited by the reviewer; redacted with the edited values
    Modified,
}

impl EntityStatus {
    /// Whether an entity with this status is redacted.
    pub fn is_redactable(&self) -> bool {
        matches!(self, EntityStatus::Confirmed | EntityStatus::Modified)
    }
}

/// Stable entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an entity sits in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Page index (0-based)
    pub page_index: usize,
    /// Page-relative box, bottom-left origin
    pub bbox: BoundingBox,
    /// Char index into the page text, or [`NO_SOURCE_OFFSET`]
    pub source_offset: i64,
    /// Interactive field identifier for entities found in form field values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_field_id: Option<String>,
}

impl Position {
    /// Position of a span of page text.
    pub fn text(page_index: usize, bbox: BoundingBox, source_offset: usize) -> Self {
        Self {
            page_index,
            bbox,
            source_offset: source_offset as i64,
            source_field_id: None,
        }
    }

    /// Position of an interactive form field.
    pub fn field(page_index: usize, bbox: BoundingBox, field_id: impl Into<String>) -> Self {
        Self {
            page_index,
            bbox,
            source_offset: NO_SOURCE_OFFSET,
            source_field_id: Some(field_id.into()),
        }
    }

    /// Whether this position refers to a form field rather than page text.
    pub fn is_field(&self) -> bool {
        self.source_field_id.is_some()
    }

    /// Char offset into the page text, if this is a text position.
    pub fn text_offset(&self) -> Option<usize> {
        usize::try_from(self.source_offset).ok()
    }
}

/// A detected sensitive span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier
    pub id: EntityId,
    /// Matched text, never empty
    pub text: String,
    /// Entity type
    pub entity_type: EntityType,
    /// Confidence in [0, 1]
    pub confidence: f32,
    /// On-page position
    pub position: Position,
    /// Detection source
    pub method: DetectionMethod,
    /// Review status
    pub status: EntityStatus,
    /// Surrounding text shown to the reviewer
    pub context_snippet: String,
}

impl Entity {
    /// Create a pending entity.
    ///
    /// Returns `None` when `text` is empty. The confidence is clamped into [0, 1].
    pub fn new(
        text: impl Into<String>,
        entity_type: EntityType,
        confidence: f32,
        position: Position,
        method: DetectionMethod,
    ) -> Option<Self> {
        let text = text.into();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            id: EntityId::new(),
            text,
            entity_type,
            confidence: clamp_confidence(confidence),
            position,
            method,
            status: EntityStatus::Pending,
            context_snippet: String::new(),
        })
    }

    /// Attach a context snippet.
    pub fn with_context(mut self, snippet: impl Into<String>) -> Self {
        self.context_snippet = snippet.into();
        self
    }

    /// Replace the confidence, keeping it clamped.
    pub fn set_confidence(&mut self, confidence: f32) {
        self.confidence = clamp_confidence(confidence);
    }

    /// Page the entity lives on.
    pub fn page(&self) -> usize {
        self.position.page_index
    }
}

/// Clamp a confidence value into [0, 1]. NaN maps to 0.
pub fn clamp_confidence(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Per-type and per-status entity counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewSummary {
    /// Entity count per type
    pub by_type: IndexMap<EntityType, usize>,
    /// Pending entities
    pub pending: usize,
    /// Confirmed entities
    pub confirmed: usize,
    /// Rejected entities
    pub rejected: usize,
    /// Modified entities
    pub modified: usize,
}

/// The canonical entity list handed to the review layer.
///
/// Status changes go through [`ReviewSet::confirm`], [`ReviewSet::reject`] and
/// [`ReviewSet::modify`]; unknown ids are ignored.
#[derive(Debug, Clone, Default)]
pub struct ReviewSet {
    entities: IndexMap<EntityId, Entity>,
}

impl ReviewSet {
    /// Build a review set from reconciled entities.
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities: entities.into_iter().map(|e| (e.id, e)).collect(),
        }
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Look up an entity.
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Iterate in detection order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Mark entities as confirmed. Returns how many ids were known.
    pub fn confirm(&mut self, ids: &[EntityId]) -> usize {
        self.set_status(ids, EntityStatus::Confirmed)
    }

    /// Mark entities as rejected. Returns how many ids were known.
    pub fn reject(&mut self, ids: &[EntityId]) -> usize {
        self.set_status(ids, EntityStatus::Rejected)
    }

    /// Confirm every pending entity.
    pub fn confirm_all_pending(&mut self) -> usize {
        let mut count = 0;
        for entity in self.entities.values_mut() {
            if entity.status == EntityStatus::Pending {
                entity.status = EntityStatus::Confirmed;
                count += 1;
            }
        }
        count
    }

    /// Edit an entity's text and box. The entity becomes `Modified`.
    ///
    /// Returns `false` for unknown ids or empty text.
    pub fn modify(&mut self, id: &EntityId, text: impl Into<String>, bbox: BoundingBox) -> bool {
        let text = text.into();
        if text.is_empty() {
            return false;
        }
        match self.entities.get_mut(id) {
            Some(entity) => {
                entity.text = text;
                entity.position.bbox = bbox;
                entity.status = EntityStatus::Modified;
                true
            },
            None => false,
        }
    }

    /// Add an entity drawn by the reviewer. It is confirmed immediately.
    pub fn add_manual(
        &mut self,
        text: impl Into<String>,
        entity_type: EntityType,
        position: Position,
    ) -> Option<EntityId> {
        let mut entity = Entity::new(text, entity_type, 1.0, position, DetectionMethod::Manual)?;
        entity.status = EntityStatus::Confirmed;
        let id = entity.id;
        self.entities.insert(id, entity);
        Some(id)
    }

    /// Entities that will be redacted (confirmed or modified).
    pub fn confirmed(&self) -> Vec<Entity> {
        self.entities
            .values()
            .filter(|e| e.status.is_redactable())
            .cloned()
            .collect()
    }

    /// Count entities per type and status.
    pub fn summary(&self) -> ReviewSummary {
        let mut summary = ReviewSummary::default();
        for entity in self.entities.values() {
            *summary.by_type.entry(entity.entity_type).or_insert(0) += 1;
            match entity.status {
                EntityStatus::Pending => summary.pending += 1,
                EntityStatus::Confirmed => summary.confirmed += 1,
                EntityStatus::Rejected => summary.rejected += 1,
                EntityStatus::Modified => summary.modified += 1,
            }
        }
        summary
    }

    /// Consume the set, returning entities in detection order.
    pub fn into_entities(self) -> Vec<Entity> {
        self.entities.into_values().collect()
    }

    fn set_status(&mut self, ids: &[EntityId], status: EntityStatus) -> usize {
        let mut count = 0;
        for id in ids {
            if let Some(entity) = self.entities.get_mut(id) {
                entity.status = status;
                count += 1;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(text: &str, confidence: f32) -> Entity {
        Entity::new(
            text,
            EntityType::Email,
            confidence,
            Position::text(0, BoundingBox::new(0.0, 0.0, 10.0, 10.0), 0),
            DetectionMethod::Pattern,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_text_rejected() {
        let pos = Position::text(0, BoundingBox::default(), 0);
        assert!(Entity::new("", EntityType::Email, 0.5, pos, DetectionMethod::Pattern).is_none());
    }

    #[test]
    fn test_confidence_clamped() {
        assert_eq!(sample("a@b.co", 1.7).confidence, 1.0);
        assert_eq!(sample("a@b.co", -0.2).confidence, 0.0);
        assert_eq!(sample("a@b.co", f32::NAN).confidence, 0.0);
    }

    #[test]
    fn test_field_position_uses_sentinel() {
        let pos = Position::field(2, BoundingBox::default(), "ssn_field");
        assert!(pos.is_field());
        assert_eq!(pos.source_offset, NO_SOURCE_OFFSET);
        assert_eq!(pos.text_offset(), None);
    }

    #[test]
    fn test_placeholder_label() {
        assert_eq!(EntityType::CreditCard.placeholder(), "[CREDIT_CARD]");
        assert_eq!(EntityType::Ssn.to_string(), "SSN");
    }

    #[test]
    fn test_review_confirm_and_reject() {
        let a = sample("a@b.co", 0.9);
        let b = sample("c@d.co", 0.9);
        let (ida, idb) = (a.id, b.id);
        let mut set = ReviewSet::new(vec![a, b]);

        assert_eq!(set.confirm(&[ida, EntityId::new()]), 1);
        assert_eq!(set.reject(&[idb]), 1);

        let confirmed = set.confirmed();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].id, ida);

        let summary = set.summary();
        assert_eq!(summary.confirmed, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.by_type[&EntityType::Email], 2);
    }

    #[test]
    fn test_modify_marks_redactable() {
        let a = sample("a@b.co", 0.9);
        let id = a.id;
        let mut set = ReviewSet::new(vec![a]);
        assert!(set.modify(&id, "a@b.com", BoundingBox::new(1.0, 1.0, 20.0, 10.0)));
        assert!(!set.modify(&id, "", BoundingBox::default()));

        let entity = set.get(&id).unwrap();
        assert_eq!(entity.status, EntityStatus::Modified);
        assert_eq!(entity.text, "a@b.com");
        assert_eq!(set.confirmed().len(), 1);
    }

    #[test]
    fn test_manual_entity_is_confirmed() {
        let mut set = ReviewSet::default();
        let id = set
            .add_manual(
                "Project Falcon",
                EntityType::Custom,
                Position::text(0, BoundingBox::new(0.0, 0.0, 5.0, 5.0), 3),
            )
            .unwrap();
        let entity = set.get(&id).unwrap();
        assert_eq!(entity.method, DetectionMethod::Manual);
        assert_eq!(entity.status, EntityStatus::Confirmed);
    }
}
