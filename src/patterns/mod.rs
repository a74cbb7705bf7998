//! Pattern-based detection.
//!
//! The [`PatternCatalog`] holds the built-in definitions plus any user patterns and
//! scans page text for candidate spans. Each definition may be restricted to a set
//! of scripts; the [`ScriptClassifier`] decides which scripts a document contains so
//! that, for example, the Chinese mobile-number pattern never fires on an English
//! invoice full of order numbers.
//!
//! A match is emitted only when the regex matches and the optional validator
//! accepts. Validator rejections are counted, not reported as errors.
//!
//! # Example
//!
//! ```
//! use docveil::patterns::{PatternCatalog, ScriptClassifier};
//! use docveil::EntityType;
//!
//! let text = "Contact: john@example.com, SSN 123-45-6789";
//! let scripts = ScriptClassifier::classify(text).scripts;
//!
//! let mut catalog = PatternCatalog::new();
//! let outcome = catalog.scan(text, scripts);
//!
//! assert_eq!(outcome.matches.len(), 2);
//! assert_eq!(outcome.matches[0].entity_type, EntityType::Email);
//! assert_eq!(outcome.matches[1].entity_type, EntityType::Ssn);
//! ```

mod builtin;
pub mod script;
pub mod validators;

pub use builtin::builtin_patterns;
pub use script::{Script, ScriptClassifier, ScriptProfile, ScriptSet};
pub use validators::Validator;

use crate::entity::{clamp_confidence, EntityType};
use crate::error::{Error, Result};
use crate::text::{context_snippet, OffsetMap, SNIPPET_RADIUS};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Context window used when a user pattern does not specify one.
pub const DEFAULT_CONTEXT_WINDOW: usize = 50;

/// Boost applied to user patterns whose keywords are found.
pub const DEFAULT_CONFIDENCE_BOOST: f32 = 1.2;

/// A compiled detection pattern.
#[derive(Debug, Clone)]
pub struct PatternDefinition {
    /// Unique name
    pub name: String,
    /// Type assigned to matches
    pub entity_type: EntityType,
    /// Compiled matcher
    pub matcher: Regex,
    /// Confidence before any context boost
    pub base_confidence: f32,
    /// Structural check run on the matched text
    pub validator: Option<Validator>,
    /// Scripts the pattern applies to (empty = universal)
    pub scripts: ScriptSet,
    /// Lowercase keywords that raise confidence when found near the match
    pub context_keywords: Vec<String>,
    /// Chars searched for keywords on each side of the match
    pub context_window: usize,
    /// Multiplier applied when a keyword is found
    pub confidence_boost: f32,
    /// Discard matches touching an adjacent ASCII digit
    pub digit_boundary: bool,
}

impl PatternDefinition {
    /// Compile a pattern.
    pub fn new(
        name: impl Into<String>,
        entity_type: EntityType,
        pattern: &str,
        base_confidence: f32,
    ) -> Result<Self> {
        let name = name.into();
        let matcher = Regex::new(pattern).map_err(|e| Error::InvalidPattern {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self::compiled(name, entity_type, matcher, base_confidence))
    }

    pub(crate) fn compiled(
        name: impl Into<String>,
        entity_type: EntityType,
        matcher: Regex,
        base_confidence: f32,
    ) -> Self {
        Self {
            name: name.into(),
            entity_type,
            matcher,
            base_confidence: clamp_confidence(base_confidence),
            validator: None,
            scripts: ScriptSet::empty(),
            context_keywords: Vec::new(),
            context_window: DEFAULT_CONTEXT_WINDOW,
            confidence_boost: 1.0,
            digit_boundary: false,
        }
    }

    /// Attach a validator.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Restrict the pattern to documents containing one of `scripts`.
    pub fn with_scripts(mut self, scripts: ScriptSet) -> Self {
        self.scripts = scripts;
        self
    }

    /// Set context keywords, the search window and the boost multiplier.
    pub fn with_context(mut self, keywords: Vec<String>, window: usize, boost: f32) -> Self {
        self.context_keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
        self.context_window = window;
        self.confidence_boost = boost.max(1.0);
        self
    }

    /// Discard matches directly preceded or followed by an ASCII digit.
    pub fn with_digit_boundary(mut self) -> Self {
        self.digit_boundary = true;
        self
    }

    /// Whether the pattern applies to a document with the detected scripts.
    ///
    /// Universal patterns always apply. When detection found no script at all,
    /// every pattern applies.
    pub fn applies_to(&self, detected: ScriptSet) -> bool {
        self.scripts.is_empty() || detected.is_empty() || self.scripts.intersects(detected)
    }

    /// Confidence of a match at char range `[start, end)` of `text`.
    fn confidence_at(&self, text: &str, start: usize, end: usize) -> f32 {
        if self.context_keywords.is_empty() {
            return self.base_confidence;
        }
        let from = start.saturating_sub(self.context_window);
        let before: String = text.chars().skip(from).take(start - from).collect();
        let after: String = text.chars().skip(end).take(self.context_window).collect();
        let before = before.to_lowercase();
        let after = after.to_lowercase();

        let boosted = self
            .context_keywords
            .iter()
            .any(|k| before.contains(k.as_str()) || after.contains(k.as_str()));
        if boosted {
            clamp_confidence(self.base_confidence * self.confidence_boost)
        } else {
            self.base_confidence
        }
    }
}

/// A pattern supplied by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPattern {
    /// Unique name; replaces an earlier user pattern of the same name
    pub name: String,
    /// Regex source
    pub pattern: String,
    /// Type assigned to matches
    #[serde(default = "default_user_type")]
    pub entity_type: EntityType,
    /// Base confidence
    #[serde(default = "default_user_confidence")]
    pub confidence: f32,
    /// Keywords that boost confidence
    #[serde(default)]
    pub context_keywords: Vec<String>,
}

fn default_user_type() -> EntityType {
    EntityType::Custom
}

fn default_user_confidence() -> f32 {
    0.8
}

impl UserPattern {
    fn compile(&self) -> Result<PatternDefinition> {
        let definition =
            PatternDefinition::new(&self.name, self.entity_type, &self.pattern, self.confidence)?;
        if self.context_keywords.is_empty() {
            Ok(definition)
        } else {
            Ok(definition.with_context(
                self.context_keywords.clone(),
                DEFAULT_CONTEXT_WINDOW,
                DEFAULT_CONFIDENCE_BOOST,
            ))
        }
    }
}

/// A pattern match in page text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextMatch {
    /// Name of the matching pattern
    pub pattern_name: String,
    /// Type of the match
    pub entity_type: EntityType,
    /// Matched text
    pub text: String,
    /// Start char index in the scanned text
    pub start: usize,
    /// End char index (exclusive)
    pub end: usize,
    /// Confidence after context boost
    pub confidence: f32,
    /// Surrounding text
    pub context: String,
}

/// Result of scanning one text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanOutcome {
    /// Accepted matches, ordered by start offset
    pub matches: Vec<TextMatch>,
    /// Regex hits the validator rejected
    pub rejected: usize,
}

/// Compiled pattern list tagged with the catalog generation it was built for.
#[derive(Debug, Clone, Default)]
pub struct PatternCache {
    entry: Option<(u64, Arc<Vec<PatternDefinition>>)>,
}

impl PatternCache {
    /// The cached list if it was built for `generation`.
    pub fn get(&self, generation: u64) -> Option<Arc<Vec<PatternDefinition>>> {
        match &self.entry {
            Some((built_for, patterns)) if *built_for == generation => Some(Arc::clone(patterns)),
            _ => None,
        }
    }

    /// Store a list built for `generation`.
    pub fn store(&mut self, generation: u64, patterns: Arc<Vec<PatternDefinition>>) {
        self.entry = Some((generation, patterns));
    }

    /// Drop the cached list.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

/// Built-in and user patterns.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    user: Vec<PatternDefinition>,
    generation: u64,
    cache: PatternCache,
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternCatalog {
    /// Catalog with the built-in patterns and no user patterns.
    pub fn new() -> Self {
        Self {
            user: Vec::new(),
            generation: 0,
            cache: PatternCache::default(),
        }
    }

    /// Current generation. Changes whenever the user pattern set changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Compile and add a user pattern, replacing one with the same name.
    pub fn add_user_pattern(&mut self, pattern: &UserPattern) -> Result<()> {
        let definition = pattern.compile()?;
        self.user.retain(|p| p.name != definition.name);
        log::debug!("Adding user pattern '{}'", definition.name);
        self.user.push(definition);
        self.bump();
        Ok(())
    }

    /// Remove a user pattern by name. Returns whether one was removed.
    pub fn remove_user_pattern(&mut self, name: &str) -> bool {
        let before = self.user.len();
        self.user.retain(|p| p.name != name);
        let removed = self.user.len() != before;
        if removed {
            self.bump();
        }
        removed
    }

    /// Remove every user pattern.
    pub fn clear_user_patterns(&mut self) {
        if !self.user.is_empty() {
            self.user.clear();
            self.bump();
        }
    }

    fn bump(&mut self) {
        self.generation += 1;
        self.cache.invalidate();
    }

    /// Built-in followed by user patterns.
    pub fn patterns(&mut self) -> Arc<Vec<PatternDefinition>> {
        if let Some(patterns) = self.cache.get(self.generation) {
            return patterns;
        }
        let mut all: Vec<PatternDefinition> = builtin_patterns().to_vec();
        all.extend(self.user.iter().cloned());
        let all = Arc::new(all);
        self.cache.store(self.generation, Arc::clone(&all));
        all
    }

    /// Scan `text` with every pattern applicable to `scripts`.
    pub fn scan(&mut self, text: &str, scripts: ScriptSet) -> ScanOutcome {
        let patterns = self.patterns();
        let offsets = OffsetMap::new(text);
        let mut outcome = ScanOutcome::default();

        for pattern in patterns.iter().filter(|p| p.applies_to(scripts)) {
            for m in pattern.matcher.find_iter(text) {
                if m.as_str().is_empty() {
                    continue;
                }
                if pattern.digit_boundary && touches_digit(text, m.start(), m.end()) {
                    continue;
                }
                if let Some(validate) = pattern.validator {
                    if !validate(m.as_str()) {
                        log::debug!("Pattern '{}' match rejected by validator", pattern.name);
                        outcome.rejected += 1;
                        continue;
                    }
                }

                let start = offsets.char_index(m.start());
                let end = offsets.char_index(m.end());
                outcome.matches.push(TextMatch {
                    pattern_name: pattern.name.clone(),
                    entity_type: pattern.entity_type,
                    text: m.as_str().to_string(),
                    start,
                    end,
                    confidence: pattern.confidence_at(text, start, end),
                    context: context_snippet(text, start, end, SNIPPET_RADIUS),
                });
            }
        }

        outcome.matches.sort_by_key(|m| (m.start, m.end));
        outcome
    }
}

fn touches_digit(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    before.is_some_and(|c| c.is_ascii_digit()) || after.is_some_and(|c| c.is_ascii_digit())
}
