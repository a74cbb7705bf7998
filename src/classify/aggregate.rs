//! Token aggregation: raw classifier tokens to entity spans.
//!
//! Three passes over one chunk's tokens:
//!
//! 1. gather: mark sub-word continuations (marker prefix, never the first token)
//! 2. word merge: fold continuations into their word and pick one tag and score
//!    per word with the configured [`AggregationStrategy`]
//! 3. entity grouping: split the word stream on `B-` prefixes and tag changes,
//!    drop `O` words, and average the scores of each group

use super::{map_tag, AggregationStrategy, RawToken};
use crate::entity::EntityType;
use serde::Serialize;

/// Default sub-word continuation marker.
pub const CONTINUATION_MARKER: &str = "##";

/// Entities shorter than this after trimming are dropped.
pub const MIN_ENTITY_CHARS: usize = 2;

/// A token after gathering.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedToken {
    /// Surface text without the continuation marker
    pub word: String,
    /// BIO tag
    pub tag: String,
    /// Classifier score
    pub score: f32,
    /// Start char offset in the chunk
    pub start: usize,
    /// End char offset in the chunk (exclusive)
    pub end: usize,
    /// Continues the previous token's word
    pub is_subword: bool,
}

/// An entity produced by aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedEntity {
    /// Entity text
    pub text: String,
    /// Bare tag without BIO prefix
    pub tag: String,
    /// Mapped entity type
    pub entity_type: EntityType,
    /// Mean word score
    pub score: f32,
    /// Start char offset
    pub start: usize,
    /// End char offset (exclusive)
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefix {
    Begin,
    Inside,
    Outside,
}

fn split_tag(tag: &str) -> (Prefix, &str) {
    if tag == "O" || tag.is_empty() {
        (Prefix::Outside, "")
    } else if let Some(bare) = tag.strip_prefix("B-") {
        (Prefix::Begin, bare)
    } else if let Some(bare) = tag.strip_prefix("I-") {
        (Prefix::Inside, bare)
    } else {
        (Prefix::Inside, tag)
    }
}

/// Converts raw tokens into entities.
#[derive(Debug, Clone)]
pub struct TokenAggregator {
    strategy: AggregationStrategy,
    marker: String,
}

impl Default for TokenAggregator {
    fn default() -> Self {
        Self::new(AggregationStrategy::default())
    }
}

impl TokenAggregator {
    /// Aggregator using `strategy` and the default continuation marker.
    pub fn new(strategy: AggregationStrategy) -> Self {
        Self {
            strategy,
            marker: CONTINUATION_MARKER.to_string(),
        }
    }

    /// Use a different continuation marker.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Aggregate one chunk's tokens.
    ///
    /// # Examples
    ///
    /// ```
    /// use docveil::classify::{AggregationStrategy, RawToken, TokenAggregator};
    /// use docveil::EntityType;
    ///
    /// let tokens = vec![
    ///     RawToken::new("John", "B-PER", 0.98, 0, 4),
    ///     RawToken::new("##son", "I-PER", 0.61, 4, 7),
    /// ];
    /// let entities = TokenAggregator::new(AggregationStrategy::First).aggregate(&tokens);
    ///
    /// assert_eq!(entities.len(), 1);
    /// assert_eq!(entities[0].text, "Johnson");
    /// assert_eq!(entities[0].entity_type, EntityType::Person);
    /// assert_eq!(entities[0].score, 0.98);
    /// ```
    pub fn aggregate(&self, tokens: &[RawToken]) -> Vec<AggregatedEntity> {
        let gathered = self.gather(tokens);
        let words = self.merge_words(&gathered);
        group_entities(&words)
    }

    /// Normalize tokens and mark continuations.
    pub fn gather(&self, tokens: &[RawToken]) -> Vec<ClassifiedToken> {
        tokens
            .iter()
            .enumerate()
            .map(|(index, token)| {
                let stripped = token.word.strip_prefix(self.marker.as_str());
                let is_subword = index > 0 && stripped.is_some();
                let word = match stripped {
                    Some(rest) if is_subword => rest.to_string(),
                    _ => token.word.clone(),
                };
                ClassifiedToken {
                    word,
                    tag: token.tag.clone(),
                    score: token.score,
                    start: token.start,
                    end: token.end.max(token.start),
                    is_subword,
                }
            })
            .collect()
    }

    /// Fold continuations into words.
    pub fn merge_words(&self, tokens: &[ClassifiedToken]) -> Vec<ClassifiedToken> {
        let mut groups: Vec<Vec<&ClassifiedToken>> = Vec::new();
        for token in tokens {
            match groups.last_mut() {
                Some(group) if token.is_subword => group.push(token),
                _ => groups.push(vec![token]),
            }
        }
        groups.iter().map(|group| self.reduce(group)).collect()
    }

    fn reduce(&self, group: &[&ClassifiedToken]) -> ClassifiedToken {
        let first = group[0];
        let last = group[group.len() - 1];
        let (tag, score) = match self.strategy {
            AggregationStrategy::First => (first.tag.clone(), first.score),
            AggregationStrategy::Max => {
                let best = group
                    .iter()
                    .copied()
                    .fold(first, |best, t| if t.score > best.score { t } else { best });
                (best.tag.clone(), best.score)
            }
            AggregationStrategy::Average => {
                let mean = group.iter().map(|t| t.score).sum::<f32>() / group.len() as f32;
                (first.tag.clone(), mean)
            }
        };
        ClassifiedToken {
            word: group.iter().map(|t| t.word.as_str()).collect(),
            tag,
            score,
            start: first.start,
            end: last.end,
            is_subword: false,
        }
    }
}

/// Group words into entities by BIO prefix and bare tag.
pub fn group_entities(words: &[ClassifiedToken]) -> Vec<AggregatedEntity> {
    let mut groups: Vec<(String, Vec<&ClassifiedToken>)> = Vec::new();
    let mut open = false;

    for word in words {
        let (prefix, bare) = split_tag(&word.tag);
        if prefix == Prefix::Outside {
            open = false;
            continue;
        }
        let continues = open
            && prefix != Prefix::Begin
            && groups.last().is_some_and(|(tag, _)| tag == bare);
        if continues {
            if let Some((_, members)) = groups.last_mut() {
                members.push(word);
            }
        } else {
            groups.push((bare.to_string(), vec![word]));
            open = true;
        }
    }

    groups
        .into_iter()
        .filter_map(|(tag, members)| {
            let text = join_words(&members);
            if text.trim().chars().count() < MIN_ENTITY_CHARS {
                return None;
            }
            let score = members.iter().map(|w| w.score).sum::<f32>() / members.len() as f32;
            Some(AggregatedEntity {
                text,
                entity_type: map_tag(&tag),
                tag,
                score,
                start: members[0].start,
                end: members[members.len() - 1].end,
            })
        })
        .collect()
}

fn join_words(words: &[&ClassifiedToken]) -> String {
    let mut text = String::new();
    let mut previous_end: Option<usize> = None;
    for word in words {
        if previous_end.is_some_and(|end| word.start > end) {
            text.push(' ');
        }
        text.push_str(&word.word);
        previous_end = Some(word.end);
    }
    text
}
