//! Merging detections from all sources into one canonical list.
//!
//! Pattern and classifier passes report overlapping spans independently. The
//! reconciler works page by page: entities are sorted top to bottom, left to
//! right, and each entity is compared against every later one:
//!
//! - boxes overlapping by at least the IoU threshold are one detection, and the
//!   more confident entity survives
//! - the same text (ignoring case) at nearly the same box is a duplicate; from
//!   two different methods the result averages both confidences and takes the
//!   preferred method, otherwise the more confident entity survives
//!
//! Sweeps repeat until nothing merges, so reconciling an already reconciled list
//! changes nothing.

use crate::config::{DetectionConfig, ReconcileConfig};
use crate::entity::Entity;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Result of reconciliation.
#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    /// Canonical entities, ordered by page then position
    pub entities: Vec<Entity>,
    /// Number of entities folded into others
    pub merged: usize,
}

/// Deduplicates positioned entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityReconciler {
    config: ReconcileConfig,
}

impl EntityReconciler {
    /// Reconciler with the given thresholds.
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    /// Reconcile a document's entities.
    pub fn reconcile(&self, entities: Vec<Entity>) -> Reconciled {
        let mut pages: BTreeMap<usize, Vec<Entity>> = BTreeMap::new();
        for entity in entities {
            pages.entry(entity.page()).or_default().push(entity);
        }

        let mut result = Reconciled::default();
        for (page, mut list) in pages {
            loop {
                let (swept, merged) = self.sweep(list);
                list = swept;
                result.merged += merged;
                if merged == 0 {
                    break;
                }
            }
            log::debug!("Page {}: {} entities after reconciliation", page, list.len());
            result.entities.extend(list);
        }
        result
    }

    /// One pass over one page.
    fn sweep(&self, mut list: Vec<Entity>) -> (Vec<Entity>, usize) {
        list.sort_by(position_order);

        let mut consumed = vec![false; list.len()];
        let mut kept = Vec::with_capacity(list.len());
        let mut merged = 0;

        for i in 0..list.len() {
            if consumed[i] {
                continue;
            }
            let mut current = list[i].clone();
            for j in (i + 1)..list.len() {
                if consumed[j] {
                    continue;
                }
                if let Some(combined) = self.combine(&current, &list[j]) {
                    current = combined;
                    consumed[j] = true;
                    merged += 1;
                }
            }
            kept.push(current);
        }
        (kept, merged)
    }

    /// The entity replacing `a` and `b`, if they are the same detection.
    fn combine(&self, a: &Entity, b: &Entity) -> Option<Entity> {
        // A field entity and a text entity are redacted differently; never fold one
        // into the other.
        if a.position.is_field() != b.position.is_field() {
            return None;
        }

        let (box_a, box_b) = (&a.position.bbox, &b.position.bbox);
        if box_a.iou(box_b) >= self.config.iou_threshold {
            return Some(more_confident(a, b).clone());
        }

        let same_text = a.text.to_lowercase() == b.text.to_lowercase();
        if same_text && box_a.approx_eq(box_b, self.config.position_tolerance) {
            if a.method == b.method {
                return Some(more_confident(a, b).clone());
            }
            let (preferred, other) = if b.method.merge_rank() > a.method.merge_rank() {
                (b, a)
            } else {
                (a, b)
            };
            let mut combined = preferred.clone();
            combined.set_confidence((a.confidence + b.confidence) / 2.0);
            if combined.context_snippet.is_empty() {
                combined.context_snippet = other.context_snippet.clone();
            }
            return Some(combined);
        }
        None
    }
}

fn more_confident<'a>(a: &'a Entity, b: &'a Entity) -> &'a Entity {
    if b.confidence > a.confidence {
        b
    } else {
        a
    }
}

fn position_order(a: &Entity, b: &Entity) -> Ordering {
    let (pa, pb) = (&a.position.bbox, &b.position.bbox);
    pa.y.total_cmp(&pb.y).then(pa.x.total_cmp(&pb.x))
}

/// Apply type and confidence filtering, then rank by confidence.
pub fn filter_for_review(entities: Vec<Entity>, config: &DetectionConfig) -> Vec<Entity> {
    let before = entities.len();
    let mut kept: Vec<Entity> = entities.into_iter().filter(|e| config.accepts(e)).collect();
    kept.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    log::debug!("Review filter kept {} of {} entities", kept.len(), before);
    kept
}
