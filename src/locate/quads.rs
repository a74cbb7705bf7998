//! Quad normalization.
//!
//! Backends report search hits as quadrilaterals in top-left page space, nested
//! inconsistently: a hit may be a bare quad, a list of quads (one per line of a
//! multi-line hit) or a list wrapped once more. Quads are given either as eight
//! numbers `[x1, y1, ... x4, y4]` or as four `[x, y]` points. [`RawSearchHit`]
//! accepts all of these from JSON; [`flatten_hits`] turns them into one uniform
//! `Vec<Vec<Quad>>` so the ambiguous shape goes no further than this module.

use crate::geometry::{BoundingBox, Point};
use serde::{Deserialize, Serialize};

/// One quad as found on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawQuad {
    /// Four `[x, y]` corner points
    Points([[f32; 2]; 4]),
    /// Eight numbers, corners in order
    Flat([f32; 8]),
}

impl RawQuad {
    fn normalize(&self) -> Quad {
        let corners = match self {
            RawQuad::Points(points) => points.map(|[x, y]| Point::new(x, y)),
            RawQuad::Flat(n) => [
                Point::new(n[0], n[1]),
                Point::new(n[2], n[3]),
                Point::new(n[4], n[5]),
                Point::new(n[6], n[7]),
            ],
        };
        Quad { corners }
    }
}

impl From<&Quad> for RawQuad {
    fn from(quad: &Quad) -> Self {
        RawQuad::Points(quad.corners.map(|p| [p.x, p.y]))
    }
}

/// One search hit as found on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSearchHit {
    /// A bare quad
    Quad(RawQuad),
    /// The quads of one hit
    Quads(Vec<RawQuad>),
    /// The quads of one hit, wrapped once more
    Nested(Vec<Vec<RawQuad>>),
}

impl RawSearchHit {
    /// Parse a backend's JSON search result.
    pub fn parse_list(json: &str) -> crate::Result<Vec<RawSearchHit>> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A quadrilateral in top-left page space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    /// Corner points
    pub corners: [Point; 4],
}

impl Quad {
    /// Axis-aligned quad for a top-left rectangle.
    pub fn from_rect(x: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            corners: [
                Point::new(x, top),
                Point::new(x + width, top),
                Point::new(x + width, top + height),
                Point::new(x, top + height),
            ],
        }
    }

    /// `(min_x, min_y, max_x, max_y)` of the corners.
    pub fn extent(&self) -> (f32, f32, f32, f32) {
        self.corners.iter().fold(
            (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
            |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
        )
    }

    /// Height of the extent, used as the glyph height.
    pub fn height(&self) -> f32 {
        let (_, y0, _, y1) = self.extent();
        y1 - y0
    }

    fn center(&self) -> Point {
        let (x0, y0, x1, y1) = self.extent();
        Point::new((x0 + x1) / 2.0, (y0 + y1) / 2.0)
    }
}

/// Flatten raw hits into one quad list per hit. Empty hits are dropped.
pub fn flatten_hits(hits: &[RawSearchHit]) -> Vec<Vec<Quad>> {
    hits.iter()
        .map(|hit| match hit {
            RawSearchHit::Quad(quad) => vec![quad.normalize()],
            RawSearchHit::Quads(quads) => quads.iter().map(RawQuad::normalize).collect(),
            RawSearchHit::Nested(lists) => lists.iter().flatten().map(RawQuad::normalize).collect(),
        })
        .filter(|quads: &Vec<Quad>| !quads.is_empty())
        .collect()
}

/// `(min_x, min_y, max_x, max_y)` over a list of quads.
pub fn group_extent(quads: &[Quad]) -> Option<(f32, f32, f32, f32)> {
    quads.iter().map(Quad::extent).reduce(|a, b| {
        (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3))
    })
}

/// Merge consecutive hits belonging to one multi-line match.
///
/// A hit joins the previous group when its first quad's center lies within twice
/// the average quad height vertically and within `horizontal_share` of the page
/// width horizontally of the previous group's last quad. A group never grows past
/// `max_lines` quads, one per line of the searched text.
pub fn merge_line_groups(
    groups: Vec<Vec<Quad>>,
    page_width: f32,
    horizontal_share: f32,
    max_lines: usize,
) -> Vec<Vec<Quad>> {
    let all: Vec<&Quad> = groups.iter().flatten().collect();
    if all.is_empty() {
        return groups;
    }
    let avg_height = all.iter().map(|q| q.height()).sum::<f32>() / all.len() as f32;
    let max_dy = 2.0 * avg_height;
    let max_dx = horizontal_share * page_width;

    let mut merged: Vec<Vec<Quad>> = Vec::with_capacity(groups.len());
    for group in groups {
        let joins = match (merged.last(), group.first()) {
            (Some(previous), Some(first)) if previous.len() + group.len() <= max_lines => {
                match previous.last() {
                    Some(last) => {
                        let (a, b) = (last.center(), first.center());
                        (b.y - a.y).abs() <= max_dy && (b.x - a.x).abs() <= max_dx
                    }
                    None => false,
                }
            }
            _ => false,
        };
        match merged.last_mut() {
            Some(previous) if joins => previous.extend(group),
            _ => merged.push(group),
        }
    }
    merged
}

/// Bottom-left box of a quad group on a page of `page_height`.
pub fn group_bbox(quads: &[Quad], page_height: f32) -> Option<BoundingBox> {
    group_extent(quads)
        .map(|(x0, y0, x1, y1)| BoundingBox::new(x0, page_height - y1, x1 - x0, y1 - y0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_shapes() {
        let json = r#"[
            [10, 20, 50, 20, 50, 32, 10, 32],
            [[10, 40], [50, 40], [50, 52], [10, 52]],
            [[10, 60, 50, 60, 50, 72, 10, 72], [10, 74, 30, 74, 30, 86, 10, 86]],
            [[[10, 90, 50, 90, 50, 102, 10, 102]]]
        ]"#;
        let hits = RawSearchHit::parse_list(json).unwrap();
        assert!(matches!(hits[0], RawSearchHit::Quad(RawQuad::Flat(_))));
        assert!(matches!(hits[1], RawSearchHit::Quad(RawQuad::Points(_))));
        assert!(matches!(hits[2], RawSearchHit::Quads(_)));
        assert!(matches!(hits[3], RawSearchHit::Nested(_)));

        let groups = flatten_hits(&hits);
        assert_eq!(groups.len(), 4);
        assert_eq!(groups[2].len(), 2);
        assert_eq!(groups[3].len(), 1);
        assert_eq!(groups[1][0].extent(), (10.0, 40.0, 50.0, 52.0));
    }

    #[test]
    fn test_malformed_payload_rejected() {
        assert!(RawSearchHit::parse_list(r#"[[1, 2, 3]]"#).is_err());
        assert!(RawSearchHit::parse_list(r#"{"x": 1}"#).is_err());
    }

    #[test]
    fn test_empty_hits_dropped() {
        let hits = vec![RawSearchHit::Quads(Vec::new()), RawSearchHit::Nested(vec![vec![]])];
        assert!(flatten_hits(&hits).is_empty());
    }

    #[test]
    fn test_merge_adjacent_lines() {
        let line1 = vec![Quad::from_rect(100.0, 100.0, 40.0, 12.0)];
        let line2 = vec![Quad::from_rect(100.0, 114.0, 40.0, 12.0)];
        let far = vec![Quad::from_rect(100.0, 400.0, 40.0, 12.0)];
        let merged = merge_line_groups(vec![line1, line2, far], 600.0, 0.3, 2);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].len(), 2);
    }

    #[test]
    fn test_no_merge_when_horizontally_distant() {
        let left = vec![Quad::from_rect(10.0, 100.0, 40.0, 12.0)];
        let right = vec![Quad::from_rect(500.0, 114.0, 40.0, 12.0)];
        assert_eq!(merge_line_groups(vec![left, right], 600.0, 0.3, 2).len(), 2);
    }

    #[test]
    fn test_group_stops_at_line_count() {
        let lines: Vec<Vec<Quad>> = (0..4)
            .map(|i| vec![Quad::from_rect(100.0, 100.0 + 14.0 * i as f32, 40.0, 12.0)])
            .collect();
        let merged = merge_line_groups(lines, 600.0, 0.3, 2);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|g| g.len() == 2));
    }

    #[test]
    fn test_whole_hits_on_consecutive_lines_stay_apart() {
        // Two two-line hits stacked directly under each other.
        let first = vec![
            Quad::from_rect(72.0, 72.0, 42.0, 12.0),
            Quad::from_rect(72.0, 84.0, 36.0, 12.0),
        ];
        let second = vec![
            Quad::from_rect(72.0, 96.0, 42.0, 12.0),
            Quad::from_rect(72.0, 108.0, 36.0, 12.0),
        ];
        assert_eq!(merge_line_groups(vec![first, second], 612.0, 0.3, 2).len(), 2);
    }

    #[test]
    fn test_group_bbox_flips_origin() {
        let quads = vec![
            Quad::from_rect(100.0, 100.0, 40.0, 12.0),
            Quad::from_rect(100.0, 114.0, 20.0, 12.0),
        ];
        let bbox = group_bbox(&quads, 792.0).unwrap();
        assert_eq!(bbox, BoundingBox::new(100.0, 666.0, 40.0, 26.0));
    }
}
