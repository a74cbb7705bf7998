//! Text-node splicing for WordprocessingML parts.
//!
//! The document text model is the concatenation of all `w:t` nodes, with a
//! newline before every paragraph but the first, `\t` for `w:tab` and `\n` for
//! `w:br`/`w:cr`. Entity offsets are char offsets into that text, which
//! [`extract_document_text`] exposes so detection and splicing agree.
//!
//! An entity usually sits in one run, but formatting changes split text across
//! runs (`<w:t>Dear Jo</w:t>` ... `<w:t>hn Smith</w:t>`). A span crossing runs
//! gets its type placeholder written into the first affected run only; its
//! chars are removed from every other affected run. Nothing else in the markup
//! changes, and every modified node gets `xml:space="preserve"` so Word keeps
//! the surrounding spaces.
//!
//! Entity offsets refer to `word/document.xml`. Headers, footers, notes and
//! comments have their own text, so [`redact_all_occurrences`] matches those
//! parts by entity text alone.

use crate::entity::{Entity, EntityType};
use crate::error::{Error, Result};
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use std::io::Cursor;

/// Result of splicing one XML part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlRedaction {
    /// Rewritten XML
    pub xml: String,
    /// Entities removed from the text
    pub redacted: usize,
    /// Entities whose text could not be found
    pub skipped: usize,
    /// Indices of the skipped entities
    pub missing: Vec<usize>,
}

/// A `w:t` node in the text model.
#[derive(Debug, Clone, Copy)]
struct NodeSpan {
    start: usize,
    len: usize,
}

impl NodeSpan {
    fn end(&self) -> usize {
        self.start + self.len
    }
}

struct TextModel {
    chars: Vec<char>,
    nodes: Vec<NodeSpan>,
}

/// One change inside a node: chars `[start, end)` replaced by `replacement`.
#[derive(Debug, Clone)]
struct NodeEdit {
    start: usize,
    end: usize,
    replacement: Option<String>,
}

fn scan(xml: &str) -> Result<TextModel> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut nodes: Vec<NodeSpan> = Vec::new();
    let mut count = 0usize;
    let mut paragraphs = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => {
                    if paragraphs > 0 {
                        text.push('\n');
                        count += 1;
                    }
                    paragraphs += 1;
                }
                b"t" => {
                    in_text = true;
                    nodes.push(NodeSpan { start: count, len: 0 });
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" if !in_text => {
                    text.push('\t');
                    count += 1;
                }
                b"br" | b"cr" if !in_text => {
                    text.push('\n');
                    count += 1;
                }
                _ => {}
            },
            Event::Text(e) if in_text => {
                let value = e.unescape()?;
                let len = value.chars().count();
                text.push_str(&value);
                count += len;
                if let Some(node) = nodes.last_mut() {
                    node.len += len;
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"t" => in_text = false,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(TextModel {
        chars: text.chars().collect(),
        nodes,
    })
}

/// Plain text of a document part, in the model used for splice offsets.
///
/// # Examples
///
/// ```
/// use docveil::redact::xml::extract_document_text;
///
/// let xml = r#"<w:body xmlns:w="urn:w"><w:p><w:r><w:t>Dear </w:t></w:r><w:r><w:t>Jane</w:t></w:r></w:p><w:p><w:r><w:t>Regards</w:t></w:r></w:p></w:body>"#;
/// assert_eq!(extract_document_text(xml).unwrap(), "Dear Jane\nRegards");
/// ```
pub fn extract_document_text(xml: &str) -> Result<String> {
    Ok(scan(xml)?.chars.into_iter().collect())
}

/// Non-overlapping occurrences of `text` in the model, by start index.
fn occurrences(chars: &[char], text: &str) -> Vec<usize> {
    let needle: Vec<char> = text.chars().collect();
    let mut found = Vec::new();
    if needle.is_empty() || needle.len() > chars.len() {
        return found;
    }
    let mut start = 0;
    while start + needle.len() <= chars.len() {
        if chars[start..start + needle.len()] == needle[..] {
            found.push(start);
            start += needle.len();
        } else {
            start += 1;
        }
    }
    found
}

/// Char range of an entity in the model.
///
/// Uses the entity's offset when the text there matches; otherwise the
/// occurrence of the entity text closest to that offset.
fn resolve_range(chars: &[char], entity: &Entity) -> Option<(usize, usize)> {
    let needle: Vec<char> = entity.text.chars().collect();
    if needle.is_empty() || needle.len() > chars.len() {
        return None;
    }
    let hint = entity.position.text_offset().unwrap_or(0);
    let at_hint = hint.checked_add(needle.len()).and_then(|end| chars.get(hint..end));
    if at_hint == Some(needle.as_slice()) {
        return Some((hint, hint + needle.len()));
    }
    occurrences(chars, &entity.text)
        .into_iter()
        .min_by_key(|&start| start.abs_diff(hint))
        .map(|start| (start, start + needle.len()))
}

/// Remove `entities` from `word/document.xml`, one range per entity.
pub fn redact_document_xml(xml: &str, entities: &[Entity]) -> Result<XmlRedaction> {
    let model = scan(xml)?;

    let mut ranges: Vec<(usize, usize, EntityType)> = Vec::new();
    let mut missing = Vec::new();
    for (index, entity) in entities.iter().enumerate() {
        match resolve_range(&model.chars, entity) {
            Some((start, end)) => ranges.push((start, end, entity.entity_type)),
            None => {
                log::warn!("Entity '{}' not found in document text; skipped", entity.text);
                missing.push(index);
            }
        }
    }

    let redacted = ranges.len();
    let xml = splice(xml, &model, ranges)?;
    Ok(XmlRedaction {
        xml,
        redacted,
        skipped: missing.len(),
        missing,
    })
}

/// Remove every occurrence of each entity's text from a part that does not
/// share the document's offsets.
pub fn redact_all_occurrences(xml: &str, entities: &[Entity]) -> Result<XmlRedaction> {
    let model = scan(xml)?;

    let mut ranges: Vec<(usize, usize, EntityType)> = Vec::new();
    let mut missing = Vec::new();
    for (index, entity) in entities.iter().enumerate() {
        let len = entity.text.chars().count();
        let found = occurrences(&model.chars, &entity.text);
        if found.is_empty() {
            missing.push(index);
        }
        ranges.extend(found.into_iter().map(|start| (start, start + len, entity.entity_type)));
    }

    let redacted = entities.len() - missing.len();
    let xml = if ranges.is_empty() {
        xml.to_string()
    } else {
        splice(xml, &model, ranges)?
    };
    Ok(XmlRedaction {
        xml,
        redacted,
        skipped: missing.len(),
        missing,
    })
}

fn splice(xml: &str, model: &TextModel, mut ranges: Vec<(usize, usize, EntityType)>) -> Result<String> {
    // Overlapping ranges collapse into one, labelled by the earliest.
    ranges.sort_by_key(|&(start, end, _)| (start, end));
    let mut merged: Vec<(usize, usize, EntityType)> = Vec::new();
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.0 < last.1 => last.1 = last.1.max(range.1),
            _ => merged.push(range),
        }
    }

    let mut edits: BTreeMap<usize, Vec<NodeEdit>> = BTreeMap::new();
    for (start, end, entity_type) in merged {
        let mut first = true;
        for (index, node) in model.nodes.iter().enumerate() {
            if node.start >= end || node.end() <= start {
                continue;
            }
            edits.entry(index).or_default().push(NodeEdit {
                start: start.max(node.start) - node.start,
                end: end.min(node.end()) - node.start,
                replacement: first.then(|| entity_type.placeholder()),
            });
            first = false;
        }
    }

    rewrite(xml, model, &edits)
}

fn apply_edits(original: &[char], edits: &[NodeEdit]) -> String {
    let mut chars = original.to_vec();
    let mut ordered: Vec<&NodeEdit> = edits.iter().collect();
    ordered.sort_by_key(|edit| std::cmp::Reverse(edit.start));
    for edit in ordered {
        let replacement: Vec<char> = edit
            .replacement
            .as_deref()
            .map(|r| r.chars().collect())
            .unwrap_or_default();
        chars.splice(edit.start..edit.end, replacement);
    }
    chars.into_iter().collect()
}

fn rewrite(xml: &str, model: &TextModel, edits: &BTreeMap<usize, Vec<NodeEdit>>) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut node_index: Option<usize> = None;
    let mut in_text = false;
    // Replacement text of the current node, taken when written
    let mut pending: Option<String> = None;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) if e.local_name().as_ref() == b"t" => {
                let index = node_index.map_or(0, |i| i + 1);
                node_index = Some(index);
                in_text = true;
                match edits.get(&index) {
                    Some(node_edits) => {
                        let span = model.nodes[index];
                        let original = &model.chars[span.start..span.end()];
                        pending = Some(apply_edits(original, node_edits));

                        let mut start = e.clone();
                        let preserved = start
                            .attributes()
                            .flatten()
                            .any(|a| a.key.as_ref() == b"xml:space");
                        if !preserved {
                            start.push_attribute(("xml:space", "preserve"));
                        }
                        writer.write_event(Event::Start(start))?;
                    }
                    None => writer.write_event(event.clone())?,
                }
            }
            Event::Text(_) if in_text && edits.contains_key(&node_index.unwrap_or(0)) => {
                if let Some(text) = pending.take() {
                    writer.write_event(Event::Text(BytesText::new(&text)))?;
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"t" => {
                if let Some(text) = pending.take() {
                    if !text.is_empty() {
                        writer.write_event(Event::Text(BytesText::new(&text)))?;
                    }
                }
                in_text = false;
                writer.write_event(event.clone())?;
            }
            _ => writer.write_event(event.clone())?,
        }
    }

    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| Error::Xml(format!("rewritten XML is not UTF-8: {}", e)))
}
