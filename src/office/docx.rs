//! DOCX redaction.
//!
//! Detection runs on the body in `word/document.xml`, and entities are spliced
//! there at their offsets. Every other `word/*.xml` part (headers, footers,
//! footnotes, endnotes, comments) is searched for the same entity texts and
//! rewritten when one occurs. Parts in subfolders of `word/` and all other
//! entries are copied unchanged.

use crate::config::RedactionOptions;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::redact::xml::{extract_document_text, redact_all_occurrences, redact_document_xml};
use crate::redact::RedactionResult;
use std::collections::{BTreeSet, HashMap};
use std::io::{Cursor, Read, Seek, Write};
use std::time::Instant;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Archive entry holding the main document body.
pub const DOCUMENT_PART: &str = "word/document.xml";

const CORE_PROPERTIES_PART: &str = "docProps/core.xml";
const APP_PROPERTIES_PART: &str = "docProps/app.xml";

const EMPTY_CORE_PROPERTIES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"/>"#;

const EMPTY_APP_PROPERTIES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"/>"#;

/// Redacts Word documents.
#[derive(Debug, Clone, Default)]
pub struct DocxRedactor {
    options: RedactionOptions,
}

impl DocxRedactor {
    /// Create a redactor. Only `sanitize` applies to DOCX; margins are a page
    /// geometry concept.
    pub fn new(options: RedactionOptions) -> Self {
        Self { options }
    }

    /// Text of the document body, in the offset model used for redaction.
    pub fn document_text(&self, bytes: &[u8]) -> Result<String> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let xml = read_part(&mut archive, DOCUMENT_PART)?;
        extract_document_text(&xml)
    }

    /// Remove confirmed entities and repack the archive.
    pub fn redact(&self, bytes: &[u8], entities: &[Entity]) -> RedactionResult {
        let started = Instant::now();
        let confirmed: Vec<Entity> = entities
            .iter()
            .filter(|e| e.status.is_redactable())
            .cloned()
            .collect();

        match self.rewrite(bytes, &confirmed) {
            Ok((bytes, redacted, skipped)) => {
                log::info!("DOCX redaction finished: {} redacted, {} skipped", redacted, skipped);
                RedactionResult {
                    success: true,
                    bytes: Some(bytes),
                    error: None,
                    redacted_count: redacted,
                    skipped_count: skipped,
                    failed_count: 0,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                }
            }
            Err(e) => {
                log::error!("DOCX redaction failed: {}", e);
                RedactionResult {
                    success: false,
                    error: Some(e.to_string()),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                    ..RedactionResult::default()
                }
            }
        }
    }

    fn rewrite(&self, bytes: &[u8], entities: &[Entity]) -> Result<(Vec<u8>, usize, usize)> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let document = read_part(&mut archive, DOCUMENT_PART)?;
        let spliced = redact_document_xml(&document, entities)?;

        let mut missing: BTreeSet<usize> = spliced.missing.into_iter().collect();
        let mut rewritten: HashMap<String, String> = HashMap::new();
        rewritten.insert(DOCUMENT_PART.to_string(), spliced.xml);

        let secondary: Vec<String> = archive
            .file_names()
            .filter(|name| is_secondary_part(name))
            .map(str::to_string)
            .collect();
        for name in secondary {
            let xml = read_part(&mut archive, &name)?;
            let part = redact_all_occurrences(&xml, entities)?;
            if part.redacted > 0 {
                log::debug!("Redacted {} entities in {}", part.redacted, name);
                missing.retain(|index| part.missing.contains(index));
                rewritten.insert(name, part.xml);
            }
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index)?;
            let name = entry.name().to_string();
            let replacement = match name.as_str() {
                CORE_PROPERTIES_PART if self.options.sanitize => Some(EMPTY_CORE_PROPERTIES),
                APP_PROPERTIES_PART if self.options.sanitize => Some(EMPTY_APP_PROPERTIES),
                _ => rewritten.get(&name).map(String::as_str),
            };
            match replacement {
                Some(content) => {
                    drop(entry);
                    writer.start_file(name.as_str(), options)?;
                    writer.write_all(content.as_bytes())?;
                    log::debug!("Rewrote archive entry {}", name);
                }
                None => writer.raw_copy_file(entry)?,
            }
        }

        let bytes = writer.finish()?.into_inner();
        let skipped = missing.len();
        Ok((bytes, entities.len() - skipped, skipped))
    }
}

/// XML parts directly under `word/` other than the body.
fn is_secondary_part(name: &str) -> bool {
    match name.strip_prefix("word/") {
        Some(file) => file.ends_with(".xml") && !file.contains('/') && name != DOCUMENT_PART,
        None => false,
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let mut part = archive
        .by_name(name)
        .map_err(|_| Error::Archive(format!("missing part {}", name)))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(xml)
}
