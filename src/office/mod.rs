//! Redaction of Office Open XML containers.
//!
//! Word documents are ZIP archives of XML parts. Text lives in
//! `word/document.xml` as runs, which are redacted by splicing text nodes with
//! [`crate::redact::xml`]. Every other archive entry is copied unchanged.
//!
//! # Example
//!
//! ```ignore
//! use docveil::office::DocxRedactor;
//! use docveil::RedactionOptions;
//!
//! let bytes = std::fs::read("letter.docx")?;
//! let redactor = DocxRedactor::new(RedactionOptions::default());
//! let text = redactor.document_text(&bytes)?;
//! // detect and review entities against `text`, then:
//! let result = redactor.redact(&bytes, &confirmed);
//! std::fs::write("letter.redacted.docx", result.bytes.unwrap())?;
//! ```
//!
//! # Feature Flag
//!
//! This module requires the `office` feature:
//!
//! ```toml
//! [dependencies]
//! docveil = { version = "0.3", features = ["office"] }
//! ```

mod docx;

pub use docx::{DocxRedactor, DOCUMENT_PART};
