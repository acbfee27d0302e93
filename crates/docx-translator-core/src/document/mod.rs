mod diagnose;
mod docx;
mod json;
mod model;

pub use diagnose::{DocumentReport, diagnose};
pub use docx::DocxCodec;
pub use json::JsonCodec;
pub use model::{
    BodyElement, Cell, Document, HeaderFooter, Paragraph, Section, StyleSheet, Table, TextFrame,
};

use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Serialization capability for documents.
///
/// The pipeline only ever sees [`Document`]; codecs own the file format.
pub trait DocumentCodec: Send + Sync {
    /// Parse a document from its file bytes
    fn decode(&self, bytes: &[u8]) -> Result<Document>;

    /// Serialize a document to file bytes
    fn encode(&self, document: &Document) -> Result<Vec<u8>>;

    /// File extension produced by [`DocumentCodec::encode`], without the dot
    fn extension(&self) -> &'static str;

    /// Read and decode a document file
    fn open(&self, path: &Path) -> Result<Document> {
        let bytes = std::fs::read(path).map_err(|e| {
            Error::DocumentOpen(format!("Failed to read file {}: {}", path.display(), e))
        })?;
        self.decode(&bytes)
    }
}

/// Pick a codec from the file extension: `.json` is the JSON model, anything else docx.
pub fn codec_for_path(path: &Path) -> Arc<dyn DocumentCodec> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        Arc::new(JsonCodec)
    } else {
        Arc::new(DocxCodec)
    }
}
