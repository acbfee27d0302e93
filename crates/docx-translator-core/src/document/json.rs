use super::{Document, DocumentCodec};
use crate::error::{Error, Result};

/// The document model as pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl DocumentCodec for JsonCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Document> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::DocumentOpen(format!("invalid JSON document: {e}")))
    }

    fn encode(&self, document: &Document) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(document).map_err(|e| Error::DocumentWrite(e.to_string()))
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}
