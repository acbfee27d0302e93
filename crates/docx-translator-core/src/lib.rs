//! DOCX Translator Core Library
//!
//! This library provides the core functionality for translating word-processing documents:
//! - Document model with DOCX and JSON codecs
//! - Traversal into blocks and batching of short fragments
//! - Translation via OpenAI-compatible APIs with credential failover
//! - Reconstruction of the translated document in source order
//! - Checkpoints for resuming interrupted runs

pub mod batch;
pub mod checkpoint;
pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod reconstruct;
pub mod translator;
pub mod util;
pub mod walker;

pub use batch::{Batch, BatchKind, Batcher};
pub use checkpoint::{CacheStatus, Checkpoint, CheckpointStore, cache_status, purge};
pub use codec::{EncodedBatch, Payload, PayloadFormat, SPLIT_MARKER};
pub use config::{
    AppConfig, BatchConfig, CheckpointConfig, DEFAULT_TARGET_LANG, Lang, LanguageOption,
    PipelineConfig, TranslatorConfig, supported_languages,
};
pub use document::{
    Document, DocumentCodec, DocumentReport, DocxCodec, JsonCodec, codec_for_path, diagnose,
};
pub use error::{Error, Result};
pub use pipeline::{
    LogListener, ProgressListener, RunControl, RunOutcome, RunStats, Session, TranslationPipeline,
};
pub use reconstruct::Reconstructor;
pub use translator::{CompletionSender, CredentialPool, Translator, create_translator};
pub use walker::{Block, BlockKind, DocumentWalker, Position};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.target_lang.as_str(), DEFAULT_TARGET_LANG);
        assert_eq!(config.batch, BatchConfig::default());
        assert!(config.checkpoint.enabled);
    }
}
