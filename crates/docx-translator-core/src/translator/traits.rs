use async_trait::async_trait;

use super::prompt::Prompt;
use crate::codec::Payload;
use crate::config::Lang;
use crate::error::Result;

/// Information about a translator backend
#[derive(Debug, Clone)]
pub struct TranslatorInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Whether this translator requires an API key
    pub requires_api_key: bool,
    /// Number of interchangeable credentials behind it
    pub credentials: usize,
}

/// Trait for translation backends
#[async_trait]
pub trait Translator: Send + Sync {
    /// Get information about this translator
    fn info(&self) -> TranslatorInfo;

    /// Get the translator name (convenience method)
    fn name(&self) -> &'static str {
        self.info().name
    }

    /// Translate one encoded batch into the target language.
    ///
    /// Returns the raw reply; decoding it is up to the caller.
    async fn translate(&self, payload: &Payload, target: &Lang) -> Result<String>;
}

/// One credential's way of sending a chat completion.
///
/// A rate limit must be reported as [`crate::Error::TranslationRateLimited`]
/// so the pool can move on to the next credential.
#[async_trait]
pub trait CompletionSender: Send + Sync {
    async fn send(&self, prompt: &Prompt) -> Result<String>;

    /// Short label for logs; never the secret itself
    fn label(&self) -> String;
}
