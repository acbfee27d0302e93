mod openai;
mod pool;
mod prompt;
mod traits;

pub use openai::OpenAiSender;
pub use pool::CredentialPool;
pub use prompt::Prompt;
pub use traits::{CompletionSender, Translator, TranslatorInfo};

use crate::config::TranslatorConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create a translator from configuration: one sender per configured key.
pub fn create_translator(config: &TranslatorConfig) -> Result<Arc<dyn Translator>> {
    config.validate()?;

    let senders: Vec<Arc<dyn CompletionSender>> = config
        .api_keys
        .iter()
        .map(|key| key.trim())
        .filter(|key| !key.is_empty())
        .map(|key| {
            Arc::new(OpenAiSender::new(
                config.api_base.clone(),
                key.to_string(),
                config.model.clone(),
                config.temperature,
                config.timeout_secs,
            )) as Arc<dyn CompletionSender>
        })
        .collect();

    Ok(Arc::new(CredentialPool::new(senders)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_create_translator_counts_keys() {
        let config = TranslatorConfig::new(
            "https://api.x.ai/v1",
            vec!["k1".to_string(), " ".to_string(), "k2".to_string()],
            "grok-beta",
        );
        let translator = create_translator(&config).unwrap();
        assert_eq!(translator.info().credentials, 2);
    }

    #[test]
    fn test_create_translator_without_keys() {
        let config = TranslatorConfig::new("https://api.x.ai/v1", Vec::new(), "grok-beta");
        assert!(matches!(create_translator(&config), Err(Error::TranslationMissingApiKey)));
    }
}
