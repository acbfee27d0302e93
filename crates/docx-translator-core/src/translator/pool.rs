use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

use super::prompt::Prompt;
use super::traits::{CompletionSender, Translator, TranslatorInfo};
use crate::codec::Payload;
use crate::config::Lang;
use crate::error::{Error, Result};

/// Ordered credentials with failover on rate limiting.
///
/// The cursor only moves when the current credential is rate limited, and
/// wraps. A payload is tried at most once per credential; if every one of
/// them is rate limited the pool reports [`Error::CredentialsExhausted`].
pub struct CredentialPool {
    senders: Vec<Arc<dyn CompletionSender>>,
    current: AtomicUsize,
}

impl CredentialPool {
    /// Build a pool; an empty sender list is a missing credential.
    pub fn new(senders: Vec<Arc<dyn CompletionSender>>) -> Result<Self> {
        if senders.is_empty() {
            return Err(Error::TranslationMissingApiKey);
        }
        Ok(Self {
            senders,
            current: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Index of the credential the next request starts with
    pub fn current(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    fn advance(&self, from: usize) -> usize {
        let next = (from + 1) % self.senders.len();
        self.current.store(next, Ordering::Relaxed);
        next
    }

    /// Send `prompt`, rotating through the pool on rate limits.
    pub async fn send(&self, prompt: &Prompt) -> Result<String> {
        let attempts = self.senders.len();
        let mut index = self.current();

        for attempt in 1..=attempts {
            let sender = &self.senders[index];
            debug!("Attempt {}/{} with {}", attempt, attempts, sender.label());

            match sender.send(prompt).await {
                Err(e) if e.is_rate_limited() => {
                    let next = self.advance(index);
                    warn!(
                        "{} is rate limited, switching to {}",
                        sender.label(),
                        self.senders[next].label()
                    );
                    index = next;
                }
                other => return other,
            }
        }

        Err(Error::CredentialsExhausted { attempts })
    }
}

#[async_trait]
impl Translator for CredentialPool {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "OpenAI Compatible",
            requires_api_key: true,
            credentials: self.senders.len(),
        }
    }

    async fn translate(&self, payload: &Payload, target: &Lang) -> Result<String> {
        let prompt = Prompt::build(payload, target);
        self.send(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays scripted outcomes and records every call.
    struct ScriptedSender {
        name: &'static str,
        script: Mutex<Vec<bool>>,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl ScriptedSender {
        /// `script` lists, per call, whether the call is rate limited;
        /// once exhausted every call succeeds.
        fn new(name: &'static str, script: Vec<bool>, calls: &Arc<Mutex<Vec<&'static str>>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                script: Mutex::new(script.into_iter().rev().collect()),
                calls: Arc::clone(calls),
            })
        }

        fn always_limited(name: &'static str, calls: &Arc<Mutex<Vec<&'static str>>>) -> Arc<Self> {
            Self::new(name, vec![true; 64], calls)
        }
    }

    #[async_trait]
    impl CompletionSender for ScriptedSender {
        async fn send(&self, prompt: &Prompt) -> Result<String> {
            self.calls.lock().unwrap().push(self.name);
            if self.script.lock().unwrap().pop().unwrap_or(false) {
                return Err(Error::TranslationRateLimited { retry_after: None });
            }
            Ok(format!("{}:{}", self.name, prompt.user))
        }

        fn label(&self) -> String {
            self.name.to_string()
        }
    }

    struct FailingSender;

    #[async_trait]
    impl CompletionSender for FailingSender {
        async fn send(&self, _prompt: &Prompt) -> Result<String> {
            Err(Error::TranslationEmptyResponse)
        }

        fn label(&self) -> String {
            "failing".to_string()
        }
    }

    fn prompt() -> Prompt {
        Prompt { system: "s".to_string(), user: "u".to_string() }
    }

    #[tokio::test]
    async fn test_failover_to_second_credential() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let pool = CredentialPool::new(vec![
            ScriptedSender::always_limited("a", &calls),
            ScriptedSender::new("b", Vec::new(), &calls),
        ])
        .unwrap();

        for _ in 0..3 {
            assert_eq!(pool.send(&prompt()).await.unwrap(), "b:u");
        }
        // The cursor stays on the working credential after the first switch
        assert_eq!(*calls.lock().unwrap(), vec!["a", "b", "b", "b"]);
        assert_eq!(pool.current(), 1);
    }

    #[tokio::test]
    async fn test_cursor_wraps_when_both_fail_once() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let pool = CredentialPool::new(vec![
            ScriptedSender::new("a", vec![true], &calls),
            ScriptedSender::new("b", vec![true], &calls),
        ])
        .unwrap();

        let err = pool.send(&prompt()).await.unwrap_err();
        assert!(matches!(err, Error::CredentialsExhausted { attempts: 2 }));
        assert_eq!(pool.current(), 0);

        assert_eq!(pool.send(&prompt()).await.unwrap(), "a:u");
        assert_eq!(*calls.lock().unwrap(), vec!["a", "b", "a"]);
    }

    #[tokio::test]
    async fn test_wrap_from_last_credential() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let pool = CredentialPool::new(vec![
            ScriptedSender::new("a", Vec::new(), &calls),
            ScriptedSender::new("b", vec![false, true], &calls),
        ])
        .unwrap();
        pool.current.store(1, Ordering::Relaxed);

        assert_eq!(pool.send(&prompt()).await.unwrap(), "b:u");
        assert_eq!(pool.send(&prompt()).await.unwrap(), "a:u");
        assert_eq!(pool.current(), 0);
    }

    #[tokio::test]
    async fn test_other_failures_are_not_retried() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let pool = CredentialPool::new(vec![
            Arc::new(FailingSender) as Arc<dyn CompletionSender>,
            ScriptedSender::new("b", Vec::new(), &calls),
        ])
        .unwrap();

        let err = pool.send(&prompt()).await.unwrap_err();
        assert!(matches!(err, Error::TranslationEmptyResponse));
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(pool.current(), 0);
    }

    #[test]
    fn test_empty_pool_is_missing_key() {
        assert!(matches!(
            CredentialPool::new(Vec::new()),
            Err(Error::TranslationMissingApiKey)
        ));
    }
}
