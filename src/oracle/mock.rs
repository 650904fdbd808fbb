use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::OracleError;
use super::prompts::PromptKind;
use super::{ImagePayload, VisionOracle};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

/// Scripted oracle for tests: one reply per prompt kind.
///
/// Unscripted kinds answer with a transport error.
#[derive(Debug)]
pub struct MockOracle {
    replies: Mutex<HashMap<PromptKind, Reply>>,
    delay: Option<Duration>,
    affirmative_calls: AtomicUsize,
    negative_calls: AtomicUsize,
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOracle {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            delay: None,
            affirmative_calls: AtomicUsize::new(0),
            negative_calls: AtomicUsize::new(0),
        }
    }

    /// Confident approval with a low unrelated probability.
    pub fn approving() -> Self {
        Self::new()
            .with_affirmative(
                r#"{"verification_result":"APPROVED","confidence":0.9,
                    "explanation":"A reusable tumbler is held on a desk.",
                    "rationale":"reusable tumbler on a desk",
                    "detected_items":["tumbler"]}"#,
            )
            .with_negative(r#"{"unrelated_probability":0.05}"#)
    }

    pub fn with_affirmative(self, reply: impl Into<String>) -> Self {
        self.replies
            .lock()
            .insert(PromptKind::Affirmative, Reply::Text(reply.into()));
        self
    }

    pub fn with_negative(self, reply: impl Into<String>) -> Self {
        self.replies
            .lock()
            .insert(PromptKind::Negative, Reply::Text(reply.into()));
        self
    }

    /// Makes queries of `kind` fail with a transport error.
    pub fn failing(self, kind: PromptKind, reason: impl Into<String>) -> Self {
        self.replies.lock().insert(kind, Reply::Fail(reason.into()));
        self
    }

    /// Makes every query fail.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new()
            .failing(PromptKind::Affirmative, reason.clone())
            .failing(PromptKind::Negative, reason)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn affirmative_calls(&self) -> usize {
        self.affirmative_calls.load(Ordering::SeqCst)
    }

    pub fn negative_calls(&self) -> usize {
        self.negative_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.affirmative_calls() + self.negative_calls()
    }
}

#[async_trait]
impl VisionOracle for MockOracle {
    async fn ask(&self, _image: &ImagePayload, instruction: &str) -> Result<String, OracleError> {
        let kind = PromptKind::of(instruction);
        match kind {
            PromptKind::Affirmative => self.affirmative_calls.fetch_add(1, Ordering::SeqCst),
            PromptKind::Negative => self.negative_calls.fetch_add(1, Ordering::SeqCst),
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.replies.lock().get(&kind).cloned();
        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(reason)) => Err(OracleError::Transport { reason }),
            None => Err(OracleError::Transport {
                reason: format!("no scripted reply for {kind:?}"),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "mock-oracle"
    }
}
