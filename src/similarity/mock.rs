use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::SimilarityModel;
use super::error::SimilarityError;

#[derive(Debug, Clone)]
enum MockBehavior {
    /// First phrase gets `top`; the rest share the remainder evenly.
    TopScore(f32),
    Fail(String),
}

/// Scripted similarity model for tests.
#[derive(Debug)]
pub struct MockSimilarityModel {
    behavior: MockBehavior,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockSimilarityModel {
    /// Gives the first candidate phrase probability `top`.
    pub fn with_top_score(top: f32) -> Self {
        Self {
            behavior: MockBehavior::TopScore(top.clamp(0.0, 1.0)),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails every call with an inference error.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Fail(reason.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleeps for `delay` on every call (runs on the blocking pool).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SimilarityModel for MockSimilarityModel {
    fn embed_and_score(&self, _image: &[u8], phrases: &[String]) -> Result<Vec<f32>, SimilarityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        match &self.behavior {
            MockBehavior::Fail(reason) => Err(SimilarityError::InferenceFailed {
                reason: reason.clone(),
            }),
            MockBehavior::TopScore(top) => {
                if phrases.is_empty() {
                    return Err(SimilarityError::NoCandidates);
                }
                if phrases.len() == 1 {
                    return Ok(vec![1.0]);
                }
                let rest = (1.0 - top) / (phrases.len() - 1) as f32;
                let mut probabilities = vec![rest; phrases.len()];
                probabilities[0] = *top;
                Ok(probabilities)
            }
        }
    }

    fn name(&self) -> &str {
        "mock-similarity"
    }

    fn is_stub(&self) -> bool {
        true
    }
}
