//! Signal scoring and fusion.
//!
//! - [`CrossExaminationEngine`] asks the oracle an affirmative and a negative
//!   question and measures how well the two answers agree.
//! - [`KeywordValidator`] scans the affirmative rationale for required and
//!   forbidden terms.
//! - [`FusionEngine`] combines similarity, cross-examination and keyword
//!   signals into one confidence and a [`Decision`].
//!
//! Everything here is a pure function of its inputs except the oracle calls.

pub mod cross_exam;
pub mod error;
pub mod fusion;
pub mod keyword;
pub mod types;


pub use cross_exam::{CrossExaminationEngine, combined_confidence, consistency_score};
pub use error::ScoringError;
pub use fusion::{FusionConfig, FusionEngine, FusionWeights};
pub use keyword::{KeywordValidator, detect_language};
pub use types::{CrossExamResult, Decision, FusionOutcome, KeywordResult};
