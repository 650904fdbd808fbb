//! Greenproof library crate (used by the server and integration tests).
//!
//! # Public API Surface
//!
//! ## Core Types
//! - [`Config`], [`ConfigError`] - Engine configuration
//! - [`VerificationOrchestrator`] - Per-request state machine
//! - [`VerificationRequest`], [`VerificationOutcome`] - Its input and output
//!
//! ## Signals
//! - [`SimilarityScorer`], [`ClipScorer`] - Image-text similarity gate
//! - [`CrossExaminationEngine`] - Affirmative/negative oracle queries
//! - [`KeywordValidator`] - Required and forbidden terms in the rationale
//! - [`FusionEngine`], [`FusionConfig`] - Weighted fusion and decision bands
//!
//! ## Data
//! - [`ChallengeRegistry`], [`ChallengeSpec`] - Challenge recipes
//! - [`DuplicateLedger`] - Approved image digests
//!
//! ## Test/Mock Support
//! Mock implementations are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod constants;
pub mod dedup;
pub mod hashing;
pub mod oracle;
pub mod registry;
pub mod scoring;
pub mod similarity;
pub mod verification;

pub use config::{Config, ConfigError, MOCK_ORACLE_PREFIX};
pub use dedup::{DuplicateLedger, DuplicateStatus};
pub use hashing::{hash_image, hash_member_id, to_hex};
pub use oracle::{
    GenaiOracle, ImagePayload, OracleBackend, OracleError, OracleJudgment, PromptKind,
    VisionOracle,
};
#[cfg(any(test, feature = "mock"))]
pub use oracle::MockOracle;
pub use registry::{ChallengeRegistry, ChallengeSpec, RegistryError};
pub use scoring::{
    CrossExamResult, CrossExaminationEngine, Decision, FusionConfig, FusionEngine, FusionOutcome,
    FusionWeights, KeywordResult, KeywordValidator, ScoringError,
};
pub use similarity::{
    ClipScorer, DevicePreference, SimilarityConfig, SimilarityError, SimilarityModel,
    SimilarityResult, SimilarityScorer,
};
#[cfg(any(test, feature = "mock"))]
pub use similarity::MockSimilarityModel;
pub use verification::{
    Diagnostics, EngineStatus, Finding, VerificationError, VerificationOrchestrator,
    VerificationOutcome, VerificationRequest, VerificationState,
};
