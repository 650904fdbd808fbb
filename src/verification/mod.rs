//! Per-request verification state machine.
//!
//! ```text
//! START            -> DUPLICATE_CHECK | SIMILARITY_GATE
//! DUPLICATE_CHECK  -> REJECTED_AS_DUPLICATE | SIMILARITY_GATE
//! SIMILARITY_GATE  -> REJECTED_BY_SIMILARITY | CROSS_EXAM
//! CROSS_EXAM       -> KEYWORD_SCAN | FALLBACK
//! KEYWORD_SCAN     -> REJECTED_BY_FORBIDDEN_KEYWORD | FUSE
//! FUSE, REJECTED_*, FALLBACK -> DONE
//! ```
//!
//! The duplicate check only runs when a ledger is attached and the request
//! names a member. A similarity model failure scores 0.0 and takes the
//! similarity veto. Any oracle failure routes to `FALLBACK`, which makes a
//! single affirmative oracle call. Every run ends in
//! exactly one decision; no per-request error reaches the caller.

pub mod error;
pub mod orchestrator;
pub mod types;


pub use error::VerificationError;
pub use orchestrator::{EngineStatus, VerificationOrchestrator};
pub use types::{Diagnostics, Finding, VerificationOutcome, VerificationRequest, VerificationState};
