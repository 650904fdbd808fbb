use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::constants::{FALLBACK_CONFIDENCE, FORBIDDEN_VETO_CONFIDENCE, clamp_unit};
use crate::dedup::{DuplicateLedger, DuplicateStatus};
use crate::hashing::{hash_image, to_hex};
use crate::oracle::{OracleBackend, OracleJudgment};
use crate::registry::{ChallengeRegistry, ChallengeSpec};
use crate::scoring::{
    CrossExamResult, CrossExaminationEngine, Decision, FusionConfig, FusionEngine, KeywordResult,
    KeywordValidator,
};
use crate::similarity::{SimilarityConfig, SimilarityResult, SimilarityScorer};

use super::error::VerificationError;
use super::types::{
    Diagnostics, Finding, VerificationOutcome, VerificationRequest, VerificationState,
};

/// Snapshot of the engine's components for readiness probes.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub similarity_loaded: bool,
    pub similarity_stub: Option<bool>,
    pub similarity_model: Option<String>,
    pub oracle_model: String,
    pub challenges: usize,
    pub remembered_images: Option<u64>,
}

/// Per-run scratch state. Dropped when the run ends.
struct RunContext<'a> {
    request: &'a VerificationRequest,
    digest: [u8; 32],
    duplicate: DuplicateStatus,
    clip: Option<SimilarityResult>,
    cross: Option<CrossExamResult>,
    keyword: Option<KeywordResult>,
    fallback_reason: Option<String>,
    verdict: Option<(Decision, f32, String)>,
    detected_items: Vec<String>,
    evidence: Vec<Finding>,
    diagnostics: Diagnostics,
    trace: Vec<VerificationState>,
    terminal: VerificationState,
}

impl<'a> RunContext<'a> {
    fn new(request: &'a VerificationRequest) -> Self {
        Self {
            request,
            digest: hash_image(request.image.bytes()),
            duplicate: DuplicateStatus::Unique,
            clip: None,
            cross: None,
            keyword: None,
            fallback_reason: None,
            verdict: None,
            detected_items: Vec::new(),
            evidence: Vec::new(),
            diagnostics: Diagnostics::default(),
            trace: Vec::new(),
            terminal: VerificationState::Start,
        }
    }

    fn spec(&self) -> &'a ChallengeSpec {
        &self.request.spec
    }

    fn settle(&mut self, state: VerificationState, decision: Decision, confidence: f32, explanation: String) {
        self.terminal = state;
        self.verdict = Some((decision, clamp_unit(confidence), explanation));
    }
}

/// Sequences the verification stages for one request at a time.
///
/// Holds only shared, read-only handles; any number of runs may proceed
/// concurrently.
#[derive(Debug, Clone)]
pub struct VerificationOrchestrator {
    registry: Arc<ChallengeRegistry>,
    similarity: SimilarityScorer,
    cross_exam: CrossExaminationEngine,
    keywords: KeywordValidator,
    fusion: FusionEngine,
    ledger: Option<DuplicateLedger>,
}

impl VerificationOrchestrator {
    pub fn new(
        registry: Arc<ChallengeRegistry>,
        similarity: SimilarityScorer,
        cross_exam: CrossExaminationEngine,
        fusion: FusionEngine,
    ) -> Self {
        Self {
            registry,
            similarity,
            cross_exam,
            keywords: KeywordValidator::new(),
            fusion,
            ledger: None,
        }
    }

    /// Enables duplicate-submission checks for requests carrying a member id.
    pub fn with_ledger(mut self, ledger: DuplicateLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Builds every component from configuration.
    ///
    /// Missing credentials or model files fail here, before any request runs.
    pub fn from_config(config: &Config, fusion: FusionConfig) -> Result<Self, VerificationError> {
        config.validate()?;

        let registry = ChallengeRegistry::load(config.registry_path.as_deref())?;
        let similarity = SimilarityScorer::from_config(SimilarityConfig::from_config(config))?;
        let oracle = OracleBackend::from_config(config)?;

        let cross_exam = CrossExaminationEngine::new(Arc::new(oracle))
            .with_timeout(config.oracle_timeout)
            .with_consistency_threshold(fusion.consistency_threshold)
            .with_response_language(config.response_language.clone());
        let fusion = FusionEngine::new(fusion)?;

        info!(
            challenges = registry.len(),
            oracle = cross_exam.oracle_name(),
            similarity_stub = config.similarity_stub,
            "Verification engine ready"
        );

        Ok(Self::new(Arc::new(registry), similarity, cross_exam, fusion)
            .with_ledger(DuplicateLedger::with_capacity(config.duplicate_capacity)))
    }

    pub fn registry(&self) -> &ChallengeRegistry {
        &self.registry
    }

    pub fn similarity(&self) -> &SimilarityScorer {
        &self.similarity
    }

    /// Spec for `code`, or a generic one built from `title`.
    pub fn lookup(&self, code: &str, title: &str) -> Arc<ChallengeSpec> {
        self.registry.lookup(code, title)
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            similarity_loaded: self.similarity.is_loaded(),
            similarity_stub: self.similarity.is_stub(),
            similarity_model: self.similarity.model_name(),
            oracle_model: self.cross_exam.oracle_name().to_string(),
            challenges: self.registry.len(),
            remembered_images: self.ledger.as_ref().map(DuplicateLedger::len),
        }
    }

    fn model_label(&self) -> String {
        let similarity = self
            .similarity
            .model_name()
            .unwrap_or_else(|| "clip".to_string());
        format!("{}+{}", self.cross_exam.oracle_name(), similarity)
    }

    /// Runs the state machine to completion. Never fails.
    #[instrument(skip_all, fields(code = %request.spec.code, request_id))]
    pub async fn verify(&self, request: VerificationRequest) -> VerificationOutcome {
        let request_id = Uuid::new_v4();
        tracing::Span::current().record("request_id", tracing::field::display(&request_id));

        let mut ctx = RunContext::new(&request);
        let mut state = VerificationState::Start;

        loop {
            ctx.trace.push(state);
            debug!(state = %state, "Entering state");

            state = match state {
                VerificationState::Start => self.start(&ctx),
                VerificationState::DuplicateCheck => self.duplicate_check(&mut ctx),
                VerificationState::SimilarityGate => self.similarity_gate(&mut ctx).await,
                VerificationState::CrossExam => self.cross_examine(&mut ctx).await,
                VerificationState::KeywordScan => self.keyword_scan(&mut ctx),
                VerificationState::Fuse => self.fuse(&mut ctx),
                VerificationState::RejectedAsDuplicate => self.reject_duplicate(&mut ctx),
                VerificationState::RejectedBySimilarity => self.reject_by_similarity(&mut ctx),
                VerificationState::RejectedByForbiddenKeyword => self.reject_by_keyword(&mut ctx),
                VerificationState::Fallback => self.fallback(&mut ctx).await,
                VerificationState::Done => break,
            };
        }

        let (decision, confidence, explanation) = ctx.verdict.take().unwrap_or_else(|| {
            warn!("State machine ended without a verdict");
            (
                Decision::NeedsReview,
                FALLBACK_CONFIDENCE,
                "Verification could not be completed; held for manual review.".to_string(),
            )
        });

        if decision == Decision::Approved
            && let (Some(ledger), Some(member)) = (&self.ledger, request.member_id.as_deref())
        {
            ledger.record(ctx.digest, member);
        }

        info!(
            decision = %decision,
            confidence,
            terminal_state = %ctx.terminal,
            "Verification finished"
        );

        VerificationOutcome {
            decision,
            confidence,
            explanation,
            evidence: ctx.evidence,
            diagnostics: ctx.diagnostics,
            detected_items: ctx.detected_items,
            terminal_state: ctx.terminal,
            trace: ctx.trace,
            challenge_code: request.spec.code.clone(),
            model: self.model_label(),
            image_digest: to_hex(&ctx.digest),
            request_id,
            verified_at: chrono::Utc::now().timestamp(),
        }
    }

    fn start(&self, ctx: &RunContext<'_>) -> VerificationState {
        if self.ledger.is_some() && ctx.request.member_id.is_some() {
            VerificationState::DuplicateCheck
        } else {
            VerificationState::SimilarityGate
        }
    }

    fn duplicate_check(&self, ctx: &mut RunContext<'_>) -> VerificationState {
        let (Some(ledger), Some(member)) = (&self.ledger, ctx.request.member_id.as_deref()) else {
            return VerificationState::SimilarityGate;
        };

        ctx.duplicate = ledger.check(&ctx.digest, member);
        match ctx.duplicate {
            DuplicateStatus::Unique => VerificationState::SimilarityGate,
            DuplicateStatus::SameMember => {
                ctx.evidence.push(Finding::DuplicateImage {
                    same_member: true,
                    other_members: 0,
                });
                VerificationState::RejectedAsDuplicate
            }
            DuplicateStatus::OtherMembers { count } => {
                ctx.evidence.push(Finding::DuplicateImage {
                    same_member: false,
                    other_members: count,
                });
                VerificationState::RejectedAsDuplicate
            }
        }
    }

    async fn similarity_gate(&self, ctx: &mut RunContext<'_>) -> VerificationState {
        let spec = ctx.spec();
        let result = self
            .similarity
            .score(
                ctx.request.image.shared(),
                &spec.target_phrases(),
                self.registry.contrast_phrases(),
                spec.similarity_threshold,
            )
            .await;

        if let Some(reason) = result.failure.clone() {
            ctx.evidence.push(Finding::SimilarityUnavailable { reason });
        } else {
            ctx.evidence.push(Finding::Similarity {
                max_score: result.max_score,
                avg_score: result.avg_score,
                best_phrase: result.best_phrase.clone(),
                threshold: result.threshold,
                passed: result.passed,
            });
            ctx.diagnostics.clip_best_phrase = result.best_phrase.clone();
        }
        ctx.diagnostics.clip_similarity = Some(result.max_score);
        ctx.diagnostics.clip_passed = Some(result.passed);

        // Scorer failures carry passed=false and take the veto.
        let next = if result.passed && result.failure.is_none() {
            VerificationState::CrossExam
        } else {
            VerificationState::RejectedBySimilarity
        };

        ctx.clip = Some(result);
        next
    }

    async fn cross_examine(&self, ctx: &mut RunContext<'_>) -> VerificationState {
        match self
            .cross_exam
            .examine(&ctx.request.image, ctx.spec())
            .await
        {
            Ok(cross) => {
                for (stage, judgment) in [("affirmative", &cross.positive), ("negative", &cross.negative)] {
                    if !judgment.parsed {
                        ctx.evidence.push(Finding::OracleDefaults { stage });
                    }
                }
                ctx.evidence.push(Finding::CrossExamination {
                    positive_confidence: cross.positive.confidence,
                    unrelated_probability: cross.negative.unrelated_or_default(),
                    consistency_score: cross.consistency_score,
                    is_consistent: cross.is_consistent,
                    combined_confidence: cross.combined_confidence,
                });

                ctx.diagnostics.gemini_confidence = Some(cross.positive.confidence);
                ctx.diagnostics.consistency_score = Some(cross.consistency_score);
                ctx.diagnostics.self_check_consistent = Some(cross.is_consistent);
                ctx.diagnostics.combined_confidence = Some(cross.combined_confidence);
                ctx.detected_items = cross.positive.detected_items.clone();

                ctx.cross = Some(cross);
                VerificationState::KeywordScan
            }
            Err(e) => {
                let reason = e.to_string();
                ctx.evidence.push(Finding::OracleUnavailable {
                    reason: reason.clone(),
                });
                ctx.fallback_reason = Some(reason);
                VerificationState::Fallback
            }
        }
    }

    fn keyword_scan(&self, ctx: &mut RunContext<'_>) -> VerificationState {
        let Some(cross) = ctx.cross.as_ref() else {
            return VerificationState::Fallback;
        };

        let spec = ctx.spec();
        let result = self.keywords.validate(&cross.positive.rationale, spec);

        ctx.evidence.push(Finding::Keywords {
            language: result.language.clone(),
            matched_required: result.matched_required.iter().cloned().collect(),
            match_count: result.match_count,
            threshold: spec.keyword_match_threshold,
            penalty: result.penalty,
        });
        ctx.diagnostics.keyword_match = Some(result.passed);
        ctx.diagnostics.keyword_penalty = Some(result.penalty);
        ctx.diagnostics.keyword_score = Some(result.keyword_score);

        let next = if result.has_forbidden() {
            ctx.evidence.push(Finding::ForbiddenKeywords {
                matched: result.matched_forbidden.iter().cloned().collect(),
            });
            VerificationState::RejectedByForbiddenKeyword
        } else {
            VerificationState::Fuse
        };

        ctx.keyword = Some(result);
        next
    }

    fn fuse(&self, ctx: &mut RunContext<'_>) -> VerificationState {
        let (Some(clip), Some(cross), Some(keyword)) = (&ctx.clip, &ctx.cross, &ctx.keyword) else {
            return VerificationState::Fallback;
        };

        let outcome = self.fusion.fuse(clip, cross, keyword);

        let mut explanation = if cross.positive.explanation.is_empty() {
            format!(
                "Fused confidence {:.2} from similarity, cross-examination and keyword signals.",
                outcome.confidence
            )
        } else {
            cross.positive.explanation.clone()
        };
        if !cross.is_consistent {
            explanation.push_str(&format!(
                " The affirmative and negative judgments disagree (consistency {:.2}).",
                cross.consistency_score
            ));
        }

        ctx.evidence.push(Finding::Fused {
            confidence: outcome.confidence,
            decision: outcome.decision,
        });
        ctx.settle(
            VerificationState::Fuse,
            outcome.decision,
            outcome.confidence,
            explanation,
        );
        VerificationState::Done
    }

    fn reject_duplicate(&self, ctx: &mut RunContext<'_>) -> VerificationState {
        let confidence = ctx.duplicate.rejection_confidence().unwrap_or(0.0);
        let explanation = ctx
            .duplicate
            .reason()
            .unwrap_or_else(|| "This image was already submitted.".to_string());

        info!(status = ?ctx.duplicate, "Rejected duplicate image");
        ctx.settle(
            VerificationState::RejectedAsDuplicate,
            Decision::Rejected,
            confidence,
            explanation,
        );
        VerificationState::Done
    }

    fn reject_by_similarity(&self, ctx: &mut RunContext<'_>) -> VerificationState {
        let spec = ctx.spec();
        let (max_score, threshold, failure) = ctx
            .clip
            .as_ref()
            .map(|c| (c.max_score, c.threshold, c.failure.clone()))
            .unwrap_or((0.0, spec.similarity_threshold, None));

        info!(max_score, threshold, failure = ?failure, "Similarity veto");
        let explanation = match failure {
            Some(reason) => format!(
                "The photo could not be checked against the challenge target ({}): {reason}.",
                spec.target_description
            ),
            None => format!(
                "The photo does not appear to show the challenge target ({}): similarity {:.2} is below {:.2}.",
                spec.target_description, max_score, threshold
            ),
        };
        ctx.settle(
            VerificationState::RejectedBySimilarity,
            Decision::Rejected,
            max_score,
            explanation,
        );
        VerificationState::Done
    }

    fn reject_by_keyword(&self, ctx: &mut RunContext<'_>) -> VerificationState {
        let matched: Vec<String> = ctx
            .keyword
            .as_ref()
            .map(|k| k.matched_forbidden.iter().cloned().collect())
            .unwrap_or_default();

        info!(forbidden = ?matched, "Forbidden keyword veto");
        let explanation = format!(
            "The image analysis mentions disqualifying items: {}.",
            matched.join(", ")
        );
        ctx.settle(
            VerificationState::RejectedByForbiddenKeyword,
            Decision::Rejected,
            FORBIDDEN_VETO_CONFIDENCE,
            explanation,
        );
        VerificationState::Done
    }

    async fn fallback(&self, ctx: &mut RunContext<'_>) -> VerificationState {
        warn!(reason = ?ctx.fallback_reason, "Running reduced verification");

        match self.cross_exam.affirm_only(&ctx.request.image, ctx.spec()).await {
            Ok(judgment) => {
                let (decision, confidence) = self.fallback_verdict(&judgment);

                if !judgment.parsed {
                    ctx.evidence.push(Finding::OracleDefaults {
                        stage: "fallback",
                    });
                }
                ctx.evidence.push(Finding::FallbackJudgment {
                    result_kind: judgment.result_kind,
                    confidence: judgment.confidence,
                });
                ctx.diagnostics.gemini_confidence = Some(judgment.confidence);
                ctx.detected_items = judgment.detected_items.clone();

                let explanation = if judgment.explanation.is_empty() {
                    "Verified with a single oracle judgment; other checks were unavailable."
                        .to_string()
                } else {
                    judgment.explanation.clone()
                };
                ctx.settle(VerificationState::Fallback, decision, confidence, explanation);
            }
            Err(e) => {
                warn!(error = %e, "Fallback oracle call failed");
                ctx.evidence.push(Finding::OracleUnavailable {
                    reason: e.to_string(),
                });
                ctx.settle(
                    VerificationState::Fallback,
                    Decision::NeedsReview,
                    FALLBACK_CONFIDENCE,
                    "Automatic verification is temporarily unavailable; held for manual review."
                        .to_string(),
                );
            }
        }

        VerificationState::Done
    }

    /// A single judgment may only approve or reject when its label and its
    /// confidence band agree; anything else is held for review.
    ///
    /// A held judgment whose confidence falls outside the review band reports
    /// `FALLBACK_CONFIDENCE` pulled into that band instead, so the reported
    /// confidence always maps back to `NEEDS_REVIEW`.
    fn fallback_verdict(&self, judgment: &OracleJudgment) -> (Decision, f32) {
        let band = self.fusion.decide(judgment.confidence);
        match (judgment.result_kind, band) {
            (Some(Decision::Approved), Decision::Approved) => {
                (Decision::Approved, judgment.confidence)
            }
            (Some(Decision::Rejected), Decision::Rejected) => {
                (Decision::Rejected, judgment.confidence)
            }
            (_, Decision::NeedsReview) => (Decision::NeedsReview, judgment.confidence),
            _ => {
                let bands = self.fusion.config();
                let held = FALLBACK_CONFIDENCE
                    .max(bands.review_threshold)
                    .min(bands.approve_threshold);
                (Decision::NeedsReview, held)
            }
        }
    }
}
