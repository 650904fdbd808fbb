use std::sync::Arc;

use greenproof::VerificationOrchestrator;

#[derive(Clone)]
pub struct HandlerState {
    pub orchestrator: Arc<VerificationOrchestrator>,

    /// Whether the oracle is the scripted mock (reported by `/ready`).
    pub mock_oracle: bool,
}

impl HandlerState {
    pub fn new(orchestrator: Arc<VerificationOrchestrator>, mock_oracle: bool) -> Self {
        Self {
            orchestrator,
            mock_oracle,
        }
    }
}
