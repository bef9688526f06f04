//! Request gate runner

use std::sync::Arc;

use tracing::{debug, error, instrument};

use crate::domain::endpoint::RouteTable;
use crate::domain::gate::{Admission, GateRejection, GateRequest, StageOutcome};
use crate::infrastructure::api_key::CredentialValidator;
use crate::infrastructure::observability::record_gate_decision;
use crate::infrastructure::rate_limit::RateLimiter;

use super::stages::{
    ClassifyStage, CredentialPresenceStage, DurableLookupStage, GateContext, GateStage,
    KeySyntaxStage, RateLimitStage, ValidityCacheStage,
};

/// Runs stages in order and stops at the first admit or reject
pub struct RequestGate {
    stages: Vec<Box<dyn GateStage>>,
}

impl std::fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGate")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl RequestGate {
    pub fn new(stages: Vec<Box<dyn GateStage>>) -> Self {
        Self { stages }
    }

    /// classify, credential presence, key syntax, validity cache,
    /// durable lookup, rate limit
    pub fn standard(
        routes: RouteTable,
        validator: Arc<CredentialValidator>,
        limiter: Arc<RateLimiter>,
        fail_open: bool,
    ) -> Self {
        Self::new(vec![
            Box::new(ClassifyStage::new(routes)),
            Box::new(CredentialPresenceStage),
            Box::new(KeySyntaxStage::new(validator.clone())),
            Box::new(ValidityCacheStage::new(validator.clone())),
            Box::new(DurableLookupStage::new(validator)),
            Box::new(RateLimitStage::new(limiter, fail_open)),
        ])
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    #[instrument(skip_all, fields(path = %request.path))]
    pub async fn evaluate(&self, request: GateRequest) -> Result<Admission, GateRejection> {
        let mut ctx = GateContext::new(request);

        for stage in &self.stages {
            let outcome = stage.evaluate(&mut ctx).await;
            record_gate_decision(stage.name(), outcome.label());

            match outcome {
                StageOutcome::Continue => {}
                StageOutcome::Admit(admission) => {
                    debug!(stage = stage.name(), class = %admission.class, "Request admitted");
                    return Ok(admission);
                }
                StageOutcome::Reject(rejection) => {
                    debug!(
                        stage = stage.name(),
                        rejection = rejection.kind(),
                        "Request rejected"
                    );
                    return Err(rejection);
                }
            }
        }

        error!(stages = ?self.stage_names(), "Gate chain ended without a decision");
        Err(GateRejection::Unresolved)
    }
}
