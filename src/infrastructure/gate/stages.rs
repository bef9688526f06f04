//! Gate stages, in the order the standard chain runs them

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::api_key::fingerprint;
use crate::domain::endpoint::{EndpointClass, RouteTable};
use crate::domain::gate::{Admission, ClientIdentity, GateRejection, GateRequest, StageOutcome};
use crate::domain::rate_limit::RateLimitDecision;
use crate::domain::DomainError;
use crate::infrastructure::api_key::{CacheLookup, CredentialValidator};
use crate::infrastructure::observability::{record_rate_limit_rejection, record_store_error};
use crate::infrastructure::rate_limit::RateLimiter;

/// Mutable state threaded through the chain
#[derive(Debug, Clone)]
pub struct GateContext {
    pub request: GateRequest,
    pub class: EndpointClass,
    /// Set once the cache or the durable store vouched for the key
    pub key_confirmed: bool,
    pub owner: Option<String>,
}

impl GateContext {
    pub fn new(request: GateRequest) -> Self {
        Self {
            request,
            class: EndpointClass::Invalid,
            key_confirmed: false,
            owner: None,
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.request.api_key.as_deref()
    }
}

/// One step of the request gate
#[async_trait]
pub trait GateStage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn evaluate(&self, ctx: &mut GateContext) -> StageOutcome;
}

/// Rejects paths outside the route table before any store access
#[derive(Debug)]
pub struct ClassifyStage {
    routes: RouteTable,
}

impl ClassifyStage {
    pub fn new(routes: RouteTable) -> Self {
        Self { routes }
    }
}

#[async_trait]
impl GateStage for ClassifyStage {
    fn name(&self) -> &'static str {
        "classify"
    }

    async fn evaluate(&self, ctx: &mut GateContext) -> StageOutcome {
        ctx.class = self.routes.classify(&ctx.request.path);

        match ctx.class {
            EndpointClass::Invalid => StageOutcome::Reject(GateRejection::RouteNotFound),
            _ => StageOutcome::Continue,
        }
    }
}

/// Protected endpoints need a key; free endpoints fall through to IP limiting
#[derive(Debug, Default)]
pub struct CredentialPresenceStage;

#[async_trait]
impl GateStage for CredentialPresenceStage {
    fn name(&self) -> &'static str {
        "credential_presence"
    }

    async fn evaluate(&self, ctx: &mut GateContext) -> StageOutcome {
        match (ctx.api_key(), ctx.class) {
            (None, EndpointClass::Protected) => {
                StageOutcome::Reject(GateRejection::MissingCredential)
            }
            _ => StageOutcome::Continue,
        }
    }
}

#[derive(Debug)]
pub struct KeySyntaxStage {
    validator: Arc<CredentialValidator>,
}

impl KeySyntaxStage {
    pub fn new(validator: Arc<CredentialValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl GateStage for KeySyntaxStage {
    fn name(&self) -> &'static str {
        "key_syntax"
    }

    async fn evaluate(&self, ctx: &mut GateContext) -> StageOutcome {
        let Some(key) = ctx.api_key() else {
            return StageOutcome::Continue;
        };

        match self.validator.check_syntax(key) {
            Ok(()) => StageOutcome::Continue,
            Err(e) => {
                debug!(reason = %e, "Rejected malformed API key");
                StageOutcome::Reject(GateRejection::MalformedCredential)
            }
        }
    }
}

#[derive(Debug)]
pub struct ValidityCacheStage {
    validator: Arc<CredentialValidator>,
}

impl ValidityCacheStage {
    pub fn new(validator: Arc<CredentialValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl GateStage for ValidityCacheStage {
    fn name(&self) -> &'static str {
        "validity_cache"
    }

    async fn evaluate(&self, ctx: &mut GateContext) -> StageOutcome {
        let Some(key) = ctx.api_key() else {
            return StageOutcome::Continue;
        };

        let lookup = self.validator.cached(key).await;

        if let CacheLookup::Hit { owner } = lookup {
            ctx.key_confirmed = true;
            ctx.owner = owner;
        }

        StageOutcome::Continue
    }
}

#[derive(Debug)]
pub struct DurableLookupStage {
    validator: Arc<CredentialValidator>,
}

impl DurableLookupStage {
    pub fn new(validator: Arc<CredentialValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl GateStage for DurableLookupStage {
    fn name(&self) -> &'static str {
        "durable_lookup"
    }

    async fn evaluate(&self, ctx: &mut GateContext) -> StageOutcome {
        if ctx.key_confirmed {
            return StageOutcome::Continue;
        }

        let Some(key) = ctx.api_key() else {
            return StageOutcome::Continue;
        };

        let found = self.validator.lookup(key).await;

        match found {
            Some(api_key) => {
                ctx.key_confirmed = true;
                ctx.owner = Some(api_key.owner().to_string());
                StageOutcome::Continue
            }
            None => StageOutcome::Reject(GateRejection::UnknownCredential),
        }
    }
}

/// Terminal stage: counts the request against the key or, without one, the IP
#[derive(Debug)]
pub struct RateLimitStage {
    limiter: Arc<RateLimiter>,
    fail_open: bool,
}

impl RateLimitStage {
    pub fn new(limiter: Arc<RateLimiter>, fail_open: bool) -> Self {
        Self { limiter, fail_open }
    }

    fn admit(ctx: &GateContext, quota: Option<RateLimitDecision>) -> StageOutcome {
        let identity = match ctx.api_key() {
            Some(key) => ClientIdentity::ApiKey {
                fingerprint: fingerprint(key),
                owner: ctx.owner.clone(),
            },
            None => ClientIdentity::Anonymous {
                ip: ctx.request.client_ip,
            },
        };

        StageOutcome::Admit(Admission {
            identity,
            class: ctx.class,
            quota,
        })
    }

    fn store_failure(&self, ctx: &GateContext, error: DomainError) -> StageOutcome {
        record_store_error("cache");

        if self.fail_open {
            warn!(error = %error, "Rate limit store unavailable, admitting request");
            Self::admit(ctx, None)
        } else {
            warn!(error = %error, "Rate limit store unavailable, rejecting request");
            StageOutcome::Reject(GateRejection::StoreUnavailable)
        }
    }
}

#[async_trait]
impl GateStage for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn evaluate(&self, ctx: &mut GateContext) -> StageOutcome {
        let (policy, checked) = match ctx.api_key() {
            Some(key) => (
                self.limiter.key_policy().name(),
                self.limiter.limit_by_api_key(key).check().await,
            ),
            None => (
                self.limiter.ip_policy().name(),
                self.limiter.limit_by_ip(ctx.request.client_ip).await,
            ),
        };

        match checked {
            Ok(decision) if decision.allowed => Self::admit(ctx, Some(decision)),
            Ok(decision) => {
                record_rate_limit_rejection(policy);
                StageOutcome::Reject(GateRejection::QuotaExceeded {
                    policy,
                    limit: decision.limit,
                    retry_after: decision.reset_in,
                })
            }
            Err(e) => self.store_failure(ctx, e),
        }
    }
}
