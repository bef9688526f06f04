//! Request gate outcomes
//!
//! Every request passes an ordered chain of stages. Each stage either lets
//! the request continue, admits it, or rejects it with a fixed status and
//! message.

use std::net::IpAddr;
use std::time::Duration;

use thiserror::Error;

use super::endpoint::EndpointClass;
use super::rate_limit::RateLimitDecision;

/// Terminal rejections, each with a fixed HTTP status and message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateRejection {
    #[error("Endpoint not found")]
    RouteNotFound,

    #[error("Unauthorized. Missing API key!")]
    MissingCredential,

    #[error("Unauthorized. Invalid API key!")]
    MalformedCredential,

    #[error("Invalid API key")]
    UnknownCredential,

    #[error("Too many requests, please try again later.")]
    QuotaExceeded {
        policy: &'static str,
        limit: u64,
        retry_after: Duration,
    },

    #[error("Service temporarily unavailable")]
    StoreUnavailable,

    #[error("Internal server error")]
    Unresolved,
}

impl GateRejection {
    pub fn status(&self) -> u16 {
        match self {
            Self::RouteNotFound => 404,
            Self::MissingCredential | Self::MalformedCredential | Self::UnknownCredential => 401,
            Self::QuotaExceeded { .. } => 429,
            Self::StoreUnavailable => 503,
            Self::Unresolved => 500,
        }
    }

    /// Body message; identical to the `Display` output
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RouteNotFound => "route_not_found",
            Self::MissingCredential => "missing_credential",
            Self::MalformedCredential => "malformed_credential",
            Self::UnknownCredential => "unknown_credential",
            Self::QuotaExceeded { .. } => "quota_exceeded",
            Self::StoreUnavailable => "store_unavailable",
            Self::Unresolved => "unresolved",
        }
    }

    /// Seconds a client should wait before retrying, rounded up
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::QuotaExceeded { retry_after, .. } => {
                let secs = retry_after.as_secs();
                let partial = u64::from(retry_after.subsec_nanos() > 0);
                Some((secs + partial).max(1))
            }
            _ => None,
        }
    }
}

/// Who an admitted request was attributed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientIdentity {
    Anonymous {
        ip: IpAddr,
    },
    ApiKey {
        fingerprint: String,
        owner: Option<String>,
    },
}

/// Allow outcome of the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub identity: ClientIdentity,
    pub class: EndpointClass,
    /// `None` when the counter store was unreachable and the gate failed open
    pub quota: Option<RateLimitDecision>,
}

/// What a single stage decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Continue,
    Admit(Admission),
    Reject(GateRejection),
}

impl StageOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::Admit(_) => "admit",
            Self::Reject(_) => "reject",
        }
    }
}

/// Gate input extracted from an HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRequest {
    pub path: String,
    pub api_key: Option<String>,
    pub client_ip: IpAddr,
}

impl GateRequest {
    pub fn new(path: impl Into<String>, client_ip: IpAddr) -> Self {
        Self {
            path: path.into(),
            api_key: None,
            client_ip,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statuses_and_messages() {
        let cases = [
            (GateRejection::RouteNotFound, 404, "Endpoint not found"),
            (
                GateRejection::MissingCredential,
                401,
                "Unauthorized. Missing API key!",
            ),
            (
                GateRejection::MalformedCredential,
                401,
                "Unauthorized. Invalid API key!",
            ),
            (GateRejection::UnknownCredential, 401, "Invalid API key"),
            (
                GateRejection::StoreUnavailable,
                503,
                "Service temporarily unavailable",
            ),
        ];

        for (rejection, status, message) in cases {
            assert_eq!(rejection.status(), status);
            assert_eq!(rejection.message(), message);
        }
    }

    #[test]
    fn test_quota_exceeded() {
        let rejection = GateRejection::QuotaExceeded {
            policy: "ip",
            limit: 5,
            retry_after: Duration::from_millis(1500),
        };

        assert_eq!(rejection.status(), 429);
        assert_eq!(
            rejection.message(),
            "Too many requests, please try again later."
        );
        assert_eq!(rejection.retry_after_secs(), Some(2));
    }

    #[test]
    fn test_retry_after_is_at_least_one_second() {
        let rejection = GateRejection::QuotaExceeded {
            policy: "ip",
            limit: 5,
            retry_after: Duration::ZERO,
        };

        assert_eq!(rejection.retry_after_secs(), Some(1));
        assert_eq!(GateRejection::UnknownCredential.retry_after_secs(), None);
    }
}
