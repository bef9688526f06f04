//! Request gate: the ordered admission chain in front of every quote route

mod runner;
mod stages;

pub use runner::RequestGate;
pub use stages::{
    ClassifyStage, CredentialPresenceStage, DurableLookupStage, GateContext, GateStage,
    KeySyntaxStage, RateLimitStage, ValidityCacheStage,
};
