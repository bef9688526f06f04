//! HTTP layer: routes, middleware and response types

pub mod health;
pub mod middleware;
pub mod quotes;
pub mod router;
pub mod state;
pub mod types;

pub use router::create_router;
pub use state::AppState;
