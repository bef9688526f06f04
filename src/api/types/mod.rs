//! Request and response types shared by the handlers

pub mod error;
pub mod query;

pub use error::{ApiError, ApiErrorResponse};
pub use query::ValidatedQuery;
