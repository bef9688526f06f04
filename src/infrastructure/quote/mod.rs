//! Quote infrastructure

mod in_memory_repository;
mod postgres_repository;
mod service;

pub use in_memory_repository::InMemoryQuoteRepository;
pub use postgres_repository::PostgresQuoteRepository;
pub use service::{QuoteService, QuoteServiceTrait};
