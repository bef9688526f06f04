//! Durable record stores: PostgreSQL or the in-memory sample catalogue

mod factory;
pub mod migrations;
mod postgres;

pub use factory::{Repositories, SeedApiKey, StorageConfig, StorageFactory, StorageType};
pub use migrations::{run_storage_migrations, Migration, PostgresMigrator};
pub use postgres::PostgresConfig;
