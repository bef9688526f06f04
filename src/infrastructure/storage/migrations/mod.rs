//! Schema migrations for the quote catalogue and API keys

use sqlx::postgres::PgPool;

use crate::domain::DomainError;

/// Applies migrations once each, tracked in `_migrations`
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    /// Returns `true` when the migration was applied by this call
    pub async fn run_migration(&self, migration: &Migration) -> Result<bool, DomainError> {
        self.ensure_migrations_table().await?;

        let applied: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)")
                .bind(migration.version)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::storage(format!("Failed to check migration status: {}", e))
                })?;

        if applied {
            return Ok(false);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to start transaction: {}", e)))?;

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to run migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to commit migration: {}", e)))?;

        Ok(true)
    }

    pub async fn current_version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar("SELECT MAX(version) FROM _migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get migration version: {}", e)))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub up: &'static str,
}

impl Migration {
    pub const fn new(version: i64, description: &'static str, up: &'static str) -> Self {
        Self {
            version,
            description,
            up,
        }
    }
}

pub fn storage_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "Create api_keys table",
            r#"
            CREATE TABLE IF NOT EXISTS api_keys (
                key VARCHAR(255) PRIMARY KEY,
                owner VARCHAR(255) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            "#,
        ),
        Migration::new(
            2,
            "Create anime table",
            r#"
            CREATE TABLE IF NOT EXISTS anime (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_anime_name_lower ON anime (LOWER(name));
            "#,
        ),
        Migration::new(
            3,
            "Create anime_characters table",
            r#"
            CREATE TABLE IF NOT EXISTS anime_characters (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                anime_id BIGINT NOT NULL REFERENCES anime (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_anime_characters_name_lower
                ON anime_characters (LOWER(name));
            "#,
        ),
        Migration::new(
            4,
            "Create quotes table",
            r#"
            CREATE TABLE IF NOT EXISTS quotes (
                id BIGSERIAL PRIMARY KEY,
                content TEXT NOT NULL,
                anime_id BIGINT REFERENCES anime (id) ON DELETE SET NULL,
                anime_character_id BIGINT REFERENCES anime_characters (id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_quotes_anime_id ON quotes (anime_id);
            CREATE INDEX IF NOT EXISTS idx_quotes_anime_character_id ON quotes (anime_character_id);
            "#,
        ),
    ]
}

/// Runs all pending migrations in version order
pub async fn run_storage_migrations(pool: &PgPool) -> Result<(), DomainError> {
    let migrator = PostgresMigrator::new(pool.clone());

    for migration in storage_migrations() {
        if migrator.run_migration(&migration).await? {
            tracing::info!(
                version = migration.version,
                description = migration.description,
                "Applied migration"
            );
        }
    }

    Ok(())
}
