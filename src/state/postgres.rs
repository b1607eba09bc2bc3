use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use super::{StateError, StateStore};
use crate::config::DatabaseConfig;

/// Initialize the database connection pool and bring the schema up to date.
pub async fn init_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections.unwrap_or(10))
        .min_connections(config.min_connections.unwrap_or(1))
        .connect(&config.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Client state in the `client_state` table, one JSONB row per key.
#[derive(Debug, Clone)]
pub struct PgStateStore {
    pool: PgPool,
}

impl PgStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn load(&self, session: Uuid, key: &str) -> Result<Option<Value>, StateError> {
        let value = sqlx::query_scalar::<_, Value>(
            "SELECT value FROM client_state WHERE session_id = $1 AND key = $2",
        )
        .bind(session)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn save(&self, session: Uuid, key: &str, value: Value) -> Result<(), StateError> {
        sqlx::query(
            r#"
            INSERT INTO client_state (session_id, key, value, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (session_id, key)
            DO UPDATE SET value = EXCLUDED.value, updated_at = now()
            "#,
        )
        .bind(session)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, session: Uuid, key: &str) -> Result<(), StateError> {
        sqlx::query("DELETE FROM client_state WHERE session_id = $1 AND key = $2")
            .bind(session)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear(&self, session: Uuid) -> Result<(), StateError> {
        sqlx::query("DELETE FROM client_state WHERE session_id = $1")
            .bind(session)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StateError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
