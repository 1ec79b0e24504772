//! PostgreSQL store adapter.
//!
//! Uses runtime queries (`sqlx::query`) so the crate builds without a live
//! database. Each admin request maps to exactly one statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::config::StoreConfig;
use crate::model::{ConfigEntry, Key, Mode};
use crate::store::{ConfigStore, StoreError, StoreResult};

const SCHEMA: &str = include_str!("schema.sql");

const SELECT_ALL: &str = "
SELECT service, config_name, config_value, config_mode, updated_at
FROM dynconf.configs
";

// Values and modes arrive as two JSON objects joined on name, so the whole
// batch is one statement.
const UPSERT_BATCH: &str = "
INSERT INTO dynconf.configs (service, config_name, config_value, config_mode)
SELECT $1, d.key, d.value, m.value
FROM jsonb_each($2::jsonb) AS d
JOIN jsonb_each_text($3::jsonb) AS m ON d.key = m.key
ON CONFLICT (service, config_name)
DO UPDATE SET
    config_value = EXCLUDED.config_value,
    config_mode = EXCLUDED.config_mode,
    updated_at = NOW()
";

const DELETE_BATCH: &str = "
DELETE FROM dynconf.configs
WHERE service = $1 AND config_name = ANY($2)
";

fn schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

/// PostgreSQL-backed `ConfigStore`.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect using the `[store]` section of the service config.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.database_url)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            "Connected to PostgreSQL"
        );

        Ok(Self { pool })
    }

    /// Create the schema and table if they do not exist.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        for statement in schema_statements(SCHEMA) {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Migration(e.to_string()))?;
        }
        tracing::info!("Store schema is up to date");
        Ok(())
    }
}

fn decode_row(row: &PgRow) -> StoreResult<ConfigEntry> {
    let service: String = row.try_get("service").map_err(|e| StoreError::MalformedRow {
        key: "<unknown>".to_string(),
        reason: e.to_string(),
    })?;
    let config_name: String = row.try_get("config_name").map_err(|e| StoreError::MalformedRow {
        key: format!("{}/<unknown>", service),
        reason: e.to_string(),
    })?;
    let key = Key::new(service, config_name);

    let malformed = |reason: String| StoreError::MalformedRow {
        key: key.to_string(),
        reason,
    };

    let value: Value = row
        .try_get("config_value")
        .map_err(|e| malformed(e.to_string()))?;
    let mode: Mode = row
        .try_get::<String, _>("config_mode")
        .map_err(|e| malformed(e.to_string()))?
        .parse()
        .map_err(|e: crate::model::ParseModeError| malformed(e.to_string()))?;
    let updated_at: DateTime<Utc> = row
        .try_get("updated_at")
        .map_err(|e| malformed(e.to_string()))?;

    Ok(ConfigEntry {
        key,
        value,
        mode,
        updated_at,
    })
}

#[async_trait]
impl ConfigStore for PostgresStore {
    async fn fetch_all(&self) -> StoreResult<Vec<ConfigEntry>> {
        let rows = sqlx::query(SELECT_ALL).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn upsert_batch(
        &self,
        service: &str,
        values: &BTreeMap<String, Value>,
        modes: &BTreeMap<String, Mode>,
    ) -> StoreResult<()> {
        let result = sqlx::query(UPSERT_BATCH)
            .bind(service)
            .bind(Json(values))
            .bind(Json(modes))
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            service = %service,
            rows = result.rows_affected(),
            "Upserted config batch"
        );
        Ok(())
    }

    async fn delete_batch(&self, service: &str, names: &BTreeSet<String>) -> StoreResult<()> {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let result = sqlx::query(DELETE_BATCH)
            .bind(service)
            .bind(&names)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            service = %service,
            rows = result.rows_affected(),
            "Deleted config batch"
        );
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
