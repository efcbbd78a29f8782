use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::domain::{Counter, CounterId, Delta};

/// When more than one record exists, the one with the lowest id is canonical.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn fetch_or_create(&self) -> Result<Counter>;

    /// Creates the counter with `value = delta` if none exists.
    async fn apply_delta(&self, delta: Delta) -> Result<Counter>;
}

pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data/server.db";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(raw_database_url: &str) -> Result<Self> {
        let database_url = normalize_database_url(raw_database_url);
        ensure_sqlite_parent_dir_exists(&database_url)?;

        let connect_options = SqliteConnectOptions::from_str(&database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open sqlite database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run counter migrations")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn list_counters(&self) -> Result<Vec<Counter>> {
        let rows = sqlx::query("SELECT id, value, updated_at FROM counters ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .context("failed to list counters")?;
        rows.iter().map(counter_from_row).collect()
    }

    // Emptiness check and insert are one statement so concurrent first calls cannot both insert.
    async fn insert_if_absent(&self, initial_value: i64) -> Result<Option<Counter>> {
        let row = sqlx::query(
            "INSERT INTO counters (value, updated_at)
             SELECT ?, ?
             WHERE NOT EXISTS (SELECT 1 FROM counters)
             RETURNING id, value, updated_at",
        )
        .bind(initial_value)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .context("failed to create counter")?;
        row.as_ref().map(counter_from_row).transpose()
    }

    async fn canonical_counter(&self) -> Result<Option<Counter>> {
        let row = sqlx::query(
            "SELECT id, value, updated_at FROM counters ORDER BY id ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .context("failed to load counter")?;
        row.as_ref().map(counter_from_row).transpose()
    }
}

#[async_trait]
impl CounterStore for Storage {
    async fn fetch_or_create(&self) -> Result<Counter> {
        if let Some(existing) = self.canonical_counter().await? {
            return Ok(existing);
        }
        if let Some(created) = self.insert_if_absent(0).await? {
            debug!(counter_id = created.id.0, "created counter");
            return Ok(created);
        }
        // Lost the creation race to a concurrent caller; its record is canonical now.
        self.canonical_counter()
            .await?
            .context("counter vanished after concurrent creation")
    }

    async fn apply_delta(&self, delta: Delta) -> Result<Counter> {
        if let Some(created) = self.insert_if_absent(delta.0).await? {
            debug!(counter_id = created.id.0, value = created.value, "created counter");
            return Ok(created);
        }

        let row = sqlx::query(
            "UPDATE counters
             SET value = value + ?, updated_at = ?
             WHERE id = (SELECT id FROM counters ORDER BY id ASC LIMIT 1)
             RETURNING id, value, updated_at",
        )
        .bind(delta.0)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to apply delta {} to counter", delta.0))?;
        counter_from_row(&row)
    }
}

fn counter_from_row(row: &SqliteRow) -> Result<Counter> {
    Ok(Counter {
        id: CounterId(row.try_get::<i64, _>("id")?),
        value: row.try_get::<i64, _>("value")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

/// Windows drive paths keep a single colon after the scheme.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return DEFAULT_DATABASE_URL.to_string();
    }

    if raw_database_url.starts_with("sqlite::memory:") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite://") {
        return sqlite_url_for_path(path);
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return sqlite_url_for_path(path);
    }

    if raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    sqlite_url_for_path(raw_database_url)
}

fn sqlite_url_for_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    if is_windows_drive_path(&path) {
        format!("sqlite:{path}")
    } else {
        format!("sqlite://{path}")
    }
}

fn is_windows_drive_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || bytes[2] == b'/')
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
