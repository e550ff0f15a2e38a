//! Optional export of the final entries to an external document store.
//!
//! A "collection" is a Postgres table holding one JSONB document per entry.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use imenik_common::{Config, Entry};

#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Insert every entry as a new document. Returns the number inserted.
    async fn insert_entries(&self, entries: &[Entry]) -> Result<u64>;
    fn name(&self) -> &str;
}

pub struct PostgresSink {
    pool: PgPool,
    collection: String,
}

impl PostgresSink {
    pub async fn connect(database_url: &str, collection: &str) -> Result<Self> {
        validate_collection(collection)?;
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url)
            .await
            .context("Failed to connect to document store")?;

        let sink = Self {
            pool,
            collection: collection.to_string(),
        };
        sink.ensure_collection().await?;
        Ok(sink)
    }

    async fn ensure_collection(&self) -> Result<()> {
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS "{}" (
                id          BIGSERIAL PRIMARY KEY,
                document    JSONB NOT NULL,
                inserted_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            self.collection
        );
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to create collection {}", self.collection))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentSink for PostgresSink {
    async fn insert_entries(&self, entries: &[Entry]) -> Result<u64> {
        let insert = format!(r#"INSERT INTO "{}" (document) VALUES ($1)"#, self.collection);

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;
        for entry in entries {
            let document = serde_json::to_value(entry)?;
            inserted += sqlx::query(&insert)
                .bind(document)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;

        Ok(inserted)
    }

    fn name(&self) -> &str {
        &self.collection
    }
}

/// Collection names are interpolated into SQL, so only plain identifiers pass.
fn validate_collection(collection: &str) -> Result<()> {
    let mut chars = collection.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') || collection.len() > 63 {
        bail!("Invalid collection name {collection:?}: use letters, digits and underscores");
    }
    Ok(())
}

/// Export `entries` if a connection string is configured. Every failure is
/// logged and swallowed; the JSON output is unaffected.
pub async fn export_entries(config: &Config, entries: &[Entry]) {
    let Some(database_url) = config.database_url.as_deref() else {
        warn!("DATABASE_URL not set, skipping document store export");
        return;
    };

    let sink = match PostgresSink::connect(database_url, &config.sink_collection).await {
        Ok(sink) => sink,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Document store unavailable, skipping export");
            return;
        }
    };

    match sink.insert_entries(entries).await {
        Ok(inserted) => info!(collection = sink.name(), inserted, "Exported entries to document store"),
        Err(e) => warn!(collection = sink.name(), error = %format!("{e:#}"), "Document store export failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_must_be_identifiers() {
        assert!(validate_collection("entries").is_ok());
        assert!(validate_collection("_imenik_2024").is_ok());
        assert!(validate_collection("").is_err());
        assert!(validate_collection("2024_entries").is_err());
        assert!(validate_collection("entries; DROP TABLE x").is_err());
        assert!(validate_collection("imenik\"entries").is_err());
    }

    #[tokio::test]
    async fn missing_database_url_skips_export() {
        let config = Config::default();
        // Returns without attempting a connection.
        export_entries(&config, &[]).await;
    }
}
