//! Postgres-backed full-text search store.
//!
//! One `documents` table per Postgres instance, discriminated by
//! `project_slug` so a single container can back multiple projects.
//! Schema creation is "ensure, don't assume": `open` always issues
//! `CREATE TABLE/INDEX IF NOT EXISTS` rather than trusting a prior run
//! left things in place, the same posture the store this module
//! replaces took toward its on-disk index directory.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool, Row};

use crate::error::{AgentdxError, Result};

/// A chunk ready to be written to the store.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub path: String,
    pub start_line: i32,
    pub end_line: i32,
    pub kind: String,
    pub content: String,
    pub hash: String,
}

/// A single full-text search hit.
#[derive(Debug, Clone, FromRow)]
pub struct FtsHit {
    pub path: String,
    pub start_line: i32,
    pub end_line: i32,
    pub kind: String,
    pub content: String,
    pub rank: f32,
}

#[derive(Debug, Clone, Default)]
pub struct FtsStats {
    pub document_count: i64,
    pub distinct_files: i64,
    pub index_size_bytes: i64,
    pub last_updated: Option<DateTime<Utc>>,
}

/// A distinct indexed file with its chunk count and most recent update.
#[derive(Debug, Clone, FromRow)]
pub struct FileStat {
    pub path: String,
    pub mod_time: DateTime<Utc>,
    pub chunk_count: i64,
}

/// Single-ping connectivity summary, for `doctor`/health surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    #[serde(rename = "type")]
    pub backend_type: String,
    pub host: String,
    pub name: String,
    pub healthy: bool,
}

/// Full-text search store for a single project, identified by `project_slug`.
pub struct FtsStore {
    pool: PgPool,
    project_slug: String,
    host: String,
}

impl FtsStore {
    /// Connect to Postgres (with bounded retry for transient startup
    /// failures right after the container comes up) and ensure the schema
    /// exists.
    pub async fn connect(database_url: &str, project_slug: impl Into<String>) -> Result<Self> {
        let options: PgConnectOptions = database_url
            .parse()
            .map_err(|e: sqlx::Error| AgentdxError::connect(e.to_string()))?;
        let host = options.get_host().to_string();

        let pool = Self::connect_with_retry(database_url).await?;
        let store = Self {
            pool,
            project_slug: project_slug.into(),
            host,
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn connect_with_retry(database_url: &str) -> Result<PgPool> {
        let options: PgConnectOptions = database_url
            .parse()
            .map_err(|e: sqlx::Error| AgentdxError::connect(e.to_string()))?;

        let max_retries = 5;
        let mut last_error = None;

        for attempt in 0..max_retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(200 * (1 << attempt))).await;
            }

            match PgPoolOptions::new()
                .max_connections(8)
                .acquire_timeout(Duration::from_secs(5))
                .connect_with(options.clone())
                .await
            {
                Ok(pool) => return Ok(pool),
                Err(e) => last_error = Some(e),
            }
        }

        Err(AgentdxError::NotReady {
            message: format!(
                "could not connect to Postgres after {max_retries} attempts: {}",
                last_error.map(|e| e.to_string()).unwrap_or_default()
            ),
        })
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id BIGSERIAL PRIMARY KEY,
                project_slug TEXT NOT NULL,
                path TEXT NOT NULL,
                start_line INT NOT NULL,
                end_line INT NOT NULL,
                kind TEXT NOT NULL,
                content TEXT NOT NULL,
                hash TEXT NOT NULL,
                search_vector tsvector GENERATED ALWAYS AS (to_tsvector('english', content)) STORED,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (project_slug, path, start_line, end_line)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AgentdxError::schema(format!("creating documents table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS documents_search_idx ON documents USING GIN (search_vector)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AgentdxError::schema(format!("creating search index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS documents_project_path_idx ON documents (project_slug, path)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AgentdxError::schema(format!("creating path index: {e}")))?;

        Ok(())
    }

    /// Atomically replace every chunk previously recorded for `path` with
    /// `chunks`: one transaction deletes the old rows and inserts the new
    /// ones, so a shrinking chunk count never leaves orphaned rows behind
    /// and a concurrent reader never observes a half-replaced file.
    pub async fn upsert_file(&self, path: &str, chunks: &[ChunkRecord]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AgentdxError::store(format!("starting transaction for {path}: {e}")))?;

        sqlx::query("DELETE FROM documents WHERE project_slug = $1 AND path = $2")
            .bind(&self.project_slug)
            .bind(path)
            .execute(&mut *tx)
            .await
            .map_err(|e| AgentdxError::store(format!("clearing old chunks for {path}: {e}")))?;

        for record in chunks {
            sqlx::query(
                r#"
                INSERT INTO documents (project_slug, path, start_line, end_line, kind, content, hash)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(&self.project_slug)
            .bind(&record.path)
            .bind(record.start_line)
            .bind(record.end_line)
            .bind(&record.kind)
            .bind(&record.content)
            .bind(&record.hash)
            .execute(&mut *tx)
            .await
            .map_err(|e| AgentdxError::store(format!("inserting chunk for {path}: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| AgentdxError::store(format!("committing chunks for {path}: {e}")))?;

        Ok(())
    }

    /// Delete every chunk previously recorded for `path`.
    pub async fn delete_file(&self, path: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE project_slug = $1 AND path = $2")
            .bind(&self.project_slug)
            .bind(path)
            .execute(&self.pool)
            .await
            .map_err(|e| AgentdxError::store(format!("deleting {path}: {e}")))?;
        Ok(())
    }

    /// Search with a quoted-phrase / plain-terms query split, ranked by
    /// `ts_rank`. Falls back to a plain-terms query if the phrase parse
    /// fails (malformed quoting).
    pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<FtsHit>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(AgentdxError::query("empty search query"));
        }

        let rows = if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() > 1 {
            let phrase = &trimmed[1..trimmed.len() - 1];
            self.search_with("phraseto_tsquery", phrase, limit).await
        } else {
            self.search_with("plainto_tsquery", trimmed, limit).await
        };

        match rows {
            Ok(hits) => Ok(hits),
            Err(_) => self.search_with("plainto_tsquery", trimmed, limit).await,
        }
    }

    async fn search_with(&self, tsquery_fn: &str, terms: &str, limit: i64) -> Result<Vec<FtsHit>> {
        let sql = format!(
            r#"
            SELECT path, start_line, end_line, kind, content,
                   ts_rank(search_vector, {tsquery_fn}('english', $2)) AS rank
            FROM documents
            WHERE project_slug = $1
              AND search_vector @@ {tsquery_fn}('english', $2)
            ORDER BY rank DESC
            LIMIT $3
            "#
        );

        let rows = sqlx::query(&sql)
            .bind(&self.project_slug)
            .bind(terms)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AgentdxError::query(format!("search failed: {e}")))?;

        rows.into_iter()
            .map(|row| {
                Ok(FtsHit {
                    path: row.try_get("path").map_err(|e| AgentdxError::store(e.to_string()))?,
                    start_line: row
                        .try_get("start_line")
                        .map_err(|e| AgentdxError::store(e.to_string()))?,
                    end_line: row
                        .try_get("end_line")
                        .map_err(|e| AgentdxError::store(e.to_string()))?,
                    kind: row.try_get("kind").map_err(|e| AgentdxError::store(e.to_string()))?,
                    content: row
                        .try_get("content")
                        .map_err(|e| AgentdxError::store(e.to_string()))?,
                    rank: row.try_get("rank").map_err(|e| AgentdxError::store(e.to_string()))?,
                })
            })
            .collect()
    }

    pub async fn stats(&self) -> Result<FtsStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS document_count, COUNT(DISTINCT path) AS distinct_files,
                    MAX(updated_at) AS last_updated
             FROM documents WHERE project_slug = $1",
        )
        .bind(&self.project_slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AgentdxError::store(format!("stats query failed: {e}")))?;

        let size_row = sqlx::query("SELECT pg_total_relation_size('documents') AS size_bytes")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AgentdxError::store(format!("size query failed: {e}")))?;

        Ok(FtsStats {
            document_count: row.try_get("document_count").unwrap_or(0),
            distinct_files: row.try_get("distinct_files").unwrap_or(0),
            last_updated: row.try_get("last_updated").unwrap_or(None),
            index_size_bytes: size_row.try_get("size_bytes").unwrap_or(0),
        })
    }

    /// Every distinct file currently indexed for this project, with its
    /// chunk count and most recent chunk update time.
    pub async fn list_files_with_stats(&self) -> Result<Vec<FileStat>> {
        let rows = sqlx::query(
            "SELECT path, MAX(updated_at) AS mod_time, COUNT(*) AS chunk_count
             FROM documents
             WHERE project_slug = $1
             GROUP BY path
             ORDER BY path",
        )
        .bind(&self.project_slug)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AgentdxError::store(format!("listing files failed: {e}")))?;

        rows.into_iter()
            .map(|row| {
                Ok(FileStat {
                    path: row.try_get("path").map_err(|e| AgentdxError::store(e.to_string()))?,
                    mod_time: row
                        .try_get("mod_time")
                        .map_err(|e| AgentdxError::store(e.to_string()))?,
                    chunk_count: row
                        .try_get("chunk_count")
                        .map_err(|e| AgentdxError::store(e.to_string()))?,
                })
            })
            .collect()
    }

    /// A single `SELECT 1` ping, for health-check surfaces.
    pub async fn backend_status(&self) -> BackendStatus {
        let healthy = sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok();
        BackendStatus {
            backend_type: "postgres".to_string(),
            host: self.host.clone(),
            name: self.project_slug.clone(),
            healthy,
        }
    }

    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE project_slug = $1")
            .bind(&self.project_slug)
            .execute(&self.pool)
            .await
            .map_err(|e| AgentdxError::store(format!("clear failed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These exercise real SQL against a live Postgres instance and are not
    // run in this environment; they document the intended behavior.
    #[tokio::test]
    #[ignore = "requires a running Postgres instance (AGENTDX_TEST_DATABASE_URL)"]
    async fn test_upsert_and_search_roundtrip() {
        let url = std::env::var("AGENTDX_TEST_DATABASE_URL").unwrap();
        let store = FtsStore::connect(&url, "test_project").await.unwrap();
        store.clear().await.unwrap();

        store
            .upsert_file(
                "src/lib.rs",
                &[ChunkRecord {
                    path: "src/lib.rs".into(),
                    start_line: 1,
                    end_line: 10,
                    kind: "window".into(),
                    content: "fn authenticate_user(token: &str) -> bool { true }".into(),
                    hash: "abc".into(),
                }],
            )
            .await
            .unwrap();

        let hits = store.search("authenticate", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "src/lib.rs");
    }

    #[tokio::test]
    #[ignore = "requires a running Postgres instance (AGENTDX_TEST_DATABASE_URL)"]
    async fn test_delete_file_removes_chunks() {
        let url = std::env::var("AGENTDX_TEST_DATABASE_URL").unwrap();
        let store = FtsStore::connect(&url, "test_project").await.unwrap();
        store.clear().await.unwrap();

        store
            .upsert_file(
                "a.rs",
                &[ChunkRecord {
                    path: "a.rs".into(),
                    start_line: 1,
                    end_line: 5,
                    kind: "window".into(),
                    content: "struct Foo;".into(),
                    hash: "h".into(),
                }],
            )
            .await
            .unwrap();
        store.delete_file("a.rs").await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.document_count, 0);
    }

    #[tokio::test]
    #[ignore = "requires a running Postgres instance (AGENTDX_TEST_DATABASE_URL)"]
    async fn test_upsert_file_shrinks_chunk_count_atomically() {
        let url = std::env::var("AGENTDX_TEST_DATABASE_URL").unwrap();
        let store = FtsStore::connect(&url, "test_project").await.unwrap();
        store.clear().await.unwrap();

        let three_chunks: Vec<ChunkRecord> = (0..3)
            .map(|i| ChunkRecord {
                path: "a.go".into(),
                start_line: i * 10 + 1,
                end_line: i * 10 + 10,
                kind: "window".into(),
                content: format!("legacy_marker_{i}"),
                hash: format!("h{i}"),
            })
            .collect();
        store.upsert_file("a.go", &three_chunks).await.unwrap();

        store
            .upsert_file(
                "a.go",
                &[ChunkRecord {
                    path: "a.go".into(),
                    start_line: 1,
                    end_line: 10,
                    kind: "window".into(),
                    content: "fresh_marker".into(),
                    hash: "h-new".into(),
                }],
            )
            .await
            .unwrap();

        let listed = store.list_files_with_stats().await.unwrap();
        let a_go = listed.iter().find(|f| f.path == "a.go").unwrap();
        assert_eq!(a_go.chunk_count, 1);

        let stale_hits = store.search("legacy_marker_0", 10).await.unwrap();
        assert!(stale_hits.iter().all(|h| h.path != "a.go"));
    }
}
