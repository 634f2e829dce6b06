//! Article history store.
//!
//! One record per completed pipeline run, written after SEO scoring.
//! Listed newest-first, deleted only in bulk.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("stored SEO analysis is not valid JSON: {0}")]
    CorruptRecord(#[from] serde_json::Error),
    #[error("history lock poisoned")]
    LockPoisoned,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleRecord {
    pub id: String,
    pub subject: String,
    pub html: String,
    #[serde(rename = "seoAnalysis")]
    pub seo_analysis: Value,
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
}

pub struct HistoryStore {
    conn: Mutex<Connection>,
}

impl HistoryStore {
    /// Open (or create) the store at `path`; `:memory:` for ephemeral runs.
    pub fn open(path: &str) -> Result<Self, HistoryError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        conn.execute(
            "CREATE TABLE IF NOT EXISTS articles (
                id TEXT PRIMARY KEY,
                subject TEXT NOT NULL,
                html TEXT NOT NULL,
                seo_analysis TEXT NOT NULL,
                generated_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn insert(
        &self,
        subject: &str,
        html: &str,
        seo_analysis: &Value,
    ) -> Result<ArticleRecord, HistoryError> {
        let record = ArticleRecord {
            id: Uuid::new_v4().to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
            seo_analysis: seo_analysis.clone(),
            generated_at: Utc::now(),
        };
        let conn = self.conn.lock().map_err(|_| HistoryError::LockPoisoned)?;
        conn.execute(
            "INSERT INTO articles (id, subject, html, seo_analysis, generated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                record.id,
                record.subject,
                record.html,
                record.seo_analysis.to_string(),
                record.generated_at.to_rfc3339(),
            ],
        )?;
        Ok(record)
    }

    /// All records, newest first.
    pub fn list(&self) -> Result<Vec<ArticleRecord>, HistoryError> {
        let conn = self.conn.lock().map_err(|_| HistoryError::LockPoisoned)?;
        let mut stmt = conn.prepare(
            "SELECT id, subject, html, seo_analysis, generated_at
             FROM articles ORDER BY generated_at DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, subject, html, seo_analysis, generated_at) = row?;
            records.push(ArticleRecord {
                id,
                subject,
                html,
                seo_analysis: serde_json::from_str(&seo_analysis)?,
                generated_at: generated_at
                    .parse::<DateTime<Utc>>()
                    .unwrap_or_else(|_| Utc::now()),
            });
        }
        Ok(records)
    }

    /// Delete everything. Returns the number of removed records.
    pub fn clear(&self) -> Result<usize, HistoryError> {
        let conn = self.conn.lock().map_err(|_| HistoryError::LockPoisoned)?;
        Ok(conn.execute("DELETE FROM articles", [])?)
    }
}
