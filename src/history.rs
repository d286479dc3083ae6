//! Session history: an ordered message log per opaque session id.
//!
//! The manager exclusively owns the log. Backends are pluggable at
//! construction time: an in-memory map for the process lifetime, or a
//! SQLite store that keeps the full record durably while `get` only
//! returns the most recent window for context construction.
//!
//! Both backends append the user and assistant turns of a generation
//! atomically, so a failed request never leaves a half-written turn.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tokio::sync::{Mutex, RwLock};

use crate::core::errors::ApiError;

pub const DEFAULT_SESSION_ID: &str = "default";

/// A stored conversation turn, immutable once appended.
#[derive(Debug, Clone, Serialize)]
pub struct StoredMessage {
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
    /// Non-decreasing within a session; defines replay order.
    pub timestamp: DateTime<Utc>,
}

/// Backing store for session histories.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The most recent messages for a session, oldest first, bounded by
    /// the store's history limit. Unknown sessions yield an empty log.
    async fn get(&self, session_id: &str) -> Result<Vec<StoredMessage>, ApiError>;

    /// Append one user/assistant pair atomically.
    async fn append_turn(
        &self,
        session_id: &str,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<(), ApiError>;

    /// Drop a session's history. Idempotent: clearing an absent session
    /// succeeds. Returns whether anything was actually removed.
    async fn clear(&self, session_id: &str) -> Result<bool, ApiError>;

    /// Cheap liveness probe for diagnostics. Never errors; an unreachable
    /// backend reports `false`.
    async fn ping(&self) -> bool;

    /// Short backend label for diagnostics.
    fn backend_name(&self) -> &'static str;
}

/// Process-lifetime history map.
///
/// A per-session mutex serializes read-modify-append so concurrent
/// requests on the same session never lose a turn. The outer map lock is
/// only held long enough to fetch or create the session entry.
pub struct MemoryHistory {
    limit: usize,
    sessions: RwLock<HashMap<String, Arc<Mutex<Vec<StoredMessage>>>>>,
}

impl MemoryHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    async fn session_log(&self, session_id: &str) -> Arc<Mutex<Vec<StoredMessage>>> {
        if let Some(log) = self.sessions.read().await.get(session_id) {
            return log.clone();
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
            .clone()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn get(&self, session_id: &str) -> Result<Vec<StoredMessage>, ApiError> {
        let Some(log) = self.sessions.read().await.get(session_id).cloned() else {
            return Ok(Vec::new());
        };
        let messages = log.lock().await;
        Ok(messages.clone())
    }

    async fn append_turn(
        &self,
        session_id: &str,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<(), ApiError> {
        let log = self.session_log(session_id).await;
        let mut messages = log.lock().await;

        let now = Utc::now();
        messages.push(StoredMessage {
            role: "user".to_string(),
            content: user_text.to_string(),
            timestamp: now,
        });
        messages.push(StoredMessage {
            role: "assistant".to_string(),
            content: assistant_text.to_string(),
            timestamp: now,
        });

        // Trim oldest entries; the in-memory log IS the full record.
        if messages.len() > self.limit {
            let excess = messages.len() - self.limit;
            messages.drain(..excess);
        }

        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<bool, ApiError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(session_id).is_some())
    }

    // The map lives in this process; reachable by construction.
    async fn ping(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Durable SQLite-backed history.
///
/// The full log is retained; `get` returns only the most recent window.
/// Turn atomicity comes from a single transaction per append.
pub struct SqliteHistory {
    pool: SqlitePool,
    limit: usize,
}

impl SqliteHistory {
    pub async fn new(db_path: PathBuf, limit: usize) -> Result<Self, ApiError> {
        let connect_options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(connect_options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool, limit };
        store.init_db().await?;
        Ok(store)
    }

    async fn init_db(&self) -> Result<(), ApiError> {
        sqlx::query(
            "\
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL CHECK(role IN ('user', 'assistant')),
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_session_id_id \
             ON messages(session_id, id)",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    async fn get(&self, session_id: &str) -> Result<Vec<StoredMessage>, ApiError> {
        let rows = sqlx::query(
            "\
            SELECT role, content, created_at
            FROM (
                SELECT id, role, content, created_at
                FROM messages
                WHERE session_id = ?1
                ORDER BY id DESC
                LIMIT ?2
            )
            ORDER BY id ASC",
        )
        .bind(session_id)
        .bind(self.limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        rows.into_iter()
            .map(|row| {
                let created_at: String = row.try_get("created_at")?;
                let timestamp = created_at
                    .parse::<DateTime<Utc>>()
                    .unwrap_or_else(|_| Utc::now());
                Ok(StoredMessage {
                    role: row.try_get("role")?,
                    content: row.try_get("content")?,
                    timestamp,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(ApiError::internal)
    }

    async fn append_turn(
        &self,
        session_id: &str,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        let now = Utc::now().to_rfc3339();

        for (role, content) in [("user", user_text), ("assistant", assistant_text)] {
            sqlx::query(
                "INSERT INTO messages (session_id, role, content, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(session_id)
            .bind(role)
            .bind(content)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM messages WHERE session_id = ?1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
