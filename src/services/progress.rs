// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::services::db::{open_sqlite, StoreError};
use sqlx::sqlite::SqlitePool;
use std::path::Path;

/// Durable cursor over the keyword list: the index of the next keyword to process.
pub struct ProgressTracker {
    pool: SqlitePool,
    current: usize,
}

impl ProgressTracker {
    /// Open the store and load the last persisted index (0 on a fresh run)
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let pool = open_sqlite(path).await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS progress (
                id         INTEGER PRIMARY KEY CHECK (id = 0),
                last_index INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        let stored: Option<i64> = sqlx::query_scalar("SELECT last_index FROM progress WHERE id = 0")
            .fetch_optional(&pool)
            .await?;

        Ok(Self {
            pool,
            current: stored.unwrap_or(0).max(0) as usize,
        })
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Persist immediately. The stored value never moves backwards.
    pub async fn advance(&mut self, index: usize) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO progress (id, last_index) VALUES (0, ?)
             ON CONFLICT(id) DO UPDATE SET last_index = MAX(last_index, excluded.last_index)",
        )
        .bind(index as i64)
        .execute(&self.pool)
        .await?;

        self.current = self.current.max(index);
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fresh_store_starts_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let progress = ProgressTracker::open(&dir.path().join("progress.db"))
            .await
            .unwrap();
        assert_eq!(progress.current(), 0);
    }

    #[tokio::test]
    async fn test_advance_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.db");

        let mut progress = ProgressTracker::open(&path).await.unwrap();
        progress.advance(1).await.unwrap();
        progress.advance(2).await.unwrap();
        progress.close().await;

        let reopened = ProgressTracker::open(&path).await.unwrap();
        assert_eq!(reopened.current(), 2);
    }

    #[tokio::test]
    async fn test_cursor_never_moves_backwards() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.db");

        let mut progress = ProgressTracker::open(&path).await.unwrap();
        progress.advance(5).await.unwrap();
        progress.advance(3).await.unwrap();
        assert_eq!(progress.current(), 5);
        progress.close().await;

        let reopened = ProgressTracker::open(&path).await.unwrap();
        assert_eq!(reopened.current(), 5);
    }
}
