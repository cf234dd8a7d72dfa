// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::services::db::{open_sqlite, StoreError};
use serde_json::Value;
use sqlx::sqlite::SqlitePool;
use std::path::Path;

/// Persistent memo of raw API responses keyed by the logical request.
///
/// Entries are never invalidated: a hit is replayed as-is, which is what keeps
/// a resumed run from spending quota on data it already fetched.
pub struct ResponseCache {
    pool: SqlitePool,
}

impl ResponseCache {
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let pool = open_sqlite(path).await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS responses (
                key  TEXT PRIMARY KEY NOT NULL,
                body TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let body: Option<String> = sqlx::query_scalar("SELECT body FROM responses WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    pub async fn put(&self, key: &str, response: &Value) -> Result<(), StoreError> {
        let body = serde_json::to_string(response)?;
        sqlx::query(
            "INSERT INTO responses (key, body) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET body = excluded.body",
        )
        .bind(key)
        .bind(body)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Number of stored responses
    pub async fn entries(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM responses")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Key for one page of search results
pub fn search_key(keyword: &str, region: &str, page_token: Option<&str>) -> String {
    format!("S:{}:{}:{}", keyword, region, page_token.unwrap_or(""))
}

/// Key for a batched video-detail lookup; ids keep search order
pub fn videos_key(ids: &[String]) -> String {
    format!("V:{}", ids.join(","))
}

/// Key for a batched channel lookup; callers pass ids sorted and distinct
pub fn channels_key(ids: &[String]) -> String {
    format!("C:{}", ids.join(","))
}
