// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::config::RetryPolicy;
use crate::models::row::ResultRow;
use crate::services::sink::{retry_with_backoff, RowSink};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Appends batches to a local CSV file, writing the header only when the
/// file is missing or empty.
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub const RETRY: RetryPolicy = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_secs(1),
    };

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn needs_header(&self) -> Result<bool> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.len() == 0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e).with_context(|| format!("checking {}", self.path.display())),
        }
    }

    /// One write attempt. On failure the file is cut back to its previous
    /// length so a retry never sees half a batch.
    async fn write_rows(&self, rows: &[ResultRow], with_header: bool) -> Result<()> {
        let buffer = encode(rows, with_header)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening {}", self.path.display()))?;
        let previous_len = file.metadata().await?.len();

        let written = async {
            file.write_all(&buffer).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            if let Err(truncate) = file.set_len(previous_len).await {
                tracing::warn!(path = %self.path.display(), error = %truncate, "failed to roll back partial csv write");
            }
            return Err(e).with_context(|| format!("writing {}", self.path.display()));
        }

        tracing::debug!(path = %self.path.display(), rows = rows.len(), with_header, "csv rows appended");
        Ok(())
    }
}

fn encode(rows: &[ResultRow], with_header: bool) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(with_header)
        .from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to finish CSV buffer: {}", e.error()))
}

#[async_trait]
impl RowSink for CsvFileSink {
    fn name(&self) -> &str {
        "csv"
    }

    async fn append(&self, rows: &[ResultRow]) -> Result<()> {
        let with_header = self.needs_header().await?;
        self.write_rows(rows, with_header).await
    }

    /// The header decision is taken once per batch, before the first attempt
    async fn deliver(&self, rows: &[ResultRow], policy: RetryPolicy) -> Result<()> {
        let with_header = self.needs_header().await?;
        retry_with_backoff(self.name(), policy, || self.write_rows(rows, with_header)).await
    }
}
