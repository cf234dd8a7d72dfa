// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::services::db::StoreError;
use crate::services::logging::mask_key;
use crate::services::pipeline::{PipelineError, SearchPipeline};
use crate::services::progress::ProgressTracker;
use crate::services::sink::{BatchSink, FlushReport};
use crate::services::youtube::YouTubeApi;

#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("keyword #{index} ({keyword:?}) failed: {source}")]
    Search {
        index: usize,
        keyword: String,
        #[source]
        source: PipelineError,
    },
    #[error("progress store: {0}")]
    Progress(#[from] StoreError),
}

impl HarvestError {
    fn is_quota_exhausted(&self) -> bool {
        matches!(self, HarvestError::Search { source, .. } if source.is_quota_exhausted())
    }
}

/// What a run did, for logging and for callers that want to act on it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Cursor value when the run started
    pub start_index: usize,
    /// Cursor value when the run ended
    pub next_index: usize,
    pub keywords_processed: usize,
    pub keywords_skipped: usize,
    pub rows_produced: usize,
    /// Flushes that carried at least one row
    pub flushes: usize,
    /// Flushes where at least one sink lost the batch
    pub incomplete_flushes: usize,
    /// All API keys ran out before the keyword list did
    pub stopped_on_quota: bool,
    /// Units charged per key, with keys masked
    pub units_by_key: Vec<(String, u64)>,
    pub total_units: u64,
}

/// Drives the keyword list from the persisted cursor: search, accumulate,
/// advance the cursor, flush every batch.
pub struct Harvester<A> {
    pipeline: SearchPipeline<A>,
    progress: ProgressTracker,
    sink: BatchSink,
}

impl<A: YouTubeApi> Harvester<A> {
    pub fn new(pipeline: SearchPipeline<A>, progress: ProgressTracker, sink: BatchSink) -> Self {
        Self {
            pipeline,
            progress,
            sink,
        }
    }

    /// Process `keywords[cursor..]`. `source_urls` is parallel to `keywords`
    /// and may be shorter.
    ///
    /// Running out of API keys ends the run cleanly with pending rows flushed.
    /// Any other failure returns an error without flushing. Both stores are
    /// closed on every path.
    pub async fn run(
        mut self,
        keywords: &[String],
        source_urls: &[String],
    ) -> Result<RunSummary, HarvestError> {
        let mut summary = RunSummary {
            start_index: self.progress.current(),
            ..RunSummary::default()
        };
        tracing::info!(
            start = summary.start_index,
            total = keywords.len(),
            "starting keyword run"
        );

        let outcome = self.process(keywords, source_urls, &mut summary).await;

        let result = match outcome {
            Ok(()) => Ok(()),
            Err(e) if e.is_quota_exhausted() => {
                tracing::warn!(error = %e, "all API keys exhausted, stopping early");
                summary.stopped_on_quota = true;
                Ok(())
            }
            Err(e) => Err(e),
        };

        if result.is_ok() {
            if let Some(report) = self.sink.finish().await {
                tracing::info!(rows = report.rows, "final batch flushed");
                record_flush(&mut summary, &report);
            }
        } else if !self.sink.pending().is_empty() {
            tracing::warn!(
                rows = self.sink.pending().len(),
                "run aborted, unflushed rows discarded"
            );
        }

        summary.next_index = self.progress.current();
        self.record_usage(&mut summary);
        self.pipeline.close().await;
        self.progress.close().await;

        result.map(|()| summary)
    }

    async fn process(
        &mut self,
        keywords: &[String],
        source_urls: &[String],
        summary: &mut RunSummary,
    ) -> Result<(), HarvestError> {
        for (index, keyword) in keywords.iter().enumerate().skip(summary.start_index) {
            let keyword = keyword.trim();
            if keyword.is_empty() {
                tracing::debug!(index, "blank keyword skipped");
                summary.keywords_skipped += 1;
            } else {
                let source_url = source_urls.get(index).map(|s| s.trim()).unwrap_or("");
                let rows = self
                    .pipeline
                    .run(keyword, source_url)
                    .await
                    .map_err(|source| HarvestError::Search {
                        index,
                        keyword: keyword.to_string(),
                        source,
                    })?;

                tracing::info!(index, keyword, rows = rows.len(), "keyword done");
                summary.keywords_processed += 1;
                summary.rows_produced += rows.len();
                self.sink.add(rows);
            }

            self.progress.advance(index + 1).await?;

            if self.sink.keyword_completed() {
                let report = self.sink.flush().await;
                record_flush(summary, &report);
            }
        }
        Ok(())
    }

    fn record_usage(&self, summary: &mut RunSummary) {
        let pool = self.pipeline.executor().pool();
        for credential in pool.credentials() {
            let masked = mask_key(credential.key());
            tracing::info!(
                key = %masked,
                units = credential.used_units(),
                active = credential.is_active(),
                "quota usage"
            );
            summary.units_by_key.push((masked, credential.used_units()));
        }
        summary.total_units = pool.total_units();
        tracing::info!(
            total_units = summary.total_units,
            keywords = summary.keywords_processed,
            rows = summary.rows_produced,
            next_index = summary.next_index,
            "run finished"
        );
    }
}

fn record_flush(summary: &mut RunSummary, report: &FlushReport) {
    if report.rows == 0 {
        return;
    }
    summary.flushes += 1;
    if !report.all_delivered() {
        summary.incomplete_flushes += 1;
        tracing::warn!(rows = report.rows, "batch missing from at least one sink");
    }
}
