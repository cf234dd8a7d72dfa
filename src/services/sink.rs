// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::config::RetryPolicy;
use crate::models::row::ResultRow;
use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use tokio::time::sleep;

/// Destination for flushed result rows
#[async_trait]
pub trait RowSink: Send + Sync {
    fn name(&self) -> &str;

    async fn append(&self, rows: &[ResultRow]) -> Result<()>;

    /// Deliver one batch, retrying `append` under `policy`. Sinks that need
    /// per-batch setup before the first attempt override this.
    async fn deliver(&self, rows: &[ResultRow], policy: RetryPolicy) -> Result<()> {
        retry_with_backoff(self.name(), policy, || self.append(rows)).await
    }
}

/// Run `op` up to `policy.max_attempts` times, sleeping `base * 2^(n-1)` after
/// the n-th failure. Returns the last error once attempts are spent.
pub async fn retry_with_backoff<T, F, Fut>(label: &str, policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                let delay = policy.delay_for(attempt - 1);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_secs = delay.as_secs_f64(),
                    error = %e,
                    "{label} failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e.context(format!("{label} failed after {attempt} attempts")));
            }
        }
    }
}

/// Outcome of one sink delivery within a flush
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub sink: String,
    pub delivered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub rows: usize,
    pub deliveries: Vec<Delivery>,
}

impl FlushReport {
    pub fn all_delivered(&self) -> bool {
        self.deliveries.iter().all(|d| d.delivered)
    }
}

struct SinkSlot {
    sink: Box<dyn RowSink>,
    policy: RetryPolicy,
}

/// Accumulates rows and delivers them to every registered sink once per
/// `batch_size` keywords.
///
/// Deliveries are independent: a sink that exhausts its retries loses that
/// batch, the others still receive it, and the run carries on.
pub struct BatchSink {
    pending: Vec<ResultRow>,
    batch_size: usize,
    keywords_since_flush: usize,
    sinks: Vec<SinkSlot>,
}

impl BatchSink {
    pub fn new(batch_size: usize) -> Self {
        Self {
            pending: Vec::new(),
            batch_size: batch_size.max(1),
            keywords_since_flush: 0,
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: impl RowSink + 'static, policy: RetryPolicy) -> Self {
        self.sinks.push(SinkSlot {
            sink: Box::new(sink),
            policy,
        });
        self
    }

    pub fn add(&mut self, rows: Vec<ResultRow>) {
        self.pending.extend(rows);
    }

    pub fn pending(&self) -> &[ResultRow] {
        &self.pending
    }

    /// Count one finished keyword; true when a flush is due
    pub fn keyword_completed(&mut self) -> bool {
        self.keywords_since_flush += 1;
        self.keywords_since_flush >= self.batch_size
    }

    /// Deliver everything pending and clear the accumulator
    pub async fn flush(&mut self) -> FlushReport {
        let rows = std::mem::take(&mut self.pending);
        let keywords = std::mem::take(&mut self.keywords_since_flush);

        let mut report = FlushReport {
            rows: rows.len(),
            deliveries: Vec::with_capacity(self.sinks.len()),
        };
        if rows.is_empty() {
            tracing::info!(keywords, "nothing to flush");
            return report;
        }

        for slot in &self.sinks {
            let name = slot.sink.name().to_string();
            let result = slot.sink.deliver(&rows, slot.policy).await;

            let delivered = match result {
                Ok(()) => {
                    tracing::info!(sink = %name, rows = rows.len(), "batch delivered");
                    true
                }
                Err(e) => {
                    tracing::error!(sink = %name, rows = rows.len(), error = %format!("{e:#}"), "batch lost for sink");
                    false
                }
            };
            report.deliveries.push(Delivery {
                sink: name,
                delivered,
            });
        }

        tracing::info!(rows = report.rows, keywords, "batch flushed");
        report
    }

    /// Final flush at the end of a run, if anything is pending
    pub async fn finish(&mut self) -> Option<FlushReport> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.flush().await)
        }
    }
}
