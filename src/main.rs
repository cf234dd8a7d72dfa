// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tubeharvest::models::config::HarvestConfig;
use tubeharvest::services::cache::ResponseCache;
use tubeharvest::services::credential_pool::CredentialPool;
use tubeharvest::services::csv_sink::CsvFileSink;
use tubeharvest::services::executor::RequestExecutor;
use tubeharvest::services::logging::init_tracing;
use tubeharvest::services::pipeline::SearchPipeline;
use tubeharvest::services::progress::ProgressTracker;
use tubeharvest::services::runner::Harvester;
use tubeharvest::services::sheets::{ServiceAccountAuth, SheetsClient, SheetsSink};
use tubeharvest::services::sink::BatchSink;
use tubeharvest::services::youtube::YouTubeClient;
use tubeharvest::VERSION;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // A missing .env is fine; flags and the real environment still apply
    dotenv::dotenv().ok();
    init_tracing();

    let config = HarvestConfig::parse().validate()?;
    let user_agent = format!("tubeharvest/{VERSION}");
    tracing::info!(
        version = VERSION,
        keys = config.api_keys.len(),
        batch_size = config.batch_size,
        "tubeharvest starting"
    );

    let http = reqwest::Client::builder()
        .user_agent(&user_agent)
        .timeout(Duration::from_secs(60))
        .build()?;
    let auth = ServiceAccountAuth::from_file(http.clone(), &config.service_account_json).await?;
    tracing::info!(account = auth.client_email(), "service account loaded");
    let sheets = Arc::new(SheetsClient::new(http, auth, &config.sheet_id));

    let keywords = sheets
        .read_column(&config.keywords_range())
        .await
        .context("failed to read keywords")?;
    let source_urls = sheets
        .read_column(&config.source_urls_range())
        .await
        .context("failed to read source urls")?;
    tracing::info!(keywords = keywords.len(), "keyword list loaded");

    let cache = ResponseCache::open(&config.cache_db)
        .await
        .with_context(|| format!("failed to open cache {}", config.cache_db.display()))?;
    match cache.entries().await {
        Ok(entries) => tracing::info!(entries, "response cache opened"),
        Err(e) => tracing::warn!(error = %e, "could not count cached responses"),
    }
    let progress = match ProgressTracker::open(&config.progress_db).await {
        Ok(progress) => progress,
        Err(e) => {
            cache.close().await;
            return Err(e).with_context(|| {
                format!("failed to open progress store {}", config.progress_db.display())
            });
        }
    };

    let executor = RequestExecutor::new(
        YouTubeClient::new(&config.youtube_api_base, &user_agent)?,
        CredentialPool::new(config.api_keys.iter().cloned()),
        config.executor_backoff(),
    );
    let pipeline = SearchPipeline::new(executor, cache, config.search_settings());
    let csv = CsvFileSink::new(&config.output_csv);
    tracing::info!(path = %csv.path().display(), "writing results to csv");
    let sink = BatchSink::new(config.batch_size)
        .with_sink(csv, CsvFileSink::RETRY)
        .with_sink(
            SheetsSink::new(sheets, config.results_range()),
            SheetsSink::RETRY,
        );

    let summary = Harvester::new(pipeline, progress, sink)
        .run(&keywords, &source_urls)
        .await?;

    if summary.stopped_on_quota {
        tracing::warn!(
            next_index = summary.next_index,
            remaining = keywords.len().saturating_sub(summary.next_index),
            "stopped on exhausted quota; rerun with fresh keys to resume"
        );
    } else {
        tracing::info!(
            keywords = summary.keywords_processed,
            rows = summary.rows_produced,
            "all keywords processed"
        );
    }

    Ok(())
}
