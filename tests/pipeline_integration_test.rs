// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

mod common;

use chrono::{TimeZone, Utc};
use common::FakeYouTube;
use std::path::Path;
use std::time::Duration;
use tubeharvest::models::api::ApiRequest;
use tubeharvest::models::config::{RetryPolicy, SearchSettings};
use tubeharvest::services::cache::ResponseCache;
use tubeharvest::services::credential_pool::CredentialPool;
use tubeharvest::services::executor::RequestExecutor;
use tubeharvest::services::pipeline::SearchPipeline;

// Pipeline tests run against an in-memory API and a temporary cache file.
// Run with: cargo test --test pipeline_integration_test

async fn pipeline(
    api: FakeYouTube,
    cache_path: &Path,
    settings: SearchSettings,
) -> SearchPipeline<FakeYouTube> {
    let executor = RequestExecutor::new(
        api,
        CredentialPool::new(["key-one-aaaaaaa", "key-two-bbbbbbb"]),
        RetryPolicy::new(3, Duration::from_secs(1)),
    );
    let cache = ResponseCache::open(cache_path)
        .await
        .expect("Failed to open cache");
    SearchPipeline::new(executor, cache, settings)
}

fn settings(max_results: usize, max_pages: usize) -> SearchSettings {
    SearchSettings {
        max_results,
        max_pages,
        region: "US".to_string(),
    }
}

#[tokio::test]
async fn test_single_page_produces_rows_and_charges_units() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeYouTube::new().with_pages("rust", &[&["a", "b"]]);
    let mut pipeline = pipeline(api.clone(), &dir.path().join("cache.db"), settings(10, 1)).await;

    let rows = pipeline.run("rust", "https://src.test/1").await.unwrap();

    let ids: Vec<&str> = rows.iter().map(|r| r.video_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(rows[0].keyword, "rust");
    assert_eq!(rows[0].input_url, "https://src.test/1");
    assert_eq!(rows[0].author_avatar, "https://img.test/ch-a.jpg");
    assert_eq!(rows[0].duration, "00:01:05");
    assert!(rows[0].allowed_on_third_party);

    // search 100 + one unit per video + one channel lookup
    assert_eq!(pipeline.executor().pool().total_units(), 103);
    assert_eq!(api.calls_to("search"), 1);
    assert_eq!(api.calls_to("videos"), 1);
    assert_eq!(api.calls_to("channels"), 1);
    pipeline.close().await;
}

#[tokio::test]
async fn test_cached_keyword_replays_without_api_calls() {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("cache.db");
    let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();

    let first_api = FakeYouTube::new().with_pages("rust", &[&["a", "b"], &["c"]]);
    let mut first = pipeline(first_api.clone(), &cache_path, settings(10, 2)).await;
    let expected = first.run_at("rust", "", now).await.unwrap();
    first.close().await;
    assert_eq!(first_api.call_count(), 6);

    // Knows nothing; any call would come back empty
    let second_api = FakeYouTube::new();
    let mut second = pipeline(second_api.clone(), &cache_path, settings(10, 2)).await;
    let replayed = second.run_at("rust", "", now).await.unwrap();

    assert_eq!(replayed, expected);
    assert_eq!(second_api.call_count(), 0);
    assert_eq!(second.executor().pool().total_units(), 0);
    second.close().await;
}

#[tokio::test]
async fn test_live_and_upcoming_videos_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeYouTube::new()
        .with_pages("news", &[&["a", "b", "c"]])
        .with_live("b");
    let mut pipeline = pipeline(api, &dir.path().join("cache.db"), settings(10, 1)).await;

    let rows = pipeline.run("news", "").await.unwrap();

    let ids: Vec<&str> = rows.iter().map(|r| r.video_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
    pipeline.close().await;
}

#[tokio::test]
async fn test_pagination_requests_only_remaining_results() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeYouTube::new().with_pages("rust", &[&["a", "b"], &["c", "d"], &["e", "f"]]);
    let mut pipeline = pipeline(api.clone(), &dir.path().join("cache.db"), settings(3, 5)).await;

    let rows = pipeline.run("rust", "").await.unwrap();

    assert_eq!(rows.len(), 3);
    let searches: Vec<(usize, Option<String>)> = api
        .requests()
        .into_iter()
        .filter_map(|r| match r {
            ApiRequest::Search {
                max_results,
                page_token,
                ..
            } => Some((max_results, page_token)),
            _ => None,
        })
        .collect();
    assert_eq!(searches, vec![(3, None), (1, Some("p1".to_string()))]);
    pipeline.close().await;
}

#[tokio::test]
async fn test_max_pages_caps_search_calls() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeYouTube::new().with_pages("rust", &[&["a", "b"], &["c", "d"], &["e", "f"]]);
    let mut pipeline = pipeline(api.clone(), &dir.path().join("cache.db"), settings(10, 2)).await;

    let rows = pipeline.run("rust", "").await.unwrap();

    assert_eq!(rows.len(), 4);
    assert_eq!(api.calls_to("search"), 2);
    pipeline.close().await;
}

#[tokio::test]
async fn test_no_results_stops_without_detail_calls() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeYouTube::new();
    let mut pipeline = pipeline(api.clone(), &dir.path().join("cache.db"), settings(10, 3)).await;

    let rows = pipeline.run("nothing here", "").await.unwrap();

    assert!(rows.is_empty());
    assert_eq!(api.call_count(), 1);
    assert_eq!(pipeline.executor().pool().total_units(), 100);
    pipeline.close().await;
}

#[tokio::test]
async fn test_shared_channel_looked_up_once() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeYouTube::new()
        .with_pages("rust", &[&["a", "b", "c"]])
        .with_channel("a", "ch-z")
        .with_channel("b", "ch-y")
        .with_channel("c", "ch-z");
    let mut pipeline = pipeline(api.clone(), &dir.path().join("cache.db"), settings(10, 1)).await;

    let rows = pipeline.run("rust", "").await.unwrap();

    let channel_ids: Vec<Vec<String>> = api
        .requests()
        .into_iter()
        .filter_map(|r| match r {
            ApiRequest::Channels { ids } => Some(ids),
            _ => None,
        })
        .collect();
    assert_eq!(channel_ids, vec![vec!["ch-y".to_string(), "ch-z".to_string()]]);
    assert_eq!(rows[2].author_avatar, "https://img.test/ch-z.jpg");
    pipeline.close().await;
}

#[tokio::test]
async fn test_provider_error_surfaces() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeYouTube::new().with_broken_query("bad");
    let cache_path = dir.path().join("cache.db");
    let mut pipeline = pipeline(api, &cache_path, settings(10, 1)).await;

    let err = pipeline.run("bad", "").await.unwrap_err();

    assert!(!err.is_quota_exhausted());
    pipeline.close().await;

    // Failed responses are never memoized
    let cache = ResponseCache::open(&cache_path).await.unwrap();
    assert_eq!(cache.entries().await.unwrap(), 0);
    cache.close().await;
}
