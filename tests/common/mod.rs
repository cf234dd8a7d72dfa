// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

// Shared doubles for the integration tests. Not every test binary uses every helper.
#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tubeharvest::models::api::{ApiError, ApiRequest};
use tubeharvest::models::row::ResultRow;
use tubeharvest::services::sink::RowSink;
use tubeharvest::services::youtube::YouTubeApi;

#[derive(Default)]
struct FakeState {
    /// keyword -> pages of video ids
    pages: HashMap<String, Vec<Vec<String>>>,
    live: HashSet<String>,
    /// video id -> channel id; defaults to `ch-<video id>`
    channels: HashMap<String, String>,
    /// Keyword whose search answers with a non-retryable error
    broken_query: Option<String>,
    /// Successful calls allowed before every key reports quota exceeded
    quota_budget: Option<usize>,
    requests: Vec<ApiRequest>,
    keys: Vec<String>,
}

/// In-memory YouTube Data API serving canned search pages
#[derive(Clone, Default)]
pub struct FakeYouTube {
    state: Arc<Mutex<FakeState>>,
}

impl FakeYouTube {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `keyword` with result pages; page `n` is reached via token `p<n>`
    pub fn with_pages(self, keyword: &str, pages: &[&[&str]]) -> Self {
        let pages = pages
            .iter()
            .map(|page| page.iter().map(|id| id.to_string()).collect())
            .collect();
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(keyword.to_string(), pages);
        self
    }

    pub fn with_live(self, video_id: &str) -> Self {
        self.state.lock().unwrap().live.insert(video_id.to_string());
        self
    }

    pub fn with_channel(self, video_id: &str, channel_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .channels
            .insert(video_id.to_string(), channel_id.to_string());
        self
    }

    pub fn with_broken_query(self, keyword: &str) -> Self {
        self.state.lock().unwrap().broken_query = Some(keyword.to_string());
        self
    }

    pub fn with_quota_budget(self, calls: usize) -> Self {
        self.state.lock().unwrap().quota_budget = Some(calls);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.endpoint() == endpoint)
            .count()
    }

    pub fn keys_used(&self) -> Vec<String> {
        self.state.lock().unwrap().keys.clone()
    }
}

impl FakeState {
    fn channel_of(&self, video_id: &str) -> String {
        self.channels
            .get(video_id)
            .cloned()
            .unwrap_or_else(|| format!("ch-{video_id}"))
    }

    fn search(
        &self,
        query: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<Value, ApiError> {
        if self.broken_query.as_deref() == Some(query) {
            return Err(ApiError::Provider {
                status: 400,
                reason: "invalidSearchFilter".to_string(),
                message: format!("bad query {query}"),
            });
        }

        let page: usize = page_token
            .and_then(|t| t.strip_prefix('p'))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        let pages = self.pages.get(query).cloned().unwrap_or_default();
        let ids: Vec<String> = pages
            .get(page)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .take(max_results)
            .collect();

        let mut body = json!({
            "items": ids
                .iter()
                .map(|id| json!({ "id": { "kind": "youtube#video", "videoId": id } }))
                .collect::<Vec<_>>(),
        });
        if page + 1 < pages.len() {
            body["nextPageToken"] = json!(format!("p{}", page + 1));
        }
        Ok(body)
    }

    fn videos(&self, ids: &[String]) -> Value {
        let items: Vec<Value> = ids
            .iter()
            .map(|id| {
                let live = if self.live.contains(id) { "live" } else { "none" };
                json!({
                    "id": id,
                    "snippet": {
                        "publishedAt": "2024-01-01T00:00:00Z",
                        "channelId": self.channel_of(id),
                        "title": format!("Title {id}"),
                        "description": "",
                        "channelTitle": format!("Channel of {id}"),
                        "liveBroadcastContent": live,
                        "defaultAudioLanguage": "en"
                    },
                    "contentDetails": { "duration": "PT1M5S" },
                    "status": { "embeddable": true, "license": "creativeCommon" },
                    "statistics": { "viewCount": "100", "likeCount": "7" }
                })
            })
            .collect();
        json!({ "items": items })
    }

    fn channels(&self, ids: &[String]) -> Value {
        let items: Vec<Value> = ids
            .iter()
            .map(|id| {
                json!({
                    "id": id,
                    "snippet": {
                        "title": id,
                        "thumbnails": { "default": { "url": format!("https://img.test/{id}.jpg") } }
                    }
                })
            })
            .collect();
        json!({ "items": items })
    }
}

#[async_trait]
impl YouTubeApi for FakeYouTube {
    async fn call(&self, key: &str, request: &ApiRequest) -> Result<Value, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.keys.push(key.to_string());

        if let Some(budget) = state.quota_budget.as_mut() {
            if *budget == 0 {
                return Err(ApiError::QuotaExceeded("daily limit".to_string()));
            }
            *budget -= 1;
        }

        state.requests.push(request.clone());
        match request {
            ApiRequest::Search {
                query,
                max_results,
                page_token,
                ..
            } => state.search(query, *max_results, page_token.as_deref()),
            ApiRequest::Videos { ids } => Ok(state.videos(ids)),
            ApiRequest::Channels { ids } => Ok(state.channels(ids)),
        }
    }
}

/// Sink that keeps every delivered batch in memory
#[derive(Clone, Default)]
pub struct RecordingSink {
    batches: Arc<Mutex<Vec<Vec<ResultRow>>>>,
}

impl RecordingSink {
    pub fn batches(&self) -> Vec<Vec<ResultRow>> {
        self.batches.lock().unwrap().clone()
    }

    /// Video ids per delivered batch
    pub fn batch_ids(&self) -> Vec<Vec<String>> {
        self.batches()
            .iter()
            .map(|batch| batch.iter().map(|r| r.video_id.clone()).collect())
            .collect()
    }
}

#[async_trait]
impl RowSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn append(&self, rows: &[ResultRow]) -> Result<()> {
        self.batches.lock().unwrap().push(rows.to_vec());
        Ok(())
    }
}

pub fn keywords(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
