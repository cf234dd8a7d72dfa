// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::api::{
    ApiRequest, ChannelListResponse, QuotaCost, SearchListResponse, VideoListResponse,
    CHANNELS_COST, MAX_PAGE_SIZE, SEARCH_COST,
};
use crate::models::config::SearchSettings;
use crate::models::row::ResultRow;
use crate::services::cache::{channels_key, search_key, videos_key, ResponseCache};
use crate::services::db::StoreError;
use crate::services::executor::{ExecuteError, RequestExecutor};
use crate::services::transform::video_to_row;
use crate::services::youtube::YouTubeApi;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Execute(#[from] ExecuteError),
    #[error("response cache: {0}")]
    Cache(#[from] StoreError),
    #[error("malformed {what} response: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl PipelineError {
    /// Every API key is spent; the run should wind down rather than fail
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, PipelineError::Execute(ExecuteError::QuotaExhausted(_)))
    }
}

/// Per-keyword search: paginated search → video details → channel avatars → rows.
///
/// Every sub-request goes through the response cache first, so replaying a
/// keyword whose responses are cached makes no API calls at all.
pub struct SearchPipeline<A> {
    executor: RequestExecutor<A>,
    cache: ResponseCache,
    settings: SearchSettings,
}

impl<A: YouTubeApi> SearchPipeline<A> {
    pub fn new(executor: RequestExecutor<A>, cache: ResponseCache, settings: SearchSettings) -> Self {
        Self {
            executor,
            cache,
            settings,
        }
    }

    pub fn executor(&self) -> &RequestExecutor<A> {
        &self.executor
    }

    pub async fn close(&self) {
        self.cache.close().await;
    }

    pub async fn run(
        &mut self,
        keyword: &str,
        source_url: &str,
    ) -> Result<Vec<ResultRow>, PipelineError> {
        self.run_at(keyword, source_url, Utc::now()).await
    }

    /// Same as [`run`](Self::run) with an explicit clock for the age column
    pub async fn run_at(
        &mut self,
        keyword: &str,
        source_url: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ResultRow>, PipelineError> {
        let mut rows = Vec::new();
        let mut page_token: Option<String> = None;
        let mut page = 0;

        while rows.len() < self.settings.max_results && page < self.settings.max_pages {
            page += 1;

            let request = ApiRequest::Search {
                query: keyword.to_string(),
                region: self.settings.region.clone(),
                max_results: MAX_PAGE_SIZE.min(self.settings.max_results - rows.len()),
                page_token: page_token.clone(),
            };
            let key = search_key(keyword, &self.settings.region, page_token.as_deref());
            let search: SearchListResponse = decode(
                "search",
                self.cached_call(&key, &request, QuotaCost::Fixed(SEARCH_COST))
                    .await?,
            )?;

            let video_ids = search.video_ids();
            if video_ids.is_empty() {
                break;
            }

            let request = ApiRequest::Videos {
                ids: video_ids.clone(),
            };
            let videos: VideoListResponse = decode(
                "videos",
                self.cached_call(&videos_key(&video_ids), &request, QuotaCost::per_item())
                    .await?,
            )?;

            let avatars = self.channel_avatars(&videos).await?;

            rows.extend(
                videos
                    .items
                    .iter()
                    .filter_map(|item| video_to_row(keyword, source_url, item, &avatars, now)),
            );

            tracing::debug!(keyword, page, rows = rows.len(), "search page processed");

            page_token = search.next_page_token.filter(|t| !t.is_empty());
            if page_token.is_none() {
                break;
            }
        }

        Ok(rows)
    }

    async fn channel_avatars(
        &mut self,
        videos: &VideoListResponse,
    ) -> Result<HashMap<String, String>, PipelineError> {
        let channel_ids: Vec<String> = videos
            .items
            .iter()
            .map(|v| v.snippet.channel_id.clone())
            .filter(|id| !id.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if channel_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let request = ApiRequest::Channels {
            ids: channel_ids.clone(),
        };
        let channels: ChannelListResponse = decode(
            "channels",
            self.cached_call(
                &channels_key(&channel_ids),
                &request,
                QuotaCost::Fixed(CHANNELS_COST),
            )
            .await?,
        )?;

        Ok(channels.avatar_map())
    }

    async fn cached_call(
        &mut self,
        key: &str,
        request: &ApiRequest,
        cost: QuotaCost,
    ) -> Result<Value, PipelineError> {
        if let Some(hit) = self.cache.get(key).await? {
            tracing::debug!(key, "cache hit");
            return Ok(hit);
        }

        let response = self.executor.execute(request, cost).await?;
        self.cache.put(key, &response).await?;
        Ok(response)
    }
}

fn decode<T: DeserializeOwned>(what: &'static str, value: Value) -> Result<T, PipelineError> {
    serde_json::from_value(value).map_err(|source| PipelineError::Decode { what, source })
}
