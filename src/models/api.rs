// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Quota units charged for one search.list call
pub const SEARCH_COST: u64 = 100;
/// Quota units charged for one channels.list call
pub const CHANNELS_COST: u64 = 1;
/// Upper bound the API accepts for `maxResults` and for batched id lists
pub const MAX_PAGE_SIZE: usize = 50;

/// Parts requested for every video detail lookup
pub const VIDEO_PARTS: &str = "snippet,contentDetails,status,player,statistics";

/// A credential-independent description of one YouTube Data API call.
///
/// The executor binds it to whichever API key the pool hands out, so the same
/// description can be replayed against another key after a failover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    Search {
        query: String,
        region: String,
        max_results: usize,
        page_token: Option<String>,
    },
    Videos {
        ids: Vec<String>,
    },
    Channels {
        ids: Vec<String>,
    },
}

impl ApiRequest {
    /// Endpoint path relative to the API base URL
    pub fn endpoint(&self) -> &'static str {
        match self {
            ApiRequest::Search { .. } => "search",
            ApiRequest::Videos { .. } => "videos",
            ApiRequest::Channels { .. } => "channels",
        }
    }

    /// Query parameters, excluding the API key
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        match self {
            ApiRequest::Search {
                query,
                region,
                max_results,
                page_token,
            } => vec![
                ("q", query.clone()),
                ("part", "id".to_string()),
                ("type", "video".to_string()),
                ("order", "relevance".to_string()),
                ("regionCode", region.clone()),
                ("maxResults", max_results.to_string()),
                ("pageToken", page_token.clone().unwrap_or_default()),
                ("safeSearch", "none".to_string()),
            ],
            ApiRequest::Videos { ids } => vec![
                ("id", ids.join(",")),
                ("part", VIDEO_PARTS.to_string()),
            ],
            ApiRequest::Channels { ids } => {
                vec![("part", "snippet".to_string()), ("id", ids.join(","))]
            }
        }
    }
}

/// How many quota units a successful call consumes
#[derive(Clone, Copy)]
pub enum QuotaCost {
    Fixed(u64),
    /// Computed from the response once it arrives
    Computed(fn(&Value) -> u64),
}

impl QuotaCost {
    /// One unit per entry in the response's `items` array
    pub fn per_item() -> Self {
        QuotaCost::Computed(|resp| {
            resp.get("items")
                .and_then(Value::as_array)
                .map(|items| items.len() as u64)
                .unwrap_or(0)
        })
    }

    pub fn units_for(&self, response: &Value) -> u64 {
        match self {
            QuotaCost::Fixed(units) => *units,
            QuotaCost::Computed(f) => f(response),
        }
    }
}

impl std::fmt::Debug for QuotaCost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaCost::Fixed(units) => write!(f, "Fixed({units})"),
            QuotaCost::Computed(_) => write!(f, "Computed"),
        }
    }
}

/// Classified failure of a single provider call
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The key's daily quota is spent; the key is useless for the rest of the run
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
    /// Transient throttling; the same key may succeed after a pause
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Connection-level failure before a response arrived
    #[error("network error: {0}")]
    Network(String),
    #[error("provider error {status} ({reason}): {message}")]
    Provider {
        status: u16,
        reason: String,
        message: String,
    },
    #[error("failed to decode provider response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify a non-success HTTP response using the structured error body
    /// (`error.errors[].reason`).
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<ErrorEnvelope> = serde_json::from_str(body).ok();
        let (message, reasons) = match parsed {
            Some(envelope) => (
                envelope.error.message,
                envelope
                    .error
                    .errors
                    .into_iter()
                    .map(|e| e.reason)
                    .collect::<Vec<_>>(),
            ),
            None => (body.trim().to_string(), Vec::new()),
        };

        let has_reason = |wanted: &[&str]| reasons.iter().any(|r| wanted.contains(&r.as_str()));

        if has_reason(&["quotaExceeded", "dailyLimitExceeded"]) {
            ApiError::QuotaExceeded(message)
        } else if has_reason(&["rateLimitExceeded", "userRateLimitExceeded"]) || status == 429 {
            ApiError::RateLimited(message)
        } else {
            ApiError::Provider {
                status,
                reason: reasons.into_iter().next().unwrap_or_default(),
                message,
            }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() || e.is_request() || e.is_body() {
            ApiError::Network(e.to_string())
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Provider {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                reason: String::new(),
                message: e.to_string(),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

// ---------------------------------------------------------------------------
// Response models. Everything is defaulted: the API omits fields freely.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchListResponse {
    pub next_page_token: Option<String>,
    pub items: Vec<SearchResult>,
}

impl SearchListResponse {
    /// Video ids in result order, skipping entries without one
    pub fn video_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|it| it.id.video_id.clone())
            .filter(|id| !id.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResult {
    pub id: SearchResultId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResultId {
    pub kind: String,
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoListResponse {
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoItem {
    pub id: String,
    pub snippet: VideoSnippet,
    pub content_details: ContentDetails,
    pub status: VideoStatus,
    pub statistics: VideoStatistics,
    pub player: Option<Player>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoSnippet {
    pub published_at: String,
    pub channel_id: String,
    pub title: String,
    pub description: String,
    pub channel_title: String,
    pub live_broadcast_content: Option<String>,
    pub default_language: Option<String>,
    pub default_audio_language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentDetails {
    pub duration: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoStatus {
    pub embeddable: bool,
    pub license: String,
}

/// Counts arrive as decimal strings and are passed through untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoStatistics {
    pub view_count: Option<String>,
    pub like_count: Option<String>,
    pub dislike_count: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Player {
    pub embed_html: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelListResponse {
    pub items: Vec<ChannelItem>,
}

impl ChannelListResponse {
    /// Channel id → default thumbnail URL
    pub fn avatar_map(&self) -> HashMap<String, String> {
        self.items
            .iter()
            .filter_map(|c| {
                c.snippet
                    .thumbnails
                    .get("default")
                    .map(|t| (c.id.clone(), t.url.clone()))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelItem {
    pub id: String,
    pub snippet: ChannelSnippet,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelSnippet {
    pub title: String,
    pub thumbnails: HashMap<String, Thumbnail>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Thumbnail {
    pub url: String,
}
