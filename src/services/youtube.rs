// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::api::{ApiError, ApiRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Transport for YouTube Data API calls.
///
/// Implementations execute an already-described request with the given key and
/// return the raw JSON body, classifying failures into [`ApiError`].
#[async_trait]
pub trait YouTubeApi: Send + Sync {
    async fn call(&self, key: &str, request: &ApiRequest) -> Result<Value, ApiError>;
}

/// HTTP client for the YouTube Data API v3
#[derive(Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(base_url: &str, user_agent: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl YouTubeApi for YouTubeClient {
    async fn call(&self, key: &str, request: &ApiRequest) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.base_url, request.endpoint());
        let mut params = request.query_params();
        params.push(("key", key.to_string()));

        let response = self.http.get(&url).query(&params).send().await?;
        let status = response.status();
        // A connection dropped mid-body is a transport failure, not a malformed reply
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}
