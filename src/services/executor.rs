// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::api::{ApiError, ApiRequest, QuotaCost};
use crate::models::config::RetryPolicy;
use crate::services::credential_pool::{CredentialId, CredentialPool, QuotaExhausted};
use crate::services::logging::mask_key;
use crate::services::youtube::YouTubeApi;
use serde_json::Value;
use tokio::time::sleep;

#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    /// No usable key is left; ends the run
    #[error(transparent)]
    QuotaExhausted(#[from] QuotaExhausted),
    /// Not retried and not blamed on the key
    #[error("unrecoverable provider error: {0}")]
    Provider(ApiError),
}

/// Runs logical API calls against a [`CredentialPool`], handling key failover
/// and bounded exponential backoff.
pub struct RequestExecutor<A> {
    api: A,
    pool: CredentialPool,
    backoff: RetryPolicy,
}

impl<A: YouTubeApi> RequestExecutor<A> {
    pub fn new(api: A, pool: CredentialPool, backoff: RetryPolicy) -> Self {
        Self { api, pool, backoff }
    }

    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    /// Execute one logical call, charging `cost` to whichever key succeeds.
    ///
    /// Rate-limit and network retries stay on the same key and use separate
    /// attempt counters; both counters live only for this call.
    pub async fn execute(
        &mut self,
        request: &ApiRequest,
        cost: QuotaCost,
    ) -> Result<Value, ExecuteError> {
        let mut rate_limit_attempts = 0u32;
        let mut network_attempts = 0u32;
        let mut current: Option<CredentialId> = None;

        loop {
            let id = match current {
                Some(id) => id,
                None => {
                    let id = self.pool.acquire()?;
                    current = Some(id);
                    id
                }
            };
            let key = self.pool.get(id).key().to_string();

            match self.api.call(&key, request).await {
                Ok(response) => {
                    self.pool.record_usage(id, cost.units_for(&response));
                    return Ok(response);
                }
                Err(ApiError::QuotaExceeded(message)) => {
                    tracing::warn!(key = %mask_key(&key), %message, "quota exceeded");
                    self.pool.deactivate(id);
                    current = None;
                }
                Err(ApiError::RateLimited(message)) => {
                    if !self
                        .back_off(&key, "rate limited", &message, &mut rate_limit_attempts)
                        .await
                    {
                        self.pool.deactivate(id);
                        current = None;
                    }
                }
                Err(ApiError::Network(message)) => {
                    if !self
                        .back_off(&key, "connection error", &message, &mut network_attempts)
                        .await
                    {
                        self.pool.deactivate(id);
                        current = None;
                    }
                }
                Err(e) => {
                    tracing::error!(key = %mask_key(&key), error = %e, "unexpected provider error");
                    return Err(ExecuteError::Provider(e));
                }
            }
        }
    }

    /// Sleep before retrying the same key. Returns false once the attempt
    /// budget is spent, without sleeping.
    async fn back_off(&self, key: &str, what: &str, message: &str, attempts: &mut u32) -> bool {
        if *attempts >= self.backoff.max_attempts {
            return false;
        }
        let delay = self.backoff.delay_for(*attempts);
        tracing::warn!(
            key = %mask_key(key),
            %message,
            delay_secs = delay.as_secs_f64(),
            attempt = *attempts + 1,
            "{what}, backing off"
        );
        sleep(delay).await;
        *attempts += 1;
        true
    }
}
