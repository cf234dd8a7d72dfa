// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::services::logging::mask_key;

/// Every credential in the pool has been deactivated
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("all API keys have exhausted their quota")]
pub struct QuotaExhausted;

/// Handle to a credential owned by a [`CredentialPool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CredentialId(usize);

/// One API key and its bookkeeping for the current run
#[derive(Debug, Clone)]
pub struct Credential {
    key: String,
    used_units: u64,
    active: bool,
}

impl Credential {
    fn new(key: String) -> Self {
        Self {
            key,
            used_units: 0,
            active: true,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn used_units(&self) -> u64 {
        self.used_units
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Round-robin pool of API keys with one-way deactivation.
///
/// A deactivated key stays inert for the rest of the process; daily quota
/// windows are not tracked.
#[derive(Debug, Clone)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    next: usize,
}

impl CredentialPool {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            credentials: keys
                .into_iter()
                .map(|k| Credential::new(k.into()))
                .collect(),
            next: 0,
        }
    }

    /// Next active credential after the last one handed out
    pub fn acquire(&mut self) -> Result<CredentialId, QuotaExhausted> {
        let n = self.credentials.len();
        for _ in 0..n {
            let idx = self.next;
            self.next = (self.next + 1) % n;
            if self.credentials[idx].active {
                return Ok(CredentialId(idx));
            }
        }
        Err(QuotaExhausted)
    }

    pub fn get(&self, id: CredentialId) -> &Credential {
        &self.credentials[id.0]
    }

    /// Idempotent; a deactivated credential is never handed out again
    pub fn deactivate(&mut self, id: CredentialId) {
        let credential = &mut self.credentials[id.0];
        if credential.active {
            credential.active = false;
            tracing::warn!(key = %mask_key(&credential.key), "deactivated API key");
        }
    }

    pub fn record_usage(&mut self, id: CredentialId, units: u64) {
        let credential = &mut self.credentials[id.0];
        credential.used_units += units;
        tracing::info!(
            key = %mask_key(&credential.key),
            units,
            total = credential.used_units,
            "recorded quota usage"
        );
    }

    pub fn active_count(&self) -> usize {
        self.credentials.iter().filter(|c| c.active).count()
    }

    pub fn total_units(&self) -> u64 {
        self.credentials.iter().map(|c| c.used_units).sum()
    }

    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }
}
