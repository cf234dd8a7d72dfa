// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Command line / environment configuration for a harvesting run.
///
/// Every flag falls back to the environment variable of the same name, so a
/// `.env` file next to the binary is enough to configure a run.
#[derive(Debug, Clone, Parser)]
#[command(name = "tubeharvest", version = env!("TUBEHARVEST_VERSION"), about)]
pub struct HarvestConfig {
    /// Spreadsheet holding the keyword list and receiving results
    #[arg(long, env = "SHEET_ID")]
    pub sheet_id: String,

    #[arg(long, env = "KEYWORDS_SHEET", default_value = "Keywords")]
    pub keywords_sheet: String,

    #[arg(long, env = "KEYWORDS_COLUMN", default_value = "A")]
    pub keywords_column: String,

    #[arg(long, env = "SOURCE_URL_COLUMN", default_value = "J")]
    pub source_url_column: String,

    #[arg(long, env = "RESULTS_SHEET", default_value = "Results")]
    pub results_sheet: String,

    /// Path to the Google service-account key file
    #[arg(long, env = "SERVICE_ACCOUNT_JSON")]
    pub service_account_json: PathBuf,

    /// Maximum result rows per keyword
    #[arg(long, env = "NUM_RESULTS", default_value_t = 10)]
    pub num_results: usize,

    #[arg(long, env = "REGION", default_value = "US")]
    pub region: String,

    /// Maximum search pages per keyword
    #[arg(long, env = "MAX_PAGES", default_value_t = 1)]
    pub max_pages: usize,

    #[arg(long, env = "OUTPUT_CSV", default_value = "yt_results.csv")]
    pub output_csv: PathBuf,

    /// Keywords processed between flushes to the CSV file and the sheet
    #[arg(long, env = "BATCH_SIZE", default_value_t = 50)]
    pub batch_size: usize,

    #[arg(long, env = "CACHE_DB", default_value = "yt_cache.db")]
    pub cache_db: PathBuf,

    #[arg(long, env = "PROGRESS_DB", default_value = "progress.db")]
    pub progress_db: PathBuf,

    /// Comma-separated YouTube Data API keys
    #[arg(long, env = "YT_API_KEYS", value_delimiter = ',', hide_env_values = true)]
    pub api_keys: Vec<String>,

    /// Retries per API call on rate limiting or network failure
    #[arg(long, env = "BACKOFF_MAX", default_value_t = 3)]
    pub backoff_max: u32,

    #[arg(long, env = "YOUTUBE_API_BASE", default_value = DEFAULT_YOUTUBE_API_BASE)]
    pub youtube_api_base: String,
}

impl HarvestConfig {
    /// Drop blank keys and reject settings that would make the run meaningless
    pub fn validate(mut self) -> Result<Self> {
        self.api_keys = self
            .api_keys
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if self.api_keys.is_empty() {
            bail!("no API keys configured (YT_API_KEYS)");
        }
        if self.max_pages < 1 {
            bail!("MAX_PAGES must be >= 1, got {}", self.max_pages);
        }
        if self.batch_size < 1 {
            bail!("BATCH_SIZE must be >= 1, got {}", self.batch_size);
        }
        Ok(self)
    }

    pub fn keywords_range(&self) -> String {
        column_range(&self.keywords_sheet, &self.keywords_column)
    }

    pub fn source_urls_range(&self) -> String {
        column_range(&self.keywords_sheet, &self.source_url_column)
    }

    pub fn results_range(&self) -> String {
        format!("{}!A2", self.results_sheet)
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            max_results: self.num_results,
            max_pages: self.max_pages,
            region: self.region.clone(),
        }
    }

    pub fn executor_backoff(&self) -> RetryPolicy {
        RetryPolicy::new(self.backoff_max, Duration::from_secs(1))
    }
}

/// Column from row 2 down, e.g. `Keywords!A2:A`
fn column_range(sheet: &str, column: &str) -> String {
    format!("{sheet}!{column}2:{column}")
}

/// Limits applied to one keyword's search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    pub max_results: usize,
    pub max_pages: usize,
    pub region: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_results: 10,
            max_pages: 1,
            region: "US".to_string(),
        }
    }
}

/// Bounded exponential backoff: delay for attempt `n` (0-based) is `base * 2^n`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> HarvestConfig {
        let mut argv = vec![
            "tubeharvest",
            "--sheet-id",
            "sheet123",
            "--service-account-json",
            "sa.json",
        ];
        argv.extend_from_slice(args);
        HarvestConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let config = parse(&["--api-keys", "k1"]).validate().unwrap();
        assert_eq!(config.keywords_sheet, "Keywords");
        assert_eq!(config.results_sheet, "Results");
        assert_eq!(config.num_results, 10);
        assert_eq!(config.max_pages, 1);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.region, "US");
        assert_eq!(config.backoff_max, 3);
        assert_eq!(config.output_csv, PathBuf::from("yt_results.csv"));
    }

    #[test]
    fn test_api_keys_split_and_trimmed() {
        let config = parse(&["--api-keys", "k1, k2,,k3 "]).validate().unwrap();
        assert_eq!(config.api_keys, vec!["k1", "k2", "k3"]);
    }

    #[test]
    fn test_validate_rejects_missing_keys() {
        let err = parse(&["--api-keys", " , "]).validate().unwrap_err();
        assert!(err.to_string().contains("no API keys"));
    }

    #[test]
    fn test_validate_rejects_zero_pages() {
        let err = parse(&["--api-keys", "k1", "--max-pages", "0"])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("MAX_PAGES"));
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let err = parse(&["--api-keys", "k1", "--batch-size", "0"])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("BATCH_SIZE"));
    }

    #[test]
    fn test_sheet_ranges() {
        let config = parse(&["--api-keys", "k1"]);
        assert_eq!(config.keywords_range(), "Keywords!A2:A");
        assert_eq!(config.source_urls_range(), "Keywords!J2:J");
        assert_eq!(config.results_range(), "Results!A2");
    }

    #[test]
    fn test_retry_policy_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }
}
