// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::config::RetryPolicy;
use crate::models::row::ResultRow;
use crate::services::sink::RowSink;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";
const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Fields of a Google service-account key file that token exchange needs
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// OAuth2 service-account flow: a signed RS256 assertion is exchanged for a
/// bearer token, which is reused until shortly before it expires.
pub struct ServiceAccountAuth {
    http: reqwest::Client,
    key: ServiceAccountKey,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn from_json(http: reqwest::Client, json: &str) -> Result<Self> {
        let key: ServiceAccountKey =
            serde_json::from_str(json).context("invalid service account key")?;
        Ok(Self {
            http,
            key,
            cached: Mutex::new(None),
        })
    }

    pub async fn from_file(http: reqwest::Client, path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading service account key {}", path.display()))?;
        Self::from_json(http, &json)
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + REFRESH_MARGIN {
                return Ok(token.token.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    fn assertion(&self) -> Result<String> {
        let iat = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SPREADSHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat,
            exp: iat + TOKEN_LIFETIME_SECS,
        };
        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .context("service account private key is not a valid RSA PEM")?;
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &signing_key,
        )?)
    }

    async fn fetch_token(&self) -> Result<CachedToken> {
        let assertion = self.assertion()?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("token exchange failed with {status}: {body}");
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = if token.expires_in == 0 {
            TOKEN_LIFETIME_SECS as u64
        } else {
            token.expires_in
        };
        tracing::debug!(account = %self.key.client_email, lifetime, "access token refreshed");

        Ok(CachedToken {
            token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Minimal Sheets v4 client: read a column, append rows
pub struct SheetsClient {
    http: reqwest::Client,
    auth: ServiceAccountAuth,
    spreadsheet_id: String,
    base_url: String,
}

impl SheetsClient {
    pub fn new(http: reqwest::Client, auth: ServiceAccountAuth, spreadsheet_id: &str) -> Self {
        Self::with_base_url(http, auth, spreadsheet_id, DEFAULT_SHEETS_API_BASE)
    }

    pub fn with_base_url(
        http: reqwest::Client,
        auth: ServiceAccountAuth,
        spreadsheet_id: &str,
        base_url: &str,
    ) -> Self {
        Self {
            http,
            auth,
            spreadsheet_id: spreadsheet_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `{base}/spreadsheets/{id}/values/{range}{suffix}`, with every segment escaped
    fn values_url(&self, range: &str, suffix: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("sheets base url cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(["spreadsheets", self.spreadsheet_id.as_str(), "values"])
            .push(&format!("{range}{suffix}"));
        Ok(url)
    }

    /// First cell of each row in `range`; blank rows come back as empty strings
    pub async fn read_column(&self, range: &str) -> Result<Vec<String>> {
        let token = self.auth.access_token().await?;
        let response = self
            .http
            .get(self.values_url(range, "")?)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("reading {range} failed with {status}: {body}");
        }

        let body: ValueRange = response.json().await?;
        Ok(first_cells(body))
    }

    /// Append rows after the last row of the table anchored at `range`
    pub async fn append_rows(&self, range: &str, rows: Vec<Vec<Value>>) -> Result<()> {
        let count = rows.len();
        let token = self.auth.access_token().await?;
        let response = self
            .http
            .post(self.values_url(range, ":append")?)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .bearer_auth(token)
            .json(&json!({ "values": rows }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("appending to {range} failed with {status}: {body}");
        }

        tracing::debug!(range, rows = count, "sheet rows appended");
        Ok(())
    }
}

fn first_cells(range: ValueRange) -> Vec<String> {
    range
        .values
        .into_iter()
        .map(|row| match row.into_iter().next() {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        })
        .collect()
}

/// Appends batches to the results sheet
pub struct SheetsSink {
    client: Arc<SheetsClient>,
    range: String,
}

impl SheetsSink {
    pub const RETRY: RetryPolicy = RetryPolicy {
        max_attempts: 5,
        base_delay: Duration::from_secs(1),
    };

    pub fn new(client: Arc<SheetsClient>, range: impl Into<String>) -> Self {
        Self {
            client,
            range: range.into(),
        }
    }
}

#[async_trait]
impl RowSink for SheetsSink {
    fn name(&self) -> &str {
        "sheets"
    }

    async fn append(&self, rows: &[ResultRow]) -> Result<()> {
        let values = rows.iter().map(ResultRow::to_sheet_values).collect();
        self.client.append_rows(&self.range, values).await
    }
}
