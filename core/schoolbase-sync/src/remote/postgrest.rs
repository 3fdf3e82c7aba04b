//! Supabase / PostgREST table store.
//!
//! Talks to the `/rest/v1/<table>` endpoints. Pagination uses the `Range`
//! request header and reads the table size back from `Content-Range`.

use super::{RemotePage, RemoteStore};
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use schoolbase_types::Record;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

const URL_VARS: [&str; 2] = ["SCHOOLBASE_SUPABASE_URL", "SUPABASE_URL"];
const KEY_VARS: [&str; 2] = ["SCHOOLBASE_SUPABASE_ANON_KEY", "SUPABASE_ANON_KEY"];

/// PostgREST connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgrestConfig {
    /// Project base URL (e.g. `https://<ref>.supabase.co`).
    pub url: String,
    /// Public anon key, sent as `apikey` and as the default bearer token.
    pub anon_key: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for PostgrestConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:54321".to_string(),
            anon_key: String::new(),
            timeout_secs: 60,
        }
    }
}

impl PostgrestConfig {
    /// Defaults overridden by `SCHOOLBASE_SUPABASE_URL` /
    /// `SCHOOLBASE_SUPABASE_ANON_KEY` (or the plain `SUPABASE_*` names).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = first_env(&URL_VARS) {
            config.url = url;
        }
        if let Some(key) = first_env(&KEY_VARS) {
            config.anon_key = key;
        }
        config
    }

    /// Checks that the URL parses and a key is present.
    pub fn validate(&self) -> SyncResult<()> {
        reqwest::Url::parse(&self.url)
            .map_err(|e| SyncError::Config(format!("invalid url {:?}: {e}", self.url)))?;
        if self.anon_key.is_empty() {
            return Err(SyncError::Config("anon_key is empty".to_string()));
        }
        Ok(())
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|v| !v.is_empty())
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

/// Remote store backed by a PostgREST endpoint.
pub struct PostgrestStore {
    config: PostgrestConfig,
    client: Client,
    /// Signed-in user's JWT; falls back to the anon key when absent.
    access_token: RwLock<Option<String>>,
}

impl PostgrestStore {
    /// Creates a new PostgREST store.
    pub fn new(config: PostgrestConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            client,
            access_token: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &PostgrestConfig {
        &self.config
    }

    /// Sets the user session token used as the bearer credential.
    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(table)
        )
    }

    async fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .access_token
            .read()
            .await
            .clone()
            .unwrap_or_else(|| self.config.anon_key.clone());
        builder
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }

    async fn get_range<T: DeserializeOwned>(
        &self,
        table: &str,
        select: &str,
        offset: usize,
        limit: usize,
    ) -> SyncResult<RemotePage<T>> {
        if limit == 0 {
            return Ok(RemotePage::new(Vec::new(), None));
        }
        let last = offset + limit - 1;
        debug!("GET {} rows {}-{} ({})", table, offset, last, select);

        let request = self
            .client
            .get(self.table_url(table))
            .query(&[("select", select), ("order", "id.asc")])
            .header("Range-Unit", "items")
            .header("Range", format!("{offset}-{last}"))
            .header("Prefer", "count=exact");
        let response = self.authorized(request).await.send().await?;

        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);

        // Asking past the end of the table is answered with 416, not an empty page.
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(RemotePage::new(Vec::new(), total));
        }

        let response = ensure_success(response).await?;
        let rows: Vec<T> = response.json().await?;
        Ok(RemotePage::new(rows, total))
    }
}

/// Parses the total from `Content-Range: 0-999/2500` (or `*/2500`).
/// An unknown total (`0-999/*`) yields `None`.
fn parse_content_range_total(value: &str) -> Option<usize> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

async fn ensure_success(response: Response) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::Remote {
        status: status.as_u16(),
        body,
    })
}

/// Builds a PostgREST `in.(...)` filter with every id double-quoted.
fn in_filter(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

#[async_trait]
impl RemoteStore for PostgrestStore {
    fn provider_name(&self) -> &'static str {
        "PostgREST"
    }

    async fn fetch_page(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> SyncResult<RemotePage<Record>> {
        self.get_range(table, "*", offset, limit).await
    }

    async fn fetch_id_page(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> SyncResult<RemotePage<String>> {
        let page: RemotePage<IdRow> = self.get_range(table, "id", offset, limit).await?;
        Ok(RemotePage::new(
            page.rows.into_iter().map(|row| row.id).collect(),
            page.total,
        ))
    }

    async fn delete_by_ids(&self, table: &str, ids: &[String]) -> SyncResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        debug!("DELETE {} ids from {}", ids.len(), table);

        let request = self
            .client
            .delete(self.table_url(table))
            .query(&[("id", in_filter(ids))]);
        let response = self.authorized(request).await.send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn upsert(&self, table: &str, rows: &[Record], conflict_key: &str) -> SyncResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        debug!("UPSERT {} rows into {}", rows.len(), table);

        let request = self
            .client
            .post(self.table_url(table))
            .query(&[("on_conflict", conflict_key)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows);
        let response = self.authorized(request).await.send().await?;
        ensure_success(response).await?;
        Ok(())
    }
}
