//! Search-Index Client
//!
//! The throughput records live in an Elasticsearch-style index. The client
//! here is constructed once by the owner and shared across window tasks; it
//! is `Clone` and safe for concurrent use. The query language is opaque to
//! the rest of the pipeline, which only sees the [`ThroughputSource`] seam.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::IndexConfig;
use crate::models::RawThroughputRecord;
use crate::pipeline::windows::TimeWindow;

/// A source of raw throughput records for one time window.
#[async_trait]
pub trait ThroughputSource: Send + Sync {
    async fn scan(&self, window: &TimeWindow) -> Result<Vec<RawThroughputRecord>>;
}

/// HTTP client for the throughput index.
#[derive(Clone)]
pub struct IndexClient {
    client: Client,
    base_url: String,
    index: String,
    page_size: usize,
}

impl IndexClient {
    pub fn new(config: IndexConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(10)
            .tcp_keepalive(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to build IndexClient")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            index: config.index,
            page_size: config.page_size.max(1),
        })
    }

    #[inline]
    fn search_url(&self) -> String {
        format!("{}/{}/_search", self.base_url, self.index)
    }

    fn query_body(&self, window: &TimeWindow, search_after: Option<&[Value]>) -> Value {
        let mut body = json!({
            "size": self.page_size,
            "sort": [{ "throughput_ts": "asc" }, { "_id": "asc" }],
            "query": {
                "bool": {
                    "must": [
                        {
                            "range": {
                                "throughput_ts": {
                                    "format": "strict_date_optional_time",
                                    "gte": window.start_iso(),
                                    "lte": window.end_iso()
                                }
                            }
                        }
                    ]
                }
            }
        });
        if let Some(after) = search_after {
            body["search_after"] = json!(after);
        }
        body
    }
}

#[async_trait]
impl ThroughputSource for IndexClient {
    /// Scan every record in `window`, paginating with `search_after` until a
    /// short page. The sort carries an `_id` tiebreaker so a page boundary
    /// inside a run of equal timestamps cannot skip records.
    async fn scan(&self, window: &TimeWindow) -> Result<Vec<RawThroughputRecord>> {
        let url = self.search_url();
        let mut records: Vec<RawThroughputRecord> = Vec::new();
        let mut search_after: Option<Vec<Value>> = None;

        loop {
            let body = self.query_body(window, search_after.as_deref());
            let resp = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .with_context(|| format!("POST {} failed", url))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                return Err(anyhow::anyhow!("POST {} {}: {}", url, status, text));
            }

            let parsed: SearchResponse = resp
                .json()
                .await
                .context("Failed to parse search response")?;

            let page = parsed.hits.hits;
            let count = page.len();
            let last_sort = page.last().map(|h| h.sort.clone());
            records.extend(page.into_iter().map(|h| h.source));

            if count < self.page_size {
                break;
            }
            match last_sort {
                Some(sort) if !sort.is_empty() => search_after = Some(sort),
                _ => break,
            }
        }

        debug!("scan {} returned {} records", window, records.len());
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_source")]
    source: RawThroughputRecord,
    #[serde(default)]
    sort: Vec<Value>,
}
