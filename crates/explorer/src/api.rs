//! REST client for the paginated data API.
//!
//! Resources answer `GET <resource>?page=..&page_size=..&format=json` with a
//! JSON:API style body:
//!
//! ```json
//! { "data": [ { "id": "...", "attributes": { ... } } ],
//!   "meta": { "pagination": { "page": 1, "pages": 5, "count": 123 } } }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::column::{Cell, ColumnDescriptor, Row};
use crate::config::ExplorerConfig;
use crate::error::{ExplorerError, Result};
use crate::fetch::{FetchPage, RowFetcher};
use crate::request::{ExportFormat, FetchRequest};

/// Longest error body echoed back into an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub meta: Option<ApiMeta>,
}

#[derive(Debug, Deserialize)]
pub struct ApiMeta {
    pub pagination: Option<ApiPagination>,
}

#[derive(Debug, Deserialize)]
pub struct ApiPagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub count: u64,
}

/// Shared HTTP client. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ExplorerConfig>,
}

impl ApiClient {
    pub fn new(config: &ExplorerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ExplorerError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            config: Arc::new(config.clone()),
        })
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// A fetcher for one API resource, extracting `columns` from each record.
    pub fn resource(
        &self,
        path: &str,
        columns: Vec<ColumnDescriptor>,
    ) -> ResourceFetcher {
        ResourceFetcher {
            client: self.clone(),
            url: self.config.resource_url(path),
            columns,
        }
    }

    async fn get_json(&self, url: &str) -> Result<ApiResponse> {
        tracing::debug!("GET {}", url);
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExplorerError::Http {
                status: status.as_u16(),
                message: truncate(&body, MAX_ERROR_BODY_CHARS),
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// [`RowFetcher`] backed by one REST resource.
pub struct ResourceFetcher {
    client: ApiClient,
    url: String,
    columns: Vec<ColumnDescriptor>,
}

impl ResourceFetcher {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }
}

#[async_trait]
impl RowFetcher for ResourceFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchPage> {
        let url = request.url(&self.url, ExportFormat::Json);
        let response = self.client.get_json(&url).await?;
        Ok(page_from_response(&response, &self.columns))
    }

    fn download_url(&self, request: &FetchRequest) -> Option<String> {
        Some(request.url(&self.url, ExportFormat::Csv))
    }
}

/// Maps an API body onto table rows.
///
/// Columns without a source pointer, or whose pointer misses, yield empty
/// cells. Without pagination metadata the total is the number of records.
pub fn page_from_response(response: &ApiResponse, columns: &[ColumnDescriptor]) -> FetchPage {
    let rows = response
        .data
        .iter()
        .map(|record| record_to_row(record, columns))
        .collect::<Vec<_>>();
    let total_results = response
        .meta
        .as_ref()
        .and_then(|meta| meta.pagination.as_ref())
        .map(|pagination| pagination.count)
        .unwrap_or(rows.len() as u64);
    FetchPage {
        rows,
        total_results,
    }
}

fn record_to_row(record: &Value, columns: &[ColumnDescriptor]) -> Row {
    columns
        .iter()
        .map(|column| {
            column
                .source
                .as_deref()
                .and_then(|pointer| record.pointer(pointer))
                .map(|value| Cell::from_json(value, column.kind))
                .unwrap_or(Cell::Empty)
        })
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}
