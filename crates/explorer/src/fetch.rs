//! The seam between result tables and whatever produces their rows.

use std::future::Future;

use async_trait::async_trait;

use crate::column::Row;
use crate::error::Result;
use crate::request::{ExportFormat, FetchRequest};

/// One page of rows plus the size of the full result set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchPage {
    pub rows: Vec<Row>,
    pub total_results: u64,
}

#[async_trait]
pub trait RowFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchPage>;

    /// CSV export link for the same request, if the source offers one.
    fn download_url(&self, _request: &FetchRequest) -> Option<String> {
        None
    }
}

/// Adapts an async closure into a [`RowFetcher`].
pub struct FnFetcher<F> {
    fetch: F,
    download_base: Option<String>,
}

impl<F> FnFetcher<F> {
    /// Builds download links against `resource_url`.
    pub fn with_download_base(mut self, resource_url: impl Into<String>) -> Self {
        self.download_base = Some(resource_url.into());
        self
    }
}

pub fn fetch_fn<F, Fut>(fetch: F) -> FnFetcher<F>
where
    F: Fn(FetchRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<FetchPage>> + Send,
{
    FnFetcher {
        fetch,
        download_base: None,
    }
}

#[async_trait]
impl<F, Fut> RowFetcher for FnFetcher<F>
where
    F: Fn(FetchRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<FetchPage>> + Send,
{
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchPage> {
        (self.fetch)(request.clone()).await
    }

    fn download_url(&self, request: &FetchRequest) -> Option<String> {
        self.download_base
            .as_deref()
            .map(|base| request.url(base, ExportFormat::Csv))
    }
}
