//! The query parameters a table sends to the data API.
//!
//! Fetch URLs and CSV download links are built from the same
//! [`FetchRequest`], so the download always mirrors the rows on screen.

use std::collections::BTreeMap;

use crate::filter::{FilterState, SortSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub page: u32,
    pub page_size: u32,
    pub ordering: Option<SortSpec>,
    pub search: String,
    pub facets: BTreeMap<String, String>,
}

impl FetchRequest {
    pub fn from_state(state: &FilterState) -> Self {
        Self {
            page: state.page,
            page_size: state.page_size,
            ordering: state.ordering.clone(),
            search: state.query.clone(),
            facets: state.facets.clone(),
        }
    }

    /// Ordered query pairs. CSV exports carry no pagination parameters.
    pub fn query_pairs(&self, format: ExportFormat) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.facets.len() + 5);
        if format == ExportFormat::Json {
            pairs.push(("page".to_string(), self.page.to_string()));
            pairs.push(("page_size".to_string(), self.page_size.to_string()));
        }
        if let Some(ordering) = &self.ordering {
            pairs.push(("ordering".to_string(), ordering.to_param()));
        }
        if !self.search.is_empty() {
            pairs.push(("search".to_string(), self.search.clone()));
        }
        for (name, value) in &self.facets {
            pairs.push((name.clone(), value.clone()));
        }
        pairs.push(("format".to_string(), format.as_str().to_string()));
        pairs
    }

    /// `resource_url` with this request's query string appended.
    pub fn url(&self, resource_url: &str, format: ExportFormat) -> String {
        let query = encode_query(&self.query_pairs(format));
        let separator = if resource_url.contains('?') { '&' } else { '?' };
        format!("{resource_url}{separator}{query}")
    }
}

/// Percent-encodes `key=value` pairs joined by `&`.
pub fn encode_query(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}
