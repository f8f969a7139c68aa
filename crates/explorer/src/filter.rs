//! Filter, sort and page state owned by each result table.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const URL_PARAM_PAGE: &str = "page";
pub const URL_PARAM_PAGE_SIZE: &str = "pagesize";
pub const URL_PARAM_ORDERING: &str = "ordering";
pub const URL_PARAM_SEARCH: &str = "search";
pub const URL_PARAM_LINEAGE: &str = "lineage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// A single-column ordering, serialised as `field` or `-field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parses `field` / `-field`. Empty input means no ordering.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value.strip_prefix('-') {
            Some("") => None,
            Some(field) => Some(Self::desc(field)),
            None if value.is_empty() => None,
            None => Some(Self::asc(value)),
        }
    }

    /// The ordering after a click on `field`'s header.
    ///
    /// Clicking the ascending column flips it to descending; any other click
    /// (unsorted or descending) sorts ascending.
    pub fn toggled(current: Option<&SortSpec>, field: &str) -> Self {
        match current {
            Some(spec) if spec.field == field && spec.direction == SortDirection::Asc => {
                Self::desc(field)
            }
            _ => Self::asc(field),
        }
    }

    pub fn to_param(&self) -> String {
        match self.direction {
            SortDirection::Asc => self.field.clone(),
            SortDirection::Desc => format!("-{}", self.field),
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_param())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub query: String,
    pub facets: BTreeMap<String, String>,
    pub ordering: Option<SortSpec>,
    pub page: u32,
    pub page_size: u32,
}

impl FilterState {
    pub fn new(page_size: u32) -> Self {
        Self {
            query: String::new(),
            facets: BTreeMap::new(),
            ordering: None,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Merges a patch; fields the patch leaves unset are kept.
    pub fn apply(&mut self, patch: FilterPatch) {
        if let Some(query) = patch.query {
            self.query = query;
        }
        if let Some(facets) = patch.facets {
            self.facets = facets;
        }
        if let Some(ordering) = patch.ordering {
            self.ordering = ordering;
        }
        if let Some(page_size) = patch.page_size {
            self.page_size = page_size.max(1);
        }
        if let Some(page) = patch.page {
            self.page = page.max(1);
        }
    }

    /// Seeds state from the URL query. Malformed numbers fall back to defaults.
    pub fn from_url_params(params: &BTreeMap<String, String>, default_page_size: u32) -> Self {
        let mut state = Self::new(default_page_size);
        if let Some(page) = params
            .get(URL_PARAM_PAGE)
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|page| *page >= 1)
        {
            state.page = page;
        }
        if let Some(page_size) = params
            .get(URL_PARAM_PAGE_SIZE)
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|size| *size > 0)
        {
            state.page_size = page_size;
        }
        state.ordering = params
            .get(URL_PARAM_ORDERING)
            .and_then(|value| SortSpec::parse(value));
        if let Some(search) = params.get(URL_PARAM_SEARCH) {
            state.query = search.clone();
        }
        if let Some(lineage) = params.get(URL_PARAM_LINEAGE).filter(|v| !v.is_empty()) {
            state
                .facets
                .insert(URL_PARAM_LINEAGE.to_string(), lineage.clone());
        }
        state
    }

    /// The canonical URL form of this state.
    pub fn to_url_params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert(URL_PARAM_PAGE.to_string(), self.page.to_string());
        params.insert(URL_PARAM_PAGE_SIZE.to_string(), self.page_size.to_string());
        if let Some(ordering) = &self.ordering {
            params.insert(URL_PARAM_ORDERING.to_string(), ordering.to_param());
        }
        if !self.query.is_empty() {
            params.insert(URL_PARAM_SEARCH.to_string(), self.query.clone());
        }
        if let Some(lineage) = self.facets.get(URL_PARAM_LINEAGE) {
            params.insert(URL_PARAM_LINEAGE.to_string(), lineage.clone());
        }
        params
    }
}

/// A partial [`FilterState`] passed to a table's `update`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub query: Option<String>,
    pub facets: Option<BTreeMap<String, String>>,
    /// `Some(None)` clears the ordering.
    pub ordering: Option<Option<SortSpec>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl FilterPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn facets(mut self, facets: BTreeMap<String, String>) -> Self {
        self.facets = Some(facets);
        self
    }

    pub fn ordering(mut self, ordering: Option<SortSpec>) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }
}
