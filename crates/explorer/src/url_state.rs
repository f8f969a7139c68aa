//! Reading and writing table state through the page URL.
//!
//! The URL seeds a table's initial state once; afterwards tables push their
//! state back with a history replace and never re-read it.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::filter::{
    FilterState, URL_PARAM_LINEAGE, URL_PARAM_ORDERING, URL_PARAM_PAGE, URL_PARAM_PAGE_SIZE,
    URL_PARAM_SEARCH,
};
use crate::request::encode_query;

const FILTER_URL_PARAMS: [&str; 5] = [
    URL_PARAM_PAGE,
    URL_PARAM_PAGE_SIZE,
    URL_PARAM_ORDERING,
    URL_PARAM_SEARCH,
    URL_PARAM_LINEAGE,
];

/// The host's current location.
pub trait Location: Send + Sync {
    fn href(&self) -> String;
    /// Full navigation to `url`.
    fn assign(&self, url: &str);
    /// History replace without reload.
    fn replace(&self, url: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Navigate,
    Replace,
}

#[derive(Clone)]
pub struct UrlStateStore {
    location: Arc<dyn Location>,
}

impl std::fmt::Debug for UrlStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlStateStore")
            .field("href", &self.location.href())
            .finish()
    }
}

impl UrlStateStore {
    pub fn new(location: Arc<dyn Location>) -> Self {
        Self { location }
    }

    pub fn href(&self) -> String {
        self.location.href()
    }

    /// The current query as a key/value map. Later duplicates win.
    pub fn read(&self) -> BTreeMap<String, String> {
        let href = self.location.href();
        let (_, query, _) = split_href(&href);
        parse_query(query)
    }

    /// Replaces the whole query string with `params`, keeping the fragment.
    pub fn write(&self, params: &BTreeMap<String, String>, mode: WriteMode) {
        let href = self.location.href();
        let (base, _, fragment) = split_href(&href);
        let pairs = params
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<Vec<_>>();

        let mut url = base.to_string();
        if !pairs.is_empty() {
            url.push('?');
            url.push_str(&encode_query(&pairs));
        }
        if let Some(fragment) = fragment {
            url.push('#');
            url.push_str(fragment);
        }

        tracing::debug!("url write ({:?}): {}", mode, url);
        match mode {
            WriteMode::Navigate => self.location.assign(&url),
            WriteMode::Replace => self.location.replace(&url),
        }
    }

    pub fn read_filter_state(&self, default_page_size: u32) -> FilterState {
        FilterState::from_url_params(&self.read(), default_page_size)
    }

    /// Writes the table parameters, leaving unrelated query parameters alone.
    pub fn write_filter_state(&self, state: &FilterState, mode: WriteMode) {
        let mut params = self.read();
        for key in FILTER_URL_PARAMS {
            params.remove(key);
        }
        params.extend(state.to_url_params());
        self.write(&params, mode);
    }
}

/// Splits `href` into base, query and fragment.
fn split_href(href: &str) -> (&str, &str, Option<&str>) {
    let (rest, fragment) = match href.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (href, None),
    };
    match rest.split_once('?') {
        Some((base, query)) => (base, query, fragment),
        None => (rest, "", fragment),
    }
}

/// Parses `a=1&b=two+words` into a map. `+` decodes to a space.
pub fn parse_query(query: &str) -> BTreeMap<String, String> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key);
            (!key.is_empty()).then(|| (key, decode_component(value)))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[derive(Debug, Default)]
struct MemoryHistory {
    entries: Vec<String>,
    navigations: usize,
}

/// In-process [`Location`] that records history instead of touching a browser.
#[derive(Debug, Default)]
pub struct MemoryLocation {
    history: Mutex<MemoryHistory>,
}

impl MemoryLocation {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            history: Mutex::new(MemoryHistory {
                entries: vec![href.into()],
                navigations: 0,
            }),
        }
    }

    pub fn history(&self) -> Vec<String> {
        self.history.lock().entries.clone()
    }

    /// Number of full navigations performed.
    pub fn navigations(&self) -> usize {
        self.history.lock().navigations
    }
}

impl Location for MemoryLocation {
    fn href(&self) -> String {
        self.history.lock().entries.last().cloned().unwrap_or_default()
    }

    fn assign(&self, url: &str) {
        let mut history = self.history.lock();
        history.entries.push(url.to_string());
        history.navigations += 1;
    }

    fn replace(&self, url: &str) {
        let mut history = self.history.lock();
        match history.entries.last_mut() {
            Some(last) => *last = url.to_string(),
            None => history.entries.push(url.to_string()),
        }
    }
}
