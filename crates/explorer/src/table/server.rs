//! A table whose rows come page by page from a [`RowFetcher`].

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use facets::FacetForm;
use parking_lot::Mutex;

use super::view::{header_views, TableView};
use super::{accept_rows, ResultTable, UpdateOutcome};
use crate::cancel::RequestTracker;
use crate::column::{ColumnDescriptor, Row};
use crate::config::ExplorerConfig;
use crate::debounce::Debouncer;
use crate::fetch::RowFetcher;
use crate::filter::{FilterPatch, FilterState};
use crate::pagination::{total_pages, PaginationMeta};
use crate::request::FetchRequest;
use crate::url_state::{UrlStateStore, WriteMode};

/// Extra fetches allowed when a response shows the requested page no longer exists.
const MAX_PAGE_REFETCHES: u32 = 2;

enum Settled {
    Applied(FilterState),
    Refetch,
    Failed,
}

struct TableState {
    filter: FilterState,
    rows: Vec<Row>,
    /// `None` until the first successful fetch reports a total.
    pagination: Option<PaginationMeta>,
    loading: bool,
    error: Option<String>,
    download_url: Option<String>,
}

struct Inner {
    mount_id: String,
    title: String,
    columns: Vec<ColumnDescriptor>,
    page_size_options: Vec<u32>,
    fetcher: Arc<dyn RowFetcher>,
    url_store: Option<UrlStateStore>,
    tracker: RequestTracker,
    debouncer: Debouncer,
    state: Mutex<TableState>,
}

pub struct ServerTableBuilder {
    mount_id: String,
    title: String,
    columns: Vec<ColumnDescriptor>,
    fetcher: Arc<dyn RowFetcher>,
    page_size: u32,
    page_size_options: Vec<u32>,
    debounce: Duration,
    url_store: Option<UrlStateStore>,
    initial_state: Option<FilterState>,
}

impl ServerTableBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size_options(mut self, options: Vec<u32>) -> Self {
        self.page_size_options = options;
        self
    }

    pub fn debounce(mut self, delay: Duration) -> Self {
        self.debounce = delay;
        self
    }

    /// Takes page size, debounce and page-size options from `config`.
    pub fn config(self, config: &ExplorerConfig) -> Self {
        self.page_size(config.default_page_size)
            .page_size_options(config.page_size_options.clone())
            .debounce(config.search_debounce())
    }

    /// Seeds the initial state from `store` and writes state back after each update.
    pub fn url_store(mut self, store: UrlStateStore) -> Self {
        self.url_store = Some(store);
        self
    }

    /// Overrides the starting filter state, including any URL seed.
    pub fn initial_state(mut self, state: FilterState) -> Self {
        self.initial_state = Some(state);
        self
    }

    pub fn build(self) -> ServerTable {
        let mut filter = match (self.initial_state, &self.url_store) {
            (Some(state), _) => state,
            (None, Some(store)) => store.read_filter_state(self.page_size),
            (None, None) => FilterState::new(self.page_size),
        };
        let sortable = filter.ordering.as_ref().map_or(true, |ordering| {
            self.columns
                .iter()
                .any(|column| column.sort_key.as_deref() == Some(ordering.field.as_str()))
        });
        if !sortable {
            tracing::debug!(
                "table {}: dropping ordering {:?} with no sortable column",
                self.mount_id,
                filter.ordering
            );
            filter.ordering = None;
        }
        ServerTable {
            inner: Arc::new(Inner {
                mount_id: self.mount_id,
                title: self.title,
                columns: self.columns,
                page_size_options: self.page_size_options,
                fetcher: self.fetcher,
                url_store: self.url_store,
                tracker: RequestTracker::new(),
                debouncer: Debouncer::new(self.debounce),
                state: Mutex::new(TableState {
                    filter,
                    rows: Vec::new(),
                    pagination: None,
                    loading: false,
                    error: None,
                    download_url: None,
                }),
            }),
        }
    }
}

/// Server-paginated result table. Clones share the same table.
#[derive(Clone)]
pub struct ServerTable {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ServerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerTable")
            .field("mount_id", &self.inner.mount_id)
            .finish()
    }
}

impl ServerTable {
    pub fn builder(
        mount_id: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
        fetcher: impl RowFetcher + 'static,
    ) -> ServerTableBuilder {
        let defaults = ExplorerConfig::default();
        ServerTableBuilder {
            mount_id: mount_id.into(),
            title: String::new(),
            columns,
            fetcher: Arc::new(fetcher),
            page_size: defaults.default_page_size,
            page_size_options: defaults.page_size_options.clone(),
            debounce: defaults.search_debounce(),
            url_store: None,
            initial_state: None,
        }
    }

    pub fn mount_id(&self) -> &str {
        &self.inner.mount_id
    }

    pub fn rows(&self) -> Vec<Row> {
        self.inner.state.lock().rows.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.lock().error.clone()
    }

    pub fn download_url(&self) -> Option<String> {
        self.inner.state.lock().download_url.clone()
    }

    /// Refetches with the current state.
    pub async fn refresh(&self) -> UpdateOutcome {
        self.update(FilterPatch::new()).await
    }

    /// A keystroke in the search box. The fetch fires once typing pauses.
    pub fn search_input(&self, text: impl Into<String>) {
        let text = text.into();
        let table = Arc::downgrade(&self.inner);
        self.inner.debouncer.call(async move {
            if let Some(table) = upgrade(&table) {
                table.update(FilterPatch::new().page(1).query(text)).await;
            }
        });
    }

    /// Refetches from page 1 whenever `form` commits a facet change.
    ///
    /// The form's current selection is adopted immediately when non-empty.
    /// Must be bound from within a tokio runtime for changes to refetch.
    pub fn bind_form(&self, form: &FacetForm) {
        let selection = form.selection();
        if !selection.is_empty() {
            self.inner.state.lock().filter.facets = selection.into_params();
        }

        let table = Arc::downgrade(&self.inner);
        let mount_id = self.inner.mount_id.clone();
        form.on_change(move |selection| {
            let Some(table) = upgrade(&table) else {
                return;
            };
            let patch = FilterPatch::new().page(1).facets(selection.clone().into_params());
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        table.update(patch).await;
                    });
                }
                Err(_) => {
                    tracing::warn!(
                        "table {}: facet change outside a runtime was not fetched",
                        mount_id
                    );
                }
            }
        });
    }

    fn write_url(&self, filter: &FilterState) {
        if let Some(store) = &self.inner.url_store {
            store.write_filter_state(filter, WriteMode::Replace);
        }
    }
}

fn upgrade(table: &Weak<Inner>) -> Option<ServerTable> {
    table.upgrade().map(|inner| ServerTable { inner })
}

#[async_trait]
impl ResultTable for ServerTable {
    async fn update(&self, patch: FilterPatch) -> UpdateOutcome {
        let inner = &self.inner;
        let mut patch = patch;
        let mut refetches = 0;
        loop {
            let (request, ticket) = {
                let mut state = inner.state.lock();
                state.filter.apply(patch);
                if let Some(meta) = state.pagination {
                    let pages = total_pages(meta.total_results, state.filter.page_size);
                    state.filter.page = state.filter.page.clamp(1, pages);
                }
                state.loading = true;
                (FetchRequest::from_state(&state.filter), inner.tracker.begin())
            };

            tracing::debug!(
                "table {}: request {} page {} size {}",
                inner.mount_id,
                ticket.version(),
                request.page,
                request.page_size
            );

            let Some(result) = ticket.run(inner.fetcher.fetch(&request)).await else {
                tracing::debug!(
                    "table {}: request {} cancelled",
                    inner.mount_id,
                    ticket.version()
                );
                return UpdateOutcome::Superseded;
            };

            let settled = {
                let mut state = inner.state.lock();
                if !inner.tracker.is_current(ticket.version()) {
                    tracing::debug!(
                        "table {}: dropping stale response {}",
                        inner.mount_id,
                        ticket.version()
                    );
                    return UpdateOutcome::Superseded;
                }
                inner.tracker.finish(&ticket);

                match result {
                    Ok(page) => {
                        let meta = PaginationMeta::new(
                            request.page,
                            request.page_size,
                            page.total_results,
                        );
                        if meta.current_page != request.page
                            && page.total_results > 0
                            && refetches < MAX_PAGE_REFETCHES
                        {
                            // Asked past the last page: the total is now
                            // known, so the next round clamps before fetching.
                            tracing::debug!(
                                "table {}: page {} is past the last page {}, refetching",
                                inner.mount_id,
                                request.page,
                                meta.total_pages
                            );
                            state.pagination = Some(meta);
                            Settled::Refetch
                        } else {
                            state.loading = false;
                            state.rows =
                                accept_rows(&inner.mount_id, page.rows, inner.columns.len());
                            state.filter.page = meta.current_page;
                            state.pagination = Some(meta);
                            state.error = None;
                            state.download_url = inner.fetcher.download_url(&request);
                            Settled::Applied(state.filter.clone())
                        }
                    }
                    Err(error) => {
                        tracing::warn!("table {}: fetch failed: {}", inner.mount_id, error);
                        state.loading = false;
                        state.error = Some(error.user_message());
                        Settled::Failed
                    }
                }
            };

            match settled {
                Settled::Refetch => {
                    refetches += 1;
                    patch = FilterPatch::new();
                }
                Settled::Applied(filter) => {
                    self.write_url(&filter);
                    return UpdateOutcome::Applied;
                }
                Settled::Failed => return UpdateOutcome::Failed,
            }
        }
    }

    fn columns(&self) -> &[ColumnDescriptor] {
        &self.inner.columns
    }

    fn filter_state(&self) -> FilterState {
        self.inner.state.lock().filter.clone()
    }

    fn pagination(&self) -> PaginationMeta {
        let state = self.inner.state.lock();
        state.pagination.unwrap_or_else(|| {
            PaginationMeta::new(state.filter.page, state.filter.page_size, 0)
        })
    }

    fn view(&self) -> TableView {
        let pagination = self.pagination();
        let state = self.inner.state.lock();
        TableView {
            mount_id: self.inner.mount_id.clone(),
            title: self.inner.title.clone(),
            headers: header_views(&self.inner.columns, state.filter.ordering.as_ref()),
            rows: state.rows.clone(),
            pagination,
            controls: pagination.controls(),
            summary: pagination.summary(),
            loading: state.loading,
            error: state.error.clone(),
            download_url: state.download_url.clone(),
            page_size_options: self.inner.page_size_options.clone(),
        }
    }
}

#[cfg(test)]
mod tests;
