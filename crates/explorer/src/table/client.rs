//! A table over rows already held in memory.
//!
//! Search, sort and paging never leave the process: search hides rows by
//! case-sensitive substring match on raw cell text, and paging slices the
//! visible rows.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::view::{header_views, TableView};
use super::{accept_rows, ResultTable, UpdateOutcome};
use crate::column::{ColumnDescriptor, Row};
use crate::config::ExplorerConfig;
use crate::filter::{FilterPatch, FilterState, SortDirection};
use crate::pagination::{total_pages, PaginationMeta};

struct ClientState {
    filter: FilterState,
    rows: Vec<Row>,
    /// Indices into `rows` that pass the search, in display order.
    visible: Vec<usize>,
}

impl ClientState {
    fn refresh(&mut self, columns: &[ColumnDescriptor]) {
        let query = self.filter.query.as_str();
        let mut visible = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| query.is_empty() || row.iter().any(|cell| cell.raw().contains(query)))
            .map(|(index, _)| index)
            .collect::<Vec<_>>();

        if let Some(ordering) = &self.filter.ordering {
            if let Some(column) = columns
                .iter()
                .position(|column| column.sort_key.as_deref() == Some(ordering.field.as_str()))
            {
                let rows = &self.rows;
                visible.sort_by(|a, b| {
                    let order = rows[*a][column].compare(&rows[*b][column]);
                    match ordering.direction {
                        SortDirection::Asc => order,
                        SortDirection::Desc => order.reverse(),
                    }
                });
            }
        }

        let pages = total_pages(visible.len() as u64, self.filter.page_size);
        self.filter.page = self.filter.page.clamp(1, pages);
        self.visible = visible;
    }

    fn page_range(&self) -> std::ops::Range<usize> {
        let size = self.filter.page_size as usize;
        let start = (self.filter.page as usize - 1) * size;
        let start = start.min(self.visible.len());
        let end = (start + size).min(self.visible.len());
        start..end
    }

    fn page_rows(&self) -> Vec<Row> {
        self.visible[self.page_range()]
            .iter()
            .map(|index| self.rows[*index].clone())
            .collect()
    }

    fn pagination(&self) -> PaginationMeta {
        PaginationMeta::new(
            self.filter.page,
            self.filter.page_size,
            self.visible.len() as u64,
        )
    }
}

pub struct ClientTable {
    mount_id: String,
    title: String,
    columns: Vec<ColumnDescriptor>,
    page_size_options: Vec<u32>,
    state: Mutex<ClientState>,
}

impl std::fmt::Debug for ClientTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientTable")
            .field("mount_id", &self.mount_id)
            .finish()
    }
}

impl ClientTable {
    pub fn new(mount_id: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        let defaults = ExplorerConfig::default();
        Self {
            mount_id: mount_id.into(),
            title: String::new(),
            columns,
            page_size_options: defaults.page_size_options,
            state: Mutex::new(ClientState {
                filter: FilterState::new(defaults.default_page_size),
                rows: Vec::new(),
                visible: Vec::new(),
            }),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_page_size(self, page_size: u32) -> Self {
        {
            let mut state = self.state.lock();
            state.filter.page_size = page_size.max(1);
            state.refresh(&self.columns);
        }
        self
    }

    pub fn with_page_size_options(mut self, options: Vec<u32>) -> Self {
        self.page_size_options = options;
        self
    }

    /// Replaces the resident rows, skipping malformed ones. Returns how many were kept.
    pub fn set_rows(&self, rows: Vec<Row>) -> usize {
        let rows = accept_rows(&self.mount_id, rows, self.columns.len());
        let kept = rows.len();
        let mut state = self.state.lock();
        state.rows = rows;
        state.refresh(&self.columns);
        kept
    }

    pub fn rows(&self) -> Vec<Row> {
        self.state.lock().page_rows()
    }

    /// Rows passing the current search, across all pages.
    pub fn visible_count(&self) -> usize {
        self.state.lock().visible.len()
    }
}

#[async_trait]
impl ResultTable for ClientTable {
    async fn update(&self, patch: FilterPatch) -> UpdateOutcome {
        let mut state = self.state.lock();
        state.filter.apply(patch);
        state.refresh(&self.columns);
        UpdateOutcome::Applied
    }

    fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    fn filter_state(&self) -> FilterState {
        self.state.lock().filter.clone()
    }

    fn pagination(&self) -> PaginationMeta {
        self.state.lock().pagination()
    }

    fn view(&self) -> TableView {
        let state = self.state.lock();
        let pagination = state.pagination();
        TableView {
            mount_id: self.mount_id.clone(),
            title: self.title.clone(),
            headers: header_views(&self.columns, state.filter.ordering.as_ref()),
            rows: state.page_rows(),
            pagination,
            controls: pagination.controls(),
            summary: pagination.summary(),
            loading: false,
            error: None,
            download_url: None,
            page_size_options: self.page_size_options.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{Cell, CellKind};
    use crate::filter::SortSpec;

    fn columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("Name").sortable("name"),
            ColumnDescriptor::new("Collected")
                .sortable("collected")
                .kind(CellKind::Date),
            ColumnDescriptor::new("Reads")
                .sortable("reads")
                .kind(CellKind::Number),
        ]
    }

    fn row(name: &str, collected: &str, reads: &str) -> Row {
        vec![
            Cell::text(name),
            Cell::parse(collected, CellKind::Date),
            Cell::parse(reads, CellKind::Number),
        ]
    }

    fn table() -> ClientTable {
        let table = ClientTable::new("runs", columns()).with_page_size(2);
        table.set_rows(vec![
            row("beta soil", "2020-03-01", "900"),
            row("Alpha water", "2019-11-20", "1200"),
            row("gamma soil", "2021-01-05", "85"),
            row("delta Soil", "2018-06-30", "40"),
            row("epsilon air", "2022-09-12", "7"),
        ]);
        table
    }

    fn names(rows: &[Row]) -> Vec<String> {
        rows.iter().map(|row| row[0].raw().to_string()).collect()
    }

    #[tokio::test]
    async fn search_is_case_sensitive_substring() {
        let table = table();
        table.search("soil").await;
        assert_eq!(table.visible_count(), 2);
        assert_eq!(names(&table.rows()), vec!["beta soil", "gamma soil"]);

        table.search("Soil").await;
        assert_eq!(names(&table.rows()), vec!["delta Soil"]);

        table.search("").await;
        assert_eq!(table.visible_count(), 5);
    }

    #[tokio::test]
    async fn each_page_shows_the_remaining_slice() {
        let table = table();
        table.go_to_page(1).await;
        assert_eq!(table.rows().len(), 2);
        table.go_to_page(3).await;
        assert_eq!(table.rows().len(), 1);
        table.go_to_page(9).await;
        assert_eq!(table.pagination().current_page, 3);

        table.set_page_size(4).await;
        assert_eq!(table.pagination().current_page, 1);
        assert_eq!(table.rows().len(), 4);
        table.go_to_page(2).await;
        assert_eq!(table.rows().len(), 1);
    }

    #[tokio::test]
    async fn sorting_follows_column_kind() {
        let table = table().with_page_size(5);

        table.sort_by_column(0).await;
        assert_eq!(
            names(&table.rows()),
            vec!["Alpha water", "beta soil", "delta Soil", "epsilon air", "gamma soil"]
        );

        table.sort_by_column(1).await;
        assert_eq!(names(&table.rows())[0], "delta Soil");
        table.sort_by_column(1).await;
        assert_eq!(table.filter_state().ordering, Some(SortSpec::desc("collected")));
        assert_eq!(names(&table.rows())[0], "epsilon air");

        table.sort_by_column(2).await;
        assert_eq!(
            names(&table.rows()),
            vec!["epsilon air", "delta Soil", "gamma soil", "beta soil", "Alpha water"]
        );
    }

    #[tokio::test]
    async fn larger_page_size_reclamps_the_page() {
        let table = table();
        table.go_to_page(3).await;
        assert_eq!(table.pagination().current_page, 3);

        let table = table.with_page_size(5);
        assert_eq!(table.filter_state().page, 1);
        assert_eq!(table.pagination().current_page, 1);
        assert_eq!(table.rows().len(), 5);
    }

    #[tokio::test]
    async fn malformed_rows_are_rejected() {
        let table = ClientTable::new("runs", columns());
        let kept = table.set_rows(vec![
            row("a", "2020-01-01", "1"),
            vec![Cell::text("short")],
        ]);
        assert_eq!(kept, 1);
        assert_eq!(table.view().summary, "Showing 1-1 of 1 results");
    }

    #[tokio::test]
    async fn empty_table_has_one_disabled_control() {
        let table = ClientTable::new("runs", columns());
        let view = table.view();
        assert!(view.rows.is_empty());
        assert_eq!(view.controls.len(), 1);
        assert!(view.controls[0].disabled);
        assert_eq!(view.download_url, None);
    }
}
