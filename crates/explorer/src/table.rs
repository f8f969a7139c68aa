//! Result tables: server-paginated ([`ServerTable`]) and in-memory
//! ([`ClientTable`]). Both expose the same controls through [`ResultTable`].

mod client;
mod server;
mod view;

pub use client::ClientTable;
pub use server::{ServerTable, ServerTableBuilder};
pub use view::{HeaderView, SortClass, TableView};

use async_trait::async_trait;

use crate::column::{ColumnDescriptor, Row};
use crate::filter::{FilterPatch, FilterState, SortSpec};
use crate::pagination::PaginationMeta;

/// What became of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Rows and pagination reflect the patch.
    Applied,
    /// A newer update started before this one finished; its result was dropped.
    Superseded,
    /// The fetch failed; previous rows are kept and an inline error is shown.
    Failed,
    /// The gesture had no effect, e.g. a click on an unsortable header.
    Ignored,
}

#[async_trait]
pub trait ResultTable: Send + Sync {
    /// Merges `patch` into the filter state and refreshes the rows.
    async fn update(&self, patch: FilterPatch) -> UpdateOutcome;

    fn columns(&self) -> &[ColumnDescriptor];

    fn filter_state(&self) -> FilterState;

    fn pagination(&self) -> PaginationMeta;

    fn view(&self) -> TableView;

    /// A click on the header of column `index`.
    async fn sort_by_column(&self, index: usize) -> UpdateOutcome {
        let Some(field) = self
            .columns()
            .get(index)
            .and_then(|column| column.sort_key.clone())
        else {
            return UpdateOutcome::Ignored;
        };
        let current = self.filter_state().ordering;
        let ordering = SortSpec::toggled(current.as_ref(), &field);
        self.update(FilterPatch::new().ordering(Some(ordering)).page(1))
            .await
    }

    async fn go_to_page(&self, page: u32) -> UpdateOutcome {
        self.update(FilterPatch::new().page(page)).await
    }

    async fn set_page_size(&self, page_size: u32) -> UpdateOutcome {
        self.update(FilterPatch::new().page(1).page_size(page_size))
            .await
    }

    async fn search(&self, query: &str) -> UpdateOutcome {
        self.update(FilterPatch::new().page(1).query(query)).await
    }
}

/// Drops rows whose width does not match the header.
pub(crate) fn accept_rows(mount_id: &str, rows: Vec<Row>, width: usize) -> Vec<Row> {
    let total = rows.len();
    let accepted = rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| {
            if row.len() == width {
                Some(row)
            } else {
                tracing::warn!(
                    "table {}: skipping row {} with {} cells, expected {}",
                    mount_id,
                    index,
                    row.len(),
                    width
                );
                None
            }
        })
        .collect::<Vec<_>>();
    if accepted.len() < total {
        tracing::debug!(
            "table {}: kept {} of {} rows",
            mount_id,
            accepted.len(),
            total
        );
    }
    accepted
}
