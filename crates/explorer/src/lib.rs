//! Result tables for browsing a paginated REST API.
//!
//! - [`ServerTable`] pages, sorts and searches through a [`RowFetcher`]
//! - [`ClientTable`] does the same over rows held in memory
//! - [`ExplorerPage`] shares one facet sync bus and the page URL between tables

pub mod api;
pub mod cancel;
pub mod column;
pub mod config;
pub mod debounce;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod page;
pub mod pagination;
pub mod request;
pub mod table;
pub mod url_state;

pub use api::{ApiClient, ResourceFetcher};
pub use column::{Cell, CellKind, ColumnDescriptor, Row};
pub use config::{load_or_create_config, ExplorerConfig};
pub use error::{ExplorerError, Result};
pub use fetch::{fetch_fn, FetchPage, FnFetcher, RowFetcher};
pub use filter::{FilterPatch, FilterState, SortDirection, SortSpec};
pub use page::ExplorerPage;
pub use pagination::{PageControl, PageControlKind, PaginationMeta};
pub use request::{ExportFormat, FetchRequest};
pub use table::{ClientTable, ResultTable, ServerTable, TableView, UpdateOutcome};
pub use url_state::{Location, MemoryLocation, UrlStateStore, WriteMode};
