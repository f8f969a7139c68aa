use serde::Serialize;

use crate::column::{ColumnDescriptor, Row};
use crate::filter::{SortDirection, SortSpec};
use crate::pagination::{PageControl, PaginationMeta};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortClass {
    Unsorted,
    Ascending,
    Descending,
}

impl SortClass {
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Unsorted => "sorting",
            Self::Ascending => "sorting_asc",
            Self::Descending => "sorting_desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderView {
    pub display_name: String,
    pub sort_key: Option<String>,
    /// `None` for columns that cannot be sorted.
    pub sort_class: Option<SortClass>,
}

/// Everything needed to render a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub mount_id: String,
    pub title: String,
    pub headers: Vec<HeaderView>,
    pub rows: Vec<Row>,
    pub pagination: PaginationMeta,
    pub controls: Vec<PageControl>,
    pub summary: String,
    pub loading: bool,
    pub error: Option<String>,
    pub download_url: Option<String>,
    pub page_size_options: Vec<u32>,
}

pub(crate) fn header_views(
    columns: &[ColumnDescriptor],
    ordering: Option<&SortSpec>,
) -> Vec<HeaderView> {
    columns
        .iter()
        .map(|column| {
            let sort_class = column.sort_key.as_deref().map(|key| match ordering {
                Some(spec) if spec.field == key => match spec.direction {
                    SortDirection::Asc => SortClass::Ascending,
                    SortDirection::Desc => SortClass::Descending,
                },
                _ => SortClass::Unsorted,
            });
            HeaderView {
                display_name: column.display_name.clone(),
                sort_key: column.sort_key.clone(),
                sort_class,
            }
        })
        .collect()
}
