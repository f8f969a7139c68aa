use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use facets::{CategoryNode, CheckboxTree, FacetSyncBus};
use tokio::sync::{mpsc, oneshot};

use super::*;
use crate::column::{Cell, CellKind};
use crate::error::{ExplorerError, Result};
use crate::fetch::{fetch_fn, FetchPage};
use crate::filter::SortSpec;
use crate::pagination::PageControlKind;
use crate::table::SortClass;
use crate::url_state::{Location, MemoryLocation};

fn columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("Accession").sortable("accession"),
        ColumnDescriptor::new("Biome"),
        ColumnDescriptor::new("Depth")
            .sortable("depth")
            .kind(CellKind::Number),
    ]
}

fn sample_row(index: u64) -> Row {
    vec![
        Cell::text(format!("ERS{index}")),
        Cell::text("Air"),
        Cell::number(index as f64),
    ]
}

fn page_of(label: &str, count: u64) -> FetchPage {
    FetchPage {
        rows: (0..count)
            .map(|index| {
                vec![
                    Cell::text(format!("{label}-{index}")),
                    Cell::text("Air"),
                    Cell::number(index as f64),
                ]
            })
            .collect(),
        total_results: count,
    }
}

/// A result set of `total` rows served page by page.
struct Catalogue {
    total: u64,
    seen: Arc<Mutex<Vec<FetchRequest>>>,
}

impl Catalogue {
    fn new(total: u64) -> (Self, Arc<Mutex<Vec<FetchRequest>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                total,
                seen: seen.clone(),
            },
            seen,
        )
    }
}

#[async_trait]
impl RowFetcher for Catalogue {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchPage> {
        self.seen.lock().push(request.clone());
        let size = u64::from(request.page_size);
        let start = u64::from(request.page.saturating_sub(1)) * size;
        let count = self.total.saturating_sub(start).min(size);
        Ok(FetchPage {
            rows: (start..start + count).map(sample_row).collect(),
            total_results: self.total,
        })
    }
}

/// Answers requests with pre-scripted results, in order.
struct Scripted {
    responses: Mutex<VecDeque<Result<FetchPage>>>,
}

impl Scripted {
    fn new(responses: Vec<Result<FetchPage>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl RowFetcher for Scripted {
    async fn fetch(&self, _request: &FetchRequest) -> Result<FetchPage> {
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(FetchPage::default()))
    }
}

/// Holds each search's response until the test releases it.
struct Gated {
    gates: Mutex<HashMap<String, oneshot::Receiver<Result<FetchPage>>>>,
}

#[async_trait]
impl RowFetcher for Gated {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchPage> {
        let gate = self.gates.lock().remove(&request.search);
        match gate {
            Some(gate) => gate
                .await
                .unwrap_or_else(|_| Err(ExplorerError::Transport("gate dropped".to_string()))),
            None => Ok(FetchPage::default()),
        }
    }
}

fn first_cells(table: &ServerTable) -> Vec<String> {
    table
        .rows()
        .iter()
        .map(|row| row[0].raw().to_string())
        .collect()
}

#[tokio::test]
async fn pages_of_25_over_123_results() {
    let (fetcher, seen) = Catalogue::new(123);
    let table = ServerTable::builder("samples", columns(), fetcher)
        .page_size(25)
        .build();

    assert_eq!(table.refresh().await, UpdateOutcome::Applied);
    assert_eq!(table.pagination().total_pages, 5);
    assert_eq!(table.rows().len(), 25);

    assert_eq!(table.go_to_page(5).await, UpdateOutcome::Applied);
    assert_eq!(table.rows().len(), 23);
    assert_eq!(table.view().summary, "Showing 101-123 of 123 results");

    assert_eq!(table.go_to_page(6).await, UpdateOutcome::Applied);
    assert_eq!(seen.lock().last().map(|request| request.page), Some(5));
    assert_eq!(table.pagination().current_page, 5);
    assert_eq!(table.rows().len(), 23);
}

#[tokio::test]
async fn seeded_page_past_the_end_lands_on_the_last_page() {
    let location = Arc::new(MemoryLocation::new("https://example.org/browse?page=4"));
    let (fetcher, seen) = Catalogue::new(40);
    let table = ServerTable::builder("samples", columns(), fetcher)
        .page_size(25)
        .url_store(UrlStateStore::new(location.clone()))
        .build();

    assert_eq!(table.refresh().await, UpdateOutcome::Applied);
    let pages = seen.lock().iter().map(|request| request.page).collect::<Vec<_>>();
    assert_eq!(pages, vec![4, 2]);

    let view = table.view();
    assert_eq!(view.pagination.current_page, 2);
    assert_eq!(view.rows.len(), 15);
    assert_eq!(view.summary, "Showing 26-40 of 40 results");
    assert!(!view.loading);
    assert!(location.href().contains("page=2"));
}

#[tokio::test]
async fn shrinking_total_refetches_the_new_last_page() {
    let full_page = FetchPage {
        rows: (0..25).map(sample_row).collect(),
        total_results: 123,
    };
    let fetcher = Scripted::new(vec![
        Ok(full_page),
        Ok(FetchPage {
            rows: Vec::new(),
            total_results: 30,
        }),
        Ok(FetchPage {
            rows: (25..30).map(sample_row).collect(),
            total_results: 30,
        }),
    ]);
    let table = ServerTable::builder("samples", columns(), fetcher)
        .page_size(25)
        .build();

    assert_eq!(table.refresh().await, UpdateOutcome::Applied);
    assert_eq!(table.go_to_page(5).await, UpdateOutcome::Applied);
    assert_eq!(table.pagination().current_page, 2);
    assert_eq!(table.pagination().total_results, 30);
    assert_eq!(first_cells(&table), vec!["ERS25", "ERS26", "ERS27", "ERS28", "ERS29"]);
}

#[tokio::test]
async fn page_size_change_returns_to_first_page() {
    let (fetcher, seen) = Catalogue::new(123);
    let table = ServerTable::builder("samples", columns(), fetcher).build();
    table.refresh().await;
    table.go_to_page(4).await;

    assert_eq!(table.set_page_size(50).await, UpdateOutcome::Applied);
    let last = seen.lock().last().cloned().expect("request");
    assert_eq!((last.page, last.page_size), (1, 50));
    assert_eq!(table.pagination().total_pages, 3);
}

#[tokio::test]
async fn stale_response_never_overwrites_newer_rows() {
    let (a_tx, a_rx) = oneshot::channel();
    let (ab_tx, ab_rx) = oneshot::channel();
    let fetcher = Gated {
        gates: Mutex::new(
            [("a".to_string(), a_rx), ("ab".to_string(), ab_rx)]
                .into_iter()
                .collect(),
        ),
    };
    let table = ServerTable::builder("samples", columns(), fetcher).build();

    let slow = tokio::spawn({
        let table = table.clone();
        async move { table.search("a").await }
    });
    tokio::task::yield_now().await;
    let fast = tokio::spawn({
        let table = table.clone();
        async move { table.search("ab").await }
    });
    tokio::task::yield_now().await;

    ab_tx.send(Ok(page_of("ab", 2))).ok();
    assert_eq!(fast.await.expect("join"), UpdateOutcome::Applied);

    // The first request was cancelled; a late answer goes nowhere.
    a_tx.send(Ok(page_of("a", 3))).ok();
    assert_eq!(slow.await.expect("join"), UpdateOutcome::Superseded);

    assert_eq!(first_cells(&table), vec!["ab-0", "ab-1"]);
    assert_eq!(table.filter_state().query, "ab");
    assert!(!table.is_loading());
}

#[tokio::test(start_paused = true)]
async fn typing_burst_fetches_once() {
    let (fetcher, seen) = Catalogue::new(40);
    let table = ServerTable::builder("samples", columns(), fetcher)
        .debounce(Duration::from_millis(300))
        .build();

    for text in ["w", "wi", "win"] {
        table.search_input(text);
        tokio::time::advance(Duration::from_millis(100)).await;
    }
    assert!(seen.lock().is_empty());

    tokio::time::sleep(Duration::from_millis(500)).await;
    let searches = seen
        .lock()
        .iter()
        .map(|request| request.search.clone())
        .collect::<Vec<_>>();
    assert_eq!(searches, vec!["win".to_string()]);
    assert_eq!(table.filter_state().query, "win");
    assert_eq!(table.filter_state().page, 1);
}

#[tokio::test]
async fn failed_fetch_keeps_rows_and_reports_status() {
    let fetcher = Scripted::new(vec![
        Ok(page_of("ok", 3)),
        Err(ExplorerError::Http {
            status: 500,
            message: "internal error".to_string(),
        }),
    ]);
    let table = ServerTable::builder("samples", columns(), fetcher).build();

    assert_eq!(table.refresh().await, UpdateOutcome::Applied);
    assert_eq!(table.go_to_page(2).await, UpdateOutcome::Failed);

    let view = table.view();
    assert!(!view.loading);
    assert_eq!(view.rows.len(), 3);
    assert!(view.error.as_deref().is_some_and(|e| e.contains("HTTP 500")));

    assert_eq!(table.refresh().await, UpdateOutcome::Applied);
    assert_eq!(table.error(), None);
}

#[tokio::test]
async fn malformed_rows_are_skipped() {
    let mut page = page_of("row", 3);
    page.rows[1].pop();
    let table = ServerTable::builder("samples", columns(), Scripted::new(vec![Ok(page)])).build();

    assert_eq!(table.refresh().await, UpdateOutcome::Applied);
    assert_eq!(first_cells(&table), vec!["row-0", "row-2"]);
    assert_eq!(table.pagination().total_results, 3);
}

#[tokio::test]
async fn download_link_mirrors_the_fetch() {
    let fetcher = fetch_fn(|_request: FetchRequest| async {
        Ok::<FetchPage, ExplorerError>(FetchPage::default())
    })
    .with_download_base("https://example.org/api/samples");
    let table = ServerTable::builder("samples", columns(), fetcher).build();

    let mut facets = std::collections::BTreeMap::new();
    facets.insert("lineage".to_string(), "root:Environmental:Air".to_string());
    table
        .update(
            FilterPatch::new()
                .query("windshield")
                .facets(facets),
        )
        .await;
    table.sort_by_column(2).await;

    let url = table.download_url().expect("download url");
    assert!(url.starts_with("https://example.org/api/samples?"));
    assert!(url.contains("ordering=depth"));
    assert!(!url.contains("-depth"));
    assert!(url.contains("search=windshield"));
    assert!(url.contains("lineage=root%3AEnvironmental%3AAir"));
    assert!(url.ends_with("format=csv"));
    assert!(!url.contains("page="));
}

#[tokio::test]
async fn header_clicks_cycle_sort_direction() {
    let (fetcher, seen) = Catalogue::new(10);
    let table = ServerTable::builder("samples", columns(), fetcher).build();
    table.go_to_page(1).await;

    assert_eq!(table.sort_by_column(0).await, UpdateOutcome::Applied);
    assert_eq!(table.filter_state().ordering, Some(SortSpec::asc("accession")));
    assert_eq!(table.sort_by_column(0).await, UpdateOutcome::Applied);
    assert_eq!(table.filter_state().ordering, Some(SortSpec::desc("accession")));

    let requests = seen.lock().len();
    assert_eq!(table.sort_by_column(1).await, UpdateOutcome::Ignored);
    assert_eq!(seen.lock().len(), requests);

    table.sort_by_column(2).await;
    let headers = table.view().headers;
    assert_eq!(headers[0].sort_class, Some(SortClass::Unsorted));
    assert_eq!(headers[1].sort_class, None);
    assert_eq!(headers[2].sort_class, Some(SortClass::Ascending));
    assert_eq!(seen.lock().last().map(|request| request.page), Some(1));
}

#[tokio::test]
async fn empty_result_renders_single_disabled_control() {
    let (fetcher, _) = Catalogue::new(0);
    let table = ServerTable::builder("samples", columns(), fetcher).build();
    assert_eq!(table.refresh().await, UpdateOutcome::Applied);

    let view = table.view();
    assert!(view.rows.is_empty());
    assert_eq!(view.summary, "No results");
    assert_eq!(view.controls.len(), 1);
    assert_eq!(view.controls[0].kind, PageControlKind::Page);
    assert!(view.controls[0].disabled);
}

#[tokio::test]
async fn sibling_form_changes_refetch_bound_table() {
    let bus = FacetSyncBus::new();
    let tree = || {
        CheckboxTree::from_hierarchy(&[CategoryNode::branch(
            "root",
            10,
            vec![CategoryNode::branch(
                "Environmental",
                10,
                vec![CategoryNode::leaf("Air", 4), CategoryNode::leaf("Aquatic", 6)],
            )],
        )])
    };
    let studies_form = FacetForm::new("studies", &bus);
    studies_form.add_tree("lineage", tree());
    let samples_form = FacetForm::new("samples", &bus);
    samples_form.add_tree("lineage", tree());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let fetcher = fetch_fn(move |request: FetchRequest| {
        tx.send(request).ok();
        async { Ok::<FetchPage, ExplorerError>(FetchPage::default()) }
    });
    let table = ServerTable::builder("samples", columns(), fetcher).build();
    table.bind_form(&samples_form);
    table.go_to_page(1).await;
    rx.recv().await.expect("initial request");

    studies_form
        .check("lineage", "root:Environmental:Air", true)
        .expect("check");

    let request = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("refetch")
        .expect("request");
    assert_eq!(request.page, 1);
    assert_eq!(
        request.facets.get("lineage").map(String::as_str),
        Some("root:Environmental:Air")
    );
}

#[tokio::test]
async fn url_seeds_state_and_receives_updates() {
    let location = Arc::new(MemoryLocation::new(
        "https://example.org/browse?page=2&pagesize=10&search=soil#samples",
    ));
    let (fetcher, seen) = Catalogue::new(95);
    let table = ServerTable::builder("samples", columns(), fetcher)
        .url_store(UrlStateStore::new(location.clone()))
        .build();

    let state = table.filter_state();
    assert_eq!((state.page, state.page_size), (2, 10));
    assert_eq!(state.query, "soil");

    table.refresh().await;
    assert_eq!(seen.lock()[0].search, "soil");

    table.go_to_page(3).await;
    let href = location.href();
    assert!(href.contains("page=3"));
    assert!(href.contains("pagesize=10"));
    assert!(href.ends_with("#samples"));
    assert_eq!(location.navigations(), 0);
    assert_eq!(location.history().len(), 1);
}

#[tokio::test]
async fn tables_without_the_url_leave_it_alone() {
    let location = Arc::new(MemoryLocation::new(
        "https://example.org/browse?ordering=depth&page=2",
    ));
    let store = UrlStateStore::new(location.clone());
    let (samples_fetcher, _) = Catalogue::new(100);
    let samples = ServerTable::builder("samples", columns(), samples_fetcher)
        .url_store(store)
        .build();
    let (studies_fetcher, studies_seen) = Catalogue::new(100);
    let studies = ServerTable::builder("studies", columns(), studies_fetcher).build();

    samples.refresh().await;
    let href = location.href();
    studies.go_to_page(3).await;
    assert_eq!(location.href(), href);
    assert_eq!(studies_seen.lock()[0].ordering, None);
    assert!(href.contains("ordering=depth"));
    assert!(href.contains("page=2"));
}

#[tokio::test]
async fn seeded_ordering_without_a_sortable_column_is_dropped() {
    let location = Arc::new(MemoryLocation::new(
        "https://example.org/browse?ordering=-study_name&page=1",
    ));
    let (fetcher, seen) = Catalogue::new(10);
    let table = ServerTable::builder("samples", columns(), fetcher)
        .url_store(UrlStateStore::new(location))
        .build();

    assert_eq!(table.filter_state().ordering, None);
    table.refresh().await;
    assert_eq!(seen.lock()[0].ordering, None);
}
