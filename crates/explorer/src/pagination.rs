//! Pagination arithmetic and the numbered page controls.

use serde::Serialize;

/// Maximum number of numbered page buttons shown at once.
pub const PAGE_WINDOW: u32 = 5;

/// `max(1, ceil(total_results / page_size))`.
///
/// A zero page size is treated as one page so the result is always usable.
pub fn total_pages(total_results: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 1;
    }
    let pages = total_results.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX).max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    pub current_page: u32,
    pub page_size: u32,
    pub total_results: u64,
    pub total_pages: u32,
}

impl PaginationMeta {
    /// Builds the meta for a result set, clamping `current_page` into range.
    pub fn new(current_page: u32, page_size: u32, total_results: u64) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total_pages(total_results, page_size);
        Self {
            current_page: current_page.clamp(1, total_pages),
            page_size,
            total_results,
            total_pages,
        }
    }

    pub fn empty(page_size: u32) -> Self {
        Self::new(1, page_size, 0)
    }

    /// Nearest valid page for a request.
    pub fn clamp_page(&self, page: u32) -> u32 {
        page.clamp(1, self.total_pages)
    }

    pub fn is_first_page(&self) -> bool {
        self.current_page <= 1
    }

    pub fn is_last_page(&self) -> bool {
        self.current_page >= self.total_pages
    }

    /// Rows shown on `page`.
    ///
    /// Every page but the last is full. The last page holds
    /// `total_results mod page_size` rows, or a full page when the division
    /// is exact.
    pub fn rows_on_page(&self, page: u32) -> u64 {
        let page = self.clamp_page(page);
        let size = u64::from(self.page_size);
        if self.total_results == 0 {
            return 0;
        }
        if page < self.total_pages {
            return size;
        }
        match self.total_results % size {
            0 => size,
            remainder => remainder,
        }
    }

    /// One-based index of the first row on the current page (0 when empty).
    pub fn first_row(&self) -> u64 {
        if self.total_results == 0 {
            return 0;
        }
        u64::from(self.current_page - 1) * u64::from(self.page_size) + 1
    }

    pub fn last_row(&self) -> u64 {
        if self.total_results == 0 {
            return 0;
        }
        self.first_row() + self.rows_on_page(self.current_page) - 1
    }

    /// Text of the total-count line, e.g. `Showing 26-50 of 123 results`.
    pub fn summary(&self) -> String {
        if self.total_results == 0 {
            return "No results".to_string();
        }
        format!(
            "Showing {}-{} of {} results",
            self.first_row(),
            self.last_row(),
            self.total_results
        )
    }

    /// The First/Previous/numbered/Next/Last controls for the current page.
    ///
    /// A single page renders one disabled, active page button.
    pub fn controls(&self) -> Vec<PageControl> {
        if self.total_pages <= 1 {
            return vec![PageControl {
                kind: PageControlKind::Page,
                target: 1,
                active: true,
                disabled: true,
            }];
        }

        let current = self.current_page;
        let last = self.total_pages;
        let mut controls = Vec::with_capacity(PAGE_WINDOW as usize + 4);
        controls.push(PageControl::nav(PageControlKind::First, 1, current == 1));
        controls.push(PageControl::nav(
            PageControlKind::Previous,
            current.saturating_sub(1).max(1),
            current == 1,
        ));

        let (start, end) = page_window(current, last);
        for page in start..=end {
            controls.push(PageControl {
                kind: PageControlKind::Page,
                target: page,
                active: page == current,
                disabled: false,
            });
        }

        controls.push(PageControl::nav(
            PageControlKind::Next,
            (current + 1).min(last),
            current == last,
        ));
        controls.push(PageControl::nav(PageControlKind::Last, last, current == last));
        controls
    }
}

fn page_window(current: u32, last: u32) -> (u32, u32) {
    let half = PAGE_WINDOW / 2;
    let mut start = current.saturating_sub(half).max(1);
    let end = (start + PAGE_WINDOW - 1).min(last);
    if end - start + 1 < PAGE_WINDOW {
        start = end.saturating_sub(PAGE_WINDOW - 1).max(1);
    }
    (start, end)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageControlKind {
    First,
    Previous,
    Page,
    Next,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageControl {
    pub kind: PageControlKind,
    /// Page requested when the control is clicked.
    pub target: u32,
    pub active: bool,
    pub disabled: bool,
}

impl PageControl {
    fn nav(kind: PageControlKind, target: u32, disabled: bool) -> Self {
        Self {
            kind,
            target,
            active: false,
            disabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(controls: &[PageControl]) -> Vec<u32> {
        controls
            .iter()
            .filter(|control| control.kind == PageControlKind::Page)
            .map(|control| control.target)
            .collect()
    }

    #[test]
    fn total_pages_has_a_floor_of_one() {
        assert_eq!(total_pages(0, 25), 1);
        assert_eq!(total_pages(1, 25), 1);
        assert_eq!(total_pages(25, 25), 1);
        assert_eq!(total_pages(26, 25), 2);
        assert_eq!(total_pages(123, 25), 5);
        assert_eq!(total_pages(10, 0), 1);
    }

    #[test]
    fn total_pages_matches_ceiling_for_a_grid() {
        for total in 0..200u64 {
            for size in 1..30u32 {
                let expected = ((total as f64) / (size as f64)).ceil().max(1.0) as u32;
                assert_eq!(total_pages(total, size), expected, "total={total} size={size}");
                let meta = PaginationMeta::new(u32::MAX, size, total);
                assert!(meta.current_page >= 1 && meta.current_page <= meta.total_pages);
            }
        }
    }

    #[test]
    fn last_page_holds_the_remainder() {
        let meta = PaginationMeta::new(1, 25, 123);
        assert_eq!(meta.total_pages, 5);
        assert_eq!(meta.rows_on_page(1), 25);
        assert_eq!(meta.rows_on_page(5), 23);
        assert_eq!(meta.clamp_page(6), 5);
        assert_eq!(meta.rows_on_page(6), 23);

        let exact = PaginationMeta::new(4, 25, 100);
        assert_eq!(exact.rows_on_page(4), 25);
        assert_eq!(PaginationMeta::empty(25).rows_on_page(1), 0);
    }

    #[test]
    fn summary_describes_current_slice() {
        let meta = PaginationMeta::new(5, 25, 123);
        assert_eq!(meta.summary(), "Showing 101-123 of 123 results");
        assert_eq!(PaginationMeta::empty(25).summary(), "No results");
    }

    #[test]
    fn empty_result_renders_one_disabled_control() {
        let controls = PaginationMeta::empty(25).controls();
        assert_eq!(controls.len(), 1);
        assert!(controls[0].disabled);
        assert!(controls[0].active);
    }

    #[test]
    fn window_is_centred_and_clamped() {
        assert_eq!(numbered(&PaginationMeta::new(1, 10, 200).controls()), vec![1, 2, 3, 4, 5]);
        assert_eq!(numbered(&PaginationMeta::new(10, 10, 200).controls()), vec![8, 9, 10, 11, 12]);
        assert_eq!(numbered(&PaginationMeta::new(20, 10, 200).controls()), vec![16, 17, 18, 19, 20]);
        assert_eq!(numbered(&PaginationMeta::new(2, 10, 30).controls()), vec![1, 2, 3]);
    }

    #[test]
    fn navigation_controls_disable_at_the_edges() {
        let first = PaginationMeta::new(1, 25, 123).controls();
        assert!(first[0].disabled && first[1].disabled);
        assert!(!first[first.len() - 1].disabled);

        let last = PaginationMeta::new(5, 25, 123).controls();
        let n = last.len();
        assert!(last[n - 1].disabled && last[n - 2].disabled);
        assert_eq!(last[1].target, 4);
    }
}
