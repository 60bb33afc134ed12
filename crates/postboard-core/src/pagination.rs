//! Page window calculation and the pagination control built on top of it.
//!
//! [`compute_window`] turns `(current page, total pages, visible slots)` into
//! the ordered list of page markers shown by the control. The control itself
//! owns no data: it only decides which page-change requests are allowed and
//! renders a projection of the window.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tracing::debug;

/// One slot of the page window, rendered left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageToken {
    Page(u32),
    Ellipsis,
}

impl PageToken {
    pub fn page(&self) -> Option<u32> {
        match self {
            PageToken::Page(page) => Some(*page),
            PageToken::Ellipsis => None,
        }
    }
}

/// Number of pages needed for `total_items` at `page_size` items per page.
pub fn total_pages(total_items: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_items.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Compute the page markers to display.
///
/// When everything fits, every page is listed. Otherwise the first and last
/// pages are always shown, with a block of `max_visible - 2` pages centred
/// on `current_page` between them and an ellipsis wherever pages are skipped.
/// Out of range input is clamped rather than rejected.
pub fn compute_window(current_page: u32, total_pages: u32, max_visible: u32) -> Vec<PageToken> {
    let max_visible = max_visible.max(1);
    if total_pages <= max_visible {
        return (1..=total_pages).map(PageToken::Page).collect();
    }

    let current = current_page.clamp(1, total_pages);
    if current != current_page {
        debug!(current_page, total_pages, "Clamped current page into range");
    }

    let width = max_visible.saturating_sub(2);
    let mut tokens = Vec::with_capacity(max_visible as usize + 2);
    tokens.push(PageToken::Page(1));

    if width == 0 {
        if total_pages > 2 {
            tokens.push(PageToken::Ellipsis);
        }
        tokens.push(PageToken::Page(total_pages));
        return tokens;
    }

    // The block has to fit in [2, total_pages - 1], which holds at least
    // `width + 1` pages because total_pages > max_visible.
    let last_inner = total_pages - 1;
    let start = current
        .saturating_sub((width - 1) / 2)
        .clamp(2, last_inner + 1 - width);
    let end = start + width - 1;

    if start > 2 {
        tokens.push(PageToken::Ellipsis);
    }
    tokens.extend((start..=end).map(PageToken::Page));
    if end < last_inner {
        tokens.push(PageToken::Ellipsis);
    }
    tokens.push(PageToken::Page(total_pages));
    tokens
}

/// Stateless pagination control. Build one per render from the current
/// props; it never changes the page itself, it only reports the page a
/// click asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationControl {
    pub current_page: u32,
    pub total_pages: u32,
    pub max_visible: u32,
    pub is_loading: bool,
}

impl PaginationControl {
    pub fn new(current_page: u32, total_pages: u32, max_visible: u32) -> Self {
        Self {
            current_page,
            total_pages,
            max_visible,
            is_loading: false,
        }
    }

    pub fn loading(mut self, is_loading: bool) -> Self {
        self.is_loading = is_loading;
        self
    }

    pub fn tokens(&self) -> Vec<PageToken> {
        compute_window(self.current_page, self.total_pages, self.max_visible)
    }

    /// The page a request for `target` resolves to, if it should fire.
    pub fn request(&self, target: u32) -> Option<u32> {
        let in_range = target >= 1 && target <= self.total_pages;
        (in_range && target != self.current_page && !self.is_loading).then_some(target)
    }

    /// Run `on_page_change` for `target` when the request is allowed.
    /// Returns whether the callback fired.
    pub fn on_page_change<F: FnOnce(u32)>(&self, target: u32, on_page_change: F) -> bool {
        match self.request(target) {
            Some(page) => {
                on_page_change(page);
                true
            }
            None => false,
        }
    }

    pub fn click(&self, token: PageToken) -> Option<u32> {
        token.page().and_then(|page| self.request(page))
    }

    pub fn prev(&self) -> Option<u32> {
        self.current_page
            .checked_sub(1)
            .and_then(|page| self.request(page))
    }

    pub fn next(&self) -> Option<u32> {
        self.current_page
            .checked_add(1)
            .and_then(|page| self.request(page))
    }

    pub fn prev_disabled(&self) -> bool {
        self.current_page <= 1 || self.is_loading
    }

    pub fn next_disabled(&self) -> bool {
        self.current_page >= self.total_pages || self.is_loading
    }

    pub fn is_active(&self, token: PageToken) -> bool {
        token == PageToken::Page(self.current_page)
    }
}

impl Display for PaginationControl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", if self.prev_disabled() { " " } else { "‹" })?;
        for token in self.tokens() {
            match token {
                PageToken::Ellipsis => write!(f, " …")?,
                PageToken::Page(page) if self.is_active(token) => write!(f, " [{page}]")?,
                PageToken::Page(page) => write!(f, " {page}")?,
            }
        }
        write!(f, " {}", if self.next_disabled() { " " } else { "›" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use PageToken::{Ellipsis, Page};

    fn pages(tokens: &[PageToken]) -> Vec<u32> {
        tokens.iter().filter_map(PageToken::page).collect()
    }

    fn ellipses(tokens: &[PageToken]) -> usize {
        tokens.iter().filter(|token| **token == Ellipsis).count()
    }

    #[test]
    fn lists_every_page_when_they_fit() {
        assert_eq!(
            compute_window(1, 5, 7),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5)]
        );
        assert!(compute_window(1, 0, 4).is_empty());
    }

    #[test]
    fn single_page() {
        for max_visible in [1, 2, 4, 100] {
            assert_eq!(compute_window(1, 1, max_visible), vec![Page(1)]);
        }
    }

    #[test]
    fn middle_page_has_two_ellipses() {
        let tokens = compute_window(10, 20, 5);
        assert_eq!(
            tokens,
            vec![Page(1), Ellipsis, Page(9), Page(10), Page(11), Ellipsis, Page(20)]
        );
        assert_eq!(ellipses(&tokens), 2);
    }

    #[test]
    fn block_is_clamped_at_the_start() {
        assert_eq!(
            compute_window(2, 20, 5),
            vec![Page(1), Page(2), Page(3), Page(4), Ellipsis, Page(20)]
        );
        assert_eq!(
            compute_window(1, 20, 5),
            vec![Page(1), Page(2), Page(3), Page(4), Ellipsis, Page(20)]
        );
    }

    #[test]
    fn block_is_clamped_at_the_end() {
        assert_eq!(
            compute_window(19, 20, 5),
            vec![Page(1), Ellipsis, Page(17), Page(18), Page(19), Page(20)]
        );
        assert_eq!(
            compute_window(20, 20, 5),
            vec![Page(1), Ellipsis, Page(17), Page(18), Page(19), Page(20)]
        );
    }

    #[test]
    fn even_block_leans_right() {
        assert_eq!(
            compute_window(5, 10, 4),
            vec![Page(1), Ellipsis, Page(5), Page(6), Ellipsis, Page(10)]
        );
    }

    #[test]
    fn tiny_windows_keep_the_anchors() {
        assert_eq!(compute_window(3, 5, 1), vec![Page(1), Ellipsis, Page(5)]);
        assert_eq!(compute_window(1, 2, 1), vec![Page(1), Page(2)]);
        assert_eq!(compute_window(4, 9, 2), vec![Page(1), Ellipsis, Page(9)]);
        assert_eq!(compute_window(2, 3, 0), vec![Page(1), Ellipsis, Page(3)]);
    }

    #[test]
    fn out_of_range_current_page_is_clamped() {
        assert_eq!(compute_window(0, 20, 5), compute_window(1, 20, 5));
        assert_eq!(compute_window(99, 20, 5), compute_window(20, 20, 5));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 4), 0);
        assert_eq!(total_pages(1, 4), 1);
        assert_eq!(total_pages(8, 4), 2);
        assert_eq!(total_pages(9, 4), 3);
        assert_eq!(total_pages(9, 0), 0);
    }

    #[test]
    fn clicking_the_active_page_is_a_no_op() {
        let control = PaginationControl::new(3, 10, 4);
        let mut calls = Vec::new();
        assert!(!control.on_page_change(3, |page| calls.push(page)));
        assert_eq!(control.click(Page(3)), None);
        assert!(calls.is_empty());
    }

    #[test]
    fn page_change_requests_are_filtered() {
        let control = PaginationControl::new(5, 10, 4);
        assert_eq!(control.request(6), Some(6));
        assert_eq!(control.request(0), None);
        assert_eq!(control.request(11), None);
        assert_eq!(control.click(Ellipsis), None);
        assert_eq!(control.prev(), Some(4));
        assert_eq!(control.next(), Some(6));

        let mut calls = Vec::new();
        assert!(control.on_page_change(2, |page| calls.push(page)));
        assert_eq!(calls, vec![2]);

        let busy = control.loading(true);
        assert_eq!(busy.request(6), None);
        assert_eq!(busy.next(), None);
        assert!(busy.prev_disabled());
        assert!(busy.next_disabled());
    }

    #[test]
    fn prev_and_next_are_disabled_at_the_edges() {
        let first = PaginationControl::new(1, 10, 4);
        assert!(first.prev_disabled());
        assert!(!first.next_disabled());
        assert_eq!(first.prev(), None);

        let last = PaginationControl::new(10, 10, 4);
        assert!(last.next_disabled());
        assert!(!last.prev_disabled());
        assert_eq!(last.next(), None);
    }

    #[test]
    fn display_renders_the_window() {
        let control = PaginationControl::new(10, 20, 5);
        assert_eq!(control.to_string(), "‹ 1 … 9 [10] 11 … 20 ›");
        let first = PaginationControl::new(1, 3, 5);
        assert_eq!(first.to_string(), "  [1] 2 3 ›");
    }

    proptest! {
        #[test]
        fn fitting_windows_have_no_ellipsis(total in 0u32..50, extra in 0u32..50, current in 0u32..60) {
            let max_visible = (total + extra).max(1);
            let tokens = compute_window(current, total, max_visible);
            prop_assert_eq!(pages(&tokens), (1..=total).collect::<Vec<_>>());
            prop_assert_eq!(ellipses(&tokens), 0);
        }

        #[test]
        fn overflowing_windows_are_anchored_and_increasing(
            max_visible in 1u32..12,
            extra in 1u32..200,
            current in 0u32..260,
        ) {
            let total = max_visible + extra;
            let tokens = compute_window(current, total, max_visible);
            let numbers = pages(&tokens);

            prop_assert_eq!(tokens.first(), Some(&Page(1)));
            prop_assert_eq!(tokens.last(), Some(&Page(total)));
            prop_assert!(numbers.windows(2).all(|pair| pair[0] < pair[1]));
            prop_assert!(tokens.windows(2).all(|pair| !(pair[0] == Ellipsis && pair[1] == Ellipsis)));
            prop_assert!(numbers.len() as u32 <= max_visible.max(2));

            // Numbers with no ellipsis between them are consecutive.
            let mut previous = None;
            for token in &tokens {
                if let (Some(Page(a)), Page(b)) = (previous, token) {
                    prop_assert_eq!(a + 1, *b);
                }
                previous = Some(*token);
            }

            let clamped = current.clamp(1, total);
            if max_visible >= 3 {
                prop_assert!(numbers.contains(&clamped));
            }
        }

        #[test]
        fn window_is_deterministic(current in 0u32..100, total in 0u32..100, max_visible in 0u32..10) {
            prop_assert_eq!(
                compute_window(current, total, max_visible),
                compute_window(current, total, max_visible)
            );
        }
    }
}
