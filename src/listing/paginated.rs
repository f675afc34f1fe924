//! Paginated list state with a selection cursor
//!
//! Holds already-filtered items; page and selection are 0-indexed
//! internally and 1-indexed for display.

/// A paginated list that can display items across multiple pages
#[derive(Debug, Clone)]
pub struct PaginatedList<T> {
    /// All items in the list
    items: Vec<T>,
    /// Current page (0-indexed)
    page: usize,
    /// Number of items per page
    page_size: usize,
    /// Currently selected index within the current page
    selected: usize,
}

impl<T> Default for PaginatedList<T> {
    fn default() -> Self {
        Self::new(4)
    }
}

impl<T> PaginatedList<T> {
    /// Create a new paginated list with the given page size (minimum 1)
    pub fn new(page_size: usize) -> Self {
        Self {
            items: Vec::new(),
            page: 0,
            page_size: page_size.max(1),
            selected: 0,
        }
    }

    /// Replace the items and go back to the first page
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.page = 0;
        self.selected = 0;
    }

    /// Replace the items, keeping the page and selection where still valid
    pub fn replace_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.page = self.page.min(self.total_pages() - 1);
        let on_page = self.current_page_items().len();
        self.selected = self.selected.min(on_page.saturating_sub(1));
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Get the total number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the total number of pages (an empty list has one empty page)
    pub fn total_pages(&self) -> usize {
        if self.items.is_empty() {
            1
        } else {
            self.items.len().div_ceil(self.page_size)
        }
    }

    /// Get the current page number (1-indexed for display)
    pub fn current_page(&self) -> usize {
        self.page + 1
    }

    /// Jump to a 1-indexed page, clamped to the valid range
    pub fn go_to_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.total_pages()) - 1;
        self.selected = 0;
    }

    /// Get the items on the current page
    pub fn current_page_items(&self) -> &[T] {
        let start = self.page * self.page_size;
        let end = (start + self.page_size).min(self.items.len());
        if start >= self.items.len() {
            &[]
        } else {
            &self.items[start..end]
        }
    }

    /// Selection index within the current page
    pub fn selected_in_page(&self) -> usize {
        self.selected
    }

    /// Get the currently selected item
    pub fn selected_item(&self) -> Option<&T> {
        self.items.get(self.selected_index())
    }

    /// Get the global index of the selected item
    pub fn selected_index(&self) -> usize {
        self.page * self.page_size + self.selected
    }

    /// Move selection to the next item, crossing pages and wrapping at the end
    pub fn select_next(&mut self) {
        let page_items = self.current_page_items().len();
        if page_items == 0 {
            return;
        }

        if self.selected + 1 < page_items {
            self.selected += 1;
        } else if self.page + 1 < self.total_pages() {
            self.page += 1;
            self.selected = 0;
        } else {
            self.page = 0;
            self.selected = 0;
        }
    }

    /// Move selection to the previous item, crossing pages and wrapping at the start
    pub fn select_prev(&mut self) {
        if self.items.is_empty() {
            return;
        }

        if self.selected > 0 {
            self.selected -= 1;
        } else if self.page > 0 {
            self.page -= 1;
            self.selected = self.current_page_items().len().saturating_sub(1);
        } else {
            self.page = self.total_pages().saturating_sub(1);
            self.selected = self.current_page_items().len().saturating_sub(1);
        }
    }

    pub fn next_page(&mut self) {
        if self.page + 1 < self.total_pages() {
            self.page += 1;
            self.selected = 0;
        }
    }

    pub fn prev_page(&mut self) {
        if self.page > 0 {
            self.page -= 1;
            self.selected = 0;
        }
    }

    /// Footer text: "Page x/y" with several pages, "n items" otherwise
    pub fn footer_text(&self) -> String {
        if self.total_pages() <= 1 {
            format!("{} items", self.items.len())
        } else {
            format!("Page {}/{}", self.current_page(), self.total_pages())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginated_list_empty() {
        let list: PaginatedList<String> = PaginatedList::new(5);
        assert!(list.is_empty());
        assert_eq!(list.total_pages(), 1);
        assert!(list.selected_item().is_none());
        assert_eq!(list.footer_text(), "0 items");
    }

    #[test]
    fn test_paginated_list_multiple_pages() {
        let mut list: PaginatedList<i32> = PaginatedList::new(3);
        list.set_items(vec![1, 2, 3, 4, 5, 6, 7]);

        assert_eq!(list.total_pages(), 3);
        assert_eq!(list.current_page_items(), &[1, 2, 3]);
        assert_eq!(list.footer_text(), "Page 1/3");

        list.next_page();
        assert_eq!(list.current_page_items(), &[4, 5, 6]);

        list.next_page();
        list.next_page();
        assert_eq!(list.current_page(), 3);
        assert_eq!(list.current_page_items(), &[7]);
    }

    #[test]
    fn test_selection_crosses_pages() {
        let mut list: PaginatedList<&str> = PaginatedList::new(3);
        list.set_items(vec!["a", "b", "c", "d", "e"]);

        list.select_next();
        list.select_next();
        list.select_next();
        assert_eq!(list.current_page(), 2);
        assert_eq!(list.selected_item(), Some(&"d"));
    }

    #[test]
    fn test_wrap_around_both_directions() {
        let mut list: PaginatedList<i32> = PaginatedList::new(3);
        list.set_items(vec![1, 2, 3, 4, 5]);

        list.select_prev();
        assert_eq!(list.current_page(), 2);
        assert_eq!(list.selected_item(), Some(&5));

        list.select_next();
        assert_eq!(list.current_page(), 1);
        assert_eq!(list.selected_item(), Some(&1));
    }

    #[test]
    fn test_go_to_page_clamps() {
        let mut list: PaginatedList<i32> = PaginatedList::new(4);
        list.set_items((1..=10).collect());
        list.go_to_page(9);
        assert_eq!(list.current_page(), 3);
        assert_eq!(list.current_page_items(), &[9, 10]);
        list.go_to_page(0);
        assert_eq!(list.current_page(), 1);
    }

    #[test]
    fn test_replace_items_clamps_position() {
        let mut list: PaginatedList<i32> = PaginatedList::new(2);
        list.set_items(vec![1, 2, 3, 4, 5]);
        list.go_to_page(3);
        list.replace_items(vec![1, 2, 3]);
        assert_eq!(list.current_page(), 2);
        assert_eq!(list.selected_item(), Some(&3));
    }
}
