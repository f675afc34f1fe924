use super::filter::{FilterError, Filterable, ListFilter};
use super::paginated::PaginatedList;

/// Filtered, paginated view over an in-memory collection
///
/// The page is recomputed whenever the items or a filter change. Any filter
/// change returns to page 1; replacing the items keeps the position when
/// it is still valid.
#[derive(Debug, Clone)]
pub struct ListView<T> {
    all: Vec<T>,
    filter: ListFilter,
    pages: PaginatedList<T>,
}

impl<T: Filterable + Clone> ListView<T> {
    pub fn new(page_size: usize) -> Self {
        Self {
            all: Vec::new(),
            filter: ListFilter::new(),
            pages: PaginatedList::new(page_size),
        }
    }

    /// Replace the source items (e.g. after a refresh)
    pub fn set_items(&mut self, items: Vec<T>) {
        self.all = items;
        self.pages.replace_items(self.filter.apply(&self.all));
    }

    fn refilter(&mut self) {
        self.pages.set_items(self.filter.apply(&self.all));
    }

    pub fn set_search(&mut self, text: &str) {
        self.filter.set_search(text);
        self.refilter();
    }

    pub fn set_equals(&mut self, key: &str, value: Option<&str>) {
        self.filter.set_equals(key, value);
        self.refilter();
    }

    pub fn set_flag(&mut self, key: &str, value: Option<bool>) {
        self.filter.set_flag(key, value);
        self.refilter();
    }

    /// Apply a `key=value` filter assignment
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<(), FilterError> {
        self.filter.apply_assignment::<T>(assignment)?;
        self.refilter();
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        self.filter.clear();
        self.refilter();
    }

    pub fn filter(&self) -> &ListFilter {
        &self.filter
    }

    /// Every source item, unfiltered
    pub fn all_items(&self) -> &[T] {
        &self.all
    }

    /// Items that pass the filter
    pub fn filtered(&self) -> &[T] {
        self.pages.items()
    }

    /// Items on the current page
    pub fn visible(&self) -> &[T] {
        self.pages.current_page_items()
    }

    pub fn pages(&self) -> &PaginatedList<T> {
        &self.pages
    }

    pub fn pages_mut(&mut self) -> &mut PaginatedList<T> {
        &mut self.pages
    }

    pub fn current_page(&self) -> usize {
        self.pages.current_page()
    }

    pub fn total_pages(&self) -> usize {
        self.pages.total_pages()
    }

    pub fn selected(&self) -> Option<&T> {
        self.pages.selected_item()
    }

    /// True when the source has items but none pass the filter
    pub fn is_filtered_empty(&self) -> bool {
        !self.all.is_empty() && self.pages.is_empty()
    }

    pub fn footer_text(&self) -> String {
        if self.filter.is_empty() {
            self.pages.footer_text()
        } else {
            format!(
                "{}  ({} of {} shown)",
                self.pages.footer_text(),
                self.pages.len(),
                self.all.len()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::resources::Rol;

    fn rol(id: i64, nombre: &str, activo: bool, usuarios: u32) -> Rol {
        Rol {
            id: Some(id),
            nombre: nombre.to_string(),
            activo,
            cantidad_usuarios: usuarios,
            ..Rol::default()
        }
    }

    fn view() -> ListView<Rol> {
        let mut view = ListView::new(4);
        view.set_items(vec![
            rol(1, "Administrador", true, 3),
            rol(2, "Técnico campo", true, 5),
            rol(3, "Técnico soporte", false, 0),
            rol(4, "Ventas", true, 0),
            rol(5, "Almacén", true, 1),
            rol(6, "Auditor", false, 0),
        ]);
        view
    }

    #[test]
    fn test_pagination_over_all_items() {
        let mut view = view();
        assert_eq!(view.total_pages(), 2);
        assert_eq!(view.visible().len(), 4);
        view.pages_mut().next_page();
        assert_eq!(view.visible().len(), 2);
        assert_eq!(view.footer_text(), "Page 2/2");
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut view = view();
        view.pages_mut().next_page();
        assert_eq!(view.current_page(), 2);

        view.set_flag("activo", Some(true));
        assert_eq!(view.current_page(), 1);
        assert_eq!(view.filtered().len(), 4);
    }

    #[test]
    fn test_search_and_flag_combine() {
        let mut view = view();
        view.set_search("técnico");
        view.set_flag("activo", Some(true));
        let ids: Vec<_> = view.visible().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![Some(2)]);
        assert_eq!(view.footer_text(), "1 items  (1 of 6 shown)");
    }

    #[test]
    fn test_empty_result_is_not_an_error() {
        let mut view = view();
        view.set_search("nadie");
        assert!(view.visible().is_empty());
        assert!(view.is_filtered_empty());
        assert!(view.selected().is_none());
    }

    #[test]
    fn test_refresh_keeps_filter() {
        let mut view = view();
        view.apply_assignment("con_usuarios=false").unwrap();
        assert_eq!(view.filtered().len(), 3);

        let mut items = view.all_items().to_vec();
        items.push(rol(7, "Nuevo", true, 0));
        view.set_items(items);
        assert_eq!(view.filtered().len(), 4);
    }
}
