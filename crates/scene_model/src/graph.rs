//! Multi-page graph document

use crate::{ObserverHandle, Page, PageId, PropertyChange};
use serde_json::{json, Value};
use uuid::Uuid;

/// An ordered collection of pages with one active page. The active page is
/// the only one whose animation loop ticks; switching pages is an observable
/// graph-level event so hosts can start/stop their frame driver.
pub struct Graph {
    id: Uuid,
    pages: Vec<Page>,
    active: Option<PageId>,
    observer: Option<ObserverHandle>,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            pages: Vec::new(),
            active: None,
            observer: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Install the change observer on the graph and every current and future
    /// page, so that anything reachable from the graph reports through it.
    pub fn set_observer(&mut self, observer: ObserverHandle) {
        for page in &mut self.pages {
            page.set_observer(observer.clone());
        }
        self.observer = Some(observer);
    }

    fn emit(&self, property: &str, value: Value, pre_value: Value) {
        if let Some(observer) = &self.observer {
            observer.changed(PropertyChange::graph(self.id, property, value, pre_value));
        }
    }

    /// Add a page to the document. The first page becomes active. The page
    /// inherits the graph's observer before any of its mutations can occur.
    pub fn add_page(&mut self, mut page: Page) -> PageId {
        if let Some(observer) = &self.observer {
            page.set_observer(observer.clone());
        }
        let id = page.id();
        self.pages.push(page);
        self.emit("addPage", json!(id.to_string()), Value::Null);
        if self.active.is_none() {
            self.set_active_page(id);
        }
        id
    }

    /// Remove a page. Removing the active page activates the first remaining
    /// page, if any.
    pub fn remove_page(&mut self, id: PageId) -> Option<Page> {
        let index = self.pages.iter().position(|p| p.id() == id)?;
        let page = self.pages.remove(index);
        self.emit("removePage", json!(id.to_string()), Value::Null);
        if self.active == Some(id) {
            let next = self.pages.first().map(|p| p.id());
            self.active = None;
            if let Some(next) = next {
                self.set_active_page(next);
            } else {
                self.emit("activePage", Value::Null, json!(id.to_string()));
            }
        }
        Some(page)
    }

    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.iter().find(|p| p.id() == id)
    }

    pub fn page_mut(&mut self, id: PageId) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.id() == id)
    }

    pub fn page_ids(&self) -> Vec<PageId> {
        self.pages.iter().map(|p| p.id()).collect()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn active_page_id(&self) -> Option<PageId> {
        self.active
    }

    pub fn active_page(&self) -> Option<&Page> {
        self.active.and_then(|id| self.page(id))
    }

    pub fn active_page_mut(&mut self) -> Option<&mut Page> {
        let id = self.active?;
        self.page_mut(id)
    }

    /// Switch the active page. Returns false for unknown ids.
    pub fn set_active_page(&mut self, id: PageId) -> bool {
        if self.page(id).is_none() {
            return false;
        }
        if self.active == Some(id) {
            return true;
        }
        let pre = match self.active {
            Some(p) => json!(p.to_string()),
            None => Value::Null,
        };
        self.active = Some(id);
        self.emit("activePage", json!(id.to_string()), pre);
        true
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_becomes_active() {
        let mut graph = Graph::new();
        let p1 = graph.add_page(Page::new());
        let p2 = graph.add_page(Page::new());
        assert_eq!(graph.active_page_id(), Some(p1));
        assert!(graph.set_active_page(p2));
        assert_eq!(graph.active_page_id(), Some(p2));
    }

    #[test]
    fn test_remove_active_page_falls_back() {
        let mut graph = Graph::new();
        let p1 = graph.add_page(Page::new());
        let p2 = graph.add_page(Page::new());
        graph.remove_page(p1);
        assert_eq!(graph.active_page_id(), Some(p2));
        graph.remove_page(p2);
        assert_eq!(graph.active_page_id(), None);
    }

    #[test]
    fn test_set_active_unknown_page() {
        let mut graph = Graph::new();
        graph.add_page(Page::new());
        assert!(!graph.set_active_page(PageId::new()));
    }
}
