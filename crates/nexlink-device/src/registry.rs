//! Pages and widgets hooked on a panel.
//!
//! Pages are looked up by unique name or optional unique ID, widgets likewise
//! within their page. Both key types resolve into the same index, so a
//! [`PageRef`] or [`WidgetRef`] is stable for the life of the registry.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::debug;

use crate::command::PageTarget;
use crate::error::RegistryError;
use crate::widget::{Widget, WidgetKind};

/// Index of a hooked page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageRef(usize);

/// Index of a hooked widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetRef {
    page: PageRef,
    index: usize,
}

impl WidgetRef {
    /// Page the widget lives on.
    pub fn page(self) -> PageRef {
        self.page
    }
}

/// A page or widget lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'a> {
    Name(&'a str),
    Id(u8),
}

impl<'a> From<&'a str> for Key<'a> {
    fn from(name: &'a str) -> Self {
        Key::Name(name)
    }
}

impl<'a> From<&'a String> for Key<'a> {
    fn from(name: &'a String) -> Self {
        Key::Name(name)
    }
}

impl From<u8> for Key<'_> {
    fn from(id: u8) -> Self {
        Key::Id(id)
    }
}

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => write!(f, "{:?}", name),
            Key::Id(id) => write!(f, "#{}", id),
        }
    }
}

/// A hooked page and its widgets.
#[derive(Debug, Clone)]
pub struct Page {
    name: String,
    id: Option<u8>,
    widgets: Vec<Widget>,
    by_name: HashMap<String, usize>,
    by_id: BTreeMap<u8, usize>,
    switch_in_progress: bool,
}

impl Page {
    fn new(name: &str, id: Option<u8>) -> Self {
        Self {
            name: name.to_string(),
            id,
            widgets: Vec::new(),
            by_name: HashMap::new(),
            by_id: BTreeMap::new(),
            switch_in_progress: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<u8> {
        self.id
    }

    /// Target used by the `page` instruction: the ID if known, else the name.
    pub fn target(&self) -> PageTarget {
        match self.id {
            Some(id) => PageTarget::Id(id),
            None => PageTarget::Name(self.name.clone()),
        }
    }

    /// Widgets in hook order.
    pub fn widgets(&self) -> impl Iterator<Item = &Widget> {
        self.widgets.iter()
    }

    /// Whether a `page` instruction for this page is still outstanding.
    pub fn switch_in_progress(&self) -> bool {
        self.switch_in_progress
    }

    pub(crate) fn set_switch_in_progress(&mut self, in_progress: bool) {
        self.switch_in_progress = in_progress;
    }

    fn find(&self, key: Key<'_>) -> Option<usize> {
        match key {
            Key::Name(name) => self.by_name.get(name).copied(),
            Key::Id(id) => self.by_id.get(&id).copied(),
        }
    }
}

/// All hooked pages.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pages: Vec<Page>,
    by_name: HashMap<String, PageRef>,
    by_id: BTreeMap<u8, PageRef>,
    qualified_names: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address widgets as `page.widget` instead of the bare name.
    pub fn with_qualified_names(mut self, qualified: bool) -> Self {
        self.qualified_names = qualified;
        self
    }

    /// Hook a page. Fails without changes if the name or ID is taken.
    pub fn hook_page(&mut self, name: &str, id: Option<u8>) -> Result<PageRef, RegistryError> {
        if self.by_name.contains_key(name) {
            return Err(RegistryError::DuplicatePageName(name.to_string()));
        }
        if let Some(id) = id {
            if self.by_id.contains_key(&id) {
                return Err(RegistryError::DuplicatePageId(id));
            }
        }

        let page = PageRef(self.pages.len());
        self.pages.push(Page::new(name, id));
        self.by_name.insert(name.to_string(), page);
        if let Some(id) = id {
            self.by_id.insert(id, page);
        }
        debug!(page = name, ?id, "Hooked page");
        Ok(page)
    }

    /// Hook a widget on a page. Fails without changes if the name or ID is
    /// taken on that page.
    pub fn hook_widget(
        &mut self,
        page: PageRef,
        kind: WidgetKind,
        name: &str,
        id: Option<u8>,
    ) -> Result<WidgetRef, RegistryError> {
        let qualified = self.qualified_names;
        let entry = self
            .pages
            .get_mut(page.0)
            .ok_or_else(|| RegistryError::UnknownPage(format!("{:?}", page)))?;

        if entry.by_name.contains_key(name) {
            return Err(RegistryError::DuplicateWidgetName {
                page: entry.name.clone(),
                name: name.to_string(),
            });
        }
        if let Some(id) = id {
            if entry.by_id.contains_key(&id) {
                return Err(RegistryError::DuplicateWidgetId {
                    page: entry.name.clone(),
                    id,
                });
            }
        }

        let oid = if qualified {
            format!("{}.{}", entry.name, name)
        } else {
            name.to_string()
        };
        let index = entry.widgets.len();
        entry.widgets.push(Widget::new(kind, name, id, oid));
        entry.by_name.insert(name.to_string(), index);
        if let Some(id) = id {
            entry.by_id.insert(id, index);
        }
        debug!(page = %entry.name, widget = name, %kind, ?id, "Hooked widget");
        Ok(WidgetRef { page, index })
    }

    /// Resolve a page by name or ID.
    pub fn find_page<'a>(&self, key: impl Into<Key<'a>>) -> Result<PageRef, RegistryError> {
        let key = key.into();
        let found = match key {
            Key::Name(name) => self.by_name.get(name),
            Key::Id(id) => self.by_id.get(&id),
        };
        found.copied().ok_or_else(|| RegistryError::UnknownPage(key.to_string()))
    }

    /// Resolve a widget on a page by name or ID.
    pub fn find_widget<'a>(&self, page: PageRef, key: impl Into<Key<'a>>) -> Result<WidgetRef, RegistryError> {
        let key = key.into();
        let entry = self
            .pages
            .get(page.0)
            .ok_or_else(|| RegistryError::UnknownPage(format!("{:?}", page)))?;
        entry
            .find(key)
            .map(|index| WidgetRef { page, index })
            .ok_or_else(|| RegistryError::UnknownWidget {
                page: entry.name.clone(),
                key: key.to_string(),
            })
    }

    /// Resolve the target of a touch frame.
    pub fn touch_target(&self, page_id: u8, widget_id: u8) -> Option<WidgetRef> {
        let page = self.find_page(page_id).ok()?;
        self.find_widget(page, widget_id).ok()
    }

    pub fn page(&self, page: PageRef) -> &Page {
        &self.pages[page.0]
    }

    pub(crate) fn page_mut(&mut self, page: PageRef) -> &mut Page {
        &mut self.pages[page.0]
    }

    pub fn widget(&self, widget: WidgetRef) -> &Widget {
        &self.pages[widget.page.0].widgets[widget.index]
    }

    /// Mutable access to a widget, e.g. to configure its refresh properties.
    pub fn widget_mut(&mut self, widget: WidgetRef) -> &mut Widget {
        &mut self.pages[widget.page.0].widgets[widget.index]
    }

    /// References to every widget on a page, in hook order.
    pub fn widget_refs(&self, page: PageRef) -> impl Iterator<Item = WidgetRef> {
        (0..self.pages[page.0].widgets.len()).map(move |index| WidgetRef { page, index })
    }

    /// Pages with an ID, in ascending ID order.
    pub fn pages_by_id(&self) -> impl Iterator<Item = (u8, PageRef)> + '_ {
        self.by_id.iter().map(|(id, page)| (*id, *page))
    }

    /// All pages in hook order.
    pub fn pages(&self) -> impl Iterator<Item = (PageRef, &Page)> {
        self.pages.iter().enumerate().map(|(i, page)| (PageRef(i), page))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_and_lookup() {
        let mut registry = Registry::new();
        let main = registry.hook_page("main", Some(0)).unwrap();
        let t0 = registry.hook_widget(main, WidgetKind::Text, "t0", Some(1)).unwrap();

        assert_eq!(registry.find_page("main").unwrap(), main);
        assert_eq!(registry.find_page(0u8).unwrap(), main);
        assert_eq!(registry.find_widget(main, "t0").unwrap(), t0);
        assert_eq!(registry.find_widget(main, 1u8).unwrap(), t0);
        assert_eq!(registry.touch_target(0, 1), Some(t0));
        assert_eq!(registry.touch_target(0, 9), None);
        assert_eq!(registry.widget(t0).oid(), "t0");
    }

    #[test]
    fn test_duplicate_page() {
        let mut registry = Registry::new();
        registry.hook_page("main", Some(0)).unwrap();

        assert_eq!(
            registry.hook_page("main", Some(1)).unwrap_err(),
            RegistryError::DuplicatePageName("main".into())
        );
        assert_eq!(
            registry.hook_page("other", Some(0)).unwrap_err(),
            RegistryError::DuplicatePageId(0)
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.find_page("other").is_err());
        assert!(registry.find_page(1u8).is_err());
    }

    #[test]
    fn test_duplicate_widget() {
        let mut registry = Registry::new();
        let main = registry.hook_page("main", Some(0)).unwrap();
        registry.hook_widget(main, WidgetKind::Button, "b0", Some(1)).unwrap();

        let err = registry.hook_widget(main, WidgetKind::Text, "b0", Some(2)).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateWidgetName { .. }));
        let err = registry.hook_widget(main, WidgetKind::Text, "t0", Some(1)).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateWidgetId { id: 1, .. }));

        assert_eq!(registry.page(main).widgets().count(), 1);
        assert!(registry.find_widget(main, 2u8).is_err());
        assert!(registry.find_widget(main, "t0").is_err());
    }

    #[test]
    fn test_pages_without_id() {
        let mut registry = Registry::new();
        registry.hook_page("popup", None).unwrap();
        registry.hook_page("other", None).unwrap();
        let popup = registry.find_page("popup").unwrap();
        assert_eq!(registry.page(popup).target(), PageTarget::Name("popup".into()));
        assert_eq!(registry.pages_by_id().count(), 0);
    }

    #[test]
    fn test_pages_by_id_ascending() {
        let mut registry = Registry::new();
        registry.hook_page("settings", Some(2)).unwrap();
        registry.hook_page("main", Some(0)).unwrap();
        registry.hook_page("status", Some(1)).unwrap();

        let ids: Vec<u8> = registry.pages_by_id().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_qualified_names() {
        let mut registry = Registry::new().with_qualified_names(true);
        let main = registry.hook_page("main", Some(0)).unwrap();
        let t0 = registry.hook_widget(main, WidgetKind::Text, "t0", None).unwrap();
        assert_eq!(registry.widget(t0).oid(), "main.t0");
    }

    #[test]
    fn test_unknown_widget_error() {
        let mut registry = Registry::new();
        let main = registry.hook_page("main", Some(0)).unwrap();
        let err = registry.find_widget(main, 7u8).unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownWidget {
                page: "main".into(),
                key: "#7".into()
            }
        );
    }
}
