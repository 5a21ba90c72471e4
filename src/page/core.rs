use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{Item, PageId, Setting};
use crate::router::Handler;

/// One fixed-capacity slot grid plus its handlers.
pub struct Page {
    id: PageId,
    setting: Setting,
    title: String,
    items: BTreeMap<u16, Item>,
    click_handlers: HashMap<u16, Handler>,
    on_open: Option<Handler>,
    on_close: Option<Handler>,
    on_click: Option<Handler>,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("capacity", &self.capacity())
            .field("items", &self.items.len())
            .field("click_handlers", &self.click_handlers.len())
            .finish_non_exhaustive()
    }
}

impl Page {
    pub(crate) fn new(id: PageId, setting: Setting) -> Self {
        let title = setting.title_for(id);
        Self {
            id,
            setting,
            title,
            items: BTreeMap::new(),
            click_handlers: HashMap::new(),
            on_open: None,
            on_close: None,
            on_click: None,
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn setting(&self) -> &Setting {
        &self.setting
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn capacity(&self) -> u16 {
        self.setting.capacity()
    }

    pub fn render(&self, slot: u16) -> Option<&Item> {
        self.items.get(&slot)
    }

    pub fn is_empty_slot(&self, slot: u16) -> bool {
        !self.items.contains_key(&slot)
    }

    pub fn items(&self) -> &BTreeMap<u16, Item> {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn click_handler(&self, slot: u16) -> Option<&Handler> {
        self.click_handlers.get(&slot)
    }

    pub fn open_handler(&self) -> Option<&Handler> {
        self.on_open.as_ref()
    }

    pub fn close_handler(&self) -> Option<&Handler> {
        self.on_close.as_ref()
    }

    pub fn page_click_handler(&self) -> Option<&Handler> {
        self.on_click.as_ref()
    }

    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            page: self.id,
            rows: self.setting.rows,
            title: self.title.clone(),
            slots: self.items.clone(),
        }
    }

    pub(crate) fn check_slot(&self, slot: u16) -> Result<(), ConfigError> {
        if slot >= self.capacity() {
            return Err(ConfigError::SlotOutOfRange {
                page: self.id,
                slot,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Stores the item and replaces (or clears) the slot's click handler.
    pub(crate) fn put(&mut self, slot: u16, item: Item, handler: Option<Handler>) {
        self.items.insert(slot, item);
        match handler {
            Some(handler) => {
                self.click_handlers.insert(slot, handler);
            }
            None => {
                self.click_handlers.remove(&slot);
            }
        }
    }

    pub(crate) fn clear(&mut self, slot: u16) {
        self.items.remove(&slot);
        self.click_handlers.remove(&slot);
    }

    pub(crate) fn entry(&self, slot: u16) -> Option<(Item, Option<Handler>)> {
        let item = self.items.get(&slot)?.clone();
        Some((item, self.click_handlers.get(&slot).cloned()))
    }

    pub(crate) fn set_open_handler(&mut self, handler: Handler) {
        self.on_open = Some(handler);
    }

    pub(crate) fn set_close_handler(&mut self, handler: Handler) {
        self.on_close = Some(handler);
    }

    pub(crate) fn set_click_handler(&mut self, handler: Handler) {
        self.on_click = Some(handler);
    }

    /// Copies items and slot handlers from the shared page. One-time copy.
    pub(crate) fn seed_from(&mut self, shared: &Page) {
        for (slot, item) in &shared.items {
            if *slot < self.capacity() {
                let handler = shared.click_handlers.get(slot).cloned();
                self.put(*slot, item.clone(), handler);
            }
        }
    }
}

/// Ordered slot -> item view handed to persistence collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub page: PageId,
    pub rows: u8,
    pub title: String,
    pub slots: BTreeMap<u16, Item>,
}

impl PageSnapshot {
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(input: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Drops slots whose item repeats an earlier slot's item identity.
    pub fn deduplicated(&self) -> Self {
        let mut seen = std::collections::HashSet::new();
        let slots = self
            .slots
            .iter()
            .filter(|(_, item)| seen.insert(item.fingerprint()))
            .map(|(slot, item)| (*slot, item.clone()))
            .collect();
        Self {
            slots,
            ..self.clone()
        }
    }
}
