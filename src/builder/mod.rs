//! Declarative front end.
//!
//! Every configuration call is queued with an [`ActionTier`]; `build()` runs
//! the queue tier by tier and hands the result to an [`Engine`]. Calls made
//! while their own tier is draining (a page declaring a child page) run on
//! the spot.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use crate::error::{ConfigError, FrameError, HandlerResult, Result};
use crate::logging::{BUILDER_TARGET, LogLevel, json_kv, json_str};
use crate::model::{Item, PageId, Setting};
use crate::page::{PageRegistry, PageSnapshot, Placement};
use crate::router::{Engine, EngineConfig, EventContext, GlobalHandlers, Handler, handler};

mod navigation;
mod scheduler;

pub use navigation::Navigation;
pub use scheduler::ActionTier;

use scheduler::{Action, ActionQueue};

/// Visibility predicate evaluated when the queued item action runs.
pub type Condition = Arc<dyn Fn() -> bool + Send + Sync>;

/// An item together with its optional click handler and visibility condition.
#[derive(Clone)]
pub struct ItemEntry {
    item: Item,
    visible: Option<Condition>,
    on_click: Option<Handler>,
}

impl ItemEntry {
    pub fn new(item: Item) -> Self {
        Self {
            item,
            visible: None,
            on_click: None,
        }
    }

    pub fn on_click<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut EventContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.on_click = Some(handler(f));
        self
    }

    pub fn with_handler(mut self, handler: Handler) -> Self {
        self.on_click = Some(handler);
        self
    }

    pub fn visible_if<F>(mut self, condition: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.visible = Some(Arc::new(condition));
        self
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn is_visible(&self) -> bool {
        self.visible.as_ref().is_none_or(|condition| (condition.as_ref())())
    }
}

impl From<Item> for ItemEntry {
    fn from(item: Item) -> Self {
        Self::new(item)
    }
}

/// Id, rows and title of a declared page; unset fields inherit from the GUI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSpec {
    id: Option<PageId>,
    rows: Option<u8>,
    title: Option<String>,
}

impl PageSpec {
    /// Id assigned when the page is created: one past the highest id.
    pub fn auto() -> Self {
        Self::default()
    }

    pub fn with_id(id: PageId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn rows(mut self, rows: u8) -> Self {
        self.rows = Some(rows);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn resolve(&self, base: &Setting) -> Setting {
        Setting {
            rows: self.rows.unwrap_or(base.rows),
            title: self.title.clone().unwrap_or_else(|| base.title.clone()),
            small_caps: base.small_caps,
        }
    }
}

type PageBody = Box<dyn FnOnce(&mut PageBuilder<'_>) -> Result<()>>;

/// Top-level GUI description.
pub struct GuiBuilder {
    setting: Setting,
    registry: PageRegistry,
    globals: GlobalHandlers,
    queue: ActionQueue,
    navigation: Option<Navigation>,
    config: EngineConfig,
    pending_error: Option<FrameError>,
}

impl GuiBuilder {
    pub fn new(setting: Setting) -> Self {
        let pending_error = setting.validate().err().map(FrameError::from);
        Self {
            registry: PageRegistry::new(setting.clone()),
            setting,
            globals: GlobalHandlers::default(),
            queue: ActionQueue::default(),
            navigation: None,
            config: EngineConfig::default(),
            pending_error,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn setting(&self) -> &Setting {
        &self.setting
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Tier currently draining inside `build()`, if any.
    pub fn executing(&self) -> Option<ActionTier> {
        self.queue.executing()
    }

    pub fn on_open<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut EventContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let h = handler(f);
        self.schedule_or_hold(ActionTier::GlobalEvent, "on_open", move |gui| {
            gui.globals.open = Some(h);
            Ok(())
        })
    }

    pub fn on_close<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut EventContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let h = handler(f);
        self.schedule_or_hold(ActionTier::GlobalEvent, "on_close", move |gui| {
            gui.globals.close = Some(h);
            Ok(())
        })
    }

    pub fn on_click<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut EventContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let h = handler(f);
        self.schedule_or_hold(ActionTier::GlobalEvent, "on_click", move |gui| {
            gui.globals.click = Some(h);
            Ok(())
        })
    }

    /// Open handler for every page, including overflow pages created later.
    pub fn on_page_open<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut EventContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let h = handler(f);
        self.schedule_or_hold(ActionTier::PageEvent, "on_page_open", move |gui| {
            for id in gui.registry.page_ids() {
                gui.registry.page_mut(id)?.set_open_handler(h.clone());
            }
            gui.globals.page_open = Some(h);
            Ok(())
        })
    }

    /// Close handler for every page, including overflow pages created later.
    pub fn on_page_close<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut EventContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let h = handler(f);
        self.schedule_or_hold(ActionTier::PageEvent, "on_page_close", move |gui| {
            for id in gui.registry.page_ids() {
                gui.registry.page_mut(id)?.set_close_handler(h.clone());
            }
            gui.globals.page_close = Some(h);
            Ok(())
        })
    }

    pub fn add_page<F>(&mut self, spec: PageSpec, body: F) -> &mut Self
    where
        F: FnOnce(&mut PageBuilder<'_>) -> Result<()> + 'static,
    {
        let body: PageBody = Box::new(body);
        self.schedule_or_hold(ActionTier::PageManagement, "add_page", move |gui| {
            gui.declare_page(spec, body)
        })
    }

    /// Automatic placement on the shared page.
    pub fn add_item(&mut self, entry: impl Into<ItemEntry>) -> &mut Self {
        let entry = entry.into();
        self.schedule_or_hold(ActionTier::GlobalItems, "add_item", move |gui| {
            gui.place_shared(entry).map(|_| ())
        })
    }

    pub fn add_items<F>(&mut self, items: Vec<Item>, on_click: F) -> &mut Self
    where
        F: Fn(&Item, &mut EventContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let on_click = Arc::new(on_click);
        self.schedule_or_hold(ActionTier::GlobalItems, "add_items", move |gui| {
            for entry in entries_with_shared_handler(items, on_click) {
                gui.place_shared(entry)?;
            }
            Ok(())
        })
    }

    /// Runs `body` while shared items are being placed; `add_item` calls it
    /// makes execute immediately.
    pub fn shared_items<F>(&mut self, body: F) -> &mut Self
    where
        F: FnOnce(&mut GuiBuilder) -> Result<()> + 'static,
    {
        self.schedule_or_hold(ActionTier::GlobalItems, "shared_items", body)
    }

    /// Explicit slot on the shared page. Excluded from compaction.
    pub fn set_item(&mut self, entry: impl Into<ItemEntry>, slot: u16) -> &mut Self {
        self.set_items(entry, vec![slot])
    }

    pub fn set_items(&mut self, entry: impl Into<ItemEntry>, slots: Vec<u16>) -> &mut Self {
        let entry = entry.into();
        self.schedule_or_hold(ActionTier::GlobalItems, "set_item", move |gui| {
            if !entry.is_visible() {
                return Ok(());
            }
            for slot in slots {
                gui.registry.set_item(
                    PageId::SHARED,
                    slot,
                    entry.item.clone(),
                    entry.on_click.clone(),
                )?;
            }
            Ok(())
        })
    }

    /// Rebuilds persisted contents as explicit shared-page items.
    pub fn load_snapshot(&mut self, snapshot: &PageSnapshot) -> &mut Self {
        for (slot, item) in &snapshot.slots {
            self.set_item(item.clone(), *slot);
        }
        self
    }

    /// Previous/next travel items. Reserves their slots right away so
    /// automatic placement never lands on them.
    pub fn nav(&mut self, navigation: Navigation) -> &mut Self {
        navigation.reserve(self.registry.reservation_mut());
        self.schedule_or_hold(ActionTier::Navigation, "nav", move |gui| {
            navigation.install(&mut gui.registry)?;
            gui.navigation = Some(navigation);
            Ok(())
        })
    }

    /// Extra slots automatic placement must skip on every page.
    pub fn reserve_slots(&mut self, slots: &[u16]) -> &mut Self {
        let reservation = self.registry.reservation_mut();
        for slot in slots {
            reservation.reserve(*slot);
        }
        self
    }

    pub fn build(mut self) -> Result<Engine> {
        if let Some(err) = self.pending_error.take() {
            return Err(err);
        }

        while let Some(action) = self.queue.pop_next() {
            self.queue.set_executing(Some(action.tier));
            let outcome = (action.run)(&mut self);
            self.queue.set_executing(None);
            outcome?;
            if let Some(err) = self.pending_error.take() {
                return Err(err);
            }
            self.trace("action_executed", action.tier, action.label);
        }

        let created = self.registry.take_created();
        self.config.record(|m| m.record_pages_created(created.len()));
        self.config.emit(
            LogLevel::Info,
            BUILDER_TARGET,
            "gui_built",
            [
                json_kv("pages", self.registry.len()),
                json_kv(
                    "page_ids",
                    json!(self.registry.page_ids().iter().map(|p| p.0).collect::<Vec<_>>()),
                ),
            ],
        );
        Ok(Engine::from_parts(
            self.registry,
            self.globals,
            self.navigation,
            self.config,
        ))
    }

    fn schedule(&mut self, tier: ActionTier, label: &'static str, action: Action) -> Result<()> {
        if self.queue.runs_immediately(tier) {
            self.trace("action_immediate", tier, label);
            return action(self);
        }
        self.trace("action_queued", tier, label);
        self.queue.push(tier, label, action);
        Ok(())
    }

    fn schedule_or_hold<F>(&mut self, tier: ActionTier, label: &'static str, f: F) -> &mut Self
    where
        F: FnOnce(&mut GuiBuilder) -> Result<()> + 'static,
    {
        if let Err(err) = self.schedule(tier, label, Box::new(f)) {
            self.pending_error.get_or_insert(err);
        }
        self
    }

    fn declare_page(&mut self, spec: PageSpec, body: PageBody) -> Result<()> {
        let id = spec.id.unwrap_or_else(|| self.registry.next_auto_id());
        let setting = spec.resolve(&self.setting);
        self.registry.create_page(id, setting)?;
        if self.config.debug {
            self.config.emit(
                LogLevel::Debug,
                BUILDER_TARGET,
                "page_declared",
                [json_kv("page", id.0)],
            );
        }
        let mut page = PageBuilder { gui: self, page: id };
        body(&mut page)
    }

    fn place_shared(&mut self, entry: ItemEntry) -> Result<Option<Placement>> {
        if !entry.is_visible() {
            return Ok(None);
        }
        let placement = self
            .registry
            .allocate(PageId::SHARED, entry.item, entry.on_click)?;
        Ok(Some(placement))
    }

    fn trace(&self, message: &str, tier: ActionTier, label: &str) {
        if self.config.debug {
            self.config.emit(
                LogLevel::Debug,
                BUILDER_TARGET,
                message,
                [json_str("tier", tier.as_str()), json_str("action", label)],
            );
        }
    }
}

fn entries_with_shared_handler<F>(items: Vec<Item>, on_click: Arc<F>) -> Vec<ItemEntry>
where
    F: Fn(&Item, &mut EventContext<'_>) -> HandlerResult + Send + Sync + 'static,
{
    items
        .into_iter()
        .map(|item| {
            let on_click = Arc::clone(&on_click);
            let captured = item.clone();
            ItemEntry::new(item).on_click(move |ctx| (on_click.as_ref())(&captured, ctx))
        })
        .collect()
}

/// Handle a page body uses to fill its page.
pub struct PageBuilder<'b> {
    gui: &'b mut GuiBuilder,
    page: PageId,
}

impl PageBuilder<'_> {
    pub fn id(&self) -> PageId {
        self.page
    }

    /// Automatic placement; overflows into new pages when this one is full.
    /// Returns `None` when the entry's condition hides it.
    pub fn add_item(&mut self, entry: impl Into<ItemEntry>) -> Result<Option<Placement>> {
        let entry = entry.into();
        if !entry.is_visible() {
            return Ok(None);
        }
        let placement = self
            .gui
            .registry
            .allocate(self.page, entry.item, entry.on_click)?;
        Ok(Some(placement))
    }

    pub fn add_items<F>(&mut self, items: Vec<Item>, on_click: F) -> Result<Vec<Placement>>
    where
        F: Fn(&Item, &mut EventContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let mut placements = Vec::with_capacity(items.len());
        for entry in entries_with_shared_handler(items, Arc::new(on_click)) {
            placements.extend(self.add_item(entry)?);
        }
        Ok(placements)
    }

    pub fn set_item(&mut self, entry: impl Into<ItemEntry>, slot: u16) -> Result<()> {
        self.set_items(entry, &[slot])
    }

    pub fn set_items(&mut self, entry: impl Into<ItemEntry>, slots: &[u16]) -> Result<()> {
        let entry = entry.into();
        if !entry.is_visible() {
            return Ok(());
        }
        for slot in slots {
            self.gui.registry.set_item(
                self.page,
                *slot,
                entry.item.clone(),
                entry.on_click.clone(),
            )?;
        }
        Ok(())
    }

    pub fn remove(&mut self, slot: u16) -> Result<()> {
        self.gui.registry.remove(self.page, slot)?;
        Ok(())
    }

    pub fn remove_slots(&mut self, slots: &[u16]) -> Result<()> {
        self.gui.registry.remove_slots(self.page, slots)?;
        Ok(())
    }

    pub fn remove_item(&mut self, item: &Item) -> Result<()> {
        self.gui.registry.remove_item(self.page, item)?;
        Ok(())
    }

    pub fn on_open<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(&mut EventContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.gui.registry.page_mut(self.page)?.set_open_handler(handler(f));
        Ok(())
    }

    pub fn on_close<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(&mut EventContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.gui.registry.page_mut(self.page)?.set_close_handler(handler(f));
        Ok(())
    }

    pub fn on_click<F>(&mut self, f: F) -> Result<()>
    where
        F: Fn(&mut EventContext<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.gui.registry.page_mut(self.page)?.set_click_handler(handler(f));
        Ok(())
    }

    /// Declares a child page. Runs immediately since page declarations are
    /// already draining.
    pub fn add_page<F>(&mut self, spec: PageSpec, body: F) -> Result<()>
    where
        F: FnOnce(&mut PageBuilder<'_>) -> Result<()> + 'static,
    {
        let body: PageBody = Box::new(body);
        self.gui.schedule(
            ActionTier::PageManagement,
            "add_page",
            Box::new(move |gui: &mut GuiBuilder| gui.declare_page(spec, body)),
        )
    }

    /// Navigation spans the whole GUI and cannot be declared from a page.
    pub fn nav(&mut self, _navigation: Navigation) -> Result<()> {
        Err(ConfigError::NestedNavigation.into())
    }

    pub fn items(&self) -> BTreeMap<u16, Item> {
        self.gui
            .registry
            .page(self.page)
            .map(|p| p.items().clone())
            .unwrap_or_default()
    }
}
