//! Event router: owns the pages of one built GUI, the viewer sessions, and
//! the dispatch of open/click/close notifications to handlers.

use std::collections::{BTreeSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::builder::Navigation;
use crate::error::{ConfigError, Result};
use crate::host::{Host, Notification};
use crate::logging::{
    ALLOCATOR_TARGET, LogLevel, Logger, METRICS_TARGET, ROUTER_TARGET, event_with_fields, json_kv,
    json_str,
};
use crate::metrics::{EngineMetrics, MetricSnapshot};
use crate::model::{ContainerId, EngineId, Item, PageId, ViewerId};
use crate::page::{Page, PageRegistry, Placement};

mod context;
mod session;

pub use context::{DispatchTier, EventContext, EventKind, Handler, Request, handler};
pub use session::{Session, SessionTracker};

/// Ambient configuration shared by the builder and the engine it produces.
#[derive(Clone, Default)]
pub struct EngineConfig {
    /// Optional structured logger.
    pub logger: Option<Logger>,
    /// Counters, shared so callers can read them while the engine runs.
    pub metrics: Option<Arc<Mutex<EngineMetrics>>>,
    /// Log every queued and executed builder action.
    pub debug: bool,
}

impl EngineConfig {
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(EngineMetrics::new())));
        }
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<EngineMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }

    pub(crate) fn emit<I>(&self, level: LogLevel, target: &str, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        if let Some(logger) = self.logger.as_ref() {
            let _ = logger.log_event(event_with_fields(level, target, message, fields));
        }
    }

    pub(crate) fn record(&self, update: impl FnOnce(&mut EngineMetrics)) {
        if let Some(metrics) = self.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                update(&mut guard);
            }
        }
    }
}

/// Single-slot global handlers; registering again replaces the previous one.
/// `page_open`/`page_close` are also installed on pages created after build.
#[derive(Clone, Default)]
pub(crate) struct GlobalHandlers {
    pub(crate) open: Option<Handler>,
    pub(crate) close: Option<Handler>,
    pub(crate) click: Option<Handler>,
    pub(crate) page_open: Option<Handler>,
    pub(crate) page_close: Option<Handler>,
}

/// Work scheduled for the next tick of the host's event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Deferred {
    /// Did the viewer leave every page of this GUI, or just switch pages?
    ExitCheck { viewer: ViewerId },
}

/// A built GUI: pages, handlers and sessions with one lifecycle.
pub struct Engine {
    id: EngineId,
    registry: PageRegistry,
    globals: GlobalHandlers,
    navigation: Option<Navigation>,
    sessions: SessionTracker,
    deferred: VecDeque<Deferred>,
    config: EngineConfig,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("id", &self.id)
            .field("pages", &self.registry.page_ids())
            .field("sessions", &self.sessions.len())
            .field("deferred", &self.deferred.len())
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub(crate) fn from_parts(
        registry: PageRegistry,
        globals: GlobalHandlers,
        navigation: Option<Navigation>,
        config: EngineConfig,
    ) -> Self {
        Self {
            id: EngineId::next(),
            registry,
            globals,
            navigation,
            sessions: SessionTracker::new(),
            deferred: VecDeque::new(),
            config,
        }
    }

    pub fn id(&self) -> EngineId {
        self.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &PageRegistry {
        &self.registry
    }

    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.registry.page(id)
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    pub fn current_page(&self, viewer: &ViewerId) -> Option<PageId> {
        self.sessions.current_page(viewer)
    }

    /// Host handle for a page of this GUI.
    pub fn container(&self, page: PageId) -> Option<ContainerId> {
        self.registry
            .contains(page)
            .then(|| ContainerId::new(self.id, page))
    }

    pub fn owns(&self, container: ContainerId) -> bool {
        container.engine == self.id && self.registry.contains(container.page)
    }

    /// Page 1 when it exists, otherwise the shared page.
    pub fn default_page(&self) -> PageId {
        if self.registry.contains(PageId(1)) {
            PageId(1)
        } else {
            PageId::SHARED
        }
    }

    pub fn metrics_snapshot(&self) -> Option<MetricSnapshot> {
        let metrics = self.config.metrics.as_ref()?;
        metrics.lock().ok().map(|guard| guard.snapshot())
    }

    /// Writes the current metrics snapshot through the configured logger.
    pub fn emit_metrics(&self) {
        if let (Some(logger), Some(snapshot)) = (self.config.logger.as_ref(), self.metrics_snapshot())
        {
            let _ = logger.log_event(snapshot.to_log_event(METRICS_TARGET));
        }
    }

    /// Presents `page` to `viewer`. The session follows once the host reports
    /// the open.
    pub fn open(&mut self, viewer: &ViewerId, page: PageId, host: &mut dyn Host) -> Result<()> {
        let Some(target) = self.registry.page(page) else {
            host.notify(viewer, &format!("GUI page {page} not found."));
            return Err(ConfigError::UnknownPage(page).into());
        };
        host.show(viewer, ContainerId::new(self.id, page), target);
        Ok(())
    }

    /// Asks the host to close this GUI for every tracked viewer.
    pub fn close_all(&mut self, host: &mut dyn Host) {
        for viewer in self.sessions.viewers() {
            if host.open_container(&viewer).is_some_and(|c| self.owns(c)) {
                host.close(&viewer);
            }
        }
    }

    pub fn handle(&mut self, notification: Notification, host: &mut dyn Host) {
        match notification {
            Notification::Open { viewer, container } => self.on_open(&viewer, container, host),
            Notification::Click {
                viewer,
                container,
                slot,
            } => self.on_click(&viewer, container, slot, host),
            Notification::Close { viewer, container } => self.on_close(&viewer, container, host),
        }
    }

    pub fn on_open(&mut self, viewer: &ViewerId, container: ContainerId, host: &mut dyn Host) {
        if !self.owns(container) {
            self.stale("open", viewer, container);
            return;
        }
        let page = container.page;
        if self.sessions.enter(viewer, page) {
            self.config.emit(
                LogLevel::Info,
                ROUTER_TARGET,
                "session_started",
                [json_str("viewer", viewer.as_str()), json_kv("page", page.0)],
            );
        }
        self.config.record(EngineMetrics::record_open);

        let page_handler = self.registry.page(page).and_then(|p| p.open_handler()).cloned();
        if let Some(handler) = page_handler {
            self.run(&handler, viewer, page, EventKind::Open, DispatchTier::Page, None, host);
        }

        if self.sessions.claim_global_open(viewer) {
            if let Some(handler) = self.globals.open.clone() {
                self.run(&handler, viewer, page, EventKind::Open, DispatchTier::Global, None, host);
            }
        }
    }

    /// Runs slot, page-wide and global click handlers, in that order. A
    /// failing tier never stops the next one.
    pub fn on_click(
        &mut self,
        viewer: &ViewerId,
        container: ContainerId,
        slot: u16,
        host: &mut dyn Host,
    ) {
        if container.engine != self.id {
            self.stale("click", viewer, container);
            return;
        }
        let Some(page) = self.sessions.current_page(viewer) else {
            self.stale("click", viewer, container);
            return;
        };
        self.config.record(EngineMetrics::record_click);

        let (slot_handler, page_handler, item) = match self.registry.page(page) {
            Some(p) => (
                p.click_handler(slot).cloned(),
                p.page_click_handler().cloned(),
                p.render(slot).cloned(),
            ),
            None => (None, None, None),
        };
        let kind = EventKind::Click { slot };
        let chain = [
            (DispatchTier::Slot, slot_handler),
            (DispatchTier::Page, page_handler),
            (DispatchTier::Global, self.globals.click.clone()),
        ];
        for (tier, handler) in chain {
            if let Some(handler) = handler {
                self.run(&handler, viewer, page, kind, tier, item.clone(), host);
            }
        }
    }

    /// Runs the page close handler now and schedules the exit check for the
    /// next tick, once any page switch has been reported by the host.
    pub fn on_close(&mut self, viewer: &ViewerId, container: ContainerId, host: &mut dyn Host) {
        if !self.owns(container) || self.sessions.get(viewer).is_none() {
            self.stale("close", viewer, container);
            return;
        }
        self.config.record(EngineMetrics::record_close);

        let page = container.page;
        let page_handler = self.registry.page(page).and_then(|p| p.close_handler()).cloned();
        if let Some(handler) = page_handler {
            self.run(&handler, viewer, page, EventKind::Close, DispatchTier::Page, None, host);
        }
        self.deferred.push_back(Deferred::ExitCheck {
            viewer: viewer.clone(),
        });
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// Runs continuations scheduled before this tick. Ones scheduled while
    /// running wait for the next tick.
    pub fn tick(&mut self, host: &mut dyn Host) {
        let due: Vec<Deferred> = self.deferred.drain(..).collect();
        for task in due {
            match task {
                Deferred::ExitCheck { viewer } => self.check_exit(&viewer, host),
            }
        }
    }

    fn check_exit(&mut self, viewer: &ViewerId, host: &mut dyn Host) {
        if host.open_container(viewer).is_some_and(|c| self.owns(c)) {
            return;
        }
        let Some(session) = self.sessions.end(viewer) else {
            return;
        };
        self.config.record(EngineMetrics::record_session_end);
        self.config.emit(
            LogLevel::Info,
            ROUTER_TARGET,
            "session_ended",
            [json_str("viewer", viewer.as_str())],
        );

        let page = session.current_page.unwrap_or(PageId::SHARED);
        if let Some(handler) = self.globals.close.clone() {
            self.run(&handler, viewer, page, EventKind::Close, DispatchTier::Global, None, host);
        }
    }

    /// Automatic placement on a built GUI, growing pages as needed. New
    /// pages get the page-wide handlers and join the navigation sequence.
    pub fn add_item(
        &mut self,
        page: PageId,
        item: Item,
        on_click: Option<Handler>,
        host: &mut dyn Host,
    ) -> Result<Placement> {
        let placement = self.registry.allocate(page, item, on_click)?;
        let mut touched = self.adopt_created_pages()?;
        touched.insert(placement.page);
        self.refresh(touched, host);
        Ok(placement)
    }

    pub fn set_item(
        &mut self,
        page: PageId,
        slot: u16,
        item: Item,
        on_click: Option<Handler>,
        host: &mut dyn Host,
    ) -> Result<()> {
        self.registry.set_item(page, slot, item, on_click)?;
        self.refresh(BTreeSet::from([page]), host);
        Ok(())
    }

    pub fn remove(&mut self, page: PageId, slot: u16, host: &mut dyn Host) -> Result<()> {
        self.remove_slots(page, &[slot], host)
    }

    pub fn remove_slots(&mut self, page: PageId, slots: &[u16], host: &mut dyn Host) -> Result<()> {
        let removal = self.registry.remove_slots(page, slots)?;
        if removal.compacted {
            self.config.record(EngineMetrics::record_compaction);
            self.config.emit(
                LogLevel::Debug,
                ALLOCATOR_TARGET,
                "stream_compacted",
                [json_kv("page", page.0), json_kv("slots", json!(slots))],
            );
        }
        self.refresh(removal.touched, host);
        Ok(())
    }

    pub fn remove_item(&mut self, page: PageId, item: &Item, host: &mut dyn Host) -> Result<()> {
        let removal = self.registry.remove_item(page, item)?;
        if removal.compacted {
            self.config.record(EngineMetrics::record_compaction);
        }
        self.refresh(removal.touched, host);
        Ok(())
    }

    /// Wires pages the allocator created since build. Returns every page
    /// whose contents changed: the new pages and their predecessors.
    fn adopt_created_pages(&mut self) -> Result<BTreeSet<PageId>> {
        let created = self.registry.take_created();
        let mut touched = BTreeSet::new();
        if created.is_empty() {
            return Ok(touched);
        }
        self.config.record(|m| m.record_pages_created(created.len()));

        for page in &created {
            let target = self.registry.page_mut(*page)?;
            if let Some(handler) = self.globals.page_open.as_ref() {
                target.set_open_handler(handler.clone());
            }
            if let Some(handler) = self.globals.page_close.as_ref() {
                target.set_close_handler(handler.clone());
            }
            touched.insert(*page);
            self.config.emit(
                LogLevel::Debug,
                ALLOCATOR_TARGET,
                "overflow_page_created",
                [json_kv("page", page.0)],
            );
        }

        if let Some(navigation) = self.navigation.as_ref() {
            navigation.install(&mut self.registry)?;
            let order = self.registry.content_page_ids();
            for page in &created {
                if let Some(previous) = order.iter().rev().find(|id| *id < page) {
                    touched.insert(*previous);
                }
            }
        }
        Ok(touched)
    }

    fn refresh(&mut self, pages: BTreeSet<PageId>, host: &mut dyn Host) {
        for page_id in pages {
            let Some(page) = self.registry.page(page_id) else {
                continue;
            };
            let container = ContainerId::new(self.id, page_id);
            for viewer in self.sessions.viewers_on(page_id) {
                host.refresh(&viewer, container, page);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run(
        &mut self,
        handler: &Handler,
        viewer: &ViewerId,
        page: PageId,
        kind: EventKind,
        tier: DispatchTier,
        item: Option<Item>,
        host: &mut dyn Host,
    ) {
        let mut ctx = EventContext::new(viewer, page, kind).with_item(item);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (handler.as_ref())(&mut ctx)));
        let fault = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err.message().to_string()),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };

        if let Some(reason) = fault {
            self.config.record(EngineMetrics::record_handler_fault);
            self.config.emit(
                LogLevel::Warn,
                ROUTER_TARGET,
                "handler_fault",
                [
                    json_str("viewer", viewer.as_str()),
                    json_kv("page", page.0),
                    json_str("tier", tier.as_str()),
                    json_str("reason", reason),
                ],
            );
            return;
        }

        for request in ctx.into_requests() {
            self.apply(viewer, request, host);
        }
    }

    fn apply(&mut self, viewer: &ViewerId, request: Request, host: &mut dyn Host) {
        match request {
            Request::OpenPage(page) => {
                if let Err(err) = self.open(viewer, page, host) {
                    self.config.emit(
                        LogLevel::Warn,
                        ROUTER_TARGET,
                        "open_failed",
                        [
                            json_str("viewer", viewer.as_str()),
                            json_str("error", err.to_string()),
                        ],
                    );
                }
            }
            Request::Close => host.close(viewer),
            Request::Notify(message) => host.notify(viewer, &message),
        }
    }

    fn stale(&self, kind: &str, viewer: &ViewerId, container: ContainerId) {
        self.config.record(EngineMetrics::record_stale);
        self.config.emit(
            LogLevel::Trace,
            ROUTER_TARGET,
            "stale_notification",
            [
                json_str("kind", kind),
                json_str("viewer", viewer.as_str()),
                json_str("container", container.to_string()),
            ],
        );
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::builder::{GuiBuilder, ItemEntry, Navigation, PageSpec};
    use crate::error::{FrameError, HandlerError};
    use crate::host::{SimulatedHost, settle};
    use crate::logging::MemorySink;
    use crate::model::Setting;

    struct Counters {
        global_open: Arc<AtomicUsize>,
        global_close: Arc<AtomicUsize>,
        page_close: Arc<AtomicUsize>,
    }

    fn count(counter: &Arc<AtomicUsize>) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Two content pages of one row each with navigation at the row edges.
    fn paged_engine(config: EngineConfig) -> (Engine, Counters) {
        let counters = Counters {
            global_open: Arc::new(AtomicUsize::new(0)),
            global_close: Arc::new(AtomicUsize::new(0)),
            page_close: Arc::new(AtomicUsize::new(0)),
        };
        let (open, close, page_close) = (
            Arc::clone(&counters.global_open),
            Arc::clone(&counters.global_close),
            Arc::clone(&counters.page_close),
        );

        let mut gui = GuiBuilder::new(Setting::new(2, "Page {page}")).with_config(config);
        gui.on_open(move |_| {
            open.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        gui.on_close(move |_| {
            close.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        gui.add_page(PageSpec::auto(), |page| {
            for n in 0..12 {
                page.add_item(Item::new(format!("item-{n}")))?;
            }
            Ok(())
        });
        gui.on_page_close(move |_| {
            page_close.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        gui.nav(Navigation::new());
        (gui.build().unwrap(), counters)
    }

    fn opened(engine: &mut Engine, host: &mut SimulatedHost, viewer: &ViewerId, page: u32) {
        engine.open(viewer, PageId(page), host).unwrap();
        settle(engine, host);
    }

    #[test]
    fn page_switch_keeps_one_session() {
        let (mut engine, counters) = paged_engine(EngineConfig::default());
        let mut host = SimulatedHost::new();
        let viewer = ViewerId::new("alice");
        opened(&mut engine, &mut host, &viewer, 1);
        assert_eq!(count(&counters.global_open), 1);

        // Next arrow, then back.
        host.click(&viewer, 17);
        settle(&mut engine, &mut host);
        assert_eq!(engine.current_page(&viewer), Some(PageId(2)));
        host.click(&viewer, 9);
        settle(&mut engine, &mut host);
        assert_eq!(engine.current_page(&viewer), Some(PageId(1)));

        assert_eq!(count(&counters.global_open), 1);
        assert_eq!(count(&counters.global_close), 0);
        assert_eq!(count(&counters.page_close), 2);
        assert_eq!(engine.sessions().len(), 1);
    }

    #[test]
    fn real_close_ends_the_session_once() {
        let (mut engine, counters) = paged_engine(EngineConfig::default());
        let mut host = SimulatedHost::new();
        let viewer = ViewerId::new("alice");
        opened(&mut engine, &mut host, &viewer, 1);

        host.close(&viewer);
        settle(&mut engine, &mut host);
        assert_eq!(count(&counters.global_close), 1);
        assert!(engine.sessions().is_empty());

        // A new session fires the global open again.
        opened(&mut engine, &mut host, &viewer, 2);
        assert_eq!(count(&counters.global_open), 2);
    }

    #[test]
    fn exit_check_waits_for_the_next_tick() {
        let (mut engine, counters) = paged_engine(EngineConfig::default());
        let mut host = SimulatedHost::new();
        let viewer = ViewerId::new("alice");
        opened(&mut engine, &mut host, &viewer, 1);

        // Close and reopen before the deferred check runs.
        host.close(&viewer);
        crate::host::pump(&mut engine, &mut host);
        assert!(engine.has_deferred());
        engine.open(&viewer, PageId(2), &mut host).unwrap();
        settle(&mut engine, &mut host);

        assert_eq!(count(&counters.global_close), 0);
        assert_eq!(count(&counters.global_open), 1);
        assert_eq!(engine.current_page(&viewer), Some(PageId(2)));
    }

    #[test]
    fn leaving_for_a_foreign_container_ends_the_session() {
        let (mut engine, counters) = paged_engine(EngineConfig::default());
        let (other, _) = paged_engine(EngineConfig::default());
        let mut host = SimulatedHost::new();
        let viewer = ViewerId::new("alice");
        opened(&mut engine, &mut host, &viewer, 1);

        host.open_foreign(&viewer, ContainerId::new(other.id(), PageId(1)));
        settle(&mut engine, &mut host);
        assert_eq!(count(&counters.global_close), 1);
        assert!(engine.sessions().is_empty());
    }

    #[test]
    fn last_page_has_no_next_item() {
        let (mut engine, _) = paged_engine(EngineConfig::default());
        let mut host = SimulatedHost::new();
        let viewer = ViewerId::new("alice");
        opened(&mut engine, &mut host, &viewer, 2);

        host.click(&viewer, 17);
        settle(&mut engine, &mut host);
        assert_eq!(engine.current_page(&viewer), Some(PageId(2)));
        assert!(host.messages_for(&viewer).is_empty());
    }

    #[test]
    fn faults_are_isolated_per_tier() {
        let sink = MemorySink::new();
        let mut config = EngineConfig::default().with_logger(Logger::new(sink.clone()));
        config.enable_metrics();

        let mut gui = GuiBuilder::new(Setting::new(1, "Faulty")).with_config(config);
        gui.on_click(|ctx| {
            ctx.notify("global ran");
            Ok(())
        });
        gui.add_page(PageSpec::auto(), |page| {
            page.set_item(
                ItemEntry::new(Item::new("broken")).on_click(|ctx| {
                    ctx.notify("lost");
                    Err(HandlerError::msg("slot failed"))
                }),
                0,
            )?;
            page.on_click(|_| panic!("page handler exploded"))?;
            Ok(())
        });
        let mut engine = gui.build().unwrap();
        let mut host = SimulatedHost::new();
        let viewer = ViewerId::new("alice");
        opened(&mut engine, &mut host, &viewer, 1);

        host.click(&viewer, 0);
        settle(&mut engine, &mut host);

        assert_eq!(host.messages_for(&viewer), vec!["global ran"]);
        let metrics = engine.metrics_snapshot().unwrap();
        assert_eq!(metrics.handler_faults, 2);
        assert_eq!(metrics.clicks, 1);

        let faults: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|e| e.message == "handler_fault")
            .collect();
        assert_eq!(faults.len(), 2);
        assert_eq!(faults[0].field("tier"), Some(&json!("slot")));
        assert_eq!(faults[1].field("reason"), Some(&json!("page handler exploded")));
    }

    #[test]
    fn global_handler_keeps_the_last_registration() {
        let mut gui = GuiBuilder::new(Setting::new(1, "x"));
        gui.on_click(|ctx| {
            ctx.notify("first");
            Ok(())
        });
        gui.on_click(|ctx| {
            ctx.notify("second");
            Ok(())
        });
        gui.add_page(PageSpec::auto(), |_| Ok(()));
        let mut engine = gui.build().unwrap();
        let mut host = SimulatedHost::new();
        let viewer = ViewerId::new("alice");
        opened(&mut engine, &mut host, &viewer, 1);

        host.click(&viewer, 3);
        settle(&mut engine, &mut host);
        assert_eq!(host.messages_for(&viewer), vec!["second"]);
    }

    #[test]
    fn stale_notifications_are_dropped() {
        let mut config = EngineConfig::default();
        config.enable_metrics();
        let (mut engine, counters) = paged_engine(config);
        let (other, _) = paged_engine(EngineConfig::default());
        let mut host = SimulatedHost::new();
        let viewer = ViewerId::new("alice");

        let foreign = ContainerId::new(other.id(), PageId(1));
        engine.handle(
            Notification::Click {
                viewer: viewer.clone(),
                container: foreign,
                slot: 17,
            },
            &mut host,
        );
        engine.handle(
            Notification::Close {
                viewer: viewer.clone(),
                container: ContainerId::new(engine.id(), PageId(1)),
            },
            &mut host,
        );
        engine.tick(&mut host);

        assert_eq!(engine.metrics_snapshot().unwrap().stale_notifications, 2);
        assert_eq!(count(&counters.page_close), 0);
        assert!(!host.has_pending());
    }

    #[test]
    fn unknown_page_is_reported_to_the_viewer() {
        let (mut engine, _) = paged_engine(EngineConfig::default());
        let mut host = SimulatedHost::new();
        let viewer = ViewerId::new("alice");

        let err = engine.open(&viewer, PageId(42), &mut host).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Config(ConfigError::UnknownPage(PageId(42)))
        ));
        assert_eq!(host.messages_for(&viewer), vec!["GUI page 42 not found."]);
        assert!(host.shown().is_empty());
    }

    #[test]
    fn runtime_removal_compacts_and_refreshes_viewers() {
        let mut config = EngineConfig::default();
        config.enable_metrics();
        let (mut engine, _) = paged_engine(config);
        let mut host = SimulatedHost::new();
        let (alice, bob) = (ViewerId::new("alice"), ViewerId::new("bob"));
        opened(&mut engine, &mut host, &alice, 1);
        opened(&mut engine, &mut host, &bob, 2);

        engine.remove(PageId(1), 0, &mut host).unwrap();
        assert_eq!(host.refreshes(), 2);
        assert_eq!(engine.registry().item_at(PageId(1), 8).unwrap().key, "item-9");
        assert_eq!(engine.registry().item_at(PageId(2), 1).unwrap().key, "item-11");
        assert!(engine.registry().item_at(PageId(2), 2).is_none());

        let placement = engine
            .add_item(PageId(1), Item::new("restock"), None, &mut host)
            .unwrap();
        assert_eq!(placement, Placement::new(PageId(2), 2));
        assert_eq!(host.refreshes(), 3);

        let metrics = engine.metrics_snapshot().unwrap();
        assert_eq!(metrics.compactions, 1);
        // Page 1 and its overflow page, both created during the build.
        assert_eq!(metrics.pages_created, 2);
    }

    #[test]
    fn runtime_overflow_pages_join_navigation() {
        let (mut engine, counters) = paged_engine(EngineConfig::default());
        let mut host = SimulatedHost::new();
        let viewer = ViewerId::new("alice");

        // Page 2 has six free slots; the seventh item opens page 3.
        let placements: Vec<_> = (0..7)
            .map(|n| {
                engine
                    .add_item(PageId(1), Item::new(format!("late-{n}")), None, &mut host)
                    .unwrap()
            })
            .collect();
        assert_eq!(placements[6], Placement::new(PageId(3), 0));

        let page2 = engine.page(PageId(2)).unwrap();
        assert_eq!(page2.render(17).unwrap().label, "Next Page");
        let page3 = engine.page(PageId(3)).unwrap();
        assert_eq!(page3.render(9).unwrap().label, "Previous Page");
        assert!(page3.render(17).is_none());
        assert!(page3.close_handler().is_some());

        opened(&mut engine, &mut host, &viewer, 2);
        host.click(&viewer, 17);
        settle(&mut engine, &mut host);
        assert_eq!(engine.current_page(&viewer), Some(PageId(3)));
        assert_eq!(count(&counters.page_close), 1);

        host.click(&viewer, 9);
        settle(&mut engine, &mut host);
        assert_eq!(engine.current_page(&viewer), Some(PageId(2)));
    }

    #[test]
    fn close_all_ends_every_session() {
        let (mut engine, counters) = paged_engine(EngineConfig::default());
        let mut host = SimulatedHost::new();
        for name in ["alice", "bob", "carol"] {
            opened(&mut engine, &mut host, &ViewerId::new(name), 1);
        }
        assert_eq!(count(&counters.global_open), 3);

        engine.close_all(&mut host);
        settle(&mut engine, &mut host);
        assert!(engine.sessions().is_empty());
        assert_eq!(count(&counters.global_close), 3);
    }
}
