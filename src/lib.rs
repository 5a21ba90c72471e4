//! Multi-page container GUI engine.
//!
//! A [`GuiBuilder`] describes pages, items and handlers; building it yields an
//! [`Engine`] that allocates overflow pages, compacts auto-placed items on
//! removal, and routes open/click/close notifications from a [`Host`] to the
//! registered handlers while tracking one session per viewer.

pub mod builder;
pub mod driver;
pub mod error;
pub mod host;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod page;
pub mod render;
pub mod router;

pub use builder::{ActionTier, GuiBuilder, ItemEntry, Navigation, PageBuilder, PageSpec};
pub use driver::{CliDriver, CliDriverError, DriverResult};
pub use error::{ConfigError, FrameError, HandlerError, HandlerResult, Result};
pub use host::{Host, Notification, SimulatedHost, pump, settle};
pub use logging::{FileSink, LogEvent, LogLevel, LogSink, Logger, LoggingError, MemorySink};
pub use metrics::{EngineMetrics, MetricSnapshot};
pub use model::{ContainerId, EngineId, Item, PageId, Setting, ViewerId};
pub use page::{Page, PageRegistry, PageSnapshot, Placement};
pub use render::{GridRenderer, RenderOptions};
pub use router::{
    DispatchTier, Engine, EngineConfig, EventContext, EventKind, Handler, Request, handler,
};
