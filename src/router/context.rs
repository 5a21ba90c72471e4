use std::sync::Arc;

use crate::error::HandlerResult;
use crate::model::{Item, PageId, ViewerId};

/// Callback registered for open, close or click interactions.
pub type Handler = Arc<dyn Fn(&mut EventContext<'_>) -> HandlerResult + Send + Sync>;

/// Wraps a closure into a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut EventContext<'_>) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Interaction a handler is being invoked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Open,
    Click { slot: u16 },
    Close,
}

/// Which tier of the dispatch chain is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchTier {
    Slot,
    Page,
    Global,
}

impl DispatchTier {
    pub fn as_str(self) -> &'static str {
        match self {
            DispatchTier::Slot => "slot",
            DispatchTier::Page => "page",
            DispatchTier::Global => "global",
        }
    }
}

/// Side effect requested by a handler, applied once the handler returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    OpenPage(PageId),
    Close,
    Notify(String),
}

/// Context passed to handlers. Requests are queued and applied by the
/// engine after the handler completes.
pub struct EventContext<'a> {
    viewer: &'a ViewerId,
    page: PageId,
    kind: EventKind,
    item: Option<Item>,
    requests: Vec<Request>,
}

impl<'a> EventContext<'a> {
    pub(crate) fn new(viewer: &'a ViewerId, page: PageId, kind: EventKind) -> Self {
        Self {
            viewer,
            page,
            kind,
            item: None,
            requests: Vec::new(),
        }
    }

    pub(crate) fn with_item(mut self, item: Option<Item>) -> Self {
        self.item = item;
        self
    }

    pub fn viewer(&self) -> &ViewerId {
        self.viewer
    }

    /// Page the viewer is on when the interaction happened.
    pub fn page(&self) -> PageId {
        self.page
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn slot(&self) -> Option<u16> {
        match self.kind {
            EventKind::Click { slot } => Some(slot),
            _ => None,
        }
    }

    /// Item rendered in the clicked slot, if any.
    pub fn item(&self) -> Option<&Item> {
        self.item.as_ref()
    }

    pub fn open_page(&mut self, page: PageId) {
        self.requests.push(Request::OpenPage(page));
    }

    pub fn close(&mut self) {
        self.requests.push(Request::Close);
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.requests.push(Request::Notify(message.into()));
    }

    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    pub(crate) fn into_requests(self) -> Vec<Request> {
        self.requests
    }
}
