use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Page identifier. Id `0` is the shared page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub u32);

impl PageId {
    /// Template page whose contents are copied into every page created after it.
    pub const SHARED: PageId = PageId(0);

    pub fn is_shared(self) -> bool {
        self == Self::SHARED
    }

    pub fn next(self) -> PageId {
        PageId(self.0.saturating_add(1))
    }

    pub fn checked_next(self) -> Option<PageId> {
        self.0.checked_add(1).map(PageId)
    }

    pub fn prev(self) -> Option<PageId> {
        self.0.checked_sub(1).map(PageId)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External actor a session is tracked for.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewerId(String);

impl ViewerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ViewerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ViewerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

/// Distinguishes the containers of one built GUI from every other GUI on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineId(u64);

impl EngineId {
    pub fn next() -> Self {
        Self(NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Host-visible handle of one page's container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId {
    pub engine: EngineId,
    pub page: PageId,
}

impl ContainerId {
    pub fn new(engine: EngineId, page: PageId) -> Self {
        Self { engine, page }
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gui#{}/page#{}", self.engine.0, self.page.0)
    }
}
