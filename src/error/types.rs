use thiserror::Error;

use crate::logging::LoggingError;
use crate::model::PageId;

/// Unified result type for the pageframe crate.
pub type Result<T> = std::result::Result<T, FrameError>;

/// Errors surfaced by the engine and its builder.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Mistakes in a GUI description. These are never swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("page id {0} is reserved for the shared page")]
    ReservedPageId(PageId),
    #[error("a page with id {0} already exists")]
    DuplicatePageId(PageId),
    #[error("navigation can only be configured on the top-level builder")]
    NestedNavigation,
    #[error("rows must be between 1 and 6, got {0}")]
    InvalidRows(u8),
    #[error("slot {slot} is out of range for page {page} (capacity {capacity})")]
    SlotOutOfRange {
        page: PageId,
        slot: u16,
        capacity: u16,
    },
    #[error("page {0} not found")]
    UnknownPage(PageId),
    #[error("every slot of page {page} is reserved; nothing can be placed automatically")]
    NoAllocatableSlots { page: PageId },
    #[error("no page id is left after {after} for an overflow page")]
    PageIdsExhausted { after: PageId },
}

/// Result type returned by user supplied open/close/click handlers.
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Failure reported by a user handler. Logged by the router, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::msg(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::msg(message)
    }
}
