use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::model::PageId;

pub const SLOTS_PER_ROW: u16 = 9;
pub const MAX_ROWS: u8 = 6;
const PAGE_PLACEHOLDER: &str = "{page}";

/// Descriptor copied into every page at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Setting {
    pub rows: u8,
    /// Title template; `{page}` is replaced by the page id.
    pub title: String,
    /// Formatting hint passed through to the renderer collaborator.
    pub small_caps: bool,
}

impl Default for Setting {
    fn default() -> Self {
        Self {
            rows: MAX_ROWS,
            title: "Inventory".to_string(),
            small_caps: false,
        }
    }
}

impl Setting {
    pub fn new(rows: u8, title: impl Into<String>) -> Self {
        Self {
            rows,
            title: title.into(),
            small_caps: false,
        }
    }

    pub fn with_small_caps(mut self, enabled: bool) -> Self {
        self.small_caps = enabled;
        self
    }

    pub fn from_json(input: &str) -> Result<Self> {
        let setting: Setting = serde_json::from_str(input)?;
        setting.validate()?;
        Ok(setting)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.rows == 0 || self.rows > MAX_ROWS {
            return Err(ConfigError::InvalidRows(self.rows));
        }
        Ok(())
    }

    pub fn capacity(&self) -> u16 {
        u16::from(self.rows) * SLOTS_PER_ROW
    }

    pub fn title_for(&self, page: PageId) -> String {
        self.title.replace(PAGE_PLACEHOLDER, &page.to_string())
    }
}
