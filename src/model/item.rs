use blake3::{Hash, Hasher};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque renderable handle stored in page slots.
///
/// The engine never interprets the contents; a renderer collaborator turns the
/// `key` and `meta` into whatever the host displays. Identity is the blake3
/// fingerprint of every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lore: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl Item {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: String::new(),
            lore: Vec::new(),
            meta: Map::new(),
        }
    }

    pub fn labeled(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::new(key)
        }
    }

    pub fn with_lore(mut self, line: impl Into<String>) -> Self {
        self.lore.push(line.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Text shown by plain renderers: the label, or the key when unlabeled.
    pub fn display_name(&self) -> &str {
        if self.label.is_empty() {
            &self.key
        } else {
            &self.label
        }
    }

    pub fn fingerprint(&self) -> Hash {
        let mut hasher = Hasher::new();
        hash_str(&mut hasher, &self.key);
        hash_str(&mut hasher, &self.label);
        hasher.update(&(self.lore.len() as u64).to_le_bytes());
        for line in &self.lore {
            hash_str(&mut hasher, line);
        }
        hash_str(&mut hasher, &Value::Object(self.meta.clone()).to_string());
        hasher.finalize()
    }

    pub fn same_as(&self, other: &Item) -> bool {
        self.fingerprint() == other.fingerprint()
    }
}

fn hash_str(hasher: &mut Hasher, value: &str) {
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}
