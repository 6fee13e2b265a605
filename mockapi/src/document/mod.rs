// Document I/O - read/write the backing JSON file

use crate::error::{MockApiError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::Path;

/// One JSON object within a collection.
pub type Record = Map<String, Value>;

/// The whole backing file: collection name -> ordered records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    collections: IndexMap<String, Vec<Record>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a parsed JSON value.
    /// The value must be an object whose members are all arrays of objects.
    pub fn from_value(value: Value) -> std::result::Result<Self, String> {
        let root = match value {
            Value::Object(map) => map,
            other => {
                return Err(format!(
                    "top-level value must be a JSON object, got {}",
                    json_kind(&other)
                ))
            }
        };

        let mut collections = IndexMap::with_capacity(root.len());
        for (name, members) in root {
            let items = match members {
                Value::Array(items) => items,
                other => {
                    return Err(format!(
                        "collection '{name}' must be an array of objects, got {}",
                        json_kind(&other)
                    ))
                }
            };

            let mut records = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                match item {
                    Value::Object(record) => records.push(record),
                    other => {
                        return Err(format!(
                            "collection '{name}' entry {index} must be an object, got {}",
                            json_kind(&other)
                        ))
                    }
                }
            }
            collections.insert(name, records);
        }

        Ok(Document { collections })
    }

    /// Read and parse a backing file.
    pub fn read(path: &Path) -> Result<Self> {
        let load_error = |reason: String| MockApiError::Load {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| load_error(format!("invalid JSON: {e}")))?;
        Document::from_value(value).map_err(load_error)
    }

    /// Rewrite the backing file with the full document.
    /// Writes to a sibling temp file first and renames it over `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let persistence_error = |source: std::io::Error| MockApiError::Persistence {
            path: path.to_path_buf(),
            source,
        };

        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(persistence_error)?;
        tmp.write_all(json.as_bytes()).map_err(persistence_error)?;
        tmp.as_file().sync_all().map_err(persistence_error)?;
        tmp.persist(path).map_err(|e| persistence_error(e.error))?;
        Ok(())
    }

    pub fn collection(&self, name: &str) -> Option<&Vec<Record>> {
        self.collections.get(name)
    }

    pub fn collection_mut(&mut self, name: &str) -> Option<&mut Vec<Record>> {
        self.collections.get_mut(name)
    }

    pub fn insert_collection(&mut self, name: impl Into<String>, records: Vec<Record>) {
        self.collections.insert(name.into(), records);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Collection names in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn collections(&self) -> impl Iterator<Item = (&str, &[Record])> {
        self.collections
            .iter()
            .map(|(name, records)| (name.as_str(), records.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn total_records(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }
}

/// Human name of a JSON value's kind, used in error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
