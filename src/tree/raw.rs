//! Raw result document: `{ "headers": [...], "entries": RawTree }`
//!
//! A RawTree maps directory names to nested RawTrees; the files of a
//! directory are listed under the reserved `"/files"` key. Decoding is
//! lenient: anything malformed is treated as "no children" so the filter
//! prunes it instead of failing the whole render.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Reserved key holding the ordered list of leaf file names
pub const FILES_KEY: &str = "/files";

/// Headers used when a document is built from a log directory
pub const DEFAULT_HEADERS: [&str; 4] = ["label", "time", "test", "logs"];

/// One child of a raw directory, in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawChild {
    File(String),
    Dir(String, RawTree),
}

/// A directory in the raw document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTree {
    pub children: Vec<RawChild>,
}

impl RawTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a leaf file
    pub fn with_file(mut self, name: impl Into<String>) -> Self {
        self.children.push(RawChild::File(name.into()));
        self
    }

    /// Append a sub-directory
    pub fn with_dir(mut self, name: impl Into<String>, tree: RawTree) -> Self {
        self.children.push(RawChild::Dir(name.into(), tree));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of files anywhere below this directory
    pub fn file_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                RawChild::File(_) => 1,
                RawChild::Dir(_, tree) => tree.file_count(),
            })
            .sum()
    }

    /// Decode a JSON value, skipping anything that does not fit the shape
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::new();
        };

        let mut tree = Self::new();
        for (key, child) in map {
            if key == FILES_KEY {
                match child.as_array() {
                    Some(items) => {
                        for item in items {
                            match item.as_str() {
                                Some(name) => tree.children.push(RawChild::File(name.to_string())),
                                None => log::warn!("skipping non-string file entry {}", item),
                            }
                        }
                    }
                    None => log::warn!("'{}' is not a list; treating as no files", FILES_KEY),
                }
            } else if child.is_object() {
                tree.children
                    .push(RawChild::Dir(key.clone(), Self::from_value(child)));
            } else {
                log::warn!("skipping malformed entry '{}'", key);
            }
        }
        tree
    }

    /// Encode back to the document shape. Files are grouped under `"/files"`
    /// at the position of the first file.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for child in &self.children {
            match child {
                RawChild::File(name) => {
                    let files = map
                        .entry(FILES_KEY)
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if let Value::Array(list) = files {
                        list.push(Value::String(name.clone()));
                    }
                }
                RawChild::Dir(name, tree) => {
                    map.insert(name.clone(), tree.to_value());
                }
            }
        }
        Value::Object(map)
    }
}

impl Serialize for RawTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RawTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

/// The input document supplied by a data source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableDocument {
    /// Column names; the length fixes the table width
    #[serde(default)]
    pub headers: Vec<String>,
    /// Nested log tree below the logical root
    #[serde(default)]
    pub entries: RawTree,
}

impl TableDocument {
    pub fn new(headers: Vec<String>, entries: RawTree) -> Self {
        Self { headers, entries }
    }

    /// Parse a document from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid results document")
    }

    /// Read a document from a JSON file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read results document: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in results document: {}", path.display()))
    }

    /// Build a document by scanning a log directory
    pub fn from_directory(dir: &Path, headers: Vec<String>) -> Result<Self> {
        Ok(Self {
            headers,
            entries: scan_directory(dir)?,
        })
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Pop the innermost open directory and attach it to its parent
fn close_dir(open: &mut Vec<(String, RawTree)>, top: &mut RawTree) {
    if let Some((name, tree)) = open.pop() {
        match open.last_mut() {
            Some((_, parent)) => parent.children.push(RawChild::Dir(name, tree)),
            None => top.children.push(RawChild::Dir(name, tree)),
        }
    }
}

/// Build a RawTree from a log directory on disk.
///
/// Siblings are sorted by file name; hidden entries are skipped.
pub fn scan_directory(root: &Path) -> Result<RawTree> {
    if !root.is_dir() {
        anyhow::bail!("Log directory does not exist: {}", root.display());
    }

    let mut top = RawTree::new();
    let mut open: Vec<(String, RawTree)> = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        // Entry at depth d lives inside the first d-1 open directories
        while open.len() >= entry.depth() {
            close_dir(&mut open, &mut top);
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().is_dir() {
            open.push((name, RawTree::new()));
        } else {
            match open.last_mut() {
                Some((_, dir)) => dir.children.push(RawChild::File(name)),
                None => top.children.push(RawChild::File(name)),
            }
        }
    }

    while !open.is_empty() {
        close_dir(&mut open, &mut top);
    }

    log::debug!(
        "scanned {}: {} files",
        root.display(),
        top.file_count()
    );
    Ok(top)
}
