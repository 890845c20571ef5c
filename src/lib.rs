//! Logtable: renders test-run log folders as span-merged tables
//!
//! This library turns a nested tree of log folders into an ordered sequence of
//! fixed-width table rows. Grouping (label, timestamp, test, sub-components) is
//! expressed through row-spanning cells, leaves can be filtered by file type,
//! and checked files can be handed to an external analyze action.

pub mod action;
pub mod config;
pub mod error;
pub mod reporter;
pub mod table;
pub mod tree;
pub mod watcher;

pub use error::{ActionError, TableError};

use serde::{Deserialize, Serialize};

/// File type class of a leaf, derived from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileCategory {
    /// `.json` and `.qlog` traces
    JsonQlog,
    /// `.pcap` packet captures
    Pcap,
    /// Anything else, including files without an extension
    Other,
}

impl FileCategory {
    /// Classify a file name by the case-sensitive suffix after its last `.`
    pub fn classify(file_name: &str) -> Self {
        match file_name.rsplit_once('.').map(|(_, ext)| ext) {
            Some("json") | Some("qlog") => FileCategory::JsonQlog,
            Some("pcap") => FileCategory::Pcap,
            _ => FileCategory::Other,
        }
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileCategory::JsonQlog => write!(f, "json/qlog"),
            FileCategory::Pcap => write!(f, "pcap"),
            FileCategory::Other => write!(f, "other"),
        }
    }
}

/// Which leaf categories are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFilter {
    pub json_qlog: bool,
    pub pcap: bool,
    pub other: bool,
}

impl CategoryFilter {
    /// Every category enabled
    pub fn all() -> Self {
        Self {
            json_qlog: true,
            pcap: true,
            other: true,
        }
    }

    /// Every category disabled (yields an empty table)
    pub fn none() -> Self {
        Self {
            json_qlog: false,
            pcap: false,
            other: false,
        }
    }

    pub fn is_enabled(&self, category: FileCategory) -> bool {
        match category {
            FileCategory::JsonQlog => self.json_qlog,
            FileCategory::Pcap => self.pcap,
            FileCategory::Other => self.other,
        }
    }

    /// Whether a file name passes this filter
    pub fn accepts(&self, file_name: &str) -> bool {
        self.is_enabled(FileCategory::classify(file_name))
    }
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self::all()
    }
}

/// Public API: run one render cycle over a document.
///
/// Filters the raw tree with the config's categories and ignore patterns,
/// emits the rows of every top-level branch and binds the analyze actions.
/// Each call rebuilds everything from scratch; nothing is shared between cycles.
pub fn render(
    document: &tree::TableDocument,
    config: &config::Config,
) -> anyhow::Result<table::TableLayout> {
    let ignore_set = if config.ignore.is_empty() {
        None
    } else {
        Some(config::build_ignore_set(&config.ignore)?)
    };

    let filter = tree::TreeFilter::new(config.category_filter()).with_exclude(ignore_set);
    let width = document.headers.len();
    let builder = table::TableBuilder::new(document.headers.clone())
        .with_group_column(config.effective_group_column(width));

    match filter.filter(&document.entries, config.root_prefix()) {
        Some(tree) => Ok(builder.build(&tree)?),
        None => {
            log::debug!("every leaf was filtered out; rendering an empty table");
            Ok(builder.build_empty()?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_json_and_qlog() {
        assert_eq!(FileCategory::classify("a.json"), FileCategory::JsonQlog);
        assert_eq!(FileCategory::classify("client.qlog"), FileCategory::JsonQlog);
        assert_eq!(
            FileCategory::classify("trace.tar.json"),
            FileCategory::JsonQlog
        );
    }

    #[test]
    fn test_classify_pcap() {
        assert_eq!(FileCategory::classify("b.pcap"), FileCategory::Pcap);
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        assert_eq!(FileCategory::classify("a.JSON"), FileCategory::Other);
        assert_eq!(FileCategory::classify("b.Pcap"), FileCategory::Other);
    }

    #[test]
    fn test_classify_without_extension() {
        assert_eq!(FileCategory::classify("keys"), FileCategory::Other);
        assert_eq!(FileCategory::classify("output.txt"), FileCategory::Other);
    }

    #[test]
    fn test_filter_accepts_only_enabled() {
        let filter = CategoryFilter {
            json_qlog: true,
            pcap: false,
            other: false,
        };
        assert!(filter.accepts("a.json"));
        assert!(!filter.accepts("b.pcap"));
        assert!(!filter.accepts("server.log"));
        assert!(!CategoryFilter::none().accepts("a.json"));
    }
}
