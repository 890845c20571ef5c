//! Config schema and deserialization

use crate::action::{ViewerContext, ViewerStrategy, DEFAULT_SERVER_URL};
use crate::tree::DEFAULT_HEADERS;
use crate::CategoryFilter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Logical root name used when the config does not set one
pub const DEFAULT_ROOT_PREFIX: &str = "logs";

/// Per-category visibility toggles. Unset toggles are enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_qlog: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcap: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<bool>,
}

impl FilterSettings {
    fn merge_from(&mut self, base: FilterSettings) {
        self.json_qlog = self.json_qlog.or(base.json_qlog);
        self.pcap = self.pcap.or(base.pcap);
        self.other = self.other.or(base.other);
    }
}

/// Root config structure for .logtablerc.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Extend another config file (path relative to this config)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Column headers for directory sources (documents carry their own)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<String>>,

    /// Name of the logical root; node paths start with it. Default: "logs"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_prefix: Option<String>,

    /// Which file categories are shown
    #[serde(default)]
    pub filters: FilterSettings,

    /// Column whose nodes get an analyze action. Default: the column left of
    /// the file column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_column: Option<usize>,

    /// Set to false to drop the analyze column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<bool>,

    /// External viewer used by analyze actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer: Option<ViewerStrategy>,

    /// Server that serves the log files. Default: http://127.0.0.1:5000
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    /// Named viewer endpoints, added to (or overriding) the built-ins
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub presets: BTreeMap<String, String>,

    /// Glob patterns for log files to leave out of the table, matched
    /// against the path below the root
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
}

/// Values given on the command line. `None`/`false` leaves the config as is.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub no_json_qlog: bool,
    pub no_pcap: bool,
    pub no_other: bool,
    pub group_column: Option<usize>,
    pub no_actions: bool,
    pub viewer: Option<ViewerStrategy>,
    pub server_url: Option<String>,
    pub root_prefix: Option<String>,
}

impl Config {
    /// Merge CLI overrides into config. CLI values take precedence.
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if cli.no_json_qlog {
            self.filters.json_qlog = Some(false);
        }
        if cli.no_pcap {
            self.filters.pcap = Some(false);
        }
        if cli.no_other {
            self.filters.other = Some(false);
        }
        if cli.group_column.is_some() {
            self.group_column = cli.group_column;
        }
        if cli.no_actions {
            self.actions = Some(false);
        }
        if cli.viewer.is_some() {
            self.viewer = cli.viewer;
        }
        if cli.server_url.is_some() {
            self.server_url = cli.server_url;
        }
        if cli.root_prefix.is_some() {
            self.root_prefix = cli.root_prefix;
        }
        self
    }

    /// Merge another config into this one (for extends)
    pub fn merge_from(&mut self, base: Config) {
        // Base values are overridden by this config's values
        if self.extends.is_none() {
            self.extends = base.extends;
        }
        if self.headers.is_none() {
            self.headers = base.headers;
        }
        if self.root_prefix.is_none() {
            self.root_prefix = base.root_prefix;
        }
        if self.group_column.is_none() {
            self.group_column = base.group_column;
        }
        if self.actions.is_none() {
            self.actions = base.actions;
        }
        if self.viewer.is_none() {
            self.viewer = base.viewer;
        }
        if self.server_url.is_none() {
            self.server_url = base.server_url;
        }
        self.filters.merge_from(base.filters);

        // Merge presets (this config takes precedence)
        for (name, endpoint) in base.presets {
            self.presets.entry(name).or_insert(endpoint);
        }

        // Merge ignore patterns
        let mut all_ignores = base.ignore;
        all_ignores.append(&mut self.ignore);
        self.ignore = all_ignores;
    }

    pub fn category_filter(&self) -> CategoryFilter {
        CategoryFilter {
            json_qlog: self.filters.json_qlog.unwrap_or(true),
            pcap: self.filters.pcap.unwrap_or(true),
            other: self.filters.other.unwrap_or(true),
        }
    }

    pub fn root_prefix(&self) -> &str {
        self.root_prefix.as_deref().unwrap_or(DEFAULT_ROOT_PREFIX)
    }

    pub fn server_url(&self) -> &str {
        self.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    /// Configured headers, or the defaults for scanned log folders
    pub fn headers_or_default(&self) -> Vec<String> {
        match &self.headers {
            Some(headers) => headers.clone(),
            None => DEFAULT_HEADERS.iter().map(|h| h.to_string()).collect(),
        }
    }

    /// Group column for a table of `width` columns, or `None` when actions
    /// are off. Explicit values are passed through unchecked; the table
    /// builder rejects out-of-range ones.
    pub fn effective_group_column(&self, width: usize) -> Option<usize> {
        if self.actions == Some(false) {
            return None;
        }
        match self.group_column {
            Some(column) => Some(column),
            None if width >= 2 => Some(width - 2),
            None => None,
        }
    }

    pub fn viewer_context(&self) -> ViewerContext {
        ViewerContext::new(self.server_url()).with_presets(&self.presets)
    }
}
