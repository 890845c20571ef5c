//! Viewer strategies and target composition for analyze actions

use crate::error::ActionError;
use crate::table::GroupKey;
use anyhow::{bail, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Server that serves log files under `/<path>`
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

/// Built-in named presets: `(name, endpoint)`
pub const BUILTIN_PRESETS: &[(&str, &str)] = &[("qvis", "https://qvis.quictools.info/#/files")];

/// How checked files are handed to an external viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ViewerStrategy {
    /// Open each file on its own
    OpenFile,
    /// Download each file
    Download,
    /// Navigate to a URL template (`{query}`, `{count}`, `{group}`)
    CustomUrl { template: String },
    /// Navigate to a named endpoint with the aggregate query appended
    NamedPreset { name: String },
}

impl ViewerStrategy {
    /// Resolve a strategy from a CLI name. A template always means
    /// `custom-url`; names other than the fixed strategies are presets.
    pub fn parse(name: &str, template: Option<&str>) -> Result<Self> {
        if let Some(template) = template {
            if name != "custom-url" && !name.is_empty() {
                log::debug!("template given; ignoring viewer name '{}'", name);
            }
            return Ok(ViewerStrategy::CustomUrl {
                template: template.to_string(),
            });
        }

        match name {
            "open-file" => Ok(ViewerStrategy::OpenFile),
            "download" => Ok(ViewerStrategy::Download),
            "custom-url" => bail!("The custom-url viewer needs a template (--template)"),
            "" => bail!("Viewer name cannot be empty"),
            preset => Ok(ViewerStrategy::NamedPreset {
                name: preset.to_string(),
            }),
        }
    }
}

impl fmt::Display for ViewerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerStrategy::OpenFile => write!(f, "open-file"),
            ViewerStrategy::Download => write!(f, "download"),
            ViewerStrategy::CustomUrl { template } => write!(f, "custom-url ({})", template),
            ViewerStrategy::NamedPreset { name } => write!(f, "preset '{}'", name),
        }
    }
}

/// What the render sink should do with a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Open,
    Download,
    Navigate,
}

/// One composed action output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub kind: TargetKind,
    pub url: String,
}

/// Everything needed to turn leaf paths into viewer targets
#[derive(Debug, Clone)]
pub struct ViewerContext {
    server_url: String,
    presets: BTreeMap<String, String>,
}

impl Default for ViewerContext {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

impl ViewerContext {
    /// Context with the built-in presets
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            presets: BUILTIN_PRESETS
                .iter()
                .map(|(name, endpoint)| (name.to_string(), endpoint.to_string()))
                .collect(),
        }
    }

    /// Add or override named presets
    pub fn with_presets(mut self, presets: &BTreeMap<String, String>) -> Self {
        for (name, endpoint) in presets {
            self.presets.insert(name.clone(), endpoint.clone());
        }
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn presets(&self) -> &BTreeMap<String, String> {
        &self.presets
    }

    pub fn preset(&self, name: &str) -> Option<&str> {
        self.presets.get(name).map(String::as_str)
    }

    /// Reference a leaf path on the log server
    pub fn absolute_ref(&self, path: &str) -> String {
        let server = self.server_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if server.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", server, path)
        }
    }

    /// Compose the targets for `refs` (already absolute, in presentation order)
    pub fn compose(
        &self,
        viewer: &ViewerStrategy,
        refs: &[String],
        group: &GroupKey,
    ) -> Result<Vec<Target>, ActionError> {
        let targets = match viewer {
            ViewerStrategy::OpenFile => per_file(refs, TargetKind::Open),
            ViewerStrategy::Download => per_file(refs, TargetKind::Download),
            ViewerStrategy::NamedPreset { name } => {
                let endpoint = self
                    .preset(name)
                    .ok_or_else(|| ActionError::UnknownPreset { name: name.clone() })?;
                vec![Target {
                    kind: TargetKind::Navigate,
                    url: append_query(endpoint, &aggregate_query(refs)),
                }]
            }
            ViewerStrategy::CustomUrl { template } => vec![Target {
                kind: TargetKind::Navigate,
                url: expand_template(template, refs, group),
            }],
        };
        Ok(targets)
    }
}

fn per_file(refs: &[String], kind: TargetKind) -> Vec<Target> {
    refs.iter()
        .map(|url| Target {
            kind,
            url: url.clone(),
        })
        .collect()
}

/// `file1=<ref>&file2=<ref>...`, numbered from 1 in the given order
pub fn aggregate_query(refs: &[String]) -> String {
    refs.iter()
        .enumerate()
        .map(|(i, r)| format!("file{}={}", i + 1, urlencoding::encode(r)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Append a query to an endpoint, continuing an existing query with `&`
pub fn append_query(endpoint: &str, query: &str) -> String {
    if query.is_empty() {
        return endpoint.to_string();
    }
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!("{}{}{}", endpoint, separator, query)
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{(query|count|group)\}").expect("placeholder pattern is valid")
    })
}

/// Expand `{query}`, `{count}` and `{group}` in a custom URL template.
///
/// A template without `{query}` gets the aggregate query appended.
pub fn expand_template(template: &str, refs: &[String], group: &GroupKey) -> String {
    let query = aggregate_query(refs);
    let expanded = placeholder_pattern().replace_all(template, |caps: &Captures| {
        match &caps[1] {
            "query" => query.clone(),
            "count" => refs.len().to_string(),
            _ => urlencoding::encode(group.as_str()).into_owned(),
        }
    });

    if template.contains("{query}") {
        expanded.into_owned()
    } else {
        append_query(&expanded, &query)
    }
}
