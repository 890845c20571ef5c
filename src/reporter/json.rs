//! JSON reporter for machine-readable output

use crate::action::Target;
use crate::table::TableLayout;
use crate::tree::TableDocument;
use serde::Serialize;

/// Reporter for JSON output
pub struct JsonReporter {
    /// Whether to pretty-print JSON
    pretty: bool,
}

impl JsonReporter {
    /// Create a new JSON reporter
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Enable pretty-printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T, fallback: &str) -> String {
        let result = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        result.unwrap_or_else(|e| {
            log::error!("failed to serialize JSON output: {}", e);
            fallback.to_string()
        })
    }

    /// Report a rendered table
    pub fn report(&self, layout: &TableLayout) -> String {
        self.encode(layout, "{}")
    }

    /// Report an input document (used by `scan`)
    pub fn report_document(&self, document: &TableDocument) -> String {
        self.encode(document, "{}")
    }

    /// Report the targets composed by an analyze action
    pub fn report_targets(&self, group: &str, targets: &[Target]) -> String {
        let output = JsonTargets { group, targets };
        self.encode(&output, "{}")
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonTargets<'a> {
    group: &'a str,
    targets: &'a [Target],
}
