//! Error types for table building and analyze actions

use thiserror::Error;

/// Errors raised while turning a filtered tree into table rows
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// The document has no headers, so the table has no columns
    #[error("document has no headers; at least one column is required")]
    NoHeaders,

    /// The group column must sit left of the file column
    #[error("group column {column} is out of range for a table of width {width}")]
    GroupColumnOutOfRange { column: usize, width: usize },
}

/// Non-fatal conditions reported when an analyze action cannot produce a target
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// No viewer strategy was configured
    #[error("no viewer selected; choose open-file, download, custom-url or a preset")]
    NoViewerSelected,

    /// None of the group's files are checked
    #[error("no files checked under {group}")]
    NothingChecked { group: String },

    /// The group key does not belong to any action in this table
    #[error("no analyze action for group '{group}'")]
    UnknownGroup { group: String },

    /// A named preset is not defined in the config or the built-ins
    #[error("unknown viewer preset '{name}'")]
    UnknownPreset { name: String },
}
