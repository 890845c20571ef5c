//! Table layout: rows of span-merged cells built from a filtered tree

pub mod emitter;
pub mod group;

pub use emitter::RowEmitter;
pub use group::{ActionBinder, GroupAction, GroupKey, GroupMember, Selection};

use crate::action::{Target, ViewerContext, ViewerStrategy};
use crate::error::{ActionError, TableError};
use crate::tree::{NodeId, TableTree};
use crate::FileCategory;
use serde::Serialize;

/// What a cell shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Directory,
    File,
}

/// One placed cell
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    /// Node shown by this cell
    pub node: NodeId,
    /// Header column the cell starts in
    pub column: usize,
    /// Number of consecutive rows covered
    pub row_span: usize,
    /// Number of header columns covered (leaves shallower than the last column)
    pub col_span: usize,
    /// Display text; leaves are prefixed with folded directories
    pub label: String,
    pub path: String,
    pub kind: CellKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<FileCategory>,
    /// Group key of the analyze action this leaf belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupKey>,
}

impl Cell {
    pub fn is_leaf(&self) -> bool {
        self.kind == CellKind::File
    }
}

/// Content of the trailing action column for one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "slot", rename_all = "camelCase")]
pub enum ActionSlot {
    /// First row of a group: the action cell itself
    Start {
        key: GroupKey,
        #[serde(rename = "rowSpan")]
        row_span: usize,
    },
    /// Covered by an action cell started in an earlier row
    Spanned,
    /// The row's file belongs to no group
    Empty,
}

/// One emitted table row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub cells: Vec<Cell>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionSlot>,
    /// Group node claimed in this row, if any
    #[serde(skip)]
    pub(crate) opened_group: Option<NodeId>,
}

impl Row {
    /// The file cell that completes this row
    pub fn leaf(&self) -> Option<&Cell> {
        self.cells.iter().rev().find(|c| c.is_leaf())
    }

    /// The cell starting at `column`, if this row places one there
    pub fn cell_at(&self, column: usize) -> Option<&Cell> {
        self.cells.iter().find(|c| c.column == column)
    }
}

/// Complete output of one render cycle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableLayout {
    pub headers: Vec<String>,
    pub width: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_column: Option<usize>,
    pub rows: Vec<Row>,
    pub groups: Vec<GroupAction>,
}

impl TableLayout {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the table has a trailing analyze column
    pub fn has_actions(&self) -> bool {
        self.group_column.is_some()
    }

    pub fn leaf_count(&self) -> usize {
        self.rows.iter().filter(|r| r.leaf().is_some()).count()
    }

    /// Find the action for a group key
    pub fn group(&self, key: &str) -> Option<&GroupAction> {
        self.groups.iter().find(|g| g.key.as_str() == key)
    }

    /// Invoke the analyze action of a group
    pub fn invoke(
        &self,
        key: &str,
        selection: &Selection,
        viewer: Option<&ViewerStrategy>,
        context: &ViewerContext,
    ) -> Result<Vec<Target>, ActionError> {
        let group = self.group(key).ok_or_else(|| ActionError::UnknownGroup {
            group: key.to_string(),
        })?;
        group.invoke(selection, viewer, context)
    }
}

/// Drives the emitter over every top-level branch and binds the actions
pub struct TableBuilder {
    headers: Vec<String>,
    group_column: Option<usize>,
}

impl TableBuilder {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            group_column: None,
        }
    }

    /// Column whose nodes define analyze groups (`None` disables actions)
    pub fn with_group_column(mut self, column: Option<usize>) -> Self {
        self.group_column = column;
        self
    }

    fn validate(&self) -> Result<usize, TableError> {
        let width = self.headers.len();
        if width == 0 {
            return Err(TableError::NoHeaders);
        }
        if let Some(column) = self.group_column {
            if column >= width - 1 {
                return Err(TableError::GroupColumnOutOfRange { column, width });
            }
        }
        Ok(width)
    }

    /// Emit all rows for `tree`
    pub fn build(self, tree: &TableTree) -> Result<TableLayout, TableError> {
        let width = self.validate()?;
        let emitter = RowEmitter::new(tree, width, self.group_column);

        let mut rows = Vec::new();
        for &branch in tree.top_level() {
            rows.extend(emitter.emit(branch));
        }

        let groups = ActionBinder::bind(tree, &mut rows, self.group_column.is_some());
        log::debug!(
            "built {} rows and {} analyze groups across {} branches",
            rows.len(),
            groups.len(),
            tree.top_level().len()
        );

        Ok(TableLayout {
            headers: self.headers,
            width,
            group_column: self.group_column,
            rows,
            groups,
        })
    }

    /// A table with headers only (every leaf was filtered out)
    pub fn build_empty(self) -> Result<TableLayout, TableError> {
        let width = self.validate()?;
        Ok(TableLayout {
            headers: self.headers,
            width,
            group_column: self.group_column,
            rows: Vec::new(),
            groups: Vec::new(),
        })
    }
}
