//! Analyze groups: one trailing action cell per node in the group column

use super::{ActionSlot, Row};
use crate::action::{Target, ViewerContext, ViewerStrategy};
use crate::error::ActionError;
use crate::tree::{NodeId, TableTree};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Path of the node occupying the group column
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A leaf selectable under a group action
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub node: NodeId,
    pub path: String,
    pub label: String,
}

/// The analyze action of one group
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAction {
    pub key: GroupKey,
    /// Node that defined the group
    pub node: NodeId,
    /// Row holding the action cell
    pub first_row: usize,
    pub row_span: usize,
    /// Tagged leaves in traversal order
    pub members: Vec<GroupMember>,
}

impl GroupAction {
    /// Members whose selector is checked, in presentation order
    pub fn checked_members<'a>(&'a self, selection: &Selection) -> Vec<&'a GroupMember> {
        self.members
            .iter()
            .filter(|m| selection.is_checked(&m.path))
            .collect()
    }

    /// Compose the targets for the checked members of this group.
    ///
    /// Fails without side effects when no viewer is chosen or nothing is
    /// checked; callers report these and carry on.
    pub fn invoke(
        &self,
        selection: &Selection,
        viewer: Option<&ViewerStrategy>,
        context: &ViewerContext,
    ) -> Result<Vec<Target>, ActionError> {
        let checked = self.checked_members(selection);
        let viewer = viewer.ok_or(ActionError::NoViewerSelected)?;
        if checked.is_empty() {
            return Err(ActionError::NothingChecked {
                group: self.key.to_string(),
            });
        }

        let refs: Vec<String> = checked
            .iter()
            .map(|m| context.absolute_ref(&m.path))
            .collect();
        log::debug!("analyze {}: {} of {} files", self.key, refs.len(), self.members.len());
        context.compose(viewer, &refs, &self.key)
    }
}

/// Attaches action slots to emitted rows and collects the group registry
pub struct ActionBinder;

impl ActionBinder {
    /// Fill `Row::action` for every row and return one action per group.
    ///
    /// Without a group column the rows are left untouched.
    pub fn bind(tree: &TableTree, rows: &mut [Row], has_column: bool) -> Vec<GroupAction> {
        if !has_column {
            return Vec::new();
        }

        let mut groups: Vec<GroupAction> = Vec::new();
        let mut index: HashMap<GroupKey, usize> = HashMap::new();
        let mut covered_until = 0;

        for (i, row) in rows.iter_mut().enumerate() {
            row.action = Some(match row.opened_group {
                Some(id) => {
                    let node = tree.node(id);
                    let key = GroupKey::new(node.path.clone());
                    covered_until = i + node.span;
                    index.insert(key.clone(), groups.len());
                    groups.push(GroupAction {
                        key: key.clone(),
                        node: id,
                        first_row: i,
                        row_span: node.span,
                        members: Vec::new(),
                    });
                    ActionSlot::Start {
                        key,
                        row_span: node.span,
                    }
                }
                None if i < covered_until => ActionSlot::Spanned,
                None => ActionSlot::Empty,
            });

            if let Some(leaf) = row.leaf() {
                if let Some(&slot) = leaf.group.as_ref().and_then(|k| index.get(k)) {
                    groups[slot].members.push(GroupMember {
                        node: leaf.node,
                        path: leaf.path.clone(),
                        label: leaf.label.clone(),
                    });
                }
            }
        }

        groups
    }
}

/// Checked state of leaf selectors, keyed by leaf path
#[derive(Debug, Clone, Default)]
pub struct Selection {
    checked: HashSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            checked: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn check(&mut self, path: impl Into<String>) {
        self.checked.insert(path.into());
    }

    pub fn uncheck(&mut self, path: &str) {
        self.checked.remove(path);
    }

    pub fn is_checked(&self, path: &str) -> bool {
        self.checked.contains(path)
    }

    pub fn len(&self) -> usize {
        self.checked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checked.is_empty()
    }
}
