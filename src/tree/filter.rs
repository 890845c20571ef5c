//! Tree filter: classifies leaves, drops hidden ones and prunes empty branches

use super::node::{NodeId, TableNode, TableTree};
use super::raw::{RawChild, RawTree};
use crate::{CategoryFilter, FileCategory};
use globset::GlobSet;
use std::collections::HashSet;

/// Builds a pruned `TableTree` from a `RawTree`
pub struct TreeFilter {
    categories: CategoryFilter,
    exclude: Option<GlobSet>,
}

impl TreeFilter {
    pub fn new(categories: CategoryFilter) -> Self {
        Self {
            categories,
            exclude: None,
        }
    }

    /// Also drop leaves whose path (relative to the root) matches the set
    pub fn with_exclude(mut self, exclude: Option<GlobSet>) -> Self {
        self.exclude = exclude;
        self
    }

    /// Filter `raw`, naming the logical root `root_prefix`.
    ///
    /// Returns `None` when no leaf survives. Child order follows the input.
    pub fn filter(&self, raw: &RawTree, root_prefix: &str) -> Option<TableTree> {
        let mut nodes = Vec::new();
        let root = self.filter_dir(raw, root_prefix, root_prefix, "", &mut nodes)?;
        log::debug!(
            "filter kept {} nodes ({} leaves)",
            nodes.len(),
            nodes.iter().filter(|n| n.is_leaf).count()
        );
        Some(TableTree::from_parts(nodes, root))
    }

    fn is_visible(&self, name: &str, relative: &str) -> bool {
        if !self.categories.accepts(name) {
            return false;
        }
        match &self.exclude {
            Some(set) => !set.is_match(relative),
            None => true,
        }
    }

    fn filter_dir(
        &self,
        raw: &RawTree,
        name: &str,
        path: &str,
        relative: &str,
        nodes: &mut Vec<TableNode>,
    ) -> Option<NodeId> {
        let mut children = Vec::new();

        // Sibling names must be unique so every node has its own path; a
        // directory wins over a file of the same name.
        let dir_names: HashSet<&str> = raw
            .children
            .iter()
            .filter_map(|c| match c {
                RawChild::Dir(name, _) => Some(name.as_str()),
                RawChild::File(_) => None,
            })
            .collect();
        let mut seen: HashSet<&str> = HashSet::new();

        for child in &raw.children {
            match child {
                RawChild::File(file) => {
                    if dir_names.contains(file.as_str()) || !seen.insert(file.as_str()) {
                        log::warn!("skipping file '{}': name already used in {}", file, path);
                        continue;
                    }
                    let child_relative = join(relative, file);
                    if !self.is_visible(file, &child_relative) {
                        continue;
                    }
                    children.push(push(
                        nodes,
                        TableNode {
                            name: file.clone(),
                            path: join(path, file),
                            is_leaf: true,
                            category: Some(FileCategory::classify(file)),
                            children: Vec::new(),
                            span: 1,
                        },
                    ));
                }
                RawChild::Dir(dir, sub) => {
                    if !seen.insert(dir.as_str()) {
                        log::warn!("skipping duplicate directory '{}' in {}", dir, path);
                        continue;
                    }
                    let child_path = join(path, dir);
                    let child_relative = join(relative, dir);
                    if let Some(id) = self.filter_dir(sub, dir, &child_path, &child_relative, nodes)
                    {
                        children.push(id);
                    }
                }
            }
        }

        if children.is_empty() {
            return None;
        }

        let span = children
            .iter()
            .map(|c| nodes[c.0].span)
            .sum::<usize>()
            .max(1);

        Some(push(
            nodes,
            TableNode {
                name: name.to_string(),
                path: path.to_string(),
                is_leaf: false,
                category: None,
                children,
                span,
            },
        ))
    }
}

fn push(nodes: &mut Vec<TableNode>, node: TableNode) -> NodeId {
    nodes.push(node);
    NodeId(nodes.len() - 1)
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}
