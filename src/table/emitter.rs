//! Row emitter: repeated-pass greedy claiming of tree nodes into table rows
//!
//! Each pass walks one top-level branch depth-first and claims the first
//! unclaimed chain of nodes it meets, from the shallowest unclaimed ancestor
//! down to a single file. Claimed directories span as many rows as they have
//! leaves, so the rows that follow only need to place what is still
//! unclaimed. Directories that would land at or past the last header column
//! never get a cell of their own; their names are folded into the label of
//! the file below them.

use super::{Cell, CellKind, GroupKey, Row};
use crate::tree::{NodeId, TableTree};

/// Per-branch visitation state, owned by a single `emit` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unclaimed,
    Claimed,
}

/// Position in the depth-first walk. Passed by value: each child gets its
/// own copy, so siblings never see each other's breadcrumbs or budget.
#[derive(Debug, Clone)]
struct Cursor {
    /// Tree depth below the top-level node (uncapped)
    depth: usize,
    /// Rows available under the most recently claimed cell
    budget: usize,
    /// Folded directory names, each followed by `/`
    breadcrumb: String,
    /// Node occupying the group column on this path
    group: Option<NodeId>,
}

/// Row under construction during one pass
struct RowDraft {
    cells: Vec<Cell>,
    filled: Vec<bool>,
    opened_group: Option<NodeId>,
}

impl RowDraft {
    fn new(width: usize) -> Self {
        Self {
            cells: Vec::new(),
            filled: vec![false; width],
            opened_group: None,
        }
    }

    fn into_row(self) -> Row {
        Row {
            cells: self.cells,
            action: None,
            opened_group: self.opened_group,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    /// A file was placed in the last column; the pass is over
    RowComplete,
}

/// Emits the rows of one top-level branch at a time
pub struct RowEmitter<'t> {
    tree: &'t TableTree,
    width: usize,
    group_column: Option<usize>,
}

impl<'t> RowEmitter<'t> {
    /// `width` must be at least 1 and `group_column` below `width - 1`;
    /// `TableBuilder` checks both.
    pub fn new(tree: &'t TableTree, width: usize, group_column: Option<usize>) -> Self {
        Self {
            tree,
            width: width.max(1),
            group_column,
        }
    }

    /// Emit every row of the branch rooted at `top`.
    ///
    /// Terminates after one pass per leaf plus a final empty pass.
    pub fn emit(&self, top: NodeId) -> Vec<Row> {
        let mut visits = vec![Visit::Unclaimed; self.tree.len()];
        let mut rows = Vec::new();

        loop {
            let mut draft = RowDraft::new(self.width);
            let start = Cursor {
                depth: 0,
                budget: self.tree.node(top).span,
                breadcrumb: String::new(),
                group: None,
            };
            self.walk(top, start, &mut visits, &mut draft);

            if draft.cells.is_empty() {
                break;
            }
            rows.push(draft.into_row());
        }

        log::debug!(
            "branch '{}' emitted {} rows",
            self.tree.node(top).path,
            rows.len()
        );
        rows
    }

    fn walk(
        &self,
        id: NodeId,
        cursor: Cursor,
        visits: &mut [Visit],
        draft: &mut RowDraft,
    ) -> Step {
        let node = self.tree.node(id);
        let last = self.width - 1;
        let column = cursor.depth.min(last);
        let at_group_column = self.group_column == Some(cursor.depth);

        let mut next = Cursor {
            depth: cursor.depth + 1,
            budget: cursor.budget,
            breadcrumb: cursor.breadcrumb.clone(),
            group: if at_group_column { Some(id) } else { cursor.group },
        };

        if !node.is_leaf && cursor.depth >= last {
            next.breadcrumb.push_str(&node.name);
            next.breadcrumb.push('/');
        } else if visits[id.0] == Visit::Unclaimed
            && !draft.filled[column]
            && node.span <= cursor.budget
        {
            visits[id.0] = Visit::Claimed;
            draft.filled[column] = true;
            if at_group_column {
                draft.opened_group = Some(id);
            }

            if node.is_leaf {
                draft.cells.push(Cell {
                    node: id,
                    column,
                    row_span: 1,
                    col_span: self.width - column,
                    label: format!("{}{}", cursor.breadcrumb, node.name),
                    path: node.path.clone(),
                    kind: CellKind::File,
                    category: node.category,
                    group: next
                        .group
                        .map(|g| GroupKey::new(self.tree.node(g).path.clone())),
                });
                return Step::RowComplete;
            }

            draft.cells.push(Cell {
                node: id,
                column,
                row_span: node.span,
                col_span: 1,
                label: node.name.clone(),
                path: node.path.clone(),
                kind: CellKind::Directory,
                category: None,
                group: None,
            });
            next.budget = node.span;
        }

        for &child in &node.children {
            if self.walk(child, next.clone(), visits, draft) == Step::RowComplete {
                return Step::RowComplete;
            }
        }
        Step::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{RawTree, TreeFilter};
    use crate::CategoryFilter;

    fn filtered(raw: &RawTree, categories: CategoryFilter) -> TableTree {
        TreeFilter::new(categories).filter(raw, "logs").unwrap()
    }

    fn run1(files: &[&str]) -> RawTree {
        let mut test_a = RawTree::new();
        for f in files {
            test_a = test_a.with_file(*f);
        }
        RawTree::new().with_dir(
            "run1",
            RawTree::new().with_dir("t1", RawTree::new().with_dir("testA", test_a)),
        )
    }

    fn labels(row: &Row) -> Vec<(&str, usize, usize)> {
        row.cells
            .iter()
            .map(|c| (c.label.as_str(), c.column, c.row_span))
            .collect()
    }

    #[test]
    fn test_single_leaf_single_row() {
        let only_json = CategoryFilter {
            json_qlog: true,
            pcap: false,
            other: false,
        };
        let tree = filtered(&run1(&["a.json", "b.pcap"]), only_json);
        let rows = RowEmitter::new(&tree, 4, None).emit(tree.top_level()[0]);

        assert_eq!(rows.len(), 1);
        assert_eq!(
            labels(&rows[0]),
            vec![("run1", 0, 1), ("t1", 1, 1), ("testA", 2, 1), ("a.json", 3, 1)]
        );
        assert!(rows[0].cells[3].is_leaf());
    }

    #[test]
    fn test_two_leaves_share_merged_ancestors() {
        let tree = filtered(&run1(&["a.json", "b.pcap"]), CategoryFilter::all());
        let rows = RowEmitter::new(&tree, 4, None).emit(tree.top_level()[0]);

        assert_eq!(rows.len(), 2);
        assert_eq!(
            labels(&rows[0]),
            vec![("run1", 0, 2), ("t1", 1, 2), ("testA", 2, 2), ("a.json", 3, 1)]
        );
        assert_eq!(labels(&rows[1]), vec![("b.pcap", 3, 1)]);
    }

    #[test]
    fn test_sibling_branch_starts_after_previous_leaf() {
        // run1/{t1/{testA/{a1,a2}}, t2/{testB/{b}}}
        let raw = RawTree::new().with_dir(
            "run1",
            RawTree::new()
                .with_dir(
                    "t1",
                    RawTree::new().with_dir(
                        "testA",
                        RawTree::new().with_file("a1.json").with_file("a2.json"),
                    ),
                )
                .with_dir(
                    "t2",
                    RawTree::new().with_dir("testB", RawTree::new().with_file("b.json")),
                ),
        );
        let tree = filtered(&raw, CategoryFilter::all());
        let rows = RowEmitter::new(&tree, 4, None).emit(tree.top_level()[0]);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].cells[0].row_span, 3);
        assert_eq!(labels(&rows[1]), vec![("a2.json", 3, 1)]);
        assert_eq!(
            labels(&rows[2]),
            vec![("t2", 1, 1), ("testB", 2, 1), ("b.json", 3, 1)]
        );
    }

    #[test]
    fn test_deep_directories_fold_into_leaf_label() {
        // run1/t1/testA/client/qlog/a.qlog with only 3 columns
        let raw = RawTree::new().with_dir(
            "run1",
            RawTree::new().with_dir(
                "t1",
                RawTree::new().with_dir(
                    "testA",
                    RawTree::new().with_dir(
                        "client",
                        RawTree::new().with_dir(
                            "qlog",
                            RawTree::new().with_file("a.qlog").with_file("b.qlog"),
                        ),
                    ),
                ),
            ),
        );
        let tree = filtered(&raw, CategoryFilter::all());
        let rows = RowEmitter::new(&tree, 3, None).emit(tree.top_level()[0]);

        assert_eq!(rows.len(), 2);
        assert_eq!(
            labels(&rows[0]),
            vec![
                ("run1", 0, 2),
                ("t1", 1, 2),
                ("testA/client/qlog/a.qlog", 2, 1)
            ]
        );
        assert_eq!(labels(&rows[1]), vec![("testA/client/qlog/b.qlog", 2, 1)]);
        assert!(rows.iter().all(|r| r.cells.len() <= 3));
    }

    #[test]
    fn test_shallow_leaf_spans_remaining_columns() {
        let raw = RawTree::new().with_dir(
            "run1",
            RawTree::new()
                .with_file("summary.json")
                .with_dir("t1", RawTree::new().with_dir("testA", RawTree::new().with_file("a.json"))),
        );
        let tree = filtered(&raw, CategoryFilter::all());
        let rows = RowEmitter::new(&tree, 4, None).emit(tree.top_level()[0]);

        assert_eq!(rows.len(), 2);
        let summary = rows[0].leaf().unwrap();
        assert_eq!(summary.label, "summary.json");
        assert_eq!(summary.column, 1);
        assert_eq!(summary.col_span, 3);
        assert_eq!(rows[1].leaf().unwrap().col_span, 1);
    }

    #[test]
    fn test_top_level_leaf_is_single_cell_row() {
        let raw = RawTree::new().with_file("readme.txt");
        let tree = filtered(&raw, CategoryFilter::all());
        let rows = RowEmitter::new(&tree, 4, None).emit(tree.top_level()[0]);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cells.len(), 1);
        assert_eq!(rows[0].cells[0].col_span, 4);
    }

    #[test]
    fn test_width_one_puts_everything_in_one_column() {
        let tree = filtered(&run1(&["a.json", "b.pcap"]), CategoryFilter::all());
        let rows = RowEmitter::new(&tree, 1, None).emit(tree.top_level()[0]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cells[0].label, "run1/t1/testA/a.json");
        assert_eq!(rows[1].cells[0].label, "run1/t1/testA/b.pcap");
    }

    #[test]
    fn test_leaves_carry_group_key_of_group_column() {
        let tree = filtered(&run1(&["a.json", "b.pcap"]), CategoryFilter::all());
        let rows = RowEmitter::new(&tree, 4, Some(2)).emit(tree.top_level()[0]);

        let keys: Vec<&str> = rows
            .iter()
            .map(|r| r.leaf().unwrap().group.as_ref().unwrap().as_str())
            .collect();
        assert_eq!(keys, vec!["logs/run1/t1/testA", "logs/run1/t1/testA"]);
        assert!(rows[0].opened_group.is_some());
        assert!(rows[1].opened_group.is_none());
    }

    #[test]
    fn test_emit_is_repeatable() {
        let tree = filtered(&run1(&["a.json", "b.pcap", "c.qlog"]), CategoryFilter::all());
        let emitter = RowEmitter::new(&tree, 4, Some(1));
        let first = emitter.emit(tree.top_level()[0]);
        let second = emitter.emit(tree.top_level()[0]);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(labels(a), labels(b));
        }
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use crate::tree::{RawTree, TreeFilter};
    use crate::CategoryFilter;
    use proptest::prelude::*;
    use std::collections::{HashMap, HashSet};

    /// Random raw trees up to a few levels deep with mixed file types
    fn arbitrary_raw_tree() -> impl Strategy<Value = RawTree> {
        let file = prop::sample::select(vec!["a.json", "b.pcap", "c.qlog", "d.txt", "e"]);
        let leaf = prop::collection::vec(file, 0..4).prop_map(|files| {
            files
                .into_iter()
                .enumerate()
                .fold(RawTree::new(), |t, (i, f)| t.with_file(format!("{}{}", i, f)))
        });
        leaf.prop_recursive(5, 64, 4, |inner| {
            (
                prop::collection::vec(inner, 0..4),
                prop::collection::vec(prop::sample::select(vec!["x.json", "y.pcap", "z.log"]), 0..3),
            )
                .prop_map(|(dirs, files)| {
                    let mut tree = RawTree::new();
                    for (i, f) in files.into_iter().enumerate() {
                        tree = tree.with_file(format!("f{}{}", i, f));
                    }
                    for (i, d) in dirs.into_iter().enumerate() {
                        tree = tree.with_dir(format!("d{}", i), d);
                    }
                    tree
                })
        })
    }

    fn emit_all(tree: &TableTree, width: usize, group: Option<usize>) -> Vec<Row> {
        let emitter = RowEmitter::new(tree, width, group);
        tree.top_level()
            .iter()
            .flat_map(|&top| emitter.emit(top))
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn every_leaf_lands_in_exactly_one_row(raw in arbitrary_raw_tree(), width in 1usize..6) {
            if let Some(tree) = TreeFilter::new(CategoryFilter::all()).filter(&raw, "logs") {
                let rows = emit_all(&tree, width, None);
                let leaves = tree.leaves(tree.root());
                prop_assert_eq!(rows.len(), leaves.len());

                let placed: Vec<NodeId> = rows.iter().map(|r| r.leaf().unwrap().node).collect();
                prop_assert_eq!(placed, leaves);
                for row in &rows {
                    let leaf = row.leaf().unwrap();
                    prop_assert_eq!(leaf.column + leaf.col_span, width);
                    prop_assert_eq!(row.cells.iter().filter(|c| c.is_leaf()).count(), 1);
                }
            }
        }

        #[test]
        fn filter_with_every_category_keeps_every_leaf(raw in arbitrary_raw_tree()) {
            match TreeFilter::new(CategoryFilter::all()).filter(&raw, "logs") {
                Some(tree) => prop_assert_eq!(tree.leaves(tree.root()).len(), raw.file_count()),
                None => prop_assert_eq!(raw.file_count(), 0),
            }
            prop_assert!(TreeFilter::new(CategoryFilter::none()).filter(&raw, "logs").is_none());
        }

        #[test]
        fn node_paths_are_unique(raw in arbitrary_raw_tree()) {
            // A file named like a sibling directory, plus a repeated file
            let raw = raw.with_file("d0").with_file("f0x.json").with_file("f0x.json");
            if let Some(tree) = TreeFilter::new(CategoryFilter::all()).filter(&raw, "logs") {
                let mut paths = HashSet::new();
                for (_, node) in tree.iter() {
                    prop_assert!(paths.insert(node.path.clone()), "duplicate path {}", node.path);
                }
            }
        }

        #[test]
        fn no_node_is_placed_twice(raw in arbitrary_raw_tree(), width in 1usize..6) {
            if let Some(tree) = TreeFilter::new(CategoryFilter::all()).filter(&raw, "logs") {
                let rows = emit_all(&tree, width, None);
                let mut seen = HashSet::new();
                for cell in rows.iter().flat_map(|r| &r.cells) {
                    prop_assert!(seen.insert(cell.node), "node placed twice: {}", cell.path);
                }
            }
        }

        #[test]
        fn row_spans_cover_exactly_the_leaves_below(raw in arbitrary_raw_tree(), width in 1usize..6) {
            if let Some(tree) = TreeFilter::new(CategoryFilter::all()).filter(&raw, "logs") {
                let rows = emit_all(&tree, width, None);
                for (i, row) in rows.iter().enumerate() {
                    for cell in row.cells.iter().filter(|c| !c.is_leaf()) {
                        prop_assert_eq!(cell.row_span, tree.node(cell.node).span);
                        let covered: Vec<NodeId> = rows[i..i + cell.row_span]
                            .iter()
                            .map(|r| r.leaf().unwrap().node)
                            .collect();
                        prop_assert_eq!(covered, tree.leaves(cell.node));
                    }
                }
            }
        }

        #[test]
        fn rows_never_exceed_width(raw in arbitrary_raw_tree(), width in 1usize..6) {
            if let Some(tree) = TreeFilter::new(CategoryFilter::all()).filter(&raw, "logs") {
                for row in emit_all(&tree, width, None) {
                    prop_assert!(row.cells.len() <= width);
                    for cell in row.cells.iter().filter(|c| !c.is_leaf()) {
                        prop_assert!(cell.column < width - 1);
                    }
                    let columns: Vec<usize> = row.cells.iter().map(|c| c.column).collect();
                    prop_assert!(columns.windows(2).all(|w| w[0] < w[1]));
                }
            }
        }

        #[test]
        fn leaves_under_one_group_node_share_one_key(raw in arbitrary_raw_tree(), group in 0usize..3) {
            let width = 4;
            if let Some(tree) = TreeFilter::new(CategoryFilter::all()).filter(&raw, "logs") {
                let rows = emit_all(&tree, width, Some(group));
                let mut keys: HashMap<String, NodeId> = HashMap::new();
                for row in &rows {
                    let leaf = row.leaf().unwrap();
                    if let Some(key) = &leaf.group {
                        let owner = tree.find(key.as_str()).unwrap();
                        prop_assert!(tree.leaves(owner).contains(&leaf.node));
                        if let Some(previous) = keys.insert(key.as_str().to_string(), owner) {
                            prop_assert_eq!(previous, owner);
                        }
                    }
                }
            }
        }
    }
}
