//! Console reporter with colored output

use crate::action::{Target, TargetKind};
use crate::table::{ActionSlot, Cell, Row, TableLayout};
use crate::FileCategory;
use colored::Colorize;

const SEPARATOR: &str = " │ ";
const ACTION_HEADER: &str = "analyze";

/// Reporter for terminal output
pub struct ConsoleReporter {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to show verbose output
    verbose: bool,
}

impl ConsoleReporter {
    /// Create a new console reporter
    pub fn new() -> Self {
        Self {
            use_colors: true,
            verbose: false,
        }
    }

    /// Disable colors
    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    /// Enable verbose output (lists every analyze group after the table)
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Print a rendered table
    pub fn report(&self, layout: &TableLayout) {
        print!("{}", self.render(layout));
    }

    /// Format a rendered table as a text grid
    pub fn render(&self, layout: &TableLayout) -> String {
        let widths = column_widths(layout);
        let action_width = action_width(layout);
        let mut out = String::new();

        let mut header: Vec<String> = layout
            .headers
            .iter()
            .zip(&widths)
            .map(|(h, &w)| self.paint_header(&pad(h, w)))
            .collect();
        if layout.has_actions() {
            header.push(self.paint_header(&pad(ACTION_HEADER, action_width)));
        }
        out.push_str(header.join(SEPARATOR).trim_end());
        out.push('\n');

        let rule_width = widths.iter().sum::<usize>()
            + SEPARATOR.chars().count() * widths.len().saturating_sub(1)
            + if layout.has_actions() {
                action_width + SEPARATOR.chars().count()
            } else {
                0
            };
        out.push_str(&self.paint_dim(&"─".repeat(rule_width)));
        out.push('\n');

        if layout.is_empty() {
            out.push_str(&self.paint_dim("(no log files match the current filters)"));
            out.push('\n');
            return out;
        }

        for row in &layout.rows {
            out.push_str(&self.format_row(layout, row, &widths, action_width));
            out.push('\n');
        }

        let summary = format!(
            "{} rows · {} files · {} analyze groups",
            layout.rows.len(),
            layout.leaf_count(),
            layout.groups.len()
        );
        out.push('\n');
        out.push_str(&self.paint_dim(&summary));
        out.push('\n');

        if self.verbose {
            for group in &layout.groups {
                out.push_str(&format!(
                    "  {} ({} files, rows {}-{})\n",
                    group.key,
                    group.members.len(),
                    group.first_row + 1,
                    group.first_row + group.row_span
                ));
            }
        }
        out
    }

    fn format_row(
        &self,
        layout: &TableLayout,
        row: &Row,
        widths: &[usize],
        action_width: usize,
    ) -> String {
        let mut parts = Vec::new();
        let mut column = 0;
        while column < layout.width {
            match row.cell_at(column) {
                Some(cell) => {
                    let width = spanned_width(widths, column, cell.col_span);
                    parts.push(self.paint_cell(cell, &pad(&cell.label, width)));
                    column += cell.col_span.max(1);
                }
                None => {
                    parts.push(" ".repeat(widths[column]));
                    column += 1;
                }
            }
        }

        if let Some(ActionSlot::Start { key, .. }) = &row.action {
            let members = layout
                .group(key.as_str())
                .map(|g| g.members.len())
                .unwrap_or(0);
            let text = format!("[analyze {}]", members);
            parts.push(self.paint_action(&pad(&text, action_width)));
        }

        parts.join(SEPARATOR).trim_end().to_string()
    }

    /// Print the targets composed by an analyze action
    pub fn report_targets(&self, group: &str, targets: &[Target]) {
        println!("{} {}", self.paint_header("Analyze"), group);
        for target in targets {
            let verb = match target.kind {
                TargetKind::Open => "open",
                TargetKind::Download => "download",
                TargetKind::Navigate => "navigate",
            };
            println!("  {:<8} {}", verb, target.url);
        }
    }

    fn paint_header(&self, text: &str) -> String {
        if self.use_colors {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_dim(&self, text: &str) -> String {
        if self.use_colors {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_action(&self, text: &str) -> String {
        if self.use_colors {
            text.blue().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_cell(&self, cell: &Cell, text: &str) -> String {
        if !self.use_colors {
            return text.to_string();
        }
        match cell.category {
            None => text.bold().to_string(),
            Some(FileCategory::JsonQlog) => text.cyan().to_string(),
            Some(FileCategory::Pcap) => text.yellow().to_string(),
            Some(FileCategory::Other) => text.normal().to_string(),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn text_width(text: &str) -> usize {
    text.chars().count()
}

fn pad(text: &str, width: usize) -> String {
    format!("{:<width$}", text, width = width)
}

/// Width of `span` columns starting at `column`, separators included
fn spanned_width(widths: &[usize], column: usize, span: usize) -> usize {
    let end = (column + span.max(1)).min(widths.len());
    widths[column..end].iter().sum::<usize>()
        + SEPARATOR.chars().count() * (end - column).saturating_sub(1)
}

/// Column widths fitting headers and single-column cells; cells spanning
/// several columns widen the last column they cover when needed.
fn column_widths(layout: &TableLayout) -> Vec<usize> {
    let mut widths: Vec<usize> = layout.headers.iter().map(|h| text_width(h)).collect();

    let cells = || layout.rows.iter().flat_map(|r| &r.cells);
    for cell in cells().filter(|c| c.col_span <= 1) {
        widths[cell.column] = widths[cell.column].max(text_width(&cell.label));
    }
    for cell in cells().filter(|c| c.col_span > 1) {
        let available = spanned_width(&widths, cell.column, cell.col_span);
        let needed = text_width(&cell.label);
        if needed > available {
            let last = (cell.column + cell.col_span - 1).min(widths.len() - 1);
            widths[last] += needed - available;
        }
    }
    widths
}

fn action_width(layout: &TableLayout) -> usize {
    layout
        .groups
        .iter()
        .map(|g| text_width(&format!("[analyze {}]", g.members.len())))
        .max()
        .unwrap_or(0)
        .max(ACTION_HEADER.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableBuilder;
    use crate::tree::{RawTree, TreeFilter};
    use crate::CategoryFilter;

    fn headers() -> Vec<String> {
        ["label", "time", "test", "logs"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn layout(group_column: Option<usize>) -> TableLayout {
        let raw = RawTree::new().with_dir(
            "run1",
            RawTree::new()
                .with_dir(
                    "t1",
                    RawTree::new().with_dir(
                        "testA",
                        RawTree::new().with_file("a.json").with_file("b.pcap"),
                    ),
                )
                .with_file("summary.txt"),
        );
        let tree = TreeFilter::new(CategoryFilter::all())
            .filter(&raw, "logs")
            .unwrap();
        TableBuilder::new(headers())
            .with_group_column(group_column)
            .build(&tree)
            .unwrap()
    }

    #[test]
    fn test_render_grid_without_colors() {
        let text = ConsoleReporter::new().without_colors().render(&layout(Some(2)));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "label │ time │ test  │ logs   │ analyze");
        assert_eq!(lines[2], "run1  │ t1   │ testA │ a.json │ [analyze 2]");
        // Spanned cells print blank on the rows they cover
        assert_eq!(lines[3], "      │      │       │ b.pcap");
        // A shallow file runs to the last column
        assert_eq!(lines[4], "      │ summary.txt");
        assert!(text.contains("3 rows · 3 files · 1 analyze groups"));
    }

    #[test]
    fn test_render_without_actions_has_no_action_column() {
        let text = ConsoleReporter::new().without_colors().render(&layout(None));
        assert!(!text.contains("analyze 2"));
        assert!(text.lines().next().unwrap().ends_with("logs"));
    }

    #[test]
    fn test_render_empty_table() {
        let empty = TableBuilder::new(headers()).build_empty().unwrap();
        let text = ConsoleReporter::new().without_colors().render(&empty);
        assert!(text.contains("label │ time │ test │ logs"));
        assert!(text.contains("no log files match"));
    }

    #[test]
    fn test_verbose_lists_groups() {
        let text = ConsoleReporter::new()
            .without_colors()
            .verbose()
            .render(&layout(Some(2)));
        assert!(text.contains("logs/run1/t1/testA (2 files, rows 1-2)"));
    }

    #[test]
    fn test_spanned_width() {
        assert_eq!(spanned_width(&[4, 5, 6], 0, 1), 4);
        assert_eq!(spanned_width(&[4, 5, 6], 1, 2), 5 + 3 + 6);
    }
}
