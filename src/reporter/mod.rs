//! Render sinks: turn a `TableLayout` into terminal, JSON or HTML output

pub mod console;
pub mod html;
pub mod json;

pub use console::ConsoleReporter;
pub use html::HtmlReporter;
pub use json::JsonReporter;
