//! Report rendering: console text plus persisted Markdown and JSON.

pub mod console;
pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report};
