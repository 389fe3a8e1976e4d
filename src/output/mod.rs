//! Output formatting: the CSV report, the console summary, and the JSON summary

pub mod csv;
pub mod json;
pub mod text;

pub use csv::write_report;
pub use json::{write_json_summary, RunSummary};
pub use text::print_summary;
