// Adapters: file-based dataset input and report output for the CLI.

pub mod file;

pub use file::{load_dataset, render_report, write_output};
