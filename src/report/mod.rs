//! Report outputs: text report, PNG charts and the interactive plot.

pub mod charts;
pub mod generator;
pub mod interactive;

pub use generator::{
    generate_console_summary, generate_json_summary, generate_skip_summary, write_text_report,
};
pub use interactive::{write_interactive_plot, INTERACTIVE_PLOT};
