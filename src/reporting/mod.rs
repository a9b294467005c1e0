pub mod formatter;
pub mod writer;

pub use writer::write_run_report;
