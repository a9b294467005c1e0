pub mod case_result;
pub mod run_report;

pub use case_result::*;
pub use run_report::*;
