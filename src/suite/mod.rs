pub mod runner;
pub mod testcase;
pub mod variables;

pub use runner::SuiteRunner;
pub use testcase::{load_suite, LoadedCase, LoadedSuite, TestCase, TestStep};
