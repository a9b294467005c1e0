pub mod action;
pub mod expectations;
pub mod observation;
pub mod parser;
pub mod prompt;
pub mod result;
pub mod runner;

pub use action::Action;
pub use expectations::{evaluate, evaluate_all, Expectation, ExpectationKind, ExpectationResult};
pub use observation::{Observation, ObservationCollector};
pub use result::{ActionOutcome, ActionRecord, DebugBundle, StepResult};
pub use runner::{AgentRunner, StepSpec};
