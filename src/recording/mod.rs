pub mod codegen;
pub mod generator;
pub mod scorer;
pub mod sidecars;
pub mod types;

pub use generator::{generate, parse_recording, GenerateOptions, GenerationReport};
pub use scorer::{best_selector, score_selector, ScoredSelector};
pub use types::{RecordedStep, Recording, StepKind};
