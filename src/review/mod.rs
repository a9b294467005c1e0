pub mod heuristic;
pub mod response;
pub mod reviewer;

pub use reviewer::{OverrideReviewer, ReviewOutcome, ReviewRequest, ReviewSource};
