pub mod formatting;
pub mod truncation;
