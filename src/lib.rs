pub mod agent;
pub mod browser;
pub mod cli;
pub mod config;
pub mod errors;
pub mod llm;
pub mod models;
pub mod recording;
pub mod reporting;
pub mod review;
pub mod suite;
pub mod utils;
