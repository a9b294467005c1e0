pub mod provider;
pub mod openai;
pub mod local;
pub mod router;
pub mod types;
pub mod catalog;
mod http;

pub use provider::LLMProvider;
pub use router::create_provider;
pub use types::{ChatOptions, LLMResponse, Message};
