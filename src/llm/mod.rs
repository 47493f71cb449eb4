// Upstream model integration: client, output repair, call log.

pub mod client;
pub mod log_store;
pub mod parse;

pub use client::{LlmClient, LlmSettings, PromptOptions};
pub use log_store::{LogStore, ModelCallEntry};
