pub mod api;
pub mod core;
pub mod error;
pub mod llm;
pub mod state;
pub mod therapy;
