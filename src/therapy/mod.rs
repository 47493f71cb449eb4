// Therapy workflows: everything between the HTTP surface and the model.

pub mod assign;
pub mod personalize;
pub mod profile;
pub mod prompts;
pub mod sr;
pub mod vnest;
