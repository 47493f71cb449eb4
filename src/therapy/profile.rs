//! Profile structuring: free clinical text in, structured profile out.
//! Nothing is persisted; the caller owns the profile document.

use crate::error::AppResult;
use crate::llm::PromptOptions;
use crate::state::AppState;
use crate::therapy::prompts;
use serde_json::{json, Value};

const OPTS: PromptOptions = PromptOptions {
    system: prompts::SYSTEM_PROFILE,
    temperature: 0.2,
    max_tokens: 1500,
};

pub async fn run(state: &AppState, user_id: &str, raw_text: &str) -> AppResult<Value> {
    let structured = state
        .llm
        .chat_json(
            "profile.structure",
            &prompts::profile_structure_prompt(raw_text, user_id),
            OPTS,
        )
        .await?;

    Ok(json!({
        "ok": true,
        "user_id": user_id,
        "structured_profile": structured,
    }))
}
