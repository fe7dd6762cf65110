//! Prompt text and pseudo-tool declarations.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::llm::ToolDeclaration;

pub const DIRECT_ANSWER: &str = "direct_answer";
pub const REQUEST_CLARIFICATION: &str = "request_clarification";
pub const REQUEST_CONFIRMATION: &str = "request_confirmation";

pub const INTENT_SYSTEM: &str = "\
You are an assistant that analyzes user requests for a personal assistant.
Decide exactly one of:
1. Call one or more of the real tools with complete parameters.
2. Call direct_answer when no tool is needed.
3. Call request_clarification when required information is missing.
4. Call request_confirmation before an action the user should approve.

Rules:
- Resolve relative dates and times ('tomorrow at 9am') against the current time given in the message.
- Call store_memory once per piece of information; never aggregate.
- Use retrieve_memory whenever the answer may have been stored earlier.
- Use perform_deep_search for current events or facts you may not know. Never simulate search results.
- Never run more than 10 search queries; if asked for more, answer directly that you can run at most 10.
- When the user answers a clarification question, complete the previous request using the PREVIOUS CONTEXT.

If you cannot call tools, reply with ONLY a JSON object:
{\"action\": \"use_tool\" | \"direct_answer\" | \"clarify\" | \"confirmation\" | \"error\",
 \"tool_name\": ..., \"parameters\": {...},
 \"clarification_question\": ..., \"request_confirmation\": ...,
 \"error_message\": ..., \"execution_plan\": [{\"tool_name\": ..., \"parameters\": {...}}]}";

pub const COMPOSER_SYSTEM: &str = "\
You are a helpful personal assistant writing the final reply to the user.
Formatting: use only these HTML tags: <b>, <i>, <u>, <s>, <pre>, <a href=\"...\">, <blockquote>.
Use plain newlines for line breaks and paragraphs. Never use <br>, Markdown, or code fences.
When tool results are provided:
- Base the answer exclusively on them. Never invent facts, dates, or results.
- Always include the source links from search results as <a> tags.
- If a result reports an error, not_found, or ambiguous status, explain it plainly and say what the user can do next.
When no tool results are provided, reply conversationally and briefly.";

/// Classification prompt for one inbound message.
pub fn intent_prompt(message: &str, previous: Option<&Value>, now: DateTime<Utc>) -> String {
    let body = match previous {
        Some(prev) => format!(
            "PREVIOUS CONTEXT: {prev}\n\nUser's response to the clarification request: \"{message}\"\n\n\
             Based on this response, complete the previous request with all necessary parameters."
        ),
        None => format!("Analyze this user request and determine which action to take:\n\n\"{message}\""),
    };
    format!("{body}\n\nCurrent time is: {}", now.to_rfc3339())
}

pub fn composer_prompt(
    message: &str,
    tool_results: Option<&Value>,
    draft: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    match (tool_results, draft) {
        (Some(results), _) => format!(
            "User request: \"{message}\"\n\nTool results (JSON):\n{results}\n\n\
             Write the reply using only these results.\n\nCurrent time is: {}",
            now.to_rfc3339()
        ),
        (None, Some(draft)) => format!(
            "User message: \"{message}\"\n\nDraft answer:\n{draft}\n\n\
             Rewrite the draft as the final reply, following the formatting rules.\n\nCurrent time is: {}",
            now.to_rfc3339()
        ),
        (None, None) => format!(
            "User message: \"{message}\"\n\nCurrent time is: {}",
            now.to_rfc3339()
        ),
    }
}

pub fn pseudo_tool_declarations() -> Vec<ToolDeclaration> {
    vec![
        ToolDeclaration {
            name: DIRECT_ANSWER.into(),
            description: "Answer without using any tool (greetings, general knowledge, chit-chat).".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "answer": {"type": "string", "description": "Optional draft of the answer"}
                }
            }),
        },
        ToolDeclaration {
            name: REQUEST_CLARIFICATION.into(),
            description: "Ask the user for missing information needed to complete the request.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "question": {"type": "string", "description": "The question to ask the user"}
                },
                "required": ["question"]
            }),
        },
        ToolDeclaration {
            name: REQUEST_CONFIRMATION.into(),
            description: "Ask the user to confirm an action before performing it.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "question": {"type": "string", "description": "The confirmation question"},
                    "details": {"type": "object", "description": "What will be done if the user confirms"}
                },
                "required": ["question"]
            }),
        },
    ]
}

pub fn is_pseudo_tool(name: &str) -> bool {
    matches!(name, DIRECT_ANSWER | REQUEST_CLARIFICATION | REQUEST_CONFIRMATION)
}
