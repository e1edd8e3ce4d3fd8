use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::error::ToolCallParseError;
use crate::extract::balanced_span;
use crate::models::tool::ToolCall;

lazy_static! {
    // Brackets around the name are tolerated, some models copy them from the prompt.
    static ref TOOL_CALL: Regex =
        Regex::new(r"toolCall:\s*\[?([A-Za-z_][A-Za-z0-9_-]*)\]?\s*\(\s*").unwrap();
}

/// Find the first `toolCall: <name>(<JSON object>)` in backend text.
///
/// Returns `Ok(None)` when the text holds no tool-call token, and an error when the token is
/// present but the call cannot be read. Nested objects in the arguments are supported.
pub fn parse_tool_call(text: &str) -> Result<Option<ToolCall>, ToolCallParseError> {
    let Some(captures) = TOOL_CALL.captures(text) else {
        return Ok(None);
    };
    let name = captures[1].to_string();
    let Some(whole) = captures.get(0) else {
        return Ok(None);
    };
    let start = whole.end();

    if !text[start..].starts_with('{') {
        return Err(ToolCallParseError::MissingArguments(name));
    }
    let end = balanced_span(text, start).ok_or_else(|| ToolCallParseError::MalformedArguments {
        name: name.clone(),
        reason: "unbalanced braces".to_string(),
    })?;

    let arguments = match serde_json::from_str::<Value>(&text[start..end]) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            return Err(ToolCallParseError::MalformedArguments {
                name,
                reason: "expected a JSON object".to_string(),
            })
        }
        Err(e) => {
            return Err(ToolCallParseError::MalformedArguments {
                name,
                reason: e.to_string(),
            })
        }
    };

    if !text[end..].trim_start().starts_with(')') {
        return Err(ToolCallParseError::Unterminated(name));
    }

    Ok(Some(ToolCall::new(name, arguments)))
}
