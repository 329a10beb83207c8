//! Locate the JSON text payload in a hosted model reply.
//!
//! Replies come in a handful of known shapes. They are checked in a fixed
//! priority order and the first non-empty payload wins:
//!
//! 1. top-level `output_text`
//! 2. `output[]` items of kind `output_text` / `text`
//! 3. `output[]` items carrying a JSON payload (`output_json` / `json`)
//! 4. `output[]` `message` items, searching their `content` parts
//! 5. chat-completions `choices[0].message.content`
//!
//! The module also reads token usage and detects truncated generations.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::cost::Usage;
use crate::error::VisionAnalysisError;

const MAX_MESSAGE_DEPTH: usize = 4;

/// Which reply shape the payload was recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyShape {
    OutputText,
    TextItem,
    JsonItem,
    MessagePart,
    ChatChoice,
}

impl fmt::Display for ReplyShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReplyShape::OutputText => "output_text",
            ReplyShape::TextItem => "text item",
            ReplyShape::JsonItem => "json item",
            ReplyShape::MessagePart => "message part",
            ReplyShape::ChatChoice => "chat choice",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputItem {
    OutputText {
        #[serde(default)]
        text: Option<String>,
    },
    Text {
        #[serde(default)]
        text: Option<String>,
    },
    OutputJson {
        #[serde(default)]
        json: Value,
    },
    Json {
        #[serde(default)]
        json: Value,
    },
    Message {
        #[serde(default)]
        content: Vec<Value>,
    },
    #[serde(other)]
    Other,
}

impl OutputItem {
    fn text(&self) -> Option<String> {
        match self {
            OutputItem::OutputText { text } | OutputItem::Text { text } => {
                text.as_deref().and_then(non_empty)
            }
            _ => None,
        }
    }

    fn json(&self) -> Option<String> {
        match self {
            OutputItem::OutputJson { json } | OutputItem::Json { json } => json_payload(json),
            _ => None,
        }
    }
}

/// Return the payload text believed to contain JSON, or `None` for an empty reply.
pub fn extract_text(reply: &Value) -> Option<String> {
    extract_payload(reply).map(|(_, text)| text)
}

pub fn extract_payload(reply: &Value) -> Option<(ReplyShape, String)> {
    if let Some(text) = reply
        .get("output_text")
        .and_then(Value::as_str)
        .and_then(non_empty)
    {
        return Some((ReplyShape::OutputText, text));
    }

    let items = output_items(reply);

    if let Some(text) = items.iter().find_map(OutputItem::text) {
        return Some((ReplyShape::TextItem, text));
    }

    if let Some(text) = items.iter().find_map(OutputItem::json) {
        return Some((ReplyShape::JsonItem, text));
    }

    if let Some(text) = items.iter().find_map(|item| match item {
        OutputItem::Message { content } => message_text(content, 1),
        _ => None,
    }) {
        return Some((ReplyShape::MessagePart, text));
    }

    chat_choice_text(reply).map(|text| (ReplyShape::ChatChoice, text))
}

/// True when `value` is a raw provider envelope rather than the analysis JSON itself.
pub fn looks_like_provider_reply(value: &Value) -> bool {
    ["output_text", "output", "choices"]
        .iter()
        .any(|key| value.get(*key).is_some())
}

fn output_items(reply: &Value) -> Vec<OutputItem> {
    reply
        .get("output")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().filter_map(decode_item).collect())
        .unwrap_or_default()
}

fn decode_item(value: &Value) -> Option<OutputItem> {
    OutputItem::deserialize(value).ok()
}

fn message_text(content: &[Value], depth: usize) -> Option<String> {
    if depth > MAX_MESSAGE_DEPTH {
        return None;
    }
    content.iter().filter_map(decode_item).find_map(|part| match &part {
        OutputItem::Message { content } => message_text(content, depth + 1),
        _ => part.text().or_else(|| part.json()),
    })
}

fn chat_choice_text(reply: &Value) -> Option<String> {
    let content = reply
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?;
    match content {
        Value::String(text) => non_empty(text),
        // Some gateways return content as a list of typed parts.
        Value::Array(parts) => message_text(parts, 1),
        _ => None,
    }
}

fn json_payload(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => non_empty(text),
        other => Some(other.to_string()),
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Fail when the provider reports that generation stopped early.
pub fn ensure_complete(reply: &Value) -> Result<(), VisionAnalysisError> {
    if reply.get("status").and_then(Value::as_str) == Some("incomplete") {
        let reason = reply
            .get("incomplete_details")
            .and_then(|details| details.get("reason"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        return Err(VisionAnalysisError::Incomplete { reason });
    }

    let finish_reason = reply
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("finish_reason"))
        .and_then(Value::as_str);
    if let Some(reason @ ("length" | "content_filter")) = finish_reason {
        return Err(VisionAnalysisError::Incomplete {
            reason: Some(reason.to_string()),
        });
    }

    Ok(())
}

/// Token usage reported with the reply; `None` unless both counts are present.
pub fn extract_usage(reply: &Value) -> Option<Usage> {
    let usage = reply.get("usage")?.as_object()?;
    let input_tokens = read_count(usage, &["input_tokens", "prompt_tokens"])?;
    let output_tokens = read_count(usage, &["output_tokens", "completion_tokens"])?;
    Some(Usage {
        input_tokens,
        output_tokens,
    })
}

fn read_count(object: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find_map(nonnegative_count)
}

fn nonnegative_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}
