//! Defensive parsing of reasoning responses
//!
//! The endpoint is asked for a JSON object but often wraps it in prose.
//! Extraction takes the first `{` through the last `}` and parses that
//! substring; anything less leaves the work item pending for a retry.
//! Field coercion never fails: unparseable delay becomes 0, unparseable
//! confidence becomes 0.5.

use serde_json::Value;

/// Parse failures that leave the queue item pending.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no JSON object found in response")]
    NoJsonObject,
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Validated prediction fields coerced from the raw response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPrediction {
    pub delay_minutes: i64,
    /// In [0, 1]
    pub confidence: f64,
    pub reasoning: String,
}

/// First-`{`-to-last-`}` substring of the response, if any.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Extract, parse, and coerce a prediction from raw response text.
pub fn parse_prediction(text: &str) -> Result<ParsedPrediction, ParseError> {
    let block = extract_json_block(text).ok_or(ParseError::NoJsonObject)?;
    let value: Value = serde_json::from_str(block)?;

    Ok(ParsedPrediction {
        delay_minutes: coerce_delay_minutes(value.get("delay_minutes")),
        confidence: coerce_confidence(value.get("confidence")),
        reasoning: assemble_reasoning(value.get("causes"), value.get("rerouting_suggestion")),
    })
}

/// Coerce a delay value from number or numeric string; 0 on failure.
fn coerce_delay_minutes(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

/// Coerce confidence into [0, 1].
///
/// Textual levels low/medium/high map to 0.3/0.6/0.9; numeric strings and
/// numbers parse directly and are clamped; anything else defaults to 0.5.
fn coerce_confidence(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "low" => 0.3,
            "medium" => 0.6,
            "high" => 0.9,
            other => other
                .parse::<f64>()
                .map_or(0.5, |f| f.clamp(0.0, 1.0)),
        },
        Some(Value::Number(n)) => n.as_f64().map_or(0.5, |f| f.clamp(0.0, 1.0)),
        _ => 0.5,
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Assemble the reasoning text from causes plus optional rerouting note.
fn assemble_reasoning(causes: Option<&Value>, rerouting: Option<&Value>) -> String {
    let causes_text = match causes {
        Some(Value::Array(items)) => items
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join("; "),
        Some(Value::Null) | None => "Unknown".to_string(),
        Some(other) => value_to_text(other),
    };

    let mut reasoning = format!("Causes: {causes_text}");
    if let Some(suggestion) = rerouting {
        if !suggestion.is_null() {
            reasoning.push_str(&format!("\nRerouting: {}", value_to_text(suggestion)));
        }
    }
    reasoning
}
