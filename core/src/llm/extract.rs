// Copyright (c) 2025 ByteDance Ltd. and/or its affiliates
// SPDX-License-Identifier: MIT

//! Normalization of upstream completion responses.
//!
//! Providers disagree on where the useful part of a response lives. Text may
//! arrive as a plain string or as a list of typed parts, and images may be a
//! content part, an entry in `message.images`, or a top-level `data` entry.
//! Each location is handled by a small total strategy; the strategies are
//! tried in a fixed order and the first match wins.

use log::error;
use serde_json::Value;

use crate::llm::error::{LLMError, LLMResult};
use crate::llm::llm_basics::{NormalizedResult, OperationKind};

/// A single image lookup. Receives the whole response and `choices[0].message`.
type ImageStrategy = fn(&Value, &Value) -> Option<String>;

const IMAGE_STRATEGIES: [(&str, ImageStrategy); 3] = [
    ("content_part", image_from_content_parts),
    ("message_images", image_from_message_images),
    ("data_array", image_from_data_array),
];

/// Classify and normalize a raw upstream reply
pub fn normalize_response(status: u16, body: &str, kind: OperationKind) -> LLMResult<NormalizedResult> {
    if !(200..300).contains(&status) {
        return Err(LLMError::UpstreamHttpError {
            status_code: status,
            body: body.to_string(),
        });
    }

    let response: Value = serde_json::from_str(body)
        .map_err(|e| LLMError::MalformedResponse(e.to_string()))?;

    if let Some(message) = api_error_message(&response) {
        error!("Upstream API returned an error object: {}", message);
        return Err(LLMError::UpstreamApiError { message });
    }

    let message = first_message(&response)?;

    match kind {
        OperationKind::Text | OperationKind::Reasoning => extract_text(message).map(NormalizedResult::Text),
        OperationKind::Image => extract_image(&response, message).map(NormalizedResult::ImageRef),
    }
}

fn api_error_message(response: &Value) -> Option<String> {
    match response.get("error")? {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        Value::Object(fields) => Some(match fields.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => Value::Object(fields.clone()).to_string(),
        }),
        other => Some(other.to_string()),
    }
}

fn first_message(response: &Value) -> LLMResult<&Value> {
    let choice = response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| LLMError::UnexpectedShape("response has no choices".to_string()))?;

    // A choice without a message is treated like an empty message so the
    // image lookup can still fall through to `data`.
    static EMPTY: Value = Value::Null;
    Ok(choice.get("message").unwrap_or(&EMPTY))
}

/// Extract plain text from `choices[0].message`
pub fn extract_text(message: &Value) -> LLMResult<String> {
    match message.get("content") {
        Some(Value::String(content)) => {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                Err(LLMError::UnexpectedShape("message content is empty".to_string()))
            } else {
                Ok(trimmed.to_string())
            }
        }
        Some(Value::Array(parts)) => {
            let texts: Vec<String> = parts.iter().filter_map(text_of_part).collect();
            if texts.is_empty() {
                error!("No text parts found in list content of {} parts", parts.len());
                Err(LLMError::UnexpectedShape("message content has no text parts".to_string()))
            } else {
                Ok(texts.join("\n"))
            }
        }
        Some(other) => Err(LLMError::UnexpectedShape(format!(
            "message content has unsupported type: {}",
            json_type(other)
        ))),
        None => Err(LLMError::UnexpectedShape("message has no content".to_string())),
    }
}

fn text_of_part(part: &Value) -> Option<String> {
    match part {
        Value::String(text) => Some(text.clone()),
        Value::Object(fields) => {
            if fields.get("type").and_then(Value::as_str) == Some("text") {
                if let Some(text) = fields.get("text").and_then(Value::as_str).filter(|t| !t.is_empty()) {
                    return Some(text.to_string());
                }
            }
            match fields.get("content")? {
                Value::Null => None,
                Value::String(text) if text.is_empty() => None,
                Value::String(text) => Some(text.clone()),
                other => Some(other.to_string()),
            }
        }
        _ => None,
    }
}

/// Extract an image reference, trying every strategy in order
pub fn extract_image(response: &Value, message: &Value) -> LLMResult<String> {
    IMAGE_STRATEGIES
        .iter()
        .find_map(|(_, strategy)| strategy(response, message))
        .ok_or_else(|| {
            let tried: Vec<&str> = IMAGE_STRATEGIES.iter().map(|(name, _)| *name).collect();
            error!("No image reference found (tried {})", tried.join(", "));
            LLMError::UnexpectedShape("response has no image url".to_string())
        })
}

fn image_url_of(value: &Value) -> Option<String> {
    value
        .get("image_url")?
        .get("url")?
        .as_str()
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

fn image_from_content_parts(_response: &Value, message: &Value) -> Option<String> {
    message
        .get("content")?
        .as_array()?
        .iter()
        .filter(|part| matches!(part.get("type").and_then(Value::as_str), Some("image" | "output_image")))
        .find_map(image_url_of)
}

fn image_from_message_images(_response: &Value, message: &Value) -> Option<String> {
    image_url_of(message.get("images")?.as_array()?.first()?)
}

fn image_from_data_array(response: &Value, _message: &Value) -> Option<String> {
    response
        .get("data")?
        .as_array()?
        .first()?
        .get("url")?
        .as_str()
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok(body: Value, kind: OperationKind) -> LLMResult<NormalizedResult> {
        normalize_response(200, &body.to_string(), kind)
    }

    #[test]
    fn test_string_content_is_trimmed() {
        let body = json!({"choices": [{"message": {"content": "  X \n"}}]});
        assert_eq!(ok(body, OperationKind::Text), Ok(NormalizedResult::Text("X".to_string())));
    }

    #[test]
    fn test_reasoning_uses_text_path() {
        let body = json!({"choices": [{"message": {"content": "42"}}]});
        assert_eq!(ok(body, OperationKind::Reasoning), Ok(NormalizedResult::Text("42".to_string())));
    }

    #[test]
    fn test_list_content_is_joined() {
        let body = json!({"choices": [{"message": {"content": [
            {"type": "text", "text": "A"},
            {"type": "text", "text": "B"}
        ]}}]});
        assert_eq!(ok(body, OperationKind::Text), Ok(NormalizedResult::Text("A\nB".to_string())));
    }

    #[test]
    fn test_list_content_mixes_strings_and_generic_content() {
        let body = json!({"choices": [{"message": {"content": [
            "first",
            {"type": "output_image", "image_url": {"url": "U"}},
            {"content": "second"},
            {"type": "text", "text": ""}
        ]}}]});
        assert_eq!(
            ok(body, OperationKind::Text),
            Ok(NormalizedResult::Text("first\nsecond".to_string()))
        );
    }

    #[test]
    fn test_list_without_text_is_unexpected_shape() {
        let body = json!({"choices": [{"message": {"content": [
            {"type": "output_image", "image_url": {"url": "U"}}
        ]}}]});
        assert!(matches!(ok(body, OperationKind::Text), Err(LLMError::UnexpectedShape(_))));
    }

    #[test]
    fn test_missing_or_empty_content() {
        let empty = json!({"choices": [{"message": {"content": "   "}}]});
        assert!(matches!(ok(empty, OperationKind::Text), Err(LLMError::UnexpectedShape(_))));

        let missing = json!({"choices": [{"message": {"role": "assistant"}}]});
        assert!(matches!(ok(missing, OperationKind::Text), Err(LLMError::UnexpectedShape(_))));

        let numeric = json!({"choices": [{"message": {"content": 7}}]});
        assert!(matches!(ok(numeric, OperationKind::Text), Err(LLMError::UnexpectedShape(_))));
    }

    #[test]
    fn test_non_success_status() {
        let result = normalize_response(500, "boom", OperationKind::Text);
        assert_eq!(
            result,
            Err(LLMError::UpstreamHttpError { status_code: 500, body: "boom".to_string() })
        );
    }

    #[test]
    fn test_malformed_json() {
        let result = normalize_response(200, "<html>oops</html>", OperationKind::Text);
        assert!(matches!(result, Err(LLMError::MalformedResponse(_))));
    }

    #[test]
    fn test_error_body_with_success_status() {
        let result = ok(json!({"error": "rate limited"}), OperationKind::Text);
        assert_eq!(result, Err(LLMError::UpstreamApiError { message: "rate limited".to_string() }));

        let result = ok(json!({"error": {"message": "quota", "code": 429}}), OperationKind::Image);
        assert_eq!(result, Err(LLMError::UpstreamApiError { message: "quota".to_string() }));
    }

    #[test]
    fn test_error_without_message_uses_json_text() {
        let result = ok(json!({"error": {"code": 503}}), OperationKind::Text);
        assert_eq!(result, Err(LLMError::UpstreamApiError { message: r#"{"code":503}"#.to_string() }));

        let result = ok(json!({"error": {"message": 7}}), OperationKind::Text);
        assert_eq!(result, Err(LLMError::UpstreamApiError { message: r#"{"message":7}"#.to_string() }));

        let result = ok(json!({"error": 42, "choices": [{"message": {"content": "x"}}]}), OperationKind::Text);
        assert_eq!(result, Err(LLMError::UpstreamApiError { message: "42".to_string() }));

        let result = ok(json!({"error": true}), OperationKind::Image);
        assert_eq!(result, Err(LLMError::UpstreamApiError { message: "true".to_string() }));
    }

    #[test]
    fn test_null_error_is_ignored() {
        let body = json!({"error": null, "choices": [{"message": {"content": "fine"}}]});
        assert_eq!(ok(body, OperationKind::Text), Ok(NormalizedResult::Text("fine".to_string())));
    }

    #[test]
    fn test_missing_or_empty_choices() {
        assert!(matches!(ok(json!({}), OperationKind::Text), Err(LLMError::UnexpectedShape(_))));
        assert!(matches!(
            ok(json!({"choices": []}), OperationKind::Image),
            Err(LLMError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn test_image_from_message_images() {
        let body = json!({"choices": [{"message": {"images": [{"image_url": {"url": "U"}}]}}]});
        assert_eq!(ok(body, OperationKind::Image), Ok(NormalizedResult::ImageRef("U".to_string())));
    }

    #[test]
    fn test_image_strategy_precedence() {
        let body = json!({
            "choices": [{"message": {
                "content": [{"type": "output_image", "image_url": {"url": "from-part"}}],
                "images": [{"image_url": {"url": "from-images"}}]
            }}],
            "data": [{"url": "from-data"}]
        });
        assert_eq!(ok(body, OperationKind::Image), Ok(NormalizedResult::ImageRef("from-part".to_string())));

        let body = json!({
            "choices": [{"message": {
                "content": "here is your image",
                "images": [{"image_url": {"url": "from-images"}}]
            }}],
            "data": [{"url": "from-data"}]
        });
        assert_eq!(ok(body, OperationKind::Image), Ok(NormalizedResult::ImageRef("from-images".to_string())));

        let body = json!({
            "choices": [{"message": {"content": ""}}],
            "data": [{"url": "from-data"}]
        });
        assert_eq!(ok(body, OperationKind::Image), Ok(NormalizedResult::ImageRef("from-data".to_string())));
    }

    #[test]
    fn test_image_part_requires_url() {
        let body = json!({"choices": [{"message": {"content": [
            {"type": "image"},
            {"type": "image", "image_url": {"url": "data:image/png;base64,AAAA"}}
        ]}}]});
        assert_eq!(
            ok(body, OperationKind::Image),
            Ok(NormalizedResult::ImageRef("data:image/png;base64,AAAA".to_string()))
        );
    }

    #[test]
    fn test_bare_b64_json_data_is_not_an_image_ref() {
        let body = json!({"choices": [{"message": {"content": ""}}], "data": [{"b64_json": "aGVsbG8="}]});
        assert!(matches!(ok(body, OperationKind::Image), Err(LLMError::UnexpectedShape(_))));
    }

    #[test]
    fn test_image_missing_everywhere() {
        let body = json!({"choices": [{"message": {"content": "sorry, I can't draw"}}]});
        assert!(matches!(ok(body, OperationKind::Image), Err(LLMError::UnexpectedShape(_))));
    }
}
