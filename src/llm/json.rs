use super::LlmError;

/// Parse model output as a JSON object, tolerating a surrounding code fence
/// with or without a language tag.
pub fn extract_json(content: &str) -> Result<serde_json::Value, LlmError> {
    let text = strip_code_fence(content.trim());

    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| LlmError::JsonParsing(e.to_string()))?;

    if !value.is_object() {
        return Err(LlmError::MalformedResponse(
            "Expected a JSON object".into(),
        ));
    }
    Ok(value)
}

fn strip_code_fence(text: &str) -> &str {
    if !text.starts_with("```") {
        return text;
    }
    // Drop the opening fence line, language tag included.
    let body = match text.find('\n') {
        Some(idx) => &text[idx + 1..],
        None => return "",
    };
    let body = body.trim_end();
    let body = match body.rfind('\n') {
        Some(idx) if body[idx + 1..].trim_start().starts_with("```") => &body[..idx],
        None if body.trim_start().starts_with("```") => "",
        _ => body,
    };
    body.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_parsed() {
        let value = extract_json(r#"{"items": []}"#).unwrap();
        assert!(value["items"].as_array().unwrap().is_empty());
    }

    #[test]
    fn fenced_json_with_language_tag() {
        let content = "```json\n{\"problem\": \"p\"}\n```";
        let value = extract_json(content).unwrap();
        assert_eq!(value["problem"], "p");
    }

    #[test]
    fn fenced_json_without_language_tag() {
        let content = "  ```\n{\"a\": 1}\n```  ";
        let value = extract_json(content).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn unclosed_fence_still_parsed() {
        let content = "```json\n{\"a\": 2}";
        let value = extract_json(content).unwrap();
        assert_eq!(value["a"], 2);
    }

    #[test]
    fn prose_rejected() {
        let err = extract_json("Sure! Here are the scores.").unwrap_err();
        assert!(matches!(err, LlmError::JsonParsing(_)));
    }

    #[test]
    fn non_object_rejected() {
        let err = extract_json("[1, 2]").unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }
}
