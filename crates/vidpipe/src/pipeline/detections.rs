//! Validation of detection stage output.

use serde_json::Value;

use super::error::PipelineError;

const MAX_DIAGNOSTIC_BYTES: usize = 512;

/// Extracts the array of detection records from a detection response body.
///
/// The body must be a JSON array, possibly surrounded by other text the
/// model process printed. A JSON object with an error key is the model's
/// explicit error payload. Anything else is malformed.
pub fn parse_detections(body: &str) -> Result<Vec<Value>, PipelineError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::MalformedDetections(
            "empty detection output".to_string(),
        ));
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(Value::Object(map)) if map.keys().any(|k| k.to_lowercase().contains("error")) => Err(
            PipelineError::DetectionReported(truncate(trimmed).to_string()),
        ),
        Ok(_) => Err(PipelineError::MalformedDetections(
            truncate(trimmed).to_string(),
        )),
        Err(_) => embedded_array(trimmed)
            .ok_or_else(|| PipelineError::MalformedDetections(truncate(trimmed).to_string())),
    }
}

/// Finds a JSON array between the first `[` and the last `]`.
fn embedded_array(text: &str) -> Option<Vec<Value>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Shortens raw output kept for diagnostics, on a char boundary.
pub fn truncate(raw: &str) -> &str {
    if raw.len() <= MAX_DIAGNOSTIC_BYTES {
        return raw;
    }
    let mut end = MAX_DIAGNOSTIC_BYTES;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    &raw[..end]
}
