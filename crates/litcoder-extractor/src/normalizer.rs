//! Turn raw model output into an extraction record
//!
//! Models asked for JSON still sometimes wrap it in a code fence, prefix a
//! `json` hint, or add a sentence of prose. Parsing happens in two stages:
//! a strict parse of the whole text, then a repair pass that strips the
//! wrappers and locates the object with a string-aware brace scan.

use crate::error::ParseError;
use litcoder_domain::{ExtractionRecord, FieldValue};
use serde_json::{Map, Value};
use tracing::debug;

/// Parse model output into a record identified by `name`
///
/// The item name is written to `id_field` as the first field; a field of
/// the same name in the model output is ignored.
pub fn normalize(raw: &str, id_field: &str, name: &str) -> Result<ExtractionRecord, ParseError> {
    let object = parse_object(raw)?;

    let mut record = ExtractionRecord::identified(id_field, name);
    for (field, value) in object {
        if field == id_field {
            debug!("Dropping model-supplied '{}' field for {}", id_field, name);
            continue;
        }
        record.insert(field, to_field_value(value));
    }
    Ok(record)
}

/// Parse model output into a JSON object, repairing common wrappers
pub fn parse_object(raw: &str) -> Result<Map<String, Value>, ParseError> {
    // Stage 1: the text is already a JSON document
    if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
        return match value {
            Value::Object(map) => Ok(map),
            other => Err(ParseError(format!(
                "Expected a JSON object, got {}",
                json_kind(&other)
            ))),
        };
    }

    // Stage 2: strip wrappers and locate the object
    let cleaned = strip_wrappers(raw);
    if !cleaned.contains('{') || !cleaned.contains('}') {
        return Err(ParseError("No JSON object in model response".to_string()));
    }

    let candidates = balanced_objects(cleaned).chain(brace_span(cleaned));
    for candidate in candidates {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(candidate) {
            return Ok(map);
        }
    }

    Err(ParseError("Could not parse a JSON object from model response".to_string()))
}

/// Remove code-fence markers and a leading `json` format hint
fn strip_wrappers(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }

    let trimmed = text.trim_start();
    let hint_len = "json".len();
    let has_hint = trimmed
        .get(..hint_len)
        .is_some_and(|head| head.eq_ignore_ascii_case("json"));
    if has_hint {
        let after = &trimmed[hint_len..];
        // Only a standalone token counts, not the start of a word
        if after.is_empty() || after.starts_with(|c: char| c.is_whitespace() || c == '{') {
            text = after;
        }
    }

    text.trim()
}

/// Every balanced `{ ... }` span, one per opening brace, in order
///
/// Braces inside string literals (including escaped quotes) do not count
/// toward depth.
fn balanced_objects(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .filter(|&(_, c)| c == '{')
        .filter_map(move |(start, _)| scan_object(text, start))
}

fn scan_object(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Substring from the first `{` to the last `}`
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Convert a JSON value to a field value
fn to_field_value(value: Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Empty,
        Value::String(s) => FieldValue::Text(s),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Integer(i),
            None => FieldValue::Text(n.to_string()),
        },
        Value::Array(items) if items.iter().all(Value::is_string) => FieldValue::List(
            items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        Value::Bool(b) => FieldValue::Text(b.to_string()),
        other => FieldValue::Text(other.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn field_map() -> impl Strategy<Value = Map<String, Value>> {
        prop::collection::vec(("[A-Za-z_]{1,12}", ".{0,40}"), 1..6).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect()
        })
    }

    proptest! {
        /// Property: a fenced block with a language hint repairs to the same object
        #[test]
        fn test_fenced_repair_matches_direct_parse(map in field_map(), pretty in any::<bool>()) {
            let body = if pretty {
                serde_json::to_string_pretty(&Value::Object(map.clone())).unwrap()
            } else {
                serde_json::to_string(&Value::Object(map.clone())).unwrap()
            };
            let fenced = format!("```json\n{}\n```", body);

            let direct = parse_object(&body).unwrap();
            let repaired = parse_object(&fenced).unwrap();
            prop_assert_eq!(&repaired, &direct);
            prop_assert_eq!(&repaired, &map);
        }

        /// Property: text without braces always yields a parse error, never a panic
        #[test]
        fn test_braceless_text_is_parse_error(text in "[^{}]{0,200}") {
            prop_assert!(normalize(&text, "File_Name", "x.pdf").is_err());
        }

        /// Property: arbitrary input never panics
        #[test]
        fn test_arbitrary_input_does_not_panic(text in ".{0,300}") {
            let _ = normalize(&text, "File_Name", "x.pdf");
        }
    }
}
