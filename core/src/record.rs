//! Decoding of uploaded movie payloads into field maps.
//!
//! Accepted shapes: a `{"results": [...]}` envelope, a bare array of records,
//! a single record object, or JSON Lines. Only string values are kept, so a
//! record whose `title` is `null` or a number is later rejected as malformed.

use crate::error::{Error, Result};
use crate::index::FieldMap;
use serde_json::Value;

pub fn parse_records(payload: &[u8]) -> Result<Vec<FieldMap>> {
    match serde_json::from_slice::<Value>(payload) {
        Ok(value) => records_from_value(value),
        Err(whole) => parse_json_lines(payload).map_err(|lines| match lines {
            // Report the whole-document error unless the payload looked like JSON Lines.
            Error::InvalidPayload(_) if !looks_like_lines(payload) => Error::InvalidPayload(whole.to_string()),
            other => other,
        }),
    }
}

fn looks_like_lines(payload: &[u8]) -> bool {
    payload.iter().filter(|&&b| b == b'\n').count() > 1
}

fn parse_json_lines(payload: &[u8]) -> Result<Vec<FieldMap>> {
    let text = std::str::from_utf8(payload).map_err(|e| Error::InvalidPayload(e.to_string()))?;
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .map_err(|e| Error::InvalidPayload(format!("line {}: {e}", lineno + 1)))?;
        out.push(record_from_value(out.len(), value)?);
    }
    if out.is_empty() {
        return Err(Error::InvalidPayload("no records".into()));
    }
    Ok(out)
}

fn records_from_value(value: Value) -> Result<Vec<FieldMap>> {
    match value {
        Value::Object(mut obj) if obj.contains_key("results") => match obj.remove("results") {
            Some(Value::Array(items)) => items_to_records(items),
            _ => Err(Error::InvalidPayload("`results` must be an array".into())),
        },
        Value::Array(items) => items_to_records(items),
        obj @ Value::Object(_) => Ok(vec![record_from_value(0, obj)?]),
        _ => Err(Error::InvalidPayload("expected an object or an array of objects".into())),
    }
}

fn items_to_records(items: Vec<Value>) -> Result<Vec<FieldMap>> {
    items.into_iter().enumerate().map(|(i, v)| record_from_value(i, v)).collect()
}

fn record_from_value(index: usize, value: Value) -> Result<FieldMap> {
    match value {
        Value::Object(obj) => Ok(obj
            .into_iter()
            .filter_map(|(k, v)| match v {
                Value::String(s) => Some((k, s)),
                _ => None,
            })
            .collect()),
        _ => Err(Error::InvalidPayload(format!("record {index} is not an object"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_keeps_string_fields() {
        let payload = br#"{"page":1,"results":[{"id":603,"title":"The Matrix","overview":"Neo","adult":false}]}"#;
        let records = parse_records(payload).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("title").map(String::as_str), Some("The Matrix"));
        assert_eq!(records[0].get("overview").map(String::as_str), Some("Neo"));
        assert!(!records[0].contains_key("id"));
    }

    #[test]
    fn bare_array_and_single_object() {
        let records = parse_records(br#"[{"title":"A","overview":"x"},{"title":"B","overview":"y"}]"#).unwrap();
        assert_eq!(records.len(), 2);
        let records = parse_records(br#"{"title":"A","overview":"x"}"#).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn json_lines() {
        let payload = b"{\"title\":\"A\",\"overview\":\"x\"}\n\n{\"title\":\"B\",\"overview\":null}\n";
        let records = parse_records(payload).unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[1].contains_key("overview"));
    }

    #[test]
    fn invalid_payloads() {
        assert!(matches!(parse_records(b"not json"), Err(Error::InvalidPayload(_))));
        assert!(matches!(parse_records(br#"{"results": 3}"#), Err(Error::InvalidPayload(_))));
        assert!(matches!(parse_records(br#"[1, 2]"#), Err(Error::InvalidPayload(_))));
        assert!(matches!(parse_records(b""), Err(Error::InvalidPayload(_))));
    }
}
