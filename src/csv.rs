//! Tabular encoding of recorded events.
//!
//! Header row is the keys of the first record, in declaration order. Each
//! cell is the JSON encoding of the value; `null` and missing keys become
//! empty cells. Rows are separated by `\n` with no trailing newline.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{GateError, Result};

/// Encode records as CSV text. No records yields empty text.
pub fn to_csv<T: Serialize>(records: &[T]) -> Result<String> {
    let rows = records
        .iter()
        .map(|record| match serde_json::to_value(record)? {
            Value::Object(map) => Ok(map),
            other => Err(GateError::Encoding(format!(
                "CSV record must be an object, got {}",
                other
            ))),
        })
        .collect::<Result<Vec<Map<String, Value>>>>()?;

    let Some(first) = rows.first() else {
        return Ok(String::new());
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(headers.join(","));
    for row in &rows {
        let cells = headers
            .iter()
            .map(|header| cell(row.get(*header)))
            .collect::<Result<Vec<_>>>()?;
        lines.push(cells.join(","));
    }

    Ok(lines.join("\n"))
}

fn cell(value: Option<&Value>) -> Result<String> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(value) => Ok(serde_json::to_string(value)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_becomes_empty_cell() {
        let csv = to_csv(&[json!({"a": 1, "b": null})]).unwrap();
        assert_eq!(csv, "a,b\n1,");
    }

    #[test]
    fn test_empty_input() {
        let records: Vec<Value> = Vec::new();
        assert_eq!(to_csv(&records).unwrap(), "");
    }

    #[test]
    fn test_header_follows_first_record() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Row {
            event_type: &'static str,
            field_name: Option<&'static str>,
            field_value: &'static str,
        }

        let rows = [
            Row { event_type: "input", field_name: Some("otp"), field_value: "1" },
            Row { event_type: "input", field_name: None, field_value: "a,b" },
        ];
        let csv = to_csv(&rows).unwrap();
        assert_eq!(
            csv,
            "eventType,fieldName,fieldValue\n\"input\",\"otp\",\"1\"\n\"input\",,\"a,b\""
        );
    }

    #[test]
    fn test_keys_missing_from_later_records() {
        let csv = to_csv(&[json!({"x": 1, "y": 2}), json!({"x": 3})]).unwrap();
        assert_eq!(csv, "x,y\n1,2\n3,");
    }

    #[test]
    fn test_rejects_non_object_records() {
        let err = to_csv(&[1, 2]).unwrap_err();
        assert!(matches!(err, GateError::Encoding(_)));
    }
}
