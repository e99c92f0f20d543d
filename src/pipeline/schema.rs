//! Schema validation: sanitized text in, typed items out.
//!
//! Parsing and shape-checking are deliberately two stages with two error
//! kinds. "The model returned prose" and "the model returned JSON with a
//! missing column" are different failures with different fixes, and the
//! per-chunk reports keep them apart:
//!
//! * [`ItemsParseError::Json`] — the text is not JSON at all. The caller
//!   persists the raw response for inspection.
//! * [`ItemsParseError::Shape`] — valid JSON, wrong structure (no `items`
//!   list, a missing field, a number where a string belongs).
//!
//! One quirk handled here rather than in the sanitizer: some responses
//! arrive double-wrapped as `[{"items": [...]}]`. A top-level list is
//! unwrapped to its first element before shape-checking.

use serde_json::Value;
use thiserror::Error;

use crate::item::EstimateItems;

/// Why a sanitized response could not become an [`EstimateItems`].
#[derive(Debug, Error)]
pub enum ItemsParseError {
    /// Not valid JSON. Maps to [`crate::error::ChunkError::Parse`].
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON, wrong shape. Maps to [`crate::error::ChunkError::Schema`].
    #[error("{0}")]
    Shape(String),
}

/// Parse sanitized response text into the typed item collection.
///
/// Items must carry all 13 fields as strings; a JSON number where a string
/// belongs is a shape error, not something to coerce. Unknown extra keys
/// are ignored.
pub fn parse_items(text: &str) -> Result<EstimateItems, ItemsParseError> {
    let value: Value = serde_json::from_str(text)?;
    let value = unwrap_outer_list(value)?;
    serde_json::from_value(value).map_err(|e| ItemsParseError::Shape(e.to_string()))
}

/// Collapse a double-wrapped `[{...}]` response to its first element.
fn unwrap_outer_list(value: Value) -> Result<Value, ItemsParseError> {
    match value {
        Value::Array(mut elements) => {
            if elements.is_empty() {
                return Err(ItemsParseError::Shape(
                    "top-level list is empty".to_string(),
                ));
            }
            Ok(elements.remove(0))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_ITEM: &str = r#"{
        "items": [{
            "unit": "Unit 1101", "room": "Kitchen", "category": "DRYWALL",
            "serial": "12", "description": "paint wall", "qty": "2.00",
            "uom": "EA", "reset": "0", "remove": "0", "replace": "8.00",
            "tax": "0.40", "oandp": "1.60", "total": "10.00"
        }]
    }"#;

    #[test]
    fn parses_wrapped_items() {
        let doc = parse_items(ONE_ITEM).unwrap();
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.items[0].serial, "12");
    }

    #[test]
    fn unwraps_double_wrapped_list() {
        let wrapped = format!("[{ONE_ITEM}]");
        let doc = parse_items(&wrapped).unwrap();
        assert_eq!(doc.items.len(), 1);
    }

    #[test]
    fn empty_items_list_is_valid() {
        let doc = parse_items(r#"{"items": []}"#).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn prose_is_a_parse_error() {
        let err = parse_items("I could not read the table.").unwrap_err();
        assert!(matches!(err, ItemsParseError::Json(_)), "got: {err:?}");
    }

    #[test]
    fn empty_outer_list_is_a_shape_error() {
        let err = parse_items("[]").unwrap_err();
        assert!(matches!(err, ItemsParseError::Shape(_)), "got: {err:?}");
    }

    #[test]
    fn missing_items_key_is_a_shape_error() {
        let err = parse_items(r#"{"rows": []}"#).unwrap_err();
        assert!(matches!(err, ItemsParseError::Shape(_)), "got: {err:?}");
    }

    #[test]
    fn missing_field_is_a_shape_error_naming_the_field() {
        let json = r#"{"items": [{
            "unit": "u", "room": "r", "category": "c",
            "serial": "1", "description": "d", "qty": "1", "uom": "EA",
            "reset": "0", "remove": "0", "replace": "0", "tax": "0",
            "oandp": "0"
        }]}"#;
        let err = parse_items(json).unwrap_err();
        match err {
            ItemsParseError::Shape(detail) => {
                assert!(detail.contains("total"), "got: {detail}")
            }
            other => panic!("expected shape error, got: {other:?}"),
        }
    }

    #[test]
    fn numeric_field_is_a_shape_error() {
        let json = r#"{"items": [{
            "unit": "u", "room": "r", "category": "c",
            "serial": "1", "description": "d", "qty": 2.0, "uom": "EA",
            "reset": "0", "remove": "0", "replace": "0", "tax": "0",
            "oandp": "0", "total": "0"
        }]}"#;
        let err = parse_items(json).unwrap_err();
        assert!(matches!(err, ItemsParseError::Shape(_)), "got: {err:?}");
    }

    #[test]
    fn non_object_in_outer_list_is_a_shape_error() {
        let err = parse_items(r#"["just a string"]"#).unwrap_err();
        assert!(matches!(err, ItemsParseError::Shape(_)), "got: {err:?}");
    }
}
