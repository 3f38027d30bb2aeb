use std::path::Path;

use serde_json::Value;

use crate::error::{RagError, Result};

/// Names of the JSON fields holding the id, the text to embed, and its description.
#[derive(Debug, Clone)]
pub struct FieldNames {
    pub id: String,
    pub text: String,
    pub description: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            text: "content".to_string(),
            description: "title".to_string(),
        }
    }
}

/// One entry of the source file, with the raw JSON kept for grounding context.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub id: String,
    pub text: String,
    pub description: String,
    pub raw: String,
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl SourceRecord {
    pub fn from_value(index: usize, value: &Value, fields: &FieldNames) -> Result<Self> {
        let field = |name: &str| -> Result<String> {
            match value.get(name) {
                Some(v) => scalar_to_string(v).ok_or_else(|| RagError::InvalidRecord {
                    index,
                    message: format!("field '{name}' must be a string or number"),
                }),
                None => Err(RagError::InvalidRecord {
                    index,
                    message: format!("missing field '{name}'"),
                }),
            }
        };

        if !value.is_object() {
            return Err(RagError::InvalidRecord {
                index,
                message: "expected a JSON object".to_string(),
            });
        }

        Ok(Self {
            id: field(fields.id.as_str())?,
            text: field(fields.text.as_str())?,
            description: field(fields.description.as_str())?,
            raw: value.to_string(),
        })
    }
}

/// Reads the source file, which must contain a JSON array.
pub fn load_records(path: &Path) -> Result<Vec<Value>> {
    let contents = std::fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&contents)? {
        Value::Array(items) => Ok(items),
        _ => Err(RagError::InvalidRecord {
            index: 0,
            message: format!("{} does not contain a JSON array", path.display()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_fields() {
        let value = json!({"id": "1", "title": "Intro", "content": "Hello world"});
        let record = SourceRecord::from_value(0, &value, &FieldNames::default()).unwrap();
        assert_eq!(record.id, "1");
        assert_eq!(record.text, "Hello world");
        assert_eq!(record.description, "Intro");
        assert!(record.raw.contains("Hello world"));
    }

    #[test]
    fn test_custom_fields_and_numeric_id() {
        let fields = FieldNames {
            id: "key".to_string(),
            text: "body".to_string(),
            description: "summary".to_string(),
        };
        let value = json!({"key": 7, "body": "text", "summary": "s"});
        let record = SourceRecord::from_value(3, &value, &fields).unwrap();
        assert_eq!(record.id, "7");
        assert_eq!(record.text, "text");
    }

    #[test]
    fn test_missing_description_is_rejected() {
        let value = json!({"id": "1", "content": "c"});
        let err = SourceRecord::from_value(2, &value, &FieldNames::default()).unwrap_err();
        match err {
            RagError::InvalidRecord { index, message } => {
                assert_eq!(index, 2);
                assert!(message.contains("'title'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_description_is_kept() {
        let value = json!({"id": "1", "title": "", "content": "c"});
        let record = SourceRecord::from_value(0, &value, &FieldNames::default()).unwrap();
        assert_eq!(record.description, "");
    }

    #[test]
    fn test_missing_id_names_index() {
        let value = json!({"content": "c"});
        let err = SourceRecord::from_value(4, &value, &FieldNames::default()).unwrap_err();
        match err {
            RagError::InvalidRecord { index, message } => {
                assert_eq!(index, 4);
                assert!(message.contains("'id'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_object_rejected() {
        let err = SourceRecord::from_value(1, &json!("just text"), &FieldNames::default());
        assert!(err.is_err());
    }
}
