//! Declared input shapes for tools and their validation.

use emlog_core::models::Flag;
use serde_json::{Map, Value, json};

use crate::error::AdapterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Non-negative integer.
    Integer,
    /// Positive integer identifier.
    Id,
    Enum(&'static [&'static str]),
    TextList,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
        }
    }

    fn schema(&self) -> Value {
        match self.kind {
            FieldKind::Text => json!({ "type": "string", "description": self.description }),
            FieldKind::Integer => json!({
                "type": "integer",
                "minimum": 0,
                "description": self.description
            }),
            FieldKind::Id => json!({
                "type": "integer",
                "minimum": 1,
                "description": self.description
            }),
            FieldKind::Enum(values) => json!({
                "type": "string",
                "enum": values,
                "description": self.description
            }),
            FieldKind::TextList => json!({
                "type": "array",
                "items": { "type": "string" },
                "description": self.description
            }),
        }
    }

    fn check(&self, value: &Value) -> Result<(), AdapterError> {
        let key = self.name;
        let ok = match self.kind {
            FieldKind::Text => match value {
                Value::String(text) => !(self.required && text.trim().is_empty()),
                _ => false,
            },
            FieldKind::Integer => whole_number(value).is_some(),
            FieldKind::Id => whole_number(value).is_some_and(|id| id > 0),
            FieldKind::Enum(values) => value.as_str().is_some_and(|v| values.contains(&v)),
            FieldKind::TextList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        };
        if ok {
            return Ok(());
        }
        let expectation = match self.kind {
            FieldKind::Text if self.required => "a non-empty string".to_string(),
            FieldKind::Text => "a string".to_string(),
            FieldKind::Integer => "a non-negative integer".to_string(),
            FieldKind::Id => "a positive integer".to_string(),
            FieldKind::Enum(values) => format!("one of: {}", values.join(", ")),
            FieldKind::TextList => "an array of strings".to_string(),
        };
        Err(AdapterError::invalid(
            key,
            format!("'{key}' must be {expectation}"),
        ))
    }
}

/// JSON Schema advertised in `tools/list`.
pub fn input_schema(fields: &[FieldSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields {
        properties.insert(field.name.to_string(), field.schema());
        if field.required {
            required.push(Value::String(field.name.to_string()));
        }
    }
    let mut schema = json!({
        "type": "object",
        "properties": properties,
        "additionalProperties": false
    });
    if !required.is_empty() {
        schema["required"] = Value::Array(required);
    }
    schema
}

/// Checks arguments against the declared fields. Runs before any network
/// call; `null` counts as absent.
pub fn validate(fields: &[FieldSpec], args: &Map<String, Value>) -> Result<Arguments, AdapterError> {
    if let Some(unknown) = args
        .keys()
        .find(|key| !fields.iter().any(|field| field.name == key.as_str()))
    {
        return Err(AdapterError::invalid(
            unknown.as_str(),
            format!("Unknown argument '{unknown}'"),
        ));
    }

    let mut accepted = Map::new();
    for field in fields {
        match args.get(field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    return Err(AdapterError::invalid(
                        field.name,
                        format!("Missing required field '{}'", field.name),
                    ));
                }
            }
            Some(value) => {
                field.check(value)?;
                accepted.insert(field.name.to_string(), value.clone());
            }
        }
    }
    Ok(Arguments(accepted))
}

/// Non-negative integers, including floats with no fractional part (`3.0`).
fn whole_number(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0 && n.fract() == 0.0 && *n <= u64::MAX as f64)
            .map(|n| n as u64)
    })
}

/// Arguments that passed [`validate`].
#[derive(Debug, Clone, Default)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// An explicit empty string is kept; it clears the field remotely.
    pub fn text(&self, key: &str) -> Option<String> {
        self.0.get(key).and_then(Value::as_str).map(str::to_string)
    }

    pub fn required_text(&self, key: &str) -> Result<String, AdapterError> {
        self.text(key)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                AdapterError::invalid(key, format!("Missing required field '{key}'"))
            })
    }

    pub fn number(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(whole_number)
    }

    pub fn required_number(&self, key: &str) -> Result<u64, AdapterError> {
        self.number(key).ok_or_else(|| {
            AdapterError::invalid(key, format!("Missing required field '{key}'"))
        })
    }

    pub fn flag(&self, key: &str) -> Option<Flag> {
        self.0.get(key).and_then(Value::as_str).and_then(Flag::parse)
    }

    pub fn list(&self, key: &str) -> Option<Vec<String>> {
        self.0.get(key).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::required("id", FieldKind::Id, "id"),
        FieldSpec::required("title", FieldKind::Text, "title"),
        FieldSpec::optional("page", FieldKind::Integer, "page"),
        FieldSpec::optional("draft", FieldKind::Enum(&Flag::WIRE_VALUES), "draft"),
        FieldSpec::optional("keys", FieldKind::TextList, "keys"),
    ];

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn missing_required_field_names_the_field() {
        let err = validate(FIELDS, &args(json!({"id": 1}))).unwrap_err();
        assert_eq!(err.code(), "invalid_request");
        assert_eq!(err.to_string(), "Missing required field 'title'");
        assert_eq!(err.to_value()["field"], "title");
    }

    #[test]
    fn null_required_field_counts_as_missing() {
        let err = validate(FIELDS, &args(json!({"id": 1, "title": null}))).unwrap_err();
        assert_eq!(err.to_string(), "Missing required field 'title'");
    }

    #[test]
    fn enum_membership_is_enforced() {
        let err = validate(FIELDS, &args(json!({"id": 1, "title": "t", "draft": "maybe"})))
            .unwrap_err();
        assert_eq!(err.to_string(), "'draft' must be one of: y, n");
    }

    #[test]
    fn ids_must_be_positive_integers() {
        for bad in [json!(0), json!(-1), json!(1.5), json!("3")] {
            let err = validate(FIELDS, &args(json!({"id": bad, "title": "t"}))).unwrap_err();
            assert_eq!(err.to_value()["field"], "id");
        }
    }

    #[test]
    fn unknown_arguments_are_rejected() {
        let err = validate(FIELDS, &args(json!({"id": 1, "title": "t", "bogus": true})))
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown argument 'bogus'");
    }

    #[test]
    fn accepted_arguments_are_readable() {
        let parsed = validate(
            FIELDS,
            &args(json!({"id": 4, "title": "t", "page": 0, "draft": "y", "keys": ["a", "b"]})),
        )
        .unwrap();
        assert_eq!(parsed.required_number("id").unwrap(), 4);
        assert_eq!(parsed.number("page"), Some(0));
        assert_eq!(parsed.flag("draft"), Some(Flag::Yes));
        assert_eq!(parsed.list("keys"), Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(parsed.text("missing"), None);
    }

    #[test]
    fn whole_floats_count_as_integers() {
        let parsed = validate(FIELDS, &args(json!({"id": 3.0, "title": "t", "page": 2.0})))
            .unwrap();
        assert_eq!(parsed.required_number("id").unwrap(), 3);
        assert_eq!(parsed.number("page"), Some(2));

        let err = validate(FIELDS, &args(json!({"id": 0.0, "title": "t"}))).unwrap_err();
        assert_eq!(err.to_string(), "'id' must be a positive integer");
    }

    #[test]
    fn empty_optional_text_is_kept_but_required_text_is_not() {
        let parsed = Arguments(args(json!({"title": "  ", "excerpt": ""})));
        assert_eq!(parsed.text("excerpt"), Some(String::new()));
        assert_eq!(
            parsed.required_text("title").unwrap_err().to_string(),
            "Missing required field 'title'"
        );
    }

    #[test]
    fn schema_lists_required_fields_and_enums() {
        let schema = input_schema(FIELDS);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["id", "title"]));
        assert_eq!(schema["properties"]["draft"]["enum"], json!(["y", "n"]));
        assert_eq!(schema["properties"]["id"]["minimum"], 1);
        assert_eq!(schema["additionalProperties"], false);
    }

    #[test]
    fn schema_without_required_fields_omits_required_key() {
        let schema = input_schema(&[]);
        assert!(schema.get("required").is_none());
    }
}
