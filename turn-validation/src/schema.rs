//! A JSON Schema subset sufficient for checking model replies.
//!
//! Supported keywords: `type`, `properties`, `required`, `additionalProperties`,
//! `items`, `enum`, `const`, `anyOf`, `oneOf`, `minLength`, `maxLength`,
//! `minItems`, `maxItems`, `minimum` and `maximum`. Other keywords are ignored.
//! Each violation renders as a short imperative fix the model can apply.

use std::fmt;

use serde_json::{Map, Value};

/// Kind of schema violation.
#[derive(Clone, Debug, PartialEq)]
pub enum SchemaViolation {
    /// The value has the wrong JSON type.
    Type {
        /// Accepted type names.
        expected: Vec<String>,
    },
    /// A required property is missing.
    Required {
        /// Name of the missing property.
        property: String,
    },
    /// A property is not allowed by `additionalProperties: false`.
    AdditionalProperty {
        /// Name of the disallowed property.
        property: String,
    },
    /// The value is not one of the enumerated values.
    Enum {
        /// Allowed values.
        allowed: Vec<Value>,
    },
    /// Any other constraint, described in words.
    Constraint {
        /// Description of the failed constraint.
        message: String,
    },
}

/// A violation located at a path such as `instance.commands[0].type`.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaError {
    /// Location of the offending value.
    pub path: String,
    /// What is wrong with it.
    pub violation: SchemaViolation,
}

impl SchemaError {
    /// Renders the instruction that fixes this violation.
    #[must_use]
    pub fn fix(&self) -> String {
        let path = &self.path;
        match &self.violation {
            SchemaViolation::Type { expected } => {
                let first = expected.first().map_or("value", String::as_str);
                let article = if first.starts_with(['a', 'e', 'i', 'o', 'u']) {
                    "an"
                } else {
                    "a"
                };
                format!("convert \"{path}\" to {article} {}", expected.join(" or "))
            }
            SchemaViolation::Required { property } => {
                format!("add the \"{property}\" property to \"{path}\"")
            }
            SchemaViolation::AdditionalProperty { property } => {
                format!("remove the \"{property}\" property from \"{path}\"")
            }
            SchemaViolation::Enum { allowed } => {
                let allowed: Vec<String> = allowed.iter().map(display_value).collect();
                format!("change \"{path}\" to one of: {}", allowed.join(", "))
            }
            SchemaViolation::Constraint { message } => format!("\"{path}\" {message}. Fix that"),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fix())
    }
}

/// Validates `instance` against `schema`, returning every violation found.
#[must_use]
pub fn validate(schema: &Value, instance: &Value) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    check(schema, instance, "instance", &mut errors);
    errors
}

/// Joins `errors` under `prefix`: one error on its own line, several as a list.
#[must_use]
pub fn format_fixes(prefix: &str, errors: &[SchemaError]) -> String {
    match errors {
        [] => prefix.to_owned(),
        [only] => format!("{prefix}\n{}", only.fix()),
        many => {
            let fixes: Vec<String> = many.iter().map(|error| format!("- {}", error.fix())).collect();
            format!("{prefix}\n{}", fixes.join("\n"))
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn push(errors: &mut Vec<SchemaError>, path: &str, violation: SchemaViolation) {
    errors.push(SchemaError {
        path: path.to_owned(),
        violation,
    });
}

fn constraint(errors: &mut Vec<SchemaError>, path: &str, message: String) {
    push(errors, path, SchemaViolation::Constraint { message });
}

fn check(schema: &Value, instance: &Value, path: &str, errors: &mut Vec<SchemaError>) {
    let schema = match schema {
        Value::Bool(true) => return,
        Value::Bool(false) => {
            constraint(errors, path, "is not allowed".to_owned());
            return;
        }
        Value::Object(schema) => schema,
        _ => return,
    };

    if let Some(expected) = schema.get("type") {
        let expected: Vec<String> = match expected {
            Value::String(name) => vec![name.clone()],
            Value::Array(names) => names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect(),
            _ => Vec::new(),
        };
        if !expected.is_empty() && !expected.iter().any(|name| matches_type(name, instance)) {
            push(errors, path, SchemaViolation::Type { expected });
            return;
        }
    }

    if let Some(Value::Array(allowed)) = schema.get("enum") {
        if !allowed.contains(instance) {
            push(
                errors,
                path,
                SchemaViolation::Enum {
                    allowed: allowed.clone(),
                },
            );
        }
    }
    if let Some(expected) = schema.get("const") {
        if expected != instance {
            constraint(
                errors,
                path,
                format!(
                    "does not exactly match expected constant: {}",
                    display_value(expected)
                ),
            );
        }
    }

    check_alternatives(schema, instance, path, errors);

    match instance {
        Value::Object(map) => check_object(schema, map, path, errors),
        Value::Array(items) => check_array(schema, items, path, errors),
        Value::String(text) => check_string(schema, text, path, errors),
        Value::Number(number) => {
            if let Some(value) = number.as_f64() {
                check_number(schema, value, path, errors);
            }
        }
        Value::Bool(_) | Value::Null => {}
    }
}

fn check_alternatives(
    schema: &Map<String, Value>,
    instance: &Value,
    path: &str,
    errors: &mut Vec<SchemaError>,
) {
    for keyword in ["anyOf", "oneOf"] {
        if let Some(Value::Array(branches)) = schema.get(keyword) {
            let matches = branches
                .iter()
                .any(|branch| validate_at(branch, instance, path).is_empty());
            if !matches {
                constraint(
                    errors,
                    path,
                    "is not valid under any of the given schemas".to_owned(),
                );
            }
        }
    }
}

fn validate_at(schema: &Value, instance: &Value, path: &str) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    check(schema, instance, path, &mut errors);
    errors
}

fn check_object(
    schema: &Map<String, Value>,
    map: &Map<String, Value>,
    path: &str,
    errors: &mut Vec<SchemaError>,
) {
    if let Some(Value::Array(required)) = schema.get("required") {
        for property in required.iter().filter_map(Value::as_str) {
            if !map.contains_key(property) {
                push(
                    errors,
                    path,
                    SchemaViolation::Required {
                        property: property.to_owned(),
                    },
                );
            }
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    for (name, value) in map {
        let child_path = format!("{path}.{name}");
        if let Some(property_schema) = properties.and_then(|properties| properties.get(name)) {
            check(property_schema, value, &child_path, errors);
            continue;
        }
        match schema.get("additionalProperties") {
            Some(Value::Bool(false)) => push(
                errors,
                path,
                SchemaViolation::AdditionalProperty {
                    property: name.clone(),
                },
            ),
            Some(extra @ Value::Object(_)) => check(extra, value, &child_path, errors),
            _ => {}
        }
    }
}

fn check_array(
    schema: &Map<String, Value>,
    items: &[Value],
    path: &str,
    errors: &mut Vec<SchemaError>,
) {
    if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
        if (items.len() as u64) < min {
            constraint(
                errors,
                path,
                format!("does not meet minimum length of {min}"),
            );
        }
    }
    if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
        if (items.len() as u64) > max {
            constraint(
                errors,
                path,
                format!("does not meet maximum length of {max}"),
            );
        }
    }
    if let Some(item_schema) = schema.get("items") {
        for (index, item) in items.iter().enumerate() {
            check(item_schema, item, &format!("{path}[{index}]"), errors);
        }
    }
}

fn check_string(
    schema: &Map<String, Value>,
    text: &str,
    path: &str,
    errors: &mut Vec<SchemaError>,
) {
    let length = text.chars().count() as u64;
    if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
        if length < min {
            constraint(
                errors,
                path,
                format!("does not meet minimum length of {min}"),
            );
        }
    }
    if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
        if length > max {
            constraint(
                errors,
                path,
                format!("does not meet maximum length of {max}"),
            );
        }
    }
}

fn check_number(
    schema: &Map<String, Value>,
    value: f64,
    path: &str,
    errors: &mut Vec<SchemaError>,
) {
    if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
        if value < min {
            constraint(
                errors,
                path,
                format!("must be greater than or equal to {min}"),
            );
        }
    }
    if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
        if value > max {
            constraint(errors, path, format!("must be less than or equal to {max}"));
        }
    }
}

fn matches_type(name: &str, instance: &Value) -> bool {
    match name {
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "boolean" => instance.is_boolean(),
        "null" => instance.is_null(),
        "number" => instance.is_number(),
        "integer" => match instance {
            Value::Number(number) => {
                number.is_i64()
                    || number.is_u64()
                    || number.as_f64().is_some_and(|value| value.fract().abs() < f64::EPSILON)
            }
            _ => false,
        },
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reports_type_required_and_additional_properties() {
        let schema = json!({
            "type": "object",
            "properties": {"foo": {"type": "string"}, "count": {"type": "integer"}},
            "required": ["foo", "bar"],
            "additionalProperties": false
        });
        let errors = validate(&schema, &json!({"foo": 1, "count": 2, "extra": true}));
        let fixes: Vec<String> = errors.iter().map(SchemaError::fix).collect();
        assert_eq!(
            fixes,
            [
                "add the \"bar\" property to \"instance\"",
                "remove the \"extra\" property from \"instance\"",
                "convert \"instance.foo\" to a string",
            ]
        );
    }

    #[test]
    fn reports_enum_with_allowed_values() {
        let schema = json!({"properties": {"type": {"type": "string", "enum": ["plan"]}}});
        let errors = validate(&schema, &json!({"type": "invalid"}));
        assert_eq!(errors[0].fix(), "change \"instance.type\" to one of: plan");
    }

    #[test]
    fn nested_paths_and_constraints() {
        let schema = json!({
            "type": "object",
            "properties": {
                "items": {"type": "array", "minItems": 1, "items": {"type": "object"}},
                "name": {"type": "string", "maxLength": 3}
            }
        });
        let errors = validate(&schema, &json!({"items": [1], "name": "long"}));
        let fixes: Vec<String> = errors.iter().map(SchemaError::fix).collect();
        assert_eq!(
            fixes,
            [
                "convert \"instance.items[0]\" to an object",
                "\"instance.name\" does not meet maximum length of 3. Fix that",
            ]
        );
        assert!(validate(&schema, &json!({"items": [{}], "name": "abc"})).is_empty());
    }

    #[test]
    fn alternatives_accept_any_matching_branch() {
        let schema = json!({"anyOf": [{"type": "string"}, {"type": "integer"}]});
        assert!(validate(&schema, &json!(3)).is_empty());
        assert_eq!(validate(&schema, &json!(3.5)).len(), 1);
    }

    #[test]
    fn formats_single_and_multiple_fixes() {
        let one = vec![SchemaError {
            path: "instance".to_owned(),
            violation: SchemaViolation::Required {
                property: "a".to_owned(),
            },
        }];
        assert_eq!(
            format_fixes("Fix:", &one),
            "Fix:\nadd the \"a\" property to \"instance\""
        );

        let two = vec![one[0].clone(), one[0].clone()];
        assert_eq!(
            format_fixes("Fix:", &two),
            "Fix:\n- add the \"a\" property to \"instance\"\n- add the \"a\" property to \"instance\""
        );
    }
}
