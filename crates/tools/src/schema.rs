//! Operation Schemas
//!
//! Schema cleanup for the model and argument validation for incoming
//! tool calls. Validation is intentionally shallow: the object shape,
//! required fields, and the JSON type of each top-level field. Anything
//! deeper is left to the backend, whose rejections come back as
//! execution failures.

use serde_json::{Map, Value};

/// Schema keywords the model API does not accept or does not need.
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "$schema",
    "$ref",
    "$id",
    "$defs",
    "definitions",
    "$comment",
    "examples",
    "readOnly",
    "writeOnly",
    "deprecated",
    "if",
    "then",
    "else",
];

/// Reduce an operation's JSON Schema to the subset the model understands.
///
/// - drops `$schema`, `$ref`, `$defs` and similar keywords
/// - merges a single-entry `allOf`/`anyOf`/`oneOf` into the parent
/// - replaces multi-entry `anyOf`/`oneOf` with a description of the variants
/// - recurses into `properties`, `items` and `additionalProperties`
pub fn sanitize_schema(schema: &mut Value) {
    let Some(obj) = schema.as_object_mut() else {
        return;
    };

    for key in UNSUPPORTED_KEYWORDS {
        obj.remove(*key);
    }

    for keyword in ["allOf", "anyOf", "oneOf"] {
        let Some(Value::Array(variants)) = obj.remove(keyword) else {
            continue;
        };
        if variants.len() == 1 {
            merge_missing(obj, &variants[0]);
        } else if keyword == "allOf" {
            for variant in &variants {
                merge_all_of(obj, variant);
            }
        } else {
            describe_variants(obj, &variants);
        }
    }

    if let Some(Value::Object(props)) = obj.get_mut("properties") {
        for prop in props.values_mut() {
            sanitize_schema(prop);
        }
    }
    if let Some(items) = obj.get_mut("items") {
        sanitize_schema(items);
    }
    if let Some(additional) = obj.get_mut("additionalProperties") {
        if additional.is_object() {
            sanitize_schema(additional);
        }
    }
}

fn merge_missing(target: &mut Map<String, Value>, source: &Value) {
    if let Some(src) = source.as_object() {
        for (k, v) in src {
            target.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
}

fn merge_all_of(target: &mut Map<String, Value>, variant: &Value) {
    let Some(src) = variant.as_object() else {
        return;
    };
    if let Some(Value::Object(props)) = src.get("properties") {
        let entry = target
            .entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(existing) = entry.as_object_mut() {
            for (k, v) in props {
                existing.insert(k.clone(), v.clone());
            }
        }
    }
    if let Some(Value::Array(req)) = src.get("required") {
        let entry = target
            .entry("required")
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Some(existing) = entry.as_array_mut() {
            for r in req {
                if !existing.contains(r) {
                    existing.push(r.clone());
                }
            }
        }
    }
    for (k, v) in src {
        if k != "properties" && k != "required" {
            target.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
}

fn describe_variants(target: &mut Map<String, Value>, variants: &[Value]) {
    let labels: Vec<&str> = variants
        .iter()
        .filter_map(|v| {
            v.get("type")
                .and_then(Value::as_str)
                .or_else(|| v.get("description").and_then(Value::as_str))
        })
        .collect();
    if !labels.is_empty() && !target.contains_key("description") {
        target.insert(
            "description".to_string(),
            Value::String(format!("One of: {}", labels.join(", "))),
        );
    }
    target
        .entry("type")
        .or_insert_with(|| Value::String("string".to_string()));
}

/// Check tool-call arguments against an operation's input schema.
///
/// Returns a message suitable for feeding back to the model on failure.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> Result<(), String> {
    let Some(args) = arguments.as_object() else {
        return Err(format!(
            "arguments must be a JSON object, got {}",
            json_type_name(arguments)
        ));
    };

    if let Some(Value::Array(required)) = schema.get("required") {
        let missing: Vec<&str> = required
            .iter()
            .filter_map(Value::as_str)
            .filter(|field| args.get(*field).map_or(true, Value::is_null))
            .collect();
        if !missing.is_empty() {
            return Err(format!("missing required field(s): {}", missing.join(", ")));
        }
    }

    if let Some(Value::Object(properties)) = schema.get("properties") {
        for (field, value) in args {
            let Some(expected) = properties.get(field).and_then(|p| p.get("type")) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            if !type_matches(expected, value) {
                return Err(format!(
                    "field '{}' must be of type {}, got {}",
                    field,
                    expected_label(expected),
                    json_type_name(value)
                ));
            }
        }
    }

    Ok(())
}

fn type_matches(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(t) => single_type_matches(t, value),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| single_type_matches(t, value)),
        _ => true,
    }
}

fn single_type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => {
            value.is_i64()
                || value.is_u64()
                || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        // Unknown type keyword: nothing to check against
        _ => true,
    }
}

fn expected_label(expected: &Value) -> String {
    match expected {
        Value::String(t) => t.clone(),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" | "),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
