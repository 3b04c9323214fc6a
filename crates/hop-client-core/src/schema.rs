//! Avro schemas for SCiMMA Hopskotch topics.
//!
//! Schemas are built as JSON documents (the form the Schema Registry wants)
//! and parsed with [`parse_schema`] when a typed [`apache_avro::Schema`] is
//! needed for encoding.
//!
//! # Example
//!
//! ```rust
//! use hop_client_core::schema::{make_avro_schema_heartbeat, parse_schema};
//!
//! let json = make_avro_schema_heartbeat();
//! assert_eq!(json["name"], "scimma.org.sys_heartbeat");
//! let schema = parse_schema(&json).unwrap();
//! assert!(matches!(schema, apache_avro::Schema::Record(_)));
//! ```

use serde_json::{json, Map, Value};

use crate::{Error, Result};

/// Kafka topic the heartbeat relay writes to on the Rubin cluster.
pub const HEARTBEAT_TOPIC_NAME: &str = "scimma.org.sys-heartbeat";

/// Turn a Kafka topic name into a valid Avro full name.
///
/// Avro names only allow `[A-Za-z0-9_]` per segment, so every other
/// character except the `.` namespace separator becomes `_`.
pub fn avro_record_name(topic: &str) -> String {
    topic
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn heartbeat_fields() -> Vec<Value> {
    vec![
        json!({
            "name": "timestamp",
            "type": "long",
            "doc": "message timestamp",
            "default": 0,
        }),
        json!({
            "name": "count",
            "type": "long",
            "doc": "heartbeat count",
            "default": 0,
        }),
        json!({
            "name": "beat",
            "type": "string",
            "doc": "message content",
            "default": "default beat content",
        }),
    ]
}

fn record_schema(fields: Vec<Value>) -> Value {
    json!({
        "name": avro_record_name(HEARTBEAT_TOPIC_NAME),
        "type": "record",
        "fields": fields,
    })
}

/// Make the Avro schema for the SCiMMA heartbeat topic.
pub fn make_avro_schema_heartbeat() -> Value {
    record_schema(heartbeat_fields())
}

/// Make an Avro schema for one received heartbeat message.
///
/// Starts from the heartbeat fields and appends a field for every content
/// entry not already covered, typed from its JSON value and defaulting to
/// that value.
pub fn make_avro_schema_heartbeat_message(content: &Map<String, Value>) -> Result<Value> {
    let mut fields = heartbeat_fields();
    let base: Vec<String> = fields
        .iter()
        .filter_map(|f| f["name"].as_str().map(str::to_owned))
        .collect();

    for (name, value) in content {
        if base.iter().any(|b| b == name) {
            continue;
        }
        if !is_valid_field_name(name) {
            return Err(Error::schema_field(name, "not a valid Avro field name"));
        }
        fields.push(json!({
            "name": name,
            "type": avro_type_of(name, value)?,
            "default": value,
        }));
    }

    Ok(record_schema(fields))
}

/// Avro field names match `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Infer the Avro type for a JSON value.
///
/// Integers map to `long` and floats to `double`; arrays take the type of
/// their first item and must be homogeneous.
pub fn avro_type_of(field: &str, value: &Value) -> Result<Value> {
    match value {
        Value::Array(items) => {
            let first = items.first().ok_or_else(|| {
                Error::schema_field(field, "cannot infer item type of empty array")
            })?;
            let item_type = scalar_type_of(field, first)?;
            for item in items.iter().skip(1) {
                let other = scalar_type_of(field, item)?;
                if other != item_type {
                    return Err(Error::schema_field(
                        field,
                        format!("array mixes {item_type} and {other} items"),
                    ));
                }
            }
            Ok(json!({ "type": "array", "items": item_type }))
        }
        scalar => scalar_type_of(field, scalar).map(Value::from),
    }
}

fn scalar_type_of(field: &str, value: &Value) -> Result<&'static str> {
    match value {
        Value::Bool(_) => Ok("boolean"),
        Value::Number(n) if n.is_i64() => Ok("long"),
        Value::Number(n) if n.is_u64() => Err(Error::schema_field(
            field,
            format!("integer {n} does not fit in an Avro long"),
        )),
        Value::Number(_) => Ok("double"),
        Value::String(_) => Ok("string"),
        Value::Null => Err(Error::schema_field(field, "unsupported type: null")),
        Value::Array(_) => Err(Error::schema_field(field, "unsupported type: nested array")),
        Value::Object(_) => Err(Error::schema_field(field, "unsupported type: object")),
    }
}

/// Parse a JSON schema document into a typed Avro schema.
pub fn parse_schema(schema: &Value) -> Result<apache_avro::Schema> {
    Ok(apache_avro::Schema::parse(schema)?)
}

/// Name of a schema document, as used for topics and registry subjects.
pub fn schema_name(schema: &Value) -> Result<&str> {
    schema["name"]
        .as_str()
        .ok_or_else(|| Error::schema("schema has no 'name'"))
}
