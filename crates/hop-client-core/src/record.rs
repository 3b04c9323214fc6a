//! JSON content to Avro record conversion and Confluent wire framing.
//!
//! Messages on the Rubin cluster are framed the way the Confluent Schema
//! Registry serializers expect: a zero magic byte, the 4-byte big-endian
//! schema id, then the Avro binary datum.

use apache_avro::types::Value as AvroValue;
use apache_avro::Schema;
use serde_json::{Map, Value};

use crate::{Error, Result};

/// First byte of every Confluent-framed payload.
pub const MAGIC_BYTE: u8 = 0;

const HEADER_LEN: usize = 5;

/// Build an Avro record for `schema` from JSON content.
///
/// Fields missing from `content` take the schema default; content keys the
/// schema does not know are ignored.
pub fn to_avro_record(schema: &Schema, content: &Map<String, Value>) -> Result<AvroValue> {
    let Schema::Record(record) = schema else {
        return Err(Error::schema("schema is not a record"));
    };

    let mut fields = Vec::with_capacity(record.fields.len());
    for field in &record.fields {
        let value = match content.get(&field.name) {
            Some(value) => value,
            None => field.default.as_ref().ok_or_else(|| {
                Error::schema_field(&field.name, "no value and no default")
            })?,
        };
        fields.push((field.name.clone(), convert(&field.name, &field.schema, value)?));
    }
    Ok(AvroValue::Record(fields))
}

fn convert(field: &str, schema: &Schema, value: &Value) -> Result<AvroValue> {
    let converted = match (schema, value) {
        (Schema::Null, Value::Null) => Some(AvroValue::Null),
        (Schema::Boolean, Value::Bool(b)) => Some(AvroValue::Boolean(*b)),
        (Schema::Int, Value::Number(n)) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(AvroValue::Int),
        (Schema::Long, Value::Number(n)) => n.as_i64().map(AvroValue::Long),
        (Schema::Float, Value::Number(n)) => n.as_f64().map(|v| AvroValue::Float(v as f32)),
        (Schema::Double, Value::Number(n)) => n.as_f64().map(AvroValue::Double),
        (Schema::String, Value::String(s)) => Some(AvroValue::String(s.clone())),
        (Schema::Array(array), Value::Array(items)) => {
            let items = items
                .iter()
                .map(|item| convert(field, &array.items, item))
                .collect::<Result<Vec<_>>>()?;
            Some(AvroValue::Array(items))
        }
        _ => None,
    };

    converted.ok_or_else(|| {
        Error::schema_field(
            field,
            format!("value {value} does not fit Avro type {}", type_label(schema)),
        )
    })
}

fn type_label(schema: &Schema) -> &'static str {
    match schema {
        Schema::Null => "null",
        Schema::Boolean => "boolean",
        Schema::Int => "int",
        Schema::Long => "long",
        Schema::Float => "float",
        Schema::Double => "double",
        Schema::String => "string",
        Schema::Array(_) => "array",
        Schema::Record(_) => "record",
        _ => "unsupported",
    }
}

/// Encode `value` with the Confluent framing for `schema_id`.
pub fn encode_confluent(schema_id: u32, schema: &Schema, value: AvroValue) -> Result<Vec<u8>> {
    let datum = apache_avro::to_avro_datum(schema, value)?;
    let mut payload = Vec::with_capacity(HEADER_LEN + datum.len());
    payload.push(MAGIC_BYTE);
    payload.extend_from_slice(&schema_id.to_be_bytes());
    payload.extend_from_slice(&datum);
    Ok(payload)
}

/// Split a Confluent-framed payload into its schema id and decoded value.
pub fn decode_confluent(payload: &[u8], schema: &Schema) -> Result<(u32, AvroValue)> {
    if payload.len() < HEADER_LEN {
        return Err(Error::decode(format!(
            "payload is {} bytes, shorter than the {HEADER_LEN}-byte header",
            payload.len()
        )));
    }
    if payload[0] != MAGIC_BYTE {
        return Err(Error::decode(format!("bad magic byte {}", payload[0])));
    }

    let schema_id = u32::from_be_bytes([payload[1], payload[2], payload[3], payload[4]]);
    let mut datum = &payload[HEADER_LEN..];
    let value = apache_avro::from_avro_datum(schema, &mut datum, None)?;
    Ok((schema_id, value))
}
