//! # Avro codec.
//!
//! Avro binary datums (no container header, no magic byte) mapped to and from
//! JSON-shaped [`Record`]s:
//!
//! | Avro                         | Record                         |
//! |------------------------------|--------------------------------|
//! | record, map                  | object                         |
//! | array                        | array                          |
//! | union                        | value of the selected branch   |
//! | null / boolean               | null / bool                    |
//! | int, long, float, double     | number                         |
//! | string, enum                 | string                         |
//! | bytes, fixed                 | array of byte values           |
//! | date / time / timestamp      | number (logical value)         |
//! | uuid                         | string                         |
//!
//! Encoding goes through Avro schema resolution, so JSON objects fill records
//! (missing fields take their defaults), integers widen to `long` and to
//! time-based logical types, and named types may be referenced by name.

use apache_avro::Schema;
use apache_avro::types::Value;
use serde_json::{Map, Number};

use crate::error::SchemaError;
use crate::events::Record;
use crate::ports::Codec;

/// [`Codec`] for Avro schemas (`apache-avro`).
#[derive(Clone, Copy, Debug, Default)]
pub struct AvroCodec;

impl AvroCodec {
    /// Creates the codec.
    pub fn new() -> Self {
        Self
    }
}

impl Codec for AvroCodec {
    type Schema = Schema;

    fn parse(&self, definition: &str) -> Result<Schema, SchemaError> {
        Schema::parse_str(definition).map_err(|e| SchemaError::Invalid {
            error: e.to_string(),
        })
    }

    fn decode(&self, schema: &Schema, payload: &[u8]) -> Result<Record, SchemaError> {
        let mut reader = payload;
        let value = apache_avro::from_avro_datum(schema, &mut reader, None).map_err(|e| {
            SchemaError::Decode {
                error: e.to_string(),
            }
        })?;
        Ok(avro_to_record(&value))
    }

    fn encode(&self, schema: &Schema, record: &Record) -> Result<Vec<u8>, SchemaError> {
        let encode_err = |e: apache_avro::Error| SchemaError::Encode {
            error: e.to_string(),
        };
        let value = Value::from(record.clone())
            .resolve(schema)
            .map_err(encode_err)?;
        apache_avro::to_avro_datum(schema, value).map_err(encode_err)
    }
}

fn avro_to_record(value: &Value) -> Record {
    match value {
        Value::Null => Record::Null,
        Value::Boolean(b) => Record::Bool(*b),
        Value::Int(i) | Value::Date(i) | Value::TimeMillis(i) => Record::from(*i),
        Value::Long(l)
        | Value::TimeMicros(l)
        | Value::TimestampMillis(l)
        | Value::TimestampMicros(l) => Record::from(*l),
        Value::Float(f) => Number::from_f64(f64::from(*f)).map_or(Record::Null, Record::Number),
        Value::Double(d) => Number::from_f64(*d).map_or(Record::Null, Record::Number),
        Value::Bytes(b) | Value::Fixed(_, b) => {
            Record::Array(b.iter().map(|byte| Record::from(*byte)).collect())
        }
        Value::String(s) | Value::Enum(_, s) => Record::String(s.clone()),
        Value::Uuid(u) => Record::String(u.to_string()),
        Value::Union(_, inner) => avro_to_record(inner),
        Value::Array(items) => Record::Array(items.iter().map(avro_to_record).collect()),
        Value::Map(entries) => Record::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), avro_to_record(v)))
                .collect(),
        ),
        Value::Record(fields) => Record::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), avro_to_record(v)))
                .collect::<Map<_, _>>(),
        ),
        other => Record::String(format!("{other:?}")),
    }
}
