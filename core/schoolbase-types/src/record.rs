//! Opaque records keyed by a string identifier.
//!
//! The only attribute the core understands is `id`. Everything else is
//! carried through untouched so that payloads round-trip byte-for-byte
//! between local snapshots and the remote table store.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A single row of a collection.
///
/// Serialises flat: `{"id": "S1", "name": "A", ...}`. Deserialising goes
/// through [`Record::from_value`], so rows from any source share its id rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Record {
    id: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Record {
    /// Creates a record from an id and its payload fields.
    ///
    /// A stray `id` key inside `fields` is dropped; the explicit id wins.
    pub fn new(id: impl Into<String>, mut fields: Map<String, Value>) -> Self {
        fields.remove("id");
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Creates a record with a freshly generated, time-ordered id.
    #[must_use]
    pub fn generate(fields: Map<String, Value>) -> Self {
        Self::new(Uuid::now_v7().to_string(), fields)
    }

    /// Builds a record from an arbitrary JSON value.
    ///
    /// The value must be an object with a non-empty string `id`.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(Error::NotAnObject);
        };
        let id = match fields.remove("id") {
            None => return Err(Error::MissingId),
            Some(Value::String(id)) if !id.is_empty() => id,
            Some(other) => return Err(Error::InvalidId(other.to_string())),
        };
        Ok(Self { id, fields })
    }

    /// Returns the record identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns a payload field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        if field == "id" {
            return None;
        }
        self.fields.get(field)
    }

    /// Sets a payload field. Setting `id` re-keys the record and requires a
    /// non-empty string.
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> Result<()> {
        let field = field.into();
        if field == "id" {
            match value {
                Value::String(id) if !id.is_empty() => self.id = id,
                other => return Err(Error::InvalidId(other.to_string())),
            }
            return Ok(());
        }
        self.fields.insert(field, value);
        Ok(())
    }

    /// Returns the payload fields (without `id`).
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Converts the record back into a flat JSON object.
    pub fn into_value(self) -> Value {
        let mut object = Map::with_capacity(self.fields.len() + 1);
        object.insert("id".to_string(), Value::String(self.id));
        object.extend(self.fields);
        Value::Object(object)
    }
}

impl TryFrom<Value> for Record {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}
