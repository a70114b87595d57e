use serde::Serialize;
use serde_json::{Map, Value};

use crate::bail;
use crate::error::{ErrorKind, FeedResult};
use crate::types::Identity;

/// Address of a feed row: one row per identity and store view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedKey {
    pub store_view_code: String,
    pub identity: Identity,
}

impl FeedKey {
    pub fn new(store_view_code: impl Into<String>, identity: Identity) -> Self {
        Self {
            store_view_code: store_view_code.into(),
            identity,
        }
    }
}

/// A computed or stored feed record.
///
/// The identity and the store view code are kept out of `fields`, so attribute merges can
/// never rewrite the record's address.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRecord {
    pub identity: Identity,
    pub store_view_code: String,
    pub fields: Map<String, Value>,
}

impl FeedRecord {
    pub fn new(identity: Identity, store_view_code: impl Into<String>) -> Self {
        Self {
            identity,
            store_view_code: store_view_code.into(),
            fields: Map::new(),
        }
    }

    /// Adds or replaces an attribute field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn key(&self) -> FeedKey {
        FeedKey::new(self.store_view_code.clone(), self.identity)
    }

    /// Builds the flat document seen by feed consumers: every field plus the structural keys
    /// under `identity_field` and `scope_field`.
    pub fn to_document(&self, identity_field: &str, scope_field: &str) -> Value {
        let mut document = self.fields.clone();
        document.insert(identity_field.to_string(), Value::from(self.identity.0));
        document.insert(
            scope_field.to_string(),
            Value::String(self.store_view_code.clone()),
        );

        Value::Object(document)
    }

    /// Splits a flat document back into structural keys and attribute fields.
    ///
    /// Fails with [`ErrorKind::InvalidData`] when the document is not an object or lacks
    /// either structural key.
    pub fn from_document(
        document: Value,
        identity_field: &str,
        scope_field: &str,
    ) -> FeedResult<FeedRecord> {
        let Value::Object(mut fields) = document else {
            bail!(
                ErrorKind::InvalidData,
                "Feed document is not an object",
                "Stored feed data must be a JSON object"
            );
        };

        let identity = match fields.remove(identity_field) {
            Some(Value::Number(number)) if number.is_i64() => {
                Identity(number.as_i64().unwrap_or_default())
            }
            Some(Value::String(text)) => Identity(text.trim().parse()?),
            _ => bail!(
                ErrorKind::InvalidData,
                "Feed document has no identity",
                format!("Field '{identity_field}' is missing or not an integer")
            ),
        };

        let Some(Value::String(store_view_code)) = fields.remove(scope_field) else {
            bail!(
                ErrorKind::InvalidData,
                "Feed document has no scope",
                format!("Field '{scope_field}' is missing or not a string")
            );
        };

        Ok(FeedRecord {
            identity,
            store_view_code,
            fields,
        })
    }
}

/// What the downstream consumer is told about one written record.
///
/// `attributes` lists the attribute codes that changed; it is empty for a fresh write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackEntry {
    pub identity: Identity,
    pub store_view_code: String,
    pub attributes: Vec<String>,
}
