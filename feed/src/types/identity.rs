use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ErrorKind, FeedError};
use crate::feed_error;

/// Key shared by a source row, its feed rows and the index requests targeting it.
///
/// Identities are the integer keys of the source table, scanned in ascending order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "RawScalar", into = "i64")]
pub struct Identity(pub i64);

impl From<i64> for Identity {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Identity> for i64 {
    fn from(value: Identity) -> Self {
        value.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<RawScalar> for Identity {
    type Error = FeedError;

    fn try_from(value: RawScalar) -> Result<Self, Self::Error> {
        value.into_i64().map(Identity)
    }
}

/// Store scope (store view) a change record is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawScalar", into = "i64")]
pub struct ScopeId(pub i64);

impl From<ScopeId> for i64 {
    fn from(value: ScopeId) -> Self {
        value.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<RawScalar> for ScopeId {
    type Error = FeedError;

    fn try_from(value: RawScalar) -> Result<Self, Self::Error> {
        value.into_i64().map(ScopeId)
    }
}

/// Integer keys arrive either as JSON numbers or as numeric strings from change logs.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Integer(i64),
    Text(String),
}

impl RawScalar {
    fn into_i64(self) -> Result<i64, FeedError> {
        match self {
            RawScalar::Integer(value) => Ok(value),
            RawScalar::Text(text) => text.trim().parse::<i64>().map_err(|err| {
                feed_error!(
                    ErrorKind::ConversionError,
                    "Key is not an integer",
                    format!("'{text}' cannot be parsed as an integer key"),
                    source: err
                )
            }),
        }
    }
}
