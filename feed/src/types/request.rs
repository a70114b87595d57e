use serde::Deserialize;
use std::collections::BTreeSet;

use crate::bail;
use crate::error::{ErrorKind, FeedError, FeedResult};
use crate::types::{Identity, ScopeId};

/// Separator of attribute codes inside [`ChangeRecord::attribute_ids`].
const ATTRIBUTE_IDS_SEPARATOR: char = ',';

/// One unit of indexing work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexRequest {
    /// Recompute every attribute of the identity.
    FullRecompute { identity: Identity },
    /// Recompute only `attribute_ids` and merge them into the stored record.
    ///
    /// `attribute_ids` is never empty. A `scope` of `None` means the change applies to every
    /// store view; there is no separate sentinel for scope `0`.
    PartialRecompute {
        identity: Identity,
        attribute_ids: BTreeSet<String>,
        scope: Option<ScopeId>,
    },
}

impl IndexRequest {
    pub fn full(identity: Identity) -> Self {
        IndexRequest::FullRecompute { identity }
    }

    /// Builds a partial request, falling back to a full recompute when no attribute is given.
    pub fn partial<I, S>(identity: Identity, attribute_ids: I, scope: Option<ScopeId>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attribute_ids: BTreeSet<String> = attribute_ids.into_iter().map(Into::into).collect();
        if attribute_ids.is_empty() {
            return IndexRequest::FullRecompute { identity };
        }

        IndexRequest::PartialRecompute {
            identity,
            attribute_ids,
            scope,
        }
    }

    pub fn identity(&self) -> Identity {
        match self {
            IndexRequest::FullRecompute { identity }
            | IndexRequest::PartialRecompute { identity, .. } => *identity,
        }
    }

    pub fn attribute_ids(&self) -> Option<&BTreeSet<String>> {
        match self {
            IndexRequest::FullRecompute { .. } => None,
            IndexRequest::PartialRecompute { attribute_ids, .. } => Some(attribute_ids),
        }
    }

    pub fn scope(&self) -> Option<ScopeId> {
        match self {
            IndexRequest::FullRecompute { .. } => None,
            IndexRequest::PartialRecompute { scope, .. } => *scope,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, IndexRequest::PartialRecompute { .. })
    }
}

/// A change record as written by a change-tracking log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChangeRecord {
    pub entity_id: Option<Identity>,
    /// Comma separated attribute codes, absent or blank for a full recompute.
    #[serde(default)]
    pub attribute_ids: Option<String>,
    #[serde(default)]
    pub store_id: Option<ScopeId>,
}

/// Input element of [`crate::indexer::FeedIndexer::execute`]: a bare identity or a change
/// record.
///
/// Deserializes from a JSON array mixing integers and objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IndexTarget {
    Id(Identity),
    Change(ChangeRecord),
}

impl From<Identity> for IndexTarget {
    fn from(identity: Identity) -> Self {
        IndexTarget::Id(identity)
    }
}

impl From<ChangeRecord> for IndexTarget {
    fn from(change: ChangeRecord) -> Self {
        IndexTarget::Change(change)
    }
}

impl TryFrom<IndexTarget> for IndexRequest {
    type Error = FeedError;

    fn try_from(target: IndexTarget) -> Result<Self, Self::Error> {
        match target {
            IndexTarget::Id(identity) => Ok(IndexRequest::full(identity)),
            IndexTarget::Change(change) => {
                let Some(identity) = change.entity_id else {
                    bail!(
                        ErrorKind::InvalidData,
                        "Malformed change record",
                        "The change record has no `entity_id`"
                    );
                };

                let attribute_ids = match change.attribute_ids.as_deref() {
                    Some(raw) => parse_attribute_ids(identity, raw)?,
                    None => BTreeSet::new(),
                };

                Ok(IndexRequest::partial(
                    identity,
                    attribute_ids,
                    change.store_id,
                ))
            }
        }
    }
}

/// Splits and deduplicates a comma separated attribute list.
///
/// A blank list yields no attributes; an empty segment inside a non-blank list is malformed.
fn parse_attribute_ids(identity: Identity, raw: &str) -> FeedResult<BTreeSet<String>> {
    if raw.trim().is_empty() {
        return Ok(BTreeSet::new());
    }

    let mut attribute_ids = BTreeSet::new();
    for segment in raw.split(ATTRIBUTE_IDS_SEPARATOR) {
        let segment = segment.trim();
        if segment.is_empty() {
            bail!(
                ErrorKind::InvalidData,
                "Malformed change record",
                format!("Entity {identity} has an empty attribute code in '{raw}'")
            );
        }

        attribute_ids.insert(segment.to_string());
    }

    Ok(attribute_ids)
}
