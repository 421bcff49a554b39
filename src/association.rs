//! Declarative inter-table associations.
//!
//! Associations are registered on a [`Table`] once, as plain descriptors,
//! and resolved lazily through accessor methods on [`Record`]. The backing
//! column always stores an ordered list of foreign ids, even for singular
//! associations.

use crate::error::{Error, Result};
use crate::record::Record;
use crate::table::Table;
use serde_json::Value;
use std::sync::Arc;

/// Relationship cardinality.
///
/// `BelongsTo` and `HasOne` are semantically identical (singular,
/// resolve-first-id); both names exist so declarations read naturally from
/// either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    HasMany,
    BelongsTo,
    HasOne,
}

impl AssociationKind {
    pub fn is_singular(self) -> bool {
        matches!(self, AssociationKind::BelongsTo | AssociationKind::HasOne)
    }
}

/// Declared relationship from one table's records to another's, backed by
/// a column holding ordered foreign ids
#[derive(Clone)]
pub struct Association {
    pub kind: AssociationKind,
    pub target: Arc<Table>,
    pub column: String,
}

/// Extract foreign ids from a backing column value, in accessor order.
///
/// The service's edit UI and its API report list order in opposite
/// directions; the stored list is reversed so accessors match the
/// UI-visible order. A missing or non-list column reads as empty.
pub(crate) fn link_ids(column_value: Option<&Value>) -> Vec<String> {
    let empty = Vec::new();
    let items = match column_value {
        Some(Value::Array(items)) => items,
        _ => &empty,
    };

    items
        .iter()
        .filter_map(|item| item.as_str().map(str::to_string))
        .rev()
        .collect()
}

/// Anything that can stand in for a foreign id in an association setter:
/// an id string or an already-saved record
pub trait LinkRef {
    fn link_id(&self) -> Result<String>;
}

impl LinkRef for Record {
    fn link_id(&self) -> Result<String> {
        self.id()
            .map(str::to_string)
            .ok_or_else(|| Error::Validation("cannot link a record that has no id".to_string()))
    }
}

impl LinkRef for &Record {
    fn link_id(&self) -> Result<String> {
        (*self).link_id()
    }
}

impl LinkRef for String {
    fn link_id(&self) -> Result<String> {
        Ok(self.clone())
    }
}

impl LinkRef for &str {
    fn link_id(&self) -> Result<String> {
        Ok((*self).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_link_ids_reverses_storage_order() {
        let column = json!(["rec2", "rec1"]);
        assert_eq!(link_ids(Some(&column)), vec!["rec1", "rec2"]);
    }

    #[test]
    fn test_link_ids_of_missing_column_is_empty() {
        assert!(link_ids(None).is_empty());
    }

    #[test]
    fn test_link_ids_of_non_list_column_is_empty() {
        let column = json!("rec1");
        assert!(link_ids(Some(&column)).is_empty());
    }

    #[test]
    fn test_link_ids_skips_non_string_entries() {
        let column = json!(["rec2", 7, "rec1"]);
        assert_eq!(link_ids(Some(&column)), vec!["rec1", "rec2"]);
    }

    #[test]
    fn test_singular_kinds() {
        assert!(AssociationKind::BelongsTo.is_singular());
        assert!(AssociationKind::HasOne.is_singular());
        assert!(!AssociationKind::HasMany.is_singular());
    }

    #[test]
    fn test_link_ref_for_strings() {
        assert_eq!("rec1".link_id().unwrap(), "rec1");
        assert_eq!("rec2".to_string().link_id().unwrap(), "rec2");
    }
}
