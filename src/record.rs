use crate::association::{self, LinkRef};
use crate::error::{Error, Result};
use crate::response::{self, RecordPayload};
use crate::table::Table;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// One row of a table.
///
/// A record without an id is "new": it can be created but not updated or
/// destroyed. Field writes that change a value accumulate in the dirty set;
/// saves send only that subset and clear it on success.
pub struct Record {
    table: Arc<Table>,
    id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    fields: Map<String, Value>,
    dirty: HashSet<String>,
}

impl Record {
    pub(crate) fn build(table: &Arc<Table>, fields: Map<String, Value>) -> Self {
        Record {
            table: Arc::clone(table),
            id: None,
            created_at: None,
            fields,
            dirty: HashSet::new(),
        }
    }

    pub(crate) fn loaded(
        table: &Arc<Table>,
        id: Option<String>,
        created_at: Option<DateTime<Utc>>,
        fields: Map<String, Value>,
    ) -> Self {
        Record {
            table: Arc::clone(table),
            id,
            created_at,
            fields,
            dirty: HashSet::new(),
        }
    }

    pub(crate) fn from_payload(table: &Arc<Table>, payload: RecordPayload) -> Self {
        Self::loaded(table, payload.id, payload.created_time, payload.fields)
    }

    /// The remote-assigned identifier, absent until created
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Creation timestamp, absent until created
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Whether this record has never been saved
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Field names changed since the last load or save
    pub fn updated_keys(&self) -> &HashSet<String> {
        &self.dirty
    }

    /// Read a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Write a field value.
    ///
    /// Writing the current value again is a no-op and does not mark the
    /// field dirty. An empty field name is a usage error.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        if key.is_empty() {
            return Err(Error::Validation(
                "field name must be non-empty".to_string(),
            ));
        }

        let value = value.into();
        if self.fields.get(key) == Some(&value) {
            return Ok(());
        }

        self.dirty.insert(key.to_string());
        self.fields.insert(key.to_string(), value);
        Ok(())
    }

    /// Persist the record.
    ///
    /// A new record is created. An existing record with no dirty fields
    /// succeeds without any request; otherwise exactly the dirty subset is
    /// PATCHed (never PUT, so computed fields stay untouched) and the whole
    /// in-memory field bag is replaced with the server's returned fields.
    pub fn save(&mut self) -> Result<()> {
        let id = match self.id.clone() {
            None => return self.create(),
            Some(id) => id,
        };

        if self.dirty.is_empty() {
            return Ok(());
        }

        let dirty_fields: Map<String, Value> = self
            .fields
            .iter()
            .filter(|(key, _)| self.dirty.contains(*key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let body = json!({ "fields": dirty_fields });

        let response =
            self.table
                .client()
                .request(Method::PATCH, &self.table.record_path(&id), None, Some(&body))?;
        let payload: RecordPayload = response::parse(&response)?;

        self.fields = payload.fields;
        self.dirty.clear();
        Ok(())
    }

    /// Create the record remotely; fails if it already has an id.
    ///
    /// On success the server-assigned id, creation timestamp, and fields
    /// (which may include computed values) are adopted and the dirty set is
    /// cleared.
    pub fn create(&mut self) -> Result<()> {
        if !self.is_new() {
            return Err(Error::DuplicateCreate);
        }

        let body = json!({ "fields": self.fields });
        let response = self.table.client().request(
            Method::POST,
            &self.table.collection_path(),
            None,
            Some(&body),
        )?;
        let payload: RecordPayload = response::parse(&response)?;

        self.id = payload.id;
        self.created_at = payload.created_time;
        self.fields = payload.fields;
        self.dirty.clear();
        Ok(())
    }

    /// Delete the record remotely; fails immediately on a new record
    pub fn destroy(&mut self) -> Result<()> {
        let id = self.id.clone().ok_or(Error::NewRecordDestroy)?;

        let response =
            self.table
                .client()
                .request(Method::DELETE, &self.table.record_path(&id), None, None)?;
        response::check(&response)?;
        Ok(())
    }

    /// Resolve a hasMany association: the backing column's ids, reversed to
    /// UI order, fetched in one batched lookup
    pub fn linked_records(&self, name: &str) -> Result<Vec<Record>> {
        let assoc = self.association(name)?;
        let ids = association::link_ids(self.fields.get(&assoc.column));
        assoc.target.find_many(&ids)
    }

    /// Resolve a belongsTo/hasOne association: `None` when the backing
    /// column is empty, else the record behind the first id in UI order
    pub fn linked_record(&self, name: &str) -> Result<Option<Record>> {
        let assoc = self.association(name)?;
        let ids = association::link_ids(self.fields.get(&assoc.column));

        match ids.first() {
            Some(id) => Ok(Some(assoc.target.find(id)?)),
            None => Ok(None),
        }
    }

    /// Store an association from records or ids.
    ///
    /// Ids are written to the backing column in reverse, matching how the
    /// getter reads them back; the column is marked dirty only when the
    /// stored list actually changes.
    pub fn set_linked<L: LinkRef>(&mut self, name: &str, items: &[L]) -> Result<()> {
        let assoc = self.association(name)?;

        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            ids.push(Value::String(item.link_id()?));
        }
        ids.reverse();

        self.set(&assoc.column, Value::Array(ids))
    }

    fn association(&self, name: &str) -> Result<crate::association::Association> {
        self.table
            .association(name)
            .ok_or_else(|| Error::UnknownAssociation {
                name: name.to_string(),
            })
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &self.table.table_name())
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("fields", &self.fields)
            .field("dirty", &self.dirty)
            .finish()
    }
}

/// Records compare equal when they belong to the same table handle and
/// carry the same fields, mirroring value semantics rather than identity
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.table, &other.table) && self.fields == other.fields
    }
}
