use crate::association::{Association, AssociationKind};
use crate::client::{self, Client, Config};
use crate::error::Result;
use crate::query::{self, Params};
use crate::record::Record;
use crate::response::{self, ListPayload, RecordPayload};
use indexmap::IndexMap;
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::sync::{Arc, RwLock};

/// Sort direction for listing requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// Options for [`Table::all`]. Only options the caller supplies are sent.
///
/// Pagination is followed by default; `paginate(false)` returns only the
/// first page.
#[derive(Debug, Clone)]
pub struct Select {
    filter: Option<String>,
    sort: Vec<(String, Direction)>,
    view: Option<String>,
    fields: Vec<String>,
    max_records: Option<u32>,
    page_size: Option<u32>,
    paginate: bool,
}

impl Default for Select {
    fn default() -> Self {
        Select {
            filter: None,
            sort: Vec::new(),
            view: None,
            fields: Vec::new(),
            max_records: None,
            page_size: None,
            paginate: true,
        }
    }
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter rows with a server-side formula
    pub fn filter(mut self, formula: impl Into<String>) -> Self {
        self.filter = Some(formula.into());
        self
    }

    /// Append a sort field; call order becomes sort priority
    pub fn sort(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.sort.push((field.into(), direction));
        self
    }

    /// Restrict to a named view
    pub fn view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    /// Restrict the returned field names
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Cap the total number of returned rows
    pub fn max_records(mut self, max_records: u32) -> Self {
        self.max_records = Some(max_records);
        self
    }

    /// Set the per-page row count
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Whether to follow offset cursors past the first page
    pub fn paginate(mut self, paginate: bool) -> Self {
        self.paginate = paginate;
        self
    }

    fn follows_pagination(&self) -> bool {
        self.paginate
    }

    pub(crate) fn to_params(&self) -> Params {
        let mut params = Params::new();

        if let Some(filter) = &self.filter {
            params.insert("filterByFormula".to_string(), json!(filter));
        }
        if !self.sort.is_empty() {
            let sort: Vec<Value> = self
                .sort
                .iter()
                .map(|(field, direction)| {
                    json!({"field": field, "direction": direction.as_str()})
                })
                .collect();
            params.insert("sort".to_string(), Value::Array(sort));
        }
        if let Some(view) = &self.view {
            params.insert("view".to_string(), json!(view));
        }
        if !self.fields.is_empty() {
            params.insert("fields".to_string(), json!(self.fields));
        }
        if let Some(max_records) = self.max_records {
            params.insert("maxRecords".to_string(), json!(max_records));
        }
        if let Some(page_size) = self.page_size {
            params.insert("pageSize".to_string(), json!(page_size));
        }

        params
    }
}

/// Handle for one table of a base.
///
/// The api key, base key, and table name are fixed at registration.
/// Associations may be declared after construction so mutually-referencing
/// tables can be wired together; they are held behind a lock but only ever
/// written during registration.
pub struct Table {
    table_name: String,
    client: Arc<Client>,
    associations: RwLock<IndexMap<String, Association>>,
}

impl Table {
    /// Register a table. The underlying client is fetched from the
    /// process-wide registry, so tables of the same base share a connection
    /// and a rate-limit window.
    pub fn new(config: &Config, base_key: &str, table_name: impl Into<String>) -> Arc<Self> {
        Self::with_client(client::shared(config, base_key), table_name)
    }

    /// Register a table against an explicit client (tests use this with a
    /// stub transport)
    pub fn with_client(client: Arc<Client>, table_name: impl Into<String>) -> Arc<Self> {
        Arc::new(Table {
            table_name: table_name.into(),
            client,
            associations: RwLock::new(IndexMap::new()),
        })
    }

    pub fn api_key(&self) -> &str {
        self.client.api_key()
    }

    pub fn base_key(&self) -> &str {
        self.client.base_key()
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }

    /// Declare a plural association resolved through `column`
    pub fn has_many(&self, name: impl Into<String>, target: &Arc<Table>, column: impl Into<String>) {
        self.add_association(name, AssociationKind::HasMany, target, column);
    }

    /// Declare a singular association resolved through `column`
    pub fn belongs_to(
        &self,
        name: impl Into<String>,
        target: &Arc<Table>,
        column: impl Into<String>,
    ) {
        self.add_association(name, AssociationKind::BelongsTo, target, column);
    }

    /// Alias of [`Table::belongs_to`] for declarations that read better
    /// from the owning side
    pub fn has_one(&self, name: impl Into<String>, target: &Arc<Table>, column: impl Into<String>) {
        self.add_association(name, AssociationKind::HasOne, target, column);
    }

    fn add_association(
        &self,
        name: impl Into<String>,
        kind: AssociationKind,
        target: &Arc<Table>,
        column: impl Into<String>,
    ) {
        self.associations
            .write()
            .expect("association lock poisoned")
            .insert(
                name.into(),
                Association {
                    kind,
                    target: Arc::clone(target),
                    column: column.into(),
                },
            );
    }

    pub(crate) fn association(&self, name: &str) -> Option<Association> {
        self.associations
            .read()
            .expect("association lock poisoned")
            .get(name)
            .cloned()
    }

    /// Build an unsaved record bound to this table
    pub fn record(self: &Arc<Self>, fields: Map<String, Value>) -> Record {
        Record::build(self, fields)
    }

    /// Fetch a single record by id
    pub fn find(self: &Arc<Self>, id: &str) -> Result<Record> {
        let response = self
            .client
            .request(Method::GET, &self.record_path(id), None, None)?;
        let payload: RecordPayload = response::parse(&response)?;

        Ok(Record::loaded(
            self,
            Some(id.to_string()),
            payload.created_time,
            payload.fields,
        ))
    }

    /// List records, following offset cursors page by page unless the
    /// select disables pagination
    pub fn all(self: &Arc<Self>, select: &Select) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut params = select.to_params();
            if let Some(cursor) = &offset {
                params.insert("offset".to_string(), json!(cursor));
            }
            let query = if params.is_empty() { None } else { Some(&params) };

            let response = self
                .client
                .request(Method::GET, &self.collection_path(), query, None)?;
            let page: ListPayload = response::parse(&response)?;

            records.extend(
                page.records
                    .into_iter()
                    .map(|payload| Record::from_payload(self, payload)),
            );

            match page.offset {
                Some(cursor) if select.follows_pagination() && !cursor.is_empty() => {
                    offset = Some(cursor);
                }
                _ => break,
            }
        }

        Ok(records)
    }

    /// Create a record with the given fields. Empty field bags are allowed.
    pub fn create(self: &Arc<Self>, fields: Map<String, Value>) -> Result<Record> {
        let mut record = self.record(fields);
        record.save()?;
        Ok(record)
    }

    /// Fetch records for a list of ids with a single OR formula.
    ///
    /// An empty id list returns an empty vec without any network call.
    /// Results come back ordered to match the input ids; rows the formula
    /// matched that were not asked for sort last.
    pub fn find_many<S: AsRef<str>>(self: &Arc<Self>, ids: &[S]) -> Result<Vec<Record>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let clauses: Vec<String> = ids
            .iter()
            .map(|id| format!("RECORD_ID() = '{}'", id.as_ref()))
            .collect();
        let formula = format!("OR({})", clauses.join(","));

        let mut records = self.all(&Select::new().filter(formula))?;
        records.sort_by_key(|record| {
            ids.iter()
                .position(|id| Some(id.as_ref()) == record.id())
                .unwrap_or(usize::MAX)
        });

        Ok(records)
    }

    pub(crate) fn collection_path(&self) -> String {
        format!("/v0/{}/{}", self.base_key(), query::escape(&self.table_name))
    }

    pub(crate) fn record_path(&self, id: &str) -> String {
        format!("{}/{}", self.collection_path(), query::escape(id))
    }
}
