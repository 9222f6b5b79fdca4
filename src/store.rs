use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Record;

/// A record's writable field set, keyed by field label.
pub type Fields = Map<String, Value>;

/// The concrete type used to share the record store across the application state.
pub type StoreState = Arc<dyn RecordStore>;

/// Base URL of the Airtable REST API.
const AIRTABLE_API_URL: &str = "https://api.airtable.com/v0";

/// StoreError
///
/// Failures talking to the record store: either the HTTP transport broke, or
/// the store answered with an error of its own. The message is kept verbatim
/// so the caller can surface it.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },
}

// --- Filter Formulas ---

/// One side of an equality test inside a filter formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// A plain field reference: `{Label}`.
    Name(String),
    /// A lower-cased field reference: `LOWER({Label})`.
    Lower(String),
    /// The record's own identifier: `RECORD_ID()`.
    RecordId,
}

/// Formula
///
/// The disjunctive-equality subset of the store's filter language that this
/// service needs. Building filters structurally keeps caller input out of the
/// formula syntax, and lets the in-memory mock evaluate the same filter the
/// real client renders to the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    Eq(Field, Value),
    Or(Vec<Formula>),
}

impl Formula {
    /// `{field} = value`
    pub fn field_eq(field: &str, value: impl Into<Value>) -> Self {
        Formula::Eq(Field::Name(field.to_string()), value.into())
    }

    /// `{field} = TRUE()`, the checked-checkbox test.
    pub fn checked(field: &str) -> Self {
        Self::field_eq(field, true)
    }

    /// `LOWER({field}) = "value"` with the value lower-cased up front.
    pub fn lower_eq(field: &str, value: &str) -> Self {
        Formula::Eq(
            Field::Lower(field.to_string()),
            Value::String(value.to_lowercase()),
        )
    }

    /// `RECORD_ID() = "id"`
    pub fn record_id_is(id: &str) -> Self {
        Formula::Eq(Field::RecordId, Value::String(id.to_string()))
    }

    /// `OR(a, b, ...)`
    pub fn any_of(options: Vec<Formula>) -> Self {
        Formula::Or(options)
    }

    /// Renders the formula in the store's wire syntax.
    pub fn render(&self) -> String {
        match self {
            Formula::Eq(field, value) => {
                format!("{} = {}", render_field(field), render_value(value))
            }
            // OR() of nothing matches nothing.
            Formula::Or(options) if options.is_empty() => "FALSE()".to_string(),
            Formula::Or(options) => {
                let rendered: Vec<String> = options.iter().map(Formula::render).collect();
                format!("OR({})", rendered.join(", "))
            }
        }
    }

    /// Evaluates the formula against a record, mirroring the wire semantics.
    /// Used by the in-memory store.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            // Unchecked checkboxes are absent from the fields map.
            Formula::Eq(Field::Name(f), Value::Bool(want)) => record.bool_field(f) == *want,
            Formula::Eq(Field::Name(f), want) => record.fields.get(f) == Some(want),
            Formula::Eq(Field::Lower(f), Value::String(want)) => record
                .fields
                .get(f)
                .and_then(Value::as_str)
                .is_some_and(|s| s.to_lowercase() == *want),
            Formula::Eq(Field::Lower(_), _) => false,
            Formula::Eq(Field::RecordId, Value::String(want)) => record.id == *want,
            Formula::Eq(Field::RecordId, _) => false,
            Formula::Or(options) => options.iter().any(|f| f.matches(record)),
        }
    }
}

fn render_field(field: &Field) -> String {
    match field {
        Field::Name(f) => format!("{{{}}}", f),
        Field::Lower(f) => format!("LOWER({{{}}})", f),
        Field::RecordId => "RECORD_ID()".to_string(),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Bool(true) => "TRUE()".to_string(),
        Value::Bool(false) => "FALSE()".to_string(),
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => other.to_string(),
    }
}

// --- RecordStore Contract ---

/// RecordStore
///
/// The abstract contract for the external tabular store: per-table select with
/// an optional filter, find-by-id, batched create, update, and destroy. Handlers
/// depend on this trait only, so the HTTP-backed client and the in-memory mock
/// are interchangeable behind `Arc<dyn RecordStore>`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetches one page of records, optionally filtered, capped at `max_records`.
    async fn select(
        &self,
        table: &str,
        filter: Option<Formula>,
        max_records: Option<u32>,
    ) -> Result<Vec<Record>, StoreError>;

    /// Fetches a single record by id. A miss is `Ok(None)`, not an error.
    async fn find(&self, table: &str, id: &str) -> Result<Option<Record>, StoreError>;

    /// Creates one record per entry in `fields`, in one batched call.
    async fn create(&self, table: &str, fields: Vec<Fields>) -> Result<Vec<Record>, StoreError>;

    /// Merges `fields` into an existing record and returns the updated record.
    async fn update(&self, table: &str, id: &str, fields: Fields) -> Result<Record, StoreError>;

    /// Deletes a record. A missing id is an upstream error, mirroring the store.
    async fn destroy(&self, table: &str, id: &str) -> Result<(), StoreError>;
}

// --- Airtable Implementation ---

/// AirtableStore
///
/// The HTTP-backed implementation of `RecordStore` against the Airtable REST
/// API. There is no retry or timeout layer on top of the client: any failure
/// is terminal for the request that triggered it.
#[derive(Clone)]
pub struct AirtableStore {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct RecordPage {
    records: Vec<Record>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Airtable reports errors either as `{"error": "NOT_FOUND"}` or as
/// `{"error": {"type": ..., "message": ...}}` depending on the endpoint.
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed {
        #[serde(rename = "type")]
        kind: String,
        message: Option<String>,
    },
    Plain(String),
}

impl AirtableStore {
    pub fn new(api_key: &str, base_id: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: format!("{}/{}", AIRTABLE_API_URL, base_id),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn record_url(&self, table: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, table, id)
    }

    /// Turns a non-2xx response into a `StoreError`, preserving the upstream
    /// message when the body carries one.
    async fn api_error(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let message = match response.json::<ErrorEnvelope>().await {
            Ok(envelope) => match envelope.error {
                ErrorBody::Detailed {
                    message: Some(message),
                    ..
                } => message,
                ErrorBody::Detailed { kind, .. } => kind,
                ErrorBody::Plain(message) => message,
            },
            Err(_) => format!("record store answered with status {}", status),
        };
        StoreError::Api { status, message }
    }
}

#[async_trait]
impl RecordStore for AirtableStore {
    async fn select(
        &self,
        table: &str,
        filter: Option<Formula>,
        max_records: Option<u32>,
    ) -> Result<Vec<Record>, StoreError> {
        let mut request = self.client.get(self.table_url(table)).bearer_auth(&self.api_key);
        if let Some(formula) = &filter {
            request = request.query(&[("filterByFormula", formula.render())]);
        }
        if let Some(max) = max_records {
            request = request.query(&[("maxRecords", max.to_string())]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let page: RecordPage = response.json().await?;
        Ok(page.records)
    }

    async fn find(&self, table: &str, id: &str) -> Result<Option<Record>, StoreError> {
        let response = self
            .client
            .get(self.record_url(table, id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(Some(response.json().await?))
    }

    async fn create(&self, table: &str, fields: Vec<Fields>) -> Result<Vec<Record>, StoreError> {
        let body = serde_json::json!({
            "records": fields
                .into_iter()
                .map(|f| serde_json::json!({ "fields": f }))
                .collect::<Vec<_>>(),
        });

        let response = self
            .client
            .post(self.table_url(table))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let page: RecordPage = response.json().await?;
        Ok(page.records)
    }

    async fn update(&self, table: &str, id: &str, fields: Fields) -> Result<Record, StoreError> {
        let response = self
            .client
            .patch(self.record_url(table, id))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "fields": fields }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn destroy(&self, table: &str, id: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.record_url(table, id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(())
    }
}

// --- Mock Implementation (For Tests) ---

/// MockRecordStore
///
/// An in-memory implementation of `RecordStore` used by the test suite. It
/// keeps records per table, evaluates filter formulas structurally, and can be
/// switched into a failure mode to exercise upstream-error paths without a
/// network connection.
#[derive(Default)]
pub struct MockRecordStore {
    tables: Mutex<HashMap<String, Vec<Record>>>,
    fail: bool,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails, for exercising 500-class paths.
    pub fn new_failing() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
            fail: true,
        }
    }

    /// Inserts a record directly and returns its generated id.
    pub fn seed(&self, table: &str, fields: Fields) -> String {
        let record = Record {
            id: next_record_id(),
            fields,
            created_time: None,
        };
        let id = record.id.clone();
        self.tables
            .lock()
            .expect("mock store poisoned")
            .entry(table.to_string())
            .or_default()
            .push(record);
        id
    }

    /// Reads a record back, for assertions on store contents.
    pub fn get(&self, table: &str, id: &str) -> Option<Record> {
        self.tables
            .lock()
            .expect("mock store poisoned")
            .get(table)
            .and_then(|records| records.iter().find(|r| r.id == id).cloned())
    }

    fn check_failure(&self) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Api {
                status: 503,
                message: "mock store failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Record ids mimic the store's shape: `rec` plus 14 alphanumerics.
fn next_record_id() -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(14).collect();
    format!("rec{}", suffix)
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn select(
        &self,
        table: &str,
        filter: Option<Formula>,
        max_records: Option<u32>,
    ) -> Result<Vec<Record>, StoreError> {
        self.check_failure()?;
        let tables = self.tables.lock().expect("mock store poisoned");
        let mut records: Vec<Record> = tables
            .get(table)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| filter.as_ref().is_none_or(|f| f.matches(r)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Some(max) = max_records {
            records.truncate(max as usize);
        }
        Ok(records)
    }

    async fn find(&self, table: &str, id: &str) -> Result<Option<Record>, StoreError> {
        self.check_failure()?;
        Ok(self.get(table, id))
    }

    async fn create(&self, table: &str, fields: Vec<Fields>) -> Result<Vec<Record>, StoreError> {
        self.check_failure()?;
        let mut tables = self.tables.lock().expect("mock store poisoned");
        let records = tables.entry(table.to_string()).or_default();
        let created: Vec<Record> = fields
            .into_iter()
            .map(|f| Record {
                id: next_record_id(),
                fields: f,
                created_time: None,
            })
            .collect();
        records.extend(created.iter().cloned());
        Ok(created)
    }

    async fn update(&self, table: &str, id: &str, fields: Fields) -> Result<Record, StoreError> {
        self.check_failure()?;
        let mut tables = self.tables.lock().expect("mock store poisoned");
        let record = tables
            .get_mut(table)
            .and_then(|records| records.iter_mut().find(|r| r.id == id))
            .ok_or(StoreError::Api {
                status: 404,
                message: "Record not found".to_string(),
            })?;
        // Field-level merge, the way the store applies partial updates.
        for (key, value) in fields {
            record.fields.insert(key, value);
        }
        Ok(record.clone())
    }

    async fn destroy(&self, table: &str, id: &str) -> Result<(), StoreError> {
        self.check_failure()?;
        let mut tables = self.tables.lock().expect("mock store poisoned");
        let records = tables.get_mut(table).ok_or(StoreError::Api {
            status: 404,
            message: "Record not found".to_string(),
        })?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(StoreError::Api {
                status: 404,
                message: "Record not found".to_string(),
            });
        }
        Ok(())
    }
}
