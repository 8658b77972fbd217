//! Backing records and the in-memory store that owns them.
//!
//! Controls never own a record: they hold a [`SharedRecord`] handle for
//! reads and route every write through a [`ModelMutator`]. [`RecordStore`]
//! is the explicit repository keyed by doctype and name; it implements the
//! mutator and broadcasts one [`FieldChanged`] per accepted write.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::domain::FieldKind;
use crate::ports::{ModelMutator, MutationError};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordRef {
    pub doctype: String,
    pub name: String,
}

impl RecordRef {
    pub fn new(doctype: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            doctype: doctype.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.doctype, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DocStatus {
    #[default]
    Draft,
    Submitted,
    Cancelled,
}

impl TryFrom<u8> for DocStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DocStatus::Draft),
            1 => Ok(DocStatus::Submitted),
            2 => Ok(DocStatus::Cancelled),
            other => Err(format!("unknown docstatus {other}")),
        }
    }
}

impl From<DocStatus> for u8 {
    fn from(status: DocStatus) -> Self {
        match status {
            DocStatus::Draft => 0,
            DocStatus::Submitted => 1,
            DocStatus::Cancelled => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    reference: RecordRef,
    docstatus: DocStatus,
    values: IndexMap<String, Value>,
}

pub type SharedRecord = Arc<RwLock<Record>>;

impl Record {
    pub fn new(doctype: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            reference: RecordRef::new(doctype, name),
            docstatus: DocStatus::Draft,
            values: IndexMap::new(),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn with_docstatus(mut self, docstatus: DocStatus) -> Self {
        self.docstatus = docstatus;
        self
    }

    pub fn reference(&self) -> &RecordRef {
        &self.reference
    }

    pub fn docstatus(&self) -> DocStatus {
        self.docstatus
    }

    pub fn set_docstatus(&mut self, docstatus: DocStatus) {
        self.docstatus = docstatus;
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Store `value` under `key`, returning what was there before.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    pub fn into_shared(self) -> SharedRecord {
        Arc::new(RwLock::new(self))
    }

    /// Flatten into a single object: `doctype`, `name`, `docstatus` then the field values.
    pub fn to_document(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            "doctype".to_string(),
            Value::String(self.reference.doctype.clone()),
        );
        map.insert(
            "name".to_string(),
            Value::String(self.reference.name.clone()),
        );
        map.insert(
            "docstatus".to_string(),
            Value::from(u8::from(self.docstatus)),
        );
        for (key, value) in &self.values {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }

    /// Inverse of [`Record::to_document`]. Missing `doctype`/`name` fall back
    /// to the supplied defaults.
    pub fn from_document(value: &Value, default_doctype: &str) -> Result<Self> {
        let Some(map) = value.as_object() else {
            bail!("record document must be an object");
        };
        let doctype = map
            .get("doctype")
            .and_then(Value::as_str)
            .unwrap_or(default_doctype);
        let name = map.get("name").and_then(Value::as_str).unwrap_or("new");
        let docstatus = match map.get("docstatus") {
            None | Some(Value::Null) => DocStatus::Draft,
            Some(raw) => {
                let code = raw
                    .as_u64()
                    .and_then(|code| u8::try_from(code).ok())
                    .context("docstatus must be 0, 1 or 2")?;
                DocStatus::try_from(code).map_err(anyhow::Error::msg)?
            }
        };
        let mut record = Record::new(doctype, name).with_docstatus(docstatus);
        for (key, value) in map {
            if matches!(key.as_str(), "doctype" | "name" | "docstatus") {
                continue;
            }
            record.set(key.clone(), value.clone());
        }
        Ok(record)
    }
}

/// One accepted write, as broadcast by [`RecordStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChanged {
    pub record: RecordRef,
    pub key: String,
    pub kind: FieldKind,
    pub previous: Option<Value>,
    pub value: Value,
}

#[derive(Debug)]
pub struct RecordStore {
    records: RwLock<HashMap<RecordRef, SharedRecord>>,
    changes: broadcast::Sender<FieldChanged>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            records: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Insert (or replace) a record and hand back the shared handle.
    pub fn insert(&self, record: Record) -> SharedRecord {
        let reference = record.reference().clone();
        let shared = record.into_shared();
        self.records
            .write()
            .insert(reference, Arc::clone(&shared));
        shared
    }

    pub fn get(&self, reference: &RecordRef) -> Option<SharedRecord> {
        self.records.read().get(reference).cloned()
    }

    pub fn remove(&self, reference: &RecordRef) -> Option<SharedRecord> {
        self.records.write().remove(reference)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FieldChanged> {
        self.changes.subscribe()
    }
}

#[async_trait]
impl ModelMutator for RecordStore {
    async fn set_field_value(
        &self,
        record: &RecordRef,
        key: &str,
        value: Value,
        kind: FieldKind,
    ) -> Result<(), MutationError> {
        let shared = self
            .get(record)
            .ok_or_else(|| MutationError::RecordNotFound(record.clone()))?;
        let previous = {
            let mut guard = shared.write();
            if guard.docstatus() == DocStatus::Cancelled {
                return Err(MutationError::NotEditable {
                    record: record.clone(),
                    docstatus: DocStatus::Cancelled,
                });
            }
            guard.set(key, value.clone())
        };
        tracing::trace!(record = %record, field = key, kind = %kind, "field value stored");
        // Nobody listening is fine.
        let _ = self.changes.send(FieldChanged {
            record: record.clone(),
            key: key.to_string(),
            kind,
            previous,
            value,
        });
        Ok(())
    }
}
