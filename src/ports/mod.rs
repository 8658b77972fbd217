//! Collaborator interfaces a control consumes.
//!
//! The control contract owns none of these concerns: permissions, record
//! persistence and remote lookups are injected through the traits below.
//! In-memory implementations live next to them for hosts and tests that do
//! not talk to a server.

mod links;
mod permissions;

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{FieldDescriptor, FieldKind};
use crate::form::DisplayStatus;
use crate::record::{DocStatus, Record, RecordRef};

pub use links::InMemoryLinkIndex;
pub use permissions::PermissionSet;

/// Resolves how a field may be shown for a given record.
pub trait PermissionContext: Send + Sync {
    fn display_status(&self, descriptor: &FieldDescriptor, record: &Record) -> DisplayStatus;
}

impl<P: PermissionContext + ?Sized> PermissionContext for Arc<P> {
    fn display_status(&self, descriptor: &FieldDescriptor, record: &Record) -> DisplayStatus {
        (**self).display_status(descriptor, record)
    }
}

/// The only sanctioned write path for a bound control.
#[async_trait]
pub trait ModelMutator: Send + Sync {
    async fn set_field_value(
        &self,
        record: &RecordRef,
        key: &str,
        value: Value,
        kind: FieldKind,
    ) -> Result<(), MutationError>;
}

/// A linked record that exists, with the values dependents asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkMatch {
    /// Canonical name as stored remotely.
    pub name: String,
    pub fetched: IndexMap<String, Value>,
}

/// Remote existence check for link values.
#[async_trait]
pub trait LinkValidator: Send + Sync {
    /// `Ok(None)` means "no such record" and is not an error.
    async fn validate_link(
        &self,
        doctype: &str,
        name: &str,
        fetch_fields: &[String],
    ) -> Result<Option<LinkMatch>, RemoteError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Option-list lookups feeding autocomplete.
#[async_trait]
pub trait SearchSource: Send + Sync {
    async fn search(&self, doctype: &str, text: &str) -> Result<Vec<Suggestion>, RemoteError>;
}

/// Passed to the change hook once per successful commit.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub key: String,
    pub value: Value,
    pub previous: Option<Value>,
}

pub type ChangeHook = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MutationError {
    #[error("record {0} not found")]
    RecordNotFound(RecordRef),
    #[error("record {record} is not editable (docstatus {docstatus:?})")]
    NotEditable {
        record: RecordRef,
        docstatus: DocStatus,
    },
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("remote call failed: {message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
