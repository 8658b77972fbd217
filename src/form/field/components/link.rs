use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;

use crate::domain::{FieldDescriptor, is_null, value_to_string};
use crate::form::error::ControlError;
use crate::ports::LinkValidator;
use crate::record::Record;

use super::base::{Validated, ValueFormatter, ValueValidator};
use super::helpers::escape_html;

/// Same unreserved set as `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Link values must name an existing record of the target doctype.
///
/// Unknown names normalize to the empty sentinel and clear every field that
/// fetches from this link. Remote failures surface as errors.
#[derive(Clone)]
pub struct LinkExistence {
    links: Arc<dyn LinkValidator>,
}

impl LinkExistence {
    pub fn new(links: Arc<dyn LinkValidator>) -> Self {
        Self { links }
    }
}

impl std::fmt::Debug for LinkExistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkExistence").finish_non_exhaustive()
    }
}

#[async_trait]
impl ValueValidator for LinkExistence {
    async fn validate(
        &self,
        descriptor: &FieldDescriptor,
        value: Value,
        fetch_fields: &[String],
    ) -> Result<Validated, ControlError> {
        if is_null(&value) {
            return Ok(Validated::accept(value));
        }
        let Some(doctype) = descriptor.link_target() else {
            return Ok(Validated::accept(value));
        };
        let name = value_to_string(&value);
        match self.links.validate_link(doctype, name.trim(), fetch_fields).await? {
            Some(found) => Ok(Validated {
                value: Value::String(found.name),
                invalid: false,
                fetched: found.fetched,
            }),
            None => {
                tracing::debug!(field = %descriptor.key, doctype, name = %name, "link target not found");
                let fetched: IndexMap<String, Value> = fetch_fields
                    .iter()
                    .map(|field| (field.clone(), Value::String(String::new())))
                    .collect();
                Ok(Validated {
                    fetched,
                    ..Validated::rejected()
                })
            }
        }
    }
}

/// Anchor pointing at the linked record.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkFormatter;

impl ValueFormatter for LinkFormatter {
    fn format_for_display(
        &self,
        descriptor: &FieldDescriptor,
        value: &Value,
        _record: Option<&Record>,
    ) -> String {
        let name = value_to_string(value);
        if name.is_empty() {
            return String::new();
        }
        let Some(doctype) = descriptor.link_target() else {
            return escape_html(&name);
        };
        let slug = doctype.to_lowercase().replace(' ', "-");
        format!(
            "<a href=\"/app/{}/{}\">{}</a>",
            utf8_percent_encode(&slug, URI_COMPONENT),
            utf8_percent_encode(&name, URI_COMPONENT),
            escape_html(&name)
        )
    }
}
