use std::collections::HashMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;

use super::{LinkMatch, LinkValidator, RemoteError, SearchSource, Suggestion};

const SEARCH_LIMIT: usize = 10;

/// Link targets held in memory, keyed by doctype then record name.
#[derive(Debug, Default)]
pub struct InMemoryLinkIndex {
    doctypes: RwLock<HashMap<String, IndexMap<String, IndexMap<String, Value>>>>,
}

impl InMemoryLinkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        doctype: impl Into<String>,
        name: impl Into<String>,
        fields: IndexMap<String, Value>,
    ) {
        self.doctypes
            .write()
            .entry(doctype.into())
            .or_default()
            .insert(name.into(), fields);
    }

    pub fn with_record(
        self,
        doctype: impl Into<String>,
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (String, Value)>,
    ) -> Self {
        self.insert(doctype, name, fields.into_iter().collect());
        self
    }

    /// Build from `{ "<doctype>": { "<name>": { "<field>": value } } }`.
    pub fn from_document(value: &Value) -> anyhow::Result<Self> {
        let index = Self::new();
        let Some(doctypes) = value.as_object() else {
            anyhow::bail!("link document must map doctypes to records");
        };
        for (doctype, records) in doctypes {
            let Some(records) = records.as_object() else {
                anyhow::bail!("records of '{doctype}' must be an object keyed by name");
            };
            for (name, fields) in records {
                let fields = match fields {
                    Value::Object(map) => map
                        .iter()
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect(),
                    Value::Null => IndexMap::new(),
                    _ => anyhow::bail!("record '{doctype}/{name}' must be an object"),
                };
                index.insert(doctype.clone(), name.clone(), fields);
            }
        }
        Ok(index)
    }
}

#[async_trait]
impl LinkValidator for InMemoryLinkIndex {
    async fn validate_link(
        &self,
        doctype: &str,
        name: &str,
        fetch_fields: &[String],
    ) -> Result<Option<LinkMatch>, RemoteError> {
        let doctypes = self.doctypes.read();
        let Some(records) = doctypes.get(doctype) else {
            return Ok(None);
        };
        let found = records
            .get_key_value(name)
            .or_else(|| {
                records
                    .iter()
                    .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            });
        Ok(found.map(|(canonical, fields)| LinkMatch {
            name: canonical.clone(),
            fetched: fetch_fields
                .iter()
                .map(|field| {
                    let value = fields.get(field).cloned().unwrap_or(Value::Null);
                    (field.clone(), value)
                })
                .collect(),
        }))
    }
}

#[async_trait]
impl SearchSource for InMemoryLinkIndex {
    async fn search(&self, doctype: &str, text: &str) -> Result<Vec<Suggestion>, RemoteError> {
        let needle = text.trim().to_lowercase();
        let doctypes = self.doctypes.read();
        let Some(records) = doctypes.get(doctype) else {
            return Ok(Vec::new());
        };
        Ok(records
            .iter()
            .filter(|(name, _)| needle.is_empty() || name.to_lowercase().contains(&needle))
            .take(SEARCH_LIMIT)
            .map(|(name, fields)| Suggestion {
                value: name.clone(),
                description: fields
                    .values()
                    .find_map(|value| value.as_str().map(str::to_string)),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn index() -> InMemoryLinkIndex {
        InMemoryLinkIndex::from_document(&json!({
            "Customer": {
                "ACME": {"customer_name": "Acme Corp", "territory": "EU"},
                "Globex": {"customer_name": "Globex"}
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn validates_case_insensitively_and_returns_canonical_name() {
        let found = index()
            .validate_link("Customer", "acme", &["customer_name".into()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.name, "ACME");
        assert_eq!(found.fetched["customer_name"], json!("Acme Corp"));
    }

    #[tokio::test]
    async fn missing_link_is_not_an_error() {
        let index = index();
        assert_eq!(index.validate_link("Customer", "Initech", &[]).await, Ok(None));
        assert_eq!(index.validate_link("Supplier", "ACME", &[]).await, Ok(None));
    }

    #[tokio::test]
    async fn search_filters_by_substring() {
        let results = index().search("Customer", "glob").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].value, "Globex");
    }
}
