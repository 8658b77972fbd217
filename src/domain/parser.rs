use std::collections::HashSet;

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::{Validator, validator_for};
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DependsOn, FieldDescriptor};

/// On-disk shape of a descriptor document: either this object or a bare
/// array of descriptors.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DescriptorDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctype: Option<String>,
    pub fields: Vec<FieldDescriptor>,
}

/// JSON Schema every descriptor document is checked against before decoding.
pub fn descriptor_document_schema() -> Value {
    serde_json::to_value(schema_for!(DescriptorDocument))
        .unwrap_or_else(|_| Value::Object(Default::default()))
}

/// Parse and check a descriptor document.
pub fn parse_descriptor_document(value: &Value) -> Result<DescriptorDocument> {
    let document = match value {
        Value::Array(_) => serde_json::json!({ "fields": value }),
        Value::Object(_) => value.clone(),
        other => bail!("descriptor document must be an object or an array, got {other}"),
    };

    let validator = document_validator()?;
    let issues = validator
        .iter_errors(&document)
        .map(|error| {
            let pointer = error.instance_path.to_string();
            let prefix = if pointer.is_empty() {
                "<root>".to_string()
            } else {
                pointer
            };
            format!("{prefix}: {error}")
        })
        .collect::<Vec<_>>();
    if !issues.is_empty() {
        bail!(
            "descriptor document has {} issue(s):\n  {}",
            issues.len(),
            issues.join("\n  ")
        );
    }

    let parsed: DescriptorDocument =
        serde_json::from_value(document).context("failed to decode field descriptors")?;
    check_descriptors(&parsed.fields)?;
    Ok(parsed)
}

/// Parse a descriptor document and return only its fields.
pub fn parse_descriptors(value: &Value) -> Result<Vec<FieldDescriptor>> {
    parse_descriptor_document(value).map(|document| document.fields)
}

fn document_validator() -> Result<Validator> {
    let schema = descriptor_document_schema();
    validator_for(&schema).map_err(|err| anyhow!("failed to compile descriptor schema: {err}"))
}

fn check_descriptors(fields: &[FieldDescriptor]) -> Result<()> {
    let mut seen = HashSet::new();
    for field in fields {
        if field.key.trim().is_empty() {
            bail!("field keys must not be empty");
        }
        if !seen.insert(field.key.as_str()) {
            bail!("duplicate field key '{}'", field.key);
        }
        if let Some(expression) = &field.depends_on {
            DependsOn::parse(expression).with_context(|| format!("field '{}'", field.key))?;
        }
        if field.fetch_from.is_some() && field.fetch_source().is_none() {
            bail!(
                "field '{}': fetch_from must look like '<link_field>.<remote_field>'",
                field.key
            );
        }
    }

    for field in fields {
        if let Some((link, _)) = field.fetch_source() {
            let Some(source) = fields.iter().find(|candidate| candidate.key == link) else {
                bail!("field '{}' fetches from unknown field '{link}'", field.key);
            };
            if source.link_target().is_none() {
                bail!(
                    "field '{}' fetches from '{link}', which is not a Link field with a target",
                    field.key
                );
            }
        }
    }
    Ok(())
}
