use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use crate::domain::{DescriptorDocument, parse_descriptor_document};
use crate::ports::InMemoryLinkIndex;
use crate::record::Record;
use crate::settings::FormatSettings;

use super::DocumentFormat;

/// Parse structured data in any supported format into a `serde_json::Value`.
pub fn parse_document_str(contents: &str, format: DocumentFormat) -> Result<Value> {
    match format {
        DocumentFormat::Json => {
            serde_json::from_str::<Value>(contents).with_context(|| "failed to parse JSON document")
        }
        #[cfg(feature = "yaml")]
        DocumentFormat::Yaml => {
            serde_yaml::from_str::<Value>(contents).with_context(|| "failed to parse YAML document")
        }
        #[cfg(feature = "toml")]
        DocumentFormat::Toml => contents
            .parse::<toml::Value>()
            .with_context(|| "failed to parse TOML document")
            .and_then(|value| {
                serde_json::to_value(value).context("failed to convert TOML to JSON")
            }),
    }
}

/// Try `preferred` first, then every other compiled-in format.
pub fn parse_document_any(contents: &str, preferred: DocumentFormat) -> Result<Value> {
    let primary = match parse_document_str(contents, preferred) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };
    for candidate in DocumentFormat::available_formats() {
        if candidate == preferred {
            continue;
        }
        if let Ok(value) = parse_document_str(contents, candidate) {
            tracing::debug!(%preferred, %candidate, "document parsed with fallback format");
            return Ok(value);
        }
    }
    Err(anyhow!(
        "no supported format could read the document (first error: {primary:#})"
    ))
}

pub fn load_descriptors(contents: &str, format: DocumentFormat) -> Result<DescriptorDocument> {
    let value = parse_document_any(contents, format)?;
    parse_descriptor_document(&value).context("invalid field descriptors")
}

pub fn load_record(contents: &str, format: DocumentFormat, default_doctype: &str) -> Result<Record> {
    let value = parse_document_any(contents, format)?;
    Record::from_document(&value, default_doctype).context("invalid record document")
}

pub fn load_settings(contents: &str, format: DocumentFormat) -> Result<FormatSettings> {
    let value = parse_document_any(contents, format)?;
    FormatSettings::from_value(&value)
}

pub fn load_links(contents: &str, format: DocumentFormat) -> Result<InMemoryLinkIndex> {
    let value = parse_document_any(contents, format)?;
    InMemoryLinkIndex::from_document(&value).context("invalid link document")
}
