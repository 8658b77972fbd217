use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

use super::DocumentFormat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDestination {
    Stdout,
    File(PathBuf),
}

impl OutputDestination {
    pub fn file(path: impl AsRef<Path>) -> Self {
        OutputDestination::File(path.as_ref().to_path_buf())
    }
}

/// Where and how a record snapshot is written.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: DocumentFormat,
    pub pretty: bool,
    pub destinations: Vec<OutputDestination>,
}

impl OutputOptions {
    pub fn new(format: DocumentFormat) -> Self {
        Self {
            format,
            pretty: true,
            destinations: vec![OutputDestination::Stdout],
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_destinations(mut self, destinations: Vec<OutputDestination>) -> Self {
        self.destinations = destinations;
        self
    }
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self::new(DocumentFormat::default())
    }
}

pub fn serialize_document(value: &Value, format: DocumentFormat, pretty: bool) -> Result<String> {
    match format {
        DocumentFormat::Json if pretty => {
            serde_json::to_string_pretty(value).context("failed to serialize JSON")
        }
        DocumentFormat::Json => serde_json::to_string(value).context("failed to serialize JSON"),
        #[cfg(feature = "yaml")]
        DocumentFormat::Yaml => serde_yaml::to_string(value).context("failed to serialize YAML"),
        #[cfg(feature = "toml")]
        DocumentFormat::Toml if pretty => {
            toml::to_string_pretty(value).context("failed to serialize TOML")
        }
        #[cfg(feature = "toml")]
        DocumentFormat::Toml => toml::to_string(value).context("failed to serialize TOML"),
    }
}

/// Write a record snapshot to every configured destination.
pub fn emit_document(value: &Value, options: &OutputOptions) -> Result<()> {
    if options.destinations.is_empty() {
        return Ok(());
    }
    let mut payload = serialize_document(value, options.format, options.pretty)?;
    if !payload.ends_with('\n') {
        payload.push('\n');
    }
    for destination in &options.destinations {
        match destination {
            OutputDestination::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout
                    .write_all(payload.as_bytes())
                    .and_then(|_| stdout.flush())
                    .context("failed to write to stdout")?;
            }
            OutputDestination::File(path) => fs::write(path, &payload)
                .with_context(|| format!("failed to write to file {}", path.display()))?,
        }
        tracing::debug!(?destination, format = %options.format, "record written");
    }
    Ok(())
}
