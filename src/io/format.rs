use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Serialization formats for descriptor, record and settings documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Json,
    #[cfg(feature = "yaml")]
    Yaml,
    #[cfg(feature = "toml")]
    Toml,
}

impl DocumentFormat {
    /// Every format compiled into this build, JSON first.
    pub fn available_formats() -> Vec<DocumentFormat> {
        vec![
            DocumentFormat::Json,
            #[cfg(feature = "yaml")]
            DocumentFormat::Yaml,
            #[cfg(feature = "toml")]
            DocumentFormat::Toml,
        ]
    }

    /// Format implied by a file extension, if this build supports it.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        ext.parse().ok()
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(DocumentFormat::Json),
            #[cfg(feature = "yaml")]
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            #[cfg(feature = "toml")]
            "toml" => Ok(DocumentFormat::Toml),
            other => Err(format!("unsupported document format '{other}'")),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Json => write!(f, "json"),
            #[cfg(feature = "yaml")]
            DocumentFormat::Yaml => write!(f, "yaml"),
            #[cfg(feature = "toml")]
            DocumentFormat::Toml => write!(f, "toml"),
        }
    }
}
