use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of field kinds a control can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum FieldKind {
    Data,
    #[serde(rename = "Small Text")]
    SmallText,
    Text,
    Password,
    #[serde(rename = "Text Editor")]
    TextEditor,
    Int,
    Float,
    Currency,
    Percent,
    Check,
    Select,
    Link,
    Date,
    Color,
    #[serde(rename = "HTML")]
    Html,
    Image,
    #[serde(rename = "Read Only")]
    ReadOnly,
}

impl FieldKind {
    pub const ALL: [FieldKind; 17] = [
        FieldKind::Data,
        FieldKind::SmallText,
        FieldKind::Text,
        FieldKind::Password,
        FieldKind::TextEditor,
        FieldKind::Int,
        FieldKind::Float,
        FieldKind::Currency,
        FieldKind::Percent,
        FieldKind::Check,
        FieldKind::Select,
        FieldKind::Link,
        FieldKind::Date,
        FieldKind::Color,
        FieldKind::Html,
        FieldKind::Image,
        FieldKind::ReadOnly,
    ];

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldKind::Int | FieldKind::Float | FieldKind::Currency | FieldKind::Percent
        )
    }

    /// Kinds that always render their container, even when read-only and empty.
    pub fn always_renders(self) -> bool {
        matches!(self, FieldKind::Html | FieldKind::Image)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Data => "Data",
            FieldKind::SmallText => "Small Text",
            FieldKind::Text => "Text",
            FieldKind::Password => "Password",
            FieldKind::TextEditor => "Text Editor",
            FieldKind::Int => "Int",
            FieldKind::Float => "Float",
            FieldKind::Currency => "Currency",
            FieldKind::Percent => "Percent",
            FieldKind::Check => "Check",
            FieldKind::Select => "Select",
            FieldKind::Link => "Link",
            FieldKind::Date => "Date",
            FieldKind::Color => "Color",
            FieldKind::Html => "HTML",
            FieldKind::Image => "Image",
            FieldKind::ReadOnly => "Read Only",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static configuration for one field.
///
/// Descriptors are immutable once a control is built from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FieldDescriptor {
    pub key: String,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Kind-specific options: select choices (one per line), link target,
    /// Data sub-type, HTML content or the image source field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub always_show_input: bool,
    #[serde(default)]
    pub allow_on_submit: bool,
    #[serde(default)]
    pub permlevel: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
    /// `link_key.remote_field`: copy `remote_field` of the linked record
    /// into this field whenever `link_key` is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldDescriptor {
    pub fn new(key: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            kind,
            label: None,
            description: None,
            options: None,
            precision: None,
            read_only: false,
            hidden: false,
            mandatory: false,
            bold: false,
            always_show_input: false,
            allow_on_submit: false,
            permlevel: 0,
            depends_on: None,
            fetch_from: None,
            default: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = Some(options.into());
        self
    }

    pub fn with_precision(mut self, precision: u8) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn with_permlevel(mut self, permlevel: u8) -> Self {
        self.permlevel = permlevel;
        self
    }

    pub fn with_depends_on(mut self, expression: impl Into<String>) -> Self {
        self.depends_on = Some(expression.into());
        self
    }

    pub fn with_fetch_from(mut self, source: impl Into<String>) -> Self {
        self.fetch_from = Some(source.into());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn always_show_input(mut self) -> Self {
        self.always_show_input = true;
        self
    }

    pub fn allow_on_submit(mut self) -> Self {
        self.allow_on_submit = true;
        self
    }

    /// Set by the flag, or implied by a kind that has no input at all.
    pub fn is_read_only(&self) -> bool {
        self.read_only
            || matches!(
                self.kind,
                FieldKind::ReadOnly | FieldKind::Html | FieldKind::Image
            )
    }

    pub fn display_label(&self) -> String {
        match self.label.as_deref() {
            Some(label) if !label.trim().is_empty() => label.to_string(),
            _ => prettify_label(&self.key),
        }
    }

    pub fn select_options(&self) -> Vec<String> {
        self.options
            .as_deref()
            .map(|raw| raw.lines().map(|line| line.trim().to_string()).collect())
            .unwrap_or_default()
    }

    pub fn link_target(&self) -> Option<&str> {
        if self.kind != FieldKind::Link {
            return None;
        }
        self.options
            .as_deref()
            .map(str::trim)
            .filter(|target| !target.is_empty())
    }

    /// Splits `fetch_from` into `(link_key, remote_field)`.
    pub fn fetch_source(&self) -> Option<(&str, &str)> {
        let (link, field) = self.fetch_from.as_deref()?.split_once('.')?;
        let (link, field) = (link.trim(), field.trim());
        if link.is_empty() || field.is_empty() {
            None
        } else {
            Some((link, field))
        }
    }
}

pub fn prettify_label(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut result = String::with_capacity(raw.len());
    let mut capitalize = true;
    for ch in raw.chars() {
        if ch == '_' || ch == '-' {
            result.push(' ');
            capitalize = true;
            continue;
        }

        if capitalize {
            result.push(ch.to_ascii_uppercase());
            capitalize = false;
        } else {
            result.push(ch);
        }
    }

    result.trim().to_string()
}
