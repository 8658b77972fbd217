use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::domain::{FieldDescriptor, is_null, value_to_string};
use crate::form::error::{ControlError, ParseError};
use crate::record::Record;

use super::base::{Validated, ValueFormatter, ValueParser, ValueValidator};
use super::helpers::{escape_html, text_to_html};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("valid e-mail pattern")
});
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9 ().-]{6,}$").expect("valid phone pattern"));
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)https?://[^\s/$.?#][^\s]*$").expect("valid url pattern"));

static SCRIPT_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|iframe|object)\b[^>]*>.*?</(script|style|iframe|object)\s*>")
        .expect("valid block pattern")
});
static DANGLING_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(script|style|iframe|object)\b[^>]*>").expect("valid tag pattern")
});
static EVENT_HANDLERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#)
        .expect("valid handler pattern")
});
static SCRIPT_URLS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(href|src)\s*=\s*("\s*javascript:[^"]*"|'\s*javascript:[^']*'|javascript:[^\s>]*)"#)
        .expect("valid url attribute pattern")
});
static TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag pattern"));

/// Free text: strings stay as typed, scalars become their string form.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextParser;

impl ValueParser for TextParser {
    fn parse(&self, _descriptor: &FieldDescriptor, raw: &Value) -> Result<Value, ParseError> {
        Ok(match raw {
            Value::Null => Value::Null,
            Value::String(_) => raw.clone(),
            other => Value::String(value_to_string(other)),
        })
    }
}

/// Escaped plain text; `multiline` keeps line breaks as `<br>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter {
    pub multiline: bool,
}

impl ValueFormatter for PlainFormatter {
    fn format_for_display(
        &self,
        _descriptor: &FieldDescriptor,
        value: &Value,
        _record: Option<&Record>,
    ) -> String {
        let text = value_to_string(value);
        if self.multiline {
            text_to_html(&text)
        } else {
            escape_html(&text)
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordFormatter;

impl ValueFormatter for PasswordFormatter {
    fn format_for_display(
        &self,
        _descriptor: &FieldDescriptor,
        value: &Value,
        _record: Option<&Record>,
    ) -> String {
        if is_null(value) {
            String::new()
        } else {
            "*".repeat(8)
        }
    }
}

/// `Data` sub-types from the descriptor options: `Email`, `Phone`, `URL`.
/// A mismatch keeps the value and flags it invalid.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataValidator;

#[async_trait]
impl ValueValidator for DataValidator {
    async fn validate(
        &self,
        descriptor: &FieldDescriptor,
        value: Value,
        _fetch_fields: &[String],
    ) -> Result<Validated, ControlError> {
        if is_null(&value) {
            return Ok(Validated::accept(value));
        }
        let text = value_to_string(&value);
        let pattern = match descriptor.options.as_deref().map(str::trim) {
            Some("Email") => &*EMAIL,
            Some("Phone") => &*PHONE,
            Some("URL") => &*URL,
            _ => return Ok(Validated::accept(value)),
        };
        if pattern.is_match(text.trim()) {
            Ok(Validated::accept(value))
        } else {
            tracing::debug!(field = %descriptor.key, "value does not match data sub-type");
            Ok(Validated::flagged(value))
        }
    }
}

/// Rich text: strips executable markup and collapses empty editor content
/// to null.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlSanitizer;

impl HtmlSanitizer {
    pub fn sanitize(markup: &str) -> String {
        let cleaned = SCRIPT_BLOCKS.replace_all(markup, "");
        let cleaned = DANGLING_TAGS.replace_all(&cleaned, "");
        let cleaned = EVENT_HANDLERS.replace_all(&cleaned, "");
        let cleaned = SCRIPT_URLS.replace_all(&cleaned, "$1=\"#\"");
        cleaned.into_owned()
    }

    /// Editor markup without text or images, e.g. `<p><br></p>`.
    pub fn is_blank(markup: &str) -> bool {
        if markup.to_ascii_lowercase().contains("<img") {
            return false;
        }
        TAGS.replace_all(markup, "")
            .replace("&nbsp;", "")
            .trim()
            .is_empty()
    }
}

impl ValueParser for HtmlSanitizer {
    fn parse(&self, _descriptor: &FieldDescriptor, raw: &Value) -> Result<Value, ParseError> {
        let markup = match raw {
            Value::Null => return Ok(Value::Null),
            Value::String(text) => text.clone(),
            other => value_to_string(other),
        };
        if Self::is_blank(&markup) {
            return Ok(Value::Null);
        }
        Ok(Value::String(Self::sanitize(&markup)))
    }
}

/// Markup shown as-is; only sanitized values ever reach it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RichTextFormatter;

impl ValueFormatter for RichTextFormatter {
    fn format_for_display(
        &self,
        _descriptor: &FieldDescriptor,
        value: &Value,
        _record: Option<&Record>,
    ) -> String {
        value_to_string(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldKind;
    use serde_json::json;

    fn data(options: &str) -> FieldDescriptor {
        FieldDescriptor::new("contact", FieldKind::Data).with_options(options)
    }

    #[tokio::test]
    async fn email_sub_type_flags_but_keeps_value() {
        let bad = DataValidator
            .validate(&data("Email"), json!("not-an-email"), &[])
            .await
            .unwrap();
        assert!(bad.invalid);
        assert_eq!(bad.value, json!("not-an-email"));

        let good = DataValidator
            .validate(&data("Email"), json!("ops@example.com"), &[])
            .await
            .unwrap();
        assert!(!good.invalid);
    }

    #[tokio::test]
    async fn plain_data_accepts_anything() {
        let result = DataValidator
            .validate(&data(""), json!("<anything>"), &[])
            .await
            .unwrap();
        assert_eq!(result, Validated::accept(json!("<anything>")));
    }

    #[test]
    fn sanitizer_removes_scripts_and_handlers() {
        let dirty = r#"<p onclick="steal()">Hi<script>alert(1)</script></p><a href="javascript:evil()">x</a>"#;
        let clean = HtmlSanitizer::sanitize(dirty);
        assert_eq!(clean, r##"<p>Hi</p><a href="#">x</a>"##);
    }

    #[test]
    fn blank_editor_markup_parses_to_null() {
        let field = FieldDescriptor::new("notes", FieldKind::TextEditor);
        assert_eq!(
            HtmlSanitizer.parse(&field, &json!("<p><br></p>")).unwrap(),
            Value::Null
        );
        assert_eq!(
            HtmlSanitizer.parse(&field, &json!("<p>&nbsp;</p>")).unwrap(),
            Value::Null
        );
        assert_eq!(
            HtmlSanitizer
                .parse(&field, &json!("<p><img src=\"a.png\"></p>"))
                .unwrap(),
            json!("<p><img src=\"a.png\"></p>")
        );
    }

    #[test]
    fn plain_display_is_escaped() {
        let field = FieldDescriptor::new("notes", FieldKind::Text);
        let formatter = PlainFormatter { multiline: true };
        let shown = formatter.format_for_display(&field, &json!("a < b\nc"), None);
        assert_eq!(shown, "a &lt; b<br>c");
        assert_eq!(
            shown,
            formatter.format_for_display(&field, &json!("a < b\nc"), None)
        );
    }

    #[test]
    fn passwords_are_masked() {
        let field = FieldDescriptor::new("secret", FieldKind::Password);
        assert_eq!(
            PasswordFormatter.format_for_display(&field, &json!("hunter2"), None),
            "********"
        );
        assert_eq!(PasswordFormatter.format_for_display(&field, &Value::Null, None), "");
    }
}
