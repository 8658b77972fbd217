use std::sync::Arc;

use serde_json::Value;

use crate::domain::{FieldDescriptor, is_truthy};
use crate::form::error::ParseError;
use crate::record::Record;
use crate::settings::FormatSettings;

use super::base::{ValueFormatter, ValueParser};

/// Checkboxes store `1` or `0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckParser;

impl ValueParser for CheckParser {
    fn parse(&self, _descriptor: &FieldDescriptor, raw: &Value) -> Result<Value, ParseError> {
        let checked = match raw {
            Value::String(text) => matches!(
                text.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on" | "checked"
            ),
            other => is_truthy(other),
        };
        Ok(Value::from(u8::from(checked)))
    }
}

#[derive(Debug, Clone)]
pub struct CheckFormatter {
    format: Arc<FormatSettings>,
}

impl CheckFormatter {
    pub fn new(format: Arc<FormatSettings>) -> Self {
        Self { format }
    }
}

impl ValueFormatter for CheckFormatter {
    fn format_for_input(&self, _descriptor: &FieldDescriptor, value: &Value) -> String {
        if is_truthy(value) { "1" } else { "0" }.to_string()
    }

    fn format_for_display(
        &self,
        _descriptor: &FieldDescriptor,
        value: &Value,
        _record: Option<&Record>,
    ) -> String {
        if is_truthy(value) {
            self.format.check_true_label.to_string()
        } else {
            self.format.check_false_label.to_string()
        }
    }
}
