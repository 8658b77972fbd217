use std::fmt::Write as _;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;

use crate::domain::{FieldDescriptor, value_to_string};
use crate::form::error::ParseError;
use crate::record::Record;
use crate::settings::FormatSettings;

use super::base::{ValueFormatter, ValueParser};

const ISO_DATE: &str = "%Y-%m-%d";

/// Dates are stored as ISO `yyyy-mm-dd` and typed in the user format.
#[derive(Debug, Clone)]
pub struct DateControl {
    format: Arc<FormatSettings>,
}

impl DateControl {
    pub fn new(format: Arc<FormatSettings>) -> Self {
        Self { format }
    }

    fn read(&self, text: &str) -> Option<NaiveDate> {
        let text = text.trim();
        // Datetime strings keep their date part.
        let date_part = text.split([' ', 'T']).next().unwrap_or(text);
        NaiveDate::parse_from_str(date_part, &self.format.chrono_date_pattern())
            .or_else(|_| NaiveDate::parse_from_str(date_part, ISO_DATE))
            .ok()
    }

    fn render(&self, value: &Value) -> String {
        let text = value_to_string(value);
        match self.read(&text) {
            Some(date) => {
                let mut out = String::new();
                match write!(out, "{}", date.format(&self.format.chrono_date_pattern())) {
                    Ok(()) => out,
                    Err(_) => date.format(ISO_DATE).to_string(),
                }
            }
            None => text,
        }
    }
}

impl ValueParser for DateControl {
    fn parse(&self, descriptor: &FieldDescriptor, raw: &Value) -> Result<Value, ParseError> {
        let text = match raw {
            Value::Null => return Ok(Value::Null),
            Value::String(text) => text.as_str(),
            other => return Ok(other.clone()),
        };
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        match self.read(text) {
            Some(date) => Ok(Value::String(date.format(ISO_DATE).to_string())),
            None => {
                tracing::debug!(field = %descriptor.key, input = text, "unreadable date kept as typed");
                Ok(raw.clone())
            }
        }
    }
}

impl ValueFormatter for DateControl {
    fn format_for_input(&self, _descriptor: &FieldDescriptor, value: &Value) -> String {
        self.render(value)
    }

    fn format_for_display(
        &self,
        _descriptor: &FieldDescriptor,
        value: &Value,
        _record: Option<&Record>,
    ) -> String {
        self.render(value)
    }
}
