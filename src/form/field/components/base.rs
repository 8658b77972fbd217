use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

use crate::domain::{FieldDescriptor, value_to_string};
use crate::form::error::{ControlError, ParseError};
use crate::record::Record;

/// Turns raw input into a candidate value.
pub trait ValueParser: fmt::Debug + Send + Sync {
    fn parse(&self, descriptor: &FieldDescriptor, raw: &Value) -> Result<Value, ParseError>;
}

/// Derives strings from a raw value. Implementations hold no mutable state,
/// so formatting the same value twice yields the same string.
pub trait ValueFormatter: fmt::Debug + Send + Sync {
    /// Text pushed into the interactive input.
    fn format_for_input(&self, descriptor: &FieldDescriptor, value: &Value) -> String {
        let _ = descriptor;
        value_to_string(value)
    }

    /// Escaped markup shown in the read-only region.
    fn format_for_display(
        &self,
        descriptor: &FieldDescriptor,
        value: &Value,
        record: Option<&Record>,
    ) -> String;
}

/// Checks a parsed value, possibly against a remote source.
///
/// Ordinary bad input is normalized into the returned [`Validated`], never
/// reported as an error.
#[async_trait]
pub trait ValueValidator: fmt::Debug + Send + Sync {
    async fn validate(
        &self,
        descriptor: &FieldDescriptor,
        value: Value,
        fetch_fields: &[String],
    ) -> Result<Validated, ControlError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub value: Value,
    /// Kept but flagged, e.g. a malformed e-mail address.
    pub invalid: bool,
    /// Values for fields that fetch from this one.
    pub fetched: IndexMap<String, Value>,
}

impl Validated {
    pub fn accept(value: Value) -> Self {
        Self {
            value,
            invalid: false,
            fetched: IndexMap::new(),
        }
    }

    pub fn flagged(value: Value) -> Self {
        Self {
            invalid: true,
            ..Self::accept(value)
        }
    }

    /// The empty sentinel a rejected value normalizes to.
    pub fn rejected() -> Self {
        Self::accept(Value::String(String::new()))
    }
}

/// The strategies one control kind is composed of.
#[derive(Debug, Clone)]
pub struct Behaviour {
    pub parser: Arc<dyn ValueParser>,
    pub formatter: Arc<dyn ValueFormatter>,
    pub validator: Arc<dyn ValueValidator>,
}

impl Behaviour {
    pub fn new(
        parser: Arc<dyn ValueParser>,
        formatter: Arc<dyn ValueFormatter>,
        validator: Arc<dyn ValueValidator>,
    ) -> Self {
        Self {
            parser,
            formatter,
            validator,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn ValueParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn ValueFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn ValueValidator>) -> Self {
        self.validator = validator;
        self
    }
}

/// Passes values through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl ValueParser for PassThrough {
    fn parse(&self, _descriptor: &FieldDescriptor, raw: &Value) -> Result<Value, ParseError> {
        Ok(raw.clone())
    }
}

#[async_trait]
impl ValueValidator for PassThrough {
    async fn validate(
        &self,
        _descriptor: &FieldDescriptor,
        value: Value,
        _fetch_fields: &[String],
    ) -> Result<Validated, ControlError> {
        Ok(Validated::accept(value))
    }
}
