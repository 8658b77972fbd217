use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::domain::{FieldDescriptor, is_null, value_to_string};
use crate::form::error::ControlError;

use super::base::{Validated, ValueValidator};

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid colour pattern")
});

/// `#rgb` or `#rrggbb`; anything else clears the field.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorValidator;

#[async_trait]
impl ValueValidator for ColorValidator {
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
        let trimmed = text.trim();
        if HEX_COLOR.is_match(trimmed) {
            Ok(Validated::accept(Value::String(trimmed.to_ascii_lowercase())))
        } else {
            tracing::debug!(field = %descriptor.key, value = %text, "not a hex colour");
            Ok(Validated::rejected())
        }
    }
}
