use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{FieldDescriptor, is_null, value_to_string};
use crate::form::error::ControlError;

use super::base::{Validated, ValueValidator};

/// Accepts only values listed in the descriptor options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectValidator;

#[async_trait]
impl ValueValidator for SelectValidator {
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
        if descriptor.select_options().iter().any(|option| *option == text) {
            Ok(Validated::accept(Value::String(text)))
        } else {
            tracing::debug!(field = %descriptor.key, value = %text, "value is not a listed option");
            Ok(Validated::rejected())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldKind;
    use serde_json::json;

    fn status() -> FieldDescriptor {
        FieldDescriptor::new("status", FieldKind::Select).with_options("Open\nClosed")
    }

    #[tokio::test]
    async fn listed_options_pass() {
        let result = SelectValidator
            .validate(&status(), json!("Closed"), &[])
            .await
            .unwrap();
        assert_eq!(result.value, json!("Closed"));
    }

    #[tokio::test]
    async fn unknown_options_normalize_to_empty() {
        let result = SelectValidator
            .validate(&status(), json!("Archived"), &[])
            .await
            .unwrap();
        assert_eq!(result, Validated::rejected());
    }
}
