use serde_json::Value;

use crate::domain::{FieldDescriptor, value_to_string};
use crate::record::Record;

use super::base::ValueFormatter;
use super::helpers::escape_html;

/// Static markup taken from the descriptor options.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlBlockFormatter;

impl ValueFormatter for HtmlBlockFormatter {
    fn format_for_display(
        &self,
        descriptor: &FieldDescriptor,
        _value: &Value,
        _record: Option<&Record>,
    ) -> String {
        descriptor.options.clone().unwrap_or_default()
    }
}

/// Shows the image whose URL lives in the record field named by options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFormatter;

impl ValueFormatter for ImageFormatter {
    fn format_for_display(
        &self,
        descriptor: &FieldDescriptor,
        value: &Value,
        record: Option<&Record>,
    ) -> String {
        let source = descriptor
            .options
            .as_deref()
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .and_then(|field| record.and_then(|record| record.get(field)))
            .map(value_to_string)
            .unwrap_or_else(|| value_to_string(value));
        if source.is_empty() {
            return String::new();
        }
        format!("<img src=\"{}\">", escape_html(&source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldKind;
    use serde_json::json;

    #[test]
    fn html_block_shows_options() {
        let field = FieldDescriptor::new("intro", FieldKind::Html).with_options("<h4>Hello</h4>");
        assert_eq!(
            HtmlBlockFormatter.format_for_display(&field, &Value::Null, None),
            "<h4>Hello</h4>"
        );
    }

    #[test]
    fn image_reads_source_field_from_record() {
        let field = FieldDescriptor::new("preview", FieldKind::Image).with_options("photo");
        let record = Record::new("Item", "I-1").with_value("photo", json!("/files/a \"b\".png"));
        assert_eq!(
            ImageFormatter.format_for_display(&field, &Value::Null, Some(&record)),
            "<img src=\"/files/a &quot;b&quot;.png\">"
        );
        assert_eq!(ImageFormatter.format_for_display(&field, &Value::Null, None), "");
    }
}
