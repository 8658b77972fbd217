use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::domain::{FieldDescriptor, is_null};
use crate::ports::PermissionContext;
use crate::record::Record;

/// Whether and how a control renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum DisplayStatus {
    #[default]
    None,
    Read,
    Write,
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayStatus::None => write!(f, "None"),
            DisplayStatus::Read => write!(f, "Read"),
            DisplayStatus::Write => write!(f, "Write"),
        }
    }
}

/// Resolve the display status of a field.
///
/// Pure: the result depends only on the arguments. Without a record the
/// descriptor flags decide on their own; with one, the permission context
/// decides and an empty read-only field collapses to `None` unless it is
/// input-only or of a kind that always renders.
pub fn compute_status(
    descriptor: &FieldDescriptor,
    record: Option<&Record>,
    permissions: Option<&dyn PermissionContext>,
    hidden_due_to_dependency: bool,
) -> DisplayStatus {
    if descriptor.hidden || hidden_due_to_dependency {
        return DisplayStatus::None;
    }

    let Some(record) = record else {
        return flag_status(descriptor);
    };

    let status = match permissions {
        Some(permissions) => permissions.display_status(descriptor, record),
        None => flag_status(descriptor),
    };

    let value = record.get(&descriptor.key).unwrap_or(&Value::Null);
    if status == DisplayStatus::Read
        && !descriptor.always_show_input
        && !descriptor.kind.always_renders()
        && is_null(value)
    {
        return DisplayStatus::None;
    }
    status
}

fn flag_status(descriptor: &FieldDescriptor) -> DisplayStatus {
    if descriptor.is_read_only() {
        DisplayStatus::Read
    } else {
        DisplayStatus::Write
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldKind;
    use crate::ports::PermissionSet;
    use serde_json::json;

    #[test]
    fn dialog_field_follows_flags() {
        let field = FieldDescriptor::new("title", FieldKind::Data);
        assert_eq!(compute_status(&field, None, None, false), DisplayStatus::Write);
        assert_eq!(
            compute_status(&field.clone().read_only(), None, None, false),
            DisplayStatus::Read
        );
        assert_eq!(
            compute_status(&field.clone().hidden(), None, None, false),
            DisplayStatus::None
        );
        assert_eq!(compute_status(&field, None, None, true), DisplayStatus::None);
    }

    #[test]
    fn read_only_dialog_field_ignores_value() {
        let field = FieldDescriptor::new("title", FieldKind::Data).read_only();
        assert_eq!(compute_status(&field, None, None, false), DisplayStatus::Read);
    }

    #[test]
    fn empty_read_field_is_suppressed() {
        let field = FieldDescriptor::new("title", FieldKind::Data);
        let record = Record::new("Task", "T1").with_value("title", Value::Null);
        let perms = PermissionSet::read_only();
        assert_eq!(
            compute_status(&field, Some(&record), Some(&perms), false),
            DisplayStatus::None
        );

        let filled = record.clone().with_value("title", json!("Ship"));
        assert_eq!(
            compute_status(&field, Some(&filled), Some(&perms), false),
            DisplayStatus::Read
        );
    }

    #[test]
    fn suppression_respects_overrides_and_exempt_kinds() {
        let record = Record::new("Task", "T1");
        let perms = PermissionSet::read_only();
        let input_only = FieldDescriptor::new("title", FieldKind::Data).always_show_input();
        assert_eq!(
            compute_status(&input_only, Some(&record), Some(&perms), false),
            DisplayStatus::Read
        );
        for kind in [FieldKind::Html, FieldKind::Image] {
            let embed = FieldDescriptor::new("preview", kind);
            assert_eq!(
                compute_status(&embed, Some(&record), Some(&perms), false),
                DisplayStatus::Read
            );
        }
    }

    #[test]
    fn bound_field_without_permissions_uses_flags() {
        let record = Record::new("Task", "T1");
        let field = FieldDescriptor::new("total", FieldKind::ReadOnly);
        assert_eq!(
            compute_status(&field, Some(&record), None, false),
            DisplayStatus::None
        );
        let editable = FieldDescriptor::new("title", FieldKind::Data);
        assert_eq!(
            compute_status(&editable, Some(&record), None, false),
            DisplayStatus::Write
        );
    }

    #[test]
    fn status_is_deterministic() {
        let field = FieldDescriptor::new("title", FieldKind::Data).mandatory();
        let record = Record::new("Task", "T1").with_value("title", json!("x"));
        let perms = PermissionSet::full();
        let first = compute_status(&field, Some(&record), Some(&perms), false);
        let second = compute_status(&field, Some(&record), Some(&perms), false);
        assert_eq!(first, second);
        assert_eq!(first, DisplayStatus::Write);
    }
}
