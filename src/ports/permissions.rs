use std::collections::BTreeSet;

use crate::domain::FieldDescriptor;
use crate::form::DisplayStatus;
use crate::record::{DocStatus, Record};

use super::PermissionContext;

/// Read and write grants per permission level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    read: BTreeSet<u8>,
    write: BTreeSet<u8>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and write on level 0, the common case for a document owner.
    pub fn full() -> Self {
        Self::new().grant_write(0)
    }

    pub fn read_only() -> Self {
        Self::new().grant_read(0)
    }

    pub fn grant_read(mut self, level: u8) -> Self {
        self.read.insert(level);
        self
    }

    /// Write implies read.
    pub fn grant_write(mut self, level: u8) -> Self {
        self.read.insert(level);
        self.write.insert(level);
        self
    }

    pub fn can_read(&self, level: u8) -> bool {
        self.read.contains(&level)
    }

    pub fn can_write(&self, level: u8) -> bool {
        self.write.contains(&level)
    }
}

impl PermissionContext for PermissionSet {
    fn display_status(&self, descriptor: &FieldDescriptor, record: &Record) -> DisplayStatus {
        if descriptor.hidden || !self.can_read(descriptor.permlevel) {
            return DisplayStatus::None;
        }
        let editable_doc = match record.docstatus() {
            DocStatus::Draft => true,
            DocStatus::Submitted => descriptor.allow_on_submit,
            DocStatus::Cancelled => false,
        };
        if editable_doc && !descriptor.is_read_only() && self.can_write(descriptor.permlevel) {
            DisplayStatus::Write
        } else {
            DisplayStatus::Read
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldKind;

    fn field() -> FieldDescriptor {
        FieldDescriptor::new("subject", FieldKind::Data)
    }

    #[test]
    fn write_grant_on_draft_allows_input() {
        let record = Record::new("Task", "T1");
        assert_eq!(
            PermissionSet::full().display_status(&field(), &record),
            DisplayStatus::Write
        );
        assert_eq!(
            PermissionSet::read_only().display_status(&field(), &record),
            DisplayStatus::Read
        );
    }

    #[test]
    fn missing_read_grant_hides_field() {
        let record = Record::new("Task", "T1");
        let restricted = field().with_permlevel(1);
        assert_eq!(
            PermissionSet::full().display_status(&restricted, &record),
            DisplayStatus::None
        );
        assert_eq!(
            PermissionSet::full()
                .grant_read(1)
                .display_status(&restricted, &record),
            DisplayStatus::Read
        );
    }

    #[test]
    fn submitted_records_only_accept_allow_on_submit_fields() {
        let record = Record::new("Task", "T1").with_docstatus(DocStatus::Submitted);
        let perms = PermissionSet::full();
        assert_eq!(perms.display_status(&field(), &record), DisplayStatus::Read);
        assert_eq!(
            perms.display_status(&field().allow_on_submit(), &record),
            DisplayStatus::Write
        );
    }

    #[test]
    fn read_only_configuration_wins_over_write_grant() {
        let record = Record::new("Task", "T1");
        let perms = PermissionSet::full();
        assert_eq!(
            perms.display_status(&field().read_only(), &record),
            DisplayStatus::Read
        );
        assert_eq!(
            perms.display_status(&field().hidden(), &record),
            DisplayStatus::None
        );
    }
}
