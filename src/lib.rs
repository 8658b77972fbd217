#![deny(rust_2018_idioms)]
//! Permission-aware form controls.
//!
//! A [`Control`] is bound to one [`FieldDescriptor`] and optionally to a
//! shared [`Record`]. On every refresh it resolves a [`DisplayStatus`],
//! renders either an input or a read-only view, and commits new values
//! through a parse, validate and model-update pipeline that admits at most
//! one commit in flight. [`FormLayout`] hosts all controls of one record.

pub mod domain;
pub mod form;
pub mod io;
pub mod ports;
pub mod record;
pub mod search;
pub mod settings;

pub use domain::{DependsOn, FieldDescriptor, FieldKind, parse_descriptors};
pub use form::{
    CommitOutcome, Control, ControlError, ControlRegistry, ControlView, DisplayStatus,
    FormContext, FormLayout, InputView, ParseError, compute_status,
};
pub use io::{DocumentFormat, OutputDestination, OutputOptions};
pub use ports::{
    ChangeEvent, ChangeHook, InMemoryLinkIndex, LinkValidator, ModelMutator, MutationError,
    PermissionContext, PermissionSet, RemoteError, SearchSource,
};
pub use record::{DocStatus, Record, RecordRef, RecordStore, SharedRecord};
pub use search::Suggester;
pub use settings::{ControlOptions, FormatSettings};

pub mod prelude {
    pub use super::{
        CommitOutcome, Control, ControlError, ControlOptions, ControlRegistry, DisplayStatus,
        FieldDescriptor, FieldKind, FormContext, FormLayout, PermissionSet, Record, RecordStore,
    };
}
