//! One field bound to a descriptor and, optionally, a shared record.
//!
//! A [`Control`] recomputes its [`DisplayStatus`] on every
//! [`refresh`](Control::refresh), renders either its input or its read-only
//! text, and commits new values through the pipeline in [`commit`].

mod commit;
mod render;

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::domain::{FieldDescriptor, FieldKind, is_null};
use crate::form::error::ParseError;
use crate::form::field::Behaviour;
use crate::form::status::{DisplayStatus, compute_status};
use crate::ports::{ChangeHook, ModelMutator, PermissionContext};
use crate::record::SharedRecord;

pub use commit::{CommitOutcome, CommitState};
pub use render::{ControlView, InputView};

use render::{InputState, RenderContext};

/// A field whose value is copied from a linked record when the link
/// changes, e.g. `customer_name` fetching `customer.customer_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    /// Field on the linked record.
    pub remote_field: String,
    /// Field on this record that receives the value.
    pub local_key: String,
    pub kind: FieldKind,
}

struct Binding {
    record: SharedRecord,
    mutator: Arc<dyn ModelMutator>,
}

#[derive(Debug, Default)]
struct ControlState {
    status: DisplayStatus,
    /// Committed value of an unbound control.
    local_value: Value,
    previous_value: Option<Value>,
    input: Option<InputState>,
    inputs_made: usize,
    invalid: bool,
    mandatory_highlight: bool,
    hidden_due_to_dependency: bool,
}

pub struct Control {
    descriptor: FieldDescriptor,
    behaviour: Behaviour,
    binding: Option<Binding>,
    permissions: Option<Arc<dyn PermissionContext>>,
    on_change: Option<ChangeHook>,
    fetch_targets: Vec<FetchTarget>,
    state: Mutex<ControlState>,
    latch: Mutex<CommitState>,
}

impl Control {
    pub fn new(descriptor: FieldDescriptor, behaviour: Behaviour) -> Self {
        Self {
            descriptor,
            behaviour,
            binding: None,
            permissions: None,
            on_change: None,
            fetch_targets: Vec::new(),
            state: Mutex::new(ControlState::default()),
            latch: Mutex::new(CommitState::Idle),
        }
    }

    /// Bind to a record; every commit then goes through `mutator`.
    pub fn with_record(mut self, record: SharedRecord, mutator: Arc<dyn ModelMutator>) -> Self {
        self.binding = Some(Binding { record, mutator });
        self
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionContext>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn with_change_hook(mut self, hook: ChangeHook) -> Self {
        self.on_change = Some(hook);
        self
    }

    /// Initial value of an unbound control. Ignored once bound.
    pub fn with_value(self, value: Value) -> Self {
        self.state.lock().local_value = value;
        self
    }

    pub fn with_fetch_targets(mut self, targets: Vec<FetchTarget>) -> Self {
        self.fetch_targets = targets;
        self
    }

    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    pub fn key(&self) -> &str {
        &self.descriptor.key
    }

    pub fn record(&self) -> Option<&SharedRecord> {
        self.binding.as_ref().map(|binding| &binding.record)
    }

    pub fn fetch_targets(&self) -> &[FetchTarget] {
        &self.fetch_targets
    }

    pub fn set_hidden_due_to_dependency(&self, hidden: bool) {
        self.state.lock().hidden_due_to_dependency = hidden;
    }

    pub fn is_hidden_due_to_dependency(&self) -> bool {
        self.state.lock().hidden_due_to_dependency
    }

    /// Status computed by the last refresh.
    pub fn status(&self) -> DisplayStatus {
        self.state.lock().status
    }

    /// Current value: read from the record when bound, else the locally
    /// committed one.
    pub fn value(&self) -> Value {
        match &self.binding {
            Some(binding) => binding
                .record
                .read()
                .get(&self.descriptor.key)
                .cloned()
                .unwrap_or(Value::Null),
            None => self.state.lock().local_value.clone(),
        }
    }

    pub fn previous_value(&self) -> Option<Value> {
        self.state.lock().previous_value.clone()
    }

    /// How many times the input has been created. Never exceeds one.
    pub fn inputs_made(&self) -> usize {
        self.state.lock().inputs_made
    }

    pub fn is_invalid(&self) -> bool {
        self.state.lock().invalid
    }

    pub fn is_committing(&self) -> bool {
        *self.latch.lock() == CommitState::Committing
    }

    /// Recompute the display status and render accordingly.
    pub fn refresh(&self) -> ControlView {
        let record = self.binding.as_ref().map(|binding| binding.record.read());
        let record = record.as_deref();
        let mut state = self.state.lock();
        let status = compute_status(
            &self.descriptor,
            record,
            self.permissions.as_deref(),
            state.hidden_due_to_dependency,
        );
        let value = match record {
            Some(record) => record
                .get(&self.descriptor.key)
                .cloned()
                .unwrap_or(Value::Null),
            None => state.local_value.clone(),
        };
        state.status = status;
        state.mandatory_highlight = self.descriptor.mandatory && is_null(&value);

        let ctx = RenderContext {
            descriptor: &self.descriptor,
            behaviour: &self.behaviour,
            record,
            value: &value,
            mandatory_highlight: state.mandatory_highlight,
            invalid: state.invalid,
        };
        let ControlState {
            input, inputs_made, ..
        } = &mut *state;
        render::render(ctx, status, input, || {
            *inputs_made += 1;
            tracing::trace!(field = %self.descriptor.key, "input created");
            InputState::default()
        })
    }

    /// Replace the input text without committing it.
    pub fn set_input_text(&self, text: &str) {
        if let Some(input) = self.state.lock().input.as_mut() {
            input.text = text.to_string();
        }
    }

    /// `Write`: the parsed input, `Read`: the committed value, `None`: absent.
    pub fn get_value(&self) -> Result<Option<Value>, ParseError> {
        let (status, text) = {
            let state = self.state.lock();
            (state.status, state.input.as_ref().map(|input| input.text.clone()))
        };
        match status {
            DisplayStatus::None => Ok(None),
            DisplayStatus::Read => Ok(Some(self.value())),
            DisplayStatus::Write => match text {
                Some(text) => self
                    .behaviour
                    .parser
                    .parse(&self.descriptor, &Value::String(text))
                    .map(Some),
                None => Ok(Some(self.value())),
            },
        }
    }
}

impl fmt::Debug for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Control")
            .field("key", &self.descriptor.key)
            .field("kind", &self.descriptor.kind)
            .field("bound", &self.binding.is_some())
            .field("state", &*self.state.lock())
            .field("latch", &*self.latch.lock())
            .finish_non_exhaustive()
    }
}
