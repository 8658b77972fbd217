use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::is_null;
use crate::form::error::ControlError;
use crate::ports::ChangeEvent;

use super::Control;

/// The commit latch. A control is `Committing` from the moment a commit is
/// accepted until its pipeline finishes or its future is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitState {
    #[default]
    Idle,
    Committing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Committed {
        value: Value,
        previous: Value,
    },
    /// Another commit was already in flight; nothing happened.
    Skipped,
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed { .. })
    }
}

/// Holds the latch for one commit and resets it on drop.
struct CommitGuard<'a> {
    latch: &'a Mutex<CommitState>,
}

impl<'a> CommitGuard<'a> {
    fn acquire(latch: &'a Mutex<CommitState>) -> Option<Self> {
        let mut state = latch.lock();
        if *state == CommitState::Committing {
            return None;
        }
        *state = CommitState::Committing;
        Some(Self { latch })
    }
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        *self.latch.lock() = CommitState::Idle;
    }
}

impl Control {
    /// Run the commit pipeline: parse, validate, write, then notify.
    ///
    /// Resolves to [`CommitOutcome::Skipped`] without doing anything while
    /// another commit on this control is in flight. On error the committed
    /// value is left untouched and the latch is released.
    #[tracing::instrument(level = "debug", skip(self, raw), fields(field = %self.descriptor.key))]
    pub async fn set_value(&self, raw: Value) -> Result<CommitOutcome, ControlError> {
        let Some(_guard) = CommitGuard::acquire(&self.latch) else {
            debug!("commit already in flight, skipping");
            return Ok(CommitOutcome::Skipped);
        };

        let parsed = self.behaviour.parser.parse(&self.descriptor, &raw)?;

        let mut fetch_fields: Vec<String> = Vec::new();
        for target in &self.fetch_targets {
            if !fetch_fields.contains(&target.remote_field) {
                fetch_fields.push(target.remote_field.clone());
            }
        }
        let validated = self
            .behaviour
            .validator
            .validate(&self.descriptor, parsed, &fetch_fields)
            .await
            .inspect_err(|err| warn!(error = %err, "validation failed"))?;
        if validated.invalid {
            debug!(value = %validated.value, "value kept but flagged invalid");
        }

        let previous = self.value();
        let value = validated.value;
        match &self.binding {
            Some(binding) => {
                let reference = binding.record.read().reference().clone();
                binding
                    .mutator
                    .set_field_value(&reference, &self.descriptor.key, value.clone(), self.descriptor.kind)
                    .await
                    .inspect_err(|err| warn!(error = %err, "model rejected value"))?;
                for target in &self.fetch_targets {
                    let Some(fetched) = validated.fetched.get(&target.remote_field) else {
                        continue;
                    };
                    binding
                        .mutator
                        .set_field_value(&reference, &target.local_key, fetched.clone(), target.kind)
                        .await
                        .inspect_err(|err| warn!(error = %err, target = %target.local_key, "fetched value rejected"))?;
                }
            }
            None => {
                let mut state = self.state.lock();
                state.local_value = value.clone();
                let text = self.behaviour.formatter.format_for_input(&self.descriptor, &value);
                if let Some(input) = state.input.as_mut() {
                    input.text = text;
                }
            }
        }

        {
            let mut state = self.state.lock();
            state.previous_value = Some(previous.clone());
            state.invalid = validated.invalid;
            state.mandatory_highlight = self.descriptor.mandatory && is_null(&value);
        }
        debug!(value = %value, previous = %previous, "value committed");

        if let Some(hook) = &self.on_change {
            hook(&ChangeEvent {
                key: self.descriptor.key.clone(),
                value: value.clone(),
                previous: Some(previous.clone()),
            });
        }
        Ok(CommitOutcome::Committed { value, previous })
    }

    /// Commit whatever the user typed into the input.
    pub async fn input_changed(&self, text: &str) -> Result<CommitOutcome, ControlError> {
        self.set_input_text(text);
        self.set_value(Value::String(text.to_string())).await
    }
}
