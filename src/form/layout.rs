use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::domain::{DependsOn, FieldDescriptor, FieldKind, is_null};
use crate::form::control::{CommitOutcome, Control, ControlView, FetchTarget};
use crate::form::error::ControlError;
use crate::form::field::ControlRegistry;
use crate::ports::{ChangeHook, ModelMutator, PermissionContext};
use crate::record::{DocStatus, SharedRecord};

/// Collaborators shared by every control of a form.
#[derive(Clone, Default)]
pub struct FormContext {
    pub registry: ControlRegistry,
    pub permissions: Option<Arc<dyn PermissionContext>>,
    pub on_change: Option<ChangeHook>,
}

impl FormContext {
    pub fn new(registry: ControlRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionContext>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn with_change_hook(mut self, hook: ChangeHook) -> Self {
        self.on_change = Some(hook);
        self
    }
}

impl std::fmt::Debug for FormContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormContext")
            .field("registry", &self.registry)
            .field("permissions", &self.permissions.is_some())
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

/// All controls of one form, in descriptor order.
#[derive(Debug)]
pub struct FormLayout {
    controls: IndexMap<String, Control>,
    depends_on: IndexMap<String, DependsOn>,
    record: Option<SharedRecord>,
}

impl FormLayout {
    /// A form without a backing record, e.g. a dialog. Defaults become the
    /// initial local values.
    pub fn new(descriptors: Vec<FieldDescriptor>, ctx: &FormContext) -> Result<Self, ControlError> {
        Self::build(descriptors, ctx, |control| match control.descriptor().default.clone() {
            Some(default) => control.with_value(default),
            None => control,
        })
    }

    /// A form bound to `record`. Defaults of fields the record leaves empty
    /// are written through `mutator` while the record is still a draft.
    pub async fn for_record(
        descriptors: Vec<FieldDescriptor>,
        record: SharedRecord,
        mutator: Arc<dyn ModelMutator>,
        ctx: &FormContext,
    ) -> Result<Self, ControlError> {
        let defaults: Vec<(String, FieldKind, Value)> = {
            let current = record.read();
            if current.docstatus() == DocStatus::Draft {
                descriptors
                    .iter()
                    .filter_map(|field| {
                        let default = field.default.clone()?;
                        let empty = current.get(&field.key).is_none_or(is_null);
                        empty.then(|| (field.key.clone(), field.kind, default))
                    })
                    .collect()
            } else {
                Vec::new()
            }
        };
        let reference = record.read().reference().clone();
        for (key, kind, value) in defaults {
            tracing::debug!(record = %reference, field = %key, "applying default");
            mutator.set_field_value(&reference, &key, value, kind).await?;
        }

        let bound = Arc::clone(&record);
        let mut layout = Self::build(descriptors, ctx, move |control| {
            control.with_record(Arc::clone(&bound), Arc::clone(&mutator))
        })?;
        layout.record = Some(record);
        Ok(layout)
    }

    fn build(
        descriptors: Vec<FieldDescriptor>,
        ctx: &FormContext,
        bind: impl Fn(Control) -> Control,
    ) -> Result<Self, ControlError> {
        let mut depends_on = IndexMap::new();
        let mut fetch_targets: IndexMap<String, Vec<FetchTarget>> = IndexMap::new();
        for descriptor in &descriptors {
            if let Some(expression) = descriptor.depends_on.as_deref() {
                depends_on.insert(descriptor.key.clone(), DependsOn::parse(expression)?);
            }
            if let Some((link, remote)) = descriptor.fetch_source() {
                if !descriptors.iter().any(|field| field.key == link) {
                    return Err(ControlError::UnknownField(link.to_string()));
                }
                fetch_targets.entry(link.to_string()).or_default().push(FetchTarget {
                    remote_field: remote.to_string(),
                    local_key: descriptor.key.clone(),
                    kind: descriptor.kind,
                });
            }
        }

        let mut controls = IndexMap::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let key = descriptor.key.clone();
            let behaviour = ctx.registry.behaviour(descriptor.kind);
            let targets = fetch_targets.shift_remove(&key).unwrap_or_default();
            let control = Self::decorate(Control::new(descriptor, behaviour), ctx)
                .with_fetch_targets(targets);
            controls.insert(key, bind(control));
        }
        Ok(Self {
            controls,
            depends_on,
            record: None,
        })
    }

    fn decorate(mut control: Control, ctx: &FormContext) -> Control {
        if let Some(permissions) = &ctx.permissions {
            control = control.with_permissions(Arc::clone(permissions));
        }
        if let Some(hook) = &ctx.on_change {
            control = control.with_change_hook(Arc::clone(hook));
        }
        control
    }

    pub fn record(&self) -> Option<&SharedRecord> {
        self.record.as_ref()
    }

    pub fn control(&self, key: &str) -> Option<&Control> {
        self.controls.get(key)
    }

    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.controls.values()
    }

    /// Current values keyed by field.
    pub fn values(&self) -> IndexMap<String, Value> {
        match &self.record {
            Some(record) => record.read().values().clone(),
            None => self
                .controls
                .iter()
                .map(|(key, control)| (key.clone(), control.value()))
                .collect(),
        }
    }

    /// Evaluate every `depends_on` rule, then refresh all controls.
    pub fn refresh(&self) -> Vec<ControlView> {
        let values = self.values();
        for (key, rule) in &self.depends_on {
            if let Some(control) = self.controls.get(key) {
                control.set_hidden_due_to_dependency(!rule.evaluate(&values));
            }
        }
        self.controls.values().map(Control::refresh).collect()
    }

    /// Commit to one field and refresh the form so dependents follow.
    pub async fn set_value(&self, key: &str, raw: Value) -> Result<CommitOutcome, ControlError> {
        let control = self
            .controls
            .get(key)
            .ok_or_else(|| ControlError::UnknownField(key.to_string()))?;
        let outcome = control.set_value(raw).await?;
        self.refresh();
        Ok(outcome)
    }

    pub fn get_value(&self, key: &str) -> Result<Option<Value>, ControlError> {
        let control = self
            .controls
            .get(key)
            .ok_or_else(|| ControlError::UnknownField(key.to_string()))?;
        Ok(control.get_value()?)
    }

    /// Mandatory fields that are visible but still empty.
    pub fn missing_mandatory(&self) -> Vec<&FieldDescriptor> {
        self.controls
            .values()
            .filter(|control| {
                let descriptor = control.descriptor();
                descriptor.mandatory
                    && !descriptor.hidden
                    && !control.is_hidden_due_to_dependency()
                    && is_null(&control.value())
            })
            .map(Control::descriptor)
            .collect()
    }

    /// The record document when bound, else the field values as an object.
    pub fn to_document(&self) -> Value {
        match &self.record {
            Some(record) => record.read().to_document(),
            None => {
                let map: Map<String, Value> = self
                    .controls
                    .iter()
                    .filter(|(_, control)| {
                        !matches!(control.descriptor().kind, FieldKind::Html | FieldKind::Image)
                    })
                    .map(|(key, control)| (key.clone(), control.value()))
                    .collect();
                Value::Object(map)
            }
        }
    }
}
