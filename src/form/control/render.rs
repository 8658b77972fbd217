use serde::Serialize;
use serde_json::Value;

use crate::domain::FieldDescriptor;
use crate::form::field::Behaviour;
use crate::form::status::DisplayStatus;
use crate::record::Record;

/// The interactive input as last pushed by a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputView {
    pub value: String,
    pub enabled: bool,
}

/// Everything a host needs to draw one control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlView {
    pub key: String,
    pub status: DisplayStatus,
    /// Container hidden; set exactly when `status` is `None`.
    pub hidden: bool,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<InputView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    pub mandatory_highlight: bool,
    pub bold: bool,
    pub invalid: bool,
}

/// Mutable input state; made lazily on the first `Write` render.
#[derive(Debug, Clone, Default)]
pub(super) struct InputState {
    pub text: String,
    pub enabled: bool,
}

pub(super) struct RenderContext<'a> {
    pub descriptor: &'a FieldDescriptor,
    pub behaviour: &'a Behaviour,
    pub record: Option<&'a Record>,
    pub value: &'a Value,
    pub mandatory_highlight: bool,
    pub invalid: bool,
}

/// Dispatch on `status`: show the input, the read-only region or nothing.
/// `make_input` runs only when no input exists yet.
pub(super) fn render(
    ctx: RenderContext<'_>,
    status: DisplayStatus,
    input: &mut Option<InputState>,
    make_input: impl FnOnce() -> InputState,
) -> ControlView {
    let descriptor = ctx.descriptor;
    let mut view = ControlView {
        key: descriptor.key.clone(),
        status,
        hidden: status == DisplayStatus::None,
        label: descriptor.display_label(),
        description: descriptor.description.clone(),
        input: None,
        display: None,
        mandatory_highlight: ctx.mandatory_highlight,
        bold: descriptor.mandatory || descriptor.bold,
        invalid: ctx.invalid,
    };

    match status {
        DisplayStatus::None => {}
        DisplayStatus::Write => {
            let input = input.get_or_insert_with(make_input);
            input.text = ctx.behaviour.formatter.format_for_input(descriptor, ctx.value);
            input.enabled = true;
            view.input = Some(InputView {
                value: input.text.clone(),
                enabled: true,
            });
        }
        DisplayStatus::Read => {
            if let Some(input) = input.as_mut() {
                input.enabled = false;
            }
            view.display = Some(ctx.behaviour.formatter.format_for_display(
                descriptor,
                ctx.value,
                ctx.record,
            ));
        }
    }
    view
}
