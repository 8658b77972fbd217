use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::FieldKind;
use crate::ports::LinkValidator;
use crate::settings::ControlOptions;

use super::base::{Behaviour, PassThrough};
use super::check::{CheckFormatter, CheckParser};
use super::color::ColorValidator;
use super::date::DateControl;
use super::embed::{HtmlBlockFormatter, ImageFormatter};
use super::link::{LinkExistence, LinkFormatter};
use super::numeric::{NumberFormatter, NumberParser, NumericMode};
use super::select::SelectValidator;
use super::text::{
    DataValidator, HtmlSanitizer, PasswordFormatter, PlainFormatter, RichTextFormatter,
    TextParser,
};

/// Maps every field kind to the strategies its controls are built from.
///
/// Built-in behaviour covers each [`FieldKind`]; hosts may replace any of
/// them with [`ControlRegistry::register`].
#[derive(Clone)]
pub struct ControlRegistry {
    options: ControlOptions,
    links: Option<Arc<dyn LinkValidator>>,
    overrides: HashMap<FieldKind, Behaviour>,
}

impl Default for ControlRegistry {
    fn default() -> Self {
        Self::new(ControlOptions::default())
    }
}

impl std::fmt::Debug for ControlRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlRegistry")
            .field("options", &self.options)
            .field("links", &self.links.is_some())
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ControlRegistry {
    pub fn new(options: ControlOptions) -> Self {
        Self {
            options,
            links: None,
            overrides: HashMap::new(),
        }
    }

    /// Without a validator, link values are accepted as typed.
    pub fn with_link_validator(mut self, links: Arc<dyn LinkValidator>) -> Self {
        self.links = Some(links);
        self
    }

    pub fn register(mut self, kind: FieldKind, behaviour: Behaviour) -> Self {
        self.overrides.insert(kind, behaviour);
        self
    }

    pub fn options(&self) -> &ControlOptions {
        &self.options
    }

    pub fn behaviour(&self, kind: FieldKind) -> Behaviour {
        if let Some(custom) = self.overrides.get(&kind) {
            return custom.clone();
        }
        let format = self.options.format();
        let pass = Arc::new(PassThrough);
        let plain = Arc::new(PlainFormatter { multiline: false });
        match kind {
            FieldKind::Data => Behaviour::new(Arc::new(TextParser), plain, Arc::new(DataValidator)),
            FieldKind::SmallText | FieldKind::Text => Behaviour::new(
                Arc::new(TextParser),
                Arc::new(PlainFormatter { multiline: true }),
                pass,
            ),
            FieldKind::Password => {
                Behaviour::new(Arc::new(TextParser), Arc::new(PasswordFormatter), pass)
            }
            FieldKind::TextEditor => {
                Behaviour::new(Arc::new(HtmlSanitizer), Arc::new(RichTextFormatter), pass)
            }
            FieldKind::Int | FieldKind::Float | FieldKind::Currency | FieldKind::Percent => {
                let mode = match kind {
                    FieldKind::Int => NumericMode::Int,
                    FieldKind::Currency => NumericMode::Currency,
                    FieldKind::Percent => NumericMode::Percent,
                    _ => NumericMode::Float,
                };
                Behaviour::new(
                    Arc::new(NumberParser::new(mode, Arc::clone(&format))),
                    Arc::new(NumberFormatter::new(mode, format)),
                    pass,
                )
            }
            FieldKind::Check => {
                Behaviour::new(Arc::new(CheckParser), Arc::new(CheckFormatter::new(format)), pass)
            }
            FieldKind::Select => {
                Behaviour::new(Arc::new(TextParser), plain, Arc::new(SelectValidator))
            }
            FieldKind::Link => {
                let behaviour = Behaviour::new(Arc::new(TextParser), Arc::new(LinkFormatter), pass);
                match &self.links {
                    Some(links) => {
                        behaviour.with_validator(Arc::new(LinkExistence::new(Arc::clone(links))))
                    }
                    None => behaviour,
                }
            }
            FieldKind::Date => {
                let date = Arc::new(DateControl::new(format));
                Behaviour::new(date.clone(), date, pass)
            }
            FieldKind::Color => {
                Behaviour::new(Arc::new(TextParser), plain, Arc::new(ColorValidator))
            }
            FieldKind::Html => Behaviour::new(pass.clone(), Arc::new(HtmlBlockFormatter), pass),
            FieldKind::Image => Behaviour::new(pass.clone(), Arc::new(ImageFormatter), pass),
            FieldKind::ReadOnly => Behaviour::new(pass.clone(), plain, pass),
        }
    }
}
