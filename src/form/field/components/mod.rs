mod base;
mod check;
mod color;
mod date;
mod embed;
mod expr;
pub(crate) mod helpers;
mod link;
mod numeric;
mod registry;
mod select;
mod text;

pub use base::{Behaviour, PassThrough, Validated, ValueFormatter, ValueParser, ValueValidator};
pub use check::{CheckFormatter, CheckParser};
pub use color::ColorValidator;
pub use date::DateControl;
pub use embed::{HtmlBlockFormatter, ImageFormatter};
pub use link::{LinkExistence, LinkFormatter};
pub use numeric::{NumberFormatter, NumberParser, NumericMode};
pub use registry::ControlRegistry;
pub use select::SelectValidator;
pub use text::{
    DataValidator, HtmlSanitizer, PasswordFormatter, PlainFormatter, RichTextFormatter,
    TextParser,
};
