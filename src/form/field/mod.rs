//! Per-kind strategies: how raw input is parsed, how values are shown and
//! how candidates are validated before a commit.

pub mod components;

pub use components::{Behaviour, ControlRegistry, Validated, ValueFormatter, ValueParser, ValueValidator};
