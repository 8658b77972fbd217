pub mod control;
mod error;
pub mod field;
mod layout;
mod status;

pub use control::{CommitOutcome, CommitState, Control, ControlView, FetchTarget, InputView};
pub use error::{ControlError, ParseError};
pub use field::components;
pub use field::{Behaviour, ControlRegistry, Validated, ValueFormatter, ValueParser, ValueValidator};
pub use layout::{FormContext, FormLayout};
pub use status::{DisplayStatus, compute_status};
