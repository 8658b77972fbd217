//! Reading descriptor, record, link and settings documents, and writing
//! record snapshots back out.

mod format;
mod input;
mod output;

pub use format::DocumentFormat;
pub use input::{
    load_descriptors, load_links, load_record, load_settings, parse_document_any,
    parse_document_str,
};
pub use output::{OutputDestination, OutputOptions, emit_document, serialize_document};
