mod depends;
mod descriptor;
mod parser;
mod value;

pub use depends::{DependsOn, DependsOnError};
pub use descriptor::{FieldDescriptor, FieldKind, prettify_label};
pub use parser::{
    DescriptorDocument, descriptor_document_schema, parse_descriptor_document, parse_descriptors,
};
pub use value::{is_null, is_truthy, loosely_equal, value_to_string};
