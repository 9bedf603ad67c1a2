//! Vendor-agnostic tool-call adapter.
//!
//! Encodes tool declarations into each vendor's request shape and decodes
//! vendor tool calls back into one canonical form. No transport, no I/O.

mod adapter;
mod error;
mod request;
mod response;
mod schema;
mod types;
mod vendor;

pub use adapter::{ToolCallAdapter, validate_tool_name_all_providers};
pub use error::{AdapterError, Result};
pub use schema::{ObjectSchema, SchemaNode};
pub use types::{
    ToolChoicePolicy, ToolInvocation, ToolOutcome, ToolSpec, VendorToolRequestFragment,
    VendorToolResponseFragment,
};
pub use vendor::{
    ArgumentsEncoding, CallFilter, ChoiceShape, ChoiceStyle, DeclarationShape, DeclarationWrapper,
    ResponseShape, ResultStyle, VendorId, VendorProfile,
};
