//! Dynamic encoding and decoding against registry descriptors.

mod decode;
pub use decode::decode;

mod encode;
pub use encode::encode;

mod project;
pub use project::project;

mod value;
pub use value::{DynamicMessage, Value};

use crate::{error::CodecError, registry::TypeRegistry};

/// Deepest message nesting decoded or projected, matching prost.
pub const RECURSION_LIMIT: u32 = 100;

/// Decodes `buf` as `type_name` and projects the result to JSON.
pub fn decode_to_json(
    registry: &TypeRegistry,
    type_name: &str,
    buf: &[u8],
) -> Result<serde_json::Value, CodecError> {
    let message = decode(registry, type_name, buf)?;
    project(registry, &message)
}
