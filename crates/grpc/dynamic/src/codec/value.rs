//! Decoded message values.

use crate::descriptor::{FieldType, ScalarKind};
use bytes::Bytes;
use std::collections::BTreeMap;

/// A single decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `bool`
    Bool(bool),
    /// `int32`, `sint32` and `sfixed32`
    I32(i32),
    /// `int64`, `sint64` and `sfixed64`
    I64(i64),
    /// `uint32` and `fixed32`
    U32(u32),
    /// `uint64` and `fixed64`
    U64(u64),
    /// `float`
    F32(f32),
    /// `double`
    F64(f64),
    /// `string`
    String(String),
    /// `bytes`
    Bytes(Bytes),
    /// Enum number, named through the registry when projected.
    Enum(i32),
    /// Nested message.
    Message(DynamicMessage),
    /// Repeated field values in wire order.
    List(Vec<Self>),
    /// Map entries in wire order.
    Map(Vec<(Self, Self)>),
}

impl Value {
    /// The zero value of a singular field of type `ty`.
    pub fn zero_of(ty: &FieldType) -> Self {
        match ty {
            FieldType::Message(name) => Self::Message(DynamicMessage::new(name.clone())),
            FieldType::Enum(_) => Self::Enum(0),
            FieldType::Scalar(kind) => match kind {
                ScalarKind::Bool => Self::Bool(false),
                ScalarKind::Int32 | ScalarKind::Sint32 | ScalarKind::Sfixed32 => Self::I32(0),
                ScalarKind::Int64 | ScalarKind::Sint64 | ScalarKind::Sfixed64 => Self::I64(0),
                ScalarKind::Uint32 | ScalarKind::Fixed32 => Self::U32(0),
                ScalarKind::Uint64 | ScalarKind::Fixed64 => Self::U64(0),
                ScalarKind::Float => Self::F32(0.0),
                ScalarKind::Double => Self::F64(0.0),
                ScalarKind::String => Self::String(String::new()),
                ScalarKind::Bytes => Self::Bytes(Bytes::new()),
            },
        }
    }
}

/// A message decoded against a registry descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicMessage {
    /// Fully qualified name of the message type.
    pub type_name: String,
    /// Present fields keyed by number.
    pub fields: BTreeMap<u32, Value>,
}

impl DynamicMessage {
    /// An empty message of the given type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), fields: BTreeMap::new() }
    }

    /// Value of a present field.
    pub fn get(&self, number: u32) -> Option<&Value> {
        self.fields.get(&number)
    }
}
