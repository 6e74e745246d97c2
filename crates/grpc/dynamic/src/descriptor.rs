//! Structural descriptions of messages, enums and services as advertised by a remote node.
//!
//! These are the registry's own shapes. They are built from the `FileDescriptorProto` records
//! returned by the reflection service and carry only what the dynamic codec needs.

use prost_types::field_descriptor_proto::{Label, Type};
use std::{fmt, sync::Arc};

/// The protobuf wire encoding of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireKind {
    /// Base-128 varint.
    Varint,
    /// Little-endian 8 byte value.
    Fixed64,
    /// Varint length followed by that many bytes.
    LengthDelimited,
    /// Deprecated group start marker.
    StartGroup,
    /// Deprecated group end marker.
    EndGroup,
    /// Little-endian 4 byte value.
    Fixed32,
}

impl WireKind {
    /// Maps the low three bits of a field key to a [`WireKind`].
    pub const fn from_bits(bits: u64) -> Option<Self> {
        match bits {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::LengthDelimited),
            3 => Some(Self::StartGroup),
            4 => Some(Self::EndGroup),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }

    /// The three-bit discriminant written into a field key.
    pub const fn bits(self) -> u64 {
        match self {
            Self::Varint => 0,
            Self::Fixed64 => 1,
            Self::LengthDelimited => 2,
            Self::StartGroup => 3,
            Self::EndGroup => 4,
            Self::Fixed32 => 5,
        }
    }
}

/// Fixed table of protobuf scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// `double`
    Double,
    /// `float`
    Float,
    /// `int32`
    Int32,
    /// `int64`
    Int64,
    /// `uint32`
    Uint32,
    /// `uint64`
    Uint64,
    /// `sint32`, zigzag encoded
    Sint32,
    /// `sint64`, zigzag encoded
    Sint64,
    /// `fixed32`
    Fixed32,
    /// `fixed64`
    Fixed64,
    /// `sfixed32`
    Sfixed32,
    /// `sfixed64`
    Sfixed64,
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `bytes`
    Bytes,
}

impl ScalarKind {
    /// Looks up the scalar kind for a descriptor field type, or `None` for named types.
    pub const fn from_proto(ty: Type) -> Option<Self> {
        Some(match ty {
            Type::Double => Self::Double,
            Type::Float => Self::Float,
            Type::Int32 => Self::Int32,
            Type::Int64 => Self::Int64,
            Type::Uint32 => Self::Uint32,
            Type::Uint64 => Self::Uint64,
            Type::Sint32 => Self::Sint32,
            Type::Sint64 => Self::Sint64,
            Type::Fixed32 => Self::Fixed32,
            Type::Fixed64 => Self::Fixed64,
            Type::Sfixed32 => Self::Sfixed32,
            Type::Sfixed64 => Self::Sfixed64,
            Type::Bool => Self::Bool,
            Type::String => Self::String,
            Type::Bytes => Self::Bytes,
            Type::Group | Type::Message | Type::Enum => return None,
        })
    }

    /// The wire kind a single (unpacked) value of this scalar uses.
    pub const fn wire_kind(self) -> WireKind {
        match self {
            Self::Int32 |
            Self::Int64 |
            Self::Uint32 |
            Self::Uint64 |
            Self::Sint32 |
            Self::Sint64 |
            Self::Bool => WireKind::Varint,
            Self::Fixed64 | Self::Sfixed64 | Self::Double => WireKind::Fixed64,
            Self::Fixed32 | Self::Sfixed32 | Self::Float => WireKind::Fixed32,
            Self::String | Self::Bytes => WireKind::LengthDelimited,
        }
    }

    /// 64-bit integers, which render as decimal strings.
    pub const fn is_64_bit_integer(self) -> bool {
        matches!(self, Self::Int64 | Self::Uint64 | Self::Sint64 | Self::Fixed64 | Self::Sfixed64)
    }

    /// Whether repeated values of this kind may be packed.
    pub const fn is_packable(self) -> bool {
        !matches!(self, Self::String | Self::Bytes)
    }
}

/// The type of a field: a scalar, or a reference to another named type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// A scalar from the fixed table.
    Scalar(ScalarKind),
    /// A message type referenced by fully qualified name. It may not be loaded yet.
    Message(String),
    /// An enum type referenced by fully qualified name. It may not be loaded yet.
    Enum(String),
}

impl FieldType {
    /// Wire kind of a single value of this type.
    pub const fn wire_kind(&self) -> WireKind {
        match self {
            Self::Scalar(kind) => kind.wire_kind(),
            Self::Message(_) => WireKind::LengthDelimited,
            Self::Enum(_) => WireKind::Varint,
        }
    }
}

/// A single message field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name as declared in the `.proto` file.
    pub name: String,
    /// Camel-cased JSON name, accepted as an alias for request parameters.
    pub json_name: String,
    /// Field number.
    pub number: u32,
    /// Wire kind of a single value.
    pub wire_kind: WireKind,
    /// Whether the field is `repeated`.
    pub repeated: bool,
    /// Whether repeated values are written packed.
    pub packed: bool,
    /// Index of the enclosing `oneof`, if any.
    pub oneof_index: Option<i32>,
    /// The field type.
    pub ty: FieldType,
}

/// A message shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDescriptor {
    /// Fully qualified name without a leading dot.
    pub full_name: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
    /// Set for the synthetic `XxxEntry` messages backing `map<K, V>` fields.
    pub map_entry: bool,
}

impl MessageDescriptor {
    /// Finds a field by number.
    pub fn field(&self, number: u32) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.number == number)
    }

    /// Finds a field by declared name or JSON name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name || f.json_name == name)
    }
}

/// A single enum value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    /// Symbolic name.
    pub name: String,
    /// Numeric value.
    pub number: i32,
}

/// An enum shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    /// Fully qualified name without a leading dot.
    pub full_name: String,
    /// Values in declaration order.
    pub values: Vec<EnumValue>,
}

impl EnumDescriptor {
    /// Symbolic name for a number. Aliases resolve to the first declared name.
    pub fn name_of(&self, number: i32) -> Option<&str> {
        self.values.iter().find(|v| v.number == number).map(|v| v.name.as_str())
    }

    /// Number for a symbolic name.
    pub fn number_of(&self, name: &str) -> Option<i32> {
        self.values.iter().find(|v| v.name == name).map(|v| v.number)
    }

    /// Name of the zero value, which proto3 requires to be declared first.
    pub fn default_name(&self) -> Option<&str> {
        self.name_of(0).or_else(|| self.values.first().map(|v| v.name.as_str()))
    }
}

/// A method on a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Fully qualified service name.
    pub service_name: String,
    /// Method name.
    pub method_name: String,
    /// Fully qualified request message name.
    pub request_type: String,
    /// Fully qualified response message name.
    pub response_type: String,
    /// Client streams requests.
    pub client_streaming: bool,
    /// Server streams responses.
    pub server_streaming: bool,
}

impl MethodDescriptor {
    /// The HTTP/2 path of a unary call, `/{service}/{method}`.
    pub fn path(&self) -> String {
        format!("/{}/{}", self.service_name, self.method_name)
    }

    /// Whether the method is a plain request/response call.
    pub const fn is_unary(&self) -> bool {
        !self.client_streaming && !self.server_streaming
    }
}

/// A service shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Fully qualified service name.
    pub full_name: String,
    /// Methods in declaration order.
    pub methods: Vec<Arc<MethodDescriptor>>,
}

impl ServiceDescriptor {
    /// Finds a method by name.
    pub fn method(&self, name: &str) -> Option<&Arc<MethodDescriptor>> {
        self.methods.iter().find(|m| m.method_name == name)
    }
}

/// Any of the shapes the registry holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// A message.
    Message(Arc<MessageDescriptor>),
    /// An enum.
    Enum(Arc<EnumDescriptor>),
    /// A service.
    Service(Arc<ServiceDescriptor>),
}

impl TypeDescriptor {
    /// Fully qualified name of the described type.
    pub fn full_name(&self) -> &str {
        match self {
            Self::Message(m) => &m.full_name,
            Self::Enum(e) => &e.full_name,
            Self::Service(s) => &s.full_name,
        }
    }

    /// The descriptor kind.
    pub const fn kind(&self) -> DescriptorKind {
        match self {
            Self::Message(_) => DescriptorKind::Message,
            Self::Enum(_) => DescriptorKind::Enum,
            Self::Service(_) => DescriptorKind::Service,
        }
    }
}

/// Discriminant of a [`TypeDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    /// A message.
    Message,
    /// An enum.
    Enum,
    /// A service.
    Service,
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message => f.write_str("message"),
            Self::Enum => f.write_str("enum"),
            Self::Service => f.write_str("service"),
        }
    }
}

/// Strips the leading dot descriptor records put on fully qualified references.
pub fn normalize_name(name: &str) -> &str {
    name.strip_prefix('.').unwrap_or(name)
}

/// Builds a [`FieldDescriptor`] from a descriptor record.
///
/// `proto3` decides the default for `packed`. Returns `None` for groups, which are not supported.
pub(crate) fn field_from_proto(
    field: &prost_types::FieldDescriptorProto,
    proto3: bool,
) -> Option<FieldDescriptor> {
    let ty = match field.r#type() {
        Type::Message => FieldType::Message(normalize_name(field.type_name()).to_string()),
        Type::Enum => FieldType::Enum(normalize_name(field.type_name()).to_string()),
        Type::Group => return None,
        scalar => FieldType::Scalar(ScalarKind::from_proto(scalar)?),
    };
    let repeated = field.label() == Label::Repeated;
    let packable = match &ty {
        FieldType::Scalar(kind) => kind.is_packable(),
        FieldType::Enum(_) => true,
        FieldType::Message(_) => false,
    };
    let packed = repeated &&
        packable &&
        field.options.as_ref().and_then(|o| o.packed).unwrap_or(proto3);
    let json_name = field.json_name.clone().unwrap_or_else(|| to_json_name(field.name()));

    Some(FieldDescriptor {
        name: field.name().to_string(),
        json_name,
        number: u32::try_from(field.number()).ok()?,
        wire_kind: ty.wire_kind(),
        repeated,
        packed,
        oneof_index: if field.proto3_optional() { None } else { field.oneof_index },
        ty,
    })
}

/// protoc's default JSON name: drop underscores and upper-case the following letter.
fn to_json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
