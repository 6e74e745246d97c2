//! Wire format to [`DynamicMessage`].

use super::{
    RECURSION_LIMIT,
    value::{DynamicMessage, Value},
};
use crate::{
    descriptor::{FieldDescriptor, FieldType, MessageDescriptor, ScalarKind, WireKind},
    error::CodecError,
    registry::TypeRegistry,
};
use bytes::{Buf, Bytes};
use prost::encoding::decode_varint;

/// Decodes `buf` as a message of type `type_name`.
///
/// Every message and enum type reachable from the present fields must be declared in the
/// registry. The first one that is not fails the decode with [`CodecError::TypeNotFound`]
/// naming it, so the caller can load it and try again. Nesting deeper than
/// [`RECURSION_LIMIT`] is malformed.
pub fn decode(
    registry: &TypeRegistry,
    type_name: &str,
    buf: &[u8],
) -> Result<DynamicMessage, CodecError> {
    decode_nested(registry, type_name, buf, RECURSION_LIMIT)
}

fn decode_nested(
    registry: &TypeRegistry,
    type_name: &str,
    mut buf: &[u8],
    depth: u32,
) -> Result<DynamicMessage, CodecError> {
    let descriptor = registry.message(type_name)?;
    let owner = descriptor.full_name.as_str();
    let depth = depth
        .checked_sub(1)
        .ok_or_else(|| CodecError::malformed(owner, "recursion limit reached"))?;
    let mut message = DynamicMessage::new(owner);

    while buf.has_remaining() {
        let key = read_varint(&mut buf, owner)?;
        let wire = WireKind::from_bits(key & 0x7).ok_or_else(|| {
            CodecError::malformed(owner, format!("invalid wire type {}", key & 0x7))
        })?;
        let number = u32::try_from(key >> 3)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| CodecError::malformed(owner, "invalid field number"))?;

        match descriptor.field(number) {
            Some(field) => {
                decode_field(registry, &descriptor, field, wire, &mut buf, &mut message, depth)?
            }
            None => skip(wire, &mut buf, owner)?,
        }
    }
    Ok(message)
}

fn decode_field(
    registry: &TypeRegistry,
    descriptor: &MessageDescriptor,
    field: &FieldDescriptor,
    wire: WireKind,
    buf: &mut &[u8],
    message: &mut DynamicMessage,
    depth: u32,
) -> Result<(), CodecError> {
    let owner = descriptor.full_name.as_str();

    if let FieldType::Message(name) = &field.ty {
        expect_wire(owner, field, wire, WireKind::LengthDelimited)?;
        let nested = decode_nested(registry, name, read_length_delimited(buf, owner)?, depth)?;
        let entry = registry.message(name)?;
        if !(field.repeated && entry.map_entry) {
            insert(message, descriptor, field, Value::Message(nested));
            return Ok(());
        }

        // Entries omit default keys and values.
        let entry_value = |number: u32| {
            nested
                .get(number)
                .cloned()
                .or_else(|| entry.field(number).map(|f| Value::zero_of(&f.ty)))
        };
        let (Some(key), Some(value)) = (entry_value(1), entry_value(2)) else {
            return Err(CodecError::malformed(&entry.full_name, "map entry lacks a key or value field"));
        };
        insert_map_entry(message, field, key, value);
        return Ok(());
    }

    if let FieldType::Enum(name) = &field.ty {
        registry.enumeration(name)?;
    }

    let element_wire = field.ty.wire_kind();
    if field.repeated && wire == WireKind::LengthDelimited && element_wire != WireKind::LengthDelimited
    {
        let mut packed = read_length_delimited(buf, owner)?;
        while packed.has_remaining() {
            let value = read_element(&field.ty, &mut packed, owner)?;
            insert(message, descriptor, field, value);
        }
        return Ok(());
    }

    expect_wire(owner, field, wire, element_wire)?;
    let value = read_element(&field.ty, buf, owner)?;
    insert(message, descriptor, field, value);
    Ok(())
}

fn insert(
    message: &mut DynamicMessage,
    descriptor: &MessageDescriptor,
    field: &FieldDescriptor,
    value: Value,
) {
    if field.repeated {
        match message.fields.entry(field.number).or_insert_with(|| Value::List(Vec::new())) {
            Value::List(items) => items.push(value),
            slot => *slot = Value::List(vec![value]),
        }
        return;
    }

    // Setting a oneof member clears the others.
    if let Some(index) = field.oneof_index {
        for sibling in descriptor.fields.iter().filter(|f| f.oneof_index == Some(index)) {
            message.fields.remove(&sibling.number);
        }
    }
    message.fields.insert(field.number, value);
}

fn insert_map_entry(message: &mut DynamicMessage, field: &FieldDescriptor, key: Value, value: Value) {
    match message.fields.entry(field.number).or_insert_with(|| Value::Map(Vec::new())) {
        Value::Map(entries) => match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => entries.push((key, value)),
        },
        slot => *slot = Value::Map(vec![(key, value)]),
    }
}

fn expect_wire(
    owner: &str,
    field: &FieldDescriptor,
    found: WireKind,
    expected: WireKind,
) -> Result<(), CodecError> {
    if found == expected {
        return Ok(());
    }
    Err(CodecError::malformed(
        owner,
        format!("field {} has wire type {found:?}, expected {expected:?}", field.name),
    ))
}

fn read_element(ty: &FieldType, buf: &mut &[u8], owner: &str) -> Result<Value, CodecError> {
    match ty {
        FieldType::Scalar(kind) => read_scalar(*kind, buf, owner),
        FieldType::Enum(_) => Ok(Value::Enum(read_varint(buf, owner)? as i32)),
        FieldType::Message(name) => {
            Err(CodecError::malformed(owner, format!("{name} cannot be read as a scalar")))
        }
    }
}

fn read_scalar(kind: ScalarKind, buf: &mut &[u8], owner: &str) -> Result<Value, CodecError> {
    Ok(match kind {
        ScalarKind::Int32 => Value::I32(read_varint(buf, owner)? as i32),
        ScalarKind::Int64 => Value::I64(read_varint(buf, owner)? as i64),
        ScalarKind::Uint32 => Value::U32(read_varint(buf, owner)? as u32),
        ScalarKind::Uint64 => Value::U64(read_varint(buf, owner)?),
        ScalarKind::Sint32 => {
            let raw = read_varint(buf, owner)? as u32;
            Value::I32((raw >> 1) as i32 ^ -((raw & 1) as i32))
        }
        ScalarKind::Sint64 => {
            let raw = read_varint(buf, owner)?;
            Value::I64((raw >> 1) as i64 ^ -((raw & 1) as i64))
        }
        ScalarKind::Bool => Value::Bool(read_varint(buf, owner)? != 0),
        ScalarKind::Fixed32 => Value::U32(fixed(buf, 4, owner)?.get_u32_le()),
        ScalarKind::Sfixed32 => Value::I32(fixed(buf, 4, owner)?.get_i32_le()),
        ScalarKind::Float => Value::F32(fixed(buf, 4, owner)?.get_f32_le()),
        ScalarKind::Fixed64 => Value::U64(fixed(buf, 8, owner)?.get_u64_le()),
        ScalarKind::Sfixed64 => Value::I64(fixed(buf, 8, owner)?.get_i64_le()),
        ScalarKind::Double => Value::F64(fixed(buf, 8, owner)?.get_f64_le()),
        ScalarKind::String => {
            let raw = read_length_delimited(buf, owner)?;
            let text = std::str::from_utf8(raw)
                .map_err(|err| CodecError::malformed(owner, format!("invalid UTF-8: {err}")))?;
            Value::String(text.to_string())
        }
        ScalarKind::Bytes => Value::Bytes(Bytes::copy_from_slice(read_length_delimited(buf, owner)?)),
    })
}

/// Checks that `len` bytes remain and hands the buffer back for reading them.
fn fixed<'a, 'b>(
    buf: &'a mut &'b [u8],
    len: usize,
    owner: &str,
) -> Result<&'a mut &'b [u8], CodecError> {
    if buf.remaining() < len {
        return Err(CodecError::malformed(owner, "truncated fixed-width value"));
    }
    Ok(buf)
}

fn read_varint(buf: &mut &[u8], owner: &str) -> Result<u64, CodecError> {
    decode_varint(buf).map_err(|err| CodecError::malformed(owner, err.to_string()))
}

fn read_length_delimited<'a>(buf: &mut &'a [u8], owner: &str) -> Result<&'a [u8], CodecError> {
    let len = usize::try_from(read_varint(buf, owner)?)
        .map_err(|_| CodecError::malformed(owner, "length overflows usize"))?;
    if buf.len() < len {
        return Err(CodecError::malformed(owner, "length exceeds remaining buffer"));
    }
    let (payload, rest) = buf.split_at(len);
    *buf = rest;
    Ok(payload)
}

fn skip(wire: WireKind, buf: &mut &[u8], owner: &str) -> Result<(), CodecError> {
    match wire {
        WireKind::Varint => {
            read_varint(buf, owner)?;
        }
        WireKind::Fixed64 => fixed(buf, 8, owner)?.advance(8),
        WireKind::Fixed32 => fixed(buf, 4, owner)?.advance(4),
        WireKind::LengthDelimited => {
            read_length_delimited(buf, owner)?;
        }
        WireKind::StartGroup | WireKind::EndGroup => {
            return Err(CodecError::malformed(owner, "groups are not supported"));
        }
    }
    Ok(())
}
