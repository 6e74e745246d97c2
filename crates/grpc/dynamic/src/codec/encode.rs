//! JSON request parameters to wire format.

use crate::{
    descriptor::{FieldDescriptor, FieldType, MessageDescriptor, ScalarKind, WireKind},
    error::CodecError,
    registry::TypeRegistry,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::BufMut;
use prost::encoding::encode_varint;
use serde_json::Value as JsonValue;
use std::str::FromStr;

/// Encodes a JSON object as a message of type `type_name`.
///
/// Keys are field names or their JSON names; `null` values and absent keys leave the field
/// unset. Like decoding, a referenced type missing from the registry fails with
/// [`CodecError::TypeNotFound`].
pub fn encode(
    registry: &TypeRegistry,
    type_name: &str,
    params: &JsonValue,
) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    encode_into(registry, type_name, params, &mut buf)?;
    Ok(buf)
}

fn encode_into(
    registry: &TypeRegistry,
    type_name: &str,
    params: &JsonValue,
    buf: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let descriptor = registry.message(type_name)?;
    let owner = descriptor.full_name.as_str();
    let object = match params {
        JsonValue::Null => return Ok(()),
        JsonValue::Object(object) => object,
        other => {
            return Err(CodecError::malformed(owner, format!("expected a JSON object, found {other}")));
        }
    };

    if let Some(unknown) = object.keys().find(|key| descriptor.field_by_name(key).is_none()) {
        return Err(CodecError::UnknownField { type_name: owner.to_string(), field: unknown.clone() });
    }

    // Declaration order keeps the output deterministic.
    for field in &descriptor.fields {
        match object.get(&field.name).or_else(|| object.get(&field.json_name)) {
            None | Some(JsonValue::Null) => {}
            Some(value) => encode_field(registry, &descriptor, field, value, buf)?,
        }
    }
    Ok(())
}

fn encode_field(
    registry: &TypeRegistry,
    descriptor: &MessageDescriptor,
    field: &FieldDescriptor,
    value: &JsonValue,
    buf: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let owner = descriptor.full_name.as_str();
    if !field.repeated {
        return write_tagged(registry, owner, field, value, buf);
    }

    if let FieldType::Message(name) = &field.ty {
        let entry = registry.message(name)?;
        if entry.map_entry {
            return encode_map(registry, owner, field, &entry, value, buf);
        }
    }

    let items =
        value.as_array().ok_or_else(|| CodecError::invalid(owner, &field.name, "expected an array"))?;
    if field.packed {
        let mut packed = Vec::new();
        for item in items {
            write_element(registry, owner, field, item, &mut packed)?;
        }
        write_key(buf, field.number, WireKind::LengthDelimited);
        write_bytes(buf, &packed);
    } else {
        for item in items {
            write_tagged(registry, owner, field, item, buf)?;
        }
    }
    Ok(())
}

fn encode_map(
    registry: &TypeRegistry,
    owner: &str,
    field: &FieldDescriptor,
    entry: &MessageDescriptor,
    value: &JsonValue,
    buf: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let object = value
        .as_object()
        .ok_or_else(|| CodecError::invalid(owner, &field.name, "expected a JSON object"))?;
    let (Some(key_field), Some(value_field)) = (entry.field(1), entry.field(2)) else {
        return Err(CodecError::malformed(&entry.full_name, "map entry lacks a key or value field"));
    };

    for (key, value) in object {
        let mut encoded = Vec::new();
        write_tagged(registry, &entry.full_name, key_field, &JsonValue::String(key.clone()), &mut encoded)?;
        write_tagged(registry, &entry.full_name, value_field, value, &mut encoded)?;
        write_key(buf, field.number, WireKind::LengthDelimited);
        write_bytes(buf, &encoded);
    }
    Ok(())
}

fn write_tagged(
    registry: &TypeRegistry,
    owner: &str,
    field: &FieldDescriptor,
    value: &JsonValue,
    buf: &mut Vec<u8>,
) -> Result<(), CodecError> {
    write_key(buf, field.number, field.wire_kind);
    write_element(registry, owner, field, value, buf)
}

/// Writes a single untagged value.
fn write_element(
    registry: &TypeRegistry,
    owner: &str,
    field: &FieldDescriptor,
    value: &JsonValue,
    buf: &mut Vec<u8>,
) -> Result<(), CodecError> {
    match &field.ty {
        FieldType::Message(name) => {
            let mut nested = Vec::new();
            encode_into(registry, name, value, &mut nested)?;
            write_bytes(buf, &nested);
        }
        FieldType::Enum(name) => {
            let enumeration = registry.enumeration(name)?;
            let number = match value {
                JsonValue::String(symbol) => enumeration.number_of(symbol).ok_or_else(|| {
                    CodecError::invalid(owner, &field.name, format!("{name} has no value {symbol}"))
                })?,
                other => integer::<i32>(other)
                    .map_err(|reason| CodecError::invalid(owner, &field.name, reason))?,
            };
            encode_varint(i64::from(number) as u64, buf);
        }
        FieldType::Scalar(kind) => write_scalar(*kind, value, buf)
            .map_err(|reason| CodecError::invalid(owner, &field.name, reason))?,
    }
    Ok(())
}

fn write_scalar(kind: ScalarKind, value: &JsonValue, buf: &mut Vec<u8>) -> Result<(), String> {
    match kind {
        ScalarKind::Int32 => encode_varint(i64::from(integer::<i32>(value)?) as u64, buf),
        ScalarKind::Int64 => encode_varint(integer::<i64>(value)? as u64, buf),
        ScalarKind::Uint32 => encode_varint(u64::from(integer::<u32>(value)?), buf),
        ScalarKind::Uint64 => encode_varint(integer::<u64>(value)?, buf),
        ScalarKind::Sint32 => {
            let v = integer::<i32>(value)?;
            encode_varint(u64::from(((v << 1) ^ (v >> 31)) as u32), buf);
        }
        ScalarKind::Sint64 => {
            let v = integer::<i64>(value)?;
            encode_varint(((v << 1) ^ (v >> 63)) as u64, buf);
        }
        ScalarKind::Bool => encode_varint(u64::from(boolean(value)?), buf),
        ScalarKind::Fixed32 => buf.put_u32_le(integer(value)?),
        ScalarKind::Sfixed32 => buf.put_i32_le(integer(value)?),
        ScalarKind::Fixed64 => buf.put_u64_le(integer(value)?),
        ScalarKind::Sfixed64 => buf.put_i64_le(integer(value)?),
        ScalarKind::Float => buf.put_f32_le(float(value)? as f32),
        ScalarKind::Double => buf.put_f64_le(float(value)?),
        ScalarKind::String => {
            let text = value.as_str().ok_or_else(|| format!("expected a string, found {value}"))?;
            write_bytes(buf, text.as_bytes());
        }
        ScalarKind::Bytes => {
            let text =
                value.as_str().ok_or_else(|| format!("expected base64 text, found {value}"))?;
            let raw = STANDARD.decode(text).map_err(|err| format!("invalid base64: {err}"))?;
            write_bytes(buf, &raw);
        }
    }
    Ok(())
}

/// Integers are accepted as JSON numbers or decimal strings.
fn integer<T>(value: &JsonValue) -> Result<T, String>
where
    T: TryFrom<u64> + TryFrom<i64> + FromStr,
{
    match value {
        JsonValue::Number(number) => number
            .as_u64()
            .and_then(|v| <T as TryFrom<u64>>::try_from(v).ok())
            .or_else(|| number.as_i64().and_then(|v| <T as TryFrom<i64>>::try_from(v).ok()))
            .ok_or_else(|| format!("{number} is not an integer in range")),
        JsonValue::String(text) => {
            text.parse().map_err(|_| format!("{text:?} is not an integer in range"))
        }
        other => Err(format!("expected an integer, found {other}")),
    }
}

fn float(value: &JsonValue) -> Result<f64, String> {
    match value {
        JsonValue::Number(number) => {
            number.as_f64().ok_or_else(|| format!("{number} is not representable"))
        }
        JsonValue::String(text) => match text.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other.parse().map_err(|_| format!("{other:?} is not a number")),
        },
        other => Err(format!("expected a number, found {other}")),
    }
}

fn boolean(value: &JsonValue) -> Result<bool, String> {
    match value {
        JsonValue::Bool(flag) => Ok(*flag),
        JsonValue::String(text) => {
            text.parse().map_err(|_| format!("{text:?} is not a boolean"))
        }
        other => Err(format!("expected a boolean, found {other}")),
    }
}

fn write_key(buf: &mut Vec<u8>, number: u32, wire: WireKind) {
    encode_varint((u64::from(number) << 3) | wire.bits(), buf);
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_varint(bytes.len() as u64, buf);
    buf.extend_from_slice(bytes);
}
