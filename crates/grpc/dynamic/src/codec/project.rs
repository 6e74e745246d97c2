//! Projection of decoded messages into JSON objects.
//!
//! 64-bit integers render as decimal strings, enums by symbolic name and bytes as base64.
//! Absent fields render as their zero value, except absent oneof members which are omitted.

use super::{
    RECURSION_LIMIT,
    value::{DynamicMessage, Value},
};
use crate::{
    descriptor::{FieldDescriptor, FieldType},
    error::CodecError,
    registry::TypeRegistry,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Map, Number, Value as JsonValue};

/// Projects `message` into a JSON object keyed by field name.
///
/// Nesting deeper than [`RECURSION_LIMIT`] is malformed.
pub fn project(registry: &TypeRegistry, message: &DynamicMessage) -> Result<JsonValue, CodecError> {
    project_nested(registry, message, RECURSION_LIMIT)
}

fn project_nested(
    registry: &TypeRegistry,
    message: &DynamicMessage,
    depth: u32,
) -> Result<JsonValue, CodecError> {
    let descriptor = registry.message(&message.type_name)?;
    let depth = depth
        .checked_sub(1)
        .ok_or_else(|| CodecError::malformed(&descriptor.full_name, "recursion limit reached"))?;
    let mut object = Map::with_capacity(descriptor.fields.len());
    for field in &descriptor.fields {
        let rendered = match message.get(field.number) {
            Some(value) => render_field(registry, field, value, depth)?,
            None if field.oneof_index.is_some() => continue,
            None => zero(registry, field)?,
        };
        object.insert(field.name.clone(), rendered);
    }
    Ok(JsonValue::Object(object))
}

fn zero(registry: &TypeRegistry, field: &FieldDescriptor) -> Result<JsonValue, CodecError> {
    if field.repeated {
        let is_map = matches!(
            &field.ty,
            FieldType::Message(name) if registry.message(name).is_ok_and(|m| m.map_entry)
        );
        return Ok(if is_map { JsonValue::Object(Map::new()) } else { JsonValue::Array(Vec::new()) });
    }
    match &field.ty {
        FieldType::Message(_) => Ok(JsonValue::Null),
        ty => render(registry, ty, &Value::zero_of(ty), 0),
    }
}

fn render_field(
    registry: &TypeRegistry,
    field: &FieldDescriptor,
    value: &Value,
    depth: u32,
) -> Result<JsonValue, CodecError> {
    let (Value::Map(entries), FieldType::Message(entry_name)) = (value, &field.ty) else {
        return render(registry, &field.ty, value, depth);
    };

    let entry = registry.message(entry_name)?;
    let value_ty = entry
        .field(2)
        .map(|f| f.ty.clone())
        .ok_or_else(|| CodecError::malformed(entry_name, "map entry lacks a value field"))?;
    let mut object = Map::with_capacity(entries.len());
    for (key, value) in entries {
        object.insert(map_key(key), render(registry, &value_ty, value, depth)?);
    }
    Ok(JsonValue::Object(object))
}

fn render(
    registry: &TypeRegistry,
    ty: &FieldType,
    value: &Value,
    depth: u32,
) -> Result<JsonValue, CodecError> {
    Ok(match value {
        Value::Bool(flag) => JsonValue::Bool(*flag),
        Value::I32(n) => JsonValue::from(*n),
        Value::U32(n) => JsonValue::from(*n),
        Value::I64(n) => JsonValue::String(n.to_string()),
        Value::U64(n) => JsonValue::String(n.to_string()),
        // Through the shortest decimal form so 0.1f32 renders as 0.1.
        Value::F32(f) => float(f.to_string().parse().unwrap_or(f64::from(*f))),
        Value::F64(f) => float(*f),
        Value::String(text) => JsonValue::String(text.clone()),
        Value::Bytes(raw) => JsonValue::String(STANDARD.encode(raw)),
        Value::Enum(number) => match ty {
            FieldType::Enum(name) => registry
                .enumeration(name)?
                .name_of(*number)
                .map_or_else(|| JsonValue::from(*number), |symbol| JsonValue::String(symbol.to_string())),
            _ => JsonValue::from(*number),
        },
        Value::Message(message) => project_nested(registry, message, depth)?,
        Value::List(items) => JsonValue::Array(
            items.iter().map(|item| render(registry, ty, item, depth)).collect::<Result<_, _>>()?,
        ),
        Value::Map(entries) => JsonValue::Object(
            entries
                .iter()
                .map(|(key, value)| Ok((map_key(key), render(registry, ty, value, depth)?)))
                .collect::<Result<_, CodecError>>()?,
        ),
    })
}

fn float(value: f64) -> JsonValue {
    match Number::from_f64(value) {
        Some(number) => JsonValue::Number(number),
        None if value.is_nan() => JsonValue::String("NaN".to_string()),
        None if value > 0.0 => JsonValue::String("Infinity".to_string()),
        None => JsonValue::String("-Infinity".to_string()),
    }
}

fn map_key(key: &Value) -> String {
    match key {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::I32(n) | Value::Enum(n) => n.to_string(),
        Value::I64(n) => n.to_string(),
        Value::U32(n) => n.to_string(),
        Value::U64(n) => n.to_string(),
        other => format!("{other:?}"),
    }
}
