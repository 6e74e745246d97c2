//! Descriptor fixtures built from `prost-types` records.

use crate::reflection::{
    ErrorResponse, FileDescriptorResponse, MessageResponse, ServerReflectionResponse,
};
use prost::Message;
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MessageOptions, MethodDescriptorProto, OneofDescriptorProto,
    ServiceDescriptorProto,
    field_descriptor_proto::{Label, Type},
};

pub(crate) fn scalar(name: &str, number: i32, ty: Type, label: Label) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        r#type: Some(ty as i32),
        label: Some(label as i32),
        ..Default::default()
    }
}

pub(crate) fn reference(
    name: &str,
    number: i32,
    ty: Type,
    type_name: &str,
    label: Label,
) -> FieldDescriptorProto {
    FieldDescriptorProto { type_name: Some(format!(".{type_name}")), ..scalar(name, number, ty, label) }
}

pub(crate) fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto { name: Some(name.to_string()), field: fields, ..Default::default() }
}

pub(crate) fn enum_type(name: &str, values: &[&str]) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_string()),
        value: values
            .iter()
            .zip(0..)
            .map(|(value, number)| EnumValueDescriptorProto {
                name: Some((*value).to_string()),
                number: Some(number),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

/// `(method, input, output)` triples, types fully qualified without the leading dot.
pub(crate) fn service(name: &str, methods: &[(&str, &str, &str)]) -> ServiceDescriptorProto {
    ServiceDescriptorProto {
        name: Some(name.to_string()),
        method: methods
            .iter()
            .map(|(method, input, output)| MethodDescriptorProto {
                name: Some((*method).to_string()),
                input_type: Some(format!(".{input}")),
                output_type: Some(format!(".{output}")),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

pub(crate) fn file(
    name: &str,
    package: &str,
    messages: Vec<DescriptorProto>,
    enums: Vec<EnumDescriptorProto>,
    services: Vec<ServiceDescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some(package.to_string()),
        message_type: messages,
        enum_type: enums,
        service: services,
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// The denom trace query service. Its response references `DenomTrace`, which lives in
/// [`transfer_types_file`].
pub(crate) fn transfer_query_file() -> FileDescriptorProto {
    let mut file = file(
        "ibc/applications/transfer/v1/query.proto",
        "ibc.applications.transfer.v1",
        vec![
            message(
                "QueryDenomTraceRequest",
                vec![scalar("hash", 1, Type::String, Label::Optional)],
            ),
            message(
                "QueryDenomTraceResponse",
                vec![reference(
                    "denom_trace",
                    1,
                    Type::Message,
                    "ibc.applications.transfer.v1.DenomTrace",
                    Label::Optional,
                )],
            ),
        ],
        vec![],
        vec![service(
            "Query",
            &[(
                "DenomTrace",
                "ibc.applications.transfer.v1.QueryDenomTraceRequest",
                "ibc.applications.transfer.v1.QueryDenomTraceResponse",
            )],
        )],
    );
    file.dependency.push("ibc/applications/transfer/v1/transfer.proto".to_string());
    file
}

pub(crate) fn transfer_types_file() -> FileDescriptorProto {
    file(
        "ibc/applications/transfer/v1/transfer.proto",
        "ibc.applications.transfer.v1",
        vec![message(
            "DenomTrace",
            vec![
                scalar("path", 1, Type::String, Label::Optional),
                scalar("base_denom", 2, Type::String, Label::Optional),
            ],
        )],
        vec![],
        vec![],
    )
}

/// A message exercising every field shape the codec handles.
pub(crate) fn sample_file() -> FileDescriptorProto {
    let mut balances_entry = message(
        "BalancesEntry",
        vec![
            scalar("key", 1, Type::String, Label::Optional),
            scalar("value", 2, Type::Uint64, Label::Optional),
        ],
    );
    balances_entry.options = Some(MessageOptions { map_entry: Some(true), ..Default::default() });

    let mut left = scalar("left", 15, Type::String, Label::Optional);
    left.oneof_index = Some(0);
    let mut right = scalar("right", 16, Type::String, Label::Optional);
    right.oneof_index = Some(0);

    let mut sample = message(
        "Sample",
        vec![
            scalar("height", 1, Type::Int64, Label::Optional),
            scalar("amount", 2, Type::Uint64, Label::Optional),
            scalar("delta", 3, Type::Sint32, Label::Optional),
            scalar("ok", 4, Type::Bool, Label::Optional),
            scalar("memo", 5, Type::String, Label::Optional),
            scalar("data", 6, Type::Bytes, Label::Optional),
            reference("status", 7, Type::Enum, "test.v1.Status", Label::Optional),
            scalar("ids", 8, Type::Uint32, Label::Repeated),
            reference("inner", 9, Type::Message, "test.v1.Inner", Label::Optional),
            reference("items", 10, Type::Message, "test.v1.Inner", Label::Repeated),
            reference(
                "balances",
                11,
                Type::Message,
                "test.v1.Sample.BalancesEntry",
                Label::Repeated,
            ),
            scalar("ratio", 12, Type::Double, Label::Optional),
            scalar("nonce", 13, Type::Fixed64, Label::Optional),
            scalar("score", 14, Type::Float, Label::Optional),
            left,
            right,
        ],
    );
    sample.nested_type.push(balances_entry);
    sample.oneof_decl.push(OneofDescriptorProto {
        name: Some("choice".to_string()),
        ..Default::default()
    });

    file(
        "test/v1/sample.proto",
        "test.v1",
        vec![sample, message("Inner", vec![scalar("name", 1, Type::String, Label::Optional)])],
        vec![enum_type("Status", &["STATUS_UNSPECIFIED", "STATUS_ACTIVE"])],
        vec![service("Samples", &[("Get", "test.v1.Inner", "test.v1.Sample")])],
    )
}

/// `deep.Node { Node next = 1; string label = 2; }`.
pub(crate) fn recursive_file() -> FileDescriptorProto {
    file(
        "deep/node.proto",
        "deep",
        vec![message(
            "Node",
            vec![
                reference("next", 1, Type::Message, "deep.Node", Label::Optional),
                scalar("label", 2, Type::String, Label::Optional),
            ],
        )],
        vec![],
        vec![],
    )
}

/// A `deep.Node` whose leaf, labelled `leaf`, sits under `wrappers` levels of `next`.
pub(crate) fn nested_nodes(wrappers: usize) -> Vec<u8> {
    // Built back to front so each level is a prepend.
    let mut reversed = vec![b'f', b'a', b'e', b'l', 4, 0x12];
    for _ in 0..wrappers {
        let mut len = Vec::new();
        prost::encoding::encode_varint(reversed.len() as u64, &mut len);
        reversed.extend(len.iter().rev());
        reversed.push(0x0a);
    }
    reversed.reverse();
    reversed
}

pub(crate) fn descriptor_response(files: &[FileDescriptorProto]) -> ServerReflectionResponse {
    ServerReflectionResponse {
        valid_host: String::new(),
        original_request: None,
        message_response: Some(MessageResponse::FileDescriptorResponse(FileDescriptorResponse {
            file_descriptor_proto: files.iter().map(Message::encode_to_vec).collect(),
        })),
    }
}

pub(crate) fn error_response(code: i32, message: &str) -> ServerReflectionResponse {
    ServerReflectionResponse {
        valid_host: String::new(),
        original_request: None,
        message_response: Some(MessageResponse::ErrorResponse(ErrorResponse {
            error_code: code,
            error_message: message.to_string(),
        })),
    }
}

/// Statically typed twin of `test.v1.Sample`, used to produce reference encodings. The oneof is
/// approximated by its `left` member.
#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct Sample {
    #[prost(int64, tag = "1")]
    pub(crate) height: i64,
    #[prost(uint64, tag = "2")]
    pub(crate) amount: u64,
    #[prost(sint32, tag = "3")]
    pub(crate) delta: i32,
    #[prost(bool, tag = "4")]
    pub(crate) ok: bool,
    #[prost(string, tag = "5")]
    pub(crate) memo: String,
    #[prost(bytes = "vec", tag = "6")]
    pub(crate) data: Vec<u8>,
    #[prost(int32, tag = "7")]
    pub(crate) status: i32,
    #[prost(uint32, repeated, tag = "8")]
    pub(crate) ids: Vec<u32>,
    #[prost(message, optional, tag = "9")]
    pub(crate) inner: Option<Inner>,
    #[prost(message, repeated, tag = "10")]
    pub(crate) items: Vec<Inner>,
    #[prost(btree_map = "string, uint64", tag = "11")]
    pub(crate) balances: std::collections::BTreeMap<String, u64>,
    #[prost(double, tag = "12")]
    pub(crate) ratio: f64,
    #[prost(fixed64, tag = "13")]
    pub(crate) nonce: u64,
    #[prost(float, tag = "14")]
    pub(crate) score: f32,
    #[prost(string, optional, tag = "15")]
    pub(crate) left: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct Inner {
    #[prost(string, tag = "1")]
    pub(crate) name: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct DenomTrace {
    #[prost(string, tag = "1")]
    pub(crate) path: String,
    #[prost(string, tag = "2")]
    pub(crate) base_denom: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct QueryDenomTraceResponse {
    #[prost(message, optional, tag = "1")]
    pub(crate) denom_trace: Option<DenomTrace>,
}
