//! Process-wide catalog of message, enum and service shapes.
//!
//! Types live in a tree keyed by name segment, so `cosmos.bank.v1beta1.Query` is reached through
//! the `cosmos`, `bank` and `v1beta1` namespace nodes. Declaration is insert-only: the first
//! definition seen for a name is kept for the lifetime of the registry.

use crate::{
    descriptor::{
        DescriptorKind, EnumDescriptor, EnumValue, MessageDescriptor, MethodDescriptor,
        ServiceDescriptor, TypeDescriptor, field_from_proto, normalize_name,
    },
    error::RegistryError,
};
use prost_types::{DescriptorProto, EnumDescriptorProto, FileDescriptorProto, ServiceDescriptorProto};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct Node {
    /// `None` for pure namespace nodes and for types whose nested members were declared first.
    descriptor: Option<TypeDescriptor>,
    children: HashMap<String, Node>,
}

impl Node {
    fn find(&self, name: &str) -> Option<&Self> {
        name.split('.').try_fold(self, |node, segment| node.children.get(segment))
    }

    fn count(&self) -> usize {
        usize::from(self.descriptor.is_some()) + self.children.values().map(Self::count).sum::<usize>()
    }

    fn collect_names(&self, out: &mut Vec<String>) {
        if let Some(descriptor) = &self.descriptor {
            out.push(descriptor.full_name().to_string());
        }
        for child in self.children.values() {
            child.collect_names(out);
        }
    }
}

/// Lazily populated catalog of descriptors addressable by fully qualified name.
///
/// Shared read-mostly between the worker loops. Concurrent duplicate declarations are safe since
/// the first one wins and the rest are ignored.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    root: RwLock<Node>,
    files: RwLock<HashSet<String>>,
    methods: RwLock<HashMap<String, Arc<MethodDescriptor>>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // The tree is insert-only and every write completes before the guard drops, so a poisoned
    // lock still guards a consistent tree.
    fn read_root(&self) -> RwLockReadGuard<'_, Node> {
        self.root.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_root(&self) -> RwLockWriteGuard<'_, Node> {
        self.root.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Declares a type. Returns `false` when the name was already declared, in which case the
    /// existing definition is kept untouched.
    pub fn declare(&self, descriptor: TypeDescriptor) -> bool {
        let name = descriptor.full_name().to_string();
        let mut root = self.write_root();
        let node = name
            .split('.')
            .fold(&mut *root, |node, segment| node.children.entry(segment.to_string()).or_default());

        if let Some(existing) = &node.descriptor {
            trace!(
                target: "grpc::registry",
                %name,
                kind = %existing.kind(),
                "Ignoring duplicate declaration"
            );
            return false;
        }
        node.descriptor = Some(descriptor);
        true
    }

    /// Looks up a type by fully qualified name. A leading dot is accepted.
    pub fn lookup(&self, name: &str) -> Result<TypeDescriptor, RegistryError> {
        let name = normalize_name(name);
        self.read_root()
            .find(name)
            .and_then(|node| node.descriptor.clone())
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Whether a type is declared under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }

    /// Looks up a message type.
    pub fn message(&self, name: &str) -> Result<Arc<MessageDescriptor>, RegistryError> {
        match self.lookup(name)? {
            TypeDescriptor::Message(message) => Ok(message),
            other => Err(mismatch(name, DescriptorKind::Message, &other)),
        }
    }

    /// Looks up an enum type.
    pub fn enumeration(&self, name: &str) -> Result<Arc<EnumDescriptor>, RegistryError> {
        match self.lookup(name)? {
            TypeDescriptor::Enum(enumeration) => Ok(enumeration),
            other => Err(mismatch(name, DescriptorKind::Enum, &other)),
        }
    }

    /// Looks up a service.
    pub fn service(&self, name: &str) -> Result<Arc<ServiceDescriptor>, RegistryError> {
        match self.lookup(name)? {
            TypeDescriptor::Service(service) => Ok(service),
            other => Err(mismatch(name, DescriptorKind::Service, &other)),
        }
    }

    /// Resolves a method, caching it after the first successful resolution.
    pub fn method(&self, service: &str, method: &str) -> Result<Arc<MethodDescriptor>, RegistryError> {
        let service = normalize_name(service);
        let cache_key = format!("{service}/{method}");
        if let Some(cached) =
            self.methods.read().unwrap_or_else(PoisonError::into_inner).get(&cache_key)
        {
            return Ok(cached.clone());
        }

        let resolved = self.service(service)?.method(method).cloned().ok_or_else(|| {
            RegistryError::MethodNotFound { service: service.to_string(), method: method.to_string() }
        })?;

        self.methods
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(cache_key)
            .or_insert_with(|| resolved.clone());
        Ok(resolved)
    }

    /// Whether a descriptor file with this name has been declared.
    pub fn has_file(&self, name: &str) -> bool {
        self.files.read().unwrap_or_else(PoisonError::into_inner).contains(name)
    }

    /// Number of declared types.
    pub fn len(&self) -> usize {
        self.read_root().count()
    }

    /// Whether nothing has been declared yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted names of every declared type.
    pub fn type_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.read_root().collect_names(&mut names);
        names.sort();
        names
    }

    /// Declares every enum, message (nested members first) and service of a descriptor file.
    ///
    /// Returns the number of newly declared types.
    pub fn declare_file(&self, file: &FileDescriptorProto) -> usize {
        let package = file.package();
        let proto3 = file.syntax() == "proto3";

        let mut declared = 0;
        for enumeration in &file.enum_type {
            declared += usize::from(self.declare(enum_from_proto(package, enumeration)));
        }
        for message in &file.message_type {
            declared += self.declare_message(package, message, proto3);
        }
        for service in &file.service {
            declared += usize::from(self.declare(service_from_proto(package, service)));
        }

        self.files.write().unwrap_or_else(PoisonError::into_inner).insert(file.name().to_string());
        debug!(target: "grpc::registry", file = file.name(), package, declared, "Declared descriptor file");
        declared
    }

    fn declare_message(&self, scope: &str, message: &DescriptorProto, proto3: bool) -> usize {
        let full_name = qualify(scope, message.name());

        let mut declared = 0;
        for enumeration in &message.enum_type {
            declared += usize::from(self.declare(enum_from_proto(&full_name, enumeration)));
        }
        for nested in &message.nested_type {
            declared += self.declare_message(&full_name, nested, proto3);
        }

        let descriptor = MessageDescriptor {
            fields: message.field.iter().filter_map(|f| field_from_proto(f, proto3)).collect(),
            map_entry: message.options.as_ref().and_then(|o| o.map_entry).unwrap_or(false),
            full_name,
        };
        declared + usize::from(self.declare(TypeDescriptor::Message(Arc::new(descriptor))))
    }
}

fn mismatch(name: &str, expected: DescriptorKind, found: &TypeDescriptor) -> RegistryError {
    RegistryError::KindMismatch {
        name: normalize_name(name).to_string(),
        expected,
        found: found.kind(),
    }
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() { name.to_string() } else { format!("{scope}.{name}") }
}

fn enum_from_proto(scope: &str, enumeration: &EnumDescriptorProto) -> TypeDescriptor {
    TypeDescriptor::Enum(Arc::new(EnumDescriptor {
        full_name: qualify(scope, enumeration.name()),
        values: enumeration
            .value
            .iter()
            .map(|v| EnumValue { name: v.name().to_string(), number: v.number() })
            .collect(),
    }))
}

fn service_from_proto(scope: &str, service: &ServiceDescriptorProto) -> TypeDescriptor {
    let full_name = qualify(scope, service.name());
    let methods = service
        .method
        .iter()
        .map(|m| {
            Arc::new(MethodDescriptor {
                service_name: full_name.clone(),
                method_name: m.name().to_string(),
                request_type: normalize_name(m.input_type()).to_string(),
                response_type: normalize_name(m.output_type()).to_string(),
                client_streaming: m.client_streaming(),
                server_streaming: m.server_streaming(),
            })
        })
        .collect();
    TypeDescriptor::Service(Arc::new(ServiceDescriptor { full_name, methods }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        descriptor::{FieldType, ScalarKind},
        test_utils::{self, enum_type, file, message, scalar},
    };
    use prost_types::field_descriptor_proto::{Label, Type};

    #[test]
    fn lookup_unknown_symbol_is_not_found() {
        let registry = TypeRegistry::new();
        assert_eq!(
            registry.lookup("cosmos.bank.v1beta1.Query"),
            Err(RegistryError::NotFound("cosmos.bank.v1beta1.Query".to_string()))
        );
    }

    #[test]
    fn first_declaration_wins() {
        let registry = TypeRegistry::new();
        let first = MessageDescriptor {
            full_name: "demo.Coin".to_string(),
            fields: vec![],
            map_entry: false,
        };
        let second = MessageDescriptor { map_entry: true, ..first.clone() };

        assert!(registry.declare(TypeDescriptor::Message(Arc::new(first.clone()))));
        assert!(!registry.declare(TypeDescriptor::Message(Arc::new(second))));
        assert!(!registry.declare(enum_from_proto("demo", &enum_type("Coin", &["A"]))));

        assert_eq!(*registry.message("demo.Coin").unwrap(), first);
    }

    #[test]
    fn package_segments_are_namespaces_not_types() {
        let registry = TypeRegistry::new();
        registry.declare_file(&test_utils::transfer_types_file());

        assert!(registry.contains("ibc.applications.transfer.v1.DenomTrace"));
        assert!(registry.contains(".ibc.applications.transfer.v1.DenomTrace"));
        assert!(matches!(
            registry.lookup("ibc.applications.transfer"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn nested_types_are_declared_under_their_parent() {
        let registry = TypeRegistry::new();
        let mut outer = message("Outer", vec![scalar("id", 1, Type::Uint64, Label::Optional)]);
        outer.nested_type.push(message("Inner", vec![scalar("name", 1, Type::String, Label::Optional)]));
        outer.enum_type.push(enum_type("Kind", &["KIND_UNSPECIFIED", "KIND_A"]));

        let declared = registry.declare_file(&file("outer.proto", "demo.v1", vec![outer], vec![], vec![]));

        assert_eq!(declared, 3);
        assert!(registry.has_file("outer.proto"));
        let inner = registry.message("demo.v1.Outer.Inner").unwrap();
        assert_eq!(inner.fields[0].ty, FieldType::Scalar(ScalarKind::String));
        let kind = registry.enumeration("demo.v1.Outer.Kind").unwrap();
        assert_eq!(kind.name_of(1), Some("KIND_A"));
        assert_eq!(
            registry.type_names(),
            vec!["demo.v1.Outer", "demo.v1.Outer.Inner", "demo.v1.Outer.Kind"]
        );
    }

    #[test]
    fn redeclaring_a_file_changes_nothing() {
        let registry = TypeRegistry::new();
        assert!(registry.declare_file(&test_utils::transfer_query_file()) > 0);
        let before = registry.type_names();

        assert_eq!(registry.declare_file(&test_utils::transfer_query_file()), 0);
        assert_eq!(registry.type_names(), before);
    }

    #[test]
    fn methods_resolve_and_cache() {
        let registry = TypeRegistry::new();
        registry.declare_file(&test_utils::transfer_query_file());

        let method = registry.method("ibc.applications.transfer.v1.Query", "DenomTrace").unwrap();
        assert_eq!(method.path(), "/ibc.applications.transfer.v1.Query/DenomTrace");
        assert_eq!(method.request_type, "ibc.applications.transfer.v1.QueryDenomTraceRequest");
        assert!(method.is_unary());

        let again = registry.method("ibc.applications.transfer.v1.Query", "DenomTrace").unwrap();
        assert!(Arc::ptr_eq(&method, &again));

        assert_eq!(
            registry.method("ibc.applications.transfer.v1.Query", "Nope"),
            Err(RegistryError::MethodNotFound {
                service: "ibc.applications.transfer.v1.Query".to_string(),
                method: "Nope".to_string(),
            })
        );
    }

    #[test]
    fn kind_mismatch_is_reported() {
        let registry = TypeRegistry::new();
        registry.declare_file(&test_utils::transfer_query_file());

        assert!(matches!(
            registry.service("ibc.applications.transfer.v1.QueryDenomTraceRequest"),
            Err(RegistryError::KindMismatch { expected: DescriptorKind::Service, .. })
        ));
    }

    #[test]
    fn concurrent_duplicate_declarations_keep_one_definition() {
        let registry = TypeRegistry::new();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| registry.declare_file(&test_utils::transfer_query_file()));
            }
        });

        assert_eq!(registry.len(), 3);
        assert!(registry.contains("ibc.applications.transfer.v1.Query"));
    }
}
