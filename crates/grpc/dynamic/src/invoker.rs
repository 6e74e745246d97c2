//! Unary calls against methods discovered at runtime.

use crate::{
    codec,
    config::ClientConfig,
    descriptor::{MethodDescriptor, normalize_name},
    error::{CodecError, InvokeError, ReflectionError, TransportError},
    metrics::Metrics,
    reflection::{ReflectionLoader, ReflectionSource},
    registry::TypeRegistry,
    transport::{GrpcTransport, UnaryTransport},
};
use async_trait::async_trait;
use chainlens_metrics::observe_metrics_for_result_async;
use serde_json::Value as JsonValue;
use std::{sync::Arc, time::Duration};
use tracing::{debug, trace};

/// Ceiling on the missing-type loads a single encode or decode may trigger.
pub const MAX_TYPE_LOADS: usize = 20;

/// Calls arbitrary unary methods and decodes arbitrary messages.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Calls `service`/`method` with JSON `params` and returns the projected response.
    async fn call(
        &self,
        service: &str,
        method: &str,
        params: &JsonValue,
    ) -> Result<JsonValue, InvokeError>;

    /// Decodes `bytes` as a message of `type_name`, loading whatever types it needs.
    async fn decode_message(&self, type_name: &str, bytes: &[u8]) -> Result<JsonValue, InvokeError>;
}

/// Reflection-backed [`Invoker`].
///
/// Nothing about the remote schema is known up front. Services and types are fetched through
/// the [`ReflectionLoader`] the first time they are needed, and a payload that references a type
/// not loaded yet is retried after loading it, up to [`MAX_TYPE_LOADS`] times.
#[derive(Debug)]
pub struct DynamicClient<T, S = T> {
    transport: T,
    loader: ReflectionLoader<S>,
    call_timeout: Duration,
}

impl DynamicClient<GrpcTransport> {
    /// Client for `config.endpoint` sharing `registry`. Nothing is dialed until the first call.
    pub fn connect_lazy(
        config: &ClientConfig,
        registry: Arc<TypeRegistry>,
    ) -> Result<Self, TransportError> {
        let transport = GrpcTransport::connect_lazy(config)?;
        let loader = ReflectionLoader::new(transport.clone(), registry);
        Ok(Self::new(transport, loader, config.call_timeout))
    }
}

impl<T, S> DynamicClient<T, S>
where
    T: UnaryTransport,
    S: ReflectionSource,
{
    /// Creates a new [`DynamicClient`].
    pub fn new(transport: T, loader: ReflectionLoader<S>, call_timeout: Duration) -> Self {
        Metrics::init();
        Self { transport, loader, call_timeout }
    }

    /// The registry types are loaded into.
    pub const fn registry(&self) -> &Arc<TypeRegistry> {
        self.loader.registry()
    }

    /// The reflection loader.
    pub const fn loader(&self) -> &ReflectionLoader<S> {
        &self.loader
    }

    async fn call_inner(
        &self,
        service: &str,
        method: &str,
        params: &JsonValue,
    ) -> Result<JsonValue, InvokeError> {
        let descriptor = self.resolve_method(service, method).await?;
        if !descriptor.is_unary() {
            return Err(InvokeError::NotUnary(descriptor.path()));
        }
        self.resolve_type(&descriptor.request_type).await?;
        self.resolve_type(&descriptor.response_type).await?;

        let body = self
            .with_types(|registry| codec::encode(registry, &descriptor.request_type, params))
            .await?;

        let path = descriptor.path();
        trace!(target: "grpc::invoker", %path, len = body.len(), "Calling method");
        let response = tokio::time::timeout(
            self.call_timeout,
            self.transport.unary(&path, body.into(), self.call_timeout),
        )
        .await
        .map_err(|_| {
            TransportError::new(
                TransportError::DEADLINE_EXCEEDED,
                format!("no response within {:?}", self.call_timeout),
            )
        })??;

        if response.is_empty() {
            return Err(InvokeError::EmptyResponse { path });
        }
        self.decode(&descriptor.response_type, &response).await
    }

    async fn decode(&self, type_name: &str, bytes: &[u8]) -> Result<JsonValue, InvokeError> {
        self.with_types(|registry| codec::decode_to_json(registry, type_name, bytes)).await
    }

    /// Resolves a method, loading its service once if the registry does not know it.
    async fn resolve_method(
        &self,
        service: &str,
        method: &str,
    ) -> Result<Arc<MethodDescriptor>, InvokeError> {
        let not_found = || InvokeError::MethodNotFound {
            service: normalize_name(service).to_string(),
            method: method.to_string(),
        };

        if let Ok(descriptor) = self.registry().method(service, method) {
            return Ok(descriptor);
        }
        match self.loader.load(service).await {
            Ok(()) => {}
            Err(ReflectionError::Remote { .. }) => return Err(not_found()),
            Err(err) => return Err(err.into()),
        }
        self.registry().method(service, method).map_err(|_| not_found())
    }

    /// Makes sure a top-level message type is declared, loading it once if needed.
    async fn resolve_type(&self, type_name: &str) -> Result<(), InvokeError> {
        if self.registry().contains(type_name) {
            return Ok(());
        }
        self.load_type(type_name).await?;
        if self.registry().contains(type_name) {
            Ok(())
        } else {
            Err(InvokeError::TypeNotFound(normalize_name(type_name).to_string()))
        }
    }

    async fn load_type(&self, type_name: &str) -> Result<(), InvokeError> {
        match self.loader.load(type_name).await {
            Ok(()) => Ok(()),
            Err(ReflectionError::Remote { .. }) => {
                Err(InvokeError::TypeNotFound(normalize_name(type_name).to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Runs `op` until it stops reporting missing types.
    ///
    /// Each [`CodecError::TypeNotFound`] loads exactly the reported type and retries. Any other
    /// codec error is final. A type that is still missing after its load is final too, since
    /// loading it again cannot help.
    async fn with_types<R>(
        &self,
        op: impl Fn(&TypeRegistry) -> Result<R, CodecError>,
    ) -> Result<R, InvokeError> {
        let mut loads = 0;
        loop {
            let missing = match op(self.registry()) {
                Ok(value) => return Ok(value),
                Err(CodecError::TypeNotFound(name)) => name,
                Err(err) => return Err(InvokeError::Codec(err)),
            };

            if loads == MAX_TYPE_LOADS {
                return Err(InvokeError::DecodeDepthExceeded { depth: loads, type_name: missing });
            }
            if self.loader.is_loaded(&missing) {
                return Err(InvokeError::TypeNotFound(missing));
            }

            self.load_type(&missing).await?;
            loads += 1;
            debug!(target: "grpc::invoker", type_name = %missing, loads, "Loaded missing type");
        }
    }
}

#[async_trait]
impl<T, S> Invoker for DynamicClient<T, S>
where
    T: UnaryTransport,
    S: ReflectionSource,
{
    async fn call(
        &self,
        service: &str,
        method: &str,
        params: &JsonValue,
    ) -> Result<JsonValue, InvokeError> {
        let path = format!("/{}/{method}", normalize_name(service));
        observe_metrics_for_result_async!(
            Metrics::GRPC_CALLS_SUCCESS_TOTAL,
            Metrics::GRPC_CALLS_ERROR_TOTAL,
            Metrics::GRPC_CALL_DURATION_SECONDS,
            path,
            self.call_inner(service, method, params)
        )
    }

    async fn decode_message(&self, type_name: &str, bytes: &[u8]) -> Result<JsonValue, InvokeError> {
        self.decode(normalize_name(type_name), bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        reflection::{MessageRequest, ServerReflectionRequest, ServerReflectionResponse},
        test_utils::{self, DenomTrace, QueryDenomTraceResponse},
    };
    use bytes::Bytes;
    use mockall::mock;
    use prost::Message;
    use prost_types::{
        FileDescriptorProto,
        field_descriptor_proto::{Label, Type},
    };
    use rstest::rstest;
    use serde_json::json;

    mock! {
        #[derive(Debug)]
        pub Transport {}

        #[async_trait]
        impl UnaryTransport for Transport {
            async fn unary(&self, path: &str, body: Bytes, timeout: Duration) -> Result<Bytes, TransportError>;
        }
    }

    mock! {
        #[derive(Debug)]
        pub Source {}

        #[async_trait]
        impl ReflectionSource for Source {
            async fn exchange(
                &self,
                request: ServerReflectionRequest,
            ) -> Result<ServerReflectionResponse, ReflectionError>;
        }
    }

    const QUERY: &str = "ibc.applications.transfer.v1.Query";

    fn requested_symbol(request: &ServerReflectionRequest) -> String {
        match &request.message_request {
            Some(MessageRequest::FileContainingSymbol(symbol)) => symbol.clone(),
            other => panic!("unexpected request {other:?}"),
        }
    }

    /// A reflection source that knows the transfer query files.
    fn transfer_source() -> MockSource {
        let mut source = MockSource::new();
        source.expect_exchange().returning(|request| {
            Ok(match requested_symbol(&request).as_str() {
                QUERY => test_utils::descriptor_response(&[test_utils::transfer_query_file()]),
                "ibc.applications.transfer.v1.DenomTrace" => {
                    test_utils::descriptor_response(&[test_utils::transfer_types_file()])
                }
                symbol => test_utils::error_response(5, &format!("symbol not found: {symbol}")),
            })
        });
        source
    }

    fn denom_trace_transport() -> MockTransport {
        let mut transport = MockTransport::new();
        transport
            .expect_unary()
            .withf(|path, body, timeout| {
                path == "/ibc.applications.transfer.v1.Query/DenomTrace" &&
                    body.as_ref() == [0x0a, 0x03, b'A', b'B', b'C'] &&
                    *timeout == ClientConfig::DEFAULT_CALL_TIMEOUT
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(QueryDenomTraceResponse {
                    denom_trace: Some(DenomTrace {
                        path: "transfer/channel-0".to_string(),
                        base_denom: "uosmo".to_string(),
                    }),
                }
                .encode_to_vec()
                .into())
            });
        transport
    }

    fn client<T: UnaryTransport, S: ReflectionSource>(
        transport: T,
        source: S,
        registry: Arc<TypeRegistry>,
    ) -> DynamicClient<T, S> {
        DynamicClient::new(
            transport,
            ReflectionLoader::new(source, registry),
            ClientConfig::DEFAULT_CALL_TIMEOUT,
        )
    }

    #[tokio::test]
    async fn missing_nested_types_load_transparently() {
        let lazy = client(denom_trace_transport(), transfer_source(), Arc::new(TypeRegistry::new()));
        let loaded_on_demand = lazy.call(QUERY, "DenomTrace", &json!({ "hash": "ABC" })).await.unwrap();
        assert!(lazy.loader().is_loaded("ibc.applications.transfer.v1.DenomTrace"));

        let preloaded_registry = Arc::new(TypeRegistry::new());
        preloaded_registry.declare_file(&test_utils::transfer_query_file());
        preloaded_registry.declare_file(&test_utils::transfer_types_file());
        let mut idle_source = MockSource::new();
        idle_source.expect_exchange().never();
        let preloaded = client(denom_trace_transport(), idle_source, preloaded_registry);
        let from_preloaded =
            preloaded.call(QUERY, "DenomTrace", &json!({ "hash": "ABC" })).await.unwrap();

        assert_eq!(loaded_on_demand, from_preloaded);
        assert_eq!(
            loaded_on_demand,
            json!({ "denom_trace": { "path": "transfer/channel-0", "base_denom": "uosmo" } })
        );
    }

    #[tokio::test]
    async fn unknown_services_are_method_not_found() {
        let mut transport = MockTransport::new();
        transport.expect_unary().never();
        let client = client(transport, transfer_source(), Arc::new(TypeRegistry::new()));

        assert_eq!(
            client.call("cosmos.nope.v1.Query", "Params", &json!({})).await,
            Err(InvokeError::MethodNotFound {
                service: "cosmos.nope.v1.Query".to_string(),
                method: "Params".to_string(),
            })
        );
        assert_eq!(
            client.call(QUERY, "Nope", &json!({})).await,
            Err(InvokeError::MethodNotFound { service: QUERY.to_string(), method: "Nope".to_string() })
        );
    }

    #[tokio::test]
    async fn transport_failures_are_not_retried() {
        let mut transport = MockTransport::new();
        transport.expect_unary().times(1).returning(|_, _, _| {
            Err(TransportError::new(TransportError::UNAVAILABLE, "connection refused"))
        });
        let client = client(transport, transfer_source(), Arc::new(TypeRegistry::new()));

        assert_eq!(
            client.call(QUERY, "DenomTrace", &json!({ "hash": "ABC" })).await,
            Err(InvokeError::Transport(TransportError::new(14, "connection refused")))
        );
    }

    #[tokio::test]
    async fn empty_bodies_are_rejected() {
        let mut transport = MockTransport::new();
        transport.expect_unary().returning(|_, _, _| Ok(Bytes::new()));
        let client = client(transport, transfer_source(), Arc::new(TypeRegistry::new()));

        assert_eq!(
            client.call(QUERY, "DenomTrace", &json!({})).await,
            Err(InvokeError::EmptyResponse {
                path: "/ibc.applications.transfer.v1.Query/DenomTrace".to_string()
            })
        );
    }

    #[tokio::test]
    async fn bad_params_fail_before_the_call() {
        let mut transport = MockTransport::new();
        transport.expect_unary().never();
        let client = client(transport, transfer_source(), Arc::new(TypeRegistry::new()));

        assert!(matches!(
            client.call(QUERY, "DenomTrace", &json!({ "hsh": "ABC" })).await,
            Err(InvokeError::Codec(CodecError::UnknownField { .. }))
        ));
    }

    #[tokio::test]
    async fn types_the_remote_does_not_know_are_not_found() {
        let client = client(MockTransport::new(), transfer_source(), Arc::new(TypeRegistry::new()));

        assert_eq!(
            client.decode_message(".cosmos.bank.v1beta1.Metadata", &[0x0a, 0x00]).await,
            Err(InvokeError::TypeNotFound("cosmos.bank.v1beta1.Metadata".to_string()))
        );
    }

    /// `deep.T{index}`, whose field 1 references `deep.T{index + 1}`.
    fn deep_file(index: usize) -> FileDescriptorProto {
        let next = format!("deep.T{}", index + 1);
        let message = test_utils::message(
            &format!("T{index}"),
            vec![test_utils::reference("next", 1, Type::Message, &next, Label::Optional)],
        );
        let services = if index == 0 {
            vec![test_utils::service("Svc", &[("Get", "deep.T0", "deep.T0")])]
        } else {
            vec![]
        };
        test_utils::file(&format!("deep/t{index}.proto"), "deep", vec![message], vec![], services)
    }

    /// `depth` levels of nesting below the root message.
    fn nested_payload(depth: usize) -> Vec<u8> {
        (0..depth).fold(Vec::new(), |inner, _| {
            let mut outer = vec![0x0a];
            prost::encoding::encode_varint(inner.len() as u64, &mut outer);
            outer.extend(inner);
            outer
        })
    }

    #[rstest]
    #[case::at_ceiling(MAX_TYPE_LOADS, None)]
    #[case::past_ceiling(MAX_TYPE_LOADS + 1, Some("deep.T21"))]
    #[tokio::test]
    async fn nested_type_loads_are_bounded(#[case] depth: usize, #[case] exceeded: Option<&str>) {
        let mut source = MockSource::new();
        source.expect_exchange().returning(|request| {
            let symbol = requested_symbol(&request);
            let index = if symbol == "deep.Svc" {
                0
            } else {
                symbol.trim_start_matches("deep.T").parse().unwrap()
            };
            Ok(test_utils::descriptor_response(&[deep_file(index)]))
        });
        let mut transport = MockTransport::new();
        let payload = nested_payload(depth);
        transport.expect_unary().returning(move |_, _, _| Ok(payload.clone().into()));
        let client = client(transport, source, Arc::new(TypeRegistry::new()));

        let result = client.call("deep.Svc", "Get", &json!({})).await;
        match exceeded {
            None => {
                let mut value = &result.unwrap();
                for _ in 0..depth {
                    value = &value["next"];
                }
                assert_eq!(*value, json!({ "next": null }));
            }
            Some(type_name) => assert_eq!(
                result,
                Err(InvokeError::DecodeDepthExceeded {
                    depth: MAX_TYPE_LOADS,
                    type_name: type_name.to_string()
                })
            ),
        }
    }
}
