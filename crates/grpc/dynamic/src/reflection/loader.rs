use super::{
    proto::{MessageResponse, ServerReflectionRequest},
    source::ReflectionSource,
};
use crate::{
    descriptor::normalize_name, error::ReflectionError, metrics::Metrics, registry::TypeRegistry,
};
use prost::Message;
use prost_types::FileDescriptorProto;
use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::{debug, warn};

/// Fetches descriptors from a remote reflection service into a [`TypeRegistry`].
///
/// Loads are idempotent per symbol: once a symbol was loaded successfully it is never fetched
/// again. Failed loads are not remembered, so a later call retries.
#[derive(Debug)]
pub struct ReflectionLoader<S> {
    source: S,
    registry: Arc<TypeRegistry>,
    seen: Mutex<HashSet<String>>,
}

impl<S> ReflectionLoader<S>
where
    S: ReflectionSource,
{
    /// Creates a loader feeding `registry`.
    pub fn new(source: S, registry: Arc<TypeRegistry>) -> Self {
        Self { source, registry, seen: Mutex::new(HashSet::new()) }
    }

    /// The registry this loader populates.
    pub const fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    fn seen(&self) -> MutexGuard<'_, HashSet<String>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `symbol` has been loaded by this loader.
    pub fn is_loaded(&self, symbol: &str) -> bool {
        self.seen().contains(normalize_name(symbol))
    }

    /// Loads the file declaring `symbol`, along with whatever dependencies the remote sends.
    ///
    /// References to other types are not chased.
    pub async fn load(&self, symbol: &str) -> Result<(), ReflectionError> {
        let symbol = normalize_name(symbol);
        if self.is_loaded(symbol) {
            return Ok(());
        }

        match self.fetch_files(ServerReflectionRequest::file_containing_symbol(symbol)).await {
            Ok(declared) => {
                self.seen().insert(symbol.to_string());
                Metrics::record_load(true, declared);
                debug!(target: "grpc::reflection", symbol, declared, "Loaded symbol");
                Ok(())
            }
            Err(err) => {
                Metrics::record_load(false, 0);
                warn!(target: "grpc::reflection", symbol, %err, "Failed to load symbol");
                Err(err)
            }
        }
    }

    /// Loads a descriptor file by name. Returns the number of newly declared types.
    pub async fn load_file(&self, filename: &str) -> Result<usize, ReflectionError> {
        if self.registry.has_file(filename) {
            return Ok(0);
        }
        self.fetch_files(ServerReflectionRequest::file_by_filename(filename)).await
    }

    /// Names of every service the remote exposes.
    pub async fn list_services(&self) -> Result<Vec<String>, ReflectionError> {
        let response = self.source.exchange(ServerReflectionRequest::list_services()).await?;
        match response.message_response {
            Some(MessageResponse::ListServicesResponse(list)) => {
                Ok(list.service.into_iter().map(|service| service.name).collect())
            }
            other => Err(unexpected(other)),
        }
    }

    async fn fetch_files(&self, request: ServerReflectionRequest) -> Result<usize, ReflectionError> {
        let files = match self.source.exchange(request).await?.message_response {
            Some(MessageResponse::FileDescriptorResponse(files)) => files,
            other => return Err(unexpected(other)),
        };

        let files = files
            .file_descriptor_proto
            .iter()
            .map(|blob| FileDescriptorProto::decode(blob.as_slice()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| ReflectionError::InvalidDescriptor(err.to_string()))?;

        Ok(files.iter().map(|file| self.registry.declare_file(file)).sum())
    }
}

fn unexpected(response: Option<MessageResponse>) -> ReflectionError {
    match response {
        Some(MessageResponse::ErrorResponse(err)) => {
            ReflectionError::Remote { code: err.error_code, message: err.error_message }
        }
        Some(MessageResponse::FileDescriptorResponse(_)) => {
            ReflectionError::UnexpectedResponse("file_descriptor_response")
        }
        Some(MessageResponse::ListServicesResponse(_)) => {
            ReflectionError::UnexpectedResponse("list_services_response")
        }
        None => ReflectionError::NoResponse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{RegistryError, TransportError},
        reflection::{
            ListServiceResponse, MessageRequest, ServerReflectionResponse, ServiceResponse,
        },
        test_utils,
    };
    use async_trait::async_trait;
    use mockall::mock;

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

    fn symbol_of(request: &ServerReflectionRequest) -> Option<&str> {
        match &request.message_request {
            Some(MessageRequest::FileContainingSymbol(symbol)) => Some(symbol),
            _ => None,
        }
    }

    #[tokio::test]
    async fn symbols_resolve_only_after_load() {
        let mut source = MockSource::new();
        source
            .expect_exchange()
            .withf(|request| symbol_of(request) == Some("ibc.applications.transfer.v1.Query"))
            .times(1)
            .returning(|_| Ok(test_utils::descriptor_response(&[test_utils::transfer_query_file()])));

        let loader = ReflectionLoader::new(source, Arc::new(TypeRegistry::new()));
        let registry = loader.registry().clone();
        assert!(matches!(
            registry.lookup("ibc.applications.transfer.v1.Query"),
            Err(RegistryError::NotFound(_))
        ));

        loader.load(".ibc.applications.transfer.v1.Query").await.unwrap();
        let first = registry.lookup("ibc.applications.transfer.v1.Query").unwrap();

        // Seen already, the mock would panic on a second exchange.
        loader.load("ibc.applications.transfer.v1.Query").await.unwrap();
        assert_eq!(registry.lookup("ibc.applications.transfer.v1.Query").unwrap(), first);
        assert!(loader.is_loaded("ibc.applications.transfer.v1.Query"));

        // Referenced types are not chased.
        assert!(!registry.contains("ibc.applications.transfer.v1.DenomTrace"));
    }

    #[tokio::test]
    async fn remote_errors_surface_and_are_not_remembered() {
        let mut source = MockSource::new();
        source
            .expect_exchange()
            .times(2)
            .returning(|_| Ok(test_utils::error_response(5, "symbol not found: foo.Bar")));

        let loader = ReflectionLoader::new(source, Arc::new(TypeRegistry::new()));
        for _ in 0..2 {
            assert_eq!(
                loader.load("foo.Bar").await,
                Err(ReflectionError::Remote {
                    code: 5,
                    message: "symbol not found: foo.Bar".to_string()
                })
            );
        }
        assert!(!loader.is_loaded("foo.Bar"));
    }

    #[tokio::test]
    async fn transport_failures_propagate() {
        let mut source = MockSource::new();
        source
            .expect_exchange()
            .returning(|_| Err(TransportError::new(TransportError::UNAVAILABLE, "refused").into()));

        let loader = ReflectionLoader::new(source, Arc::new(TypeRegistry::new()));
        assert_eq!(
            loader.load("foo.Bar").await,
            Err(ReflectionError::Transport(TransportError::new(14, "refused")))
        );
    }

    #[tokio::test]
    async fn garbage_descriptors_are_rejected() {
        let mut source = MockSource::new();
        source.expect_exchange().returning(|_| {
            let mut response = test_utils::descriptor_response(&[]);
            if let Some(MessageResponse::FileDescriptorResponse(files)) =
                &mut response.message_response
            {
                files.file_descriptor_proto.push(vec![0xff, 0xff, 0xff]);
            }
            Ok(response)
        });

        let loader = ReflectionLoader::new(source, Arc::new(TypeRegistry::new()));
        assert!(matches!(loader.load("foo.Bar").await, Err(ReflectionError::InvalidDescriptor(_))));
    }

    #[tokio::test]
    async fn files_load_by_name_once() {
        let mut source = MockSource::new();
        source
            .expect_exchange()
            .withf(|request| {
                request.message_request ==
                    Some(MessageRequest::FileByFilename(
                        "ibc/applications/transfer/v1/transfer.proto".to_string(),
                    ))
            })
            .times(1)
            .returning(|_| Ok(test_utils::descriptor_response(&[test_utils::transfer_types_file()])));

        let loader = ReflectionLoader::new(source, Arc::new(TypeRegistry::new()));
        let file = "ibc/applications/transfer/v1/transfer.proto";
        assert_eq!(loader.load_file(file).await, Ok(1));
        assert_eq!(loader.load_file(file).await, Ok(0));
    }

    #[tokio::test]
    async fn lists_services() {
        let mut source = MockSource::new();
        source.expect_exchange().returning(|_| {
            Ok(ServerReflectionResponse {
                valid_host: String::new(),
                original_request: None,
                message_response: Some(MessageResponse::ListServicesResponse(
                    ListServiceResponse {
                        service: vec![
                            ServiceResponse { name: "cosmos.bank.v1beta1.Query".to_string() },
                            ServiceResponse { name: "cosmos.tx.v1beta1.Service".to_string() },
                        ],
                    },
                )),
            })
        });

        let loader = ReflectionLoader::new(source, Arc::new(TypeRegistry::new()));
        assert_eq!(
            loader.list_services().await.unwrap(),
            vec!["cosmos.bank.v1beta1.Query", "cosmos.tx.v1beta1.Service"]
        );
    }
}
