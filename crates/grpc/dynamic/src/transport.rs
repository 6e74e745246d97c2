//! Network transport for dynamic calls and reflection exchanges.

use crate::{
    config::ClientConfig,
    error::{ReflectionError, TransportError},
    reflection::{ReflectionSource, ServerReflectionRequest, ServerReflectionResponse},
};
use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes};
use std::time::Duration;
use tonic::{
    Request, Status,
    client::Grpc,
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder, ProstCodec},
    codegen::http::uri::PathAndQuery,
    transport::{Channel, ClientTlsConfig, Endpoint},
};
use tracing::trace;

/// Performs unary calls with opaque request and response bodies.
#[async_trait]
pub trait UnaryTransport: Send + Sync {
    /// Sends `body` to `path` (`/{service}/{method}`) and returns the response body.
    async fn unary(&self, path: &str, body: Bytes, timeout: Duration) -> Result<Bytes, TransportError>;
}

/// gRPC transport over a lazily connected [`tonic`] channel.
///
/// Cheap to clone; clones share the underlying connection.
#[derive(Debug, Clone)]
pub struct GrpcTransport {
    channel: Channel,
    reflection_path: PathAndQuery,
    timeout: Duration,
}

impl GrpcTransport {
    /// Builds a transport for `config.endpoint`. Nothing is dialed until the first call.
    ///
    /// `https://` endpoints use TLS with the webpki root store.
    pub fn connect_lazy(config: &ClientConfig) -> Result<Self, TransportError> {
        let invalid = |err: &dyn std::fmt::Display| {
            TransportError::new(
                TransportError::INVALID_ARGUMENT,
                format!("invalid endpoint {}: {err}", config.endpoint),
            )
        };

        let mut endpoint = Endpoint::from_shared(config.endpoint.clone()).map_err(|e| invalid(&e))?;
        if config.endpoint.starts_with("https://") {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().with_webpki_roots())
                .map_err(|e| invalid(&e))?;
        }

        Ok(Self {
            channel: endpoint.connect_lazy(),
            reflection_path: PathAndQuery::from_static(config.reflection_version.path()),
            timeout: config.call_timeout,
        })
    }

    async fn ready(&self) -> Result<Grpc<Channel>, TransportError> {
        let mut grpc = Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|err| TransportError::new(TransportError::UNAVAILABLE, err.to_string()))?;
        Ok(grpc)
    }

    async fn exchange_once(
        &self,
        request: ServerReflectionRequest,
    ) -> Result<ServerReflectionResponse, ReflectionError> {
        let mut outbound = Request::new(tokio_stream::once(request));
        outbound.set_timeout(self.timeout);

        let mut inbound = self
            .ready()
            .await?
            .streaming(
                outbound,
                self.reflection_path.clone(),
                ProstCodec::<ServerReflectionRequest, ServerReflectionResponse>::default(),
            )
            .await
            .map_err(TransportError::from)?
            .into_inner();

        // The first response is terminal. Dropping the stream closes the exchange.
        inbound.message().await.map_err(TransportError::from)?.ok_or(ReflectionError::NoResponse)
    }
}

#[async_trait]
impl UnaryTransport for GrpcTransport {
    async fn unary(&self, path: &str, body: Bytes, timeout: Duration) -> Result<Bytes, TransportError> {
        let path = path.parse::<PathAndQuery>().map_err(|err| {
            TransportError::new(TransportError::INVALID_ARGUMENT, format!("invalid path {path}: {err}"))
        })?;

        let mut request = Request::new(body);
        request.set_timeout(timeout);

        trace!(target: "grpc::transport", %path, "Sending unary call");
        let response = self.ready().await?.unary(request, path, RawCodec).await?;
        Ok(response.into_inner())
    }
}

#[async_trait]
impl ReflectionSource for GrpcTransport {
    async fn exchange(
        &self,
        request: ServerReflectionRequest,
    ) -> Result<ServerReflectionResponse, ReflectionError> {
        tokio::time::timeout(self.timeout, self.exchange_once(request)).await.map_err(|_| {
            TransportError::new(TransportError::DEADLINE_EXCEEDED, "reflection exchange timed out")
        })?
    }
}

/// Passes message bodies through untouched.
#[derive(Debug, Clone, Copy, Default)]
struct RawCodec;

impl Codec for RawCodec {
    type Encode = Bytes;
    type Decode = Bytes;
    type Encoder = Self;
    type Decoder = Self;

    fn encoder(&mut self) -> Self::Encoder {
        Self
    }

    fn decoder(&mut self) -> Self::Decoder {
        Self
    }
}

impl Encoder for RawCodec {
    type Item = Bytes;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        dst.put(item);
        Ok(())
    }
}

impl Decoder for RawCodec {
    type Item = Bytes;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        Ok(Some(src.copy_to_bytes(src.remaining())))
    }
}
