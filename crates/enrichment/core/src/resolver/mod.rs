//! Domain resolvers turning backlog keys into [`ResolvedRecord`]s.
//!
//! Keys are routed by prefix:
//! - `ibc/<HASH>`: [`DenomTraceResolver`]
//! - `tx/<HASH>`: [`TxResolver`]
//! - `params/<module>`: [`ParamsResolver`]

use crate::ResolveError;
use async_trait::async_trait;
use chainlens_enrichment_storage::ResolvedRecord;
use chainlens_grpc_dynamic::Invoker;
use serde_json::Value;
use std::sync::Arc;

mod denom;
pub use denom::DenomTraceResolver;

mod params;
pub use params::ParamsResolver;

mod tx;
pub use tx::TxResolver;

/// Resolves one backlog key.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Fetches and assembles the record for `key`.
    async fn resolve(&self, key: &str) -> Result<ResolvedRecord, ResolveError>;
}

/// Dispatches keys to the resolver owning their prefix.
#[derive(Debug)]
pub struct KeyRouter<I> {
    denom: DenomTraceResolver<I>,
    tx: TxResolver<I>,
    params: ParamsResolver<I>,
}

impl<I> KeyRouter<I> {
    /// Creates a router whose resolvers share `invoker`.
    pub fn new(invoker: Arc<I>) -> Self {
        Self {
            denom: DenomTraceResolver::new(invoker.clone()),
            tx: TxResolver::new(invoker.clone()),
            params: ParamsResolver::new(invoker),
        }
    }
}

#[async_trait]
impl<I> Resolver for KeyRouter<I>
where
    I: Invoker + 'static,
{
    async fn resolve(&self, key: &str) -> Result<ResolvedRecord, ResolveError> {
        match key.split_once('/') {
            Some((denom::PREFIX, _)) => self.denom.resolve(key).await,
            Some((tx::PREFIX, _)) => self.tx.resolve(key).await,
            Some((params::PREFIX, _)) => self.params.resolve(key).await,
            _ => Err(ResolveError::Unsupported(key.to_string())),
        }
    }
}

/// Strips `prefix/` from `key`, rejecting keys routed to the wrong resolver.
fn argument<'a>(key: &'a str, prefix: &str) -> Result<&'a str, ResolveError> {
    key.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| ResolveError::Unsupported(key.to_string()))
}

/// Validates an alphanumeric hash and returns it upper-cased.
///
/// Length is not checked here; resolvers verify full SHA-256 hashes themselves.
fn hash_argument(key: &str, hash: &str) -> Result<String, ResolveError> {
    if !hash.is_empty() && hash.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(hash.to_ascii_uppercase())
    } else {
        Err(ResolveError::InvalidKey {
            key: key.to_string(),
            reason: "expected an alphanumeric hash".to_string(),
        })
    }
}

/// Whether `hash` has the shape of a hex-encoded SHA-256 digest.
fn is_sha256_hex(hash: &str) -> bool {
    hash.len() == 64 && hash.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Reads a string at `pointer`, treating missing and empty values alike.
fn string_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[cfg(test)]
pub(crate) use tests::{MockInvoker, MockResolver};

#[cfg(test)]
mod tests {
    use super::*;
    use chainlens_grpc_dynamic::InvokeError;
    use mockall::mock;
    use serde_json::json;

    mock! {
        #[derive(Debug)]
        pub Resolver {}

        #[async_trait]
        impl Resolver for Resolver {
            async fn resolve(&self, key: &str) -> Result<ResolvedRecord, ResolveError>;
        }
    }

    mock! {
        #[derive(Debug)]
        pub Invoker {}

        #[async_trait]
        impl Invoker for Invoker {
            async fn call(
                &self,
                service: &str,
                method: &str,
                params: &Value,
            ) -> Result<Value, InvokeError>;

            async fn decode_message(&self, type_name: &str, bytes: &[u8]) -> Result<Value, InvokeError>;
        }
    }

    #[tokio::test]
    async fn test_unknown_prefixes_are_unsupported() {
        let router = KeyRouter::new(Arc::new(MockInvoker::new()));
        for key in ["erc20/0xabc", "ibc", "nothing"] {
            assert_eq!(
                router.resolve(key).await,
                Err(ResolveError::Unsupported(key.to_string()))
            );
        }
    }

    #[tokio::test]
    async fn test_routes_by_prefix() {
        let mut invoker = MockInvoker::new();
        invoker
            .expect_call()
            .withf(|service, method, _| {
                service == "cosmos.staking.v1beta1.Query" && method == "Params"
            })
            .times(1)
            .returning(|_, _, _| Ok(json!({ "params": { "bond_denom": "uatom" } })));

        let router = KeyRouter::new(Arc::new(invoker));
        let record = router.resolve("params/staking").await.unwrap();
        assert_eq!(record.kind, "params");
        assert_eq!(record.data, json!({ "bond_denom": "uatom" }));
    }

    #[test]
    fn test_hash_argument() {
        let hash = "27394fb092d2eccd56123c74f36e4c1f926001ceada9ca97ea622b25f41e5eb2";
        assert_eq!(hash_argument("ibc/x", hash).unwrap(), hash.to_ascii_uppercase());
        assert_eq!(hash_argument("ibc/x", "abcdef").unwrap(), "ABCDEF");
        assert_eq!(hash_argument("ibc/x", "BADHASH").unwrap(), "BADHASH");
        assert!(matches!(hash_argument("ibc/x", ""), Err(ResolveError::InvalidKey { .. })));
        assert!(matches!(
            hash_argument("ibc/x", "AB/CD"),
            Err(ResolveError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_is_sha256_hex() {
        assert!(is_sha256_hex(&"ab".repeat(32)));
        assert!(!is_sha256_hex("ABCDEF"));
        assert!(!is_sha256_hex(&"Z".repeat(64)));
    }

    #[test]
    fn test_argument() {
        assert_eq!(argument("ibc/ABC", "ibc"), Ok("ABC"));
        assert!(argument("ibc/", "ibc").is_err());
        assert!(argument("tx/ABC", "ibc").is_err());
    }
}
