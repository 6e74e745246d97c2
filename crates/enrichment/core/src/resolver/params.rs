//! Chain module parameters.

use super::{Resolver, argument};
use crate::ResolveError;
use async_trait::async_trait;
use chainlens_enrichment_storage::ResolvedRecord;
use chainlens_grpc_dynamic::Invoker;
use serde_json::json;
use std::sync::Arc;

pub(crate) const PREFIX: &str = "params";

const KIND: &str = "params";

/// Resolves `params/<module>` through `cosmos.<module>.v1beta1.Query/Params`.
#[derive(Debug)]
pub struct ParamsResolver<I> {
    invoker: Arc<I>,
}

impl<I> ParamsResolver<I> {
    /// Creates a resolver calling through `invoker`.
    pub const fn new(invoker: Arc<I>) -> Self {
        Self { invoker }
    }
}

#[async_trait]
impl<I> Resolver for ParamsResolver<I>
where
    I: Invoker + 'static,
{
    async fn resolve(&self, key: &str) -> Result<ResolvedRecord, ResolveError> {
        let module = argument(key, PREFIX)?;
        if !module.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_') {
            return Err(ResolveError::InvalidKey {
                key: key.to_string(),
                reason: "module names are lowercase alphanumeric".to_string(),
            });
        }

        let service = format!("cosmos.{module}.v1beta1.Query");
        let mut response = self.invoker.call(&service, "Params", &json!({})).await?;
        let params = match response.get_mut("params") {
            Some(params) => params.take(),
            None => response,
        };
        Ok(ResolvedRecord::new(key, KIND, params, None))
    }
}
