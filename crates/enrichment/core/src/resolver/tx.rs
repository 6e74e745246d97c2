//! Transaction call data.

use super::{Resolver, argument, hash_argument, string_at};
use crate::ResolveError;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use chainlens_enrichment_storage::ResolvedRecord;
use chainlens_grpc_dynamic::Invoker;
use serde_json::{Map, Value, json};
use std::sync::Arc;

pub(crate) const PREFIX: &str = "tx";

const KIND: &str = "tx";
const TX_SERVICE: &str = "cosmos.tx.v1beta1.Service";

/// Resolves `tx/<HASH>` into the transaction's decoded messages.
///
/// Body messages arrive as `Any` values; each is decoded by its type URL, so message types the
/// node only learned about after an upgrade decode without a rebuild.
#[derive(Debug)]
pub struct TxResolver<I> {
    invoker: Arc<I>,
}

impl<I> TxResolver<I> {
    /// Creates a resolver calling through `invoker`.
    pub const fn new(invoker: Arc<I>) -> Self {
        Self { invoker }
    }
}

impl<I: Invoker> TxResolver<I> {
    async fn decode_any(&self, any: &Value) -> Result<Value, ResolveError> {
        let type_url = string_at(any, "/type_url").ok_or(ResolveError::MissingField("type_url"))?;
        let value = any.get("value").and_then(Value::as_str).unwrap_or_default();
        let bytes = STANDARD
            .decode(value)
            .map_err(|err| ResolveError::Malformed(format!("{type_url}: {err}")))?;

        // `/cosmos.bank.v1beta1.MsgSend` or `type.googleapis.com/cosmos.bank.v1beta1.MsgSend`
        let type_name = type_url.rsplit('/').next().unwrap_or(type_url);
        let decoded = self.invoker.decode_message(type_name, &bytes).await?;

        let mut message = Map::new();
        message.insert("@type".to_string(), Value::from(type_url));
        if let Value::Object(fields) = decoded {
            message.extend(fields);
        }
        Ok(Value::Object(message))
    }
}

#[async_trait]
impl<I> Resolver for TxResolver<I>
where
    I: Invoker + 'static,
{
    async fn resolve(&self, key: &str) -> Result<ResolvedRecord, ResolveError> {
        let hash = hash_argument(key, argument(key, PREFIX)?)?;

        let response = self.invoker.call(TX_SERVICE, "GetTx", &json!({ "hash": hash })).await?;
        let body = response.pointer("/tx/body").ok_or(ResolveError::MissingField("tx.body"))?;

        let mut messages = Vec::new();
        for any in body.get("messages").and_then(Value::as_array).into_iter().flatten() {
            messages.push(self.decode_any(any).await?);
        }

        let tx_response = response.get("tx_response").cloned().unwrap_or(Value::Null);
        let data = json!({
            "hash": hash,
            "height": tx_response.get("height"),
            "code": tx_response.get("code"),
            "gas_wanted": tx_response.get("gas_wanted"),
            "gas_used": tx_response.get("gas_used"),
            "timestamp": tx_response.get("timestamp"),
            "memo": body.get("memo"),
            "messages": messages,
        });
        Ok(ResolvedRecord::new(key, KIND, data, None))
    }
}
