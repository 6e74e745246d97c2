//! IBC denomination traces.

use super::{Resolver, argument, hash_argument, is_sha256_hex, string_at};
use crate::ResolveError;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use chainlens_enrichment_storage::ResolvedRecord;
use chainlens_grpc_dynamic::{Invoker, extract_string_field};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) const PREFIX: &str = "ibc";

const KIND: &str = "denom_trace";
const TRANSFER_QUERY: &str = "ibc.applications.transfer.v1.Query";
const CHANNEL_QUERY: &str = "ibc.core.channel.v1.Query";
const BANK_QUERY: &str = "cosmos.bank.v1beta1.Query";

/// Resolves `ibc/<HASH>` into the denom's origin path, base denom, symbol and decimals.
///
/// Provenance is the chain id of the counterparty on the first hop, read from the channel's
/// client state. When that lookup fails the record is still produced with unknown provenance.
#[derive(Debug)]
pub struct DenomTraceResolver<I> {
    invoker: Arc<I>,
}

impl<I> DenomTraceResolver<I> {
    /// Creates a resolver calling through `invoker`.
    pub const fn new(invoker: Arc<I>) -> Self {
        Self { invoker }
    }
}

impl<I: Invoker> DenomTraceResolver<I> {
    async fn provenance(&self, port_id: &str, channel_id: &str) -> Option<String> {
        let response = self
            .invoker
            .call(
                CHANNEL_QUERY,
                "ChannelClientState",
                &json!({ "port_id": port_id, "channel_id": channel_id }),
            )
            .await
            .inspect_err(|err| {
                warn!(target: "enrichment::resolver", port_id, channel_id, %err, "Client state lookup failed");
            })
            .ok()?;

        // The client state is an `Any`; only its first field, the chain id, is needed.
        let encoded = string_at(&response, "/identified_client_state/client_state/value")?;
        let client_state = STANDARD.decode(encoded).ok()?;
        extract_string_field(&client_state, 1)
    }

    async fn display_units(&self, denom: &str, base_denom: &str) -> (String, u32) {
        match self.invoker.call(BANK_QUERY, "DenomMetadata", &json!({ "denom": denom })).await {
            Ok(response) => match metadata_units(&response) {
                Some(units) => return units,
                None => debug!(target: "enrichment::resolver", denom, "Empty denom metadata"),
            },
            Err(err) => {
                debug!(target: "enrichment::resolver", denom, %err, "No denom metadata")
            }
        }
        units_by_convention(base_denom)
    }
}

#[async_trait]
impl<I> Resolver for DenomTraceResolver<I>
where
    I: Invoker + 'static,
{
    async fn resolve(&self, key: &str) -> Result<ResolvedRecord, ResolveError> {
        let hash = hash_argument(key, argument(key, PREFIX)?)?;

        let response =
            self.invoker.call(TRANSFER_QUERY, "DenomTrace", &json!({ "hash": hash })).await?;
        let base_denom = string_at(&response, "/denom_trace/base_denom")
            .ok_or(ResolveError::MissingField("denom_trace.base_denom"))?;
        let path = string_at(&response, "/denom_trace/path").unwrap_or_default();

        let full_denom =
            if path.is_empty() { base_denom.to_string() } else { format!("{path}/{base_denom}") };
        if is_sha256_hex(&hash) {
            let actual = hex::encode_upper(Sha256::digest(full_denom.as_bytes()));
            if actual != hash {
                return Err(ResolveError::HashMismatch { expected: hash, actual });
            }
        }

        let first_hop = first_hop(path);
        let provenance = match first_hop {
            Some((port_id, channel_id)) => self.provenance(port_id, channel_id).await,
            None => None,
        };

        let denom = format!("{PREFIX}/{hash}");
        let (symbol, decimals) = self.display_units(&denom, base_denom).await;

        let data = json!({
            "denom": denom,
            "path": path,
            "base_denom": base_denom,
            "symbol": symbol,
            "decimals": decimals,
            "channel_id": first_hop.map(|(_, channel)| channel),
        });
        Ok(ResolvedRecord::new(key, KIND, data, provenance))
    }
}

/// `(port, channel)` of the first hop of a trace path like `transfer/channel-0/transfer/channel-7`.
fn first_hop(path: &str) -> Option<(&str, &str)> {
    let mut segments = path.split('/');
    match (segments.next(), segments.next()) {
        (Some(port), Some(channel)) if !port.is_empty() && !channel.is_empty() => {
            Some((port, channel))
        }
        _ => None,
    }
}

/// Symbol and decimals from a bank `DenomMetadata` response.
fn metadata_units(response: &Value) -> Option<(String, u32)> {
    let metadata = response.get("metadata")?;
    let display = string_at(metadata, "/display");
    let units = metadata.get("denom_units").and_then(Value::as_array)?;
    let exponent_of = |unit: &Value| {
        unit.get("exponent").and_then(Value::as_u64).and_then(|e| u32::try_from(e).ok())
    };

    let decimals = units
        .iter()
        .find(|unit| display.is_some() && unit.get("denom").and_then(Value::as_str) == display)
        .and_then(exponent_of)
        .or_else(|| units.iter().filter_map(exponent_of).max())?;
    let symbol = string_at(metadata, "/symbol").or(display)?;
    Some((symbol.to_string(), decimals))
}

/// Symbol and decimals from the base denom's unit prefix (`u` = 6, `n` = 9, `a` = 18).
fn units_by_convention(base_denom: &str) -> (String, u32) {
    let mut chars = base_denom.chars();
    let decimals = match chars.next() {
        Some('u') => 6,
        Some('n') => 9,
        Some('a') => 18,
        _ => 0,
    };
    let rest = chars.as_str();
    if decimals == 0 || rest.is_empty() {
        (base_denom.to_uppercase(), 0)
    } else {
        (rest.to_uppercase(), decimals)
    }
}
