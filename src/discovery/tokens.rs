//! Token discovery — finding new vault holdings from transfer logs
//!
//! Scans ERC-20 Transfer logs addressed to the vault over a block range,
//! filters out tokens the registry already tracks, looks up pools for the
//! rest, and rewrites the registry document with symbolic entries. The raw
//! (placeholder-preserving) document is mutated, never the resolved form,
//! so existing `$NAME` references survive the rewrite.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use super::service::{derive_token_env, find_pools, PoolMatch};
use crate::config::{load_raw_document, placeholder_env_name, write_document_atomic};
use crate::contracts::IERC20;
use crate::error::Result;
use alloy::primitives::{keccak256, Address, B256};
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::Filter;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct DiscoveredToken {
    pub address: Address,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub pool_count: usize,
}

/// Topic0 of the canonical ERC-20 Transfer event.
pub fn transfer_topic() -> B256 {
    keccak256(b"Transfer(address,address,uint256)")
}

/// Token addresses the registry already tracks, with placeholders
/// resolved against the environment. Unresolvable placeholders are
/// skipped rather than failing the scan.
pub(crate) struct TrackedIdentities {
    addresses: HashSet<Address>,
}

impl TrackedIdentities {
    pub(crate) fn from_document(document: &Value) -> Self {
        let mut addresses = HashSet::new();
        if let Some(tokens) = document.get("tokens").and_then(Value::as_array) {
            for token in tokens {
                let Some(raw) = token.get("address").and_then(Value::as_str) else {
                    continue;
                };
                match resolve_address(raw) {
                    Some(address) => {
                        addresses.insert(address);
                    }
                    None => debug!("could not resolve tracked token address '{raw}'"),
                }
            }
        }
        Self { addresses }
    }

    pub(crate) fn contains(&self, address: Address) -> bool {
        self.addresses.contains(&address)
    }
}

fn resolve_address(raw: &str) -> Option<Address> {
    let literal = match placeholder_env_name(raw) {
        Some(name) => std::env::var(name).ok()?,
        None => raw.to_string(),
    };
    literal.parse().ok()
}

/// Scan `[from_block, to_block]` for inbound vault transfers and register
/// every new token, together with whatever pools lookup found for it (a
/// pool-less entry is left for hand curation). Returns the tokens added;
/// the registry file is rewritten only when that list is non-empty.
pub async fn discover_new_tokens(
    provider: &DynProvider,
    config_path: impl AsRef<Path>,
    vault: Address,
    from_block: u64,
    to_block: u64,
) -> Result<Vec<DiscoveredToken>> {
    let config_path = config_path.as_ref();
    let mut document = load_raw_document(config_path)?;
    let mut tracked = TrackedIdentities::from_document(&document);

    let filter = Filter::new()
        .from_block(from_block)
        .to_block(to_block)
        .event_signature(transfer_topic())
        .topic2(vault.into_word());
    let logs = provider.get_logs(&filter).await?;

    let mut candidates = Vec::new();
    let mut seen = HashSet::new();
    for log in &logs {
        let emitter = log.address();
        if seen.insert(emitter) && !tracked.contains(emitter) && emitter != vault {
            candidates.push(emitter);
        }
    }
    debug!(
        "{} transfer log(s) in [{from_block}, {to_block}], {} new candidate token(s)",
        logs.len(),
        candidates.len()
    );

    let default_threshold = document
        .pointer("/strategy/defaultThresholdBps")
        .and_then(Value::as_i64)
        .unwrap_or(1_000);

    let mut discovered = Vec::new();
    for token in candidates {
        // Symbol and decimals are best-effort: a token is registered even
        // when its metadata calls revert, so it can be curated by hand.
        let contract = IERC20::new(token, provider.clone());
        let decimals = match contract.decimals().call().await {
            Ok(d) => Some(d),
            Err(e) => {
                debug!("decimals() failed for {token}: {e}");
                None
            }
        };
        let symbol = match contract.symbol().call().await {
            Ok(s) => Some(s),
            Err(e) => {
                debug!("symbol() failed for {token}: {e}");
                None
            }
        };
        let label = symbol.clone().unwrap_or_else(|| "UNKNOWN".to_string());

        let token_env = derive_token_env(token);
        ensure_env(&token_env, &token.to_string());

        let matches = match find_pools(provider, token, Some(&token_env)).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!("pool lookup failed for {token} ({label}): {e}");
                Vec::new()
            }
        };
        for m in &matches {
            ensure_env(&m.pool_env, &m.pool_address.to_string());
        }

        let token_placeholder = format!("${token_env}");
        let registered = register_token(
            &mut document,
            &token_placeholder,
            symbol.as_deref(),
            decimals,
            default_threshold,
            &matches,
        );
        if registered {
            tracked.addresses.insert(token);
            info!(
                "discovered token {label} ({token}) with {} pool(s)",
                matches.len()
            );
            discovered.push(DiscoveredToken {
                address: token,
                symbol,
                decimals,
                pool_count: matches.len(),
            });
        }
    }

    if !discovered.is_empty() {
        write_document_atomic(config_path, &document)?;
    }
    Ok(discovered)
}

fn ensure_env(name: &str, value: &str) {
    if std::env::var(name).is_err() {
        std::env::set_var(name, value);
    }
}

/// Append a symbolic token entry to the document's `tokens` array.
/// Returns false (and leaves the document untouched) if an entry with
/// the same address string already exists, making registration idempotent.
pub(crate) fn register_token(
    document: &mut Value,
    token_placeholder: &str,
    symbol: Option<&str>,
    decimals: Option<u8>,
    threshold_bps: i64,
    matches: &[PoolMatch],
) -> bool {
    let tokens = document
        .as_object_mut()
        .map(|root| root.entry("tokens").or_insert_with(|| json!([])));
    let Some(Value::Array(tokens)) = tokens else {
        return false;
    };

    let already = tokens.iter().any(|t| {
        t.get("address").and_then(Value::as_str) == Some(token_placeholder)
    });
    if already {
        return false;
    }

    let pools: Vec<Value> = matches
        .iter()
        .map(|m| build_pool_entry(m, token_placeholder))
        .collect();
    let mut entry = json!({
        "address": token_placeholder,
        "thresholdBps": threshold_bps,
        "pools": pools,
    });
    if let Some(symbol) = symbol {
        entry["symbol"] = json!(symbol);
    }
    if let Some(decimals) = decimals {
        entry["decimals"] = json!(decimals);
    }
    tokens.push(entry);
    true
}

fn build_pool_entry(m: &PoolMatch, token_placeholder: &str) -> Value {
    let mut entry = json!({
        "type": m.kind.registry_tag(),
        "address": m.pool_placeholder.clone(),
        "baseToken": token_placeholder,
        "quoteToken": m.quote_placeholder.clone(),
        "metadata": m.metadata.clone(),
    });
    if let Some(fee) = m.fee {
        entry["fee"] = json!(fee);
    }
    entry
}
