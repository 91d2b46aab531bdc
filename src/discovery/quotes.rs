//! Quote candidate set for pool discovery
//!
//! The candidate quote tokens (WETH, stables, ...) are named by the
//! `MONITOR_QUOTE_CANDIDATES` environment variable: a comma-separated list
//! or JSON array of env var names (bare or `$NAME` placeholder form), each
//! of which must resolve to a token address. Discovery writes placeholders,
//! not literal addresses, into the registry so deployments stay symbolic.

use crate::config::placeholder_env_name;
use crate::error::{MonitorError, Result};
use alloy::primitives::Address;

pub const QUOTE_CANDIDATES_VAR: &str = "MONITOR_QUOTE_CANDIDATES";

/// One candidate quote token with the symbolic identity discovery
/// writes back into the registry.
#[derive(Debug, Clone)]
pub struct QuoteCandidate {
    /// Env var holding the token address (e.g. "WETH")
    pub env_var: String,
    /// Placeholder form written into registry documents ("$WETH")
    pub placeholder: String,
    pub address: Address,
}

/// Load the candidate set from the environment. Discovery cannot run
/// without one, so an absent or empty set is a configuration error.
pub fn load_quote_candidates() -> Result<Vec<QuoteCandidate>> {
    let raw = std::env::var(QUOTE_CANDIDATES_VAR).map_err(|_| {
        MonitorError::config(format!("{QUOTE_CANDIDATES_VAR} is not set"))
    })?;
    candidates_from_list(&raw)
}

/// Resolve a raw candidate list against the environment.
pub fn candidates_from_list(raw: &str) -> Result<Vec<QuoteCandidate>> {
    let names = parse_candidate_names(raw);
    if names.is_empty() {
        return Err(MonitorError::config(format!("{QUOTE_CANDIDATES_VAR} is empty")));
    }

    let mut candidates = Vec::with_capacity(names.len());
    for name in names {
        let value = std::env::var(&name).map_err(|_| {
            MonitorError::config(format!("quote candidate env var '{name}' is not set"))
        })?;
        let address = value.parse::<Address>().map_err(|e| {
            MonitorError::config(format!("quote candidate '{name}' is not an address: {e}"))
        })?;
        candidates.push(QuoteCandidate {
            placeholder: format!("${name}"),
            env_var: name,
            address,
        });
    }
    Ok(candidates)
}

/// Accepts `WETH,USDC`, `$WETH, $USDC` or `["WETH","USDC"]`.
pub(crate) fn parse_candidate_names(raw: &str) -> Vec<String> {
    let entries: Vec<String> = match serde_json::from_str::<Vec<String>>(raw) {
        Ok(list) => list,
        Err(_) => raw.split(',').map(str::to_string).collect(),
    };
    entries
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .map(|e| placeholder_env_name(e).unwrap_or(e).to_string())
        .collect()
}
