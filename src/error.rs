//! Error taxonomy for the monitoring pipeline
//!
//! The per-cycle loop needs to tell configuration faults apart from
//! connectivity faults: a misconfigured pool is skipped and the cycle
//! continues, while an RPC failure aborts the whole cycle (the scheduler
//! retries at the next interval). Validation conditions (zero price,
//! zero sell amount) are never errors — they surface as HOLD decisions.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use thiserror::Error;

/// Errors produced by the monitoring core.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Unsupported venue kind, missing router/path/fee metadata, base token
    /// matching neither pool constituent, unresolved env placeholder.
    /// Fatal to the single pool (or config load) being processed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Contract view-call failure. Aborts the cycle.
    #[error("contract call failed: {0}")]
    Contract(#[from] alloy::contract::Error),

    /// Raw RPC transport failure (get_logs, block number). Aborts the cycle.
    #[error("rpc request failed: {0}")]
    Rpc(#[from] alloy::transports::TransportError),

    /// State/registry file I/O.
    #[error("persistence i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// State/registry document (de)serialization.
    #[error("persistence encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MonitorError {
    /// Shorthand for configuration errors.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True if this error only invalidates the pool being processed,
    /// not the whole cycle.
    pub fn is_pool_local(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
