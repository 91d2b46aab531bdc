//! RPC connection management
//!
//! The chain-read handle is constructed at most once per process lifetime,
//! guarded by a one-shot initialization cell. All reads go through the HTTP
//! transport; the registry's optional websocket endpoint is carried in the
//! config but unused by the read path.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use crate::config::RpcConfig;
use crate::error::{MonitorError, Result};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use tokio::sync::OnceCell;
use tracing::info;

/// Lazily connects and then hands out the shared provider.
pub struct ConnectionManager {
    rpc: RpcConfig,
    provider: OnceCell<DynProvider>,
}

impl ConnectionManager {
    pub fn new(rpc: RpcConfig) -> Self {
        Self {
            rpc,
            provider: OnceCell::new(),
        }
    }

    /// Get the process-wide provider, connecting on first use.
    pub async fn provider(&self) -> Result<&DynProvider> {
        self.provider
            .get_or_try_init(|| async {
                let url = self.rpc.http.parse().map_err(|e| {
                    MonitorError::config(format!("invalid rpc http url '{}': {e}", self.rpc.http))
                })?;
                info!("Connecting HTTP provider: {}", redact(&self.rpc.http));
                Ok(ProviderBuilder::new().connect_http(url).erased())
            })
            .await
    }
}

/// RPC URLs routinely embed API keys — log only the endpoint prefix.
/// The cutoff is backed off to a char boundary so multi-byte URLs slice
/// cleanly.
fn redact(url: &str) -> String {
    let mut cutoff = 32.min(url.len());
    while !url.is_char_boundary(cutoff) {
        cutoff -= 1;
    }
    if url.len() > cutoff {
        format!("{}...", &url[..cutoff])
    } else {
        url.to_string()
    }
}
