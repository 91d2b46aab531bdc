//! Monitor service — the evaluation cycle
//!
//! One cycle: optionally discover new tokens, snapshot vault inventory,
//! price every configured (token, pool) pair, run the strategy, and build
//! swap instructions for SELL decisions. Pool-local failures (bad venue
//! tag, missing router metadata, mispaired base token) are logged and
//! skipped so one broken registry entry cannot stall the rest; transport
//! failures abort the cycle and surface to the loop.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use crate::config::{load_config, MonitorConfig};
use crate::connection::ConnectionManager;
use crate::contracts::IERC20;
use crate::discovery::discover_new_tokens;
use crate::error::Result;
use crate::inventory::InventoryFetcher;
use crate::price::PriceSource;
use crate::strategy::{StateStore, StrategyEngine};
use crate::swap::SwapPlanner;
use crate::types::{PriceQuote, StrategyDecision, SwapExecution};
use alloy::primitives::Address;
use alloy::providers::Provider;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// Everything one (token, pool) evaluation produced.
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub token_address: Address,
    pub pool_address: Address,
    pub quote: PriceQuote,
    pub decision: StrategyDecision,
    /// Present only for SELL decisions whose pool metadata is complete
    pub execution: Option<SwapExecution>,
}

pub struct MonitorService {
    config: MonitorConfig,
    connections: ConnectionManager,
    strategy: StrategyEngine,
    auto_discover: bool,
    discovery_lookback: u64,
    last_discovery_block: Option<u64>,
    quote_decimals_cache: HashMap<Address, u8>,
}

impl MonitorService {
    pub fn new(config: MonitorConfig, auto_discover: bool, discovery_lookback: u64) -> Self {
        let connections = ConnectionManager::new(config.rpc.clone());
        let strategy = StrategyEngine::new(
            config.strategy.clone(),
            StateStore::load(config.state_file.clone()),
        );
        Self {
            config,
            connections,
            strategy,
            auto_discover,
            discovery_lookback,
            last_discovery_block: None,
            quote_decimals_cache: HashMap::new(),
        }
    }

    pub fn from_file(
        path: impl AsRef<Path>,
        auto_discover: bool,
        discovery_lookback: u64,
    ) -> Result<Self> {
        Ok(Self::new(load_config(path)?, auto_discover, discovery_lookback))
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Run one full evaluation cycle.
    pub async fn run_once(&mut self) -> Result<Vec<EvaluationOutcome>> {
        self.maybe_discover().await?;

        let provider = self.connections.provider().await?.clone();
        let mut fetcher = InventoryFetcher::new(provider.clone(), self.config.vault_address);
        let tokens = self.config.tokens.clone();
        let inventories = fetcher.fetch(&tokens).await?;
        let planner = SwapPlanner::new(self.config.vault_address, self.config.executor_address);
        let now = unix_timestamp();

        let mut outcomes = Vec::new();
        for token in &tokens {
            let Some(inventory) = inventories.get(&token.address) else {
                continue;
            };
            for pool in &token.pools {
                let source = match PriceSource::build(pool) {
                    Ok(source) => source,
                    Err(e) => {
                        warn!("skipping pool {} for {}: {e}", pool.address, inventory.symbol);
                        continue;
                    }
                };

                let quote_decimals = self.quote_decimals(&provider, pool.quote_token).await?;
                let quote = match source
                    .fetch(&provider, inventory.decimals, quote_decimals)
                    .await
                {
                    Ok(quote) => quote,
                    Err(e) if e.is_pool_local() => {
                        warn!("skipping pool {} for {}: {e}", pool.address, inventory.symbol);
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                let decision = self.strategy.evaluate(inventory, pool, &quote, now);
                let execution = if decision.should_sell {
                    match planner.build_execution(&decision, quote_decimals, now) {
                        Ok(execution) => Some(execution),
                        Err(e) if e.is_pool_local() => {
                            warn!(
                                "sell triggered but swap construction failed for pool {}: {e}",
                                pool.address
                            );
                            None
                        }
                        Err(e) => return Err(e),
                    }
                } else {
                    None
                };

                outcomes.push(EvaluationOutcome {
                    token_address: token.address,
                    pool_address: pool.address,
                    quote,
                    decision,
                    execution,
                });
            }
        }

        Ok(outcomes)
    }

    /// Evaluate forever at a fixed cadence. A failed cycle is logged and
    /// the next one runs on schedule.
    pub async fn run_forever(&mut self, interval_secs: u64) -> Result<()> {
        let interval = Duration::from_secs(interval_secs.max(1));
        info!("monitor loop starting (interval {}s)", interval.as_secs());
        loop {
            let started = Instant::now();
            match self.run_once().await {
                Ok(outcomes) => log_cycle(&outcomes),
                Err(e) => error!("evaluation cycle failed: {e}"),
            }
            let elapsed = started.elapsed();
            if let Some(remaining) = interval.checked_sub(elapsed) {
                tokio::time::sleep(remaining).await;
            }
        }
    }

    /// Scan for new vault tokens since the last scanned block, reloading
    /// the registry (and persisted strategy state) if anything was added.
    async fn maybe_discover(&mut self) -> Result<()> {
        if !self.auto_discover {
            return Ok(());
        }
        let Some(config_path) = self.config.source_path.clone() else {
            debug!("no registry path on record, skipping discovery");
            return Ok(());
        };

        let provider = self.connections.provider().await?.clone();
        let current_block = provider.get_block_number().await?;
        let from_block = match self.last_discovery_block {
            Some(last) => last + 1,
            None => current_block.saturating_sub(self.discovery_lookback),
        };
        if from_block > current_block {
            return Ok(());
        }

        let discovered = discover_new_tokens(
            &provider,
            &config_path,
            self.config.vault_address,
            from_block,
            current_block,
        )
        .await?;
        self.last_discovery_block = Some(current_block);

        if !discovered.is_empty() {
            info!("registry gained {} token(s), reloading", discovered.len());
            self.config = load_config(&config_path)?;
            self.strategy = StrategyEngine::new(
                self.config.strategy.clone(),
                StateStore::load(self.config.state_file.clone()),
            );
        }
        Ok(())
    }

    async fn quote_decimals(
        &mut self,
        provider: &alloy::providers::DynProvider,
        quote_token: Address,
    ) -> Result<u8> {
        if let Some(&cached) = self.quote_decimals_cache.get(&quote_token) {
            return Ok(cached);
        }
        let decimals = IERC20::new(quote_token, provider.clone())
            .decimals()
            .call()
            .await?;
        self.quote_decimals_cache.insert(quote_token, decimals);
        Ok(decimals)
    }
}

fn log_cycle(outcomes: &[EvaluationOutcome]) {
    for outcome in outcomes {
        let d = &outcome.decision;
        if d.should_sell {
            info!(
                "SELL {} via pool {}: price {} ({}{} bps), amount {}, min out {}",
                d.inventory.symbol,
                outcome.pool_address,
                d.price,
                if d.change_bps >= 0 { "+" } else { "" },
                d.change_bps,
                d.sell_amount,
                outcome
                    .execution
                    .as_ref()
                    .map(|e| e.min_amount_out.to_string())
                    .unwrap_or_else(|| "n/a".to_string()),
            );
        } else {
            info!(
                "HOLD {} via pool {}: price {} ({}{} bps), {}",
                d.inventory.symbol,
                outcome.pool_address,
                d.price,
                if d.change_bps >= 0 { "+" } else { "" },
                d.change_bps,
                d.reason,
            );
        }
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
