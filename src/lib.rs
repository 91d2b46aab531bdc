//! Vault monitor — AMM-priced threshold selling for an on-chain token vault
//!
//! The crate watches a vault's token holdings, prices each one against its
//! configured AMM pools (constant-product reserves or concentrated-liquidity
//! sqrt prices, optionally time-weighted), and applies a baseline/threshold/
//! cooldown strategy that emits ready-to-sign swap instructions. Discovery
//! keeps the registry current by scanning vault transfer logs and factory
//! contracts for new tokens and their pools.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

pub mod config;
pub mod connection;
pub mod contracts;
pub mod discovery;
pub mod error;
pub mod inventory;
pub mod price;
pub mod service;
pub mod strategy;
pub mod swap;
pub mod types;

// Re-export commonly used types
pub use config::{load_config, MonitorConfig, PoolConfig, StrategyConfig, TokenConfig};
pub use error::{MonitorError, Result};
pub use service::{EvaluationOutcome, MonitorService};
pub use swap::{encode_vault_call, SwapPlanner};
pub use types::{DecisionReason, PoolKind, PriceQuote, StrategyDecision, SwapExecution};
