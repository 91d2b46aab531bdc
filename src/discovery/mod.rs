//! Discovery — finding new vault tokens and the pools to price them with
//!
//! Two halves: pool lookup (factory scans per venue family against a
//! quote-candidate set) and token discovery (Transfer-log scans that feed
//! new holdings through pool lookup and into the registry document).

pub mod quotes;
pub mod service;
pub mod tokens;
pub mod v2;
pub mod v3;

pub use quotes::{load_quote_candidates, QuoteCandidate};
pub use service::{find_pools, PoolMatch};
pub use tokens::{discover_new_tokens, DiscoveredToken};
