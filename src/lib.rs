//! baram-frontier - Polite crawl frontier
//!
//! Decides which host a crawler may fetch next and when, keeping per-host
//! FIFO queues and never releasing a host before its politeness delay.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`frontier`] - Host entries, authority registry, ready scheduler and the
//!   `Frontier` façade
//! - [`resolver`] - Host address resolution
//! - [`politeness`] - Next-fetch-time policy
//! - [`crawler`] - HTTP fetcher and consumer worker pool
//! - [`storage`] - Checkpoints for resumable crawls
//! - [`config`] - Configuration management and settings
//! - [`metrics`] - Prometheus metrics
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use baram_frontier::config::Config;
//! use baram_frontier::crawler::{HttpFetcher, WorkerPool, WorkerPoolConfig};
//! use baram_frontier::frontier::Frontier;
//! use baram_frontier::politeness::BackoffPolicy;
//! use baram_frontier::resolver::SystemResolver;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let resolver = Arc::new(SystemResolver::new(config.dns_timeout()));
//!     let frontier = Arc::new(Frontier::from_config(&config.frontier, resolver));
//!     frontier.enqueue("https://example.com/").await?;
//!
//!     let pool = WorkerPool::new(
//!         Arc::clone(&frontier),
//!         Arc::new(HttpFetcher::with_config(&config.fetch)?),
//!         Arc::new(BackoffPolicy::from(&config.politeness)),
//!         WorkerPoolConfig::default(),
//!     );
//!     let stats = pool.run().await;
//!     println!("fetched {}", stats.fetched);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod frontier;
pub mod metrics;
pub mod politeness;
pub mod resolver;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crawler::{Fetcher, HttpFetcher, WorkerPool, WorkerStats};
    pub use crate::error::{BaramErrorTrait, Error, ErrorCategory, Result};
    pub use crate::frontier::{
        Authority, FetchOutcome, FetchTicket, Frontier, FrontierError, FrontierResult,
        HostSnapshot,
    };
    pub use crate::politeness::{BackoffPolicy, FetchObservation, PolitenessPolicy};
    pub use crate::resolver::{DnsResolver, StaticResolver, SystemResolver};
    pub use crate::storage::{CheckpointManager, FrontierCheckpoint};
}

// Direct re-exports for convenience
pub use frontier::{FetchOutcome, FetchTicket, Frontier, FrontierError};
