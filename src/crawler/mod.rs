//! Fetching side of the crawl
//!
//! This module implements the consumer path: workers that take fetch
//! tickets from the frontier, fetch them over HTTP with a global rate limit
//! and report the outcome back.

pub mod fetcher;
pub mod worker;

pub use fetcher::{FetchResponse, Fetcher, HttpFetcher};
pub use worker::{WorkerPool, WorkerPoolConfig, WorkerStats};
