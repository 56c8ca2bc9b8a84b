//! Common test utilities

use baram_frontier::frontier::{FetchOutcome, Frontier};
use baram_frontier::resolver::StaticResolver;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Address every test host resolves to
pub fn localhost() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

/// Frontier whose hosts all resolve to localhost
pub fn test_frontier(path_query_limit: usize) -> Arc<Frontier> {
    let resolver = StaticResolver::new().with_fallback(localhost());
    Arc::new(Frontier::with_limit(Arc::new(resolver), path_query_limit))
}

/// Take one ticket and report it as a success with a fixed delay
///
/// Returns the fetched URL.
#[allow(dead_code)]
pub async fn fetch_once(frontier: &Frontier, delay: Duration) -> String {
    let ticket = frontier
        .next_fetch(None)
        .await
        .expect("frontier cancelled")
        .expect("no ticket");
    frontier
        .report_outcome(
            ticket.authority.as_str(),
            FetchOutcome::success(),
            Instant::now() + delay,
        )
        .expect("report failed");
    ticket.url()
}
