use auto_impl::auto_impl;

use crate::PriceSnapshot;

/// Read-only access to the latest gas and asset price quotes. Quotes are
/// refreshed out of band; consumers only ever see whole snapshots.
#[auto_impl(&, Box, Arc)]
pub trait PriceFeed: Send + Sync {
    /// The most recent snapshot
    fn snapshot(&self) -> PriceSnapshot;
}
