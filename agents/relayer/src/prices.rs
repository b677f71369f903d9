use std::sync::{Arc, PoisonError, RwLock};

use mixer_core::{PriceFeed, PriceSnapshot};
use tracing::debug;

/// Holds the latest price quotes. Updaters publish out-of-band with
/// [`SharedPriceFeed::update`]; readers always get a complete snapshot.
#[derive(Debug, Clone, Default)]
pub struct SharedPriceFeed {
    latest: Arc<RwLock<PriceSnapshot>>,
}

impl SharedPriceFeed {
    /// Start from `initial` quotes
    pub fn new(initial: PriceSnapshot) -> Self {
        Self {
            latest: Arc::new(RwLock::new(initial)),
        }
    }

    /// Replace the current quotes
    pub fn update(&self, snapshot: PriceSnapshot) {
        debug!(?snapshot, "Updating price snapshot");
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}

impl PriceFeed for SharedPriceFeed {
    fn snapshot(&self) -> PriceSnapshot {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
