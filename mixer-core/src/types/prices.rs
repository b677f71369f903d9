use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{utils::gwei_to_wei, Currency, U256};

/// Gas price quotes in gwei, as published by gas price oracles
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GasPrices {
    /// Next-block inclusion
    pub instant: f64,
    /// Inclusion within a few blocks; the price the relayer pays
    pub fast: f64,
    /// Standard inclusion
    pub standard: f64,
    /// Slow inclusion
    pub low: f64,
}

impl GasPrices {
    /// The `fast` quote converted to wei, if it is a valid non-zero price
    pub fn fast_wei(&self) -> Option<U256> {
        gwei_to_wei(self.fast).filter(|price| !price.is_zero())
    }
}

/// Latest gas and asset price quotes. Asset prices are expressed as wei of
/// native asset per whole token.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    /// Gas price quotes
    pub gas_prices: GasPrices,
    /// Native-asset price of each token
    pub eth_prices: BTreeMap<Currency, U256>,
}

impl PriceSnapshot {
    /// Native-asset price of `currency`, if known and non-zero
    pub fn eth_price(&self, currency: &Currency) -> Option<U256> {
        self.eth_prices
            .get(currency)
            .copied()
            .filter(|price| !price.is_zero())
    }
}
