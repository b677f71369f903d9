//! Fee sufficiency check.
//!
//! The relayer fronts `gas * fast gas price` (plus the refund for token
//! withdrawals) and expects the stated fee to cover that cost, converted into
//! the withdrawn asset, plus its service fee on the withdrawn amount.

use mixer_core::{utils::parse_amount, Currency, PriceSnapshot, U256};

/// Precision used to turn the fractional service fee percentage into an
/// integer multiplier
const SERVICE_FEE_PRECISION: u64 = 10_000_000_000;

/// Everything the fee decision depends on
#[derive(Debug, Clone, Copy)]
pub struct FeeCheck<'a> {
    /// Gas limit of the withdrawal, safety margin included
    pub gas: U256,
    /// Latest price quotes
    pub prices: &'a PriceSnapshot,
    /// Asset being withdrawn
    pub currency: &'a Currency,
    /// Denomination of the mixer, e.g. `"0.1"`
    pub amount: &'a str,
    /// Decimals of `currency`
    pub decimals: u32,
    /// Native asset the relayer fronts to the recipient
    pub refund: U256,
    /// Fee the withdrawal pays to the relayer, in base units of `currency`
    pub fee: U256,
    /// Service fee in percent of the withdrawn amount
    pub service_fee_percent: f64,
}

/// Why a fee was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeeShortfall {
    /// The fee does not cover the relayer's cost plus service fee
    #[error("Not enough fee")]
    NotEnoughFee,
    /// No usable fast gas price quote
    #[error("Gas price is unavailable")]
    MissingGasPrice,
    /// No usable price for the withdrawn token
    #[error("Price of {0} is unavailable")]
    MissingEthPrice(Currency),
    /// The mixer denomination cannot be read as an amount
    #[error("Invalid mixer denomination")]
    InvalidAmount,
}

/// Outcome of a fee check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeeVerdict {
    /// The fee covers cost and service fee
    Sufficient {
        /// Minimum fee that would have been accepted
        desired_fee: U256,
    },
    /// The fee was refused
    Insufficient(FeeShortfall),
}

impl FeeVerdict {
    /// Whether the fee was accepted
    pub fn is_sufficient(&self) -> bool {
        matches!(self, Self::Sufficient { .. })
    }
}

/// Decide whether `check.fee` pays for the withdrawal. Deterministic in its
/// inputs; raising the fee never turns an accepted check into a refused one.
pub fn is_enough_fee(check: &FeeCheck<'_>) -> FeeVerdict {
    match desired_fee(check) {
        Ok(desired_fee) if check.fee >= desired_fee => FeeVerdict::Sufficient { desired_fee },
        Ok(_) => FeeVerdict::Insufficient(FeeShortfall::NotEnoughFee),
        Err(shortfall) => FeeVerdict::Insufficient(shortfall),
    }
}

fn desired_fee(check: &FeeCheck<'_>) -> Result<U256, FeeShortfall> {
    let gas_price = check
        .prices
        .gas_prices
        .fast_wei()
        .ok_or(FeeShortfall::MissingGasPrice)?;
    let expense = check.gas.saturating_mul(gas_price);

    let amount =
        parse_amount(check.amount, check.decimals).ok_or(FeeShortfall::InvalidAmount)?;
    let service_fee = service_fee(amount, check.service_fee_percent);

    if check.currency.is_native() {
        return Ok(expense.saturating_add(service_fee));
    }

    let eth_price = check
        .prices
        .eth_price(check.currency)
        .ok_or_else(|| FeeShortfall::MissingEthPrice(check.currency.clone()))?;
    let cost_in_token = expense
        .saturating_add(check.refund)
        .saturating_mul(U256::exp10(check.decimals as usize))
        / eth_price;
    Ok(cost_in_token.saturating_add(service_fee))
}

fn service_fee(amount: U256, percent: f64) -> U256 {
    let scaled = (percent * SERVICE_FEE_PRECISION as f64).round();
    if !scaled.is_finite() || scaled <= 0.0 {
        return U256::zero();
    }
    amount.saturating_mul(U256::from(scaled as u128)) / U256::from(SERVICE_FEE_PRECISION * 100)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use mixer_core::GasPrices;

    use super::*;

    const GWEI: u64 = 1_000_000_000;

    fn prices() -> PriceSnapshot {
        PriceSnapshot {
            gas_prices: GasPrices {
                instant: 30.0,
                fast: 20.0,
                standard: 10.0,
                low: 5.0,
            },
            eth_prices: BTreeMap::from([(
                Currency::new("dai"),
                // 1 dai = 0.005 eth
                U256::from(5_000_000_000_000_000u64),
            )]),
        }
    }

    fn eth_check<'a>(prices: &'a PriceSnapshot, currency: &'a Currency, fee: U256) -> FeeCheck<'a> {
        FeeCheck {
            gas: U256::from(260_000),
            prices,
            currency,
            amount: "1",
            decimals: 18,
            refund: U256::zero(),
            fee,
            service_fee_percent: 0.5,
        }
    }

    #[test]
    fn native_fee_covers_gas_and_service_fee() {
        let prices = prices();
        let eth = Currency::native();
        // 260k gas at 20 gwei plus 0.5% of 1 eth
        let desired = U256::from(260_000 * 20 * GWEI) + U256::from(5_000_000_000_000_000u64);

        assert_eq!(
            is_enough_fee(&eth_check(&prices, &eth, desired)),
            FeeVerdict::Sufficient {
                desired_fee: desired
            }
        );
        assert_eq!(
            is_enough_fee(&eth_check(&prices, &eth, desired - 1)),
            FeeVerdict::Insufficient(FeeShortfall::NotEnoughFee)
        );
    }

    #[test]
    fn token_fee_converts_cost_and_refund() {
        let prices = prices();
        let dai = Currency::new("dai");
        let refund = U256::from(1_000_000_000_000_000u64);
        let check = FeeCheck {
            gas: U256::from(500_000),
            prices: &prices,
            currency: &dai,
            amount: "100",
            decimals: 18,
            refund,
            fee: U256::zero(),
            service_fee_percent: 1.0,
        };

        // (0.01 eth gas + 0.001 eth refund) / 0.005 = 2.2 dai, plus 1 dai service fee
        let desired = U256::from(3_200_000_000_000_000_000u64);
        assert_eq!(
            is_enough_fee(&FeeCheck {
                fee: desired,
                ..check
            }),
            FeeVerdict::Sufficient {
                desired_fee: desired
            }
        );
        assert!(!is_enough_fee(&FeeCheck {
            fee: desired - 1,
            ..check
        })
        .is_sufficient());
    }

    #[test]
    fn missing_quotes_are_refused() {
        let mut prices = prices();
        let usdc = Currency::new("usdc");
        assert_eq!(
            is_enough_fee(&eth_check(&prices, &usdc, U256::MAX)),
            FeeVerdict::Insufficient(FeeShortfall::MissingEthPrice(usdc.clone()))
        );

        prices.gas_prices.fast = f64::NAN;
        let eth = Currency::native();
        assert_eq!(
            is_enough_fee(&eth_check(&prices, &eth, U256::MAX)),
            FeeVerdict::Insufficient(FeeShortfall::MissingGasPrice)
        );
    }

    #[test]
    fn zero_price_is_missing() {
        let mut prices = prices();
        let dai = Currency::new("dai");
        prices.eth_prices.insert(dai.clone(), U256::zero());
        assert_eq!(
            is_enough_fee(&eth_check(&prices, &dai, U256::MAX)),
            FeeVerdict::Insufficient(FeeShortfall::MissingEthPrice(dai))
        );
    }

    #[test]
    fn zero_gas_price_is_refused() {
        let prices = PriceSnapshot::default();
        let eth = Currency::native();
        assert_eq!(
            is_enough_fee(&eth_check(&prices, &eth, U256::MAX)),
            FeeVerdict::Insufficient(FeeShortfall::MissingGasPrice)
        );
    }

    #[test]
    fn verdict_is_monotonic_in_fee() {
        let prices = prices();
        for currency in [Currency::native(), Currency::new("dai")] {
            let mut accepted = false;
            for step in 0..200u64 {
                let fee = U256::from(step) * U256::exp10(16);
                let sufficient = is_enough_fee(&eth_check(&prices, &currency, fee)).is_sufficient();
                assert!(!accepted || sufficient, "{currency} refused fee {fee} after accepting less");
                accepted |= sufficient;
            }
            assert!(accepted, "{currency} never accepted");
        }
    }

    #[test]
    fn check_is_deterministic() {
        let prices = prices();
        let eth = Currency::native();
        let check = eth_check(&prices, &eth, U256::from(10u64.pow(16)));
        assert_eq!(is_enough_fee(&check), is_enough_fee(&check));
    }
}
