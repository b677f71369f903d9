use ethers_core::utils::parse_units;

use crate::U256;

const GWEI_DECIMALS: u32 = 9;

/// Parse an unsigned integer given either as a `0x`-prefixed hex string or as
/// a decimal string.
pub fn parse_u256(value: &str) -> Option<U256> {
    let value = value.trim();
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        if hex.is_empty() || hex.len() > 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return U256::from_str_radix(hex, 16).ok();
    }
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    U256::from_dec_str(value).ok()
}

/// Convert a human-readable amount such as `"0.1"` into base units of a token
/// with `decimals` decimals.
pub fn parse_amount(amount: &str, decimals: u32) -> Option<U256> {
    parse_units(amount.trim(), decimals).ok().map(U256::from)
}

/// Convert a gwei quote into wei. Sub-wei precision is truncated.
pub fn gwei_to_wei(gwei: f64) -> Option<U256> {
    if !gwei.is_finite() || gwei < 0.0 {
        return None;
    }
    parse_amount(&format!("{gwei:.9}"), GWEI_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal() {
        assert_eq!(parse_u256("0x10"), Some(U256::from(16)));
        assert_eq!(
            parse_u256("0x0000000000000000000000000000000000000000000000000000000000000001"),
            Some(U256::one())
        );
        assert_eq!(parse_u256("1000"), Some(U256::from(1000)));
        assert_eq!(parse_u256("0x"), None);
        assert_eq!(parse_u256("-1"), None);
        assert_eq!(parse_u256("1e18"), None);
        assert_eq!(parse_u256(""), None);
    }

    #[test]
    fn parses_denominations() {
        assert_eq!(
            parse_amount("0.1", 18),
            Some(U256::from(100_000_000_000_000_000u64))
        );
        assert_eq!(parse_amount("100", 6), Some(U256::from(100_000_000u64)));
        assert_eq!(parse_amount("abc", 18), None);
    }

    #[test]
    fn converts_gwei() {
        assert_eq!(gwei_to_wei(20.0), Some(U256::from(20_000_000_000u64)));
        assert_eq!(gwei_to_wei(1.5), Some(U256::from(1_500_000_000u64)));
        assert_eq!(gwei_to_wei(f64::NAN), None);
        assert_eq!(gwei_to_wei(-1.0), None);
    }
}
