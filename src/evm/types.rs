/// Value normalization for the ledger's native unit
///
/// Amounts travel on-chain as integers in the smallest unit (wei) and are shown
/// as exact decimal strings. Conversions use integer arithmetic only so that a
/// donation entered as "0.1" is displayed back as "0.1".
use crate::error::Error;
use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use std::str::FromStr;

/// Fractional digits of the native unit.
pub const NATIVE_DECIMALS: usize = 18;

/// Display format for on-chain timestamps.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

fn unit_multiplier() -> U256 {
    U256::from(10u64).pow(U256::from(NATIVE_DECIMALS as u64))
}

/// Convert a decimal string in the native unit into its smallest-unit integer.
///
/// Accepts `"1"`, `"0.1"`, `".5"` and `"12.000000000000000001"`. Rejects empty
/// input, signs, exponents, and more than 18 fractional digits rather than
/// silently truncating them.
pub fn parse_native_amount(amount: &str) -> Result<U256, Error> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(Error::InvalidAmount("amount is empty".to_string()));
    }

    let (integer_part, decimal_part) = match amount.split_once('.') {
        Some((int, dec)) => (int, dec),
        None => (amount, ""),
    };

    if integer_part.is_empty() && decimal_part.is_empty() {
        return Err(Error::InvalidAmount(format!("'{}' has no digits", amount)));
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(integer_part) || !all_digits(decimal_part) {
        return Err(Error::InvalidAmount(format!(
            "'{}' is not a decimal number",
            amount
        )));
    }
    if decimal_part.len() > NATIVE_DECIMALS {
        return Err(Error::InvalidAmount(format!(
            "'{}' has more than {} decimal places",
            amount, NATIVE_DECIMALS
        )));
    }

    let overflow = || Error::InvalidAmount(format!("'{}' is too large", amount));

    let int_value = if integer_part.is_empty() {
        U256::ZERO
    } else {
        U256::from_str(integer_part).map_err(|_| overflow())?
    };
    let dec_value = if decimal_part.is_empty() {
        U256::ZERO
    } else {
        let padded = format!("{:0<width$}", decimal_part, width = NATIVE_DECIMALS);
        U256::from_str(&padded).map_err(|_| overflow())?
    };

    int_value
        .checked_mul(unit_multiplier())
        .and_then(|wei| wei.checked_add(dec_value))
        .ok_or_else(overflow)
}

/// Format a smallest-unit integer as an exact decimal string.
///
/// Trailing fractional zeros are trimmed, keeping at least one digit after the
/// point: `10^17` formats as `"0.1"`, `10^18` as `"1.0"`.
pub fn format_native_amount(wei: U256) -> String {
    let multiplier = unit_multiplier();
    let whole = wei / multiplier;
    let remainder = wei % multiplier;

    let fraction = format!("{:0>width$}", remainder.to_string(), width = NATIVE_DECIMALS);
    let fraction = fraction.trim_end_matches('0');
    let fraction = if fraction.is_empty() { "0" } else { fraction };

    format!("{}.{}", whole, fraction)
}

/// Convert an on-chain unix timestamp (seconds) into a UTC moment and its
/// display string.
pub fn normalize_timestamp(seconds: U256) -> Result<(DateTime<Utc>, String), Error> {
    if seconds > U256::from(i64::MAX as u64) {
        return Err(Error::Sync(format!("timestamp {} is out of range", seconds)));
    }
    let moment = DateTime::<Utc>::from_timestamp(seconds.to::<u64>() as i64, 0)
        .ok_or_else(|| Error::Sync(format!("timestamp {} is out of range", seconds)))?;
    let display = moment.format(TIMESTAMP_FORMAT).to_string();
    Ok((moment, display))
}
