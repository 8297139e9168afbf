// Convert feed strings into integer ticks/shares and back.
// Prices are fixed-point with `price_decimals` fractional digits, so every
// cost is computed exactly and only rounded once, to cents, on output.

use crate::engine::types::{Cents, Price};
use crate::error::{PricerError, Result};

pub const MAX_PRICE_DECIMALS: u32 = 9;
pub const DEFAULT_PRICE_DECIMALS: u32 = MAX_PRICE_DECIMALS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normaliser {
    pub price_decimals: u32,
    pub price_scale: i64, // e.g. 1_000_000_000 => 9 decimal places
}

impl Default for Normaliser {
    fn default() -> Self {
        Self { price_decimals: DEFAULT_PRICE_DECIMALS, price_scale: 10i64.pow(DEFAULT_PRICE_DECIMALS) }
    }
}

impl Normaliser {
    pub fn new(price_decimals: u32) -> Result<Self> {
        if price_decimals > MAX_PRICE_DECIMALS {
            return Err(PricerError::config(
                price_decimals.to_string(),
                format!("price precision is limited to {MAX_PRICE_DECIMALS} decimal places"),
            ));
        }
        Ok(Self { price_decimals, price_scale: 10i64.pow(price_decimals) })
    }

    pub fn price_to_ticks(&self, s: &str) -> Result<Price> {
        let (integer_part, decimal_part) = match s.find('.') {
            Some(dot_pos) => (&s[..dot_pos], &s[dot_pos + 1..]),
            None => (s, ""),
        };

        if integer_part.is_empty() || !is_digits(integer_part) || !is_digits(decimal_part) {
            return Err(PricerError::format(s, "price is not a decimal number"));
        }

        // Extra fractional digits are only accepted when they are zeros
        let scale_power = self.price_decimals as usize;
        let (kept, dropped) = decimal_part.split_at(decimal_part.len().min(scale_power));
        if dropped.bytes().any(|b| b != b'0') {
            return Err(PricerError::format(
                s,
                format!("price has more than {} decimal places", self.price_decimals),
            ));
        }

        let overflow = || PricerError::format(s, "price out of range");
        let integer: i64 = integer_part.parse().map_err(|_| overflow())?;
        let decimal: i64 = if kept.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", kept, width = scale_power);
            padded.parse().map_err(|_| overflow())?
        };

        let ticks = integer
            .checked_mul(self.price_scale)
            .and_then(|t| t.checked_add(decimal))
            .ok_or_else(overflow)?;
        if ticks == 0 {
            return Err(PricerError::format(s, "price must be positive"));
        }
        Ok(Price(ticks))
    }

    pub fn size_to_shares(&self, s: &str) -> Result<u64> {
        if s.is_empty() || !is_digits(s) {
            return Err(PricerError::format(s, "size is not a whole number"));
        }
        match s.parse::<u64>() {
            Ok(0) => Err(PricerError::format(s, "size must be positive")),
            Ok(n) => Ok(n),
            Err(_) => Err(PricerError::format(s, "size out of range")),
        }
    }

    pub fn ticks_to_string(&self, price: Price) -> String {
        let ticks = price.ticks();
        if self.price_decimals == 0 {
            return ticks.to_string();
        }
        format!(
            "{}.{:0width$}",
            ticks / self.price_scale,
            ticks % self.price_scale,
            width = self.price_decimals as usize
        )
    }

    /// Round a notional (ticks x shares) to cents, half up.
    pub fn notional_to_cents(&self, notional: u128) -> Cents {
        if self.price_decimals >= 2 {
            let divisor = 10u128.pow(self.price_decimals - 2);
            Cents(notional.saturating_add(divisor / 2) / divisor)
        } else {
            Cents(notional.saturating_mul(10u128.pow(2 - self.price_decimals)))
        }
    }
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}
