//! Position sizing: converts a broker account snapshot into a market order
//! quantity.

use relaybot_core::{AccountSnapshot, RelayError};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// How an adapter turns account state into an order size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingPolicy {
    /// quantity = equity / divisor, rounded down to lot granularity
    /// (0.01 lot per divisor units of equity).
    EquityDivisor(Decimal),
    /// quantity = balance * fraction, in base-asset units.
    BalanceFraction(Decimal),
}

/// Decimal places kept on terminal lot sizes.
const LOT_SCALE: u32 = 2;

impl SizingPolicy {
    /// Compute the order quantity for `account`.
    ///
    /// Never returns a negative quantity; a non-positive result is rejected
    /// as `OrderFailed` so the caller places no order.
    pub fn quantity(&self, account: &AccountSnapshot) -> Result<Decimal, RelayError> {
        let qty = match self {
            SizingPolicy::EquityDivisor(divisor) => {
                if divisor.is_zero() {
                    return Err(RelayError::OrderFailed(
                        "sizing divisor is zero".to_string(),
                    ));
                }
                (account.equity / divisor)
                    .round_dp_with_strategy(LOT_SCALE, RoundingStrategy::ToZero)
            }
            SizingPolicy::BalanceFraction(fraction) => account.balance * fraction,
        };

        if qty <= Decimal::ZERO {
            return Err(RelayError::OrderFailed(format!(
                "computed quantity {} is not positive (equity={}, balance={})",
                qty, account.equity, account.balance
            )));
        }

        Ok(qty)
    }
}
