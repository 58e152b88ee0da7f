use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Trade direction carried by a webhook signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// Parse the payload token. Anything outside "buy"/"sell" yields `None`;
    /// the relay treats such signals as a logged no-op rather than an error.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "buy" => Some(Direction::Buy),
            "sell" => Some(Direction::Sell),
            _ => None,
        }
    }

}

// ---------------------------------------------------------------------------
// Signal
// ---------------------------------------------------------------------------

/// One parsed webhook request. Built per request, immutable, dropped after
/// dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    /// `None` when the direction token was outside {buy, sell}.
    pub direction: Option<Direction>,
    /// Verbatim direction token, kept for logging.
    pub raw_direction: String,
    /// Fixed order size from the 4-field payload variant. `None` means the
    /// adapter sizes the order from account data.
    pub quantity: Option<Decimal>,
    pub broker_code: String,
}

// ---------------------------------------------------------------------------
// Account & position
// ---------------------------------------------------------------------------

/// Account state reported by a broker backend at sizing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub balance: Decimal,
    pub equity: Decimal,
}

/// Broker-reported signed quantity held on a symbol.
/// Positive = long, negative = short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetPosition(pub Decimal);

impl NetPosition {
    pub const FLAT: NetPosition = NetPosition(Decimal::ZERO);

    pub fn is_flat(&self) -> bool {
        self.0.is_zero()
    }

    /// Side and size of the market order that flattens this position.
    pub fn offsetting_order(&self) -> Option<(Direction, Decimal)> {
        if self.0.is_zero() {
            None
        } else if self.0 > Decimal::ZERO {
            Some((Direction::Sell, self.0))
        } else {
            Some((Direction::Buy, -self.0))
        }
    }
}
