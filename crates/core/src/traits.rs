use async_trait::async_trait;
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Errors surfaced while relaying a signal. All are logged with context and
/// never retried; none crash the process.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    #[error("Unknown broker code: {0}")]
    UnknownBrokerCode(String),
    #[error("Account data unavailable: {0}")]
    AccountUnavailable(String),
    #[error("Order failed: {0}")]
    OrderFailed(String),
}

// ---------------------------------------------------------------------------
// Broker adapter trait
// ---------------------------------------------------------------------------

/// A broker adapter that can open and flatten market positions.
///
/// Every open closes any existing position on the symbol first, so a broker
/// holds at most one net position per symbol at any time.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Close any position on `symbol`, then submit a market buy.
    /// `quantity` overrides the adapter's sizing policy when present.
    async fn open_long(&self, symbol: &str, quantity: Option<Decimal>) -> Result<(), RelayError>;

    /// Close any position on `symbol`, then submit a market sell.
    async fn open_short(&self, symbol: &str, quantity: Option<Decimal>) -> Result<(), RelayError>;

    /// Flatten the net position on `symbol`. Safe no-op when already flat.
    async fn close_position(&self, symbol: &str) -> Result<(), RelayError>;
}
