//! Binance USDT-M futures broker adapter.
//!
//! Direct signed REST integration: market orders, position information, and
//! wallet balances. The account is assumed to settle in USDT.

pub mod client;

use async_trait::async_trait;
use relaybot_core::{AccountSnapshot, BrokerAdapter, Direction, NetPosition, RelayError};
use relaybot_sizing::SizingPolicy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

pub use client::{ExchangeClient, ExchangeConfig};

/// Fraction of the wallet balance committed per order.
pub const DEFAULT_BALANCE_FRACTION: Decimal = dec!(0.10);

/// Settlement asset the wallet balance is read from.
const SETTLEMENT_ASSET: &str = "USDT";

/// Futures exchange broker adapter.
pub struct ExchangeBroker {
    client: ExchangeClient,
    sizing: SizingPolicy,
}

impl ExchangeBroker {
    pub fn new(config: ExchangeConfig) -> Self {
        Self::with_sizing(config, SizingPolicy::BalanceFraction(DEFAULT_BALANCE_FRACTION))
    }

    pub fn with_sizing(config: ExchangeConfig, sizing: SizingPolicy) -> Self {
        Self {
            client: ExchangeClient::new(config),
            sizing,
        }
    }

    async fn account_snapshot(&self) -> Result<AccountSnapshot, RelayError> {
        let balances = self.client.account_balance().await?;
        let usdt = balances
            .iter()
            .find(|b| b.asset == SETTLEMENT_ASSET)
            .ok_or_else(|| {
                RelayError::AccountUnavailable(format!("no {} balance reported", SETTLEMENT_ASSET))
            })?;
        Ok(AccountSnapshot {
            balance: usdt.balance,
            equity: usdt.balance,
        })
    }

    async fn net_position(&self, symbol: &str) -> Result<NetPosition, RelayError> {
        let positions = self.client.position_information(symbol).await?;
        // Hedge mode reports both sides; the net is their signed sum.
        let net = positions
            .iter()
            .map(|p| p.position_amt)
            .sum::<Decimal>();
        Ok(NetPosition(net))
    }

    fn side_token(direction: Direction) -> &'static str {
        match direction {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }

    async fn flatten(&self, symbol: &str) -> Result<(), RelayError> {
        let net = self.net_position(symbol).await?;
        if let Some((side, qty)) = net.offsetting_order() {
            self.client
                .create_order(symbol, Self::side_token(side), qty)
                .await?;
            info!(%symbol, net = %net.0, "Closed exchange position");
        }
        Ok(())
    }

    async fn open(
        &self,
        symbol: &str,
        direction: Direction,
        quantity: Option<Decimal>,
    ) -> Result<(), RelayError> {
        self.flatten(symbol).await?;

        let qty = match quantity {
            Some(q) => q,
            None => {
                let account = self.account_snapshot().await?;
                self.sizing.quantity(&account)?
            }
        };

        self.client
            .create_order(symbol, Self::side_token(direction), qty)
            .await?;
        info!(%symbol, side = Self::side_token(direction), %qty, "Exchange position opened");
        Ok(())
    }
}

#[async_trait]
impl BrokerAdapter for ExchangeBroker {
    fn name(&self) -> &'static str {
        "exchange"
    }

    async fn open_long(&self, symbol: &str, quantity: Option<Decimal>) -> Result<(), RelayError> {
        self.open(symbol, Direction::Buy, quantity).await
    }

    async fn open_short(&self, symbol: &str, quantity: Option<Decimal>) -> Result<(), RelayError> {
        self.open(symbol, Direction::Sell, quantity).await
    }

    async fn close_position(&self, symbol: &str) -> Result<(), RelayError> {
        self.flatten(symbol).await
    }
}
