//! MetaTrader 5 broker adapter.
//!
//! Talks to an MQL5 EA bridge running inside the terminal over a TCP socket
//! with length-prefixed JSON messages. The EA owns the terminal login; this
//! crate only issues trade and query requests against it.

pub mod client;
pub mod protocol;

use async_trait::async_trait;
use relaybot_core::{AccountSnapshot, BrokerAdapter, Direction, RelayError};
use relaybot_sizing::SizingPolicy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Mutex;
use tracing::info;

pub use client::{TerminalClient, TerminalConfig};

/// Lot sizing observed on the terminal account: 0.01 lot per 100 units of
/// equity.
pub const DEFAULT_EQUITY_DIVISOR: Decimal = dec!(10000);

/// MT5 broker adapter.
///
/// The bridge session is a single TCP stream, so all operations serialize
/// behind one mutex; a close-then-open sequence holds the lock end to end
/// and cannot interleave with another signal on this broker.
pub struct TerminalBroker {
    client: Mutex<TerminalClient>,
    sizing: SizingPolicy,
}

impl TerminalBroker {
    pub fn new(config: TerminalConfig) -> Self {
        Self::with_sizing(config, SizingPolicy::EquityDivisor(DEFAULT_EQUITY_DIVISOR))
    }

    pub fn with_sizing(config: TerminalConfig, sizing: SizingPolicy) -> Self {
        Self {
            client: Mutex::new(TerminalClient::new(config)),
            sizing,
        }
    }

    /// Connect to the bridge and return the account snapshot, for startup
    /// logging.
    pub async fn connect(&self) -> Result<AccountSnapshot, RelayError> {
        let mut client = self.client.lock().await;
        client.connect().await?;
        client.account_info().await
    }

    async fn flatten(client: &mut TerminalClient, symbol: &str) -> Result<(), RelayError> {
        let net = client.net_position(symbol).await?;
        if net.is_flat() {
            return Ok(());
        }
        client.close_position(symbol).await?;
        info!(%symbol, net = %net.0, "Closed terminal position");
        Ok(())
    }

    async fn open(
        &self,
        symbol: &str,
        direction: Direction,
        quantity: Option<Decimal>,
    ) -> Result<(), RelayError> {
        let mut client = self.client.lock().await;
        Self::flatten(&mut client, symbol).await?;

        let volume = match quantity {
            Some(q) => q,
            None => {
                let account = client.account_info().await?;
                self.sizing.quantity(&account)?
            }
        };

        let side = match direction {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
        };
        client.market_order(symbol, side, volume).await?;
        info!(%symbol, side, %volume, "Terminal position opened");
        Ok(())
    }
}

#[async_trait]
impl BrokerAdapter for TerminalBroker {
    fn name(&self) -> &'static str {
        "mt5"
    }

    async fn open_long(&self, symbol: &str, quantity: Option<Decimal>) -> Result<(), RelayError> {
        self.open(symbol, Direction::Buy, quantity).await
    }

    async fn open_short(&self, symbol: &str, quantity: Option<Decimal>) -> Result<(), RelayError> {
        self.open(symbol, Direction::Sell, quantity).await
    }

    async fn close_position(&self, symbol: &str) -> Result<(), RelayError> {
        let mut client = self.client.lock().await;
        Self::flatten(&mut client, symbol).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{frame_message, InboundMessage, OutboundMessage, TRADE_RETCODE_DONE};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// A minimal in-test stand-in for the EA bridge: answers one connection,
    /// records every request, and replies from a fixed account/position.
    struct FakeBridge {
        addr: std::net::SocketAddr,
        requests: Arc<std::sync::Mutex<Vec<OutboundMessage>>>,
    }

    async fn write_msg(stream: &mut TcpStream, msg: &InboundMessage) {
        let framed = frame_message(&serde_json::to_vec(msg).unwrap());
        stream.write_all(&framed).await.unwrap();
    }

    async fn read_msg(stream: &mut TcpStream) -> Option<OutboundMessage> {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.ok()?;
        let mut body = vec![0u8; u32::from_be_bytes(len_buf) as usize];
        stream.read_exact(&mut body).await.ok()?;
        Some(serde_json::from_slice(&body).unwrap())
    }

    async fn spawn_bridge(equity: Decimal, net_volume: Decimal) -> FakeBridge {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(std::sync::Mutex::new(Vec::new()));
        let log = requests.clone();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            write_msg(
                &mut stream,
                &InboundMessage::Connected {
                    version: "test".to_string(),
                },
            )
            .await;

            while let Some(req) = read_msg(&mut stream).await {
                let reply = match &req {
                    OutboundMessage::MarketOrder { .. } => InboundMessage::OrderResult {
                        retcode: TRADE_RETCODE_DONE,
                        comment: "done".to_string(),
                    },
                    OutboundMessage::ClosePosition { .. } => InboundMessage::OrderResult {
                        retcode: TRADE_RETCODE_DONE,
                        comment: "closed".to_string(),
                    },
                    OutboundMessage::AccountRequest => InboundMessage::AccountInfo {
                        balance: equity,
                        equity,
                        margin_free: equity,
                    },
                    OutboundMessage::PositionRequest { symbol } => InboundMessage::PositionInfo {
                        symbol: symbol.clone(),
                        net_volume,
                    },
                };
                log.lock().unwrap().push(req);
                write_msg(&mut stream, &reply).await;
            }
        });

        FakeBridge { addr, requests }
    }

    fn broker_for(bridge: &FakeBridge) -> TerminalBroker {
        TerminalBroker::new(TerminalConfig {
            host: bridge.addr.ip().to_string(),
            port: bridge.addr.port(),
        })
    }

    #[tokio::test]
    async fn open_long_sizes_from_equity() {
        // 1000 equity at divisor 10000 -> 0.1 lot
        let bridge = spawn_bridge(dec!(1000), Decimal::ZERO).await;
        let broker = broker_for(&bridge);
        broker.connect().await.unwrap();

        broker.open_long("EURUSD", None).await.unwrap();

        let requests = bridge.requests.lock().unwrap();
        assert!(matches!(
            requests.last(),
            Some(OutboundMessage::MarketOrder { symbol, side, volume })
                if symbol == "EURUSD" && side == "buy" && *volume == dec!(0.1)
        ));
        // Flat account: position was queried but nothing closed.
        assert!(!requests
            .iter()
            .any(|r| matches!(r, OutboundMessage::ClosePosition { .. })));
    }

    #[tokio::test]
    async fn open_short_closes_existing_position_first() {
        let bridge = spawn_bridge(dec!(1000), dec!(0.3)).await;
        let broker = broker_for(&bridge);
        broker.connect().await.unwrap();

        broker.open_short("EURUSD", None).await.unwrap();

        let requests = bridge.requests.lock().unwrap();
        let close_at = requests
            .iter()
            .position(|r| matches!(r, OutboundMessage::ClosePosition { .. }))
            .expect("close should be sent");
        let order_at = requests
            .iter()
            .position(|r| matches!(r, OutboundMessage::MarketOrder { .. }))
            .expect("order should be sent");
        assert!(close_at < order_at);
    }

    #[tokio::test]
    async fn close_when_flat_sends_no_close_request() {
        let bridge = spawn_bridge(dec!(1000), Decimal::ZERO).await;
        let broker = broker_for(&bridge);
        broker.connect().await.unwrap();

        broker.close_position("EURUSD").await.unwrap();
        broker.close_position("EURUSD").await.unwrap();

        let requests = bridge.requests.lock().unwrap();
        assert!(!requests
            .iter()
            .any(|r| matches!(r, OutboundMessage::ClosePosition { .. })));
    }

    #[tokio::test]
    async fn fixed_quantity_skips_account_lookup() {
        let bridge = spawn_bridge(dec!(1000), Decimal::ZERO).await;
        let broker = broker_for(&bridge);
        broker.connect().await.unwrap();

        broker.open_long("XAUUSD", Some(dec!(0.5))).await.unwrap();

        let requests = bridge.requests.lock().unwrap();
        assert!(!requests
            .iter()
            .any(|r| matches!(r, OutboundMessage::AccountRequest)));
        assert!(matches!(
            requests.last(),
            Some(OutboundMessage::MarketOrder { volume, .. }) if *volume == dec!(0.5)
        ));
    }

    #[tokio::test]
    async fn order_without_connection_fails() {
        let broker = TerminalBroker::new(TerminalConfig::default());
        let err = broker.close_position("EURUSD").await.unwrap_err();
        assert!(matches!(err, RelayError::OrderFailed(_)));
    }
}
