use relaybot_core::{AccountSnapshot, NetPosition, RelayError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::info;

use crate::protocol::*;

/// Configuration for connecting to the MT5 EA bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Host the EA bridge is listening on (e.g. "127.0.0.1").
    pub host: String,
    /// Bridge port.
    pub port: u16,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5556,
        }
    }
}

/// TCP client for the MQL5 EA bridge.
///
/// Each operation is a single request/response round trip over a
/// length-prefixed JSON framing. The caller serializes access; the broker
/// adapter keeps this behind a mutex.
pub struct TerminalClient {
    config: TerminalConfig,
    stream: Option<TcpStream>,
}

impl TerminalClient {
    pub fn new(config: TerminalConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Connect and wait for the bridge handshake.
    pub async fn connect(&mut self) -> Result<(), RelayError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!("Connecting to MT5 bridge at {}", addr);

        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| RelayError::OrderFailed(format!("bridge connect failed: {}", e)))?;
        self.stream = Some(stream);

        match self.recv().await? {
            InboundMessage::Connected { version } => {
                info!("Connected to MT5 bridge v{}", version);
                Ok(())
            }
            InboundMessage::Error { message } => {
                self.stream = None;
                Err(RelayError::OrderFailed(message))
            }
            other => {
                self.stream = None;
                Err(RelayError::OrderFailed(format!(
                    "unexpected handshake message: {:?}",
                    other
                )))
            }
        }
    }

    async fn send(&mut self, msg: &OutboundMessage) -> Result<(), RelayError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| RelayError::OrderFailed("bridge not connected".to_string()))?;

        let json = serde_json::to_vec(msg)
            .map_err(|e| RelayError::OrderFailed(format!("serialization error: {}", e)))?;
        let framed = frame_message(&json);

        stream
            .write_all(&framed)
            .await
            .map_err(|e| RelayError::OrderFailed(format!("bridge write error: {}", e)))?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<InboundMessage, RelayError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| RelayError::OrderFailed("bridge not connected".to_string()))?;

        let mut len_buf = [0u8; 4];
        stream
            .read_exact(&mut len_buf)
            .await
            .map_err(|e| RelayError::OrderFailed(format!("bridge read error: {}", e)))?;
        let len = u32::from_be_bytes(len_buf) as usize;

        let mut body = vec![0u8; len];
        stream
            .read_exact(&mut body)
            .await
            .map_err(|e| RelayError::OrderFailed(format!("bridge read error: {}", e)))?;

        serde_json::from_slice(&body)
            .map_err(|e| RelayError::OrderFailed(format!("deserialization error: {}", e)))
    }

    async fn request(&mut self, msg: &OutboundMessage) -> Result<InboundMessage, RelayError> {
        self.send(msg).await?;
        self.recv().await
    }

    /// Submit a market order. `side` is "buy" or "sell".
    pub async fn market_order(
        &mut self,
        symbol: &str,
        side: &str,
        volume: Decimal,
    ) -> Result<(), RelayError> {
        let msg = OutboundMessage::MarketOrder {
            symbol: symbol.to_string(),
            side: side.to_string(),
            volume,
        };
        match self.request(&msg).await? {
            InboundMessage::OrderResult { retcode, comment } => {
                if retcode == TRADE_RETCODE_DONE {
                    Ok(())
                } else {
                    Err(RelayError::OrderFailed(format!(
                        "retcode {}: {}",
                        retcode, comment
                    )))
                }
            }
            InboundMessage::Error { message } => Err(RelayError::OrderFailed(message)),
            other => Err(RelayError::OrderFailed(format!(
                "unexpected bridge reply: {:?}",
                other
            ))),
        }
    }

    /// Close the open position on `symbol` terminal-side.
    pub async fn close_position(&mut self, symbol: &str) -> Result<(), RelayError> {
        let msg = OutboundMessage::ClosePosition {
            symbol: symbol.to_string(),
        };
        match self.request(&msg).await? {
            InboundMessage::OrderResult { retcode, comment } => {
                if retcode == TRADE_RETCODE_DONE {
                    Ok(())
                } else {
                    Err(RelayError::OrderFailed(format!(
                        "retcode {}: {}",
                        retcode, comment
                    )))
                }
            }
            InboundMessage::Error { message } => Err(RelayError::OrderFailed(message)),
            other => Err(RelayError::OrderFailed(format!(
                "unexpected bridge reply: {:?}",
                other
            ))),
        }
    }

    /// Fetch the current account snapshot.
    pub async fn account_info(&mut self) -> Result<AccountSnapshot, RelayError> {
        match self.request(&OutboundMessage::AccountRequest).await {
            Ok(InboundMessage::AccountInfo {
                balance, equity, ..
            }) => Ok(AccountSnapshot { balance, equity }),
            Ok(InboundMessage::Error { message }) => Err(RelayError::AccountUnavailable(message)),
            Ok(other) => Err(RelayError::AccountUnavailable(format!(
                "unexpected bridge reply: {:?}",
                other
            ))),
            Err(RelayError::OrderFailed(reason)) => Err(RelayError::AccountUnavailable(reason)),
            Err(e) => Err(e),
        }
    }

    /// Fetch the signed net position on `symbol`.
    pub async fn net_position(&mut self, symbol: &str) -> Result<NetPosition, RelayError> {
        let msg = OutboundMessage::PositionRequest {
            symbol: symbol.to_string(),
        };
        match self.request(&msg).await? {
            InboundMessage::PositionInfo { net_volume, .. } => Ok(NetPosition(net_volume)),
            InboundMessage::Error { message } => Err(RelayError::OrderFailed(message)),
            other => Err(RelayError::OrderFailed(format!(
                "unexpected bridge reply: {:?}",
                other
            ))),
        }
    }
}
