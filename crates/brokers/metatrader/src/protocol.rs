use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// MT5 trade server retcode for a completed request.
pub const TRADE_RETCODE_DONE: u32 = 10009;

/// Messages sent from the relay TO the MQL5 EA bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// Submit a market order.
    #[serde(rename = "market_order")]
    MarketOrder {
        symbol: String,
        side: String,
        volume: Decimal,
    },
    /// Close the open position on a symbol.
    #[serde(rename = "close_position")]
    ClosePosition { symbol: String },
    /// Request current account state.
    #[serde(rename = "account_request")]
    AccountRequest,
    /// Request the net position on a symbol.
    #[serde(rename = "position_request")]
    PositionRequest { symbol: String },
}

/// Messages received FROM the EA bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// Connection established.
    #[serde(rename = "connected")]
    Connected { version: String },
    /// Result of a trade request.
    #[serde(rename = "order_result")]
    OrderResult { retcode: u32, comment: String },
    /// Account state.
    #[serde(rename = "account_info")]
    AccountInfo {
        balance: Decimal,
        equity: Decimal,
        margin_free: Decimal,
    },
    /// Net position on a symbol (signed volume, positive = long).
    #[serde(rename = "position_info")]
    PositionInfo { symbol: String, net_volume: Decimal },
    /// Bridge-side error.
    #[serde(rename = "error")]
    Error { message: String },
}

/// Frame a message with a 4-byte length prefix (big-endian).
pub fn frame_message(msg: &[u8]) -> Vec<u8> {
    let len = msg.len() as u32;
    let mut framed = Vec::with_capacity(4 + msg.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(msg);
    framed
}
