use hmac::{Hmac, Mac};
use relaybot_core::RelayError;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Binance USDT-M futures production endpoint.
pub const EXCHANGE_PROD_URL: &str = "https://fapi.binance.com";

/// Configuration for the exchange REST client.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
}

impl ExchangeConfig {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            base_url: EXCHANGE_PROD_URL.to_string(),
            api_key,
            api_secret,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    #[serde(rename = "orderId")]
    pub order_id: u64,
    pub symbol: String,
    pub status: String,
}

/// One side of the position on a symbol (both sides in hedge mode).
#[derive(Debug, Deserialize)]
pub struct PositionInformation {
    pub symbol: String,
    #[serde(rename = "positionAmt", with = "rust_decimal::serde::str")]
    pub position_amt: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub balance: Decimal,
}

/// Signed REST client for the futures API.
#[derive(Clone)]
pub struct ExchangeClient {
    http: Client,
    config: ExchangeConfig,
}

impl ExchangeClient {
    pub fn new(config: ExchangeConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn sign(&self, query: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.config.api_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn signed_url(&self, path: &str, params: &str) -> String {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_millis() as u64;
        let query = if params.is_empty() {
            format!("timestamp={}", timestamp)
        } else {
            format!("{}&timestamp={}", params, timestamp)
        };
        let signature = self.sign(&query);
        format!(
            "{}{}?{}&signature={}",
            self.config.base_url, path, query, signature
        )
    }

    /// Submit a market order. `side` is "BUY" or "SELL".
    pub async fn create_order(
        &self,
        symbol: &str,
        side: &str,
        quantity: Decimal,
    ) -> Result<OrderResponse, RelayError> {
        let params = format!(
            "symbol={}&side={}&type=MARKET&quantity={}&newClientOrderId={}",
            symbol.to_uppercase(),
            side,
            quantity.normalize(),
            Uuid::new_v4()
        );
        let url = self.signed_url("/fapi/v1/order", &params);

        info!(%symbol, side, %quantity, "Placing market order");

        let resp = self
            .http
            .post(&url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await
            .map_err(|e| RelayError::OrderFailed(format!("exchange unreachable: {}", e)))?;

        if !resp.status().is_success() {
            let reason = resp.text().await.unwrap_or_default();
            return Err(RelayError::OrderFailed(reason));
        }

        resp.json::<OrderResponse>()
            .await
            .map_err(|e| RelayError::OrderFailed(format!("bad order response: {}", e)))
    }

    /// Fetch position information for `symbol`.
    pub async fn position_information(
        &self,
        symbol: &str,
    ) -> Result<Vec<PositionInformation>, RelayError> {
        let params = format!("symbol={}", symbol.to_uppercase());
        let url = self.signed_url("/fapi/v2/positionRisk", &params);

        let resp = self
            .http
            .get(&url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await
            .map_err(|e| RelayError::OrderFailed(format!("exchange unreachable: {}", e)))?;

        if !resp.status().is_success() {
            let reason = resp.text().await.unwrap_or_default();
            return Err(RelayError::OrderFailed(reason));
        }

        resp.json::<Vec<PositionInformation>>()
            .await
            .map_err(|e| RelayError::OrderFailed(format!("bad position response: {}", e)))
    }

    /// Fetch futures wallet balances per asset.
    pub async fn account_balance(&self) -> Result<Vec<AssetBalance>, RelayError> {
        let url = self.signed_url("/fapi/v2/balance", "");

        let resp = self
            .http
            .get(&url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await
            .map_err(|e| RelayError::AccountUnavailable(format!("exchange unreachable: {}", e)))?;

        if !resp.status().is_success() {
            let reason = resp.text().await.unwrap_or_default();
            return Err(RelayError::AccountUnavailable(reason));
        }

        resp.json::<Vec<AssetBalance>>()
            .await
            .map_err(|e| RelayError::AccountUnavailable(format!("bad balance response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_hex_hmac_sha256() {
        let client = ExchangeClient::new(ExchangeConfig::new(
            "key".to_string(),
            "secret".to_string(),
        ));
        let sig = client.sign("timestamp=1");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn position_amt_deserializes_signed_string() {
        let raw = r#"[{"symbol":"BTCUSDT","positionAmt":"-0.250"}]"#;
        let positions: Vec<PositionInformation> = serde_json::from_str(raw).unwrap();
        assert_eq!(positions[0].position_amt.to_string(), "-0.250");
    }
}
