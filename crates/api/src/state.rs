use relaybot_core::{BrokerAdapter, RelayError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Maps broker codes to adapter instances.
///
/// Adapters are constructed once at startup and shared across requests; the
/// lookup itself is pure.
#[derive(Default)]
pub struct BrokerRegistry {
    brokers: HashMap<String, Arc<dyn BrokerAdapter>>,
}

impl BrokerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, code: &str, broker: Arc<dyn BrokerAdapter>) -> Self {
        self.brokers.insert(code.to_string(), broker);
        self
    }

    pub fn get(&self, code: &str) -> Result<Arc<dyn BrokerAdapter>, RelayError> {
        self.brokers
            .get(code)
            .cloned()
            .ok_or_else(|| RelayError::UnknownBrokerCode(code.to_string()))
    }
}

/// Shared application state accessible by all route handlers.
pub struct AppState {
    pub registry: BrokerRegistry,
    /// Per-broker-per-symbol locks: a close-then-open sequence is not atomic
    /// at the venue, so racing signals on one symbol are serialized here.
    symbol_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AppState {
    pub fn new(registry: BrokerRegistry) -> Self {
        Self {
            registry,
            symbol_locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn symbol_lock(&self, broker_code: &str, symbol: &str) -> Arc<Mutex<()>> {
        let key = format!("{}:{}", broker_code, symbol);
        let mut locks = self.symbol_locks.lock().await;
        locks.entry(key).or_default().clone()
    }
}
