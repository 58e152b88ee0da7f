use async_trait::async_trait;
use relaybot_core::{AccountSnapshot, BrokerAdapter, Direction, NetPosition, RelayError};
use relaybot_sizing::SizingPolicy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Mutex;

/// Configuration for the simulated broker.
#[derive(Debug, Clone)]
pub struct SimulatedBrokerConfig {
    /// Starting balance; equity starts equal to it.
    pub initial_balance: Decimal,
    /// Sizing policy applied when a signal carries no fixed quantity.
    pub sizing: SizingPolicy,
    /// When set, every order submission fails with this reason.
    pub reject_orders: Option<String>,
}

impl Default for SimulatedBrokerConfig {
    fn default() -> Self {
        Self {
            initial_balance: dec!(1000),
            sizing: SizingPolicy::EquityDivisor(dec!(10000)),
            reject_orders: None,
        }
    }
}

/// One recorded broker interaction, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedAction {
    /// A market order hit the (simulated) venue.
    Order {
        symbol: String,
        side: Direction,
        quantity: Decimal,
    },
    /// A position query was made (close-side decision).
    PositionQuery { symbol: String },
}

struct Inner {
    account: AccountSnapshot,
    positions: HashMap<String, Decimal>,
    actions: Vec<SimulatedAction>,
}

/// An in-memory broker for tests.
///
/// Tracks signed net positions per symbol and records every interaction so
/// tests can assert both what was submitted and in which order.
pub struct SimulatedBroker {
    config: SimulatedBrokerConfig,
    inner: Mutex<Inner>,
}

impl SimulatedBroker {
    pub fn new(config: SimulatedBrokerConfig) -> Self {
        let account = AccountSnapshot {
            balance: config.initial_balance,
            equity: config.initial_balance,
        };
        Self {
            config,
            inner: Mutex::new(Inner {
                account,
                positions: HashMap::new(),
                actions: Vec::new(),
            }),
        }
    }

    /// Seed a pre-existing net position (positive = long, negative = short).
    pub fn set_position(&self, symbol: &str, net: Decimal) {
        let mut inner = self.inner.lock().unwrap();
        if net.is_zero() {
            inner.positions.remove(symbol);
        } else {
            inner.positions.insert(symbol.to_string(), net);
        }
    }

    pub fn net_position(&self, symbol: &str) -> NetPosition {
        let inner = self.inner.lock().unwrap();
        NetPosition(inner.positions.get(symbol).copied().unwrap_or(Decimal::ZERO))
    }

    /// Everything recorded so far, in order.
    pub fn actions(&self) -> Vec<SimulatedAction> {
        self.inner.lock().unwrap().actions.clone()
    }

    /// Recorded market orders only, in order.
    pub fn orders(&self) -> Vec<SimulatedAction> {
        self.inner
            .lock()
            .unwrap()
            .actions
            .iter()
            .filter(|a| matches!(a, SimulatedAction::Order { .. }))
            .cloned()
            .collect()
    }

    fn submit(&self, symbol: &str, side: Direction, quantity: Decimal) -> Result<(), RelayError> {
        if let Some(reason) = &self.config.reject_orders {
            return Err(RelayError::OrderFailed(reason.clone()));
        }
        let mut inner = self.inner.lock().unwrap();
        let delta = match side {
            Direction::Buy => quantity,
            Direction::Sell => -quantity,
        };
        let net = inner.positions.get(symbol).copied().unwrap_or(Decimal::ZERO) + delta;
        if net.is_zero() {
            inner.positions.remove(symbol);
        } else {
            inner.positions.insert(symbol.to_string(), net);
        }
        tracing::debug!(%symbol, ?side, %quantity, "simulated fill");
        inner.actions.push(SimulatedAction::Order {
            symbol: symbol.to_string(),
            side,
            quantity,
        });
        Ok(())
    }

    fn open(&self, symbol: &str, side: Direction, quantity: Option<Decimal>) -> Result<(), RelayError> {
        self.flatten(symbol)?;
        let qty = match quantity {
            Some(q) => q,
            None => {
                let account = self.inner.lock().unwrap().account;
                self.config.sizing.quantity(&account)?
            }
        };
        self.submit(symbol, side, qty)
    }

    fn flatten(&self, symbol: &str) -> Result<(), RelayError> {
        let net = {
            let mut inner = self.inner.lock().unwrap();
            inner.actions.push(SimulatedAction::PositionQuery {
                symbol: symbol.to_string(),
            });
            NetPosition(inner.positions.get(symbol).copied().unwrap_or(Decimal::ZERO))
        };
        match net.offsetting_order() {
            Some((side, qty)) => self.submit(symbol, side, qty),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BrokerAdapter for SimulatedBroker {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn open_long(&self, symbol: &str, quantity: Option<Decimal>) -> Result<(), RelayError> {
        self.open(symbol, Direction::Buy, quantity)
    }

    async fn open_short(&self, symbol: &str, quantity: Option<Decimal>) -> Result<(), RelayError> {
        self.open(symbol, Direction::Sell, quantity)
    }

    async fn close_position(&self, symbol: &str) -> Result<(), RelayError> {
        self.flatten(symbol)
    }
}
