pub mod simulated;

pub use simulated::{SimulatedAction, SimulatedBroker, SimulatedBrokerConfig};
