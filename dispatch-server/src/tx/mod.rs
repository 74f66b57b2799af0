//! Transaction coordination

mod coordinator;

pub use coordinator::{DEFAULT_TX_TIMEOUT, TxCoordinator};
