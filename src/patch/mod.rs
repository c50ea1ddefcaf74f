//! Patching between modules.
//!
//! Ports, the connections made between them, the rules deciding which pairs
//! may connect, and the [`Patcher`] running the two-click selection protocol.

pub mod connection;
pub mod error;
pub mod patcher;
pub mod port;
pub mod validation;

pub use connection::Connection;
pub use error::RoutingError;
pub use patcher::{Patcher, PendingSelection, SelectionOutcome};
pub use port::{category, PortDescriptor, PortRole};
pub use validation::{validate_pairing, Pairing, PairingError};
