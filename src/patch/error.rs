//! Errors raised while mutating the routing graph.

use super::port::PortDescriptor;
use crate::module::ModuleId;

/// Failures inside the patcher and the module rack.
///
/// None of these abort the surrounding operation; they are logged where they
/// surface and the protocol carries on.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    /// A connection that should be in the active set is not there.
    #[error("connection {sender} -> {receiver} is missing from the active set")]
    ConnectionNotFound {
        sender: PortDescriptor,
        receiver: PortDescriptor,
    },
    /// A descriptor refers to a module the rack does not hold.
    #[error("{0} is not in the rack")]
    UnknownModule(ModuleId),
}
