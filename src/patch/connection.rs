//! Connections (patches) between a sender and a receiver port.

use super::port::PortDescriptor;
use crate::scene::{ConnectorHandle, PanelId};

/// An active directed edge from a sender port to a receiver port.
///
/// Two connections are equal when their sender and receiver descriptors are
/// pairwise equal; the connector handle does not take part in equality.
#[derive(Clone, Debug)]
pub struct Connection {
    /// Sending endpoint.
    pub sender: PortDescriptor,
    /// Receiving endpoint.
    pub receiver: PortDescriptor,
    /// Visual connector, present only when both endpoints have a panel.
    pub connector: Option<ConnectorHandle>,
}

impl Connection {
    /// Creates a connection without a visual connector.
    pub fn new(sender: PortDescriptor, receiver: PortDescriptor) -> Self {
        Self {
            sender,
            receiver,
            connector: None,
        }
    }

    /// True if this connection joins exactly `sender` to `receiver`.
    pub fn links(&self, sender: &PortDescriptor, receiver: &PortDescriptor) -> bool {
        self.sender == *sender && self.receiver == *receiver
    }

    /// True if either endpoint was raised from `panel`.
    pub fn touches_panel(&self, panel: PanelId) -> bool {
        self.sender.is_on_panel(panel) || self.receiver.is_on_panel(panel)
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.links(&other.sender, &other.receiver)
    }
}

impl Eq for Connection {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleId;
    use crate::patch::port::category;
    use crate::scene::ControlId;

    fn pair() -> (PortDescriptor, PortDescriptor) {
        (
            PortDescriptor::sender(ModuleId(1), category::MIDI).on(PanelId(1), ControlId(1)),
            PortDescriptor::receiver(ModuleId(2), category::MIDI).on(PanelId(2), ControlId(2)),
        )
    }

    #[test]
    fn test_equality_ignores_connector() {
        let (sender, receiver) = pair();
        let plain = Connection::new(sender.clone(), receiver.clone());
        let drawn = Connection {
            sender,
            receiver,
            connector: Some(ConnectorHandle(5)),
        };
        assert_eq!(plain, drawn);
    }

    #[test]
    fn test_equality_is_componentwise() {
        let (sender, receiver) = pair();
        let a = Connection::new(sender.clone(), receiver.clone());
        let other_receiver = PortDescriptor::receiver(ModuleId(3), category::MIDI);
        let b = Connection::new(sender, other_receiver);
        assert_ne!(a, b);
        assert!(a.links(&a.sender, &receiver));
    }

    #[test]
    fn test_touches_panel() {
        let (sender, receiver) = pair();
        let connection = Connection::new(sender, receiver);
        assert!(connection.touches_panel(PanelId(1)));
        assert!(connection.touches_panel(PanelId(2)));
        assert!(!connection.touches_panel(PanelId(3)));
    }
}
