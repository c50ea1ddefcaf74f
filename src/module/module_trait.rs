//! The core Module trait and supporting types.
//!
//! This module defines the interface every patchable module implements:
//! instruments, players, sensors and displays all look the same to the
//! rack and the patcher.

use std::any::Any;
use std::fmt;

use egui::Color32;

use super::context::TickContext;
use crate::patch::PortRole;

/// Opaque, stable handle of a module in the rack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(pub u64);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

/// Kind of a module, used for organization and UI coloring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    /// Playable instrument simulators (keyboards, pads).
    Instrument,
    /// Message players (MIDI input, sequencers).
    Player,
    /// Sensors producing measurements (heartbeat, motion).
    Sensor,
    /// Visual consumers (staves, meters).
    Display,
    /// Debugging and routing helpers.
    Utility,
}

impl ModuleKind {
    /// Returns the header color associated with this kind.
    pub fn color(&self) -> Color32 {
        match self {
            ModuleKind::Instrument => Color32::from_rgb(66, 165, 245), // Blue
            ModuleKind::Player => Color32::from_rgb(186, 104, 200),    // Purple
            ModuleKind::Sensor => Color32::from_rgb(239, 83, 80),      // Red
            ModuleKind::Display => Color32::from_rgb(129, 199, 132),   // Green
            ModuleKind::Utility => Color32::from_rgb(158, 158, 158),   // Gray
        }
    }

    /// Returns a human-readable name for the kind.
    pub fn name(&self) -> &'static str {
        match self {
            ModuleKind::Instrument => "Instrument",
            ModuleKind::Player => "Player",
            ModuleKind::Sensor => "Sensor",
            ModuleKind::Display => "Display",
            ModuleKind::Utility => "Utility",
        }
    }
}

/// A port a module exposes on its panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortSpec {
    /// Identifier unique within the module.
    pub id: &'static str,
    /// Label shown on the port control.
    pub name: &'static str,
    /// Message category the port carries.
    pub category: &'static str,
    /// Whether the port sends or receives.
    pub role: PortRole,
}

impl PortSpec {
    /// Declares a sending port.
    pub const fn sender(id: &'static str, name: &'static str, category: &'static str) -> Self {
        Self {
            id,
            name,
            category,
            role: PortRole::Sender,
        }
    }

    /// Declares a receiving port.
    pub const fn receiver(id: &'static str, name: &'static str, category: &'static str) -> Self {
        Self {
            id,
            name,
            category,
            role: PortRole::Receiver,
        }
    }
}

/// Static information about a module type.
#[derive(Clone, Debug)]
pub struct ModuleInfo {
    /// Unique identifier for the module type (e.g., "instrument.keyboard").
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// The kind this module belongs to.
    pub kind: ModuleKind,
    /// A brief description of what the module does.
    pub description: &'static str,
    /// Ports shown on the module's panel.
    pub ports: &'static [PortSpec],
}

impl ModuleInfo {
    /// True if the module has at least one port with `role`.
    pub fn has_role(&self, role: PortRole) -> bool {
        self.ports.iter().any(|p| p.role == role)
    }
}

/// A message emitted by a module.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub payload: Vec<f32>,
    pub category: String,
}

/// Collects what a module sends while it is being called.
///
/// The rack delivers everything in the outbox as soon as the call returns,
/// before the send that triggered the call completes.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<Message>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `payload` for every outgoing link carrying `category`.
    pub fn send(&mut self, payload: &[f32], category: &str) {
        self.messages.push(Message {
            payload: payload.to_vec(),
            category: category.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Consumes the outbox, yielding messages in the order they were sent.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

/// The trait every patchable module implements.
///
/// A module can be a message source, a sink, or both. Which ports it exposes
/// is described by [`ModuleInfo::ports`]; where its messages go is decided by
/// the patcher and stored by the rack, never by the module itself.
///
/// # Example
///
/// ```ignore
/// struct Echo;
///
/// impl Module for Echo {
///     fn info(&self) -> &ModuleInfo { &ECHO_INFO }
///
///     fn receive(&mut self, payload: &[f32], category: &str, outbox: &mut Outbox) {
///         outbox.send(payload, category);
///     }
///
///     fn as_any(&self) -> &dyn Any { self }
///     fn as_any_mut(&mut self) -> &mut dyn Any { self }
/// }
/// ```
pub trait Module: Send + 'static {
    /// Returns static information about this module.
    fn info(&self) -> &ModuleInfo;

    /// Handles a message delivered through one of the module's receive
    /// ports. Anything sent into `outbox` is routed onward immediately.
    ///
    /// The default implementation ignores the message.
    fn receive(&mut self, _payload: &[f32], _category: &str, _outbox: &mut Outbox) {}

    /// Called once per frame so sources can emit on their own schedule.
    ///
    /// The default implementation does nothing.
    fn poll(&mut self, _context: &TickContext, _outbox: &mut Outbox) {}

    /// Upcast used by hosts that need the concrete module type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast used by hosts that need the concrete module type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::category;

    #[test]
    fn test_module_id_display() {
        assert_eq!(ModuleId(12).to_string(), "module#12");
    }

    #[test]
    fn test_kind_names_and_colors_distinct() {
        let kinds = [
            ModuleKind::Instrument,
            ModuleKind::Player,
            ModuleKind::Sensor,
            ModuleKind::Display,
            ModuleKind::Utility,
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a.color(), b.color());
                assert_ne!(a.name(), b.name());
            }
        }
    }

    #[test]
    fn test_port_spec_constructors() {
        const OUT: PortSpec = PortSpec::sender("out", "Out", category::MIDI);
        const IN: PortSpec = PortSpec::receiver("in", "In", category::MIDI);
        assert_eq!(OUT.role, PortRole::Sender);
        assert_eq!(IN.role, PortRole::Receiver);
        assert_eq!(OUT.category, "midi");
    }

    #[test]
    fn test_outbox_preserves_order() {
        let mut outbox = Outbox::new();
        assert!(outbox.is_empty());
        outbox.send(&[1.0], category::MIDI);
        outbox.send(&[2.0], category::HEARTBEAT);
        assert_eq!(outbox.len(), 2);

        let messages = outbox.into_messages();
        assert_eq!(messages[0].payload, vec![1.0]);
        assert_eq!(messages[1].category, "heartbeat");
    }

    #[test]
    fn test_module_info_has_role() {
        static PORTS: [PortSpec; 1] = [PortSpec::receiver("in", "In", category::MIDI)];
        let info = ModuleInfo {
            id: "test.sink",
            name: "Sink",
            kind: ModuleKind::Display,
            description: "",
            ports: &PORTS,
        };
        assert!(info.has_role(PortRole::Receiver));
        assert!(!info.has_role(PortRole::Sender));
    }
}
