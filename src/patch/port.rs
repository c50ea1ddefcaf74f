//! Port descriptors.
//!
//! A port descriptor names one endpoint of a potential patch: which module,
//! which message category, which role, and optionally the panel and control
//! the user clicked to raise it.

use std::fmt;

use crate::module::ModuleId;
use crate::scene::{ControlId, PanelId};

/// Well-known message categories.
pub mod category {
    /// Note messages, payload `[note, velocity]` (velocity 0 = note off).
    pub const MIDI: &str = "midi";
    /// Pulse messages, payload `[beats_per_minute]`.
    pub const HEARTBEAT: &str = "heartbeat";
}

/// Whether a port emits or consumes messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PortRole {
    /// The port sends messages to whatever it is patched into.
    Sender,
    /// The port receives messages from whatever is patched into it.
    Receiver,
}

impl PortRole {
    /// Returns a human-readable name for the role.
    pub fn name(&self) -> &'static str {
        match self {
            PortRole::Sender => "sender",
            PortRole::Receiver => "receiver",
        }
    }

    /// The role a port must have to pair with this one.
    pub fn opposite(&self) -> PortRole {
        match self {
            PortRole::Sender => PortRole::Receiver,
            PortRole::Receiver => PortRole::Sender,
        }
    }
}

/// One endpoint of a potential patch.
///
/// Equality is structural over all five fields, so the same module exposing
/// the same category through two different controls yields two distinct
/// descriptors, and a send and a receive port tagged alike never compare
/// equal because their roles differ.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PortDescriptor {
    /// Module the port belongs to.
    pub module: ModuleId,
    /// Message category the port carries.
    pub category: String,
    /// Whether the port sends or receives.
    pub role: PortRole,
    /// Panel that raised the selection, if any.
    pub panel: Option<PanelId>,
    /// Control on that panel, if any.
    pub control: Option<ControlId>,
}

impl PortDescriptor {
    /// Creates a descriptor with no visual anchor.
    pub fn new(module: ModuleId, category: impl Into<String>, role: PortRole) -> Self {
        Self {
            module,
            category: category.into(),
            role,
            panel: None,
            control: None,
        }
    }

    /// Creates a sender descriptor with no visual anchor.
    pub fn sender(module: ModuleId, category: impl Into<String>) -> Self {
        Self::new(module, category, PortRole::Sender)
    }

    /// Creates a receiver descriptor with no visual anchor.
    pub fn receiver(module: ModuleId, category: impl Into<String>) -> Self {
        Self::new(module, category, PortRole::Receiver)
    }

    /// Anchors the descriptor to a control on a panel.
    pub fn on(mut self, panel: PanelId, control: ControlId) -> Self {
        self.panel = Some(panel);
        self.control = Some(control);
        self
    }

    /// Anchors the descriptor to a panel without a specific control.
    pub fn with_panel(mut self, panel: PanelId) -> Self {
        self.panel = Some(panel);
        self
    }

    pub fn is_sender(&self) -> bool {
        self.role == PortRole::Sender
    }

    pub fn is_receiver(&self) -> bool {
        self.role == PortRole::Receiver
    }

    /// True if this descriptor was raised from `panel`.
    pub fn is_on_panel(&self, panel: PanelId) -> bool {
        self.panel == Some(panel)
    }
}

impl fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.module, self.category, self.role.name())?;
        if let Some(control) = self.control {
            write!(f, " @{}", control)?;
        }
        Ok(())
    }
}
