//! Modules module
//!
//! Built-in patchable modules: instruments, players, sensors and displays.

pub mod heartbeat;
pub mod keyboard;
pub mod midi_input;
pub mod midi_monitor;
pub mod note;
pub mod staff;

pub use heartbeat::HeartbeatSensor;
pub use keyboard::Keyboard;
pub use midi_input::MidiInput;
pub use midi_monitor::{MidiMonitor, MonitorEntry};
pub use note::{note_name, NoteMessage};
pub use staff::Staff;

use crate::module::ModuleRegistry;

/// Registry holding every built-in module type.
pub fn builtin_registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register::<Keyboard>();
    registry.register::<MidiInput>();
    registry.register::<HeartbeatSensor>();
    registry.register::<Staff>();
    registry.register::<MidiMonitor>();
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleRack, TickContext};
    use crate::patch::{category, PortDescriptor};

    #[test]
    fn test_builtin_registry() {
        let registry = builtin_registry();
        assert_eq!(registry.len(), 5);
        for info in registry.list_modules() {
            assert!(!info.ports.is_empty(), "{} has no ports", info.id);
        }
    }

    #[test]
    fn test_keyboard_plays_into_staff_through_rack() {
        let mut rack = ModuleRack::new();
        let keyboard = rack.add(Keyboard::new());
        let staff = rack.add(Staff::new());
        rack.add_outgoing_link(keyboard, PortDescriptor::receiver(staff, category::MIDI))
            .unwrap();

        rack.module_mut::<Keyboard>(keyboard).unwrap().press(67);
        assert_eq!(rack.tick(&TickContext::new(0.016, 0.016)), 1);

        let notes: Vec<u8> = rack
            .module_ref::<Staff>(staff)
            .unwrap()
            .notes()
            .map(|n| n.note)
            .collect();
        assert_eq!(notes, vec![67]);
    }
}
