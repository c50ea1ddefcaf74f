//! MIDI Monitor module.
//!
//! A utility module that lists the messages it receives. Patch any sender
//! into it to see what is flowing through the rack.

use std::any::Any;
use std::collections::VecDeque;

use super::note::NoteMessage;
use crate::module::{Module, ModuleInfo, ModuleKind, Outbox, PortSpec};
use crate::patch::category;

/// Messages kept in the log.
pub const MONITOR_CAPACITY: usize = 64;

static PORTS: [PortSpec; 2] = [
    PortSpec::receiver("midi_in", "MIDI In", category::MIDI),
    PortSpec::receiver("beat_in", "Beat In", category::HEARTBEAT),
];

/// One logged message.
#[derive(Clone, Debug, PartialEq)]
pub struct MonitorEntry {
    pub category: String,
    pub payload: Vec<f32>,
}

impl MonitorEntry {
    /// A one-line description for display.
    pub fn describe(&self) -> String {
        match self.category.as_str() {
            category::MIDI => match NoteMessage::from_payload(&self.payload) {
                Some(m) if m.is_note_on() => format!("Note On  {} vel {}", m.name(), m.velocity),
                Some(m) => format!("Note Off {}", m.name()),
                None => format!("midi {:?}", self.payload),
            },
            category::HEARTBEAT => match self.payload.first() {
                Some(bpm) => format!("Beat {:.0} bpm", bpm),
                None => "Beat".to_string(),
            },
            other => format!("{} {:?}", other, self.payload),
        }
    }
}

/// A monitor that logs incoming messages.
#[derive(Default)]
pub struct MidiMonitor {
    entries: VecDeque<MonitorEntry>,
    /// Messages received since creation, including ones no longer logged.
    total: u64,
}

impl MidiMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logged entries, newest last.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &MonitorEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Module for MidiMonitor {
    fn info(&self) -> &ModuleInfo {
        static INFO: ModuleInfo = ModuleInfo {
            id: "util.midi_monitor",
            name: "MIDI Monitor",
            kind: ModuleKind::Utility,
            description: "Display incoming messages",
            ports: &PORTS,
        };
        &INFO
    }

    fn receive(&mut self, payload: &[f32], category: &str, _outbox: &mut Outbox) {
        if self.entries.len() == MONITOR_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(MonitorEntry {
            category: category.to_string(),
            payload: payload.to_vec(),
        });
        self.total += 1;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midi_monitor_info() {
        let monitor = MidiMonitor::new();
        assert_eq!(monitor.info().id, "util.midi_monitor");
        assert_eq!(monitor.info().name, "MIDI Monitor");
        assert_eq!(monitor.info().kind, ModuleKind::Utility);
    }

    #[test]
    fn test_log_is_bounded() {
        let mut monitor = MidiMonitor::new();
        for i in 0..(MONITOR_CAPACITY + 10) {
            monitor.receive(&[i as f32, 1.0], category::MIDI, &mut Outbox::new());
        }
        assert_eq!(monitor.len(), MONITOR_CAPACITY);
        assert_eq!(monitor.total(), (MONITOR_CAPACITY + 10) as u64);
        assert_eq!(monitor.entries().next().unwrap().payload[0], 10.0);
    }

    #[test]
    fn test_describe() {
        let entry = |category: &str, payload: &[f32]| MonitorEntry {
            category: category.to_string(),
            payload: payload.to_vec(),
        };
        assert_eq!(entry("midi", &[60.0, 100.0]).describe(), "Note On  C4 vel 100");
        assert_eq!(entry("midi", &[60.0, 0.0]).describe(), "Note Off C4");
        assert_eq!(entry("heartbeat", &[72.0]).describe(), "Beat 72 bpm");
    }

    #[test]
    fn test_midi_monitor_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<MidiMonitor>();
    }
}
