//! Staff display module.
//!
//! Shows the most recent notes it was sent, and counts heartbeat pulses so a
//! panel can flash in time.

use std::any::Any;
use std::collections::VecDeque;

use super::note::NoteMessage;
use crate::module::{Module, ModuleInfo, ModuleKind, Outbox, PortSpec};
use crate::patch::category;

/// Notes kept for display.
pub const STAFF_CAPACITY: usize = 16;

static PORTS: [PortSpec; 2] = [
    PortSpec::receiver("midi_in", "Notes", category::MIDI),
    PortSpec::receiver("beat_in", "Beat", category::HEARTBEAT),
];

/// A musical staff.
#[derive(Default)]
pub struct Staff {
    notes: VecDeque<NoteMessage>,
    beats: u64,
    last_bpm: Option<f32>,
}

impl Staff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recent note-ons, oldest first.
    pub fn notes(&self) -> impl Iterator<Item = &NoteMessage> {
        self.notes.iter()
    }

    pub fn beats(&self) -> u64 {
        self.beats
    }

    pub fn last_bpm(&self) -> Option<f32> {
        self.last_bpm
    }

    pub fn clear(&mut self) {
        self.notes.clear();
        self.beats = 0;
        self.last_bpm = None;
    }
}

impl Module for Staff {
    fn info(&self) -> &ModuleInfo {
        static INFO: ModuleInfo = ModuleInfo {
            id: "display.staff",
            name: "Staff",
            kind: ModuleKind::Display,
            description: "Writes incoming notes onto a staff",
            ports: &PORTS,
        };
        &INFO
    }

    fn receive(&mut self, payload: &[f32], category: &str, _outbox: &mut Outbox) {
        match category {
            category::MIDI => {
                let Some(message) = NoteMessage::from_payload(payload) else {
                    return;
                };
                if message.is_note_on() {
                    if self.notes.len() == STAFF_CAPACITY {
                        self.notes.pop_front();
                    }
                    self.notes.push_back(message);
                }
            }
            category::HEARTBEAT => {
                self.beats += 1;
                self.last_bpm = payload.first().copied();
            }
            _ => {}
        }
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
    fn test_records_note_ons_only() {
        let mut staff = Staff::new();
        let mut outbox = Outbox::new();
        staff.receive(&[60.0, 100.0], category::MIDI, &mut outbox);
        staff.receive(&[60.0, 0.0], category::MIDI, &mut outbox);
        staff.receive(&[64.0, 80.0], category::MIDI, &mut outbox);

        let notes: Vec<u8> = staff.notes().map(|n| n.note).collect();
        assert_eq!(notes, vec![60, 64]);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut staff = Staff::new();
        for note in 0..(STAFF_CAPACITY as u8 + 4) {
            staff.receive(&[note as f32, 90.0], category::MIDI, &mut Outbox::new());
        }
        assert_eq!(staff.notes().count(), STAFF_CAPACITY);
        assert_eq!(staff.notes().next().map(|n| n.note), Some(4));
    }

    #[test]
    fn test_counts_beats() {
        let mut staff = Staff::new();
        staff.receive(&[72.0], category::HEARTBEAT, &mut Outbox::new());
        staff.receive(&[75.0], category::HEARTBEAT, &mut Outbox::new());
        assert_eq!(staff.beats(), 2);
        assert_eq!(staff.last_bpm(), Some(75.0));

        staff.clear();
        assert_eq!(staff.beats(), 0);
    }
}
