//! Keyboard instrument module.
//!
//! A playable keyboard. Keys pressed on its panel go out on the MIDI sender
//! port; notes arriving on its MIDI receiver port light up the matching keys.

use std::any::Any;
use std::collections::{BTreeSet, VecDeque};

use super::note::NoteMessage;
use crate::module::{Module, ModuleInfo, ModuleKind, Outbox, PortSpec, TickContext};
use crate::patch::category;

/// Velocity used for notes played on the panel.
pub const DEFAULT_VELOCITY: u8 = 100;

static PORTS: [PortSpec; 2] = [
    PortSpec::sender("midi_out", "MIDI Out", category::MIDI),
    PortSpec::receiver("midi_in", "MIDI In", category::MIDI),
];

/// A keyboard instrument.
///
/// # Ports
///
/// - **MIDI Out** (sender, "midi"): notes played on the keyboard.
/// - **MIDI In** (receiver, "midi"): notes to display on the keys.
pub struct Keyboard {
    /// Notes waiting to be sent on the next tick.
    queued: VecDeque<NoteMessage>,
    /// Keys held down on this keyboard.
    held: BTreeSet<u8>,
    /// Keys lit by incoming notes.
    lit: BTreeSet<u8>,
    velocity: u8,
}

impl Keyboard {
    pub fn new() -> Self {
        Self {
            queued: VecDeque::new(),
            held: BTreeSet::new(),
            lit: BTreeSet::new(),
            velocity: DEFAULT_VELOCITY,
        }
    }

    /// Presses a key. Pressing a key that is already down does nothing.
    pub fn press(&mut self, note: u8) {
        if self.held.insert(note) {
            self.queued.push_back(NoteMessage::on(note, self.velocity));
        }
    }

    /// Releases a key. Releasing a key that is not down does nothing.
    pub fn release(&mut self, note: u8) {
        if self.held.remove(&note) {
            self.queued.push_back(NoteMessage::off(note));
        }
    }

    /// Releases every held key.
    pub fn release_all(&mut self) {
        let held: Vec<u8> = self.held.iter().copied().collect();
        for note in held {
            self.release(note);
        }
    }

    pub fn set_velocity(&mut self, velocity: u8) {
        self.velocity = velocity.clamp(1, 127);
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn held_notes(&self) -> impl Iterator<Item = u8> + '_ {
        self.held.iter().copied()
    }

    pub fn is_lit(&self, note: u8) -> bool {
        self.lit.contains(&note)
    }

    /// Keys to highlight: held locally or lit remotely.
    pub fn active_notes(&self) -> Vec<u8> {
        self.held.union(&self.lit).copied().collect()
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for Keyboard {
    fn info(&self) -> &ModuleInfo {
        static INFO: ModuleInfo = ModuleInfo {
            id: "instrument.keyboard",
            name: "Keyboard",
            kind: ModuleKind::Instrument,
            description: "Playable keyboard that sends and displays notes",
            ports: &PORTS,
        };
        &INFO
    }

    fn receive(&mut self, payload: &[f32], category: &str, _outbox: &mut Outbox) {
        if category != category::MIDI {
            return;
        }
        let Some(message) = NoteMessage::from_payload(payload) else {
            log::debug!("Keyboard ignored malformed payload {:?}", payload);
            return;
        };
        if message.is_note_on() {
            self.lit.insert(message.note);
        } else {
            self.lit.remove(&message.note);
        }
    }

    fn poll(&mut self, _context: &TickContext, outbox: &mut Outbox) {
        for message in self.queued.drain(..) {
            outbox.send(&message.to_payload(), category::MIDI);
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

    fn poll(keyboard: &mut Keyboard) -> Vec<Vec<f32>> {
        let mut outbox = Outbox::new();
        keyboard.poll(&TickContext::default(), &mut outbox);
        outbox.into_messages().into_iter().map(|m| m.payload).collect()
    }

    #[test]
    fn test_keyboard_info() {
        let keyboard = Keyboard::new();
        assert_eq!(keyboard.info().id, "instrument.keyboard");
        assert_eq!(keyboard.info().kind, ModuleKind::Instrument);
        assert_eq!(keyboard.info().ports.len(), 2);
    }

    #[test]
    fn test_press_and_release_emit_on_poll() {
        let mut keyboard = Keyboard::new();
        keyboard.press(60);
        keyboard.press(60);
        keyboard.release(60);

        assert_eq!(poll(&mut keyboard), vec![vec![60.0, 100.0], vec![60.0, 0.0]]);
        assert!(poll(&mut keyboard).is_empty());
    }

    #[test]
    fn test_release_without_press_is_silent() {
        let mut keyboard = Keyboard::new();
        keyboard.release(62);
        assert!(poll(&mut keyboard).is_empty());
    }

    #[test]
    fn test_incoming_notes_light_keys() {
        let mut keyboard = Keyboard::new();
        let mut outbox = Outbox::new();
        keyboard.receive(&[64.0, 90.0], category::MIDI, &mut outbox);
        assert!(keyboard.is_lit(64));
        keyboard.receive(&[64.0, 0.0], category::MIDI, &mut outbox);
        assert!(!keyboard.is_lit(64));
        keyboard.receive(&[64.0, 90.0], category::HEARTBEAT, &mut outbox);
        assert!(!keyboard.is_lit(64));
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_active_notes_merge_held_and_lit() {
        let mut keyboard = Keyboard::new();
        keyboard.press(60);
        keyboard.receive(&[67.0, 80.0], category::MIDI, &mut Outbox::new());
        assert_eq!(keyboard.active_notes(), vec![60, 67]);

        keyboard.release_all();
        assert_eq!(keyboard.active_notes(), vec![67]);
    }

    #[test]
    fn test_velocity_is_clamped() {
        let mut keyboard = Keyboard::new();
        keyboard.set_velocity(0);
        assert_eq!(keyboard.velocity(), 1);
        keyboard.set_velocity(200);
        keyboard.press(48);
        assert_eq!(poll(&mut keyboard), vec![vec![48.0, 127.0]]);
    }
}
