//! MIDI input module.
//!
//! Plays notes from a hardware controller into the rack. The module owns the
//! consumer side of the [`MidiEngine`](crate::engine::MidiEngine) ring buffer
//! and drains it once per tick.

use std::any::Any;

use rtrb::Consumer;

use crate::engine::TimestampedMidiEvent;
use crate::module::{Module, ModuleInfo, ModuleKind, Outbox, PortSpec, TickContext};
use crate::patch::category;

static PORTS: [PortSpec; 1] = [PortSpec::sender("midi_out", "MIDI Out", category::MIDI)];

/// Bridges hardware MIDI into the rack.
///
/// A freshly created module is detached and stays silent until
/// [`attach`](Self::attach) hands it an event consumer.
#[derive(Default)]
pub struct MidiInput {
    consumer: Option<Consumer<TimestampedMidiEvent>>,
    /// Note events forwarded since creation.
    forwarded: u64,
}

impl MidiInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects the module to an event stream, returning the previous one.
    pub fn attach(
        &mut self,
        consumer: Consumer<TimestampedMidiEvent>,
    ) -> Option<Consumer<TimestampedMidiEvent>> {
        self.consumer.replace(consumer)
    }

    /// Disconnects the module, handing back its event stream.
    pub fn detach(&mut self) -> Option<Consumer<TimestampedMidiEvent>> {
        self.consumer.take()
    }

    pub fn is_attached(&self) -> bool {
        self.consumer.is_some()
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }
}

impl Module for MidiInput {
    fn info(&self) -> &ModuleInfo {
        static INFO: ModuleInfo = ModuleInfo {
            id: "player.midi_input",
            name: "MIDI Input",
            kind: ModuleKind::Player,
            description: "Notes from a hardware MIDI controller",
            ports: &PORTS,
        };
        &INFO
    }

    fn poll(&mut self, _context: &TickContext, outbox: &mut Outbox) {
        let Some(consumer) = self.consumer.as_mut() else {
            return;
        };
        while let Ok(timestamped) = consumer.pop() {
            if let Some(payload) = timestamped.event.note_payload() {
                outbox.send(&payload, category::MIDI);
                self.forwarded += 1;
            }
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
    use crate::engine::MidiEvent;
    use rtrb::RingBuffer;

    fn event(bytes: &[u8]) -> TimestampedMidiEvent {
        TimestampedMidiEvent {
            event: MidiEvent::from_bytes(bytes).unwrap(),
            timestamp_us: 0,
        }
    }

    #[test]
    fn test_detached_is_silent() {
        let mut input = MidiInput::new();
        let mut outbox = Outbox::new();
        input.poll(&TickContext::default(), &mut outbox);
        assert!(outbox.is_empty());
        assert!(!input.is_attached());
    }

    #[test]
    fn test_forwards_notes_and_skips_other_events() {
        let (mut producer, consumer) = RingBuffer::new(8);
        let mut input = MidiInput::new();
        assert!(input.attach(consumer).is_none());

        producer.push(event(&[0x90, 60, 100])).unwrap();
        producer.push(event(&[0xB0, 1, 64])).unwrap();
        producer.push(event(&[0x80, 60, 0])).unwrap();

        let mut outbox = Outbox::new();
        input.poll(&TickContext::default(), &mut outbox);
        let payloads: Vec<Vec<f32>> = outbox.into_messages().into_iter().map(|m| m.payload).collect();
        assert_eq!(payloads, vec![vec![60.0, 100.0], vec![60.0, 0.0]]);
        assert_eq!(input.forwarded(), 2);

        assert!(input.detach().is_some());
        assert!(!input.is_attached());
    }
}
