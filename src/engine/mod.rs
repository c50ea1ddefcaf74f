//! Engine module
//!
//! Hardware MIDI input: device enumeration, connection and the lock-free
//! hand-off of events to the UI thread.

pub mod midi_engine;

pub use midi_engine::{
    MidiDeviceInfo, MidiEngine, MidiError, MidiEvent, TimestampedMidiEvent,
    DEFAULT_MIDI_BUFFER_SIZE,
};
