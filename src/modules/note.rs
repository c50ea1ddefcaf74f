//! Note messages carried on "midi" ports.
//!
//! The payload is `[note, velocity]`; velocity 0 means note off.

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A decoded note payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteMessage {
    pub note: u8,
    pub velocity: u8,
}

impl NoteMessage {
    pub fn on(note: u8, velocity: u8) -> Self {
        Self {
            note: note.min(127),
            velocity: velocity.min(127),
        }
    }

    pub fn off(note: u8) -> Self {
        Self::on(note, 0)
    }

    /// Decodes a payload. Values are rounded and clamped to 0..=127.
    /// Returns None when fewer than two values are present.
    pub fn from_payload(payload: &[f32]) -> Option<Self> {
        let [note, velocity, ..] = payload else {
            return None;
        };
        let to_byte = |v: f32| v.round().clamp(0.0, 127.0) as u8;
        Some(Self {
            note: to_byte(*note),
            velocity: to_byte(*velocity),
        })
    }

    pub fn to_payload(&self) -> [f32; 2] {
        [self.note as f32, self.velocity as f32]
    }

    pub fn is_note_on(&self) -> bool {
        self.velocity > 0
    }

    /// Scientific pitch name, middle C (60) being "C4".
    pub fn name(&self) -> String {
        note_name(self.note)
    }
}

/// Scientific pitch name of a MIDI note number.
pub fn note_name(note: u8) -> String {
    let octave = (note / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES[(note % 12) as usize], octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_payload() {
        assert_eq!(
            NoteMessage::from_payload(&[60.0, 100.0]),
            Some(NoteMessage::on(60, 100))
        );
        assert_eq!(NoteMessage::from_payload(&[60.0]), None);
        assert_eq!(
            NoteMessage::from_payload(&[200.0, -3.0, 9.0]),
            Some(NoteMessage { note: 127, velocity: 0 })
        );
    }

    #[test]
    fn test_note_on_off() {
        assert!(NoteMessage::on(60, 1).is_note_on());
        assert!(!NoteMessage::off(60).is_note_on());
        assert_eq!(NoteMessage::off(64).to_payload(), [64.0, 0.0]);
    }

    #[test]
    fn test_note_names() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(69), "A4");
        assert_eq!(note_name(61), "C#4");
        assert_eq!(note_name(0), "C-1");
    }
}
