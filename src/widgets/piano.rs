//! Playable one-octave piano widget.
//!
//! Draws the keys of one octave, highlights active notes and reports which
//! key the pointer is holding down so the Keyboard module can be played with
//! the mouse.

use eframe::egui::{self, Color32, Pos2, Rect, Response, Sense, Stroke, Ui, Vec2};

/// Semitones of the white keys, left to right.
const WHITE_KEYS: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
/// Semitones of the black keys and their centers in white-key widths.
const BLACK_KEYS: [(u8, f32); 5] = [(1, 1.0), (3, 2.0), (6, 4.0), (8, 5.0), (10, 6.0)];
/// Black key size relative to white keys.
const BLACK_WIDTH: f32 = 0.6;
const BLACK_HEIGHT: f32 = 0.6;

/// Configuration for the piano widget.
#[derive(Clone, Debug)]
pub struct PianoConfig {
    pub width: f32,
    pub height: f32,
    pub white_key_color: Color32,
    pub black_key_color: Color32,
    /// Fill of keys that are sounding.
    pub active_color: Color32,
    /// Fill of the key under a pressed pointer.
    pub pressed_color: Color32,
}

impl Default for PianoConfig {
    fn default() -> Self {
        Self {
            width: 210.0,
            height: 60.0,
            white_key_color: Color32::from_rgb(240, 240, 235), // Off-white
            black_key_color: Color32::from_rgb(30, 30, 35),    // Near-black
            active_color: Color32::from_rgb(186, 104, 200),    // Purple, like MIDI
            pressed_color: Color32::from_rgb(100, 180, 255),
        }
    }
}

impl PianoConfig {
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// What the piano shows.
#[derive(Clone, Debug, Default)]
pub struct PianoData {
    /// MIDI notes currently sounding; any octave lights the matching key.
    pub active_notes: Vec<u8>,
    /// MIDI note of the leftmost C.
    pub base_note: u8,
}

impl PianoData {
    pub fn new(active_notes: Vec<u8>, base_note: u8) -> Self {
        Self {
            active_notes,
            base_note,
        }
    }

    fn is_semitone_active(&self, semitone: u8) -> bool {
        self.active_notes.iter().any(|&note| note % 12 == semitone)
    }
}

/// Result of drawing the piano.
pub struct PianoOutput {
    pub response: Response,
    /// MIDI note under the pointer while the primary button is held on it.
    pub held_note: Option<u8>,
}

/// Returns the semitone of the key at `pos`, relative to the top-left of a
/// keyboard `size` large. Black keys win where they overlap white keys.
pub fn key_at(pos: Vec2, size: Vec2) -> Option<u8> {
    if pos.x < 0.0 || pos.y < 0.0 || pos.x >= size.x || pos.y >= size.y {
        return None;
    }
    let white_width = size.x / WHITE_KEYS.len() as f32;

    if pos.y < size.y * BLACK_HEIGHT {
        let half = white_width * BLACK_WIDTH / 2.0;
        for &(semitone, center) in &BLACK_KEYS {
            let cx = center * white_width;
            if pos.x >= cx - half && pos.x < cx + half {
                return Some(semitone);
            }
        }
    }

    let index = ((pos.x / white_width) as usize).min(WHITE_KEYS.len() - 1);
    Some(WHITE_KEYS[index])
}

/// Draws a playable octave.
///
/// # Example
/// ```ignore
/// let data = PianoData::new(keyboard.active_notes(), 60);
/// let output = piano(ui, &data, &PianoConfig::default());
/// if let Some(note) = output.held_note {
///     keyboard.press(note);
/// }
/// ```
pub fn piano(ui: &mut Ui, data: &PianoData, config: &PianoConfig) -> PianoOutput {
    let size = Vec2::new(config.width, config.height);
    let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());

    let held_semitone = if response.is_pointer_button_down_on() {
        response
            .interact_pointer_pos()
            .and_then(|pos| key_at(pos - rect.min, size))
    } else {
        None
    };

    if ui.is_rect_visible(rect) {
        let painter = ui.painter();
        let white_width = config.width / WHITE_KEYS.len() as f32;
        let fill = |semitone: u8, idle: Color32| {
            if held_semitone == Some(semitone) {
                config.pressed_color
            } else if data.is_semitone_active(semitone) {
                config.active_color
            } else {
                idle
            }
        };

        for (i, &semitone) in WHITE_KEYS.iter().enumerate() {
            let key = Rect::from_min_size(
                Pos2::new(rect.left() + i as f32 * white_width, rect.top()),
                Vec2::new(white_width - 1.0, config.height),
            );
            painter.rect_filled(key, 2.0, fill(semitone, config.white_key_color));
            painter.rect_stroke(key, 2.0, Stroke::new(0.5, Color32::from_gray(120)));
        }

        let black_size = Vec2::new(white_width * BLACK_WIDTH, config.height * BLACK_HEIGHT);
        for &(semitone, center) in &BLACK_KEYS {
            let key = Rect::from_min_size(
                Pos2::new(
                    rect.left() + center * white_width - black_size.x / 2.0,
                    rect.top(),
                ),
                black_size,
            );
            painter.rect_filled(key, 1.5, fill(semitone, config.black_key_color));
        }

        painter.text(
            Pos2::new(rect.left() + white_width / 2.0, rect.bottom() - 8.0),
            egui::Align2::CENTER_CENTER,
            crate::modules::note_name(data.base_note),
            egui::FontId::proportional(9.0),
            Color32::from_gray(110),
        );
    }

    PianoOutput {
        held_note: held_semitone.map(|s| data.base_note.saturating_add(s).min(127)),
        response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: Vec2 = Vec2::new(70.0, 50.0);

    #[test]
    fn test_white_keys_in_lower_half() {
        // Each white key is 10 wide
        assert_eq!(key_at(Vec2::new(5.0, 40.0), SIZE), Some(0));
        assert_eq!(key_at(Vec2::new(15.0, 40.0), SIZE), Some(2));
        assert_eq!(key_at(Vec2::new(65.0, 40.0), SIZE), Some(11));
    }

    #[test]
    fn test_black_keys_win_in_upper_part() {
        // C# is centered on the C/D boundary at x = 10
        assert_eq!(key_at(Vec2::new(10.0, 10.0), SIZE), Some(1));
        assert_eq!(key_at(Vec2::new(60.0, 10.0), SIZE), Some(10));
        // No black key between E and F
        assert_eq!(key_at(Vec2::new(25.0, 10.0), SIZE), Some(4));
    }

    #[test]
    fn test_outside_is_none() {
        assert_eq!(key_at(Vec2::new(-1.0, 10.0), SIZE), None);
        assert_eq!(key_at(Vec2::new(10.0, 50.0), SIZE), None);
        assert_eq!(key_at(Vec2::new(70.0, 10.0), SIZE), None);
    }

    #[test]
    fn test_active_notes_wrap_octaves() {
        let data = PianoData::new(vec![48, 64], 60);
        assert!(data.is_semitone_active(0));
        assert!(data.is_semitone_active(4));
        assert!(!data.is_semitone_active(2));
    }

    #[test]
    fn test_config_with_size() {
        let config = PianoConfig::default().with_size(140.0, 45.0);
        assert_eq!(config.width, 140.0);
        assert_eq!(config.height, 45.0);
    }
}
