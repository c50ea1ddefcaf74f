//! Widgets module
//!
//! Custom UI controls for module panels.

pub mod piano;

pub use piano::{key_at, piano, PianoConfig, PianoData, PianoOutput};
