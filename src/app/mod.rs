//! Application module
//!
//! Contains the egui desktop host, theme definitions and panel layout
//! mirroring.

pub mod patch_app;
pub mod theme;

pub use patch_app::PatchApp;
