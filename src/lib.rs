//! Module Patcher Library
//!
//! Core library for patching messages between instrument, sensor and display
//! modules, with connectors drawn between the panels that host them.

pub mod app;
pub mod config;
pub mod engine;
pub mod module;
pub mod modules;
pub mod patch;
pub mod scene;
pub mod widgets;
