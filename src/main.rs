//! Module Patcher - click two ports to route messages between modules
//!
//! Entry point for the application.

use eframe::egui;

use module_patcher::app::PatchApp;
use module_patcher::config;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::load_or_default();
    log::info!(
        "Starting Module Patcher (heartbeat {} bpm, self-patching {})",
        config.heartbeat_bpm,
        if config.patcher.allow_self_patch { "on" } else { "off" }
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title("Module Patcher"),
        ..Default::default()
    };

    eframe::run_native(
        "Module Patcher",
        options,
        Box::new(move |_cc| Ok(Box::new(PatchApp::new(config)))),
    )
}
