//! Main application struct for the Module Patcher
//!
//! Hosts the rack in an egui window. Every module gets a floating panel
//! with one toggle per port; clicking a sender and a receiver patches them,
//! and active patches are drawn as connectors between the two ports.
//!
//! Window positions are mirrored into a [`SceneLayout`] every frame, so the
//! patcher sees panels move and disappear exactly as it would in a 3D scene.

use std::time::Duration;

use eframe::egui::{self, Align, Layout, Pos2, RichText, Vec2};
use nalgebra::{Isometry3, Point3, Vector3};
use rtrb::Consumer;

use super::theme;
use crate::config::Config;
use crate::engine::{MidiEngine, TimestampedMidiEvent};
use crate::module::{ModuleId, ModuleRack, ModuleRegistry, TickContext};
use crate::modules::heartbeat::{MAX_BPM, MIN_BPM};
use crate::modules::{self, HeartbeatSensor, Keyboard, MidiInput, MidiMonitor, Staff};
use crate::patch::{Patcher, PortDescriptor, PortRole, SelectionOutcome};
use crate::scene::{ControlId, PanelId, SceneLayout};
use crate::widgets::{piano, PianoConfig, PianoData};

/// Screen points per world unit.
pub const PIXELS_PER_UNIT: f32 = 1000.0;

/// Leftmost note of the panel piano (C4).
const PIANO_BASE_NOTE: u8 = 60;

/// Longest frame step fed to the rack, in seconds.
const MAX_FRAME_STEP: f32 = 0.1;

/// Maps a screen position to world space.
pub fn screen_to_world(pos: Pos2) -> Point3<f32> {
    Point3::new(pos.x / PIXELS_PER_UNIT, pos.y / PIXELS_PER_UNIT, 0.0)
}

/// Maps a world position onto the screen plane.
pub fn world_to_screen(point: &Point3<f32>) -> Pos2 {
    Pos2::new(point.x * PIXELS_PER_UNIT, point.y * PIXELS_PER_UNIT)
}

/// Grab handle for a window whose top-left corner sits at `point`.
fn placed_at(point: Point3<f32>) -> Isometry3<f32> {
    Isometry3::translation(point.x, point.y, point.z)
}

/// A module's window.
struct ModulePanel {
    module: ModuleId,
    panel: PanelId,
    title: String,
    /// One control per port, in port order.
    controls: Vec<ControlId>,
    open: bool,
    spawn: Pos2,
    /// Window origin as of the last frame.
    origin: Option<Pos2>,
    /// Piano key held with the mouse (keyboards only).
    held_note: Option<u8>,
}

/// What happened to the panels this frame.
#[derive(Default)]
struct PanelEvents {
    selections: Vec<PortDescriptor>,
    moved: Vec<PanelId>,
    closed: Vec<PanelId>,
}

/// Actions collected from the toolbar for deferred execution
#[derive(Default)]
struct ToolbarActions {
    add_module: Option<&'static str>,
    connectors_visible: Option<bool>,
    clear_patches: bool,
    cancel_selection: bool,
    /// `Some(None)` disconnects.
    midi_device: Option<Option<usize>>,
}

/// Main application state for the Module Patcher
pub struct PatchApp {
    config: Config,
    registry: ModuleRegistry,
    rack: ModuleRack,
    scene: SceneLayout,
    patcher: Patcher,
    panels: Vec<ModulePanel>,

    /// Hardware MIDI, if the subsystem came up.
    midi: Option<MidiEngine>,
    /// Event stream waiting for a MIDI Input module to claim it.
    midi_events: Option<Consumer<TimestampedMidiEvent>>,
    midi_error: Option<String>,

    last_outcome: Option<SelectionOutcome>,
    clock: TickContext,
    theme_applied: bool,
}

impl PatchApp {
    /// Create the application with a starter set of modules.
    pub fn new(config: Config) -> Self {
        let (midi, midi_events, midi_error) = match MidiEngine::new() {
            Ok((mut engine, consumer)) => {
                let mut error = None;
                if let Some(prefix) = config.midi_device.as_deref() {
                    if let Err(e) = engine.connect_by_name(prefix) {
                        log::warn!("Could not open MIDI device '{}': {}", prefix, e);
                        error = Some(e.to_string());
                    }
                }
                (Some(engine), Some(consumer), error)
            }
            Err(e) => {
                log::warn!("MIDI unavailable: {}", e);
                (None, None, Some(e.to_string()))
            }
        };

        let mut rack = ModuleRack::new();
        rack.set_max_dispatch_depth(config.patcher.max_dispatch_depth);
        rack.set_max_deliveries_per_send(config.patcher.max_deliveries_per_send);

        let mut app = Self {
            registry: modules::builtin_registry(),
            rack,
            scene: SceneLayout::new(),
            patcher: Patcher::new(config.patcher.clone()),
            panels: Vec::new(),
            midi,
            midi_events,
            midi_error,
            last_outcome: None,
            clock: TickContext::default(),
            theme_applied: false,
            config,
        };

        for type_id in [
            "instrument.keyboard",
            "sensor.heartbeat",
            "display.staff",
            "util.midi_monitor",
        ] {
            app.add_module(type_id);
        }
        if app.midi_events.is_some() {
            app.add_module("player.midi_input");
        }
        app
    }

    /// Instantiate a module type and open a panel for it.
    fn add_module(&mut self, type_id: &str) {
        let Some(module) = self.registry.create(type_id) else {
            log::warn!("Unknown module type '{}'", type_id);
            return;
        };
        let title = module.info().name.to_string();
        let ports = module.info().ports;
        let id = self.rack.add_boxed(module);
        self.configure_module(id);

        let slot = self.panels.len() as f32;
        let spawn = Pos2::new(40.0 + 260.0 * (slot % 4.0), 70.0 + 240.0 * (slot / 4.0).floor());
        let panel = self
            .scene
            .add_panel(placed_at(screen_to_world(spawn)));
        let controls: Vec<ControlId> = ports
            .iter()
            .filter_map(|_| self.scene.add_control(panel, Vector3::zeros()))
            .collect();
        for &control in &controls {
            self.scene.set_control_state(control, true);
        }

        log::info!("Added {} as {} on {}", title, id, panel);
        self.panels.push(ModulePanel {
            module: id,
            panel,
            title,
            controls,
            open: true,
            spawn,
            origin: None,
            held_note: None,
        });
    }

    /// Applies configuration and shared resources to a new module.
    fn configure_module(&mut self, id: ModuleId) {
        if let Some(sensor) = self.rack.module_mut::<HeartbeatSensor>(id) {
            sensor.set_bpm(self.config.heartbeat_bpm);
        }
        if let Some(input) = self.rack.module_mut::<MidiInput>(id) {
            match self.midi_events.take() {
                Some(consumer) => {
                    input.attach(consumer);
                }
                None => log::info!("{} stays detached: no free MIDI stream", id),
            }
        }
    }

    /// Tear down a closed panel and its module.
    fn remove_panel(&mut self, panel: PanelId) {
        let Some(index) = self.panels.iter().position(|p| p.panel == panel) else {
            return;
        };
        let entry = self.panels.remove(index);

        let removed = self
            .patcher
            .on_panel_removed(&mut self.rack, &mut self.scene, entry.panel);
        self.scene.remove_panel(entry.panel);

        if let Some(mut module) = self.rack.remove(entry.module) {
            if let Some(input) = module.as_any_mut().downcast_mut::<MidiInput>() {
                if let Some(consumer) = input.detach() {
                    self.midi_events = Some(consumer);
                }
            }
        }
        log::info!("Closed {} ({} patch(es) removed)", entry.title, removed);
    }

    fn select_midi_device(&mut self, device: Option<usize>) {
        let Some(engine) = self.midi.as_mut() else {
            return;
        };
        self.midi_error = match device {
            Some(index) => engine.connect(index).err().map(|e| e.to_string()),
            None => {
                engine.disconnect();
                None
            }
        };
    }

    /// Draw the top toolbar
    fn draw_toolbar(&self, ui: &mut egui::Ui) -> ToolbarActions {
        let mut actions = ToolbarActions::default();

        ui.horizontal(|ui| {
            ui.add_space(8.0);
            ui.label(
                RichText::new("MODULE PATCHER")
                    .size(18.0)
                    .color(theme::text::PRIMARY)
                    .strong(),
            );
            ui.add_space(16.0);
            ui.separator();

            ui.menu_button("+ Add Module", |ui| {
                for info in self.registry.list_modules() {
                    let label = RichText::new(info.name).color(info.kind.color());
                    if ui.button(label).on_hover_text(info.description).clicked() {
                        actions.add_module = Some(info.id);
                        ui.close_menu();
                    }
                }
            });

            let visible = self.patcher.connectors_visible();
            let toggle_text = if visible { "Hide Connectors" } else { "Show Connectors" };
            if ui.button(toggle_text).clicked() {
                actions.connectors_visible = Some(!visible);
            }

            let has_patches = self.patcher.connection_count() > 0;
            if ui
                .add_enabled(has_patches, egui::Button::new("Clear Patches"))
                .clicked()
            {
                actions.clear_patches = true;
            }

            ui.separator();

            match &self.midi {
                Some(engine) => {
                    let current = engine.selected_device_name().unwrap_or("None");
                    egui::ComboBox::from_label("MIDI")
                        .selected_text(current)
                        .show_ui(ui, |ui| {
                            if ui
                                .selectable_label(engine.selected_device().is_none(), "None")
                                .clicked()
                            {
                                actions.midi_device = Some(None);
                            }
                            for device in engine.devices() {
                                let selected = engine.selected_device() == Some(device.index);
                                if ui.selectable_label(selected, &device.name).clicked() {
                                    actions.midi_device = Some(Some(device.index));
                                }
                            }
                        });
                }
                None => {
                    ui.label(RichText::new("MIDI unavailable").color(theme::text::DISABLED));
                }
            }

            if let Some(pending) = self.patcher.pending() {
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    ui.add_space(8.0);
                    if ui.button("Cancel").clicked() {
                        actions.cancel_selection = true;
                    }
                    ui.label(
                        RichText::new(format!("Patching from {} {}", pending.category, pending.role.name()))
                            .color(theme::category_color(&pending.category)),
                    );
                });
            }
        });

        actions
    }

    /// Draw the bottom status bar
    fn draw_status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.add_space(8.0);

            let (text, color) = match &self.last_outcome {
                None => ("Click a port to start a patch".to_string(), theme::text::SECONDARY),
                Some(outcome @ SelectionOutcome::Rejected(_)) => {
                    (outcome.to_string(), theme::accent::WARNING)
                }
                Some(outcome @ SelectionOutcome::Failed(_)) => {
                    (outcome.to_string(), theme::accent::ERROR)
                }
                Some(outcome) => (outcome.to_string(), theme::accent::SUCCESS),
            };
            ui.label(RichText::new(text).color(color).small());

            if let Some(error) = &self.midi_error {
                ui.separator();
                ui.label(
                    RichText::new(format!("⚠ {}", error))
                        .color(theme::accent::ERROR)
                        .small(),
                );
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.label(
                    RichText::new(format!(
                        "{} modules • {} patches",
                        self.rack.len(),
                        self.patcher.connection_count()
                    ))
                    .color(theme::text::DISABLED)
                    .small(),
                );
            });
        });
    }

    /// Draw every module panel and mirror its layout into the scene.
    fn draw_panels(&mut self, ctx: &egui::Context) -> PanelEvents {
        let mut events = PanelEvents::default();
        let Self {
            rack,
            scene,
            panels,
            ..
        } = self;

        for panel in panels.iter_mut() {
            let Some(info) = rack.module(panel.module).map(|m| m.info().clone()) else {
                continue;
            };
            let mut open = panel.open;
            let mut port_centers: Vec<(ControlId, Pos2)> = Vec::new();

            let shown = egui::Window::new(RichText::new(panel.title.as_str()).color(info.kind.color()))
                .id(egui::Id::new(("module_panel", panel.panel.0)))
                .default_pos(panel.spawn)
                .resizable(false)
                .open(&mut open)
                .show(ctx, |ui| {
                    ui.label(
                        RichText::new(info.description)
                            .color(theme::text::SECONDARY)
                            .small(),
                    );
                    ui.horizontal_wrapped(|ui| {
                        for (port, &control) in info.ports.iter().zip(&panel.controls) {
                            let arrow = match port.role {
                                PortRole::Sender => "▶",
                                PortRole::Receiver => "◀",
                            };
                            let label = RichText::new(format!("{} {}", arrow, port.name))
                                .color(theme::category_color(port.category));
                            let response = ui
                                .selectable_label(!scene.control_state(control), label)
                                .on_hover_text(format!("{} {}", port.category, port.role.name()));
                            port_centers.push((control, response.rect.center()));
                            if response.clicked() {
                                scene.set_control_state(control, false);
                                events.selections.push(
                                    PortDescriptor::new(panel.module, port.category, port.role)
                                        .on(panel.panel, control),
                                );
                            }
                        }
                    });
                    ui.separator();
                    draw_module_body(ui, rack, panel.module, &mut panel.held_note);
                });

            panel.open = open;
            if !open {
                events.closed.push(panel.panel);
                continue;
            }
            let Some(shown) = shown else {
                continue;
            };

            let origin = shown.response.rect.min;
            let mut moved = false;
            if panel.origin != Some(origin) {
                moved |= scene.set_grab_handle(panel.panel, placed_at(screen_to_world(origin)));
                panel.origin = Some(origin);
            }
            let world_origin = screen_to_world(origin);
            for (control, center) in port_centers {
                moved |= scene.set_control_position(control, screen_to_world(center) - world_origin);
            }
            if moved {
                events.moved.push(panel.panel);
            }
        }

        events
    }

    /// Paint connectors above the panels.
    fn draw_connectors(&mut self, ctx: &egui::Context) {
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("connectors"),
        ));

        for connection in self.patcher.connections() {
            let Some(connector) = connection
                .connector
                .and_then(|handle| self.scene.connector(handle))
            else {
                continue;
            };
            if !connector.visible || !connector.materialized {
                continue;
            }
            let stroke = theme::connector_stroke(&connection.sender.category);
            let start = world_to_screen(&connector.geometry.start);
            let end = world_to_screen(&connector.geometry.end);
            painter.line_segment([start, end], stroke);
            painter.circle_filled(start, 4.0, stroke.color);
            painter.circle_filled(end, 4.0, stroke.color);
        }

        // New connectors show up from the next frame on
        if self.scene.materialize_pending() > 0 {
            ctx.request_repaint();
        }
    }
}

impl eframe::App for PatchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.theme_applied {
            theme::apply_theme(ctx);
            self.theme_applied = true;
        }

        let dt = ctx.input(|i| i.stable_dt).min(MAX_FRAME_STEP);
        self.clock = self.clock.advance(dt);
        self.rack.tick(&self.clock);
        if let Some(engine) = self.midi.as_mut() {
            engine.enumerate_devices();
        }

        let toolbar_actions = egui::TopBottomPanel::top("toolbar")
            .frame(
                egui::Frame::none()
                    .fill(theme::background::PANEL)
                    .inner_margin(egui::Margin::symmetric(0.0, 8.0)),
            )
            .show(ctx, |ui| self.draw_toolbar(ui))
            .inner;

        egui::TopBottomPanel::bottom("status_bar")
            .frame(
                egui::Frame::none()
                    .fill(theme::background::PANEL)
                    .inner_margin(egui::Margin::symmetric(0.0, 4.0)),
            )
            .show(ctx, |ui| self.draw_status_bar(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let rect = ui.available_rect_before_wrap();
                theme::draw_grid_background(ui.painter(), rect);
                ui.allocate_rect(rect, egui::Sense::hover());
            });

        let events = self.draw_panels(ctx);

        // Re-anchor before patching so new connectors use this frame's layout
        for panel in events.moved {
            self.patcher.on_panel_moved(&mut self.scene, panel);
        }
        for selection in events.selections {
            let outcome = self
                .patcher
                .on_port_selected(&mut self.rack, &mut self.scene, selection);
            self.last_outcome = Some(outcome);
        }
        for panel in events.closed {
            self.remove_panel(panel);
        }

        self.draw_connectors(ctx);

        // Handle deferred actions
        if let Some(type_id) = toolbar_actions.add_module {
            self.add_module(type_id);
        }
        if let Some(visible) = toolbar_actions.connectors_visible {
            self.patcher.set_connectors_visible(&mut self.scene, visible);
        }
        if toolbar_actions.clear_patches {
            let removed = self.patcher.clear(&mut self.rack, &mut self.scene);
            log::info!("Cleared {} patch(es)", removed);
            self.last_outcome = None;
        }
        if toolbar_actions.cancel_selection {
            self.patcher.cancel_selection(&mut self.scene);
        }
        if let Some(device) = toolbar_actions.midi_device {
            self.select_midi_device(device);
        }

        ctx.request_repaint_after(Duration::from_millis(16));
    }
}

/// Module-specific panel contents.
fn draw_module_body(
    ui: &mut egui::Ui,
    rack: &mut ModuleRack,
    id: ModuleId,
    held_note: &mut Option<u8>,
) {
    let Some(type_id) = rack.module(id).map(|m| m.info().id) else {
        return;
    };

    match type_id {
        "instrument.keyboard" => {
            let Some(keyboard) = rack.module_mut::<Keyboard>(id) else {
                return;
            };
            let data = PianoData::new(keyboard.active_notes(), PIANO_BASE_NOTE);
            let output = piano(ui, &data, &PianoConfig::default());
            if output.held_note != *held_note {
                if let Some(note) = held_note.take() {
                    keyboard.release(note);
                }
                if let Some(note) = output.held_note {
                    keyboard.press(note);
                }
                *held_note = output.held_note;
            }
            let mut velocity = keyboard.velocity();
            if ui
                .add(egui::Slider::new(&mut velocity, 1..=127).text("Velocity"))
                .changed()
            {
                keyboard.set_velocity(velocity);
            }
        }
        "sensor.heartbeat" => {
            let Some(sensor) = rack.module_mut::<HeartbeatSensor>(id) else {
                return;
            };
            ui.horizontal(|ui| {
                let pulse = if sensor.phase() < 0.15 {
                    theme::category::HEARTBEAT
                } else {
                    theme::text::DISABLED
                };
                ui.label(RichText::new("♥").size(22.0).color(pulse));
                ui.label(format!("{} beats", sensor.beats()));
            });
            let mut bpm = sensor.bpm();
            if ui
                .add(egui::Slider::new(&mut bpm, MIN_BPM..=MAX_BPM).text("BPM"))
                .changed()
            {
                sensor.set_bpm(bpm);
            }
        }
        "display.staff" => {
            let Some(staff) = rack.module_ref::<Staff>(id) else {
                return;
            };
            draw_staff(ui, staff);
        }
        "util.midi_monitor" => {
            let Some(monitor) = rack.module_mut::<MidiMonitor>(id) else {
                return;
            };
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new(format!("{} received", monitor.total()))
                        .color(theme::text::SECONDARY)
                        .small(),
                );
                if ui.small_button("Clear").clicked() {
                    monitor.clear();
                }
            });
            egui::ScrollArea::vertical()
                .max_height(140.0)
                .show(ui, |ui| {
                    for entry in monitor.entries().rev() {
                        ui.label(
                            RichText::new(entry.describe())
                                .monospace()
                                .color(theme::category_color(&entry.category)),
                        );
                    }
                });
        }
        "player.midi_input" => {
            let Some(input) = rack.module_ref::<MidiInput>(id) else {
                return;
            };
            let (text, color) = if input.is_attached() {
                ("● Listening", theme::accent::SUCCESS)
            } else {
                ("○ Detached", theme::text::DISABLED)
            };
            ui.label(RichText::new(text).color(color));
            ui.label(format!("{} notes forwarded", input.forwarded()));
        }
        _ => {}
    }
}

/// Draws a five-line staff with the staff module's recent notes.
fn draw_staff(ui: &mut egui::Ui, staff: &Staff) {
    let size = Vec2::new(220.0, 64.0);
    let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
    let painter = ui.painter();
    let spacing = 8.0;
    let top = rect.center().y - 2.0 * spacing;
    let line = egui::Stroke::new(1.0, theme::text::SECONDARY);

    for i in 0..5 {
        painter.hline(rect.x_range(), top + i as f32 * spacing, line);
    }

    // Half a line spacing per semitone, B4 on the middle line
    let middle = top + 2.0 * spacing;
    for (i, note) in staff.notes().enumerate() {
        let x = rect.left() + 12.0 + i as f32 * 12.5;
        let y = (middle - (note.note as f32 - 71.0) * spacing / 4.0)
            .clamp(rect.top() + 4.0, rect.bottom() - 4.0);
        painter.circle_filled(Pos2::new(x, y), 3.5, theme::category::MIDI);
    }

    ui.label(
        RichText::new(format!("{} beats", staff.beats()))
            .color(theme::text::SECONDARY)
            .small(),
    );
}
