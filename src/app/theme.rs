//! Look of the patch bay.
//!
//! Port buttons and connectors are colored by the message category they
//! carry, so a MIDI patch reads differently from a heartbeat patch at a
//! glance. Everything else stays in muted slate tones.

use eframe::egui::{self, Color32, Rounding, Stroke, Vec2};

use crate::patch::category as msg;

/// Surfaces, darkest first.
pub mod background {
    use super::Color32;

    /// Canvas behind the module windows.
    pub const MAIN: Color32 = Color32::from_rgb(22, 24, 38);
    pub const GRID: Color32 = Color32::from_rgb(36, 39, 58);
    /// Module windows, toolbar and status bar.
    pub const PANEL: Color32 = Color32::from_rgb(32, 35, 52);
    pub const WIDGET: Color32 = Color32::from_rgb(44, 48, 70);
    pub const WIDGET_HOVERED: Color32 = Color32::from_rgb(54, 59, 86);
    pub const WIDGET_ACTIVE: Color32 = Color32::from_rgb(66, 72, 104);
}

/// One color per message category.
pub mod category {
    use super::Color32;

    pub const MIDI: Color32 = Color32::from_rgb(179, 136, 255);
    pub const HEARTBEAT: Color32 = Color32::from_rgb(255, 99, 112);
    /// Categories without a color of their own.
    pub const OTHER: Color32 = Color32::from_rgb(255, 196, 92);
}

pub mod text {
    use super::Color32;

    pub const PRIMARY: Color32 = Color32::from_rgb(232, 234, 242);
    pub const SECONDARY: Color32 = Color32::from_rgb(150, 155, 178);
    pub const DISABLED: Color32 = Color32::from_rgb(96, 100, 120);
    pub const ACCENT: Color32 = Color32::from_rgb(120, 190, 255);
}

/// Status colors for selection outcomes and MIDI state.
pub mod accent {
    use super::Color32;

    pub const PRIMARY: Color32 = Color32::from_rgb(92, 170, 255);
    pub const SUCCESS: Color32 = Color32::from_rgb(110, 210, 150);
    pub const WARNING: Color32 = Color32::from_rgb(255, 196, 92);
    pub const ERROR: Color32 = Color32::from_rgb(255, 99, 112);
}

/// Connector line width in points.
pub const CONNECTOR_WIDTH: f32 = 3.0;

pub const GRID_SPACING: f32 = 24.0;

/// Window corners.
pub const ROUNDING: Rounding = Rounding::same(6.0);

/// Buttons and port toggles.
pub const ROUNDING_SMALL: Rounding = Rounding::same(4.0);

/// Color for ports and connectors of `category`.
pub fn category_color(category: &str) -> Color32 {
    match category {
        msg::MIDI => category::MIDI,
        msg::HEARTBEAT => category::HEARTBEAT,
        _ => category::OTHER,
    }
}

/// Stroke for a connector carrying `category`.
pub fn connector_stroke(category: &str) -> Stroke {
    Stroke::new(CONNECTOR_WIDTH, category_color(category).gamma_multiply(0.9))
}

/// Installs the patch-bay style on `ctx`. Called once, on the first frame.
pub fn apply_theme(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = Vec2::new(8.0, 6.0);
    style.spacing.button_padding = Vec2::new(10.0, 4.0);
    style.spacing.window_margin = egui::Margin::same(10.0);

    let visuals = &mut style.visuals;
    visuals.dark_mode = true;
    visuals.panel_fill = background::MAIN;
    visuals.window_fill = background::PANEL;
    visuals.window_rounding = ROUNDING;
    visuals.window_stroke = Stroke::new(1.0, background::WIDGET_ACTIVE);
    visuals.extreme_bg_color = background::MAIN;
    visuals.hyperlink_color = text::ACCENT;
    visuals.selection.bg_fill = accent::PRIMARY.gamma_multiply(0.3);
    visuals.selection.stroke = Stroke::new(1.0, accent::PRIMARY);

    // Selected port toggles use `selection`; the rest share these fills
    let widgets = &mut visuals.widgets;
    for (state, fill, stroke) in [
        (&mut widgets.noninteractive, background::WIDGET, Stroke::new(1.0, text::SECONDARY)),
        (&mut widgets.inactive, background::WIDGET, Stroke::new(1.0, text::PRIMARY)),
        (&mut widgets.hovered, background::WIDGET_HOVERED, Stroke::new(1.0, text::PRIMARY)),
        (&mut widgets.active, background::WIDGET_ACTIVE, Stroke::new(1.5, accent::PRIMARY)),
        (&mut widgets.open, background::WIDGET_ACTIVE, Stroke::new(1.0, text::PRIMARY)),
    ] {
        state.bg_fill = fill;
        state.fg_stroke = stroke;
        state.rounding = ROUNDING_SMALL;
    }

    ctx.set_style(style);
}

/// Fills `rect` with the canvas color and a grid aligned to screen space,
/// so the grid stays put while windows move over it.
pub fn draw_grid_background(painter: &egui::Painter, rect: egui::Rect) {
    painter.rect_filled(rect, 0.0, background::MAIN);
    let stroke = Stroke::new(1.0, background::GRID);

    let first_x = (rect.left() / GRID_SPACING).ceil() as i32;
    let last_x = (rect.right() / GRID_SPACING).floor() as i32;
    for i in first_x..=last_x {
        painter.vline(i as f32 * GRID_SPACING, rect.y_range(), stroke);
    }

    let first_y = (rect.top() / GRID_SPACING).ceil() as i32;
    let last_y = (rect.bottom() / GRID_SPACING).floor() as i32;
    for i in first_y..=last_y {
        painter.hline(rect.x_range(), i as f32 * GRID_SPACING, stroke);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_colors_are_distinct() {
        assert_ne!(category::MIDI, category::HEARTBEAT);
        assert_ne!(category::MIDI, category::OTHER);
        assert_ne!(category::HEARTBEAT, category::OTHER);
    }

    #[test]
    fn test_category_color_lookup() {
        assert_eq!(category_color("midi"), category::MIDI);
        assert_eq!(category_color("heartbeat"), category::HEARTBEAT);
        assert_eq!(category_color("accelerometer"), category::OTHER);
    }

    #[test]
    fn test_connector_stroke_uses_category_width() {
        let stroke = connector_stroke(msg::HEARTBEAT);
        assert_eq!(stroke.width, CONNECTOR_WIDTH);
        assert_ne!(stroke.color, connector_stroke(msg::MIDI).color);
    }
}
