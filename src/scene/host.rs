//! Capabilities the patcher consumes from the scene layer.
//!
//! The patcher never renders anything itself. Panels, their controls and the
//! connector primitives drawn between them belong to whatever hosts the
//! modules (a desktop window, an XR scene, a test double); the patcher only
//! talks to them through [`PanelHost`] using opaque handles.

use std::fmt;

use nalgebra::{Point3, Vector3};

use super::geometry::ConnectorGeometry;

/// Handle of a module's UI panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PanelId(pub u64);

/// Handle of a single control (port button) on a panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ControlId(pub u64);

/// Handle of a visual connector created by the host.
///
/// The host may materialize the connector later than the moment it hands
/// out the handle; the patcher treats the handle as valid immediately.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectorHandle(pub u64);

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panel#{}", self.0)
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "control#{}", self.0)
    }
}

impl fmt::Display for ConnectorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connector#{}", self.0)
    }
}

/// The scene-side collaborator of the patcher.
///
/// Lookups return `None` when the host has no visual representation for the
/// requested panel or control; the patcher then skips connector work and
/// leaves routing untouched.
pub trait PanelHost {
    /// Local position of `control` within `panel`.
    fn control_position(&self, panel: PanelId, control: ControlId) -> Option<Vector3<f32>>;

    /// Maps a panel-local offset to a world-space point by applying the
    /// panel's attachment transform and then the world transform of the
    /// grab handle it hangs from. Must reflect the current layout on every
    /// call.
    fn resolve_world_anchor(
        &self,
        panel: PanelId,
        local_offset: Vector3<f32>,
    ) -> Option<Point3<f32>>;

    /// Creates a connector owned by `panel`.
    fn create_connector(&mut self, panel: PanelId, geometry: ConnectorGeometry) -> ConnectorHandle;

    /// Moves an existing connector in place.
    fn update_connector(&mut self, handle: ConnectorHandle, geometry: ConnectorGeometry);

    /// Destroys a connector. Unknown handles are ignored.
    fn destroy_connector(&mut self, handle: ConnectorHandle);

    /// Shows or hides a connector without touching its geometry.
    fn set_connector_visible(&mut self, handle: ConnectorHandle, visible: bool);

    /// Puts a port control back into its neutral "connected" look.
    fn reset_control(&mut self, control: ControlId);
}
