//! In-memory scene layout.
//!
//! `SceneLayout` keeps track of panels hanging from grab handles, the
//! controls laid out on them and the connectors the patcher asked for. The
//! desktop host mirrors its windows into it every frame; tests use it as the
//! panel host directly.

use std::collections::{BTreeMap, HashMap};

use nalgebra::{Isometry3, Point3, Vector3};

use super::geometry::ConnectorGeometry;
use super::host::{ConnectorHandle, ControlId, PanelHost, PanelId};

/// Controls closer than this are considered to not have moved.
const POSITION_TOLERANCE: f32 = 1.0e-5;

/// Layout state of a single panel.
#[derive(Clone, Debug)]
struct PanelState {
    /// World transform of the free-floating grab handle.
    grab_handle: Isometry3<f32>,
    /// Placement of the panel relative to its grab handle.
    attachment: Isometry3<f32>,
    /// Local control positions within the panel.
    controls: HashMap<ControlId, Vector3<f32>>,
}

/// A connector as tracked by the layout.
#[derive(Clone, Debug, PartialEq)]
pub struct Connector {
    /// Panel that created (and renders) the connector.
    pub panel: PanelId,
    /// Current placement.
    pub geometry: ConnectorGeometry,
    /// Whether the connector should be drawn.
    pub visible: bool,
    /// False until the host has built the visual for this connector.
    pub materialized: bool,
}

/// An in-memory [`PanelHost`].
#[derive(Debug, Default)]
pub struct SceneLayout {
    panels: HashMap<PanelId, PanelState>,
    control_owners: HashMap<ControlId, PanelId>,
    control_states: HashMap<ControlId, bool>,
    connectors: BTreeMap<ConnectorHandle, Connector>,
    next_panel: u64,
    next_control: u64,
    next_connector: u64,
}

impl SceneLayout {
    /// Creates an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Panels ─────────────────────────────────────────────────────────────

    /// Adds a panel attached directly at its grab handle.
    pub fn add_panel(&mut self, grab_handle: Isometry3<f32>) -> PanelId {
        self.add_panel_with_attachment(grab_handle, Isometry3::identity())
    }

    /// Adds a panel placed at `attachment` relative to its grab handle.
    pub fn add_panel_with_attachment(
        &mut self,
        grab_handle: Isometry3<f32>,
        attachment: Isometry3<f32>,
    ) -> PanelId {
        self.next_panel += 1;
        let id = PanelId(self.next_panel);
        self.panels.insert(
            id,
            PanelState {
                grab_handle,
                attachment,
                controls: HashMap::new(),
            },
        );
        id
    }

    /// Removes a panel and its controls.
    ///
    /// Connectors are left alone: they are owned by connections and the
    /// patcher destroys them when it reacts to the removal.
    pub fn remove_panel(&mut self, panel: PanelId) -> bool {
        let Some(state) = self.panels.remove(&panel) else {
            return false;
        };
        for control in state.controls.keys() {
            self.control_owners.remove(control);
            self.control_states.remove(control);
        }
        true
    }

    pub fn contains_panel(&self, panel: PanelId) -> bool {
        self.panels.contains_key(&panel)
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    pub fn grab_handle(&self, panel: PanelId) -> Option<Isometry3<f32>> {
        self.panels.get(&panel).map(|state| state.grab_handle)
    }

    /// Moves a panel's grab handle. Returns true if the panel exists and
    /// actually moved.
    pub fn set_grab_handle(&mut self, panel: PanelId, grab_handle: Isometry3<f32>) -> bool {
        match self.panels.get_mut(&panel) {
            Some(state) if state.grab_handle != grab_handle => {
                state.grab_handle = grab_handle;
                true
            }
            _ => false,
        }
    }

    /// Changes where a panel sits relative to its grab handle.
    pub fn set_attachment(&mut self, panel: PanelId, attachment: Isometry3<f32>) -> bool {
        match self.panels.get_mut(&panel) {
            Some(state) if state.attachment != attachment => {
                state.attachment = attachment;
                true
            }
            _ => false,
        }
    }

    // ── Controls ───────────────────────────────────────────────────────────

    /// Adds a control at a panel-local position.
    ///
    /// Returns `None` if the panel does not exist.
    pub fn add_control(&mut self, panel: PanelId, position: Vector3<f32>) -> Option<ControlId> {
        let state = self.panels.get_mut(&panel)?;
        self.next_control += 1;
        let id = ControlId(self.next_control);
        state.controls.insert(id, position);
        self.control_owners.insert(id, panel);
        self.control_states.insert(id, false);
        Some(id)
    }

    /// Updates a control's panel-local position. Returns true if it moved.
    pub fn set_control_position(&mut self, control: ControlId, position: Vector3<f32>) -> bool {
        let Some(panel) = self.control_owners.get(&control) else {
            return false;
        };
        let Some(slot) = self
            .panels
            .get_mut(panel)
            .and_then(|state| state.controls.get_mut(&control))
        else {
            return false;
        };
        if (*slot - position).norm() <= POSITION_TOLERANCE {
            return false;
        }
        *slot = position;
        true
    }

    /// Panel a control belongs to.
    pub fn control_panel(&self, control: ControlId) -> Option<PanelId> {
        self.control_owners.get(&control).copied()
    }

    /// Current toggle state of a control's visual affordance.
    pub fn control_state(&self, control: ControlId) -> bool {
        self.control_states.get(&control).copied().unwrap_or(false)
    }

    /// Sets a control's toggle state, as the UI does when clicked.
    pub fn set_control_state(&mut self, control: ControlId, on: bool) {
        if self.control_owners.contains_key(&control) {
            self.control_states.insert(control, on);
        }
    }

    // ── Connectors ─────────────────────────────────────────────────────────

    pub fn connector(&self, handle: ConnectorHandle) -> Option<&Connector> {
        self.connectors.get(&handle)
    }

    /// All live connectors in creation order.
    pub fn connectors(&self) -> impl Iterator<Item = (ConnectorHandle, &Connector)> {
        self.connectors.iter().map(|(handle, connector)| (*handle, connector))
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    /// Builds the visuals for connectors requested since the last call.
    /// Returns how many were materialized.
    pub fn materialize_pending(&mut self) -> usize {
        let mut count = 0;
        for connector in self.connectors.values_mut() {
            if !connector.materialized {
                connector.materialized = true;
                count += 1;
            }
        }
        count
    }
}

impl PanelHost for SceneLayout {
    fn control_position(&self, panel: PanelId, control: ControlId) -> Option<Vector3<f32>> {
        self.panels.get(&panel)?.controls.get(&control).copied()
    }

    fn resolve_world_anchor(
        &self,
        panel: PanelId,
        local_offset: Vector3<f32>,
    ) -> Option<Point3<f32>> {
        let state = self.panels.get(&panel)?;
        let world = state.grab_handle * state.attachment;
        Some(world.transform_point(&Point3::from(local_offset)))
    }

    fn create_connector(&mut self, panel: PanelId, geometry: ConnectorGeometry) -> ConnectorHandle {
        self.next_connector += 1;
        let handle = ConnectorHandle(self.next_connector);
        self.connectors.insert(
            handle,
            Connector {
                panel,
                geometry,
                visible: true,
                materialized: false,
            },
        );
        log::debug!("Created {} on {}", handle, panel);
        handle
    }

    fn update_connector(&mut self, handle: ConnectorHandle, geometry: ConnectorGeometry) {
        match self.connectors.get_mut(&handle) {
            Some(connector) => connector.geometry = geometry,
            None => log::warn!("Update for unknown {}", handle),
        }
    }

    fn destroy_connector(&mut self, handle: ConnectorHandle) {
        if self.connectors.remove(&handle).is_none() {
            log::warn!("Destroy for unknown {}", handle);
        }
    }

    fn set_connector_visible(&mut self, handle: ConnectorHandle, visible: bool) {
        if let Some(connector) = self.connectors.get_mut(&handle) {
            connector.visible = visible;
        }
    }

    fn reset_control(&mut self, control: ControlId) {
        self.set_control_state(control, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Translation3, UnitQuaternion};
    use std::f32::consts::FRAC_PI_2;

    fn approx(a: Point3<f32>, b: Point3<f32>) -> bool {
        (a - b).norm() < 1.0e-5
    }

    #[test]
    fn test_add_and_remove_panel() {
        let mut scene = SceneLayout::new();
        let panel = scene.add_panel(Isometry3::identity());
        let control = scene.add_control(panel, Vector3::x()).unwrap();

        assert!(scene.contains_panel(panel));
        assert_eq!(scene.control_panel(control), Some(panel));

        assert!(scene.remove_panel(panel));
        assert!(!scene.contains_panel(panel));
        assert_eq!(scene.control_panel(control), None);
        assert!(!scene.remove_panel(panel));
    }

    #[test]
    fn test_add_control_to_missing_panel() {
        let mut scene = SceneLayout::new();
        assert!(scene.add_control(PanelId(99), Vector3::zeros()).is_none());
    }

    #[test]
    fn test_world_anchor_composes_attachment_then_grab_handle() {
        let mut scene = SceneLayout::new();
        let grab = Isometry3::from_parts(
            Translation3::new(10.0, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
        );
        let attachment = Isometry3::translation(0.0, 1.0, 0.0);
        let panel = scene.add_panel_with_attachment(grab, attachment);

        // Local (1,0,0) -> panel (1,1,0) -> rotated (-1,1,0) -> translated (9,1,0)
        let anchor = scene.resolve_world_anchor(panel, Vector3::x()).unwrap();
        assert!(approx(anchor, Point3::new(9.0, 1.0, 0.0)));
    }

    #[test]
    fn test_world_anchor_tracks_grab_handle() {
        let mut scene = SceneLayout::new();
        let panel = scene.add_panel(Isometry3::identity());
        let before = scene.resolve_world_anchor(panel, Vector3::x()).unwrap();

        assert!(scene.set_grab_handle(panel, Isometry3::translation(0.0, 0.0, 1.0)));
        let after = scene.resolve_world_anchor(panel, Vector3::x()).unwrap();

        assert!(approx(before, Point3::new(1.0, 0.0, 0.0)));
        assert!(approx(after, Point3::new(1.0, 0.0, 1.0)));
    }

    #[test]
    fn test_set_grab_handle_reports_change() {
        let mut scene = SceneLayout::new();
        let panel = scene.add_panel(Isometry3::identity());
        assert!(!scene.set_grab_handle(panel, Isometry3::identity()));
        assert!(scene.set_grab_handle(panel, Isometry3::translation(1.0, 0.0, 0.0)));
        assert!(!scene.set_grab_handle(PanelId(42), Isometry3::identity()));
    }

    #[test]
    fn test_control_position_updates() {
        let mut scene = SceneLayout::new();
        let panel = scene.add_panel(Isometry3::identity());
        let control = scene.add_control(panel, Vector3::zeros()).unwrap();

        assert!(!scene.set_control_position(control, Vector3::zeros()));
        assert!(scene.set_control_position(control, Vector3::y()));
        assert_eq!(scene.control_position(panel, control), Some(Vector3::y()));
    }

    #[test]
    fn test_connector_lifecycle() {
        let mut scene = SceneLayout::new();
        let panel = scene.add_panel(Isometry3::identity());
        let geometry = ConnectorGeometry::between(Point3::origin(), Point3::new(1.0, 0.0, 0.0));

        let handle = scene.create_connector(panel, geometry);
        assert_eq!(scene.connector_count(), 1);
        assert!(!scene.connector(handle).unwrap().materialized);

        assert_eq!(scene.materialize_pending(), 1);
        assert_eq!(scene.materialize_pending(), 0);

        scene.set_connector_visible(handle, false);
        assert!(!scene.connector(handle).unwrap().visible);

        let moved = ConnectorGeometry::between(Point3::origin(), Point3::new(0.0, 1.0, 0.0));
        scene.update_connector(handle, moved);
        assert_eq!(scene.connector(handle).unwrap().geometry, moved);

        scene.destroy_connector(handle);
        assert_eq!(scene.connector_count(), 0);
    }

    #[test]
    fn test_reset_control_sets_connected_state() {
        let mut scene = SceneLayout::new();
        let panel = scene.add_panel(Isometry3::identity());
        let control = scene.add_control(panel, Vector3::zeros()).unwrap();

        assert!(!scene.control_state(control));
        scene.reset_control(control);
        assert!(scene.control_state(control));
    }
}
