//! The patcher: turns pairs of port selections into connections.
//!
//! The user selects two ports one after the other. If one sends and the
//! other receives on the same message category, the pair is toggled: patched
//! if it was not connected, unpatched if it was. The patcher keeps the set of
//! active connections, mirrors each one into the sending module's outgoing
//! links in the [`ModuleRack`], and asks the [`PanelHost`] for a connector
//! whenever both ports sit on a panel.
//!
//! # Invariants
//!
//! - No two active connections are equal.
//! - For every module, its outgoing links in the rack are exactly the
//!   receivers of the active connections it sends on, in patch order.
//! - At most one selection is pending between calls.

use std::fmt;

use super::connection::Connection;
use super::error::RoutingError;
use super::port::PortDescriptor;
use super::validation::{validate_pairing, PairingError};
use crate::config::PatcherConfig;
use crate::module::ModuleRack;
use nalgebra::{Point3, Vector3};

use crate::scene::{ConnectorGeometry, ConnectorHandle, PanelHost, PanelId};

/// Selection state between two port clicks.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PendingSelection {
    /// No port selected.
    #[default]
    Idle,
    /// One port selected, waiting for its partner.
    AwaitingSecond(PortDescriptor),
}

/// What a port selection did.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionOutcome {
    /// The selection was stored; the next one completes the pair.
    AwaitingSecond,
    /// A new connection was made.
    Connected,
    /// An existing connection was removed.
    Disconnected,
    /// The two ports cannot be patched together.
    Rejected(PairingError),
    /// The pair was valid but the routing graph refused it.
    Failed(RoutingError),
}

impl fmt::Display for SelectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionOutcome::AwaitingSecond => write!(f, "select a second port"),
            SelectionOutcome::Connected => write!(f, "patched"),
            SelectionOutcome::Disconnected => write!(f, "unpatched"),
            SelectionOutcome::Rejected(e) => write!(f, "{}", e),
            SelectionOutcome::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// Owner of the pending selection and the active connection set.
#[derive(Debug)]
pub struct Patcher {
    config: PatcherConfig,
    pending: PendingSelection,
    /// Active connections in the order they were made.
    connections: Vec<Connection>,
    connectors_visible: bool,
}

impl Patcher {
    pub fn new(config: PatcherConfig) -> Self {
        let connectors_visible = config.connectors_visible;
        Self {
            config,
            pending: PendingSelection::Idle,
            connections: Vec::new(),
            connectors_visible,
        }
    }

    pub fn config(&self) -> &PatcherConfig {
        &self.config
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// The stored first selection, if any.
    pub fn pending(&self) -> Option<&PortDescriptor> {
        match &self.pending {
            PendingSelection::Idle => None,
            PendingSelection::AwaitingSecond(desc) => Some(desc),
        }
    }

    /// True if `sender` is currently patched into `receiver`.
    pub fn is_connected(&self, sender: &PortDescriptor, receiver: &PortDescriptor) -> bool {
        self.connections.iter().any(|c| c.links(sender, receiver))
    }

    pub fn connectors_visible(&self) -> bool {
        self.connectors_visible
    }

    // ── Selection protocol ─────────────────────────────────────────────────

    /// Handles a click on a port.
    ///
    /// The first click is stored. The second completes the pair: it is
    /// validated and, if valid, toggled. Either way the pending state is
    /// cleared and both controls are reset to their neutral look.
    pub fn on_port_selected(
        &mut self,
        rack: &mut ModuleRack,
        host: &mut dyn PanelHost,
        selection: PortDescriptor,
    ) -> SelectionOutcome {
        let first = match std::mem::take(&mut self.pending) {
            PendingSelection::Idle => {
                log::debug!("Selected {}", selection);
                self.pending = PendingSelection::AwaitingSecond(selection);
                return SelectionOutcome::AwaitingSecond;
            }
            PendingSelection::AwaitingSecond(first) => first,
        };

        let controls = [first.control, selection.control];

        let outcome = match validate_pairing(first, selection, self.config.allow_self_patch) {
            Err(e) => {
                log::info!("{}", e);
                SelectionOutcome::Rejected(e)
            }
            Ok((sender, receiver)) => match self.apply_patch(rack, host, sender, receiver) {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("Patch failed: {}", e);
                    SelectionOutcome::Failed(e)
                }
            },
        };

        for control in controls.into_iter().flatten() {
            host.reset_control(control);
        }
        outcome
    }

    /// Drops a pending selection. Returns true if there was one.
    pub fn cancel_selection(&mut self, host: &mut dyn PanelHost) -> bool {
        match std::mem::take(&mut self.pending) {
            PendingSelection::Idle => false,
            PendingSelection::AwaitingSecond(desc) => {
                if let Some(control) = desc.control {
                    host.reset_control(control);
                }
                log::debug!("Cancelled selection of {}", desc);
                true
            }
        }
    }

    // ── Toggle connect ─────────────────────────────────────────────────────

    /// Connects `sender` to `receiver`, or disconnects them if they are
    /// already connected.
    ///
    /// The pair must already be validated; `sender` must send and `receiver`
    /// must receive.
    pub fn apply_patch(
        &mut self,
        rack: &mut ModuleRack,
        host: &mut dyn PanelHost,
        sender: PortDescriptor,
        receiver: PortDescriptor,
    ) -> Result<SelectionOutcome, RoutingError> {
        if self.is_connected(&sender, &receiver) {
            self.disconnect(rack, host, &sender, &receiver)?;
            log::info!("Unpatched {} -> {}", sender, receiver);
            return Ok(SelectionOutcome::Disconnected);
        }

        rack.add_outgoing_link(sender.module, receiver.clone())?;

        let mut connection = Connection::new(sender, receiver);
        connection.connector = self.create_connector(host, &connection.sender, &connection.receiver);
        log::info!("Patched {} -> {}", connection.sender, connection.receiver);
        self.connections.push(connection);
        Ok(SelectionOutcome::Connected)
    }

    /// Removes every connection, as if each had been toggled off.
    pub fn clear(&mut self, rack: &mut ModuleRack, host: &mut dyn PanelHost) -> usize {
        self.cancel_selection(host);
        let pairs: Vec<(PortDescriptor, PortDescriptor)> = self
            .connections
            .iter()
            .map(|c| (c.sender.clone(), c.receiver.clone()))
            .collect();
        self.disconnect_all(rack, host, pairs)
    }

    fn disconnect(
        &mut self,
        rack: &mut ModuleRack,
        host: &mut dyn PanelHost,
        sender: &PortDescriptor,
        receiver: &PortDescriptor,
    ) -> Result<(), RoutingError> {
        if !rack.remove_outgoing_link(sender.module, receiver) {
            log::error!("{} had no outgoing link to {}", sender.module, receiver);
        }
        let connection = self.remove_connection(sender, receiver)?;
        if let Some(handle) = connection.connector {
            host.destroy_connector(handle);
        }
        Ok(())
    }

    fn disconnect_all(
        &mut self,
        rack: &mut ModuleRack,
        host: &mut dyn PanelHost,
        pairs: Vec<(PortDescriptor, PortDescriptor)>,
    ) -> usize {
        let mut removed = 0;
        for (sender, receiver) in pairs {
            match self.disconnect(rack, host, &sender, &receiver) {
                Ok(()) => removed += 1,
                Err(e) => log::error!("{}", e),
            }
        }
        removed
    }

    fn remove_connection(
        &mut self,
        sender: &PortDescriptor,
        receiver: &PortDescriptor,
    ) -> Result<Connection, RoutingError> {
        let index = self
            .connections
            .iter()
            .position(|c| c.links(sender, receiver))
            .ok_or_else(|| RoutingError::ConnectionNotFound {
                sender: sender.clone(),
                receiver: receiver.clone(),
            })?;
        Ok(self.connections.remove(index))
    }

    // ── Connectors ─────────────────────────────────────────────────────────

    /// World position of a port's connector end, computed fresh from the
    /// current layout.
    pub fn endpoint_anchor(
        &self,
        host: &dyn PanelHost,
        desc: &PortDescriptor,
    ) -> Option<Point3<f32>> {
        let panel = desc.panel?;
        let local = desc
            .control
            .and_then(|control| host.control_position(panel, control))
            .unwrap_or_else(Vector3::zeros);
        host.resolve_world_anchor(panel, local + self.config.inset_for(desc.role))
    }

    fn connector_geometry(
        &self,
        host: &dyn PanelHost,
        sender: &PortDescriptor,
        receiver: &PortDescriptor,
    ) -> Option<ConnectorGeometry> {
        let start = self.endpoint_anchor(host, sender)?;
        let end = self.endpoint_anchor(host, receiver)?;
        Some(ConnectorGeometry::between(start, end))
    }

    fn create_connector(
        &self,
        host: &mut dyn PanelHost,
        sender: &PortDescriptor,
        receiver: &PortDescriptor,
    ) -> Option<ConnectorHandle> {
        let (Some(panel), Some(_)) = (sender.panel, receiver.panel) else {
            return None;
        };
        let Some(geometry) = self.connector_geometry(host, sender, receiver) else {
            log::debug!("No anchors for {} -> {}, skipping connector", sender, receiver);
            return None;
        };
        let handle = host.create_connector(panel, geometry);
        if !self.connectors_visible {
            host.set_connector_visible(handle, false);
        }
        Some(handle)
    }

    // ── Panel reactions ────────────────────────────────────────────────────

    /// Re-anchors every connector touching `panel`. Returns how many were
    /// updated.
    pub fn on_panel_moved(&self, host: &mut dyn PanelHost, panel: PanelId) -> usize {
        let mut updated = 0;
        for connection in self.connections.iter().filter(|c| c.touches_panel(panel)) {
            let Some(handle) = connection.connector else {
                continue;
            };
            if let Some(geometry) =
                self.connector_geometry(host, &connection.sender, &connection.receiver)
            {
                host.update_connector(handle, geometry);
                updated += 1;
            }
        }
        updated
    }

    /// Removes every connection touching `panel`. Returns how many were
    /// removed.
    pub fn on_panel_removed(
        &mut self,
        rack: &mut ModuleRack,
        host: &mut dyn PanelHost,
        panel: PanelId,
    ) -> usize {
        if self.pending().is_some_and(|desc| desc.is_on_panel(panel)) {
            log::debug!("Dropping selection pending on removed {}", panel);
            self.pending = PendingSelection::Idle;
        }

        let pairs: Vec<(PortDescriptor, PortDescriptor)> = self
            .connections
            .iter()
            .filter(|c| c.touches_panel(panel))
            .map(|c| (c.sender.clone(), c.receiver.clone()))
            .collect();
        let removed = self.disconnect_all(rack, host, pairs);
        if removed > 0 {
            log::info!("Removed {} connection(s) of {}", removed, panel);
        }
        removed
    }

    // ── Visibility ─────────────────────────────────────────────────────────

    /// Shows or hides every connector. Connectors created later follow the
    /// same setting.
    pub fn set_connectors_visible(&mut self, host: &mut dyn PanelHost, visible: bool) {
        self.connectors_visible = visible;
        for handle in self.connections.iter().filter_map(|c| c.connector) {
            host.set_connector_visible(handle, visible);
        }
    }

    pub fn hide_all(&mut self, host: &mut dyn PanelHost) {
        self.set_connectors_visible(host, false);
    }

    pub fn show_all(&mut self, host: &mut dyn PanelHost) {
        self.set_connectors_visible(host, true);
    }
}

impl Default for Patcher {
    fn default() -> Self {
        Self::new(PatcherConfig::default())
    }
}
