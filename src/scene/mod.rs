//! Scene module
//!
//! The patcher's view of the visual world: connector placement,
//! the `PanelHost` capability trait and an in-memory layout implementing it.

pub mod geometry;
pub mod host;
pub mod layout;

pub use geometry::ConnectorGeometry;
pub use host::{ConnectorHandle, ControlId, PanelHost, PanelId};
pub use layout::{Connector, SceneLayout};
