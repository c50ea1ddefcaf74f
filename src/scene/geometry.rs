//! Connector placement in scene space.
//!
//! Points are `nalgebra::Point3<f32>`, panel placements are `Isometry3<f32>`
//! (position and orientation, unit scale). A connector is a unit-length
//! primitive along its local +Y axis, placed at the midpoint of its two
//! anchors, aimed from start to end and stretched by the span length.

use std::f32::consts::PI;

use nalgebra::{Point3, UnitQuaternion, Vector3};

/// Below this length a connector has no meaningful direction.
const DEGENERATE_LENGTH: f32 = 1.0e-6;

/// Placement of a straight connector between two anchors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConnectorGeometry {
    pub start: Point3<f32>,
    pub end: Point3<f32>,
    pub midpoint: Point3<f32>,
    /// Turns local +Y onto the start-to-end direction.
    pub rotation: UnitQuaternion<f32>,
    pub length: f32,
}

impl ConnectorGeometry {
    /// Computes the connector spanning `start` to `end`.
    pub fn between(start: Point3<f32>, end: Point3<f32>) -> Self {
        let span = end - start;
        let length = span.norm();
        let rotation = if length > DEGENERATE_LENGTH {
            // No unique shortest arc when the span points straight down
            UnitQuaternion::rotation_between(&Vector3::y(), &span)
                .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI))
        } else {
            UnitQuaternion::identity()
        };

        Self {
            start,
            end,
            midpoint: nalgebra::center(&start, &end),
            rotation,
            length,
        }
    }

    /// Direction the connector is aimed in (zero for a degenerate connector).
    pub fn direction(&self) -> Vector3<f32> {
        if self.length > DEGENERATE_LENGTH {
            self.rotation * Vector3::y()
        } else {
            Vector3::zeros()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1.0e-5;

    #[test]
    fn test_connector_between_points() {
        let geometry = ConnectorGeometry::between(Point3::origin(), Point3::new(2.0, 0.0, 0.0));

        assert!((geometry.length - 2.0).abs() < EPS);
        assert!((geometry.midpoint - Point3::new(1.0, 0.0, 0.0)).norm() < EPS);
        assert!((geometry.direction() - Vector3::x()).norm() < EPS);
    }

    #[test]
    fn test_connector_aims_diagonally() {
        let start = Point3::new(1.0, 1.0, 1.0);
        let end = Point3::new(2.0, 2.0, 1.0);
        let geometry = ConnectorGeometry::between(start, end);
        let expected = (end - start).normalize();
        assert!((geometry.direction() - expected).norm() < EPS);
    }

    #[test]
    fn test_connector_pointing_down() {
        let geometry = ConnectorGeometry::between(Point3::new(0.0, 1.0, 0.0), Point3::origin());
        assert!((geometry.direction() + Vector3::y()).norm() < EPS);
        assert!((geometry.length - 1.0).abs() < EPS);
    }

    #[test]
    fn test_degenerate_connector() {
        let p = Point3::new(0.5, 0.5, 0.5);
        let geometry = ConnectorGeometry::between(p, p);
        assert_eq!(geometry.length, 0.0);
        assert_eq!(geometry.rotation, UnitQuaternion::identity());
        assert_eq!(geometry.direction(), Vector3::zeros());
    }
}
