//! # Frame transform
//!
//! Waypoints arrive in the simulator's world frame (WF). The controller works in the vehicle
//! frame (VF), whose origin is the vehicle position and whose X axis points along the vehicle
//! heading. Moving a point from the WF into the VF is a translation by minus the vehicle position
//! followed by a rotation by minus the heading.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Point2, Rotation2};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A waypoint in the world frame
pub type WorldPoint = Point2<f64>;

/// A waypoint in the vehicle frame
pub type VehiclePoint = Point2<f64>;

/// The pose (position and heading) of the vehicle in the world frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Pose2 {
    /// Position of the vehicle in the WF
    pub position_m_wf: WorldPoint,

    /// Heading of the vehicle, the angle from the WF X axis to the vehicle X axis
    pub heading_rad: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose2 {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m_wf: Point2::new(x_m, y_m),
            heading_rad
        }
    }

    /// Express a world frame point in the vehicle frame.
    pub fn to_vehicle(&self, point_m_wf: &WorldPoint) -> VehiclePoint {
        Point2::from(self.world_to_vehicle() * (point_m_wf - self.position_m_wf))
    }

    /// Rotation from the WF into the VF.
    fn world_to_vehicle(&self) -> Rotation2<f64> {
        Rotation2::new(-self.heading_rad)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Express all world frame waypoints in the frame of the vehicle at `pose`.
///
/// The order and number of points is preserved.
pub fn to_vehicle_frame(pose: &Pose2, points_m_wf: &[WorldPoint]) -> Vec<VehiclePoint> {
    let rot = pose.world_to_vehicle();

    points_m_wf
        .iter()
        .map(|p| Point2::from(rot * (p - pose.position_m_wf)))
        .collect()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    const TOL: f64 = 1e-12;

    fn assert_close(a: &VehiclePoint, b: &VehiclePoint) {
        assert!(
            (a - b).norm() < TOL,
            "Expected {:?} to be close to {:?}", a, b
        );
    }

    #[test]
    fn test_identity_pose() {
        let pts = vec![
            Point2::new(1.0, 2.0),
            Point2::new(-3.5, 0.25),
            Point2::new(100.0, -40.0)
        ];

        let vf = to_vehicle_frame(&Pose2::new(0.0, 0.0, 0.0), &pts);

        assert_eq!(vf.len(), pts.len());
        for (v, w) in vf.iter().zip(pts.iter()) {
            assert_close(v, w);
        }
    }

    #[test]
    fn test_translation_only() {
        let pose = Pose2::new(10.0, -5.0, 0.0);
        let pts = vec![Point2::new(12.0, -4.0), Point2::new(7.0, -5.0)];

        let vf = to_vehicle_frame(&pose, &pts);

        assert_close(&vf[0], &Point2::new(2.0, 1.0));
        assert_close(&vf[1], &Point2::new(-3.0, 0.0));
    }

    #[test]
    fn test_rotation() {
        // Vehicle facing along WF +Y, so a point ahead of it in the WF is on the VF +X axis and a
        // point on the WF +X axis is to its right.
        let pose = Pose2::new(0.0, 0.0, FRAC_PI_2);

        assert_close(&pose.to_vehicle(&Point2::new(0.0, 1.0)), &Point2::new(1.0, 0.0));
        assert_close(&pose.to_vehicle(&Point2::new(1.0, 0.0)), &Point2::new(0.0, -1.0));
    }

    #[test]
    fn test_matches_component_formula() {
        let pose = Pose2::new(-40.62, 108.73, 3.733651);
        let pts = vec![
            Point2::new(-32.16173, 113.361),
            Point2::new(-43.49173, 105.941),
            Point2::new(-61.09, 92.88499),
            Point2::new(-78.29172, 78.73102)
        ];

        let vf = to_vehicle_frame(&pose, &pts);

        let (s, c) = pose.heading_rad.sin_cos();
        for (v, w) in vf.iter().zip(pts.iter()) {
            let dx = w.x - pose.position_m_wf.x;
            let dy = w.y - pose.position_m_wf.y;

            assert_close(v, &Point2::new(dx * c + dy * s, -dx * s + dy * c));
        }
    }

    #[test]
    fn test_preserves_distance() {
        let pose = Pose2::new(3.0, 4.0, FRAC_PI_4);
        let a = Point2::new(5.0, -1.0);
        let b = Point2::new(-2.0, 8.0);

        let dist_wf = (a - b).norm();
        let dist_vf = (pose.to_vehicle(&a) - pose.to_vehicle(&b)).norm();

        assert!((dist_wf - dist_vf).abs() < TOL);
        assert!(to_vehicle_frame(&pose, &[]).is_empty());
    }
}
