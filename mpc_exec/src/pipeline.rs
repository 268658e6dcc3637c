//! # Telemetry pipeline
//!
//! Turns one telemetry frame into a control response:
//!
//! 1. The road waypoints are transformed into the vehicle frame.
//! 2. A cubic reference path is fitted to them.
//! 3. The vehicle state is projected forward by the actuation latency.
//! 4. The controller is called with the state and the path.
//! 5. The reference path is sampled for display.
//!
//! The pipeline itself holds no state between frames, only the controller does. It is passed in
//! by the caller which owns it for the duration of a session.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;

use crate::bridge::BridgeParams;
use crate::controller::{AdapterError, Controller, ControllerAdapter};
use crate::estimator::StateEstimator;
use crate::frame::to_vehicle_frame;
use crate::response::{reference_points, ControlResponse};
use crate::telemetry::TelemetryFrame;
use crate::traj_fit::{fit_cubic, FitError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    estimator: StateEstimator,
    adapter: ControllerAdapter,
    ref_poly_inc_m: f64,
    ref_num_points: usize
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("Could not fit the reference path: {0}")]
    FitError(FitError),

    #[error("Could not compute the control command: {0}")]
    AdapterError(AdapterError)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pipeline {
    pub fn new(params: &BridgeParams) -> Self {
        Self {
            estimator: StateEstimator::from_params(params),
            adapter: ControllerAdapter::new(params.max_steer_deg),
            ref_poly_inc_m: params.ref_poly_inc_m,
            ref_num_points: params.ref_num_points
        }
    }

    /// Process a single frame, calling the controller exactly once if the reference path could
    /// be fitted.
    pub fn run<C: Controller + ?Sized>(
        &self,
        frame: &TelemetryFrame,
        controller: &mut C
    ) -> Result<ControlResponse, PipelineError> {
        let waypoints_m_vf = to_vehicle_frame(&frame.pose, &frame.waypoints_m_wf);

        let coeffs = fit_cubic(&waypoints_m_vf).map_err(PipelineError::FitError)?;

        let state = self.estimator.estimate(
            &coeffs,
            frame.speed_mph,
            frame.prior_steering_rad,
            frame.prior_throttle
        );

        debug!(
            "Reference path {:?}, estimated state {:?}",
            coeffs.as_slice(), state
        );

        let output = self.adapter
            .solve(controller, &state, &coeffs)
            .map_err(PipelineError::AdapterError)?;

        Ok(ControlResponse {
            state,
            coeffs,
            command: output.command,
            steer_saturated: output.steer_saturated,
            predicted: output.trajectory,
            reference: reference_points(&coeffs, self.ref_poly_inc_m, self.ref_num_points)
        })
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::controller::ControllerError;
    use crate::estimator::VehicleState;
    use crate::frame::Pose2;
    use crate::traj_fit::PolyCoeffs;
    use nalgebra::Point2;

    /// Replays scripted results and records the inputs it was called with.
    struct ScriptedController {
        results: Vec<Result<Vec<f64>, ControllerError>>,
        calls: Vec<(VehicleState, PolyCoeffs)>
    }

    impl ScriptedController {
        fn new(results: Vec<Result<Vec<f64>, ControllerError>>) -> Self {
            Self { results, calls: Vec::new() }
        }
    }

    impl Controller for ScriptedController {
        fn solve(
            &mut self,
            state: &VehicleState,
            coeffs: &PolyCoeffs
        ) -> Result<Vec<f64>, ControllerError> {
            self.calls.push((*state, *coeffs));
            self.results.remove(0)
        }
    }

    /// Vehicle at (10, 5) heading along world +Y, road straight ahead offset 1 m to its left.
    fn frame() -> TelemetryFrame {
        TelemetryFrame {
            waypoints_m_wf: (1..=6)
                .map(|i| Point2::new(9.0, 5.0 + 10.0 * i as f64))
                .collect(),
            pose: Pose2::new(10.0, 5.0, std::f64::consts::FRAC_PI_2),
            speed_mph: 10.0,
            prior_steering_rad: 0.0,
            prior_throttle: 0.0
        }
    }

    #[test]
    fn test_run() {
        let params = BridgeParams::default();
        let pipeline = Pipeline::new(&params);
        let mut ctrl = ScriptedController::new(vec![
            Ok(vec![-0.2, 0.6, 1.0, 0.05, 2.0, 0.15])
        ]);

        let resp = pipeline.run(&frame(), &mut ctrl).unwrap();

        // Path is y = 1 in the vehicle frame
        let expected = [1.0, 0.0, 0.0, 0.0];
        for i in 0..4 {
            assert!((resp.coeffs[i] - expected[i]).abs() < 1e-6);
        }

        let v_ms = 10.0 * 0.44704;
        assert!((resp.state.v_ms - v_ms).abs() < 1e-12);
        assert!((resp.state.x_m - v_ms * 0.1).abs() < 1e-12);
        assert!((resp.state.cte_m - 1.0).abs() < 1e-6);
        assert!(resp.state.epsi_rad.abs() < 1e-6);

        assert!((resp.command.steering + 0.2 / util::maths::deg_to_rad(25.0)).abs() < 1e-12);
        assert_eq!(resp.command.throttle, 0.6);
        assert_eq!(resp.predicted, vec![Point2::new(1.0, 0.05), Point2::new(2.0, 0.15)]);

        assert_eq!(resp.reference.len(), 24);
        assert!((resp.reference[0].x - 2.5).abs() < 1e-12);
        assert!(resp.reference.iter().all(|p| (p.y - 1.0).abs() < 1e-6));

        // The controller saw the estimated state and the fitted path
        assert_eq!(ctrl.calls.len(), 1);
        assert_eq!(ctrl.calls[0].0, resp.state);
        assert_eq!(ctrl.calls[0].1, resp.coeffs);
    }

    #[test]
    fn test_too_few_waypoints() {
        let pipeline = Pipeline::new(&BridgeParams::default());
        let mut ctrl = ScriptedController::new(vec![]);

        let mut f = frame();
        f.waypoints_m_wf.truncate(3);

        assert_eq!(
            pipeline.run(&f, &mut ctrl),
            Err(PipelineError::FitError(FitError::InsufficientSamples {
                order: 3, required: 4, found: 3
            }))
        );
        assert!(ctrl.calls.is_empty());
    }

    #[test]
    fn test_controller_failure() {
        let pipeline = Pipeline::new(&BridgeParams::default());
        let mut ctrl = ScriptedController::new(vec![
            Err(ControllerError::SolverFailure(String::from("diverged"))),
            Ok(vec![0.1])
        ]);

        assert!(matches!(
            pipeline.run(&frame(), &mut ctrl),
            Err(PipelineError::AdapterError(AdapterError::ControllerError(_)))
        ));
        assert_eq!(
            pipeline.run(&frame(), &mut ctrl),
            Err(PipelineError::AdapterError(AdapterError::ResultTooShort(1)))
        );
        assert_eq!(ctrl.calls.len(), 2);
    }
}
