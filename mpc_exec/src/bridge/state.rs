//! Implementations for the Bridge state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::convert::TryFrom;
use std::io::{BufRead, Write};
use std::thread;
use log::{debug, error, info, trace, warn};
use serde::Serialize;

// Internal
use super::{BridgeError, BridgeParams};
use crate::controller::Controller;
use crate::link::LineLink;
use crate::pipeline::{Pipeline, PipelineError};
use crate::response::ControlResponse;
use crate::telemetry::TelemetryFrame;
use comms_if::sim::{envelope, Inbound, Telemetry};
use util::{
    archive::Archiver,
    module::State,
    session::{self, Session}
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Archive file, relative to the session archive root
const ARCHIVE_FILE: &str = "bridge.csv";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Bridge module state
pub struct Bridge<C: Controller> {
    params: BridgeParams,

    pipeline: Pipeline,

    /// Controller owned for the whole session
    controller: C,

    arch: Option<Archiver>,

    /// Number of telemetry frames handled so far
    num_telem_frames: u64
}

/// Status report for a single bridge cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatusReport {
    /// True if the frame was a telemetry event
    pub telemetry: bool,

    /// Why the manual driving reply was sent, if it was
    pub fallback: Option<FallbackCause>,

    pub cte_m: f64,
    pub epsi_rad: f64,
    pub steering: f64,
    pub throttle: f64,

    /// True if the steering demand had to be limited to [-1, 1]
    pub steer_saturated: bool
}

/// Flat per-frame archive record.
#[derive(Debug, Clone, Copy, Serialize)]
struct FrameRecord {
    time_s: f64,
    frame: u64,
    x_m: f64,
    y_m: f64,
    psi_rad: f64,
    v_ms: f64,
    cte_m: f64,
    epsi_rad: f64,
    c0: f64,
    c1: f64,
    c2: f64,
    c3: f64,
    steering: f64,
    throttle: f64,
    steer_saturated: bool
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The reply to send back to the simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Nothing to send
    None,

    /// The manual driving envelope
    Manual(String),

    /// A steering command envelope
    Steer(String)
}

/// Reasons for answering a telemetry frame with the manual driving envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FallbackCause {
    /// The frame held no data or the null marker
    NoData,

    /// The envelope could not be parsed
    InvalidEnvelope,

    /// The telemetry payload is missing fields or holds invalid values
    InvalidTelemetry,

    /// The reference path could not be fitted
    Fit,

    /// The controller failed or returned a malformed result
    Controller,

    /// The response could not be serialized
    Encode
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Reply {
    /// The frame to send, if any.
    pub fn frame(&self) -> Option<&str> {
        match self {
            Reply::None => None,
            Reply::Manual(f) | Reply::Steer(f) => Some(f.as_str())
        }
    }
}

impl<C: Controller> Bridge<C> {
    pub fn new(params: BridgeParams, controller: C) -> Self {
        Self {
            pipeline: Pipeline::new(&params),
            params,
            controller,
            arch: None,
            num_telem_frames: 0
        }
    }

    pub fn params(&self) -> &BridgeParams {
        &self.params
    }

    /// Number of telemetry frames handled so far.
    pub fn num_telem_frames(&self) -> u64 {
        self.num_telem_frames
    }

    /// Answer every frame received on the link until its input is exhausted.
    ///
    /// Steering replies are held back by the configured response delay before being sent.
    /// Manual driving replies go out immediately and frames without a reply send nothing.
    pub fn serve<R: BufRead, W: Write>(
        &mut self,
        link: &mut LineLink<R, W>
    ) -> Result<(), BridgeError> {
        let delay = self.params.response_delay();

        while let Some(frame) = link.recv().map_err(BridgeError::RecvError)? {
            let (reply, report) = self.proc(frame.as_str())?;

            if let Some(cause) = report.fallback {
                warn!("Manual driving reply sent ({:?})", cause);
            }

            // Actuation latency only applies to commands
            if let Reply::Steer(_) = reply {
                if delay.as_millis() > 0 {
                    thread::sleep(delay);
                }
            }

            if let Some(f) = reply.frame() {
                link.send(f).map_err(BridgeError::SendError)?;
            }
        }

        info!(
            "Link closed, {} frames received, {} replies sent",
            link.num_recv(), link.num_sent()
        );

        Ok(())
    }

    fn fallback(report: &mut StatusReport, cause: FallbackCause) -> Reply {
        report.fallback = Some(cause);
        Reply::Manual(envelope::manual())
    }

    /// Handle the payload of a telemetry event.
    fn handle_telemetry(
        &mut self,
        payload: serde_json::Value,
        report: &mut StatusReport
    ) -> Result<Reply, BridgeError> {
        let frame = match Telemetry::from_value(payload)
            .map_err(|e| e.to_string())
            .and_then(|t| TelemetryFrame::try_from(t).map_err(|e| e.to_string()))
        {
            Ok(f) => f,
            Err(e) => {
                warn!("Invalid telemetry: {}", e);
                return Ok(Self::fallback(report, FallbackCause::InvalidTelemetry))
            }
        };

        let response = match self.pipeline.run(&frame, &mut self.controller) {
            Ok(r) => r,
            Err(PipelineError::FitError(e)) => {
                warn!("Cannot fit the reference path: {}", e);
                return Ok(Self::fallback(report, FallbackCause::Fit))
            },
            Err(PipelineError::AdapterError(e)) => {
                error!("Controller failed: {}", e);
                return Ok(Self::fallback(report, FallbackCause::Controller))
            }
        };

        report.cte_m = response.state.cte_m;
        report.epsi_rad = response.state.epsi_rad;
        report.steering = response.command.steering;
        report.throttle = response.command.throttle;
        report.steer_saturated = response.steer_saturated;

        debug!(
            "Frame {}: cte {:.3} m, epsi {:.4} rad -> steering {:.4}, throttle {:.3}",
            self.num_telem_frames, report.cte_m, report.epsi_rad,
            report.steering, report.throttle
        );

        self.archive(&response)?;

        match response.to_envelope() {
            Ok(s) => Ok(Reply::Steer(s)),
            Err(e) => {
                error!("Cannot serialize the response: {}", e);
                Ok(Self::fallback(report, FallbackCause::Encode))
            }
        }
    }

    fn archive(&mut self, response: &ControlResponse) -> Result<(), BridgeError> {
        let arch = match self.arch {
            Some(ref mut a) => a,
            None => return Ok(())
        };

        let s = &response.state;
        let c = &response.coeffs;

        arch.serialise(FrameRecord {
            time_s: session::get_elapsed_seconds(),
            frame: self.num_telem_frames,
            x_m: s.x_m,
            y_m: s.y_m,
            psi_rad: s.psi_rad,
            v_ms: s.v_ms,
            cte_m: s.cte_m,
            epsi_rad: s.epsi_rad,
            c0: c[0],
            c1: c[1],
            c2: c[2],
            c3: c[3],
            steering: response.command.steering,
            throttle: response.command.throttle,
            steer_saturated: response.steer_saturated
        }).map_err(BridgeError::ArchiveWriteError)
    }
}

impl<C: Controller> State for Bridge<C> {
    type InitData = ();
    type InitError = BridgeError;

    type InputData = str;
    type OutputData = Reply;
    type StatusReport = StatusReport;
    type ProcError = BridgeError;

    /// Initialise the bridge, creating the frame archive if enabled.
    fn init(&mut self, _init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        if self.params.archive {
            self.arch = Some(
                Archiver::from_path(session, ARCHIVE_FILE)
                    .map_err(BridgeError::ArchiveInitError)?
            );
        }

        Ok(())
    }

    /// Answer a single raw frame.
    ///
    /// Per-frame failures are answered with the manual driving envelope and do not produce an
    /// error. Only archive failures are returned as errors.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let mut report = StatusReport::default();

        trace!("Frame received: {}", input_data);

        let reply = match envelope::decode(input_data) {
            Ok(Inbound::NotEvent) => Reply::None,
            Ok(Inbound::Event { ref name, .. }) if name != envelope::TELEMETRY_EVENT => {
                trace!("Ignoring {} event", name);
                Reply::None
            },
            Ok(Inbound::NoData) => {
                report.telemetry = true;
                self.num_telem_frames += 1;
                debug!("Frame without data, handing back manual control");
                Self::fallback(&mut report, FallbackCause::NoData)
            },
            Ok(Inbound::Event { payload, .. }) => {
                report.telemetry = true;
                self.num_telem_frames += 1;
                self.handle_telemetry(payload, &mut report)?
            },
            Err(e) => {
                report.telemetry = true;
                self.num_telem_frames += 1;
                warn!("Invalid envelope: {}", e);
                Self::fallback(&mut report, FallbackCause::InvalidEnvelope)
            }
        };

        Ok((reply, report))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::controller::{ControllerError, PidTracker, PidTrackerParams};
    use crate::estimator::VehicleState;
    use crate::traj_fit::PolyCoeffs;
    use comms_if::sim::SteerPayload;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    const MANUAL: &str = "42[\"manual\",{}]";

    struct FailingController;

    impl Controller for FailingController {
        fn solve(
            &mut self,
            _state: &VehicleState,
            _coeffs: &PolyCoeffs
        ) -> Result<Vec<f64>, ControllerError> {
            Err(ControllerError::Infeasible(String::from("always")))
        }
    }

    fn delayed_bridge(delay_ms: u64) -> Bridge<PidTracker> {
        Bridge::new(
            BridgeParams {
                response_delay_ms: delay_ms,
                ..Default::default()
            },
            PidTracker::new(PidTrackerParams::default())
        )
    }

    fn bridge() -> Bridge<PidTracker> {
        Bridge::new(
            BridgeParams::default(),
            PidTracker::new(PidTrackerParams::default())
        )
    }

    fn telemetry_frame(num_points: usize) -> String {
        let ptsx: Vec<String> = (1..=num_points).map(|i| format!("{}", 10.0 * i as f64)).collect();
        let ptsy: Vec<String> = (1..=num_points).map(|i| format!("{}", 0.5 + 0.01 * i as f64)).collect();

        format!(
            "42[\"telemetry\",{{\"ptsx\":[{}],\"ptsy\":[{}],\"x\":0.0,\"y\":0.0,\"psi\":0.0,\
            \"speed\":30.0,\"steering_angle\":0.0,\"throttle\":0.0}}]",
            ptsx.join(","), ptsy.join(",")
        )
    }

    #[test]
    fn test_null_telemetry() {
        let mut b = bridge();
        let (reply, report) = b.proc("42[\"telemetry\",null]").unwrap();

        assert_eq!(reply, Reply::Manual(String::from(MANUAL)));
        assert_eq!(reply.frame(), Some(MANUAL));
        assert!(report.telemetry);
        assert_eq!(report.fallback, Some(FallbackCause::NoData));
        assert_eq!(b.num_telem_frames(), 1);
    }

    #[test]
    fn test_no_reply() {
        let mut b = bridge();

        for frame in ["", "2", "0{\"sid\":\"abc\"}", "3", "42[\"reset\",{}]"].iter() {
            let (reply, report) = b.proc(frame).unwrap();
            assert_eq!(reply, Reply::None, "frame {:?}", frame);
            assert_eq!(reply.frame(), None);
            assert!(!report.telemetry);
        }

        assert_eq!(b.num_telem_frames(), 0);
    }

    #[test]
    fn test_invalid_frames() {
        let mut b = bridge();

        let (reply, report) = b.proc("42[\"telemetry\",{\"ptsx\":[1.0}]").unwrap();
        assert_eq!(reply, Reply::Manual(String::from(MANUAL)));
        assert_eq!(report.fallback, Some(FallbackCause::InvalidEnvelope));

        let (reply, report) = b.proc("42[\"telemetry\",{\"x\":1.0}]").unwrap();
        assert_eq!(reply, Reply::Manual(String::from(MANUAL)));
        assert_eq!(report.fallback, Some(FallbackCause::InvalidTelemetry));

        let (reply, report) = b.proc(
            "42[\"telemetry\",{\"ptsx\":[1.0,2.0,3.0,4.0],\"ptsy\":[1.0,2.0,3.0],\"x\":0.0,\
            \"y\":0.0,\"psi\":0.0,\"speed\":0.0,\"steering_angle\":0.0,\"throttle\":0.0}]"
        ).unwrap();
        assert_eq!(reply, Reply::Manual(String::from(MANUAL)));
        assert_eq!(report.fallback, Some(FallbackCause::InvalidTelemetry));

        assert_eq!(b.num_telem_frames(), 3);
    }

    #[test]
    fn test_too_few_waypoints() {
        let mut b = bridge();
        let (reply, report) = b.proc(&telemetry_frame(3)).unwrap();

        assert_eq!(reply, Reply::Manual(String::from(MANUAL)));
        assert_eq!(report.fallback, Some(FallbackCause::Fit));
    }

    #[test]
    fn test_controller_failure() {
        let mut b = Bridge::new(BridgeParams::default(), FailingController);
        let (reply, report) = b.proc(&telemetry_frame(6)).unwrap();

        assert_eq!(reply, Reply::Manual(String::from(MANUAL)));
        assert_eq!(report.fallback, Some(FallbackCause::Controller));

        // The session carries on
        let (reply, _) = b.proc("42[\"telemetry\",null]").unwrap();
        assert_eq!(reply, Reply::Manual(String::from(MANUAL)));
        assert_eq!(b.num_telem_frames(), 2);
    }

    #[test]
    fn test_steer_reply() {
        let mut b = bridge();
        let (reply, report) = b.proc(&telemetry_frame(6)).unwrap();

        let frame = match reply {
            Reply::Steer(ref f) => f.clone(),
            other => panic!("Expected a steer reply, got {:?}", other)
        };
        assert!(report.telemetry);
        assert_eq!(report.fallback, None);

        let payload = match envelope::decode(&frame).unwrap() {
            Inbound::Event { name, payload } => {
                assert_eq!(name, envelope::STEER_EVENT);
                SteerPayload::from_value(payload).unwrap()
            },
            other => panic!("Expected a steer event, got {:?}", other)
        };

        assert_eq!(payload.steering_angle, report.steering);
        assert_eq!(payload.throttle, report.throttle);
        assert!(payload.steering_angle >= -1.0 && payload.steering_angle <= 1.0);

        // Path to the left of the vehicle
        assert!(report.cte_m > 0.0);
        assert!(payload.steering_angle < 0.0);

        assert_eq!(payload.mpc_x.len(), PidTrackerParams::default().num_pred_steps);
        assert_eq!(payload.mpc_x.len(), payload.mpc_y.len());
        assert_eq!(payload.next_x.len(), 24);
        assert_eq!(payload.next_x[0], 2.5);
    }

    #[test]
    fn test_serve_delays_steer_replies() {
        let mut b = delayed_bridge(200);
        let input = format!("{}\n{}\n", telemetry_frame(6), telemetry_frame(6));
        let mut out = Vec::new();

        let start = Instant::now();
        {
            let mut link = LineLink::new(Cursor::new(input), &mut out);
            b.serve(&mut link).unwrap();
            assert_eq!(link.num_recv(), 2);
            assert_eq!(link.num_sent(), 2);
        }
        assert!(start.elapsed() >= Duration::from_millis(400));

        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.starts_with("42[\"steer\"")));
    }

    #[test]
    fn test_serve_manual_replies_not_delayed() {
        let mut b = delayed_bridge(200);
        let input = format!(
            "42[\"telemetry\",null]\n{}\n42[\"telemetry\",{{\"x\":1.0}}]\n",
            telemetry_frame(3)
        );
        let mut out = Vec::new();

        let start = Instant::now();
        {
            let mut link = LineLink::new(Cursor::new(input), &mut out);
            b.serve(&mut link).unwrap();
        }
        assert!(start.elapsed() < Duration::from_millis(200));

        let out = String::from_utf8(out).unwrap();
        assert_eq!(out, format!("{}\n{}\n{}\n", MANUAL, MANUAL, MANUAL));
    }

    #[test]
    fn test_serve_ignored_frames_send_nothing() {
        let mut b = delayed_bridge(200);
        let input = "2\n42[\"reset\",{}]\n42[\"telemetry\",null]\n0{\"sid\":\"abc\"}\n";
        let mut out = Vec::new();

        {
            let mut link = LineLink::new(Cursor::new(input), &mut out);
            b.serve(&mut link).unwrap();
            assert_eq!(link.num_recv(), 4);
            assert_eq!(link.num_sent(), 1);
        }

        assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", MANUAL));
        assert_eq!(b.num_telem_frames(), 1);
    }
}
