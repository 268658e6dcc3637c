//! Main bridge executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Initialise the controller and the bridge
//!     - Main loop, one iteration per received frame:
//!         - Receive a frame from the link
//!         - Bridge processing
//!         - Artificial actuation delay (steering replies only)
//!         - Send the reply, if any
//!
//! The loop ends when the link's input is exhausted.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::path::PathBuf;
use log::info;
use color_eyre::{Report, eyre::WrapErr};
use structopt::StructOpt;

// Internal
use mpc_lib::{
    bridge::{Bridge, BridgeParams},
    controller::{PidTracker, PidTrackerParams},
    link
};
use util::{
    module::State,
    logger::{logger_init, LevelFilter},
    session::Session
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Bridge between the driving simulator's telemetry and the vehicle controller.
#[derive(Debug, StructOpt)]
#[structopt(name = "mpc_exec")]
struct Opts {
    /// Bridge parameter file, defaults to `params/bridge.toml` in the software root
    #[structopt(long, parse(from_os_str))]
    params: Option<PathBuf>,

    /// Controller parameter file, defaults to `params/pid_ctrl.toml` in the software root
    #[structopt(long, parse(from_os_str))]
    pid_params: Option<PathBuf>,

    /// Replay frames recorded in this file instead of reading stdin
    #[structopt(long, parse(from_os_str))]
    replay: Option<PathBuf>,

    /// Write the replies of a replay into this file
    #[structopt(long, parse(from_os_str), requires = "replay")]
    output: Option<PathBuf>,

    /// Don't apply the artificial delay before steering replies
    #[structopt(long)]
    no_delay: bool,

    /// Enable debug logging
    #[structopt(short, long)]
    verbose: bool
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "mpc_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    let level = if opts.verbose {
        LevelFilter::Debug
    }
    else {
        LevelFilter::Info
    };
    logger_init(level, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Telemetry MPC Bridge Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let mut bridge_params: BridgeParams = match opts.params {
        Some(ref p) => util::params::load_from(p),
        None => util::params::load("bridge.toml")
    }.wrap_err("Could not load bridge params")?;

    bridge_params.validate()
        .wrap_err("Invalid bridge params")?;

    if opts.no_delay {
        bridge_params.response_delay_ms = 0;
    }

    let pid_params: PidTrackerParams = match opts.pid_params {
        Some(ref p) => util::params::load_from(p),
        None => util::params::load("pid_ctrl.toml")
    }.wrap_err("Could not load controller params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    let mut bridge = Bridge::new(bridge_params, PidTracker::new(pid_params));
    bridge.init((), &session)
        .wrap_err("Failed to initialise the Bridge")?;

    info!("Init complete\n");

    // ---- MAIN LOOP ----

    match opts.replay {
        Some(ref input) => {
            info!("Replaying frames from {:?}", input);
            let mut link = link::replay(input, opts.output.as_ref())
                .wrap_err("Failed to open the replay link")?;
            bridge.serve(&mut link)
                .wrap_err("Error while serving the replay")?;
        },
        None => {
            info!("Exchanging frames over stdio");
            bridge.serve(&mut link::stdio())
                .wrap_err("Error while serving stdio")?;
        }
    }

    // ---- SHUTDOWN ----

    info!(
        "End of execution, {} telemetry frames handled",
        bridge.num_telem_frames()
    );

    session.exit();

    Ok(())
}
