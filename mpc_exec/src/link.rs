//! # Line links
//!
//! The bridge does not implement the simulator's transport. Instead it exchanges frames one per
//! line with whatever drives it:
//!
//! - `stdio`: frames are read from stdin and replies written to stdout, so that an external
//!   WebSocket relay can connect the bridge to the simulator.
//! - `replay`: frames are read from a recorded file and replies written to another file (or
//!   discarded). Blank lines and lines starting with `#` are skipped in recordings.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::trace;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Lines starting with this are ignored
const COMMENT_PREFIX: &str = "#";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A link exchanging one frame per line.
pub struct LineLink<R: BufRead, W: Write> {
    reader: R,
    writer: W,

    /// Scratch buffer for the line being read
    line: String,

    num_recv: u64,
    num_sent: u64
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Could not open {0}: {1}")]
    OpenError(String, io::Error),

    #[error("Could not receive a frame: {0}")]
    RecvError(io::Error),

    #[error("Could not send a frame: {0}")]
    SendError(io::Error)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<R: BufRead, W: Write> LineLink<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            line: String::new(),
            num_recv: 0,
            num_sent: 0
        }
    }

    /// Receive the next frame.
    ///
    /// Returns `Ok(None)` once the input is exhausted.
    pub fn recv(&mut self) -> Result<Option<String>, LinkError> {
        loop {
            self.line.clear();

            let n = self.reader
                .read_line(&mut self.line)
                .map_err(LinkError::RecvError)?;

            if n == 0 {
                return Ok(None)
            }

            let frame = self.line.trim();
            if frame.is_empty() || frame.starts_with(COMMENT_PREFIX) {
                continue;
            }

            self.num_recv += 1;
            trace!("Received frame {}", self.num_recv);

            return Ok(Some(frame.to_string()))
        }
    }

    /// Send a frame, flushing the writer so the frame is delivered immediately.
    pub fn send(&mut self, frame: &str) -> Result<(), LinkError> {
        writeln!(self.writer, "{}", frame).map_err(LinkError::SendError)?;
        self.writer.flush().map_err(LinkError::SendError)?;

        self.num_sent += 1;

        Ok(())
    }

    /// Number of frames received so far.
    pub fn num_recv(&self) -> u64 {
        self.num_recv
    }

    /// Number of frames sent so far.
    pub fn num_sent(&self) -> u64 {
        self.num_sent
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Link over the process's standard input and output.
pub fn stdio() -> LineLink<BufReader<io::Stdin>, io::Stdout> {
    LineLink::new(BufReader::new(io::stdin()), io::stdout())
}

/// Link replaying a recorded file.
///
/// Replies are written into `output` if given, otherwise they are discarded.
pub fn replay<P: AsRef<Path>>(
    input: P,
    output: Option<P>
) -> Result<LineLink<BufReader<File>, Box<dyn Write>>, LinkError> {
    let input = input.as_ref();
    let reader = File::open(input)
        .map(BufReader::new)
        .map_err(|e| LinkError::OpenError(input.display().to_string(), e))?;

    let writer: Box<dyn Write> = match output {
        Some(p) => {
            let p = p.as_ref();
            let file = File::create(p)
                .map_err(|e| LinkError::OpenError(p.display().to_string(), e))?;
            Box::new(BufWriter::new(file))
        },
        None => Box::new(io::sink())
    };

    Ok(LineLink::new(reader, writer))
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
