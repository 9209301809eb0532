//! Render callbacks for the display router.
//!
//! A real deployment would blit the frame to a window; the server ships two
//! headless sinks instead:
//!
//! - [`LogSink`] logs each displayed frame and its control string.
//! - [`RawFileSink`] overwrites a file with the latest frame's bytes.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use relay_core::Message;
use tracing::{info, warn};

/// Destination for displayed frames.
pub trait FrameSink: Send {
    /// Shows one frame.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised while presenting the frame.
    fn show(&mut self, frame: &Message) -> io::Result<()>;
}

#[derive(Debug, Default)]
pub struct LogSink {
    shown: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> u64 {
        self.shown
    }
}

impl FrameSink for LogSink {
    fn show(&mut self, frame: &Message) -> io::Result<()> {
        self.shown += 1;
        info!(
            "display #{} '{}' ({} bytes)",
            self.shown,
            frame.name,
            frame.payload.len()
        );
        Ok(())
    }
}

/// Writes each frame's payload to `path`, truncating what was there.
#[derive(Debug)]
pub struct RawFileSink {
    path: PathBuf,
}

impl RawFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSink for RawFileSink {
    fn show(&mut self, frame: &Message) -> io::Result<()> {
        let mut file = File::create(&self.path)?;
        file.write_all(&frame.payload)?;
        file.flush()
    }
}

/// Adapts a sink into a display-router callback.  Sink errors are logged
/// and the frame is dropped.
pub fn into_display_function(mut sink: impl FrameSink + 'static) -> impl FnMut(Message) + Send {
    move |frame: Message| {
        if let Err(e) = sink.show(&frame) {
            warn!("failed to show '{}': {e}", frame.name);
        }
    }
}

/// Picks the raw-file sink when `frame_output` is set, else the log sink.
pub fn sink_for(frame_output: Option<&Path>) -> Box<dyn FrameSink> {
    match frame_output {
        Some(path) => Box::new(RawFileSink::new(path)),
        None => Box::new(LogSink::new()),
    }
}

impl FrameSink for Box<dyn FrameSink> {
    fn show(&mut self, frame: &Message) -> io::Result<()> {
        (**self).show(frame)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
