//! Side-channel snapshot files.
//!
//! Snapshots are plain text, rewritten in place every time, and never read
//! back by frame-relay itself.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::endpoint::Role;
use crate::error::CommError;

/// File name for the receive-cadence snapshot of one endpoint.
pub fn receive_snapshot_name(role: Role, port: &str) -> String {
    format!("{role}_dn_counter_{port}.txt")
}

/// Truncates `path` and fills it through `write`.
///
/// # Errors
///
/// Returns [`CommError::Snapshot`] if the file cannot be created or written.
pub fn write_snapshot<F>(path: &Path, write: F) -> Result<(), CommError>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let result = File::create(path).and_then(|file| {
        let mut out = BufWriter::new(file);
        write(&mut out)?;
        out.flush()
    });
    result.map_err(|source| CommError::Snapshot {
        path: path.to_path_buf(),
        source,
    })
}
