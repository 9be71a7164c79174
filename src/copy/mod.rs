use std::{path::Path, time::Duration};

use io::File;

use crate::{Error, Result};

mod blocking;
#[cfg(target_os = "linux")]
mod chunked;
mod nonblocking;
pub mod region;

pub use blocking::blocking_copy;
#[cfg(target_os = "linux")]
pub use chunked::chunked_copy;
pub use nonblocking::nonblocking_copy;
pub use region::{split, Region};

/// what one copy run did, `elapsed` covers the copy loop only, opening files is excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyStats {
    /// bytes written to the destination
    pub bytes: u64,
    /// read and write requests issued
    pub ops: u64,
    pub elapsed: Duration,
    /// `false` when the loop stopped on an error and the output is truncated
    pub complete: bool,
}

pub(crate) fn open_input(path: &Path, nonblock: bool) -> Result<File> {
    File::options()
        .read(true)
        .nonblock(nonblock)
        .open(path)
        .map_err(|e| Error::io("open", path, e))
}

pub(crate) fn open_output(path: &Path) -> Result<File> {
    File::options()
        .write(true)
        .create(true)
        .trunc(true)
        .open(path)
        .map_err(|e| Error::io("create", path, e))
}
