use std::{io::ErrorKind, path::Path, time::Instant};

use io::StreamIO;

use super::{open_input, open_output, CopyStats};
use crate::{utils::spin::PollBound, Error, Result};

/// same shape as [`super::blocking_copy`] but the source is opened `O_NONBLOCK` and a
/// would-block read is retried in a busy loop bounded by `bound`
///
/// a read error other than would-block ends the loop, the output is then truncated and the
/// returned stats are marked incomplete
pub fn nonblocking_copy(
    src: &Path,
    dst: &Path,
    block_size: usize,
    bound: PollBound,
) -> Result<CopyStats> {
    if block_size == 0 {
        return Err(Error::Invalid("block size must be > 0".into()));
    }
    let mut input = open_input(src, true)?;
    let mut output = open_output(dst)?;
    let mut buf = vec![0u8; block_size];
    let mut stats = CopyStats {
        bytes: 0,
        ops: 0,
        elapsed: Default::default(),
        complete: true,
    };
    let mut would_block = 0u64;

    let start = Instant::now();
    'copy: loop {
        let mut spinner = bound.spinner("non-blocking read");
        let n = loop {
            stats.ops += 1;
            match input.read(&mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    would_block += 1;
                    spinner.spin()?;
                }
                Err(e) => {
                    log::error!("read {src:?}: {e}, stop at {} bytes", stats.bytes);
                    stats.complete = false;
                    break 'copy;
                }
            }
        };
        if n == 0 {
            break;
        }
        output
            .write_all(&buf[..n])
            .map_err(|e| Error::io("write", dst, e))?;
        stats.ops += 1;
        stats.bytes += n as u64;
    }
    stats.elapsed = start.elapsed();

    log::debug!(
        "non-blocking copy {src:?} => {dst:?}: {} bytes, {} ops, {would_block} would-block",
        stats.bytes,
        stats.ops
    );
    Ok(stats)
}
