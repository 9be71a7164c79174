use std::{path::Path, time::Instant};

use io::StreamIO;

use super::{open_input, open_output, CopyStats};
use crate::{workload::Compute, Error, Result};

/// read `block_size` bytes at a time from `src` and write them to `dst` until end of file,
/// `work` runs once per block between the read and the write
pub fn blocking_copy<W: Compute + ?Sized>(
    src: &Path,
    dst: &Path,
    block_size: usize,
    work: &mut W,
) -> Result<CopyStats> {
    if block_size == 0 {
        return Err(Error::Invalid("block size must be > 0".into()));
    }
    let mut input = open_input(src, false)?;
    let mut output = open_output(dst)?;
    let mut buf = vec![0u8; block_size];
    let mut stats = CopyStats {
        bytes: 0,
        ops: 0,
        elapsed: Default::default(),
        complete: true,
    };

    let start = Instant::now();
    loop {
        let n = input.read(&mut buf).map_err(|e| Error::io("read", src, e))?;
        stats.ops += 1;
        if n == 0 {
            break;
        }
        work.step();
        output
            .write_all(&buf[..n])
            .map_err(|e| Error::io("write", dst, e))?;
        stats.ops += 1;
        stats.bytes += n as u64;
    }
    stats.elapsed = start.elapsed();

    log::debug!(
        "blocking copy {src:?} => {dst:?}: {} bytes, {} ops",
        stats.bytes,
        stats.ops
    );
    Ok(stats)
}
