use std::{path::Path, time::Instant};

use io::{AioOp, Poll, StreamIO};

use super::{open_input, open_output, region::split, CopyStats};
use crate::{utils::spin::PollBound, workload::Compute, Error, Result};

fn wait(op: &mut AioOp, bound: PollBound, what: &'static str, path: &Path) -> Result<usize> {
    let mut spinner = bound.spinner(what);
    loop {
        match op.poll().map_err(|e| Error::io(what, path, e))? {
            Poll::Ready(n) => {
                log::trace!("{what} ready after {} spins", spinner.spins());
                return Ok(n);
            }
            Poll::Pending => spinner.spin()?,
        }
    }
}

/// copy `src` to `dst` as `parts` concurrent asynchronous requests
///
/// every read is submitted before the first one is awaited; reads are then awaited in order,
/// each completed buffer moving into a write at the same offset; finally writes are awaited in
/// order and their buffers released. `work` runs once per region before its read is checked
pub fn chunked_copy<W: Compute + ?Sized>(
    src: &Path,
    dst: &Path,
    parts: usize,
    bound: PollBound,
    work: &mut W,
) -> Result<CopyStats> {
    let input = open_input(src, false)?;
    let size = input.size().map_err(|e| Error::io("stat", src, e))?;
    let regions = split(size, parts)?;
    let output = open_output(dst)?;
    let mut stats = CopyStats {
        bytes: 0,
        ops: 0,
        elapsed: Default::default(),
        complete: true,
    };

    // allocated and zeroed outside the timed window
    let bufs: Vec<Vec<u8>> = regions.iter().map(|r| vec![0u8; r.len as usize]).collect();

    let start = Instant::now();
    let mut reads = Vec::with_capacity(regions.len());
    for (r, buf) in regions.iter().zip(bufs) {
        let op = AioOp::read_at(input.fd(), buf, r.offset)
            .map_err(|e| Error::io("aio read", src, e))?;
        reads.push(op);
        stats.ops += 1;
    }

    let mut writes = Vec::with_capacity(regions.len());
    for (r, mut op) in regions.iter().zip(reads) {
        work.step();
        let n = wait(&mut op, bound, "aio read", src)?;
        if (n as u64) < r.len {
            log::warn!(
                "region at {} read {n} of {} bytes, input shrank?",
                r.offset,
                r.len
            );
            stats.complete = false;
        }
        let buf = op
            .into_buffer()
            .map_err(|_| Error::Failed(format!("read at {} still in flight", r.offset)))?;
        let op = AioOp::write_at(output.fd(), buf, n, r.offset)
            .map_err(|e| Error::io("aio write", dst, e))?;
        writes.push(op);
        stats.ops += 1;
    }

    for mut op in writes {
        stats.bytes += wait(&mut op, bound, "aio write", dst)? as u64;
        // dropping the op releases its buffer
    }
    stats.elapsed = start.elapsed();

    log::debug!(
        "chunked copy {src:?} => {dst:?}: {} regions, {} bytes, {} ops",
        regions.len(),
        stats.bytes,
        stats.ops
    );
    Ok(stats)
}
