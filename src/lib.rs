//! File copy latency benchmark
//!
//! Compares three ways of copying one file: a blocking read/write loop, a non-blocking loop that
//! spins on would-block, and a chunked copy that keeps N kernel asynchronous requests in flight
//! and busy-polls them. Each phase can be interleaved with a synthetic CPU workload to model
//! compute overlapping I/O.

pub use bench::{checksum, Bench, Checksum, Phase, PhaseReport};
pub use cache::{CacheDropper, NoDrop, ShellDrop};
#[cfg(target_os = "linux")]
pub use cache::FadviseDrop;
#[cfg(target_os = "linux")]
pub use copy::chunked_copy;
pub use copy::{blocking_copy, nonblocking_copy, split, CopyStats, Region};
pub use utils::{
    env_u64,
    options::{CacheMode, Options, Suite},
    spin::PollBound,
    Error, RandomPath, Result,
};
pub use workload::{Compute, Idle, MatrixMul};

mod bench;
mod cache;
mod copy;
mod utils;
mod workload;
