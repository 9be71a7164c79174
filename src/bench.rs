use std::{io::Write, path::Path};

use io::{File, StreamIO};

use crate::{
    cache::{dropper, CacheDropper},
    copy::{self, CopyStats},
    utils::options::{Options, Suite},
    workload::{Compute, Idle, MatrixMul},
    Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Blocking,
    NonBlocking,
    Chunked,
    BlockingMatrix,
    ChunkedMatrix,
}

impl Phase {
    pub fn output_name(&self) -> &'static str {
        match self {
            Self::Blocking => "output_block.txt",
            Self::NonBlocking => "output_nonblock.txt",
            Self::Chunked => "output_aio.txt",
            Self::BlockingMatrix => "output_block_matrix.txt",
            Self::ChunkedMatrix => "output_aio_matrix.txt",
        }
    }

    pub fn title(&self, parts: usize) -> String {
        match self {
            Self::Blocking => "Blocking I/O".into(),
            Self::NonBlocking => "Non-Blocking I/O".into(),
            Self::Chunked => format!("Asynchronous I/O (polling, {parts} chunks)"),
            Self::BlockingMatrix => "Blocking I/O + matrix".into(),
            Self::ChunkedMatrix => format!("Asynchronous I/O + matrix (polling, {parts} chunks)"),
        }
    }

    /// short label for the summary table
    pub fn label(&self) -> &'static str {
        match self {
            Self::Blocking => "block",
            Self::NonBlocking => "nonblock",
            Self::Chunked => "aio",
            Self::BlockingMatrix => "block+matrix",
            Self::ChunkedMatrix => "aio+matrix",
        }
    }
}

impl Suite {
    pub fn phases(&self) -> &'static [Phase] {
        match self {
            Self::Plain => &[Phase::Blocking, Phase::NonBlocking, Phase::Chunked],
            Self::Overlap => &[Phase::BlockingMatrix, Phase::ChunkedMatrix],
            Self::All => &[
                Phase::Blocking,
                Phase::NonBlocking,
                Phase::Chunked,
                Phase::BlockingMatrix,
                Phase::ChunkedMatrix,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checksum {
    pub len: u64,
    pub crc: u32,
}

/// crc32c over the whole file
pub fn checksum(path: &Path) -> Result<Checksum> {
    let mut f = File::options()
        .read(true)
        .open(path)
        .map_err(|e| Error::io("open", path, e))?;
    let mut buf = vec![0u8; 64 << 10];
    let mut sum = Checksum { len: 0, crc: 0 };
    loop {
        let n = f.read(&mut buf).map_err(|e| Error::io("read", path, e))?;
        if n == 0 {
            break;
        }
        sum.crc = crc32c::crc32c_append(sum.crc, &buf[..n]);
        sum.len += n as u64;
    }
    Ok(sum)
}

#[derive(Debug, Clone, Copy)]
pub struct PhaseReport {
    pub phase: Phase,
    pub stats: CopyStats,
    /// `None` when verification is off
    pub verified: Option<bool>,
    pub compute_steps: u64,
}

impl PhaseReport {
    pub fn millis(&self) -> f64 {
        self.stats.elapsed.as_secs_f64() * 1000.0
    }

    pub fn mib_per_sec(&self) -> f64 {
        let secs = self.stats.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.stats.bytes as f64 / (1 << 20) as f64 / secs
    }

    /// output is complete and, if checked, identical to the input
    pub fn is_ok(&self) -> bool {
        self.stats.complete && self.verified != Some(false)
    }
}

fn emit(r: std::io::Result<()>) -> Result<()> {
    r.map_err(|e| Error::io("write", Path::new("<report>"), e))
}

pub struct Bench {
    opt: Options,
    dropper: Box<dyn CacheDropper>,
}

impl Bench {
    pub fn new(opt: Options, dropper: Box<dyn CacheDropper>) -> Self {
        Self { opt, dropper }
    }

    /// use the cache dropper selected by [`Options::cache`]
    pub fn from_options(opt: Options) -> Self {
        let d = dropper(opt.cache);
        Self::new(opt, d)
    }

    fn drop_caches(&self) {
        if let Err(e) = self.dropper.drop_caches(&self.opt.input) {
            log::warn!(
                "page cache drop `{}` failed, timing may hit the cache: {e}",
                self.dropper.name()
            );
        }
    }

    fn copy_with<W: Compute>(&self, phase: Phase, dst: &Path, work: &mut W) -> Result<CopyStats> {
        let opt = &self.opt;
        match phase {
            Phase::Blocking | Phase::BlockingMatrix => {
                copy::blocking_copy(&opt.input, dst, opt.block_size, work)
            }
            Phase::NonBlocking => copy::nonblocking_copy(&opt.input, dst, opt.block_size, opt.poll),
            #[cfg(target_os = "linux")]
            Phase::Chunked | Phase::ChunkedMatrix => {
                copy::chunked_copy(&opt.input, dst, opt.parts, opt.poll, work)
            }
            #[cfg(not(target_os = "linux"))]
            Phase::Chunked | Phase::ChunkedMatrix => Err(Error::Failed(
                "asynchronous copy is only supported on linux".into(),
            )),
        }
    }

    /// drop caches, run one timed copy and check its output against `expect`
    pub fn run_phase<O: Write>(
        &self,
        phase: Phase,
        expect: Option<Checksum>,
        out: &mut O,
    ) -> Result<PhaseReport> {
        let dst = self.opt.output(phase.output_name());
        emit(writeln!(out, "\n* {}", phase.title(self.opt.parts)))?;

        self.drop_caches();
        let (stats, compute_steps) = match phase {
            Phase::BlockingMatrix | Phase::ChunkedMatrix => {
                let mut w = MatrixMul::new(self.opt.matrix_size);
                let stats = self.copy_with(phase, &dst, &mut w)?;
                (stats, w.steps())
            }
            _ => (self.copy_with(phase, &dst, &mut Idle::default())?, 0),
        };

        let mut report = PhaseReport {
            phase,
            stats,
            verified: None,
            compute_steps,
        };
        emit(writeln!(out, "\telapsed: {:.3} ms", report.millis()))?;
        if !stats.complete {
            emit(writeln!(out, "\twarning: output {dst:?} is truncated"))?;
        }
        if let Some(expect) = expect {
            let got = checksum(&dst)?;
            let same = got == expect;
            report.verified = Some(same);
            if !same {
                log::warn!("{dst:?} differs from input: {got:?} vs {expect:?}");
                emit(writeln!(out, "\twarning: output {dst:?} differs from input"))?;
            }
        }
        log::info!(
            "{} done, {} bytes in {:.3} ms, {} ops, {} compute steps",
            phase.label(),
            stats.bytes,
            report.millis(),
            stats.ops,
            compute_steps
        );
        Ok(report)
    }

    /// reject a chunk count the asynchronous phases can't use before anything is timed
    fn preflight(&self) -> Result<()> {
        let chunked = self
            .opt
            .suite
            .phases()
            .iter()
            .any(|p| matches!(p, Phase::Chunked | Phase::ChunkedMatrix));
        if !chunked {
            return Ok(());
        }
        let size = std::fs::metadata(&self.opt.input)
            .map_err(|e| Error::io("stat", &self.opt.input, e))?
            .len();
        copy::split(size, self.opt.parts).map(|_| ())
    }

    /// run every phase of the configured suite in order, stops at the first fatal error
    pub fn run<O: Write>(&self, out: &mut O) -> Result<Vec<PhaseReport>> {
        self.preflight()?;
        emit(writeln!(
            out,
            "starting benchmark on {:?}, aio chunks: {}",
            self.opt.input, self.opt.parts
        ))?;
        let expect = if self.opt.verify {
            Some(checksum(&self.opt.input)?)
        } else {
            None
        };

        let mut reports = Vec::new();
        for &phase in self.opt.suite.phases() {
            reports.push(self.run_phase(phase, expect, out)?);
        }
        summary(&reports, out)?;
        Ok(reports)
    }
}

pub fn summary<O: Write>(reports: &[PhaseReport], out: &mut O) -> Result<()> {
    emit(writeln!(
        out,
        "\n{:<14} {:>12} {:>12} {:>10} {:>9}",
        "phase", "bytes", "ms", "MiB/s", "verified"
    ))?;
    for r in reports {
        let verified = match r.verified {
            Some(true) => "yes",
            Some(false) => "NO",
            None => "-",
        };
        emit(writeln!(
            out,
            "{:<14} {:>12} {:>12.3} {:>10.1} {:>9}",
            r.phase.label(),
            r.stats.bytes,
            r.millis(),
            r.mib_per_sec(),
            verified
        ))?;
    }
    Ok(())
}
