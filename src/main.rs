use std::{path::PathBuf, process::ExitCode, str::FromStr, time::Duration};

use aiobench::{env_u64, Bench, CacheMode, Error, Options, PollBound, Suite};
use clap::{error::ErrorKind, Parser};
use log::LevelFilter;
use logger::Logger;

/// Time blocking, non-blocking and chunked asynchronous copies of one file
#[derive(Debug, Parser)]
#[command(name = "aiobench", version, about)]
struct Cli {
    /// number of concurrent chunks of the asynchronous copy
    parts: usize,

    /// file to copy, must exist
    #[arg(long, default_value = Options::INPUT)]
    input: PathBuf,

    /// directory receiving the output files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// run the matrix overlap suite instead of the plain one
    #[arg(long, conflicts_with = "all")]
    overlap: bool,

    /// run both suites
    #[arg(long)]
    all: bool,

    /// page cache drop before each phase: shell, fadvise or none
    #[arg(long, default_value = "shell")]
    cache: CacheMode,

    /// give up a busy-poll wait after this many failed checks [env: AIOBENCH_SPIN_LIMIT]
    #[arg(long)]
    spin_limit: Option<u64>,

    /// give up a busy-poll wait after this many milliseconds [env: AIOBENCH_TIMEOUT_MS]
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// skip comparing outputs against the input
    #[arg(long)]
    no_verify: bool,

    /// off, error, warn, info, debug or trace
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// also append log lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn options(&self) -> Options {
        let mut opt = Options::new(&self.input, self.parts);
        opt.output_dir = self.output_dir.clone();
        opt.suite = if self.all {
            Suite::All
        } else if self.overlap {
            Suite::Overlap
        } else {
            Suite::Plain
        };
        opt.cache = self.cache;
        opt.verify = !self.no_verify;

        let max_spins = self
            .spin_limit
            .or_else(|| env_u64("AIOBENCH_SPIN_LIMIT"))
            .unwrap_or(u64::MAX);
        let timeout = self
            .timeout_ms
            .or_else(|| env_u64("AIOBENCH_TIMEOUT_MS"))
            .map(Duration::from_millis)
            .unwrap_or(PollBound::DEFAULT_TIMEOUT);
        opt.poll = PollBound::new(max_spins, timeout);
        opt
    }
}

fn usage() {
    let bin = std::env::args()
        .next()
        .unwrap_or_else(|| "aiobench".to_string());
    println!("usage:   {bin} <N> [OPTIONS]");
    println!("example: {bin} 4");
}

fn init_log(cli: &Cli) -> Result<(), String> {
    let level = LevelFilter::from_str(&cli.log_level)
        .map_err(|_| format!("unknown log level `{}`", cli.log_level))?;
    let l = Logger::init();
    l.add_console().level(level);
    if let Some(path) = &cli.log_file {
        l.add_file(path, false)
            .map_err(|e| format!("can't open log file {path:?}: {e}"))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            usage();
            return ExitCode::from(1);
        }
    };

    if let Err(e) = init_log(&cli) {
        eprintln!("{e}");
        return ExitCode::from(1);
    }

    let opt = match cli.options().validate() {
        Ok(opt) => opt,
        Err(Error::NotFound(path)) => {
            let p = path.display();
            println!("input file {p} not found, create one first, for example:");
            println!("dd if=/dev/urandom of={p} bs=1M count=500");
            return ExitCode::from(1);
        }
        Err(e) => {
            eprintln!("{e}");
            usage();
            return ExitCode::from(1);
        }
    };

    let bench = Bench::from_options(opt);
    let mut out = std::io::stdout().lock();
    let code = match bench.run(&mut out) {
        Ok(reports) if reports.iter().all(|r| r.is_ok()) => ExitCode::SUCCESS,
        Ok(_) => {
            log::error!("some outputs are truncated or differ from the input");
            ExitCode::from(2)
        }
        Err(e) => {
            log::error!("benchmark aborted: {e}");
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    };
    log::logger().flush();
    code
}
