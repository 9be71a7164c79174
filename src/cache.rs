//! Page cache clearing, run before every timed phase so the copy hits the device

use std::{path::Path, process::Command};

use io::StreamIO;

use crate::{utils::options::CacheMode, Error, Result};

/// clears cached pages before a phase, implementations may need privileges and may fail, the
/// caller decides whether a failure matters
pub trait CacheDropper {
    fn name(&self) -> &'static str;

    fn drop_caches(&self, input: &Path) -> Result<()>;
}

/// flush dirty pages and drop the whole page cache through a shell, global and privileged
pub struct ShellDrop {
    command: String,
}

impl ShellDrop {
    pub const DROP_CACHES: &'static str =
        "sync; echo 3 | sudo tee /proc/sys/vm/drop_caches > /dev/null";

    pub fn new() -> Self {
        Self::with_command(Self::DROP_CACHES)
    }

    pub fn with_command<S: Into<String>>(command: S) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for ShellDrop {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheDropper for ShellDrop {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn drop_caches(&self, _input: &Path) -> Result<()> {
        let status = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .status()
            .map_err(|e| Error::io("spawn", Path::new("sh"), e))?;
        if !status.success() {
            return Err(Error::Failed(format!("`{}` exited with {status}", self.command)));
        }
        Ok(())
    }
}

/// evict only the input file's pages, no privilege needed
#[cfg(target_os = "linux")]
pub struct FadviseDrop;

#[cfg(target_os = "linux")]
impl CacheDropper for FadviseDrop {
    fn name(&self) -> &'static str {
        "fadvise"
    }

    fn drop_caches(&self, input: &Path) -> Result<()> {
        // dirty pages survive DONTNEED, flush them first
        let mut f = io::File::options()
            .read(true)
            .open(input)
            .map_err(|e| Error::io("open", input, e))?;
        f.sync().map_err(|e| Error::io("sync", input, e))?;
        f.fadvise_dontneed()
            .map_err(|e| Error::io("fadvise", input, e))
    }
}

pub struct NoDrop;

impl CacheDropper for NoDrop {
    fn name(&self) -> &'static str {
        "none"
    }

    fn drop_caches(&self, _input: &Path) -> Result<()> {
        Ok(())
    }
}

pub fn dropper(mode: CacheMode) -> Box<dyn CacheDropper> {
    match mode {
        CacheMode::Shell => Box::new(ShellDrop::new()),
        #[cfg(target_os = "linux")]
        CacheMode::Fadvise => Box::new(FadviseDrop),
        #[cfg(not(target_os = "linux"))]
        CacheMode::Fadvise => {
            log::warn!("fadvise cache drop is linux only, skip");
            Box::new(NoDrop)
        }
        CacheMode::None => Box::new(NoDrop),
    }
}
