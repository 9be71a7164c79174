use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use super::{spin::PollBound, Error, Result};

/// which group of phases one invocation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    /// blocking, non-blocking and chunked asynchronous copy
    Plain,
    /// blocking and chunked asynchronous copy, each with a matrix workload in the loop
    Overlap,
    All,
}

/// how the page cache is cleared before each timed phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// `sync; echo 3 > /proc/sys/vm/drop_caches` through sudo, needs privileges
    Shell,
    /// evict the input file only, unprivileged
    Fadvise,
    None,
}

impl FromStr for CacheMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shell" => Ok(Self::Shell),
            "fadvise" => Ok(Self::Fadvise),
            "none" | "off" => Ok(Self::None),
            other => Err(format!(
                "unknown cache mode `{other}`, expect one of shell, fadvise, none"
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Options {
    /// number of regions the asynchronous copy splits the input into, must be in [1, file size]
    pub parts: usize,
    /// the file every phase copies, must exist before the run
    pub input: PathBuf,
    /// where `output_*.txt` land
    pub output_dir: PathBuf,
    pub suite: Suite,
    pub cache: CacheMode,
    /// read size of the blocking and non-blocking loops
    pub block_size: usize,
    /// side length of the square matrices of the overlap workload
    pub matrix_size: usize,
    /// bound of every busy-poll loop
    pub poll: PollBound,
    /// compare each output against the input with crc32c after the phase
    pub verify: bool,
}

impl Options {
    pub const BLOCK_SIZE: usize = 4096;
    pub const MATRIX_SIZE: usize = 10;
    pub const INPUT: &'static str = "input.txt";

    pub fn new<P: AsRef<Path>>(input: P, parts: usize) -> Self {
        Self {
            parts,
            input: input.as_ref().to_path_buf(),
            output_dir: PathBuf::from("."),
            suite: Suite::Plain,
            cache: CacheMode::Shell,
            block_size: Self::BLOCK_SIZE,
            matrix_size: Self::MATRIX_SIZE,
            poll: PollBound::default(),
            verify: true,
        }
    }

    pub fn validate(self) -> Result<Self> {
        if self.parts == 0 {
            return Err(Error::Invalid("chunk count must be > 0".into()));
        }
        if self.block_size == 0 {
            return Err(Error::Invalid("block size must be > 0".into()));
        }
        if self.matrix_size == 0 {
            return Err(Error::Invalid("matrix size must be > 0".into()));
        }
        if !self.input.is_file() {
            return Err(Error::NotFound(self.input.clone()));
        }
        let size = std::fs::metadata(&self.input)
            .map_err(|e| Error::io("stat", &self.input, e))?
            .len();
        // an empty input copies as a no-op for any chunk count
        if size > 0 && self.parts as u64 > size {
            return Err(Error::Invalid(format!(
                "chunk count {} exceeds file size {size}",
                self.parts
            )));
        }
        if !self.output_dir.is_dir() {
            return Err(Error::Invalid(format!(
                "output dir {:?} is not a directory",
                self.output_dir
            )));
        }
        Ok(self)
    }

    pub fn output(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}

#[cfg(test)]
mod test {
    use super::{CacheMode, Options};
    use crate::{Error, RandomPath};

    #[test]
    fn test_cache_mode() {
        assert_eq!("shell".parse::<CacheMode>(), Ok(CacheMode::Shell));
        assert_eq!(" Fadvise".parse::<CacheMode>(), Ok(CacheMode::Fadvise));
        assert_eq!("off".parse::<CacheMode>(), Ok(CacheMode::None));
        assert!("drop".parse::<CacheMode>().is_err());
    }

    #[test]
    fn test_validate() {
        let root = RandomPath::tmp();
        std::fs::create_dir_all(&*root).unwrap();
        let input = root.join("input.txt");

        let opt = Options::new(&input, 4);
        assert!(matches!(opt.validate(), Err(Error::NotFound(_))));

        std::fs::write(&input, b"abcd").unwrap();
        let mut opt = Options::new(&input, 0);
        opt.output_dir = root.to_path_buf();
        assert!(matches!(opt.validate(), Err(Error::Invalid(_))));

        let mut opt = Options::new(&input, 4);
        opt.output_dir = root.to_path_buf();
        let opt = opt.validate().unwrap();
        assert_eq!(opt.output("x"), root.join("x"));
        assert_eq!(opt.block_size, Options::BLOCK_SIZE);

        let mut opt = Options::new(&input, 5);
        opt.output_dir = root.to_path_buf();
        assert!(matches!(opt.validate(), Err(Error::Invalid(_))));

        std::fs::write(&input, b"").unwrap();
        let mut opt = Options::new(&input, 5);
        opt.output_dir = root.to_path_buf();
        assert!(opt.validate().is_ok());
    }
}
