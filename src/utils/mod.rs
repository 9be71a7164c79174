use std::{
    cell::RefCell,
    ops::{Deref, Range},
    path::{Path, PathBuf},
    sync::atomic::{AtomicI64, Ordering::Relaxed},
    time::Duration,
};

use rand::{rngs::ThreadRng, Rng};

pub(crate) mod options;
pub(crate) mod spin;

#[derive(Debug)]
pub enum Error {
    /// rejected argument or option, e.g. zero chunks
    Invalid(String),
    /// the benchmark input is missing
    NotFound(PathBuf),
    Io {
        op: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    /// a busy-poll loop ran past its [`spin::PollBound`]
    Timeout {
        what: &'static str,
        spins: u64,
        elapsed: Duration,
    },
    /// an external step finished unsuccessfully
    Failed(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(msg) => write!(f, "invalid argument: {msg}"),
            Self::NotFound(path) => write!(f, "{path:?} not found"),
            Self::Io { op, path, source } => write!(f, "{op} {path:?}: {source}"),
            Self::Timeout {
                what,
                spins,
                elapsed,
            } => write!(
                f,
                "{what} still pending after {spins} spins ({:.3} ms)",
                elapsed.as_secs_f64() * 1000.0
            ),
            Self::Failed(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

thread_local! {
    static G_RAND: RefCell<ThreadRng> = RefCell::new(rand::thread_rng());
}

fn rand_range(range: Range<usize>) -> usize {
    G_RAND.with_borrow_mut(|x| x.gen_range(range))
}

/// read an unsigned tunable from the environment, unset or malformed values yield `None`
pub fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
}

pub struct RandomPath {
    path: PathBuf,
    del: bool,
}

impl RandomPath {
    const PREFIX: &'static str = "aiobench_tmp_";

    fn gen_path(root: &Path) -> PathBuf {
        static TID: AtomicI64 = AtomicI64::new(0);
        loop {
            let r = rand_range(1000..1000000);
            let p = root.join(format!(
                "{}{}{}{}",
                Self::PREFIX,
                std::process::id(),
                TID.fetch_add(1, Relaxed),
                r
            ));
            if !p.exists() {
                return p;
            }
        }
    }

    /// a path under the system temp dir, removed on drop
    pub fn tmp() -> Self {
        Self {
            path: Self::gen_path(&std::env::temp_dir()),
            del: true,
        }
    }

    pub fn as_path(&self) -> &Path {
        &self.path
    }

    pub fn unlink(&self) {
        if self.path.exists() {
            let _ = if self.path.is_file() {
                std::fs::remove_file(&self.path)
            } else {
                std::fs::remove_dir_all(&self.path)
            };
        }
    }
}

impl Deref for RandomPath {
    type Target = PathBuf;

    fn deref(&self) -> &Self::Target {
        &self.path
    }
}

impl Drop for RandomPath {
    fn drop(&mut self) {
        if self.del {
            self.unlink();
        }
    }
}

#[cfg(test)]
mod test {
    use super::{env_u64, Error, RandomPath};
    use std::time::Duration;

    #[test]
    fn test_random_path() {
        let p = RandomPath::tmp();
        let q = RandomPath::tmp();
        assert_ne!(p.as_path(), q.as_path());

        std::fs::create_dir_all(&*p).unwrap();
        std::fs::write(p.join("x"), b"x").unwrap();
        let saved = p.to_path_buf();
        drop(p);
        assert!(!saved.exists());
    }

    #[test]
    fn test_env_u64() {
        std::env::set_var("AIOBENCH_TEST_ENV_U64", " 42 ");
        assert_eq!(env_u64("AIOBENCH_TEST_ENV_U64"), Some(42));
        std::env::set_var("AIOBENCH_TEST_ENV_U64", "many");
        assert_eq!(env_u64("AIOBENCH_TEST_ENV_U64"), None);
        assert_eq!(env_u64("AIOBENCH_TEST_ENV_UNSET"), None);
    }

    #[test]
    fn test_display() {
        let e = Error::Timeout {
            what: "aio read",
            spins: 7,
            elapsed: Duration::from_millis(2),
        };
        assert_eq!(e.to_string(), "aio read still pending after 7 spins (2.000 ms)");
        assert_eq!(
            Error::Invalid("chunk count must be > 0".into()).to_string(),
            "invalid argument: chunk count must be > 0"
        );
    }
}
