use std::time::{Duration, Instant};

use super::{Error, Result};

/// upper bound of a single busy-poll loop, whichever limit is hit first ends the wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBound {
    /// failed checks tolerated before giving up
    pub max_spins: u64,
    /// wall-clock limit of one wait
    pub timeout: Duration,
}

impl PollBound {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(max_spins: u64, timeout: Duration) -> Self {
        Self { max_spins, timeout }
    }

    pub(crate) fn spinner(&self, what: &'static str) -> Spinner {
        Spinner {
            bound: *self,
            what,
            spins: 0,
            start: Instant::now(),
        }
    }
}

impl Default for PollBound {
    fn default() -> Self {
        Self {
            max_spins: u64::MAX,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// bookkeeping for one busy-poll loop, call [`Spinner::spin`] after every negative check
pub(crate) struct Spinner {
    bound: PollBound,
    what: &'static str,
    spins: u64,
    start: Instant,
}

impl Spinner {
    pub(crate) fn spin(&mut self) -> Result<()> {
        let elapsed = self.start.elapsed();
        if self.spins >= self.bound.max_spins || elapsed >= self.bound.timeout {
            return Err(Error::Timeout {
                what: self.what,
                spins: self.spins,
                elapsed,
            });
        }
        self.spins += 1;
        std::hint::spin_loop();
        Ok(())
    }

    pub(crate) fn spins(&self) -> u64 {
        self.spins
    }
}
