use std::io;

/// positional-free byte stream over a raw descriptor, the shape every copy loop needs
pub trait StreamIO {
    /// a single read, may return fewer bytes than `data.len()`, `Ok(0)` means end of file
    fn read(&mut self, data: &mut [u8]) -> Result<usize, io::Error>;

    /// write the whole `data`, short writes are continued until done
    fn write_all(&mut self, data: &[u8]) -> Result<(), io::Error>;

    fn sync(&mut self) -> Result<(), io::Error>;

    fn size(&self) -> Result<u64, io::Error>;
}

pub struct OpenOptions {
    read: bool,
    write: bool,
    create: bool,
    trunc: bool,
    nonblock: bool,
}

impl OpenOptions {
    fn new() -> Self {
        Self {
            read: false,
            write: false,
            create: false,
            trunc: false,
            nonblock: false,
        }
    }

    pub fn read(&mut self, on: bool) -> &mut Self {
        self.read = on;
        self
    }

    pub fn write(&mut self, on: bool) -> &mut Self {
        self.write = on;
        self
    }

    pub fn create(&mut self, on: bool) -> &mut Self {
        self.create = on;
        self
    }

    pub fn trunc(&mut self, on: bool) -> &mut Self {
        self.trunc = on;
        self
    }

    /// open with `O_NONBLOCK`, reads may then fail with [`io::ErrorKind::WouldBlock`]
    pub fn nonblock(&mut self, on: bool) -> &mut Self {
        self.nonblock = on;
        self
    }
}

#[cfg(unix)]
pub mod unix;
#[cfg(unix)]
pub use unix::File;

#[cfg(target_os = "linux")]
pub mod aio;
#[cfg(target_os = "linux")]
pub use aio::{AioOp, Poll};
