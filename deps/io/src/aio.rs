//! POSIX asynchronous I/O on a single request basis
//!
//! An [`AioOp`] owns its control block and its buffer for as long as the kernel may touch them.
//! Completion is observed by calling [`AioOp::poll`], which never blocks. Short transfers are
//! resubmitted internally at the advanced offset, so a `Ready` always carries the full count,
//! except for a read hitting end of file.

use std::{io, os::raw::c_void, ptr};

use libc::{
    aio_cancel, aio_error, aio_read, aio_return, aio_suspend, aio_write, aiocb, c_int, EINPROGRESS,
    SIGEV_NONE,
};

use crate::unix::errno;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    Pending,
    /// transferred bytes, equal to the request length unless a read reached end of file
    Ready(usize),
}

pub struct AioOp {
    // boxed, the kernel keeps the address until the request completes
    cb: Box<aiocb>,
    buf: Vec<u8>,
    kind: Kind,
    offset: u64,
    len: usize,
    done: usize,
    inflight: bool,
}

impl AioOp {
    /// submit a read filling the whole `buf` from `offset` of `fd`
    pub fn read_at(fd: c_int, buf: Vec<u8>, offset: u64) -> Result<Self, io::Error> {
        let len = buf.len();
        Self::submit(fd, buf, len, offset, Kind::Read)
    }

    /// submit a write of the first `len` bytes of `buf` to `offset` of `fd`
    pub fn write_at(fd: c_int, buf: Vec<u8>, len: usize, offset: u64) -> Result<Self, io::Error> {
        if len > buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "write length exceeds buffer",
            ));
        }
        Self::submit(fd, buf, len, offset, Kind::Write)
    }

    fn submit(
        fd: c_int,
        buf: Vec<u8>,
        len: usize,
        offset: u64,
        kind: Kind,
    ) -> Result<Self, io::Error> {
        let mut cb: Box<aiocb> = Box::new(unsafe { std::mem::zeroed() });
        cb.aio_fildes = fd;
        cb.aio_sigevent.sigev_notify = SIGEV_NONE;

        let mut op = Self {
            cb,
            buf,
            kind,
            offset,
            len,
            done: 0,
            inflight: false,
        };
        if len > 0 {
            op.issue()?;
        }
        Ok(op)
    }

    fn issue(&mut self) -> Result<(), io::Error> {
        let rest = &mut self.buf[self.done..self.len];
        self.cb.aio_buf = rest.as_mut_ptr().cast::<c_void>();
        self.cb.aio_nbytes = rest.len();
        self.cb.aio_offset = (self.offset + self.done as u64) as libc::off_t;

        let cb: *mut aiocb = &mut *self.cb;
        let rc = unsafe {
            match self.kind {
                Kind::Read => aio_read(cb),
                Kind::Write => aio_write(cb),
            }
        };
        if rc < 0 {
            return Err(io::Error::from_raw_os_error(errno()));
        }
        self.inflight = true;
        Ok(())
    }

    /// non-blocking completion check
    pub fn poll(&mut self) -> Result<Poll, io::Error> {
        if !self.inflight {
            return Ok(Poll::Ready(self.done));
        }

        let cb: *mut aiocb = &mut *self.cb;
        let rc = unsafe { aio_error(cb) };
        if rc == EINPROGRESS {
            return Ok(Poll::Pending);
        }
        if rc < 0 {
            return Err(io::Error::from_raw_os_error(errno()));
        }

        // reap the request, required once aio_error stops reporting EINPROGRESS
        let n = unsafe { aio_return(cb) };
        self.inflight = false;
        if rc != 0 {
            return Err(io::Error::from_raw_os_error(rc));
        }
        if n < 0 {
            return Err(io::Error::from_raw_os_error(errno()));
        }

        let n = n as usize;
        self.done += n;
        if self.done == self.len {
            return Ok(Poll::Ready(self.done));
        }
        if n == 0 {
            return match self.kind {
                Kind::Read => Ok(Poll::Ready(self.done)),
                Kind::Write => Err(io::Error::from(io::ErrorKind::WriteZero)),
            };
        }
        // short transfer, continue with the remainder
        self.issue()?;
        Ok(Poll::Pending)
    }

    pub fn is_inflight(&self) -> bool {
        self.inflight
    }

    /// give the buffer back, fails with the op itself while the kernel still owns it
    pub fn into_buffer(mut self) -> Result<Vec<u8>, Self> {
        if self.inflight {
            return Err(self);
        }
        Ok(std::mem::take(&mut self.buf))
    }
}

impl Drop for AioOp {
    fn drop(&mut self) {
        if !self.inflight {
            return;
        }
        let cb: *mut aiocb = &mut *self.cb;
        unsafe {
            aio_cancel(self.cb.aio_fildes, cb);
            let list = [cb as *const aiocb];
            while aio_error(cb) == EINPROGRESS {
                aio_suspend(list.as_ptr(), 1, ptr::null());
            }
            aio_return(cb);
        }
    }
}

#[cfg(test)]
mod test {
    use super::{AioOp, Poll};
    use crate::{File, StreamIO};

    fn wait(op: &mut AioOp) -> usize {
        loop {
            if let Poll::Ready(n) = op.poll().unwrap() {
                return n;
            }
            std::hint::spin_loop();
        }
    }

    #[test]
    fn read_then_write() {
        let path = std::env::temp_dir().join(format!("aio_rw_{}", std::process::id()));
        let data: Vec<u8> = (0..8192u32).map(|x| (x % 251) as u8).collect();
        {
            let mut f = File::options()
                .write(true)
                .create(true)
                .trunc(true)
                .open(&path)
                .unwrap();
            f.write_all(&data).unwrap();
        }

        let f = File::options().read(true).open(&path).unwrap();
        let mut op = AioOp::read_at(f.fd(), vec![0u8; 4096], 4096).unwrap();
        assert_eq!(wait(&mut op), 4096);
        let buf = op.into_buffer().ok().unwrap();
        assert_eq!(&buf[..], &data[4096..]);

        // reading past the end stops at end of file
        let mut op = AioOp::read_at(f.fd(), vec![0u8; 100], 8150).unwrap();
        assert_eq!(wait(&mut op), 42);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn empty_request_is_ready() {
        let mut op = AioOp::read_at(-1, Vec::new(), 0).unwrap();
        assert!(!op.is_inflight());
        assert_eq!(op.poll().unwrap(), Poll::Ready(0));
    }
}
