use std::{
    ffi::CString,
    io,
    os::{raw::c_void, unix::ffi::OsStrExt},
    path::Path,
};

use libc::{
    c_int, close, fstat, fsync, open, read, stat, write, EINTR, O_CREAT, O_NONBLOCK, O_RDONLY,
    O_RDWR, O_TRUNC, O_WRONLY,
};

#[cfg(any(target_os = "freebsd", target_os = "macos"))]
use libc::__error;

#[cfg(target_os = "linux")]
use libc::__errno_location;

use crate::{OpenOptions, StreamIO};

pub struct File {
    file: i32,
}

impl OpenOptions {
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<File, io::Error> {
        let mut flag = O_RDONLY; // file is implicitly readable

        if self.write {
            flag |= O_WRONLY;
        }
        if self.read && self.write {
            flag = O_RDWR;
        }
        if self.trunc {
            flag |= O_TRUNC;
        }
        if self.create {
            flag |= O_CREAT;
        }
        if self.nonblock {
            flag |= O_NONBLOCK;
        }

        File::open(path.as_ref(), flag)
    }
}

#[cfg(any(target_os = "freebsd", target_os = "macos"))]
#[inline]
pub(crate) fn errno() -> i32 {
    unsafe { *__error() }
}

#[cfg(target_os = "linux")]
#[inline]
pub(crate) fn errno() -> i32 {
    unsafe { *__errno_location() }
}

impl File {
    pub fn options() -> OpenOptions {
        OpenOptions::new()
    }

    pub fn open(path: &Path, flag: c_int) -> Result<Self, io::Error> {
        let c_string = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let file = unsafe { open(c_string.as_ptr(), flag, 0o644) };
        if file < 0 {
            return Err(io::Error::from_raw_os_error(errno()));
        }
        Ok(Self { file })
    }

    pub fn fd(&self) -> c_int {
        self.file
    }

    /// ask the kernel to evict cached pages of the whole file, dirty pages are not dropped, so
    /// call [`StreamIO::sync`] first
    #[cfg(target_os = "linux")]
    pub fn fadvise_dontneed(&self) -> Result<(), io::Error> {
        let rc = unsafe { libc::posix_fadvise(self.file, 0, 0, libc::POSIX_FADV_DONTNEED) };
        if rc != 0 {
            // posix_fadvise reports through its return value, errno is untouched
            return Err(io::Error::from_raw_os_error(rc));
        }
        Ok(())
    }
}

impl Drop for File {
    fn drop(&mut self) {
        unsafe {
            close(self.file);
        }
    }
}

impl StreamIO for File {
    fn read(&mut self, data: &mut [u8]) -> Result<usize, io::Error> {
        loop {
            let n = unsafe { read(self.file, data.as_mut_ptr().cast::<c_void>(), data.len()) };
            if n < 0 {
                if errno() == EINTR {
                    continue;
                }
                // EAGAIN maps to ErrorKind::WouldBlock
                return Err(io::Error::from_raw_os_error(errno()));
            }
            return Ok(n as usize);
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), io::Error> {
        let mut pos = 0;
        while pos < data.len() {
            let buf = &data[pos..];
            let rc = unsafe { write(self.file, buf.as_ptr().cast::<c_void>(), buf.len()) };
            if rc < 0 {
                if errno() == EINTR {
                    continue;
                }
                return Err(io::Error::from_raw_os_error(errno()));
            }
            if rc == 0 {
                return Err(io::Error::from(io::ErrorKind::WriteZero));
            }
            pos += rc as usize;
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<(), io::Error> {
        let rc = unsafe { fsync(self.file) };
        if rc < 0 {
            return Err(io::Error::from_raw_os_error(errno()));
        }
        Ok(())
    }

    fn size(&self) -> Result<u64, io::Error> {
        unsafe {
            let mut stat: stat = std::mem::zeroed();
            let rc = fstat(self.file, &mut stat);
            if rc < 0 {
                return Err(io::Error::from_raw_os_error(errno()));
            }
            Ok(stat.st_size as u64)
        }
    }
}
