use crate::{Error, Result};

/// one contiguous byte range of the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub offset: u64,
    pub len: u64,
}

impl Region {
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

/// partition `[0, size)` into `parts` regions, every region is `size / parts` long except the
/// last one which also takes `size % parts`
///
/// an empty file yields no region, otherwise `parts` must be in `[1, size]`
pub fn split(size: u64, parts: usize) -> Result<Vec<Region>> {
    if parts == 0 {
        return Err(Error::Invalid("chunk count must be > 0".into()));
    }
    if size == 0 {
        return Ok(Vec::new());
    }
    let n = parts as u64;
    if n > size {
        return Err(Error::Invalid(format!(
            "chunk count {parts} exceeds file size {size}"
        )));
    }

    let chunk = size / n;
    let remainder = size % n;
    let v = (0..n)
        .map(|i| Region {
            offset: i * chunk,
            len: if i == n - 1 { chunk + remainder } else { chunk },
        })
        .collect();
    Ok(v)
}
