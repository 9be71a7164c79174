#![allow(dead_code)]

use aiobench::{CacheMode, Options, RandomPath};
use rand::RngCore;
use std::path::{Path, PathBuf};

pub struct TestEnv {
    root: RandomPath,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    pub fn new() -> Self {
        let root = RandomPath::tmp();
        std::fs::create_dir_all(&*root).expect("can't create test dir");
        Self { root }
    }

    pub fn path(&self) -> &Path {
        self.root.as_path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// write `len` random bytes to `input.txt`
    pub fn input(&self, len: usize) -> (PathBuf, Vec<u8>) {
        let mut data = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut data);
        let path = self.file(Options::INPUT);
        std::fs::write(&path, &data).expect("can't write input");
        (path, data)
    }

    /// options copying `input.txt` into this env without touching the page cache
    pub fn options(&self, parts: usize) -> Options {
        let mut opt = Options::new(self.file(Options::INPUT), parts);
        opt.output_dir = self.path().to_path_buf();
        opt.cache = CacheMode::None;
        opt
    }
}

pub fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).expect("can't read output")
}
