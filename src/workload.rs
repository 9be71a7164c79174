//! Synthetic CPU load interleaved with the copy loops

use std::hint::black_box;

use rand::{rngs::ThreadRng, Rng};

/// a unit of CPU work run once per iteration of a copy loop
pub trait Compute {
    fn step(&mut self);

    /// steps executed so far
    fn steps(&self) -> u64;
}

/// no work, the plain phases use it
#[derive(Default)]
pub struct Idle {
    steps: u64,
}

impl Compute for Idle {
    fn step(&mut self) {
        self.steps += 1;
    }

    fn steps(&self) -> u64 {
        self.steps
    }
}

/// dense square integer matrix multiplication, operands are refilled with random digits on
/// every step and the product is discarded
pub struct MatrixMul {
    size: usize,
    a: Vec<i32>,
    b: Vec<i32>,
    c: Vec<i32>,
    rng: ThreadRng,
    steps: u64,
}

impl MatrixMul {
    pub fn new(size: usize) -> Self {
        let n = size * size;
        Self {
            size,
            a: vec![0; n],
            b: vec![0; n],
            c: vec![0; n],
            rng: rand::thread_rng(),
            steps: 0,
        }
    }

    fn fill(&mut self) {
        for (x, y) in self.a.iter_mut().zip(self.b.iter_mut()) {
            *x = self.rng.gen_range(0..10);
            *y = self.rng.gen_range(0..10);
        }
        self.c.fill(0);
    }

    fn multiply(&mut self) {
        let n = self.size;
        for i in 0..n {
            for j in 0..n {
                let mut sum = 0;
                for k in 0..n {
                    sum += self.a[i * n + k] * self.b[k * n + j];
                }
                self.c[i * n + j] = sum;
            }
        }
    }
}

impl Compute for MatrixMul {
    fn step(&mut self) {
        self.fill();
        self.multiply();
        // keep the product alive so the work is not optimized out
        black_box(&self.c);
        self.steps += 1;
    }

    fn steps(&self) -> u64 {
        self.steps
    }
}
