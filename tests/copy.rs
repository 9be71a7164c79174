mod common;

use aiobench::{
    blocking_copy, chunked_copy, nonblocking_copy, Error, Idle, MatrixMul, Options, PollBound,
};
use common::{read, TestEnv};
use std::time::Duration;

const SIZES: [usize; 7] = [1, 100, 4095, 4096, 4097, 65536 + 13, (1 << 20) + 7];

#[test]
fn blocking_round_trip() {
    for size in SIZES {
        let env = TestEnv::new();
        let (src, data) = env.input(size);
        let dst = env.file("out");

        let stats = blocking_copy(&src, &dst, Options::BLOCK_SIZE, &mut Idle::default()).unwrap();
        assert!(stats.complete);
        assert_eq!(stats.bytes, size as u64);
        assert_eq!(read(&dst), data, "size {size}");
    }
}

#[test]
fn blocking_with_matrix() {
    let env = TestEnv::new();
    let (src, data) = env.input(10 * 4096 + 1);
    let dst = env.file("out");
    let mut w = MatrixMul::new(Options::MATRIX_SIZE);

    blocking_copy(&src, &dst, 4096, &mut w).unwrap();
    assert_eq!(read(&dst), data);
    // one step per block read
    assert_eq!(aiobench::Compute::steps(&w), 11);
}

#[test]
fn nonblocking_round_trip() {
    for size in SIZES {
        let env = TestEnv::new();
        let (src, data) = env.input(size);
        let dst = env.file("out");

        let stats =
            nonblocking_copy(&src, &dst, Options::BLOCK_SIZE, PollBound::default()).unwrap();
        assert!(stats.complete);
        assert_eq!(stats.bytes, size as u64);
        assert_eq!(read(&dst), data, "size {size}");
    }
}

#[test]
fn chunked_round_trip() {
    for size in SIZES {
        for parts in [1usize, 2, 3, 4, 7, 16] {
            if parts > size {
                continue;
            }
            let env = TestEnv::new();
            let (src, data) = env.input(size);
            let dst = env.file("out");

            let stats =
                chunked_copy(&src, &dst, parts, PollBound::default(), &mut Idle::default())
                    .unwrap();
            assert!(stats.complete);
            assert_eq!(stats.bytes, size as u64);
            assert_eq!(stats.ops, 2 * parts as u64);
            assert_eq!(read(&dst), data, "size {size} parts {parts}");
        }
    }
}

#[test]
fn chunked_four_regions() {
    let env = TestEnv::new();
    let (src, data) = env.input(4096);
    let dst = env.file("out");
    let mut w = MatrixMul::new(Options::MATRIX_SIZE);

    let regions = aiobench::split(4096, 4).unwrap();
    let offsets: Vec<u64> = regions.iter().map(|r| r.offset).collect();
    assert_eq!(offsets, vec![0, 1024, 2048, 3072]);
    assert!(regions.iter().all(|r| r.len == 1024));

    chunked_copy(&src, &dst, 4, PollBound::default(), &mut w).unwrap();
    assert_eq!(read(&dst), data);
    // one step per region
    assert_eq!(aiobench::Compute::steps(&w), 4);
}

#[test]
fn chunked_single_region_matches_blocking() {
    let env = TestEnv::new();
    let (src, data) = env.input(300_001);
    let a = env.file("aio");
    let b = env.file("block");

    let stats = chunked_copy(&src, &a, 1, PollBound::default(), &mut Idle::default()).unwrap();
    assert_eq!(stats.ops, 2);
    blocking_copy(&src, &b, 4096, &mut Idle::default()).unwrap();
    assert_eq!(read(&a), read(&b));
    assert_eq!(read(&a), data);
}

#[test]
fn every_strategy_handles_empty_input() {
    let env = TestEnv::new();
    let (src, _) = env.input(0);

    let dst = env.file("block");
    let stats = blocking_copy(&src, &dst, 4096, &mut Idle::default()).unwrap();
    assert_eq!(stats.bytes, 0);
    assert!(read(&dst).is_empty());

    let dst = env.file("nonblock");
    let stats = nonblocking_copy(&src, &dst, 4096, PollBound::default()).unwrap();
    assert_eq!(stats.bytes, 0);
    assert!(read(&dst).is_empty());

    let dst = env.file("aio");
    std::fs::write(&dst, b"stale").unwrap();
    for parts in [1, 8] {
        let stats =
            chunked_copy(&src, &dst, parts, PollBound::default(), &mut Idle::default()).unwrap();
        assert_eq!(stats.ops, 0);
        assert_eq!(stats.bytes, 0);
        assert!(read(&dst).is_empty());
    }
}

#[test]
fn chunked_rejects_bad_part_count() {
    let env = TestEnv::new();
    let (src, _) = env.input(16);
    let dst = env.file("out");

    let r = chunked_copy(&src, &dst, 0, PollBound::default(), &mut Idle::default());
    assert!(matches!(r, Err(Error::Invalid(_))));
    let r = chunked_copy(&src, &dst, 17, PollBound::default(), &mut Idle::default());
    assert!(matches!(r, Err(Error::Invalid(_))));
    // rejected before the output is created
    assert!(!dst.exists());
}

#[test]
fn open_failures_are_reported() {
    let env = TestEnv::new();
    let missing = env.file("missing");
    let dst = env.file("out");

    let r = blocking_copy(&missing, &dst, 4096, &mut Idle::default());
    assert!(matches!(r, Err(Error::Io { op: "open", .. })));
    let r = nonblocking_copy(&missing, &dst, 4096, PollBound::default());
    assert!(matches!(r, Err(Error::Io { op: "open", .. })));
    let r = chunked_copy(&missing, &dst, 1, PollBound::default(), &mut Idle::default());
    assert!(matches!(r, Err(Error::Io { op: "open", .. })));

    let (src, _) = env.input(10);
    let bad = env.file("no_such_dir").join("out");
    let r = blocking_copy(&src, &bad, 4096, &mut Idle::default());
    assert!(matches!(r, Err(Error::Io { op: "create", .. })));
}

#[test]
fn zero_block_size_is_invalid() {
    let env = TestEnv::new();
    let (src, _) = env.input(10);
    let dst = env.file("out");
    assert!(matches!(
        blocking_copy(&src, &dst, 0, &mut Idle::default()),
        Err(Error::Invalid(_))
    ));
    assert!(matches!(
        nonblocking_copy(&src, &dst, 0, PollBound::default()),
        Err(Error::Invalid(_))
    ));
}

#[test]
fn nonblocking_stops_on_read_error() {
    let env = TestEnv::new();
    let src = env.file("dir_input");
    std::fs::create_dir(&src).unwrap();
    let dst = env.file("out");

    // reading a directory fails with EISDIR
    let stats = nonblocking_copy(&src, &dst, 4096, PollBound::default()).unwrap();
    assert!(!stats.complete);
    assert_eq!(stats.bytes, 0);
    assert!(read(&dst).is_empty());
}

#[test]
fn chunked_zero_spin_bound_times_out() {
    let env = TestEnv::new();
    let (src, _) = env.input(64 << 20);
    let dst = env.file("out");

    let bound = PollBound::new(0, Duration::from_secs(60));
    let r = chunked_copy(&src, &dst, 64, bound, &mut Idle::default());
    match r {
        Err(Error::Timeout { what, spins, .. }) => {
            assert_eq!(what, "aio read");
            assert_eq!(spins, 0);
        }
        other => panic!("unexpected {other:?}"),
    }
}
