// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! End to end passes against a fake kernel, with meminfo read from disk.

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Result};
use tempfile::TempDir;

use min_free_kbytes::platform::Platform;
use min_free_kbytes::policy::{PolicyConfig, Verdict};
use min_free_kbytes::tuner::{self, Options, Status, TunerError};

/// Keeps `vm.min_free_kbytes` in memory and records every write.
struct FakeKernel {
    root: bool,
    value: RefCell<u64>,
    writes: RefCell<Vec<u64>>,
    fail_writes: bool,
}

impl FakeKernel {
    fn new(value: u64) -> Self {
        Self {
            root: true,
            value: RefCell::new(value),
            writes: RefCell::new(Vec::new()),
            fail_writes: false,
        }
    }
}

impl Platform for FakeKernel {
    fn is_root(&self) -> bool {
        self.root
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn run_command_and_get_stdout(&self, cmd: Command) -> Result<String> {
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        match args.as_slice() {
            [flag, key] if flag == "-n" && key == "vm.min_free_kbytes" => {
                Ok(format!("{}\n", self.value.borrow()))
            }
            [flag, assignment] if flag == "-w" => {
                if self.fail_writes {
                    bail!("sysctl: permission denied on key 'vm.min_free_kbytes'");
                }
                let Some(value) = assignment.strip_prefix("vm.min_free_kbytes=") else {
                    bail!("unexpected key {}", assignment);
                };
                let value: u64 = value.parse()?;
                self.writes.borrow_mut().push(value);
                *self.value.borrow_mut() = value;
                Ok(format!("vm.min_free_kbytes = {}\n", value))
            }
            _ => bail!("unexpected sysctl invocation {:?}", args),
        }
    }
}

fn meminfo(total: u64, available: Option<u64>, swap_total: u64, swap_free: u64) -> String {
    let mut text = format!("MemTotal: {} kB\nMemFree: 3000000 kB\n", total);
    if let Some(available) = available {
        text += &format!("MemAvailable: {} kB\n", available);
    }
    text += "Buffers: 200000 kB\nCached: 800000 kB\nSwapCached: 0 kB\n";
    text += &format!("SwapTotal: {} kB\nSwapFree: {} kB\n", swap_total, swap_free);
    text
}

fn write_meminfo(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("meminfo");
    std::fs::write(&path, contents).unwrap();
    path
}

fn options(meminfo_path: PathBuf, desired_value_kb: u64) -> Options {
    Options {
        config: PolicyConfig {
            desired_value_kb,
            required_mem_factor: 7,
        },
        meminfo_path,
        dry_run: false,
    }
}

#[test]
fn approved_change_is_written() {
    let dir = TempDir::new().unwrap();
    let path = write_meminfo(&dir, &meminfo(16000000, Some(4000000), 0, 0));
    let kernel = FakeKernel::new(65536);

    let outcome = tuner::run(&kernel, &options(path, 262144)).unwrap();
    assert_eq!(outcome.status, Status::Applied(262144));
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(*kernel.writes.borrow(), [262144]);
}

#[test]
fn swap_pressure_blocks_change() {
    let dir = TempDir::new().unwrap();
    let path = write_meminfo(&dir, &meminfo(16000000, Some(4000000), 1000000, 400000));
    let kernel = FakeKernel::new(65536);

    let outcome = tuner::run(&kernel, &options(path, 262144)).unwrap();
    assert_eq!(outcome.status, Status::Rejected(Verdict::ConditionsNotMet));
    assert_eq!(outcome.exit_code(), 2);
    assert!(outcome.report.contains("SwapTotal:    1000000 kB"));
    assert!(kernel.writes.borrow().is_empty());
}

#[test]
fn request_below_kernel_default_is_refused() {
    let dir = TempDir::new().unwrap();
    // Swap is full too, but the floor check comes first.
    let path = write_meminfo(&dir, &meminfo(16000000, Some(4000000), 1000000, 0));
    let kernel = FakeKernel::new(65536);

    let outcome = tuner::run(&kernel, &options(path, 50000)).unwrap();
    assert_eq!(outcome.status, Status::Rejected(Verdict::TooLowRequest));
    assert_eq!(outcome.exit_code(), 2);
    assert!(kernel.writes.borrow().is_empty());
}

#[test]
fn matching_value_is_left_alone() {
    let dir = TempDir::new().unwrap();
    let path = write_meminfo(&dir, &meminfo(16000000, Some(4000000), 0, 0));
    let kernel = FakeKernel::new(262144);

    let outcome = tuner::run(&kernel, &options(path, 262144)).unwrap();
    assert_eq!(outcome.status, Status::Unchanged);
    assert_eq!(outcome.exit_code(), 0);
    assert!(kernel.writes.borrow().is_empty());
}

#[test]
fn request_above_ceiling_is_refused() {
    let dir = TempDir::new().unwrap();
    let path = write_meminfo(&dir, &meminfo(1000000, Some(900000), 0, 0));
    let kernel = FakeKernel::new(65536);

    let outcome = tuner::run(&kernel, &options(path, 262144)).unwrap();
    assert_eq!(outcome.status, Status::Rejected(Verdict::TooHighRequest));
    assert_eq!(outcome.exit_code(), 2);
    assert!(kernel.writes.borrow().is_empty());
}

#[test]
fn available_memory_is_derived_without_mem_available() {
    let dir = TempDir::new().unwrap();
    // free + buffers + cached = 4000000, enough for 262144 * 7.
    let path = write_meminfo(&dir, &meminfo(16000000, None, 0, 0));
    let kernel = FakeKernel::new(65536);

    let outcome = tuner::run(&kernel, &options(path.clone(), 262144)).unwrap();
    assert_eq!(outcome.status, Status::Applied(262144));

    // 600000 * 7 is more than the derived 4000000.
    let kernel = FakeKernel::new(65536);
    let outcome = tuner::run(&kernel, &options(path, 600000)).unwrap();
    assert_eq!(outcome.status, Status::Rejected(Verdict::ConditionsNotMet));
    assert!(outcome.report.contains("free + buffers + cached"));
}

#[test]
fn failed_write_is_an_execution_failure() {
    let dir = TempDir::new().unwrap();
    let path = write_meminfo(&dir, &meminfo(16000000, Some(4000000), 0, 0));
    let kernel = FakeKernel {
        fail_writes: true,
        ..FakeKernel::new(65536)
    };

    let err = tuner::run(&kernel, &options(path, 262144)).unwrap_err();
    assert!(matches!(err, TunerError::Write(_)));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn unprivileged_run_stops_early() {
    let kernel = FakeKernel {
        root: false,
        ..FakeKernel::new(65536)
    };

    // The meminfo path doesn't exist; it must not be read.
    let err = tuner::run(&kernel, &options(PathBuf::from("/nonexistent"), 262144)).unwrap_err();
    assert!(matches!(err, TunerError::NotRoot));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn dry_run_reports_without_writing() {
    let dir = TempDir::new().unwrap();
    let path = write_meminfo(&dir, &meminfo(16000000, Some(4000000), 0, 0));
    let kernel = FakeKernel::new(65536);

    let options = Options {
        dry_run: true,
        ..options(path, 262144)
    };
    let outcome = tuner::run(&kernel, &options).unwrap();
    assert_eq!(outcome.status, Status::WouldApply(262144));
    assert_eq!(outcome.exit_code(), 0);
    assert!(kernel.writes.borrow().is_empty());
}
