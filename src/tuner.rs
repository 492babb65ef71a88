// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! One check-and-apply pass: gather statistics, evaluate the policy and
//! write the tunable if it was approved.

use crate::meminfo::{MemInfoError, MemorySnapshot};
use crate::platform::Platform;
use crate::policy::{evaluate, PolicyConfig, Verdict};
use crate::sysctl::Sysctl;
use log::{debug, info};
use std::path::PathBuf;
use thiserror::Error;

pub const EXIT_SUCCESS: u8 = 0;
/// Not privileged, or reading/writing kernel state failed.
pub const EXIT_FAILURE: u8 = 1;
/// The policy rejected the request.
pub const EXIT_CONDITIONS_NOT_MET: u8 = 2;

#[derive(Error, Debug)]
pub enum TunerError {
    #[error("must be run as root")]
    NotRoot,
    #[error("failed to get memory statistics from {path:?}: {source}")]
    MemInfo {
        path: PathBuf,
        #[source]
        source: MemInfoError,
    },
    #[error("failed to get the current value: {0:#}")]
    ReadCurrent(anyhow::Error),
    #[error("approved change could not be applied: {0:#}")]
    Write(anyhow::Error),
}

impl TunerError {
    pub fn exit_code(&self) -> u8 {
        EXIT_FAILURE
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    pub config: PolicyConfig,
    pub meminfo_path: PathBuf,
    pub dry_run: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// The tunable already had the requested value.
    Unchanged,
    Applied(u64),
    /// Approved, but not written because of `--dry-run`.
    WouldApply(u64),
    /// Rejected by the policy with the given verdict.
    Rejected(Verdict),
}

#[derive(Clone, Debug)]
pub struct Outcome {
    pub status: Status,
    /// Printed for the operator.
    pub report: String,
}

impl Outcome {
    pub fn exit_code(&self) -> u8 {
        match self.status {
            Status::Unchanged | Status::Applied(_) | Status::WouldApply(_) => EXIT_SUCCESS,
            Status::Rejected(_) => EXIT_CONDITIONS_NOT_MET,
        }
    }
}

fn read_snapshot<P: Platform>(
    platform: &P,
    options: &Options,
) -> Result<MemorySnapshot, TunerError> {
    let path = &options.meminfo_path;
    let make_err = |source: MemInfoError| TunerError::MemInfo {
        path: path.clone(),
        source,
    };
    let text = platform
        .read_to_string(path)
        .map_err(|e| make_err(MemInfoError::Io(e)))?;
    MemorySnapshot::parse(text.as_bytes()).map_err(make_err)
}

/// Run one pass. The tunable is only written when the policy approves and
/// this is not a dry run.
pub fn run<P: Platform>(platform: &P, options: &Options) -> Result<Outcome, TunerError> {
    if !platform.is_root() {
        return Err(TunerError::NotRoot);
    }

    let snapshot = read_snapshot(platform, options)?;
    debug!("memory statistics: {:?}", snapshot);

    let sysctl = Sysctl::min_free_kbytes(platform);
    let current = sysctl.read().map_err(TunerError::ReadCurrent)?;

    let decision = evaluate(&options.config, &snapshot, current);
    debug!("verdict {:?} from rule {:?}", decision.verdict, decision.rule);
    let report = decision.to_string();

    let status = match decision.verdict {
        Verdict::AlreadySet => Status::Unchanged,
        Verdict::Approved(value) if options.dry_run => {
            info!("dry run, not writing {}", value);
            Status::WouldApply(value)
        }
        Verdict::Approved(value) => {
            sysctl.write(value).map_err(TunerError::Write)?;
            Status::Applied(value)
        }
        verdict => Status::Rejected(verdict),
    };

    Ok(Outcome { status, report })
}
