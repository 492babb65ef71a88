// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Command line and environment handling.

use crate::meminfo::MEMINFO_PATH;
use crate::policy::{
    PolicyConfig, DEFAULT_MIN_FREE_KBYTES, DEFAULT_REQUIRED_MEM_FACTOR,
    RECOMMENDED_FACTOR_RANGE,
};
use crate::tuner::Options;
use clap::Parser;
use log::warn;
use std::path::PathBuf;

/// Raise vm.min_free_kbytes if current memory conditions allow it.
///
/// Exits 0 when the value is set (or already was), 1 on execution failures
/// and 2 when the policy rejects the change.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Value to set vm.min_free_kbytes to, in KiB
    #[arg(long, env = "MIN_FREE_KBYTES", default_value_t = DEFAULT_MIN_FREE_KBYTES)]
    pub min_free_kbytes: u64,

    /// Available memory must be at least this many times the requested
    /// value (3-7 recommended)
    #[arg(
        long,
        env = "REQUIRED_MEM_FACTOR",
        default_value_t = DEFAULT_REQUIRED_MEM_FACTOR,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub required_mem_factor: u64,

    /// Evaluate and report, but don't change anything
    #[arg(long)]
    pub dry_run: bool,

    /// Show debug output
    #[arg(long)]
    pub debug: bool,

    /// Read memory statistics from this file
    #[arg(long, hide = true, default_value = MEMINFO_PATH)]
    pub meminfo: PathBuf,
}

impl Args {
    pub fn policy_config(&self) -> PolicyConfig {
        if !RECOMMENDED_FACTOR_RANGE.contains(&self.required_mem_factor) {
            warn!(
                "required memory factor {} is outside the recommended range {}-{}",
                self.required_mem_factor,
                RECOMMENDED_FACTOR_RANGE.start(),
                RECOMMENDED_FACTOR_RANGE.end()
            );
        }
        PolicyConfig {
            desired_value_kb: self.min_free_kbytes,
            required_mem_factor: self.required_mem_factor,
        }
    }

    pub fn to_options(&self) -> Options {
        Options {
            config: self.policy_config(),
            meminfo_path: self.meminfo.clone(),
            dry_run: self.dry_run,
        }
    }
}
