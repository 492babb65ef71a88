// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Reading and writing `vm.min_free_kbytes` through the `sysctl` utility.

use crate::platform::Platform;
use anyhow::{bail, Context, Result};
use log::info;
use std::process::Command;

pub const MIN_FREE_KBYTES_KEY: &str = "vm.min_free_kbytes";

const SYSCTL_CMD: &str = "sysctl";

/// Access to a single integer kernel tunable.
pub struct Sysctl<'a, P: Platform> {
    platform: &'a P,
    key: &'static str,
}

impl<'a, P: Platform> Sysctl<'a, P> {
    pub fn min_free_kbytes(platform: &'a P) -> Self {
        Self {
            platform,
            key: MIN_FREE_KBYTES_KEY,
        }
    }

    /// Get the current value, as printed by `sysctl -n`.
    pub fn read(&self) -> Result<u64> {
        let mut cmd = Command::new(SYSCTL_CMD);
        cmd.args(["-n", self.key]);
        let stdout = self
            .platform
            .run_command_and_get_stdout(cmd)
            .with_context(|| format!("failed to read {}", self.key))?;
        let value = stdout.trim();
        value
            .parse()
            .with_context(|| format!("couldn't parse {} value {:?}", self.key, value))
    }

    /// Set the tunable to `value` and check that the kernel kept it.
    pub fn write(&self, value: u64) -> Result<()> {
        info!("setting {} to {}", self.key, value);
        let mut cmd = Command::new(SYSCTL_CMD);
        cmd.arg("-w").arg(format!("{}={}", self.key, value));
        self.platform
            .run_command_and_get_stdout(cmd)
            .with_context(|| format!("failed to write {}", self.key))?;

        let actual = self.read()?;
        if actual != value {
            bail!(
                "{} is {} after writing {}, the kernel did not accept the value",
                self.key,
                actual,
                value
            );
        }
        Ok(())
    }
}
