// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::process_util;
use anyhow::Result;
use nix::unistd::Uid;
use std::io;
use std::path::Path;
use std::process::Command;

/// Platform abstraction layer.
#[cfg_attr(test, mockall::automock)]
pub trait Platform {
    /// Whether the process runs with root privileges.
    ///
    /// The non-test implementation checks the effective uid.
    fn is_root(&self) -> bool;

    /// Read a whole file, e.g. `/proc/meminfo`.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Run a command and get its stdout as a `String`.
    ///
    /// Stderr is also captured, but not returned to the caller.
    ///
    /// An error is returned if the process fails to launch or exits
    /// non-zero, or if the output is not valid utf8.
    fn run_command_and_get_stdout(&self, cmd: Command) -> Result<String>;
}

/// Non-test implementation of `Platform`.
pub struct PlatformImpl;

impl Platform for PlatformImpl {
    fn is_root(&self) -> bool {
        Uid::effective().is_root()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn run_command_and_get_stdout(&self, cmd: Command) -> Result<String> {
        Ok(process_util::get_output_as_string(cmd)?)
    }
}
