// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Running `sysctl` and other external utilities.

use log::debug;
use std::fmt::{self, Write};
use std::io;
use std::process::{Command, Output};

#[derive(Debug)]
pub enum ErrorKind {
    LaunchProcess(io::Error),
    ExitedNonZero(Output),
    InvalidUtf8,
}

#[derive(Debug)]
pub struct ProcessError {
    command: String,
    kind: ErrorKind,
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match &self.kind {
            ErrorKind::LaunchProcess(err) => {
                write!(f, "failed to launch process \"{}\": {}", self.command, err)
            }
            ErrorKind::ExitedNonZero(output) => write!(
                f,
                "command \"{}\" failed: {}\nstdout={}\nstderr={}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr),
            ),
            ErrorKind::InvalidUtf8 => {
                write!(f, "command \"{}\" printed invalid utf8", self.command)
            }
        }
    }
}

impl std::error::Error for ProcessError {}

/// Format the command as a string for logging and error messages.
pub fn command_to_string(cmd: &Command) -> String {
    let mut output = cmd.get_program().to_string_lossy().into_owned();

    for arg in cmd.get_args() {
        // OK to unwrap: writing into a string cannot fail.
        write!(output, " {}", arg.to_string_lossy()).unwrap();
    }

    output
}

/// Run a command and get its output (both stdout and stderr).
///
/// An error is returned if the process fails to launch, or if it exits non-zero.
fn get_command_output(mut command: Command) -> Result<Output, ProcessError> {
    let cmd_str = command_to_string(&command);
    debug!("running command: {}", cmd_str);

    let output = command.output().map_err(|err| ProcessError {
        command: cmd_str.clone(),
        kind: ErrorKind::LaunchProcess(err),
    })?;

    if !output.status.success() {
        return Err(ProcessError {
            command: cmd_str,
            kind: ErrorKind::ExitedNonZero(output),
        });
    }
    Ok(output)
}

/// Run a command and get its stdout as a `String`.
///
/// An error is returned if the process fails to launch or exits non-zero, or if the output is not
/// valid utf8.
pub fn get_output_as_string(command: Command) -> Result<String, ProcessError> {
    let cmd_str = command_to_string(&command);
    let output = get_command_output(command)?;
    String::from_utf8(output.stdout).map_err(|_| ProcessError {
        command: cmd_str,
        kind: ErrorKind::InvalidUtf8,
    })
}
