// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::process::ExitCode;

use clap::Parser;
use log::error;

use min_free_kbytes::command_line::Args;
use min_free_kbytes::logger;
use min_free_kbytes::platform::PlatformImpl;
use min_free_kbytes::tuner::{self, EXIT_FAILURE};

fn main() -> ExitCode {
    // clap exits with 2 on bad arguments, which would read as a policy
    // rejection.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(EXIT_FAILURE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    if let Err(err) = logger::init(args.debug) {
        eprintln!("failed to initialize logger: {}", err);
        return ExitCode::from(EXIT_FAILURE);
    }

    match tuner::run(&PlatformImpl, &args.to_options()) {
        Ok(outcome) => {
            println!("{}", outcome.report);
            ExitCode::from(outcome.exit_code())
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::from(err.exit_code())
        }
    }
}
