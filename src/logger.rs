// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Logger for an operator running the tool from a terminal.
//!
//! Output goes to plain stdout/stderr rather than syslog so that it lines up
//! with the printed report.

use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};

/// Basic logger to stdout/stderr.
pub struct Logger {
    pub level: LevelFilter,
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let msg = format!("{}: {}", record.level(), record.args());
        if record.level() <= Level::Warn {
            eprintln!("{}", msg);
        } else {
            println!("{}", msg);
        }
    }

    fn flush(&self) {}
}

/// Set up logging.
pub fn init(debug: bool) -> Result<(), SetLoggerError> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let logger = Logger { level };
    log::set_boxed_logger(Box::new(logger)).map(|()| log::set_max_level(level))
}
