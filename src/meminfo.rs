// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Parsing of `/proc/meminfo` into a [`MemorySnapshot`].

use std::fmt;
use std::io;
use std::io::BufRead;

use thiserror::Error;

pub const MEMINFO_PATH: &str = "/proc/meminfo";

#[derive(Error, Debug)]
pub enum MemInfoError {
    #[error("failed to read meminfo: {0}")]
    Io(#[from] io::Error),
    #[error("meminfo is missing the {0} field")]
    MissingField(&'static str),
    #[error("meminfo field {field} has malformed value {value:?}")]
    MalformedField { field: &'static str, value: String },
}

/// Where the available memory figure came from.
///
/// Older kernels don't export `MemAvailable`, in which case it is estimated
/// from free, buffers and cached memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AvailableMemory {
    Reported(u64),
    Derived(u64),
}

impl AvailableMemory {
    pub fn kb(&self) -> u64 {
        match self {
            AvailableMemory::Reported(kb) | AvailableMemory::Derived(kb) => *kb,
        }
    }
}

/// Memory statistics used to decide whether `vm.min_free_kbytes` may change.
/// All values are in KiB.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub mem_total_kb: u64,
    pub mem_free_kb: u64,
    pub buffers_kb: u64,
    pub cached_kb: u64,
    pub swap_total_kb: u64,
    pub swap_free_kb: u64,
    pub mem_available: AvailableMemory,
}

// Labels are compared lower-cased.
const REQUIRED_FIELDS: [(&str, &str); 6] = [
    ("memtotal", "MemTotal"),
    ("memfree", "MemFree"),
    ("buffers", "Buffers"),
    ("cached", "Cached"),
    ("swaptotal", "SwapTotal"),
    ("swapfree", "SwapFree"),
];

impl MemorySnapshot {
    /// Parse meminfo formatted text.
    ///
    /// The first occurrence of each label wins. Every field except
    /// `MemAvailable` must be present with an integer value.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, MemInfoError> {
        let mut values: [Option<u64>; 6] = [None; 6];
        let mut available = None;

        for line in reader.lines() {
            let line = line?;
            let Some((label, rest)) = line.split_once(':') else {
                continue;
            };
            let label = label.trim().to_ascii_lowercase();

            let (slot, name) = if label == "memavailable" {
                (&mut available, "MemAvailable")
            } else if let Some(idx) = REQUIRED_FIELDS.iter().position(|(l, _)| *l == label) {
                (&mut values[idx], REQUIRED_FIELDS[idx].1)
            } else {
                continue;
            };
            if slot.is_some() {
                continue;
            }

            let token = rest.split_whitespace().next().unwrap_or_default();
            let value = token
                .parse::<u64>()
                .map_err(|_| MemInfoError::MalformedField {
                    field: name,
                    value: token.to_owned(),
                })?;
            *slot = Some(value);
        }

        let mut fields = [0u64; 6];
        for (idx, value) in values.iter().enumerate() {
            fields[idx] = value.ok_or(MemInfoError::MissingField(REQUIRED_FIELDS[idx].1))?;
        }
        let [mem_total_kb, mem_free_kb, buffers_kb, cached_kb, swap_total_kb, swap_free_kb] =
            fields;

        let mem_available = match available {
            Some(kb) => AvailableMemory::Reported(kb),
            None => AvailableMemory::Derived(
                mem_free_kb
                    .saturating_add(buffers_kb)
                    .saturating_add(cached_kb),
            ),
        };

        Ok(MemorySnapshot {
            mem_total_kb,
            mem_free_kb,
            buffers_kb,
            cached_kb,
            swap_total_kb,
            swap_free_kb,
            mem_available,
        })
    }

    pub fn mem_available_kb(&self) -> u64 {
        self.mem_available.kb()
    }

    /// Percentage of swap in use, truncated. 0 when there is no swap.
    pub fn swap_utilization_pct(&self) -> u64 {
        if self.swap_total_kb == 0 {
            return 0;
        }
        // A SwapFree above SwapTotal would be a kernel bug; treat it as unused.
        100u64.saturating_sub(self.swap_free_kb.saturating_mul(100) / self.swap_total_kb)
    }
}

impl fmt::Display for MemorySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "MemTotal:     {} kB", self.mem_total_kb)?;
        writeln!(f, "MemFree:      {} kB", self.mem_free_kb)?;
        match self.mem_available {
            AvailableMemory::Reported(kb) => writeln!(f, "MemAvailable: {} kB", kb)?,
            AvailableMemory::Derived(kb) => {
                writeln!(f, "MemAvailable: {} kB (free + buffers + cached)", kb)?
            }
        }
        writeln!(f, "Buffers:      {} kB", self.buffers_kb)?;
        writeln!(f, "Cached:       {} kB", self.cached_kb)?;
        writeln!(f, "SwapTotal:    {} kB", self.swap_total_kb)?;
        write!(f, "SwapFree:     {} kB", self.swap_free_kb)
    }
}
