// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Decides whether `vm.min_free_kbytes` can safely be raised to the requested
//! value.
//!
//! The decision is a pure function of the requested configuration, a memory
//! snapshot and the current value of the tunable. Rules are checked in a
//! fixed order and the first one that matches decides the verdict.

use std::fmt;

use crate::meminfo::MemorySnapshot;

/// The kernel's own default for `vm.min_free_kbytes`. Requests below it are
/// rejected.
pub const KERNEL_DEFAULT_MIN_FREE_KBYTES: u64 = 67584;
/// Largest share of total memory, in percent, that may be reserved.
pub const MAX_MEM_PERCENT: u64 = 20;
/// Swap usage, in percent, at which the system is considered under pressure.
pub const MAX_SWAP_UTILIZATION_PCT: u64 = 50;

pub const DEFAULT_MIN_FREE_KBYTES: u64 = 262144;
pub const DEFAULT_REQUIRED_MEM_FACTOR: u64 = 7;
pub const RECOMMENDED_FACTOR_RANGE: std::ops::RangeInclusive<u64> = 3..=7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PolicyConfig {
    pub desired_value_kb: u64,
    /// Available memory must be at least `desired_value_kb` times this.
    pub required_mem_factor: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            desired_value_kb: DEFAULT_MIN_FREE_KBYTES,
            required_mem_factor: DEFAULT_REQUIRED_MEM_FACTOR,
        }
    }
}

impl PolicyConfig {
    pub fn required_mem_kb(&self) -> u64 {
        self.desired_value_kb
            .saturating_mul(self.required_mem_factor)
    }
}

pub fn max_allowed_kb(mem_total_kb: u64) -> u64 {
    mem_total_kb.saturating_mul(MAX_MEM_PERCENT) / 100
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The tunable already holds the requested value.
    AlreadySet,
    /// The request is below the kernel default.
    TooLowRequest,
    /// The request exceeds `MAX_MEM_PERCENT` of total memory.
    TooHighRequest,
    /// Swap or available memory make the change unsafe right now.
    ConditionsNotMet,
    /// Safe to write the contained value.
    Approved(u64),
}

/// Everything the rules look at.
#[derive(Clone, Copy, Debug)]
pub struct Evaluation<'a> {
    pub config: &'a PolicyConfig,
    pub snapshot: &'a MemorySnapshot,
    pub current_value_kb: u64,
}

struct Rule {
    name: &'static str,
    check: fn(&Evaluation) -> Option<Verdict>,
}

// Order matters: the first rule returning a verdict wins.
const RULES: [Rule; 4] = [
    Rule {
        name: "floor",
        check: check_floor,
    },
    Rule {
        name: "no-op",
        check: check_already_set,
    },
    Rule {
        name: "ceiling",
        check: check_ceiling,
    },
    Rule {
        name: "safety",
        check: check_safety,
    },
];

fn check_floor(e: &Evaluation) -> Option<Verdict> {
    (e.config.desired_value_kb < KERNEL_DEFAULT_MIN_FREE_KBYTES).then_some(Verdict::TooLowRequest)
}

fn check_already_set(e: &Evaluation) -> Option<Verdict> {
    (e.current_value_kb == e.config.desired_value_kb).then_some(Verdict::AlreadySet)
}

fn check_ceiling(e: &Evaluation) -> Option<Verdict> {
    (e.config.desired_value_kb > max_allowed_kb(e.snapshot.mem_total_kb))
        .then_some(Verdict::TooHighRequest)
}

fn check_safety(e: &Evaluation) -> Option<Verdict> {
    let swap_pressure = e.snapshot.swap_utilization_pct() >= MAX_SWAP_UTILIZATION_PCT;
    let low_memory = e.snapshot.mem_available_kb() < e.config.required_mem_kb();
    (swap_pressure || low_memory).then_some(Verdict::ConditionsNotMet)
}

/// The verdict together with what's needed to explain it.
#[derive(Clone, Copy, Debug)]
pub struct Decision<'a> {
    pub verdict: Verdict,
    /// Name of the rule that produced the verdict, `None` when approved.
    pub rule: Option<&'static str>,
    pub evaluation: Evaluation<'a>,
}

/// Run the rules against `snapshot`. Has no side effects.
pub fn evaluate<'a>(
    config: &'a PolicyConfig,
    snapshot: &'a MemorySnapshot,
    current_value_kb: u64,
) -> Decision<'a> {
    let evaluation = Evaluation {
        config,
        snapshot,
        current_value_kb,
    };
    for rule in &RULES {
        if let Some(verdict) = (rule.check)(&evaluation) {
            return Decision {
                verdict,
                rule: Some(rule.name),
                evaluation,
            };
        }
    }
    Decision {
        verdict: Verdict::Approved(config.desired_value_kb),
        rule: None,
        evaluation,
    }
}

impl Decision<'_> {
    /// Whether the verdict lets the caller exit successfully without writing
    /// anything.
    pub fn is_noop(&self) -> bool {
        self.verdict == Verdict::AlreadySet
    }
}

/// Human readable report for the operator.
impl fmt::Display for Decision<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Evaluation {
            config,
            snapshot,
            current_value_kb,
        } = self.evaluation;
        let desired = config.desired_value_kb;

        match self.verdict {
            Verdict::TooLowRequest => {
                writeln!(
                    f,
                    "Requested vm.min_free_kbytes {} is below the kernel default {}.",
                    desired, KERNEL_DEFAULT_MIN_FREE_KBYTES
                )?;
                write!(
                    f,
                    "Refusing to change it; set the value manually if this is intended."
                )
            }
            Verdict::AlreadySet => write!(
                f,
                "vm.min_free_kbytes is already {}, nothing to do.",
                current_value_kb
            ),
            Verdict::TooHighRequest => {
                writeln!(
                    f,
                    "Requested vm.min_free_kbytes {} is above {} ({}% of total memory {} kB).",
                    desired,
                    max_allowed_kb(snapshot.mem_total_kb),
                    MAX_MEM_PERCENT,
                    snapshot.mem_total_kb
                )?;
                write!(
                    f,
                    "Refusing to change it; set the value manually if this is intended."
                )
            }
            Verdict::ConditionsNotMet => {
                writeln!(
                    f,
                    "Memory conditions do not allow changing vm.min_free_kbytes from {} to {}.",
                    current_value_kb, desired
                )?;
                writeln!(f, "{}", snapshot)?;
                writeln!(
                    f,
                    "Swap utilization: {}% (must be below {}%)",
                    snapshot.swap_utilization_pct(),
                    MAX_SWAP_UTILIZATION_PCT
                )?;
                write!(
                    f,
                    "Required available memory: {} kB ({} x {})",
                    config.required_mem_kb(),
                    desired,
                    config.required_mem_factor
                )
            }
            Verdict::Approved(value) => write!(
                f,
                "Memory conditions met, changing vm.min_free_kbytes from {} to {}.",
                current_value_kb, value
            ),
        }
    }
}
