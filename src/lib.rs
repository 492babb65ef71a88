// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Raise `vm.min_free_kbytes` when memory conditions allow it.
//!
//! The decision logic lives in [`policy`]. Everything that touches the
//! system goes through [`platform::Platform`].

pub mod command_line;
pub mod logger;
pub mod meminfo;
pub mod platform;
pub mod policy;
pub mod process_util;
pub mod sysctl;
pub mod tuner;
