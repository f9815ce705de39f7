// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

//! Session configuration
//!
//! Every field has a default matching the reference UEFI target, so a configuration file
//! only needs to name what differs:
//!
//! ```yaml
//! handoff_path: /tmp/harness/_if_data_.tmp
//! crash_address: 0xfffff000
//! batch_mode: true
//! ```

use crate::{Error, Result};
use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};
use std::{fs::read_to_string, path::Path, path::PathBuf, str::FromStr};
use typed_builder::TypedBuilder;

impl Configuration {
    /// The harness writes its session data here, relative to the simulator's working
    /// directory
    pub const DEFAULT_HANDOFF_PATH: &'static str = "./_if_data_.tmp";
    /// Hap raised by the target's magic instruction
    pub const DEFAULT_START_MARKER: &'static str = "Core_Magic_Instruction";
    /// Magic value the on-target test harness raises when it reaches the test start
    pub const DEFAULT_START_MARKER_INDEX: i64 = 42;
    pub const DEFAULT_CHECKPOINT_NAME: &'static str = "origin";
    /// Invalid opcode handler of the reference UEFI target, taken from its IDT
    pub const DEFAULT_CRASH_ADDRESS: u64 = 0xdef6249c;
    pub const DEFAULT_CRASH_REASON: &'static str = "Application crash (UD)";
    pub const DEFAULT_CONSOLE_DEVICE: &'static str = "board.mb.gpu.vga";
    pub const DEFAULT_NOTIFY_SIGNAL: &'static str = "SIGUSR2";
}

#[derive(TypedBuilder, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Configuration {
    #[builder(default = PathBuf::from(Configuration::DEFAULT_HANDOFF_PATH), setter(into))]
    /// Path of the hand-off file naming the harness pid
    pub handoff_path: PathBuf,
    #[builder(default = Configuration::DEFAULT_START_MARKER.to_string(), setter(into))]
    pub start_marker: String,
    #[builder(default = Configuration::DEFAULT_START_MARKER_INDEX)]
    /// Index passed to the simulator's run-until for the start marker
    pub start_marker_index: i64,
    #[builder(default = Configuration::DEFAULT_CHECKPOINT_NAME.to_string(), setter(into))]
    pub checkpoint_name: String,
    #[builder(default = true)]
    /// Whether to enable in-memory snapshots before saving the checkpoint
    pub enable_in_memory_snapshots: bool,
    #[builder(default = false)]
    /// Fail setup instead of only logging when the checkpoint is not at ordinal 0
    pub strict_checkpoint_ordinal: bool,
    #[builder(default = Configuration::DEFAULT_CRASH_ADDRESS)]
    pub crash_address: u64,
    #[builder(default = Configuration::DEFAULT_CRASH_REASON.to_string(), setter(into))]
    pub crash_reason: String,
    #[builder(default, setter(strip_option))]
    /// Overrides the simulator's own batch mode flag when set
    pub batch_mode: Option<bool>,
    #[builder(default = Some(Configuration::DEFAULT_CONSOLE_DEVICE.to_string()))]
    /// Graphics device whose console is detached in batch mode, if any
    pub console_device: Option<String>,
    #[builder(default = Configuration::DEFAULT_NOTIFY_SIGNAL.to_string(), setter(into))]
    /// Signal delivered to the harness on readiness and on every stop
    pub notify_signal: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Configuration {
    /// Load a YAML configuration file. Missing fields take their default values.
    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();

        let contents = read_to_string(path).map_err(|e| Error::Configuration {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        serde_yaml::from_str(&contents).map_err(|e| Error::Configuration {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// The signal named by `notify_signal`, e.g. `SIGUSR2`
    pub fn signal(&self) -> Result<Signal> {
        Signal::from_str(&self.notify_signal).map_err(|_| Error::UnknownSignal {
            name: self.notify_signal.clone(),
        })
    }
}
