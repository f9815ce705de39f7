// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

//! Capabilities the bridge needs from the simulator
//!
//! Each setup step only sees the capability it uses. A simulator binding implements all
//! of them and is then usable as a [`Simulator`] by the session.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

mod command;
mod telnet;

pub use command::{parse_breakpoint_id, parse_stop_event, CommandFrontend, CommandSimulator};
pub use telnet::TelnetFrontend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Opaque breakpoint handle assigned by the simulator
pub struct BreakpointId(i64);

impl BreakpointId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> i64 {
        self.0
    }
}

impl From<i64> for BreakpointId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A hap the target raises to mark a well-known point in its execution, and the index to
/// run until
pub struct StartMarker {
    pub hap: String,
    pub index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// How a run-until request ended
pub enum RunOutcome {
    MarkerReached,
    /// The simulation stopped for some other reason first
    Stopped { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Information about a simulation stop, passed to stop callbacks
pub struct StopEvent {
    /// The breakpoint the simulation stopped at, if it stopped at one
    pub breakpoint: Option<BreakpointId>,
    pub message: Option<String>,
}

/// Callback run on every simulation stop
pub type StopCallback = Box<dyn FnMut(&StopEvent) + Send + 'static>;

pub trait ExecutionControl {
    /// Whether the simulator runs without an interactive display
    fn batch_mode(&mut self) -> Result<bool>;
    /// Disconnect the console from the graphics device `device`
    fn detach_console(&mut self, device: &str) -> Result<()>;
    /// Run the simulation until `marker` fires. Blocks until the simulation stops.
    fn run_until(&mut self, marker: &StartMarker) -> Result<RunOutcome>;
}

pub trait CheckpointControl {
    /// Enable the in-memory snapshot feature, if the simulator gates it
    fn enable_in_memory_snapshots(&mut self) -> Result<()>;
    fn save_checkpoint(&mut self, name: &str) -> Result<()>;
    /// The simulator's textual checkpoint table
    fn list_checkpoints(&mut self) -> Result<String>;
}

pub trait BreakpointControl {
    /// Break on execution of `address`
    fn add_breakpoint(&mut self, address: u64) -> Result<BreakpointId>;
}

pub trait HaltNotification {
    /// Register a callback to run every time the simulation stops from now on
    fn on_simulation_stopped(&mut self, callback: StopCallback) -> Result<()>;
}

/// Everything a session needs from the simulator
pub trait Simulator: ExecutionControl + CheckpointControl + BreakpointControl + HaltNotification {}

impl<T> Simulator for T where
    T: ExecutionControl + CheckpointControl + BreakpointControl + HaltNotification
{
}
