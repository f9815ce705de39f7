// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

//! TSFFS Session Bridge
//!
//! # Overview
//!
//! This crate prepares a SIMICS simulation for snapshot fuzzing by an external harness
//! process. The harness starts SIMICS, writes its own process id into a small hand-off
//! file, and then waits for a signal. The bridge drives the simulation to the target's
//! start marker, saves the start-state checkpoint every fuzzing iteration restores to,
//! registers the crash breakpoint, and finally signals the harness that the environment
//! is ready.
//!
//! # Capabilities
//!
//! The bridge can:
//!
//! - Run the target until the magic start marker fires, detaching the interactive
//!   console first when SIMICS is running in batch mode
//! - Save the `origin` checkpoint and verify that it occupies ordinal 0, which the
//!   harness's restore logic depends on
//! - Register an abnormal exit breakpoint (for example the invalid opcode handler) along
//!   with the classification the crash observer reports when it is hit
//! - Deliver `SIGUSR2` to the harness once when setup completes and again on every
//!   subsequent simulation stop
//!
//! The simulator is reached only through the capability traits in [`simulator`]. The
//! [`simulator::CommandSimulator`] implements all of them on top of the SIMICS CLI.

#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod args;
pub mod checkpoint;
pub mod configuration;
pub mod crash;
pub mod driver;
pub mod error;
pub mod handoff;
pub mod notify;
pub mod session;
pub mod simulator;
pub mod state;

pub use error::{Error, Result};
pub use session::{Session, SessionReport};
