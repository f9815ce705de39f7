// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

//! Bridge Result and error types

use crate::simulator::BreakpointId;
use nix::{errno::Errno, sys::signal::Signal};
use std::{io, num::ParseIntError, path::PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
/// Errors raised while setting up a fuzzing session
pub enum Error {
    #[error("Failed to read hand-off file {path:?}: {source}")]
    HandoffIo { path: PathBuf, source: io::Error },
    #[error("Invalid harness pid {value:?} on hand-off line {line}: {source}")]
    HandoffParse {
        line: usize,
        value: String,
        source: ParseIntError,
    },
    #[error("Checkpoint {name} has ordinal {ordinal}, expected 0")]
    CheckpointOrdinalMismatch { name: String, ordinal: i64 },
    #[error("Simulation stopped before start marker {marker} index {index} fired: {reason}")]
    MarkerNotReached {
        marker: String,
        index: i64,
        reason: String,
    },
    #[error("Simulator rejected command {command:?}: {message}")]
    Command { command: String, message: String },
    #[error("Unexpected reply to command {command:?}: {reply:?}")]
    UnexpectedReply { command: String, reply: String },
    #[error("Breakpoint {id} already has abnormal exit reason {reason:?}")]
    DuplicateReason { id: BreakpointId, reason: String },
    #[error("Failed to deliver {signal} to process {pid}: {source}")]
    Signal {
        pid: i32,
        signal: Signal,
        source: Errno,
    },
    #[error("Unknown signal {name}")]
    UnknownSignal { name: String },
    #[error("Frontend I/O error: {source}")]
    FrontendIo {
        #[from]
        source: io::Error,
    },
    #[error("Frontend connection closed before the prompt was received")]
    FrontendClosed,
    #[error("Failed to load configuration {path:?}: {message}")]
    Configuration { path: PathBuf, message: String },
    #[error("Session cannot consume {input} in state {state}")]
    Transition { state: String, input: String },
}
