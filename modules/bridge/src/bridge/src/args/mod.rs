// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

use crate::{configuration::Configuration, simulator::TelnetFrontend};
use clap::{Parser, Subcommand};
use std::{num::ParseIntError, path::PathBuf};
use tracing::Level;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[arg(short, long, global = true)]
    /// YAML configuration file. Fields missing from the file, and the whole file if none
    /// is given, take their defaults for the reference UEFI target.
    pub config: Option<PathBuf>,
    #[arg(short, long, default_value_t = Level::INFO, global = true)]
    /// Logging level
    pub log_level: Level,
    #[command(subcommand)]
    pub action: Action,
}

#[derive(Debug, Subcommand)]
pub enum Action {
    /// Connect to a running simulator's telnet frontend, prepare the session and signal
    /// the harness
    Setup(SetupArgs),
    /// Print the harness pid named by a hand-off file
    Handoff {
        /// Hand-off file to read
        path: PathBuf,
    },
    /// Print the ordinal of a checkpoint in a saved `list-snapshots` output
    Listing {
        /// File containing the listing
        path: PathBuf,
        #[arg(short, long)]
        /// Checkpoint name. Defaults to the configured checkpoint name.
        name: Option<String>,
    },
}

#[derive(Debug, clap::Args)]
pub struct SetupArgs {
    #[arg(long)]
    /// Address of the simulator's telnet frontend, e.g. `localhost:4000`. Start it in
    /// SIMICS with `telnet-frontend port = 4000`.
    pub connect: String,
    #[arg(long, default_value = TelnetFrontend::DEFAULT_PROMPT)]
    /// Prompt the frontend prints when it is ready for a command
    pub prompt: String,
    #[arg(long)]
    /// Hand-off file naming the harness pid
    pub handoff: Option<PathBuf>,
    #[arg(long)]
    /// Index of the start marker to run until
    pub start_index: Option<i64>,
    #[arg(long, value_parser = parse_address)]
    /// Address of the fault handler to break on, decimal or 0x-prefixed hexadecimal
    pub crash_address: Option<u64>,
    #[arg(long)]
    /// Classification reported when the crash breakpoint is hit
    pub crash_reason: Option<String>,
    #[arg(long)]
    /// Override the simulator's batch mode flag
    pub batch_mode: Option<bool>,
    #[arg(long, default_value_t = false)]
    /// Fail setup if the checkpoint is not at ordinal 0
    pub strict: bool,
}

impl SetupArgs {
    /// Apply command line overrides on top of a configuration
    pub fn apply(&self, configuration: &mut Configuration) {
        if let Some(handoff) = &self.handoff {
            configuration.handoff_path = handoff.clone();
        }

        if let Some(index) = self.start_index {
            configuration.start_marker_index = index;
        }

        if let Some(address) = self.crash_address {
            configuration.crash_address = address;
        }

        if let Some(reason) = &self.crash_reason {
            configuration.crash_reason = reason.clone();
        }

        if self.batch_mode.is_some() {
            configuration.batch_mode = self.batch_mode;
        }

        configuration.strict_checkpoint_ordinal |= self.strict;
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal address
pub fn parse_address(s: &str) -> Result<u64, ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    }
}
