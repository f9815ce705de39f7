// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

//! Simulator capabilities implemented with SIMICS CLI commands

use super::{
    BreakpointControl, BreakpointId, CheckpointControl, ExecutionControl, HaltNotification,
    RunOutcome, StartMarker, StopCallback, StopEvent,
};
use crate::{Error, Result};
use tracing::{debug, trace};

/// Prefix SIMICS puts in front of command error messages
const ERROR_PREFIX: &str = "***";
/// Python variable collecting the indices of start marker haps seen during a run
const MARKER_HITS: &str = "_tsffs_bridge_marker_hits";
/// Python variable holding the start marker hap callback handle
const MARKER_HANDLE: &str = "_tsffs_bridge_marker_handle";

/// A transport that runs one SIMICS CLI command line and returns what SIMICS printed in
/// reply
pub trait CommandFrontend {
    fn run_command(&mut self, command: &str) -> Result<String>;
    /// Block until the simulator prints output that is not a reply to a command, such as
    /// a stop message. Returns `None` once the frontend is closed.
    fn next_output(&mut self) -> Result<Option<String>>;
}

/// Drives the simulator through its command line. Stop callbacks run when a run command
/// issued through this simulator returns, and for every stop [`Self::watch_stops`] sees.
pub struct CommandSimulator<F> {
    frontend: F,
    stop_callbacks: Vec<StopCallback>,
}

impl<F> CommandSimulator<F>
where
    F: CommandFrontend,
{
    pub fn new(frontend: F) -> Self {
        Self {
            frontend,
            stop_callbacks: Vec::new(),
        }
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    pub fn into_frontend(self) -> F {
        self.frontend
    }

    /// Run a command, turning an error reply into an [`Error::Command`]
    pub fn command(&mut self, command: &str) -> Result<String> {
        trace!("Running command {command:?}");

        let reply = self.frontend.run_command(command)?;

        if let Some(message) = reply
            .lines()
            .map(str::trim)
            .find_map(|l| l.strip_prefix(ERROR_PREFIX))
        {
            return Err(Error::Command {
                command: command.to_string(),
                message: message.trim().to_string(),
            });
        }

        Ok(reply)
    }

    /// Resume the simulation until it next stops
    pub fn continue_simulation(&mut self) -> Result<String> {
        let result = self.command("run");
        self.simulation_stopped(&run_stop_event(&result));
        result
    }

    /// Stay attached to the frontend and run the stop callbacks for every stop it
    /// reports, whoever caused it. Returns the number of stops seen once the frontend
    /// closes.
    pub fn watch_stops(&mut self) -> Result<usize> {
        let mut stops = 0;

        while let Some(output) = self.frontend.next_output()? {
            match parse_stop_event(&output) {
                Some(event) => {
                    stops += 1;
                    self.simulation_stopped(&event);
                }
                None => trace!("Ignoring frontend output {output:?}"),
            }
        }

        debug!("Frontend closed after {stops} stops");

        Ok(stops)
    }

    fn simulation_stopped(&mut self, event: &StopEvent) {
        debug!(
            "Simulation stopped ({:?}), running {} stop callbacks",
            event.breakpoint,
            self.stop_callbacks.len()
        );

        self.stop_callbacks.iter_mut().for_each(|cb| cb(event));
    }

    /// Number of start marker haps counted since the counter was installed
    fn marker_hits(&mut self) -> Result<usize> {
        let command = format!("@len({MARKER_HITS})");
        let reply = self.command(&command)?;

        reply
            .trim()
            .parse()
            .map_err(|_| Error::UnexpectedReply { command, reply })
    }
}

impl<F> ExecutionControl for CommandSimulator<F>
where
    F: CommandFrontend,
{
    fn batch_mode(&mut self) -> Result<bool> {
        let command = "@SIM_get_batch_mode()";
        let reply = self.command(command)?;

        match reply.trim() {
            "True" => Ok(true),
            "False" => Ok(false),
            _ => Err(Error::UnexpectedReply {
                command: command.to_string(),
                reply,
            }),
        }
    }

    fn detach_console(&mut self, device: &str) -> Result<()> {
        self.command(&format!("@conf.{device}.console = None"))?;
        Ok(())
    }

    /// Run until the marker hap fires with the marker index. A hap callback counts the
    /// occurrences during the run, so any stop the callback did not see is reported as
    /// [`RunOutcome::Stopped`].
    fn run_until(&mut self, marker: &StartMarker) -> Result<RunOutcome> {
        self.command(&format!("@{MARKER_HITS} = []"))?;
        self.command(&format!(
            "@{MARKER_HANDLE} = SIM_hap_add_callback_index(\"{}\", \
             lambda data, obj, index: {MARKER_HITS}.append(index), None, {})",
            marker.hap, marker.index
        ))?;

        let result = self.command(&format!(
            "bp.hap.run-until name = {} index = {}",
            marker.hap, marker.index
        ));

        let event = run_stop_event(&result);
        self.simulation_stopped(&event);

        self.command(&format!(
            "@SIM_hap_delete_callback_id(\"{}\", {MARKER_HANDLE})",
            marker.hap
        ))?;

        match result {
            Ok(_) | Err(Error::Command { .. }) => {}
            Err(e) => return Err(e),
        }

        if self.marker_hits()? > 0 {
            return Ok(RunOutcome::MarkerReached);
        }

        Ok(RunOutcome::Stopped {
            reason: event
                .message
                .unwrap_or_else(|| "Simulation stopped without a reason".to_string()),
        })
    }
}

impl<F> CheckpointControl for CommandSimulator<F>
where
    F: CommandFrontend,
{
    fn enable_in_memory_snapshots(&mut self) -> Result<()> {
        self.command("enable-unsupported-feature internals")?;
        Ok(())
    }

    fn save_checkpoint(&mut self, name: &str) -> Result<()> {
        self.command(&format!("save-snapshot name = {name}"))?;
        Ok(())
    }

    fn list_checkpoints(&mut self) -> Result<String> {
        self.command("list-snapshots")
    }
}

impl<F> BreakpointControl for CommandSimulator<F>
where
    F: CommandFrontend,
{
    fn add_breakpoint(&mut self, address: u64) -> Result<BreakpointId> {
        let command = format!("break {address:#x}");
        let reply = self.command(&command)?;

        parse_breakpoint_id(&reply).ok_or(Error::UnexpectedReply { command, reply })
    }
}

impl<F> HaltNotification for CommandSimulator<F>
where
    F: CommandFrontend,
{
    fn on_simulation_stopped(&mut self, callback: StopCallback) -> Result<()> {
        self.stop_callbacks.push(callback);
        Ok(())
    }
}

/// Extract the breakpoint id from the reply to a `break` command. The id is the first
/// decimal integer in the reply, e.g. `Breakpoint 1 set on address 0xdef6249c`.
pub fn parse_breakpoint_id(reply: &str) -> Option<BreakpointId> {
    reply
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
        .find_map(|t| t.parse::<i64>().ok())
        .map(BreakpointId::from)
}

/// Parse a block of simulator output into a stop, if it reports one. A line like
/// `[board.mb.cpu0] Breakpoint 1: 0xdef6249c ud2` is a stop at breakpoint 1. Any line
/// saying the simulation stopped is a stop without a breakpoint.
pub fn parse_stop_event(output: &str) -> Option<StopEvent> {
    let breakpoint = output.lines().find_map(|l| {
        l.split_once("Breakpoint ")
            .and_then(|(_, rest)| parse_breakpoint_id(rest))
    });

    let stopped = breakpoint.is_some()
        || output
            .lines()
            .any(|l| l.to_ascii_lowercase().contains("stopped"));

    stopped.then(|| StopEvent {
        breakpoint,
        message: Some(output.trim().to_string()).filter(|m| !m.is_empty()),
    })
}

/// The stop a run command ended with, taken from its reply or its error
fn run_stop_event(result: &Result<String>) -> StopEvent {
    match result {
        Ok(reply) => parse_stop_event(reply).unwrap_or_else(|| StopEvent {
            breakpoint: None,
            message: Some(reply.trim().to_string()).filter(|r| !r.is_empty()),
        }),
        Err(Error::Command { message, .. }) => StopEvent {
            breakpoint: parse_stop_event(message).and_then(|e| e.breakpoint),
            message: Some(message.clone()),
        },
        Err(e) => StopEvent {
            breakpoint: None,
            message: Some(e.to_string()),
        },
    }
}
