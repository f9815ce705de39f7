// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

//! Signal handshake with the harness process
//!
//! The harness blocks waiting for a signal instead of polling. It receives one when
//! setup is complete, and, once auto-notify is armed, one more every time the simulation
//! stops. Signals carry no payload: the harness re-checks state when woken.

use crate::{
    crash::{CrashObservations, HaltClassification},
    simulator::{HaltNotification, StopEvent},
    Error, Result,
};
use nix::{
    sys::signal::{kill, Signal},
    unistd::Pid,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Delivers a payload-free signal to a process
pub trait SignalDelivery: Send + Sync {
    fn deliver(&self, pid: i32, signal: Signal) -> Result<()>;
}

/// Delivers signals with `kill(2)`
pub struct UnixSignals;

impl SignalDelivery for UnixSignals {
    fn deliver(&self, pid: i32, signal: Signal) -> Result<()> {
        kill(Pid::from_raw(pid), signal).map_err(|source| Error::Signal {
            pid,
            signal,
            source,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeState {
    /// Pid signaled on every stop, 0 while not armed
    pub armed_pid: i32,
    pub ready_sent: bool,
}

pub struct HandshakeNotifier {
    signal: Signal,
    delivery: Arc<dyn SignalDelivery>,
    observations: CrashObservations,
    state: HandshakeState,
}

impl HandshakeNotifier {
    pub fn new(
        signal: Signal,
        delivery: Arc<dyn SignalDelivery>,
        observations: CrashObservations,
    ) -> Self {
        Self {
            signal,
            delivery,
            observations,
            state: HandshakeState::default(),
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Signal `harness_pid` on every simulation stop from now on. A non-positive pid
    /// means no harness is bound and leaves auto-notify disabled.
    pub fn arm<H>(&mut self, simulator: &mut H, harness_pid: i32) -> Result<()>
    where
        H: HaltNotification + ?Sized,
    {
        if harness_pid <= 0 {
            info!("No harness pid ({harness_pid}), auto-notify disabled");
            return Ok(());
        }

        let signal = self.signal;
        let delivery = self.delivery.clone();
        let observations = self.observations.clone();

        simulator.on_simulation_stopped(Box::new(move |event: &StopEvent| {
            match observations.classify_halt(event.breakpoint) {
                HaltClassification::Crash { breakpoint, reason } => {
                    info!("Stopped at abnormal exit breakpoint {breakpoint}: {reason}")
                }
                HaltClassification::Other => debug!("Simulation stopped: {event:?}"),
            }

            // The stop is already happening, a failed wake-up is reported but cannot
            // be undone
            if let Err(e) = delivery.deliver(harness_pid, signal) {
                warn!("Failed to notify harness {harness_pid} of stop: {e}");
            }
        }))?;

        self.observations.set_harness_pid(harness_pid);
        self.state.armed_pid = harness_pid;

        info!("Armed {signal} to harness {harness_pid} on every stop");

        Ok(())
    }

    /// Tell the harness that the checkpoint exists and the crash breakpoint is armed
    pub fn signal_ready(&mut self, harness_pid: i32) -> Result<()> {
        if harness_pid <= 0 {
            info!("No harness pid ({harness_pid}), not sending ready signal");
            return Ok(());
        }

        self.delivery.deliver(harness_pid, self.signal)?;
        self.state.ready_sent = true;

        info!("Sent ready {} to harness {harness_pid}", self.signal);

        Ok(())
    }
}
