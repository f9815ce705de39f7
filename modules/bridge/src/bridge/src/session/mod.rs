// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

//! The session context and the setup procedure that brings a session to `Ready`

use crate::{
    checkpoint::{CheckpointManager, CheckpointOutcome, CheckpointVerification},
    configuration::Configuration,
    crash::{Breakpoint, CrashObservations, CrashTrigger},
    driver::ExecutionDriver,
    handoff::{SessionHandoff, SessionHandoffReader},
    notify::{HandshakeNotifier, HandshakeState, SignalDelivery, UnixSignals},
    simulator::Simulator,
    state::{SessionInput, SessionStage, SessionState},
    Result,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Everything setup established for the harness
pub struct SessionReport {
    pub checkpoint: CheckpointOutcome,
    pub crash_breakpoint: Breakpoint,
    pub handoff: SessionHandoff,
    pub handshake: HandshakeState,
}

#[derive(TypedBuilder)]
/// Explicit context for one fuzzing session: the simulator, the crash observation side
/// channel, the signal delivery mechanism and the configuration
pub struct Session<S> {
    simulator: S,
    #[builder(default)]
    configuration: Configuration,
    #[builder(default = Arc::new(UnixSignals) as Arc<dyn SignalDelivery>)]
    signals: Arc<dyn SignalDelivery>,
    #[builder(default)]
    observations: CrashObservations,
    #[builder(default, setter(skip))]
    state: SessionState,
}

impl<S> Session<S> {
    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    pub fn simulator_mut(&mut self) -> &mut S {
        &mut self.simulator
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn observations(&self) -> &CrashObservations {
        &self.observations
    }

    pub fn stage(&self) -> SessionStage {
        self.state.stage()
    }
}

impl<S> Session<S>
where
    S: Simulator,
{
    /// Run every setup step in order. Errors are fatal and stop setup where it is; an
    /// ordinal mismatch is only fatal with `strict_checkpoint_ordinal`.
    pub fn setup(&mut self) -> Result<SessionReport> {
        let configuration = self.configuration.clone();
        let signal = configuration.signal()?;

        ExecutionDriver::from_configuration(&configuration)
            .run_to_start_marker(&mut self.simulator, configuration.start_marker_index)?;
        self.state.consume(SessionInput::MarkerReached)?;

        let checkpoint = CheckpointManager::from_configuration(&configuration)
            .create_and_verify_origin(&mut self.simulator)?;
        self.state.consume(SessionInput::CheckpointSaved)?;

        match checkpoint.verification {
            CheckpointVerification::Verified => {
                self.state.consume(SessionInput::OrdinalVerified)?
            }
            CheckpointVerification::OrdinalMismatch { .. } => {
                self.state.consume(SessionInput::OrdinalMismatch)?;

                if configuration.strict_checkpoint_ordinal {
                    checkpoint.clone().into_verified()?;
                }
            }
        }

        let crash_breakpoint = CrashTrigger::new(self.observations.clone())
            .register_crash_breakpoint(
                &mut self.simulator,
                configuration.crash_address,
                configuration.crash_reason.clone(),
            )?;
        self.state.consume(SessionInput::CrashRegistered)?;

        let handoff = SessionHandoffReader::read(&configuration.handoff_path)?;

        let mut notifier =
            HandshakeNotifier::new(signal, self.signals.clone(), self.observations.clone());

        notifier.arm(&mut self.simulator, handoff.harness_pid)?;
        self.state.consume(SessionInput::NotifyArmed)?;

        notifier.signal_ready(handoff.harness_pid)?;
        self.state.consume(SessionInput::ReadySent)?;

        info!("Session ready for harness {}", handoff.harness_pid);

        Ok(SessionReport {
            checkpoint,
            crash_breakpoint,
            handoff,
            handshake: notifier.state(),
        })
    }
}
