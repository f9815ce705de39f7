// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

//! Implements the state machine for a session setup. Setup is strictly linear:
//!
//! The session starts `Booting`. Once the start marker fires it is `AtStartMarker`, and
//! saving the checkpoint moves it to `CheckpointCreated`. Verification then branches to
//! `Verified` or `Inconsistent`, but both continue to `CrashArmed` once the crash
//! breakpoint is registered. Arming auto-notify moves the session to `HandshakeArmed`,
//! and sending the ready signal to `Ready`, where it stays.

use crate::{Error, Result};
use rust_fsm::*;
use tracing::{error, info};

state_machine! {
    derive(Debug, Clone, Copy, PartialEq, Eq)
    pub BridgeSession(Booting)
    Booting(MarkerReached) => AtStartMarker,
    AtStartMarker(CheckpointSaved) => CheckpointCreated,
    CheckpointCreated => {
        OrdinalVerified => Verified,
        OrdinalMismatch => Inconsistent,
    },
    Verified(CrashRegistered) => CrashArmed,
    Inconsistent(CrashRegistered) => CrashArmed,
    CrashArmed(NotifyArmed) => HandshakeArmed,
    HandshakeArmed(ReadySent) => Ready
}

pub use BridgeSessionInput as SessionInput;
pub use BridgeSessionState as SessionStage;

pub struct SessionState {
    machine: StateMachine<BridgeSession>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            machine: StateMachine::new(),
        }
    }

    pub fn stage(&self) -> SessionStage {
        *self.machine.state()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.stage(), SessionStage::Ready)
    }

    /// Advance the machine. Consuming an input the current state has no transition for
    /// means setup steps ran out of order.
    pub fn consume(&mut self, input: SessionInput) -> Result<()> {
        let pre_state = self.stage();

        match self.machine.consume(&input) {
            Ok(_) => {
                info!(
                    "Consumed {:?}: Transitioned from {:?} -> {:?}",
                    input,
                    pre_state,
                    self.stage()
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    "Tried to consume {:?}: Failed to transition from {:?}: {}",
                    input, pre_state, e
                );
                Err(Error::Transition {
                    state: format!("{pre_state:?}"),
                    input: format!("{input:?}"),
                })
            }
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
