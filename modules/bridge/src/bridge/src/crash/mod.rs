// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

//! Crash breakpoints and the observations shared with the halt classifier
//!
//! Each abnormal exit breakpoint is stored with the reason reported when the simulation
//! stops on it. The same side channel records the harness pid bound to the session, so
//! a stop can be attributed to the harness that will be woken up for it.

use crate::{
    simulator::{BreakpointControl, BreakpointId},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakpointRole {
    Start,
    Crash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub id: BreakpointId,
    pub address: u64,
    pub role: BreakpointRole,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// What a simulation stop means to the crash observer
pub enum HaltClassification {
    Crash {
        breakpoint: BreakpointId,
        reason: String,
    },
    Other,
}

#[derive(Debug, Default)]
struct Observations {
    abnormal_exits: BTreeMap<BreakpointId, String>,
    harness_pid: i32,
}

#[derive(Debug, Clone, Default)]
/// Shared handle to the crash observation side channel. Clones refer to the same
/// observations.
pub struct CrashObservations {
    inner: Arc<Mutex<Observations>>,
}

impl CrashObservations {
    fn lock(&self) -> MutexGuard<'_, Observations> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Associate `reason` with breakpoint `id`. A reason cannot be replaced once set.
    pub fn add_abnormal_exit<S>(&self, id: BreakpointId, reason: S) -> Result<()>
    where
        S: Into<String>,
    {
        let mut observations = self.lock();

        if let Some(existing) = observations.abnormal_exits.get(&id) {
            return Err(Error::DuplicateReason {
                id,
                reason: existing.clone(),
            });
        }

        observations.abnormal_exits.insert(id, reason.into());

        Ok(())
    }

    pub fn reason(&self, id: BreakpointId) -> Option<String> {
        self.lock().abnormal_exits.get(&id).cloned()
    }

    pub fn abnormal_exits(&self) -> Vec<(BreakpointId, String)> {
        self.lock()
            .abnormal_exits
            .iter()
            .map(|(id, reason)| (*id, reason.clone()))
            .collect()
    }

    pub fn set_harness_pid(&self, pid: i32) {
        self.lock().harness_pid = pid;
    }

    /// The harness pid recorded for the session, 0 if none
    pub fn harness_pid(&self) -> i32 {
        self.lock().harness_pid
    }

    /// Classify a stop at `breakpoint`
    pub fn classify_halt(&self, breakpoint: Option<BreakpointId>) -> HaltClassification {
        breakpoint
            .and_then(|id| self.reason(id).map(|reason| (id, reason)))
            .map_or(HaltClassification::Other, |(breakpoint, reason)| {
                HaltClassification::Crash { breakpoint, reason }
            })
    }
}

pub struct CrashTrigger {
    observations: CrashObservations,
}

impl CrashTrigger {
    pub fn new(observations: CrashObservations) -> Self {
        Self { observations }
    }

    /// Break at the fault entry point `address` and record `reason` for it. The address
    /// is not checked for reachability.
    pub fn register_crash_breakpoint<B, S>(
        &self,
        simulator: &mut B,
        address: u64,
        reason: S,
    ) -> Result<Breakpoint>
    where
        B: BreakpointControl + ?Sized,
        S: Into<String>,
    {
        let reason = reason.into();
        let id = simulator.add_breakpoint(address)?;

        self.observations.add_abnormal_exit(id, reason.clone())?;

        info!("Registered abnormal exit breakpoint {id} at {address:#x}: {reason}");

        Ok(Breakpoint {
            id,
            address,
            role: BreakpointRole::Crash,
            reason: Some(reason),
        })
    }
}
