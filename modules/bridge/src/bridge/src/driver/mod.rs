// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

//! Drives the simulation to the target's start marker

use crate::{
    configuration::Configuration,
    simulator::{ExecutionControl, RunOutcome, StartMarker},
    Error, Result,
};
use tracing::{debug, info};

pub struct ExecutionDriver {
    marker_hap: String,
    batch_mode: Option<bool>,
    console_device: Option<String>,
}

impl ExecutionDriver {
    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self {
            marker_hap: configuration.start_marker.clone(),
            batch_mode: configuration.batch_mode,
            console_device: configuration.console_device.clone(),
        }
    }

    /// Run until the start marker fires at `occurrence_index`. The console is detached
    /// first in batch mode so the run cannot block on display output.
    pub fn run_to_start_marker<E>(&self, simulator: &mut E, occurrence_index: i64) -> Result<()>
    where
        E: ExecutionControl + ?Sized,
    {
        let batch_mode = match self.batch_mode {
            Some(batch_mode) => batch_mode,
            None => simulator.batch_mode()?,
        };

        match (batch_mode, &self.console_device) {
            (true, Some(device)) => {
                info!("Batch mode detected. Disconnecting console from {device}");
                simulator.detach_console(device)?;
            }
            (true, None) => debug!("Batch mode detected, no console device configured"),
            (false, _) => debug!("Interactive mode, leaving console attached"),
        }

        let marker = StartMarker {
            hap: self.marker_hap.clone(),
            index: occurrence_index,
        };

        info!("Running until {} index {}", marker.hap, marker.index);

        match simulator.run_until(&marker)? {
            RunOutcome::MarkerReached => {
                info!("Reached start marker");
                Ok(())
            }
            RunOutcome::Stopped { reason } => Err(Error::MarkerNotReached {
                marker: marker.hap,
                index: marker.index,
                reason,
            }),
        }
    }
}
