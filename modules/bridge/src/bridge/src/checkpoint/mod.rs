// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

//! Creation and verification of the start-state checkpoint
//!
//! The harness restores checkpoint ordinal 0 at the start of every fuzzing iteration, so
//! the checkpoint saved here has to be the first one ever created in the session. The
//! manager saves it, finds it again in the simulator's checkpoint table, and reports
//! whether it landed in slot 0.

use crate::{configuration::Configuration, simulator::CheckpointControl, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use typed_builder::TypedBuilder;

/// Ordinal the start-state checkpoint is required to have
pub const ORIGIN_ORDINAL: i64 = 0;
/// Ordinal reported when the checkpoint is not in the listing at all
pub const MISSING_ORDINAL: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub ordinal: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointVerification {
    Verified,
    /// The checkpoint is not at ordinal 0, or is missing (ordinal -1)
    OrdinalMismatch { ordinal: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointOutcome {
    pub checkpoint: Checkpoint,
    pub verification: CheckpointVerification,
}

impl CheckpointOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self.verification, CheckpointVerification::Verified)
    }

    /// Treat an ordinal mismatch as fatal
    pub fn into_verified(self) -> Result<Checkpoint> {
        match self.verification {
            CheckpointVerification::Verified => Ok(self.checkpoint),
            CheckpointVerification::OrdinalMismatch { ordinal } => {
                Err(Error::CheckpointOrdinalMismatch {
                    name: self.checkpoint.name,
                    ordinal,
                })
            }
        }
    }
}

/// Parse a checkpoint table with the ordinal in the first column and the name in the
/// second. Blank rows, rows with fewer than two columns and rows whose first column is
/// not an integer (headers, separators) are skipped.
pub fn parse_checkpoint_listing(listing: &str) -> Vec<Checkpoint> {
    listing
        .lines()
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let ordinal = columns.next()?.parse::<i64>().ok()?;
            let name = columns.next()?;

            Some(Checkpoint {
                ordinal,
                name: name.to_string(),
            })
        })
        .collect()
}

/// Find the ordinal of the checkpoint called `name`. If several rows carry the name, the
/// last one wins.
pub fn find_ordinal(listing: &str, name: &str) -> Option<i64> {
    parse_checkpoint_listing(listing)
        .into_iter()
        .rev()
        .find(|c| c.name == name)
        .map(|c| c.ordinal)
}

#[derive(TypedBuilder, Debug, Clone)]
pub struct CheckpointManager {
    #[builder(default = Configuration::DEFAULT_CHECKPOINT_NAME.to_string(), setter(into))]
    name: String,
    #[builder(default = true)]
    enable_in_memory_snapshots: bool,
}

impl CheckpointManager {
    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self::builder()
            .name(configuration.checkpoint_name.clone())
            .enable_in_memory_snapshots(configuration.enable_in_memory_snapshots)
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Save the start-state checkpoint and check that it is at ordinal 0. A mismatch is
    /// logged and reported in the outcome, it does not fail the call.
    pub fn create_and_verify_origin<C>(&self, simulator: &mut C) -> Result<CheckpointOutcome>
    where
        C: CheckpointControl + ?Sized,
    {
        if self.enable_in_memory_snapshots {
            simulator.enable_in_memory_snapshots()?;
        }

        simulator.save_checkpoint(&self.name)?;

        let listing = simulator.list_checkpoints()?;
        let ordinal = find_ordinal(&listing, &self.name).unwrap_or(MISSING_ORDINAL);

        let verification = if ordinal == ORIGIN_ORDINAL {
            info!("Checkpoint {} saved at ordinal {}", self.name, ordinal);
            CheckpointVerification::Verified
        } else {
            error!(
                "Checkpoint {} saved at ordinal {}. Must be {}!",
                self.name, ordinal, ORIGIN_ORDINAL
            );
            CheckpointVerification::OrdinalMismatch { ordinal }
        };

        Ok(CheckpointOutcome {
            checkpoint: Checkpoint {
                ordinal,
                name: self.name.clone(),
            },
            verification,
        })
    }
}
