// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

//! Session data the harness hands to the bridge through a small `key:value` file
//!
//! The harness writes the file before it starts the simulator. The only key the bridge
//! understands is `if_pid`, the process id the ready and stop signals are delivered to:
//!
//! ```text
//! if_pid: 4242
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fs::read_to_string, path::Path, str::FromStr};
use tracing::{debug, trace};

/// Key naming the harness process id
pub const HARNESS_PID_KEY: &str = "if_pid";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandoff {
    /// Process id of the harness, or 0 if the harness did not provide one
    pub harness_pid: i32,
}

impl SessionHandoff {
    /// Whether a harness process is bound to this session
    pub fn has_harness(&self) -> bool {
        self.harness_pid > 0
    }
}

impl FromStr for SessionHandoff {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut handoff = Self::default();

        for (number, line) in s.lines().enumerate() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };

            if key.trim() != HARNESS_PID_KEY {
                trace!("Ignoring hand-off key {:?}", key.trim());
                continue;
            }

            let value = value.trim();

            // Later entries override earlier ones
            handoff.harness_pid = value.parse().map_err(|source| Error::HandoffParse {
                line: number + 1,
                value: value.to_string(),
                source,
            })?;
        }

        Ok(handoff)
    }
}

pub struct SessionHandoffReader;

impl SessionHandoffReader {
    /// Read the hand-off file at `path`. The file is left untouched.
    pub fn read<P>(path: P) -> Result<SessionHandoff>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();

        let contents = read_to_string(path).map_err(|source| Error::HandoffIo {
            path: path.to_path_buf(),
            source,
        })?;

        let handoff = contents.parse::<SessionHandoff>()?;

        debug!("Read hand-off {path:?}: {handoff:?}");

        Ok(handoff)
    }
}
