// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::{
    fs::read_to_string,
    io::{stderr, stdout, Write},
};
use tracing::{info, trace};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, registry};
use tsffs_bridge::{
    args::{Action, Args},
    checkpoint::find_ordinal,
    configuration::Configuration,
    handoff::SessionHandoffReader,
    simulator::{CommandSimulator, TelnetFrontend},
    Session,
};

pub fn main() -> Result<()> {
    let args = Args::parse();

    registry()
        .with(
            fmt::layer()
                .with_writer(stderr)
                .with_filter(LevelFilter::from_level(args.log_level)),
        )
        .init();

    trace!("Running with args: {:?}", args);

    let mut configuration = match &args.config {
        Some(path) => Configuration::load(path)?,
        None => Configuration::default(),
    };

    match args.action {
        Action::Setup(setup) => {
            setup.apply(&mut configuration);

            let frontend = TelnetFrontend::connect(setup.connect.as_str(), setup.prompt.as_str())
                .with_context(|| format!("Failed to connect to frontend at {}", setup.connect))?;

            let mut session = Session::builder()
                .simulator(CommandSimulator::new(frontend))
                .configuration(configuration)
                .build();

            let report = session.setup().context("Session setup failed")?;

            info!("Setup complete at {:?}", session.stage());

            print!("{}", serde_yaml::to_string(&report)?);
            stdout().flush()?;

            if report.handshake.armed_pid > 0 {
                // Stop callbacks live in this process, so stay attached until SIMICS exits
                info!("Notifying harness {} of stops", report.handshake.armed_pid);
                let stops = session
                    .simulator_mut()
                    .watch_stops()
                    .context("Lost the simulator while watching for stops")?;
                info!("Simulator exited after {stops} stops");
            }
        }
        Action::Handoff { path } => {
            let handoff = SessionHandoffReader::read(&path)?;
            println!("{}", handoff.harness_pid);
        }
        Action::Listing { path, name } => {
            let listing = read_to_string(&path)
                .with_context(|| format!("Failed to read listing {}", path.display()))?;
            let name = name.unwrap_or(configuration.checkpoint_name);

            match find_ordinal(&listing, &name) {
                Some(ordinal) => println!("{ordinal}"),
                None => bail!("No checkpoint named {name} in {}", path.display()),
            }
        }
    }

    Ok(())
}
