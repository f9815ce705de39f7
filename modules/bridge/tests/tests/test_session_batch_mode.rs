// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

//! Test that the console is detached before running in batch mode

use anyhow::Result;
use std::sync::Arc;
use tests::{handoff_file, FakeSimulator, RecordingSignals, SimulatorCall};
use tsffs_bridge::{configuration::Configuration, notify::SignalDelivery, Session};

#[test]
fn test_batch_mode_detaches_console() -> Result<()> {
    let handoff = handoff_file("if_pid:4242\n")?;

    let mut session = Session::builder()
        .simulator(FakeSimulator::builder().batch_mode(true).build())
        .configuration(
            Configuration::builder()
                .handoff_path(handoff.path())
                .build(),
        )
        .signals(RecordingSignals::new() as Arc<dyn SignalDelivery>)
        .build();

    session.setup()?;

    let calls = session.simulator().calls();

    assert_eq!(
        calls.first(),
        Some(&SimulatorCall::DetachConsole("board.mb.gpu.vga".to_string()))
    );
    assert!(matches!(calls.get(1), Some(SimulatorCall::RunUntil(_))));

    Ok(())
}

#[test]
fn test_interactive_keeps_console() -> Result<()> {
    let handoff = handoff_file("if_pid:4242\n")?;

    let mut session = Session::builder()
        .simulator(FakeSimulator::builder().build())
        .configuration(
            Configuration::builder()
                .handoff_path(handoff.path())
                .build(),
        )
        .signals(RecordingSignals::new() as Arc<dyn SignalDelivery>)
        .build();

    session.setup()?;

    assert!(!session
        .simulator()
        .calls()
        .iter()
        .any(|c| matches!(c, SimulatorCall::DetachConsole(_))));

    Ok(())
}

#[test]
fn test_batch_mode_override() -> Result<()> {
    let handoff = handoff_file("if_pid:4242\n")?;

    let mut session = Session::builder()
        .simulator(FakeSimulator::builder().batch_mode(true).build())
        .configuration(
            Configuration::builder()
                .handoff_path(handoff.path())
                .batch_mode(false)
                .build(),
        )
        .signals(RecordingSignals::new() as Arc<dyn SignalDelivery>)
        .build();

    session.setup()?;

    assert!(!session
        .simulator()
        .calls()
        .iter()
        .any(|c| matches!(c, SimulatorCall::DetachConsole(_))));

    Ok(())
}

#[test]
fn test_batch_mode_without_console_device() -> Result<()> {
    let handoff = handoff_file("if_pid:4242\n")?;

    let mut session = Session::builder()
        .simulator(FakeSimulator::builder().batch_mode(true).build())
        .configuration(
            Configuration::builder()
                .handoff_path(handoff.path())
                .console_device(None)
                .build(),
        )
        .signals(RecordingSignals::new() as Arc<dyn SignalDelivery>)
        .build();

    session.setup()?;

    assert!(matches!(
        session.simulator().calls().first(),
        Some(SimulatorCall::RunUntil(_))
    ));

    Ok(())
}
