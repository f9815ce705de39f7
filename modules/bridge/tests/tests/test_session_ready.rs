// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

//! Test that a full setup leaves the session ready and the harness signaled

use anyhow::Result;
use indoc::indoc;
use nix::sys::signal::Signal;
use std::sync::Arc;
use tests::{handoff_file, FakeSimulator, RecordingSignals, SimulatorCall};
use tsffs_bridge::{
    checkpoint::CheckpointVerification,
    configuration::Configuration,
    notify::SignalDelivery,
    simulator::{BreakpointId, StartMarker},
    state::SessionStage,
    Session,
};

#[test]
fn test_session_ready() -> Result<()> {
    let handoff = handoff_file("if_pid:4242\n")?;
    let signals = RecordingSignals::new();

    let mut session = Session::builder()
        .simulator(FakeSimulator::builder().build())
        .configuration(
            Configuration::builder()
                .handoff_path(handoff.path())
                .build(),
        )
        .signals(signals.clone() as Arc<dyn SignalDelivery>)
        .build();

    let report = session.setup()?;

    assert_eq!(session.stage(), SessionStage::Ready);
    assert_eq!(report.checkpoint.checkpoint.ordinal, 0);
    assert_eq!(report.checkpoint.checkpoint.name, "origin");
    assert_eq!(
        report.checkpoint.verification,
        CheckpointVerification::Verified
    );
    assert_eq!(report.crash_breakpoint.address, 0xdef6249c);
    assert_eq!(report.handoff.harness_pid, 4242);
    assert_eq!(report.handshake.armed_pid, 4242);
    assert!(report.handshake.ready_sent);

    // Exactly one signal at setup completion
    assert_eq!(signals.delivered(), vec![(4242, Signal::SIGUSR2)]);

    assert_eq!(
        session.simulator().calls(),
        &[
            SimulatorCall::RunUntil(StartMarker {
                hap: "Core_Magic_Instruction".to_string(),
                index: 42,
            }),
            SimulatorCall::EnableInMemorySnapshots,
            SimulatorCall::SaveCheckpoint("origin".to_string()),
            SimulatorCall::ListCheckpoints,
            SimulatorCall::AddBreakpoint(0xdef6249c),
            SimulatorCall::OnSimulationStopped,
        ]
    );

    assert_eq!(
        session.observations().reason(report.crash_breakpoint.id).as_deref(),
        Some("Application crash (UD)")
    );
    assert_eq!(session.observations().harness_pid(), 4242);

    // Every later stop wakes the harness again
    session.simulator_mut().halt(Some(report.crash_breakpoint.id));
    session.simulator_mut().halt(Some(BreakpointId::new(99)));
    session.simulator_mut().halt(None);

    assert_eq!(signals.delivered().len(), 4);
    assert!(signals
        .delivered()
        .iter()
        .all(|d| *d == (4242, Signal::SIGUSR2)));

    Ok(())
}

#[test]
fn test_session_custom_configuration() -> Result<()> {
    let handoff = handoff_file(indoc! {r#"
        if_pid: 77
        image:uefi
        if_pid: 78
    "#})?;
    let signals = RecordingSignals::new();

    let mut session = Session::builder()
        .simulator(FakeSimulator::builder().next_breakpoint(7).build())
        .configuration(
            Configuration::builder()
                .handoff_path(handoff.path())
                .start_marker_index(3)
                .checkpoint_name("start")
                .enable_in_memory_snapshots(false)
                .crash_address(0x4000)
                .crash_reason("Application crash (GP)")
                .notify_signal("SIGUSR1")
                .build(),
        )
        .signals(signals.clone() as Arc<dyn SignalDelivery>)
        .build();

    let report = session.setup()?;

    assert!(report.checkpoint.is_verified());
    assert_eq!(report.checkpoint.checkpoint.name, "start");
    assert_eq!(report.crash_breakpoint.id, BreakpointId::new(7));
    assert_eq!(report.handoff.harness_pid, 78);
    assert_eq!(signals.delivered(), vec![(78, Signal::SIGUSR1)]);
    assert!(!session
        .simulator()
        .calls()
        .contains(&SimulatorCall::EnableInMemorySnapshots));
    assert!(session.simulator().calls().contains(&SimulatorCall::RunUntil(
        StartMarker {
            hap: "Core_Magic_Instruction".to_string(),
            index: 3,
        }
    )));

    Ok(())
}
