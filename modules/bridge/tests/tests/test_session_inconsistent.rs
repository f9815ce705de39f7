// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

//! Test that a checkpoint outside slot 0 is reported without stopping setup, unless the
//! ordinal check is strict

use anyhow::Result;
use nix::sys::signal::Signal;
use std::sync::Arc;
use tests::{handoff_file, FakeSimulator, RecordingSignals};
use tsffs_bridge::{
    checkpoint::CheckpointVerification, configuration::Configuration, notify::SignalDelivery,
    state::SessionStage, Error, Session,
};

#[test]
fn test_session_inconsistent_continues() -> Result<()> {
    let handoff = handoff_file("if_pid:4242\n")?;
    let signals = RecordingSignals::new();

    let mut session = Session::builder()
        .simulator(
            FakeSimulator::builder()
                .checkpoints(vec!["boot".to_string()])
                .build(),
        )
        .configuration(
            Configuration::builder()
                .handoff_path(handoff.path())
                .build(),
        )
        .signals(signals.clone() as Arc<dyn SignalDelivery>)
        .build();

    let report = session.setup()?;

    assert_eq!(
        report.checkpoint.verification,
        CheckpointVerification::OrdinalMismatch { ordinal: 1 }
    );
    assert!(!report.checkpoint.is_verified());
    assert_eq!(session.stage(), SessionStage::Ready);
    assert_eq!(signals.delivered(), vec![(4242, Signal::SIGUSR2)]);

    Ok(())
}

#[test]
fn test_session_inconsistent_strict() -> Result<()> {
    let handoff = handoff_file("if_pid:4242\n")?;
    let signals = RecordingSignals::new();

    let mut session = Session::builder()
        .simulator(
            FakeSimulator::builder()
                .checkpoints(vec!["boot".to_string()])
                .build(),
        )
        .configuration(
            Configuration::builder()
                .handoff_path(handoff.path())
                .strict_checkpoint_ordinal(true)
                .build(),
        )
        .signals(signals.clone() as Arc<dyn SignalDelivery>)
        .build();

    assert!(matches!(
        session.setup(),
        Err(Error::CheckpointOrdinalMismatch { ordinal: 1, .. })
    ));
    assert_eq!(session.stage(), SessionStage::Inconsistent);
    assert!(session.observations().abnormal_exits().is_empty());
    assert!(signals.delivered().is_empty());

    Ok(())
}
