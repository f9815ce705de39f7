// Copyright (C) 2023 Intel Corporation
// SPDX-License-Identifier: Apache-2.0

//! Test that ready and stop notifications reach a real process as SIGUSR2

use anyhow::Result;
use nix::{sys::signal::Signal, unistd::getpid};
use signal_hook::{consts::SIGUSR2, iterator::Signals};
use std::{
    sync::Arc,
    thread::sleep,
    time::{Duration, Instant},
};
use tests::FakeSimulator;
use tsffs_bridge::{
    crash::CrashObservations,
    notify::{HandshakeNotifier, SignalDelivery, UnixSignals},
    Error,
};

fn wait_for(signals: &mut Signals, count: usize) -> usize {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut received = 0;

    while received < count && Instant::now() < deadline {
        received += signals.pending().filter(|s| *s == SIGUSR2).count();
        sleep(Duration::from_millis(10));
    }

    received
}

#[test]
fn test_unix_signal() -> Result<()> {
    let mut signals = Signals::new([SIGUSR2])?;
    let pid = getpid().as_raw();

    let mut simulator = FakeSimulator::builder().build();
    let mut notifier = HandshakeNotifier::new(
        Signal::SIGUSR2,
        Arc::new(UnixSignals) as Arc<dyn SignalDelivery>,
        CrashObservations::default(),
    );

    notifier.arm(&mut simulator, pid)?;
    notifier.signal_ready(pid)?;

    assert_eq!(wait_for(&mut signals, 1), 1);

    simulator.halt(None);

    assert_eq!(wait_for(&mut signals, 1), 1);

    Ok(())
}

#[test]
fn test_unix_signal_no_such_process() {
    // Pids are capped well below i32::MAX on Linux
    let result = UnixSignals.deliver(i32::MAX, Signal::SIGUSR2);

    assert!(matches!(result, Err(Error::Signal { .. })));
}
