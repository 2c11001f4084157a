// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn the_first_probe_is_always_due() {
    let gate = HeartbeatGate::new(Duration::from_secs(300));
    assert!(gate.is_due(Instant::now()));
}

#[test]
fn a_probe_inside_the_window_is_suppressed() {
    let gate = HeartbeatGate::new(Duration::from_secs(300));
    let t0 = Instant::now();
    gate.record_probe(t0);
    assert!(!gate.is_due(t0 + Duration::from_secs(60)));
}

#[test]
fn a_probe_past_the_window_is_due_again() {
    let gate = HeartbeatGate::new(Duration::from_secs(300));
    let t0 = Instant::now();
    gate.record_probe(t0);
    assert!(gate.is_due(t0 + Duration::from_secs(301)));
}

#[test]
fn a_failed_probe_does_not_reset_the_window() {
    let gate = HeartbeatGate::new(Duration::from_secs(300));
    let t0 = Instant::now();
    gate.record_probe(t0);
    // Caller observed is_due but the probe itself failed and never called
    // record_probe again; the window should still be measured from t0.
    assert!(!gate.is_due(t0 + Duration::from_secs(100)));
}
