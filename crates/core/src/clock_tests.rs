// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn manual_clock_moves_only_when_told() {
    let clock = ManualClock::new(1000);
    assert_eq!(clock.now_ms(), 1000);

    clock.advance(250);
    assert_eq!(clock.now_ms(), 1250);

    clock.set(10);
    assert_eq!(clock.now_ms(), 10);
}

#[test]
fn system_clock_is_after_2020() {
    assert!(SystemClock.now_ms() > 1_577_836_800_000);
}

#[test]
fn clock_through_arc_and_ref() {
    let clock = std::sync::Arc::new(ManualClock::new(42));
    assert_eq!(clock.now_ms(), 42);
    assert_eq!((&*clock).now_ms(), 42);
}
