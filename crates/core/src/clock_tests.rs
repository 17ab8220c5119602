// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_moves_forward() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    assert!(clock.now() > t1);
}

#[test]
fn deadline_falls_after_now() {
    let clock = FakeClock::new();
    let departure = clock.deadline(Duration::from_secs(8));
    assert_eq!(departure, clock.now() + Duration::from_secs(8));
    assert!(!clock.expired(departure));
}

#[test]
fn deadline_expires_once_time_is_cranked_past_it() {
    let clock = FakeClock::new();
    let departure = clock.deadline(Duration::from_secs(8));
    clock.advance(Duration::from_secs(7));
    assert!(!clock.expired(departure));
    clock.advance(Duration::from_secs(1));
    assert!(clock.expired(departure));
}

#[test]
fn until_counts_down_to_zero() {
    let clock = FakeClock::new();
    let departure = clock.deadline(Duration::from_secs(5));
    clock.advance(Duration::from_secs(2));
    assert_eq!(clock.until(departure), Duration::from_secs(3));
    clock.advance(Duration::from_secs(10));
    assert_eq!(clock.until(departure), Duration::ZERO);
}

#[test]
fn clones_share_the_crank() {
    let clock = FakeClock::new();
    let other = clock.clone();
    let deadline = clock.deadline(Duration::from_secs(30));
    other.advance(Duration::from_secs(30));
    assert!(clock.expired(deadline));
}

#[test]
fn epoch_advances_with_the_crank() {
    let clock = FakeClock::new();
    let e1 = clock.epoch_ms();
    clock.advance(Duration::from_millis(250));
    assert_eq!(clock.epoch_ms(), e1 + 250);
}
