// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn fixed_clock_advances() {
    let clock = FixedClock::new(1_000);
    assert_eq!(clock.epoch_ms(), 1_000);
    clock.advance_ms(500);
    assert_eq!(clock.epoch_ms(), 1_500);
}

#[test]
fn fixed_clock_formats_iso8601() {
    let clock = FixedClock::new(0);
    assert_eq!(clock.now_iso8601(), "1970-01-01T00:00:00+00:00");
}

#[test]
fn system_clock_epoch_ms_is_recent() {
    let clock = SystemClock;
    assert!(clock.epoch_ms() > 1_700_000_000_000);
}
