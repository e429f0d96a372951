// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use embedded_hal::blocking::delay::DelayMs;

/// How many times a coprocessor register is checked before giving up.
pub(crate) const POLL_ATTEMPTS: usize = 100;

/// How long to wait between checks, in milliseconds.
pub(crate) const POLL_INTERVAL_MS: u16 = 10;

/// Repeatedly evaluate `condition` until it returns `true`, sleeping `interval_ms` after each
/// failed check.
///
/// Returns `Ok(false)` once `attempts` checks have failed. Errors from `condition` end the polling
/// immediately.
pub(crate) fn poll<D, E, F>(
    delay: &mut D,
    attempts: usize,
    interval_ms: u16,
    mut condition: F,
) -> Result<bool, E>
where
    D: DelayMs<u16>,
    F: FnMut() -> Result<bool, E>,
{
    for _ in 0..attempts {
        if condition()? {
            return Ok(true);
        }
        delay.delay_ms(interval_ms);
    }
    Ok(false)
}
