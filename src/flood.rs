//! Outbound flood protection.
//!
//! A token bucket paces message-bearing commands (PRIVMSG/NOTICE) so a
//! chatty host cannot trip server-side flood limits. Protocol plumbing
//! (PING/PONG, CAP, registration) bypasses the bucket.

use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

const NZ_1: NonZeroU32 = match NonZeroU32::new(1) {
    Some(v) => v,
    None => panic!("1 is non-zero"),
};

/// Token-bucket pacing for the writer task.
pub struct FloodControl {
    limiter: DefaultDirectRateLimiter,
}

impl FloodControl {
    /// A bucket holding `burst` lines, refilling at `rate` lines per
    /// second. Zero values are clamped to one.
    pub fn new(burst: u32, rate: u32) -> Self {
        let rate = NonZeroU32::new(rate).unwrap_or(NZ_1);
        let burst = NonZeroU32::new(burst).unwrap_or(NZ_1);
        FloodControl {
            limiter: RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
        }
    }

    /// Whether a command is subject to the bucket.
    pub fn is_throttled_command(command: &str) -> bool {
        command.eq_ignore_ascii_case("PRIVMSG") || command.eq_ignore_ascii_case("NOTICE")
    }

    /// Wait until a token is available.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Take a token without waiting, if one is available.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for FloodControl {
    fn default() -> Self {
        // Burst of 4 lines, refilling at 2 lines/second
        FloodControl::new(4, 2)
    }
}
