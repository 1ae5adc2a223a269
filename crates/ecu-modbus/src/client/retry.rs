// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Retry budget and reconnect pause for register reads.
//!
//! A read gets `max_attempts` tries. An attempt that finds the transport
//! disconnected reconnects, pauses for [`RetryStrategy::delay`] and counts as
//! used; the default pause is a fixed 100 ms.

use std::time::Duration;

use rand::Rng;

/// How many times a read is tried and how long to pause after a reconnect.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Tries per read, never below 1.
    pub max_attempts: u32,
    /// Pause after a reconnect.
    pub strategy: RetryStrategy,
}

impl RetryConfig {
    /// `max_attempts` tries with the default 100 ms pause.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            strategy: RetryStrategy::default(),
        }
    }

    /// One try, no pause.
    pub fn no_retry() -> Self {
        Self::new(1).with_strategy(RetryStrategy::Immediate)
    }

    /// Replaces the pause strategy.
    pub fn with_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Pause taken after reconnecting, as a function of the attempt number.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Go again straight away.
    Immediate,
    /// Same pause every time.
    Fixed(Duration),
    /// Doubling pause, capped at `max`, optionally spread by `jitter`.
    Exponential(ExponentialBackoff),
}

impl RetryStrategy {
    /// Pause before attempt `attempt + 1` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Immediate => Duration::ZERO,
            Self::Fixed(pause) => *pause,
            Self::Exponential(backoff) => backoff.delay(attempt),
        }
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::Fixed(Duration::from_millis(100))
    }
}

/// `initial * 2^attempt`, capped at `max`.
///
/// With a non-zero `jitter` the pause is moved by up to that fraction in
/// either direction, so that several clients on one RS485 line do not
/// retry in lockstep.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    /// Pause after the first reconnect.
    pub initial: Duration,
    /// Upper bound before jitter.
    pub max: Duration,
    /// Fraction in `0.0..=1.0`.
    pub jitter: f64,
}

impl ExponentialBackoff {
    /// Backoff without jitter.
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            jitter: 0.0,
        }
    }

    /// Sets the jitter fraction, clamped to `0.0..=1.0`.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    fn delay(&self, attempt: u32) -> Duration {
        let doubled = self
            .initial
            .checked_mul(2u32.saturating_pow(attempt))
            .unwrap_or(self.max);
        let capped = doubled.min(self.max);

        if self.jitter == 0.0 {
            return capped;
        }
        let spread = capped.as_secs_f64() * self.jitter;
        let offset = rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_secs_f64((capped.as_secs_f64() + offset).max(0.0))
    }
}
