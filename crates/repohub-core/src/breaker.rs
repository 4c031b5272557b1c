//! Circuit breaker guarding the bulk-read path
//!
//! Explicit three-state machine with synchronized counters. One instance is
//! created per entity kind and injected into its service; breakers are never
//! shared across kinds, so a failing user store does not trip repository
//! reads.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

/// Breaker tuning. Defaults: open after 3 consecutive failures, cool down
/// for 10s before probing, forget stale failures after 60s without one.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures that trip the breaker
    pub failure_threshold: u32,
    /// Time spent Open before a probe is admitted
    pub cooldown: Duration,
    /// Rolling window after which the consecutive-failure count resets
    /// while Closed
    pub reset_interval: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(10),
            reset_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum State {
    /// Requests pass through; failures are counted
    Closed { consecutive_failures: u32, last_failure_at: Option<Instant> },
    /// Requests are short-circuited until the cooldown elapses
    Open { since: Instant },
    /// One probe is in flight; everything else is rejected
    HalfOpen,
}

/// Request rejected because the breaker is open (or a probe is in flight)
#[derive(Debug, Clone, Error)]
#[error("circuit breaker '{name}' is open")]
pub struct BreakerRejected {
    pub name: String,
}

/// Snapshot of the breaker state, for diagnostics and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerSnapshot {
    Closed { consecutive_failures: u32 },
    Open,
    HalfOpen,
}

/// Thread-safe circuit breaker.
///
/// Every admitted call holds a [`BreakerPermit`] and resolves it with
/// exactly one `success` or `failure` report. The single-probe rule in
/// Half-Open is enforced by state, not by blocking: extras fail fast with
/// [`BreakerRejected`]. A probe permit dropped without a verdict (the
/// guarded future was cancelled mid-flight) reopens the breaker so a later
/// caller can probe again instead of leaving Half-Open wedged.
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    state: Mutex<State>,
}

/// Admission token for one guarded call.
///
/// Consume it with [`success`](Self::success) or [`failure`](Self::failure)
/// once the call resolves. Dropping an unresolved probe permit restarts the
/// cooldown from now.
#[must_use]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    is_probe: bool,
    reported: bool,
}

impl BreakerPermit<'_> {
    /// Reports that the guarded call succeeded
    pub fn success(mut self) {
        self.reported = true;
        self.breaker.report_success(self.is_probe);
    }

    /// Reports that the guarded call failed
    pub fn failure(mut self) {
        self.reported = true;
        self.breaker.report_failure(self.is_probe);
    }
}

impl std::fmt::Debug for BreakerPermit<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BreakerPermit")
            .field("breaker", &self.breaker.name)
            .field("is_probe", &self.is_probe)
            .finish()
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if self.reported || !self.is_probe {
            return;
        }
        let mut state = self.breaker.state.lock();
        if matches!(*state, State::HalfOpen) {
            warn!(breaker = %self.breaker.name, "Probe dropped without a verdict, breaker reopened");
            *state = State::Open { since: Instant::now() };
        }
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Mutex::new(State::Closed { consecutive_failures: 0, last_failure_at: None }),
        }
    }

    /// Asks the breaker to admit a call.
    ///
    /// While Open, the first acquire after the cooldown transitions to
    /// Half-Open and its permit is the probe; concurrent extras are
    /// rejected until the probe resolves.
    pub fn try_acquire(&self) -> Result<BreakerPermit<'_>, BreakerRejected> {
        let mut state = self.state.lock();
        match *state {
            State::Closed { consecutive_failures, last_failure_at } => {
                if consecutive_failures > 0 {
                    if let Some(at) = last_failure_at {
                        if at.elapsed() >= self.config.reset_interval {
                            debug!(breaker = %self.name, "Failure count reset after quiet interval");
                            *state = State::Closed {
                                consecutive_failures: 0,
                                last_failure_at: None,
                            };
                        }
                    }
                }
                Ok(BreakerPermit { breaker: self, is_probe: false, reported: false })
            }
            State::Open { since } => {
                if since.elapsed() >= self.config.cooldown {
                    debug!(breaker = %self.name, "Cooldown elapsed, admitting probe");
                    *state = State::HalfOpen;
                    Ok(BreakerPermit { breaker: self, is_probe: true, reported: false })
                } else {
                    Err(BreakerRejected { name: self.name.clone() })
                }
            }
            State::HalfOpen => Err(BreakerRejected { name: self.name.clone() }),
        }
    }

    fn report_success(&self, is_probe: bool) {
        let mut state = self.state.lock();
        match *state {
            State::HalfOpen if is_probe => {
                debug!(breaker = %self.name, "Probe succeeded, breaker closed");
                *state = State::Closed { consecutive_failures: 0, last_failure_at: None };
            }
            State::Closed { .. } => {
                *state = State::Closed { consecutive_failures: 0, last_failure_at: None };
            }
            // A late success from a call admitted before the breaker opened
            // does not close it
            _ => {}
        }
    }

    fn report_failure(&self, is_probe: bool) {
        let mut state = self.state.lock();
        match *state {
            State::Closed { consecutive_failures, .. } => {
                let failures = consecutive_failures + 1;
                if failures >= self.config.failure_threshold {
                    warn!(breaker = %self.name, failures, "Circuit breaker opened");
                    *state = State::Open { since: Instant::now() };
                } else {
                    debug!(breaker = %self.name, failures, "Guarded call failed");
                    *state = State::Closed {
                        consecutive_failures: failures,
                        last_failure_at: Some(Instant::now()),
                    };
                }
            }
            State::HalfOpen if is_probe => {
                warn!(breaker = %self.name, "Probe failed, breaker reopened");
                *state = State::Open { since: Instant::now() };
            }
            _ => {}
        }
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        match *self.state.lock() {
            State::Closed { consecutive_failures, .. } => {
                BreakerSnapshot::Closed { consecutive_failures }
            }
            State::Open { .. } => BreakerSnapshot::Open,
            State::HalfOpen => BreakerSnapshot::HalfOpen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> BreakerConfig {
        BreakerConfig {
            failure_threshold: 3,
            cooldown: Duration::from_millis(50),
            reset_interval: Duration::from_millis(200),
        }
    }

    fn trip(breaker: &CircuitBreaker) {
        for _ in 0..3 {
            breaker.try_acquire().unwrap().failure();
        }
    }

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new("test", fast_config());

        breaker.try_acquire().unwrap().failure();
        breaker.try_acquire().unwrap().failure();
        assert_eq!(breaker.snapshot(), BreakerSnapshot::Closed { consecutive_failures: 2 });

        breaker.try_acquire().unwrap().failure();
        assert_eq!(breaker.snapshot(), BreakerSnapshot::Open);
    }

    #[test]
    fn rejects_while_open() {
        let breaker = CircuitBreaker::new("test", fast_config());
        trip(&breaker);

        let rejected = breaker.try_acquire().unwrap_err();
        assert!(rejected.to_string().contains("test"));
    }

    #[test]
    fn admits_single_probe_after_cooldown() {
        let breaker = CircuitBreaker::new("test", fast_config());
        trip(&breaker);

        std::thread::sleep(Duration::from_millis(60));

        // First caller becomes the probe, extras are rejected
        let probe = breaker.try_acquire().unwrap();
        assert_eq!(breaker.snapshot(), BreakerSnapshot::HalfOpen);
        assert!(breaker.try_acquire().is_err());
        assert!(breaker.try_acquire().is_err());
        probe.success();
    }

    #[test]
    fn probe_success_closes() {
        let breaker = CircuitBreaker::new("test", fast_config());
        trip(&breaker);

        std::thread::sleep(Duration::from_millis(60));
        breaker.try_acquire().unwrap().success();

        assert_eq!(breaker.snapshot(), BreakerSnapshot::Closed { consecutive_failures: 0 });
        breaker.try_acquire().unwrap().success();
    }

    #[test]
    fn probe_failure_reopens() {
        let breaker = CircuitBreaker::new("test", fast_config());
        trip(&breaker);

        std::thread::sleep(Duration::from_millis(60));
        breaker.try_acquire().unwrap().failure();

        assert_eq!(breaker.snapshot(), BreakerSnapshot::Open);
        assert!(breaker.try_acquire().is_err());
    }

    #[test]
    fn dropped_probe_reopens_and_readmits_a_later_probe() {
        let breaker = CircuitBreaker::new("test", fast_config());
        trip(&breaker);

        std::thread::sleep(Duration::from_millis(60));
        let probe = breaker.try_acquire().unwrap();
        assert_eq!(breaker.snapshot(), BreakerSnapshot::HalfOpen);

        // The guarded future was cancelled before a verdict
        drop(probe);
        assert_eq!(breaker.snapshot(), BreakerSnapshot::Open);

        // The cooldown restarts from the drop, then a new probe can close
        assert!(breaker.try_acquire().is_err());
        std::thread::sleep(Duration::from_millis(60));
        breaker.try_acquire().unwrap().success();
        assert_eq!(breaker.snapshot(), BreakerSnapshot::Closed { consecutive_failures: 0 });
    }

    #[test]
    fn dropped_closed_permit_counts_as_nothing() {
        let breaker = CircuitBreaker::new("test", fast_config());

        for _ in 0..5 {
            drop(breaker.try_acquire().unwrap());
        }
        assert_eq!(breaker.snapshot(), BreakerSnapshot::Closed { consecutive_failures: 0 });
    }

    #[test]
    fn late_report_from_pre_open_permit_does_not_close() {
        let breaker = CircuitBreaker::new("test", fast_config());

        let early = breaker.try_acquire().unwrap();
        trip(&breaker);
        assert_eq!(breaker.snapshot(), BreakerSnapshot::Open);

        early.success();
        assert_eq!(breaker.snapshot(), BreakerSnapshot::Open);
    }

    #[test]
    fn success_resets_failure_count_while_closed() {
        let breaker = CircuitBreaker::new("test", fast_config());

        breaker.try_acquire().unwrap().failure();
        breaker.try_acquire().unwrap().failure();

        breaker.try_acquire().unwrap().success();
        assert_eq!(breaker.snapshot(), BreakerSnapshot::Closed { consecutive_failures: 0 });
    }

    #[test]
    fn stale_failures_reset_after_quiet_interval() {
        let breaker = CircuitBreaker::new("test", fast_config());

        breaker.try_acquire().unwrap().failure();
        breaker.try_acquire().unwrap().failure();

        std::thread::sleep(Duration::from_millis(220));

        let permit = breaker.try_acquire().unwrap();
        assert_eq!(breaker.snapshot(), BreakerSnapshot::Closed { consecutive_failures: 0 });

        // A single new failure must not open the breaker
        permit.failure();
        assert_eq!(breaker.snapshot(), BreakerSnapshot::Closed { consecutive_failures: 1 });
    }
}
