use std::time::Duration;

use tracing::debug;

use mqprims_err::{Error, Payload, RETRIES_EXHAUSTED};
use mqprims_wire::WireError;

use crate::convert::wire_to_error;

/// Retry budget for one reliable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Non-blocking attempts before falling back to one blocking attempt.
    pub retries_max: usize,
    /// Sleep between non-blocking attempts. Blocks the calling thread.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Build a policy from a retry count and a delay in nanoseconds.
    pub const fn new(retries_max: usize, delay_ns: u64) -> Self {
        Self {
            retries_max,
            delay: Duration::from_nanos(delay_ns),
        }
    }

    /// No retries: a single blocking attempt, indistinguishable from a
    /// direct synchronous call.
    pub const fn blocking() -> Self {
        Self::new(0, 0)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // 8 probes a millisecond apart before degrading to blocking.
        Self::new(8, 1_000_000)
    }
}

/// States of the retry machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Probe the transport without blocking.
    AttemptNonblocking,
    /// Wait out the retry delay.
    Sleep,
    /// The budget is spent; one fully blocking attempt.
    AttemptBlocking,
    /// The operation finished, successfully or not.
    Done,
}

/// Events that drive the retry machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryEvent {
    /// The attempt completed.
    Succeeded,
    /// The attempt could not complete without suspending the caller.
    WouldBlock,
    /// The attempt failed with a real transport error.
    Failed,
    /// The retry delay elapsed.
    Slept,
}

/// The transition function of the retry machine. Pure: drive it with any
/// event sequence to test a schedule without touching a transport.
pub fn next_state(
    state: RetryState,
    event: RetryEvent,
    retries: usize,
    retries_max: usize,
) -> RetryState {
    match (state, event) {
        (RetryState::AttemptNonblocking, RetryEvent::WouldBlock) if retries < retries_max => {
            RetryState::Sleep
        }
        (RetryState::AttemptNonblocking, RetryEvent::WouldBlock) => RetryState::AttemptBlocking,
        (RetryState::Sleep, RetryEvent::Slept) => RetryState::AttemptNonblocking,
        _ => RetryState::Done,
    }
}

/// How a reliable operation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Completed on the non-blocking path after `retries` sleeps.
    Fast { retries: usize },
    /// The retry budget ran out and the final blocking attempt carried it.
    /// Still a success — but the fast path was abandoned, so the retry
    /// parameters deserve a look.
    Fallback { retries: usize },
}

impl Completion {
    /// Number of sleeps taken before the operation completed.
    pub fn retries(self) -> usize {
        match self {
            Completion::Fast { retries } | Completion::Fallback { retries } => retries,
        }
    }

    /// True if the operation only completed via the blocking fallback.
    pub fn fell_back(self) -> bool {
        matches!(self, Completion::Fallback { .. })
    }

    /// Combine completions of consecutive operations: retries add up, and
    /// one fallback marks the whole sequence as degraded.
    pub fn merge(self, other: Completion) -> Completion {
        let retries = self.retries() + other.retries();
        if self.fell_back() || other.fell_back() {
            Completion::Fallback { retries }
        } else {
            Completion::Fast { retries }
        }
    }
}

/// Drive `attempt` through the retry machine.
///
/// `attempt` receives `true` when it must block. A would-block from a
/// non-blocking attempt consumes budget; any other error ends the operation
/// immediately. When the budget is spent, one blocking attempt runs: its
/// success is reported as [`Completion::Fallback`], its failure as a
/// [`RETRIES_EXHAUSTED`] error carrying the retry count and the final
/// attempt's error as cause.
pub fn run<T, F>(policy: &RetryPolicy, mut attempt: F) -> Result<(T, Completion), Error>
where
    F: FnMut(bool) -> Result<T, WireError>,
{
    if policy.retries_max == 0 {
        return match attempt(true) {
            Ok(value) => Ok((value, Completion::Fast { retries: 0 })),
            Err(err) => Err(wire_to_error(err)),
        };
    }

    let mut retries = 0usize;
    let mut state = RetryState::AttemptNonblocking;
    loop {
        match state {
            RetryState::AttemptNonblocking => match attempt(false) {
                Ok(value) => return Ok((value, Completion::Fast { retries })),
                Err(WireError::WouldBlock) => {
                    state = next_state(state, RetryEvent::WouldBlock, retries, policy.retries_max);
                }
                Err(err) => return Err(wire_to_error(err)),
            },
            RetryState::Sleep => {
                std::thread::sleep(policy.delay);
                retries += 1;
                state = next_state(state, RetryEvent::Slept, retries, policy.retries_max);
            }
            RetryState::AttemptBlocking => {
                debug!(retries, "retry budget spent; degrading to a blocking attempt");
                return match attempt(true) {
                    Ok(value) => Ok((value, Completion::Fallback { retries })),
                    Err(err) => Err(Error::new(
                        RETRIES_EXHAUSTED,
                        format!("retry budget spent after {retries} non-blocking attempts"),
                    )
                    .with_payload(Payload::Retries(retries))
                    .with_cause(wire_to_error(err))),
                };
            }
            RetryState::Done => unreachable!("the driver returns before entering Done"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn transition_table() {
        use RetryEvent::*;
        use RetryState::*;

        assert_eq!(next_state(AttemptNonblocking, Succeeded, 0, 4), Done);
        assert_eq!(next_state(AttemptNonblocking, Failed, 0, 4), Done);
        assert_eq!(next_state(AttemptNonblocking, WouldBlock, 0, 4), Sleep);
        assert_eq!(next_state(AttemptNonblocking, WouldBlock, 3, 4), Sleep);
        assert_eq!(
            next_state(AttemptNonblocking, WouldBlock, 4, 4),
            AttemptBlocking
        );
        assert_eq!(next_state(Sleep, Slept, 1, 4), AttemptNonblocking);
        assert_eq!(next_state(AttemptBlocking, Succeeded, 4, 4), Done);
        assert_eq!(next_state(AttemptBlocking, Failed, 4, 4), Done);
    }

    #[test]
    fn would_block_twice_then_success_sleeps_twice() {
        let policy = RetryPolicy::new(2, 1_000_000);
        let mut calls: Vec<bool> = Vec::new();
        let start = Instant::now();

        let (value, completion) = run(&policy, |block| {
            calls.push(block);
            if calls.len() < 3 {
                Err(WireError::WouldBlock)
            } else {
                Ok(42u32)
            }
        })
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(completion, Completion::Fast { retries: 2 });
        assert_eq!(calls, vec![false, false, false]);
        assert!(start.elapsed() >= Duration::from_millis(2));
    }

    #[test]
    fn immediate_success_takes_no_sleep() {
        let policy = RetryPolicy::new(4, 50_000_000);
        let start = Instant::now();

        let (_, completion) = run(&policy, |_| Ok(())).unwrap();

        assert_eq!(completion, Completion::Fast { retries: 0 });
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn exhausted_budget_falls_back_to_blocking_success() {
        let policy = RetryPolicy::new(1, 1_000);
        let mut calls: Vec<bool> = Vec::new();

        let (_, completion) = run(&policy, |block| {
            calls.push(block);
            if block {
                Ok(())
            } else {
                Err(WireError::WouldBlock)
            }
        })
        .unwrap();

        assert_eq!(completion, Completion::Fallback { retries: 1 });
        assert_eq!(calls, vec![false, false, true]);
    }

    #[test]
    fn exhausted_budget_with_failed_fallback_reports_retry_count() {
        let policy = RetryPolicy::new(2, 1_000);

        let err = run::<(), _>(&policy, |_| Err(WireError::WouldBlock)).unwrap_err();

        assert_eq!(err.code(), mqprims_err::RETRIES_EXHAUSTED);
        assert_eq!(err.payload(), Some(&Payload::Retries(2)));
        assert!(err.cause().is_some());
    }

    #[test]
    fn real_error_short_circuits() {
        let policy = RetryPolicy::new(5, 1_000);
        let mut calls = 0usize;

        let err = run::<(), _>(&policy, |_| {
            calls += 1;
            Err(WireError::InvalidMagic)
        })
        .unwrap_err();

        assert_eq!(calls, 1);
        assert_eq!(err.code(), mqprims_err::GENERIC);
    }

    #[test]
    fn zero_retries_is_a_single_blocking_call() {
        let policy = RetryPolicy::blocking();
        let mut calls: Vec<bool> = Vec::new();
        let start = Instant::now();

        let (_, completion) = run(&policy, |block| {
            calls.push(block);
            Ok(())
        })
        .unwrap();

        assert_eq!(calls, vec![true]);
        assert_eq!(completion, Completion::Fast { retries: 0 });
        assert!(start.elapsed() < Duration::from_millis(5));
    }

    #[test]
    fn zero_retries_failure_is_not_retries_exhausted() {
        let policy = RetryPolicy::blocking();

        let err = run::<(), _>(&policy, |_| Err(WireError::InvalidMagic)).unwrap_err();

        assert_eq!(err.code(), mqprims_err::GENERIC);
        assert!(err.payload().is_none());
    }

    #[test]
    fn completion_merge_accumulates() {
        let fast = Completion::Fast { retries: 2 };
        let fallback = Completion::Fallback { retries: 3 };

        assert_eq!(fast.merge(fast), Completion::Fast { retries: 4 });
        assert_eq!(fast.merge(fallback), Completion::Fallback { retries: 5 });
        assert!(!fast.fell_back());
        assert!(fallback.fell_back());
    }
}
