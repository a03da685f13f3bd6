//! Cooperative frame pacing for host-driven render loops.
//!
//! The host invokes the scheduler once per displayable frame with a
//! monotonic timestamp. The scheduler never sleeps: an invocation that
//! arrives before the target interval has elapsed is declined
//! ([`Tick::Throttled`]) and the caller simply asks the host for another
//! frame through [`FrameHost::request_frame`].
//!
//! ```text
//!   Idle ──begin──▶ Executing ──complete──▶ Waiting(last)
//!                      ▲                        │
//!                      └──begin (t-last ≥ dt)───┘
//! ```

use std::time::Duration;

use lifeconfig::LifeConfig;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("frame started while the previous frame at {0:?} is still executing")]
    Reentrant(Duration),
    #[error("no frame is executing")]
    NotExecuting,
}

/// Host primitive that registers interest in the next displayable frame.
pub trait FrameHost {
    fn request_frame(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No frame has executed yet.
    Idle,
    /// Waiting for the interval since `last_frame` to elapse.
    Waiting { last_frame: Duration },
    /// A simulation step for `timestamp` is in flight.
    Executing {
        timestamp: Duration,
        previous: Option<Duration>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Too early; do no work this invocation.
    Throttled,
    /// Run exactly one simulation step, then call [`FrameScheduler::complete`].
    Execute,
}

#[derive(Debug, Clone)]
pub struct FrameScheduler {
    interval: Duration,
    state: SchedulerState,
    executed: u64,
    throttled: u64,
}

impl FrameScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: SchedulerState::Idle,
            executed: 0,
            throttled: 0,
        }
    }

    pub fn from_config(config: &LifeConfig) -> Self {
        Self::new(config.frame_interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn frames_executed(&self) -> u64 {
        self.executed
    }

    pub fn throttled_invocations(&self) -> u64 {
        self.throttled
    }

    /// Earliest timestamp at which the next step may run.
    pub fn next_deadline(&self) -> Option<Duration> {
        match self.state {
            SchedulerState::Idle => None,
            SchedulerState::Waiting { last_frame } => Some(last_frame + self.interval),
            SchedulerState::Executing { timestamp, .. } => Some(timestamp + self.interval),
        }
    }

    /// Decides whether the invocation at `timestamp` runs a step.
    ///
    /// Timestamps that go backwards count as "too early".
    pub fn begin(&mut self, timestamp: Duration) -> Result<Tick, SchedulerError> {
        let previous = match self.state {
            SchedulerState::Executing { timestamp, .. } => {
                return Err(SchedulerError::Reentrant(timestamp));
            }
            SchedulerState::Idle => None,
            SchedulerState::Waiting { last_frame } => {
                let elapsed = timestamp.saturating_sub(last_frame);
                if timestamp < last_frame || elapsed < self.interval {
                    self.throttled += 1;
                    tracing::trace!(
                        elapsed_us = elapsed.as_micros() as u64,
                        interval_us = self.interval.as_micros() as u64,
                        "scheduler: throttled"
                    );
                    return Ok(Tick::Throttled);
                }
                Some(last_frame)
            }
        };

        self.state = SchedulerState::Executing {
            timestamp,
            previous,
        };
        Ok(Tick::Execute)
    }

    /// Marks the in-flight step as fully issued.
    pub fn complete(&mut self) -> Result<(), SchedulerError> {
        match self.state {
            SchedulerState::Executing { timestamp, .. } => {
                self.state = SchedulerState::Waiting {
                    last_frame: timestamp,
                };
                self.executed += 1;
                Ok(())
            }
            _ => Err(SchedulerError::NotExecuting),
        }
    }

    /// Drops the in-flight step without recording it, restoring the state
    /// that preceded [`FrameScheduler::begin`].
    pub fn abandon(&mut self) {
        if let SchedulerState::Executing { previous, .. } = self.state {
            self.state = match previous {
                Some(last_frame) => SchedulerState::Waiting { last_frame },
                None => SchedulerState::Idle,
            };
        }
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(lifeconfig::DEFAULT_FRAME_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: f64) -> Duration {
        Duration::from_secs_f64(value / 1000.0)
    }

    fn run_frame(scheduler: &mut FrameScheduler, at: Duration) -> Tick {
        let tick = scheduler.begin(at).unwrap();
        if tick == Tick::Execute {
            scheduler.complete().unwrap();
        }
        tick
    }

    #[test]
    fn first_invocation_always_executes() {
        let mut scheduler = FrameScheduler::default();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(run_frame(&mut scheduler, Duration::ZERO), Tick::Execute);
        assert_eq!(
            scheduler.state(),
            SchedulerState::Waiting {
                last_frame: Duration::ZERO
            }
        );
    }

    #[test]
    fn throttles_until_interval_crossed() {
        let mut scheduler = FrameScheduler::new(ms(16.666));
        assert_eq!(run_frame(&mut scheduler, ms(100.0)), Tick::Execute);

        for offset in [1.0, 5.0, 10.0, 16.0, 16.6] {
            assert_eq!(
                run_frame(&mut scheduler, ms(100.0 + offset)),
                Tick::Throttled,
                "offset {offset}"
            );
        }
        assert_eq!(scheduler.frames_executed(), 1);
        assert_eq!(scheduler.throttled_invocations(), 5);

        assert_eq!(run_frame(&mut scheduler, ms(116.7)), Tick::Execute);
        assert_eq!(scheduler.frames_executed(), 2);
    }

    #[test]
    fn threshold_measured_from_last_executed_frame() {
        let mut scheduler = FrameScheduler::new(ms(10.0));
        run_frame(&mut scheduler, ms(0.0));
        assert_eq!(run_frame(&mut scheduler, ms(9.0)), Tick::Throttled);
        assert_eq!(run_frame(&mut scheduler, ms(15.0)), Tick::Execute);
        assert_eq!(run_frame(&mut scheduler, ms(20.0)), Tick::Throttled);
        assert_eq!(run_frame(&mut scheduler, ms(25.0)), Tick::Execute);
    }

    #[test]
    fn backwards_timestamps_are_throttled() {
        let mut scheduler = FrameScheduler::new(ms(10.0));
        run_frame(&mut scheduler, ms(500.0));
        assert_eq!(run_frame(&mut scheduler, ms(10.0)), Tick::Throttled);
    }

    #[test]
    fn rejects_reentrant_begin() {
        let mut scheduler = FrameScheduler::default();
        assert_eq!(scheduler.begin(ms(0.0)), Ok(Tick::Execute));
        assert_eq!(
            scheduler.begin(ms(50.0)),
            Err(SchedulerError::Reentrant(ms(0.0)))
        );
    }

    #[test]
    fn complete_requires_executing_frame() {
        let mut scheduler = FrameScheduler::default();
        assert_eq!(scheduler.complete(), Err(SchedulerError::NotExecuting));
    }

    #[test]
    fn abandon_restores_previous_state() {
        let mut scheduler = FrameScheduler::new(ms(10.0));
        scheduler.begin(ms(0.0)).unwrap();
        scheduler.abandon();
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        run_frame(&mut scheduler, ms(0.0));
        scheduler.begin(ms(20.0)).unwrap();
        scheduler.abandon();
        assert_eq!(
            scheduler.state(),
            SchedulerState::Waiting {
                last_frame: ms(0.0)
            }
        );
        assert_eq!(scheduler.frames_executed(), 1);
    }

    #[test]
    fn next_deadline_tracks_last_frame() {
        let mut scheduler = FrameScheduler::new(ms(10.0));
        assert_eq!(scheduler.next_deadline(), None);
        run_frame(&mut scheduler, ms(40.0));
        assert_eq!(scheduler.next_deadline(), Some(ms(40.0) + ms(10.0)));
    }

    #[test]
    fn builds_from_config() {
        let config = LifeConfig::from_toml_str("version = 1\nframe_interval = \"50ms\"").unwrap();
        let scheduler = FrameScheduler::from_config(&config);
        assert_eq!(scheduler.interval(), Duration::from_millis(50));
    }
}
