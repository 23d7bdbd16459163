//! Periodic task runner.
//!
//! Each loop is a tokio task that owns its body and a cancellation token.
//! A tick is never interrupted: cancellation is checked before each tick
//! and while sleeping between ticks. An overdue tick runs immediately, so
//! at most one tick is ever pending.

use std::time::Duration;

use mm_gateway::BoxFuture;
use mm_maker::{OrderbookCycle, TradeGenerator, ORDERBOOK_LOOP, TRADE_LOOP};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Body of a periodic loop.
///
/// `run_once` must be total: it traps its own failures. A panic ends the
/// loop and is reported when the loop is joined.
pub trait PeriodicTask: Send + 'static {
    fn name(&self) -> &'static str;

    fn run_once(&mut self) -> BoxFuture<'_, ()>;
}

impl PeriodicTask for OrderbookCycle {
    fn name(&self) -> &'static str {
        ORDERBOOK_LOOP
    }

    fn run_once(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(self.tick())
    }
}

impl PeriodicTask for TradeGenerator {
    fn name(&self) -> &'static str {
        TRADE_LOOP
    }

    fn run_once(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(self.tick())
    }
}

/// Interval between the starts of consecutive ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Fixed(Duration),
    /// Drawn uniformly from `[min, max]` before every tick.
    Jittered { min: Duration, max: Duration },
}

impl Schedule {
    pub fn next_interval<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        match *self {
            Self::Fixed(interval) => interval,
            Self::Jittered { min, max } if min < max => rng.gen_range(min..=max),
            Self::Jittered { min, .. } => min,
        }
    }
}

/// How a loop ended when joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Stopped,
    /// Still running after the grace period; the task was aborted.
    TimedOut,
    Panicked,
}

/// Owned handle to a running loop.
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stop starting new ticks. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel, then wait up to `grace` for the running tick to finish.
    pub async fn join(mut self, grace: Duration) -> JoinOutcome {
        self.cancel();
        match tokio::time::timeout(grace, &mut self.handle).await {
            Ok(Ok(())) => {
                debug!(task = self.name, "Loop joined");
                JoinOutcome::Stopped
            }
            Ok(Err(e)) if e.is_panic() => {
                error!(task = self.name, error = %e, "Loop panicked");
                JoinOutcome::Panicked
            }
            Ok(Err(e)) => {
                warn!(task = self.name, error = %e, "Loop task cancelled by runtime");
                JoinOutcome::Stopped
            }
            Err(_) => {
                warn!(
                    task = self.name,
                    grace_ms = grace.as_millis() as u64,
                    "Loop did not stop within grace period, aborting"
                );
                self.handle.abort();
                JoinOutcome::TimedOut
            }
        }
    }
}

/// Spawn `task` on `schedule`, first tick after `start_delay`.
pub fn spawn_periodic<T: PeriodicTask>(
    task: T,
    schedule: Schedule,
    start_delay: Duration,
) -> TaskHandle {
    let name = task.name();
    let token = CancellationToken::new();
    let handle = tokio::spawn(run_loop(task, schedule, start_delay, token.clone()));
    TaskHandle {
        name,
        token,
        handle,
    }
}

pub fn run_fixed<T: PeriodicTask>(task: T, interval: Duration) -> TaskHandle {
    spawn_periodic(task, Schedule::Fixed(interval), Duration::ZERO)
}

pub fn run_jittered<T: PeriodicTask>(task: T, min: Duration, max: Duration) -> TaskHandle {
    spawn_periodic(task, Schedule::Jittered { min, max }, Duration::ZERO)
}

async fn run_loop<T: PeriodicTask>(
    mut task: T,
    schedule: Schedule,
    start_delay: Duration,
    token: CancellationToken,
) {
    let name = task.name();

    if !start_delay.is_zero() {
        debug!(
            task = name,
            delay_ms = start_delay.as_millis() as u64,
            "Delaying loop start"
        );
        tokio::select! {
            () = tokio::time::sleep(start_delay) => {}
            () = token.cancelled() => {
                info!(task = name, "Loop cancelled before first tick");
                return;
            }
        }
    }

    info!(task = name, ?schedule, "Loop started");
    let mut rng = StdRng::from_entropy();

    while !token.is_cancelled() {
        let interval = schedule.next_interval(&mut rng);
        let started = Instant::now();
        task.run_once().await;

        let wait = interval.saturating_sub(started.elapsed());
        if wait.is_zero() {
            debug!(
                task = name,
                interval_ms = interval.as_millis() as u64,
                "Tick overran interval"
            );
            continue;
        }
        tokio::select! {
            () = tokio::time::sleep(wait) => {}
            () = token.cancelled() => break,
        }
    }

    info!(task = name, "Loop stopped");
}
