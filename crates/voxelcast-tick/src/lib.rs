//! Fixed-period tick scheduler for the state-update loop.
//!
//! The sync server broadcasts player state on a fixed cadence (45 ms by
//! default, ~22 Hz). This crate owns the timing: sleep until the next
//! deadline, detect overruns, and skip ahead rather than burst-firing
//! missed ticks — a late update is worthless once a fresher one is due.
//!
//! # Integration
//!
//! The scheduler sits inside a `tokio::select!` loop or a dedicated task:
//!
//! ```ignore
//! loop {
//!     let info = scheduler.wait_for_tick().await;
//!     broadcast_state_update(info.tick);
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

/// Default update period: 45 ms, ~22 updates per second.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(45);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the tick scheduler.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks.
    pub period: Duration,
    /// Random jitter (0–max µs) added to the *first* tick so that several
    /// server instances started at the same moment don't broadcast in
    /// lockstep (thundering-herd mitigation).
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            initial_jitter_us: 2_000, // 0–2 ms
        }
    }
}

impl TickConfig {
    /// Config for a specific period with default jitter.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Information about a fired tick, returned by
/// [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// Fixed delta time for this tick (always the configured period).
    pub dt: Duration,
    /// `true` if this tick fired late (>10% of the period past deadline).
    pub overrun: bool,
    /// Whole periods skipped due to overrun (0 in normal operation).
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-period tick scheduler with a skip-ahead overrun policy.
///
/// When a tick fires late, the next deadline is scheduled from *now*
/// rather than from the missed deadline — the scheduler never tries to
/// catch up, because stale state updates have no value.
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    next_tick: TokioInstant,
}

impl TickScheduler {
    /// Creates a scheduler; the first tick fires one period (plus jitter)
    /// from now.
    pub fn new(config: TickConfig) -> Self {
        let jitter = if config.initial_jitter_us > 0 {
            let us = rand::rng().random_range(0..config.initial_jitter_us);
            Duration::from_micros(us)
        } else {
            Duration::ZERO
        };
        let next_tick = TokioInstant::now() + config.period + jitter;

        debug!(
            period_ms = config.period.as_secs_f64() * 1000.0,
            "tick scheduler created"
        );

        Self {
            config,
            tick_count: 0,
            next_tick,
        }
    }

    /// Scheduler with the default 45 ms period.
    pub fn with_default_period() -> Self {
        Self::new(TickConfig::default())
    }

    /// Waits until the next tick is due and returns its [`TickInfo`].
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let period = self.config.period;
        let deadline = self.next_tick;

        time::sleep_until(deadline).await;

        let now = TokioInstant::now();
        self.tick_count += 1;

        // >10% late counts as an overrun.
        let late_by = now.saturating_duration_since(deadline);
        let overrun = late_by > period / 10;
        let mut ticks_skipped = 0u64;

        if overrun {
            ticks_skipped = late_by.as_nanos() as u64 / period.as_nanos() as u64;
            if ticks_skipped > 0 {
                warn!(
                    tick = self.tick_count,
                    skipped = ticks_skipped,
                    late_ms = late_by.as_secs_f64() * 1000.0,
                    "tick overrun — skipping ahead"
                );
            }
        }

        // Always schedule from now, not from the missed deadline.
        self.next_tick = now + period;

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            dt: period,
            overrun,
            ticks_skipped,
        }
    }

    /// Ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The configured period.
    pub fn period(&self) -> Duration {
        self.config.period
    }
}
