//! Integration tests for the fixed-period tick scheduler.
//!
//! Uses `tokio::time::pause()` (via `start_paused`) to control time
//! deterministically — `sleep_until` resolves instantly when the runtime
//! auto-advances the clock.

use std::time::Duration;

use voxelcast_tick::{TickConfig, TickScheduler, DEFAULT_PERIOD};

fn no_jitter(period: Duration) -> TickConfig {
    TickConfig {
        period,
        initial_jitter_us: 0,
    }
}

// =========================================================================
// TickConfig
// =========================================================================

#[test]
fn test_default_config_uses_45ms_period() {
    let cfg = TickConfig::default();
    assert_eq!(cfg.period, Duration::from_millis(45));
    assert_eq!(cfg.period, DEFAULT_PERIOD);
}

#[test]
fn test_with_period_overrides_default() {
    let cfg = TickConfig::with_period(Duration::from_millis(100));
    assert_eq!(cfg.period, Duration::from_millis(100));
}

// =========================================================================
// Scheduler state
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_scheduler_initial_state() {
    let s = TickScheduler::new(no_jitter(Duration::from_millis(45)));
    assert_eq!(s.tick_count(), 0);
    assert_eq!(s.period(), Duration::from_millis(45));
}

// =========================================================================
// Tick firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_fires_and_increments() {
    let mut s = TickScheduler::new(no_jitter(Duration::from_millis(45)));

    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 1);
    assert_eq!(info.dt, Duration::from_millis(45));
    assert!(!info.overrun);
    assert_eq!(info.ticks_skipped, 0);
    assert_eq!(s.tick_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_multiple_ticks_increment_monotonically() {
    let mut s = TickScheduler::new(no_jitter(Duration::from_millis(45)));

    for expected in 1..=5 {
        let info = s.wait_for_tick().await;
        assert_eq!(info.tick, expected);
    }
    assert_eq!(s.tick_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_dt_is_always_the_configured_period() {
    let mut s = TickScheduler::new(no_jitter(Duration::from_millis(20)));

    for _ in 0..3 {
        let info = s.wait_for_tick().await;
        assert_eq!(info.dt, Duration::from_millis(20));
    }
}

// =========================================================================
// Overrun handling
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_late_wakeup_reports_overrun_and_skips_ahead() {
    let mut s = TickScheduler::new(no_jitter(Duration::from_millis(45)));

    // Push the clock three full periods past the first deadline before
    // polling, simulating a slow broadcast pass.
    tokio::time::advance(Duration::from_millis(45 * 4)).await;

    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 1);
    assert!(info.overrun);
    assert_eq!(info.ticks_skipped, 3);

    // The scheduler rescheduled from now: the next tick is on time.
    let info = s.wait_for_tick().await;
    assert_eq!(info.tick, 2);
    assert!(!info.overrun);
    assert_eq!(info.ticks_skipped, 0);
}

#[tokio::test(start_paused = true)]
async fn test_slightly_late_wakeup_is_not_an_overrun() {
    let mut s = TickScheduler::new(no_jitter(Duration::from_millis(100)));

    // 5ms late on a 100ms period — under the 10% threshold.
    tokio::time::advance(Duration::from_millis(105)).await;

    let info = s.wait_for_tick().await;
    assert!(!info.overrun);
    assert_eq!(info.ticks_skipped, 0);
}

// =========================================================================
// Integration: select! loop pattern (mirrors server usage)
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_pattern() {
    let mut s = TickScheduler::new(no_jitter(Duration::from_millis(45)));
    let (tx, mut rx) = tokio::sync::mpsc::channel::<&str>(10);

    tokio::spawn(async move {
        // Stop after ~3 ticks.
        tokio::time::sleep(Duration::from_millis(150)).await;
        tx.send("stop").await.ok();
    });

    let mut ticks_fired = 0u64;
    loop {
        tokio::select! {
            Some(cmd) = rx.recv() => {
                assert_eq!(cmd, "stop");
                break;
            }
            info = s.wait_for_tick() => {
                ticks_fired += 1;
                assert_eq!(info.tick, ticks_fired);
            }
        }
    }

    assert!(ticks_fired >= 3, "expected at least 3 ticks, got {ticks_fired}");
}
