//! Frame scheduler: decides how many ticks an [`Engine::update`] runs and
//! with which delta.
//!
//! Two modes, chosen once when the engine is built:
//!
//! - [`TimestepMode::Vsync`]: one tick per update with the wall-clock delta.
//!   The display refresh paces the loop.
//! - [`TimestepMode::Fixed`]: wall-clock deltas accumulate; each tick consumes
//!   exactly one frame period. When a tick leaves more than a full period
//!   behind, the whole periods are dropped and a warning reports how many.
//!   The scheduler never runs extra ticks to catch up.
//!
//! The caller drives it as
//!
//! ```
//! # use sable_engine::engine::{FrameScheduler, TimestepMode};
//! let mut scheduler = FrameScheduler::new(TimestepMode::Fixed { period: 0.5 });
//! scheduler.begin_frame(1.25);
//! let mut ticks = Vec::new();
//! while let Some(dt) = scheduler.next_tick() {
//!     ticks.push(dt);
//! }
//! assert_eq!(ticks, [0.5]);
//! assert_eq!(scheduler.elapsed(), 0.25);
//! ```
//!
//! [`Engine::update`]: super::Engine::update

use std::time::Duration;

/// How ticks are paced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimestepMode {
    /// One tick per update, using the measured delta.
    Vsync,
    /// Constant tick length in seconds. Must be positive and finite.
    Fixed { period: f64 },
}

/// Counters for the running scheduler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerDiagnostics {
    /// Ticks handed out since creation.
    pub ticks: u64,
    /// Times the fixed-step scheduler fell behind and dropped frames.
    pub skip_events: u64,
    /// Total frame periods dropped.
    pub frames_skipped: u64,
    /// Periods dropped by the most recent skip event.
    pub last_skipped: u64,
    /// Wall time of the last completed tick.
    pub last_tick_time: Duration,
}

/// Turns wall-clock deltas into ticks.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    mode: TimestepMode,
    /// Fixed mode: accumulated, not yet simulated time.
    elapsed: f64,
    /// Vsync mode: the delta for this frame's single tick.
    pending: Option<f64>,
    ticked_this_frame: bool,
    diagnostics: SchedulerDiagnostics,
}

impl FrameScheduler {
    pub fn new(mode: TimestepMode) -> Self {
        if let TimestepMode::Fixed { period } = mode {
            debug_assert!(
                period > 0.0 && period.is_finite(),
                "frame period must be positive and finite, got {period}"
            );
        }
        tracing::info!(?mode, "frame scheduler created");
        Self {
            mode,
            elapsed: 0.0,
            pending: None,
            ticked_this_frame: false,
            diagnostics: SchedulerDiagnostics::default(),
        }
    }

    /// Start an update with `delta` seconds of wall time since the last one.
    ///
    /// A negative or non-finite delta is logged and counted as zero.
    pub fn begin_frame(&mut self, delta: f64) {
        self.ticked_this_frame = false;
        let delta = if delta.is_finite() && delta >= 0.0 {
            delta
        } else {
            tracing::warn!(delta, "ignoring invalid frame delta");
            0.0
        };
        match self.mode {
            TimestepMode::Vsync => self.pending = Some(delta),
            TimestepMode::Fixed { .. } => self.elapsed += delta,
        }
    }

    /// Delta for the next tick of this update, or `None` when the update is
    /// done.
    pub fn next_tick(&mut self) -> Option<f64> {
        let dt = match self.mode {
            TimestepMode::Vsync => self.pending.take()?,
            TimestepMode::Fixed { period } => {
                // Strictly more than a period: a frame of exactly two periods
                // runs two ticks, anything longer runs one and skips.
                if self.ticked_this_frame && self.elapsed > period {
                    self.skip(period);
                }
                if self.elapsed < period {
                    return None;
                }
                self.elapsed -= period;
                period
            }
        };
        self.ticked_this_frame = true;
        self.diagnostics.ticks += 1;
        Some(dt)
    }

    /// Record how long the last tick took.
    pub fn record_tick_time(&mut self, time: Duration) {
        self.diagnostics.last_tick_time = time;
    }

    fn skip(&mut self, period: f64) {
        let skipped = (self.elapsed / period).floor() as u64;
        self.elapsed = self.elapsed.rem_euclid(period);
        self.diagnostics.skip_events += 1;
        self.diagnostics.frames_skipped += skipped;
        self.diagnostics.last_skipped = skipped;
        tracing::warn!(skipped, "engine fell behind, skipping frames");
    }

    // -- accessors ----------------------------------------------------------

    pub fn mode(&self) -> TimestepMode {
        self.mode
    }

    /// Accumulated time not yet simulated (fixed mode; zero in vsync mode).
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn diagnostics(&self) -> &SchedulerDiagnostics {
        &self.diagnostics
    }
}
