//! Property tests for the frame scheduler.

use proptest::prelude::*;
use sable_engine::engine::{FrameScheduler, TimestepMode};

const PERIOD: f64 = 1.0 / 60.0;

fn drain(scheduler: &mut FrameScheduler, delta: f64) -> Vec<f64> {
    scheduler.begin_frame(delta);
    let mut ticks = Vec::new();
    while let Some(dt) = scheduler.next_tick() {
        ticks.push(dt);
    }
    ticks
}

proptest! {
    /// Fixed mode runs at most one tick per update, each exactly one period,
    /// and never leaves a full period unsimulated.
    #[test]
    fn fixed_mode_ticks_are_whole_periods(deltas in prop::collection::vec(0.0f64..0.2, 1..64)) {
        let mut scheduler = FrameScheduler::new(TimestepMode::Fixed { period: PERIOD });
        for delta in deltas {
            let ticks = drain(&mut scheduler, delta);
            prop_assert!(ticks.len() <= 1);
            prop_assert!(ticks.iter().all(|dt| *dt == PERIOD));
            prop_assert!(scheduler.elapsed() >= 0.0);
            if !ticks.is_empty() {
                prop_assert!(scheduler.elapsed() <= PERIOD + 1e-12);
            }
        }
    }

    /// Simulated time plus skipped time plus leftover equals wall time.
    #[test]
    fn fixed_mode_accounts_for_all_time(deltas in prop::collection::vec(0.0f64..0.1, 1..64)) {
        let mut scheduler = FrameScheduler::new(TimestepMode::Fixed { period: PERIOD });
        let mut wall = 0.0;
        for delta in deltas {
            drain(&mut scheduler, delta);
            wall += delta;
        }
        let diagnostics = scheduler.diagnostics();
        let accounted = (diagnostics.ticks + diagnostics.frames_skipped) as f64 * PERIOD
            + scheduler.elapsed();
        prop_assert!((accounted - wall).abs() < 1e-9, "accounted {accounted} wall {wall}");
    }

    /// Two schedulers fed the same deltas make identical decisions.
    #[test]
    fn fixed_mode_is_deterministic(deltas in prop::collection::vec(0.0f64..0.1, 1..32)) {
        let mut a = FrameScheduler::new(TimestepMode::Fixed { period: PERIOD });
        let mut b = FrameScheduler::new(TimestepMode::Fixed { period: PERIOD });
        for delta in deltas {
            prop_assert_eq!(drain(&mut a, delta), drain(&mut b, delta));
        }
        prop_assert_eq!(a.diagnostics(), b.diagnostics());
    }

    /// Vsync mode runs exactly one tick with the wall delta.
    #[test]
    fn vsync_mode_passes_delta_through(delta in 0.0f64..1.0) {
        let mut scheduler = FrameScheduler::new(TimestepMode::Vsync);
        prop_assert_eq!(drain(&mut scheduler, delta), vec![delta]);
    }
}
