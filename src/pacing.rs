//! Frame-completion coalescing.
//!
//! The protocol engine reports "display finished" zero, one, or many times
//! between two pacing ticks, depending on network jitter and how many viewers
//! are connected. The scheduler contract is the opposite shape: exactly one
//! completion per repaint it issued. `FrameClock` absorbs finish bursts into
//! credits and pays out at most one completion per tick while a repaint is
//! outstanding, fabricating a credit when the engine has been silent past the
//! stall threshold so a dead viewer never freezes repainting.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{error, trace};

struct ClockState {
    finishes: Vec<Instant>,
    credits: u32,
    awaiting: u32,
    last_report: Instant,
}

pub struct FrameClock {
    state: Mutex<ClockState>,
    stall_threshold: Duration,
}

impl FrameClock {
    pub fn new(stall_threshold: Duration) -> Self {
        Self {
            state: Mutex::new(ClockState {
                finishes: Vec::new(),
                credits: 0,
                awaiting: 0,
                last_report: Instant::now(),
            }),
            stall_threshold,
        }
    }

    /// Records one engine-side finish. Callable from any thread; never
    /// blocks beyond the list append.
    pub fn record_finish(&self, at: Instant) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.finishes.try_reserve(1).is_err() {
            error!("completion token allocation failed, dropping token");
            return;
        }
        state.finishes.push(at);
    }

    /// Records that the scheduler issued a repaint which now awaits its
    /// completion report.
    pub fn record_repaint(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.awaiting = state.awaiting.saturating_add(1);
    }

    /// One maintenance tick. Returns the timestamp to report, or `None` when
    /// nothing is due.
    pub fn tick(&self) -> Option<Instant> {
        self.tick_at(Instant::now())
    }

    /// Tick with an explicit notion of "now"; the whole policy is a pure
    /// function of the queued state and this instant.
    pub fn tick_at(&self, now: Instant) -> Option<Instant> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        // liveness fallback: a long-silent engine earns one implicit credit
        if now.duration_since(state.last_report) > self.stall_threshold {
            state.credits = state.credits.saturating_add(1);
        }

        let mut latest = None;
        if !state.finishes.is_empty() {
            let burst = state.finishes.len();
            state.credits = state.credits.saturating_add(burst as u32);
            latest = state.finishes.drain(..).max();
            if burst > 1 {
                trace!(burst, "coalesced finish burst");
            }
        }

        if state.credits == 0 || state.awaiting == 0 {
            return None;
        }
        state.credits -= 1;
        state.awaiting -= 1;
        state.last_report = now;
        Some(latest.unwrap_or(now))
    }

    /// Repaints issued but not yet reported complete.
    pub fn outstanding(&self) -> u32 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .awaiting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STALL: Duration = Duration::from_millis(500);
    const TICK: Duration = Duration::from_millis(40);

    #[test]
    fn idle_tick_reports_nothing() {
        let clock = FrameClock::new(STALL);
        let now = Instant::now();
        assert_eq!(clock.tick_at(now), None);
        assert_eq!(clock.tick_at(now + TICK), None);
    }

    #[test]
    fn finish_without_outstanding_repaint_is_held() {
        let clock = FrameClock::new(STALL);
        let now = Instant::now();
        clock.record_finish(now);
        assert_eq!(clock.tick_at(now + TICK), None);
        // the credit is paid out once a repaint is issued
        clock.record_repaint();
        assert!(clock.tick_at(now + 2 * TICK).is_some());
    }

    #[test]
    fn burst_coalesces_to_one_report_with_latest_timestamp() {
        let clock = FrameClock::new(STALL);
        let now = Instant::now();
        clock.record_repaint();
        clock.record_finish(now + Duration::from_millis(3));
        clock.record_finish(now + Duration::from_millis(9));
        clock.record_finish(now + Duration::from_millis(6));
        let reported = clock.tick_at(now + TICK).unwrap();
        assert_eq!(reported, now + Duration::from_millis(9));
        // burst absorbed; nothing outstanding, so the surplus credits wait
        assert_eq!(clock.tick_at(now + 2 * TICK), None);
        assert_eq!(clock.outstanding(), 0);
    }

    #[test]
    fn surplus_credits_pay_later_repaints() {
        let clock = FrameClock::new(STALL);
        let now = Instant::now();
        clock.record_repaint();
        for i in 0..3 {
            clock.record_finish(now + Duration::from_millis(i));
        }
        assert!(clock.tick_at(now + TICK).is_some());
        clock.record_repaint();
        // no new finish needed, a banked credit covers it
        assert!(clock.tick_at(now + 2 * TICK).is_some());
    }

    #[test]
    fn one_report_per_tick_even_with_many_repaints() {
        let clock = FrameClock::new(STALL);
        let now = Instant::now();
        clock.record_repaint();
        clock.record_repaint();
        clock.record_finish(now);
        clock.record_finish(now);
        assert!(clock.tick_at(now + TICK).is_some());
        assert_eq!(clock.outstanding(), 1);
        assert!(clock.tick_at(now + 2 * TICK).is_some());
        assert_eq!(clock.outstanding(), 0);
    }

    #[test]
    fn stalled_engine_still_makes_progress() {
        let clock = FrameClock::new(STALL);
        let now = Instant::now();
        clock.record_repaint();
        // within the threshold nothing is fabricated
        assert_eq!(clock.tick_at(now + Duration::from_millis(400)), None);
        // past it the tick reports with its own timestamp
        let late = now + Duration::from_millis(600);
        assert_eq!(clock.tick_at(late), Some(late));
        assert_eq!(clock.outstanding(), 0);
    }

    #[test]
    fn stall_credit_and_burst_together_report_once() {
        let clock = FrameClock::new(STALL);
        let now = Instant::now();
        clock.record_repaint();
        let finish = now + Duration::from_millis(550);
        clock.record_finish(finish);
        let tick = now + Duration::from_millis(600);
        assert_eq!(clock.tick_at(tick), Some(finish));
        assert_eq!(clock.tick_at(tick + TICK), None);
    }
}
