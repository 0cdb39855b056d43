//! Replay playback loop
//!
//! Feeds extracted events through a [`QueryManager`] in order, pacing them
//! by replay time.

use crate::report::ReportSink;
use anyhow::Result;
use replay_query::{Event, ManagerStats, QueryManager, Seconds};
use std::thread;
use std::time::Duration;

/// Outcome of one playback run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    pub stats: ManagerStats,
    pub first_time: Option<Seconds>,
    pub last_time: Option<Seconds>,
}

impl RunSummary {
    /// Replay time covered by the processed events
    pub fn duration(&self) -> Seconds {
        match (self.first_time, self.last_time) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

/// Wall-clock pause between two events at the given speed multiplier
pub fn pause_between(current: Seconds, next: Seconds, speed: f64) -> Option<Duration> {
    if speed <= 0.0 {
        return None;
    }
    let gap = (next - current) / speed;
    if gap > 0.0 && gap.is_finite() {
        Some(Duration::from_secs_f64(gap))
    } else {
        None
    }
}

/// Play `events` through `manager`, sending every output to `sink`
///
/// `speed` of 1.0 plays in real time; 0 disables pacing.
pub fn run<I>(
    events: I,
    manager: &mut QueryManager,
    sink: &mut dyn ReportSink,
    speed: f64,
) -> Result<RunSummary>
where
    I: IntoIterator<Item = Event>,
{
    let mut summary = RunSummary::default();
    let mut previous: Option<Seconds> = None;

    for event in events {
        if let Some(prev) = previous {
            if let Some(pause) = pause_between(prev, event.time, speed) {
                thread::sleep(pause);
            }
        }

        sink.set_time(event.time);
        let emitted = manager.add_message(&event, &mut *sink);
        if emitted > 0 {
            log::trace!("t={:.3}: {} output(s)", event.time, emitted);
        }

        summary.first_time.get_or_insert(event.time);
        summary.last_time = Some(event.time);
        previous = Some(event.time);
    }

    sink.finish()?;
    summary.stats = manager.stats();
    Ok(summary)
}
