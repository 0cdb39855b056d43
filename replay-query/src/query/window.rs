//! Sliding window and debounce state
//!
//! Each query owns one [`WindowState`]. It is updated in place once per event:
//! a fit extends the streak and may trigger, a miss resets the streak, and an
//! undecidable event leaves it alone.

use crate::types::Seconds;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a window threshold is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    /// Number of consecutive fitting events
    Entries,
    /// Seconds elapsed between the first and last fitting event
    Seconds,
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowKind::Entries => write!(f, "ENTRIES"),
            WindowKind::Seconds => write!(f, "SECONDS"),
        }
    }
}

/// The `FOR LAST <threshold> <kind>` clause
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub kind: WindowKind,
    pub threshold: f64,
}

impl Window {
    pub fn entries(threshold: f64) -> Self {
        Self {
            kind: WindowKind::Entries,
            threshold,
        }
    }

    pub fn seconds(threshold: f64) -> Self {
        Self {
            kind: WindowKind::Seconds,
            threshold,
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LAST {} {}", self.threshold, self.kind)
    }
}

/// Where a query stands after its last event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    /// No fitting event in the current streak
    Idle,
    /// At least one fitting event, window not satisfied on the last one
    Accumulating,
    /// The last fitting event satisfied the window and emitted
    Armed,
}

/// Mutable evaluation state of one query
///
/// The fit times are only meaningful while `fit_count > 0`. `last_emission`
/// survives a reset, so the debounce delay spans separate streaks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowState {
    pub fit_count: u64,
    pub first_fit: Seconds,
    pub last_fit: Seconds,
    pub last_emission: Seconds,
    triggered: bool,
}

impl WindowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> WindowPhase {
        if self.fit_count == 0 {
            WindowPhase::Idle
        } else if self.triggered {
            WindowPhase::Armed
        } else {
            WindowPhase::Accumulating
        }
    }

    /// The condition did not hold: drop the current streak
    pub fn reset(&mut self) {
        self.fit_count = 0;
        self.first_fit = 0.0;
        self.last_fit = 0.0;
        self.triggered = false;
    }

    /// The condition held at `time`; returns true if the query should emit
    ///
    /// ENTRIES windows ignore `delay` and fire on every fit once the count is
    /// reached. SECONDS windows also require `delay` since the last emission.
    /// Neither kind resets the streak when it fires.
    pub fn record_fit(&mut self, window: &Window, delay: Seconds, time: Seconds) -> bool {
        if self.fit_count == 0 {
            self.first_fit = time;
        }
        self.last_fit = time;
        self.fit_count += 1;

        let triggered = match window.kind {
            WindowKind::Entries => self.fit_count as f64 >= window.threshold,
            WindowKind::Seconds => {
                self.last_fit - self.first_fit >= window.threshold
                    && self.last_fit - self.last_emission >= delay
            }
        };

        if triggered {
            self.last_emission = self.last_fit;
        }
        self.triggered = triggered;
        triggered
    }
}
