//! Extraction configuration types
//!
//! This module defines the small amount of configuration the frame extractor
//! needs. Query behaviour is configured by the query text alone.

use crate::types::{Seconds, MAX_PLAYERS};
use serde::{Deserialize, Serialize};

/// Configuration for turning replay frames into events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// How many players to track (capped at 6)
    #[serde(default = "default_max_players")]
    pub max_players: usize,

    /// Optional: stop after this many events
    #[serde(default)]
    pub max_frames: Option<usize>,

    /// Optional: skip frames before this replay time
    #[serde(default)]
    pub start_time: Option<Seconds>,

    /// Optional: skip frames after this replay time
    #[serde(default)]
    pub end_time: Option<Seconds>,
}

fn default_max_players() -> usize {
    MAX_PLAYERS as usize
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_players: default_max_players(),
            max_frames: None,
            start_time: None,
            end_time: None,
        }
    }
}

impl ExtractorConfig {
    /// Create a new extractor configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: track at most `count` players (never more than 6)
    pub fn with_max_players(mut self, count: usize) -> Self {
        self.max_players = count.min(MAX_PLAYERS as usize);
        self
    }

    /// Builder method: limit the number of events
    pub fn with_max_frames(mut self, count: usize) -> Self {
        self.max_frames = Some(count);
        self
    }

    /// Builder method: only emit events within `[start, end]`
    pub fn with_time_range(mut self, start: Option<Seconds>, end: Option<Seconds>) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    /// Player limit actually applied
    pub fn player_limit(&self) -> usize {
        self.max_players.min(MAX_PLAYERS as usize)
    }

    /// Check if a frame at `time` should become an event
    pub fn should_process_time(&self, time: Seconds) -> bool {
        self.start_time.map_or(true, |start| time >= start) && self.end_time.map_or(true, |end| time <= end)
    }
}
