//! Main extraction API
//!
//! [`FrameExtractor`] is the entry point for turning a replay dump into the
//! event stream that queries consume. It resolves the players from the first
//! frame and then follows the ball and each player's car through the frames.

use crate::config::ExtractorConfig;
use crate::replay::players::{extract_player_info, PlayerInfo};
use crate::replay::{ActorUpdate, ReplayFile, ReplayFrame, BALL_CLASS_NAME, CAR_CLASS_NAME};
use crate::types::{Event, Position, Result};
use std::path::Path;

/// Loaded replay ready for event extraction
pub struct FrameExtractor {
    replay: ReplayFile,
    players: Vec<PlayerInfo>,
}

/// Statistics about a loaded replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionStats {
    pub num_frames: usize,
    pub num_players: usize,
    pub frames_with_ball: usize,
}

impl FrameExtractor {
    /// Read a replay dump from disk
    ///
    /// # Example
    /// ```no_run
    /// use replay_query::{ExtractorConfig, FrameExtractor};
    /// use std::path::Path;
    ///
    /// let extractor = FrameExtractor::open(Path::new("example.json"), &ExtractorConfig::new()).unwrap();
    /// for event in extractor.events(&ExtractorConfig::new()) {
    ///     println!("t={} ball={:?}", event.time, event.ball);
    /// }
    /// ```
    pub fn open(path: &Path, config: &ExtractorConfig) -> Result<Self> {
        let replay = ReplayFile::open(path)?;
        Ok(Self::from_replay(replay, config))
    }

    /// Use an already parsed replay
    pub fn from_replay(replay: ReplayFile, config: &ExtractorConfig) -> Self {
        // ReplayFile guarantees at least one frame
        let players = replay
            .frames
            .first()
            .map(|frame| extract_player_info(frame, config.player_limit()))
            .unwrap_or_default();
        Self { replay, players }
    }

    /// Players in query order (`player.1` first)
    pub fn players(&self) -> &[PlayerInfo] {
        &self.players
    }

    pub fn frames(&self) -> &[ReplayFrame] {
        &self.replay.frames
    }

    /// Lazily extract one event per frame
    pub fn events<'a>(&'a self, config: &ExtractorConfig) -> EventIterator<'a> {
        EventIterator::new(&self.replay.frames, &self.players, config.clone())
    }

    /// Get statistics about the loaded replay
    pub fn stats(&self) -> ExtractionStats {
        let frames_with_ball = self
            .events(&ExtractorConfig::new())
            .filter(|event| event.ball.is_some())
            .count();
        ExtractionStats {
            num_frames: self.replay.frames.len(),
            num_players: self.players.len(),
            frames_with_ball,
        }
    }
}

/// Iterator that follows actors across frames and yields events
///
/// Actor ids change over a match (for example after a goal), so an actor is
/// recognised either by its remembered id or, failing that, by its class.
pub struct EventIterator<'a> {
    frames: std::slice::Iter<'a, ReplayFrame>,
    players: &'a [PlayerInfo],
    config: ExtractorConfig,
    ball_id: Option<i64>,
    car_ids: Vec<Option<i64>>,
    emitted: usize,
}

impl<'a> EventIterator<'a> {
    fn new(frames: &'a [ReplayFrame], players: &'a [PlayerInfo], config: ExtractorConfig) -> Self {
        Self {
            frames: frames.iter(),
            players,
            config,
            ball_id: None,
            car_ids: vec![None; players.len()],
            emitted: 0,
        }
    }

    /// Update actor tracking from one frame and build its event
    fn process_frame(&mut self, frame: &ReplayFrame) -> Event {
        let mut event = Event::new(frame.time);
        let players = self.players;

        for update in &frame.actor_updates {
            if self.is_ball(update) {
                self.ball_id = update.id;
                match update.rigid_body {
                    Some(state) => event.ball = Some(Position::new(state.position.x, state.position.y)),
                    None => log::trace!("Ball update without rigid body state at t={}", frame.time),
                }
            }

            for (slot, player) in players.iter().enumerate() {
                let known = self.car_ids[slot].is_some() && update.id == self.car_ids[slot];
                let owned = update.has_class(CAR_CLASS_NAME)
                    && update.player_info_ref.map(|r| r.actor_id) == Some(player.actor_id);
                if known || owned {
                    self.car_ids[slot] = update.id;
                    if let Some(state) = update.rigid_body {
                        // Slots are capped at 6, so the index fits in u8
                        event
                            .player
                            .insert(slot as u8 + 1, Position::new(state.position.x, state.position.y));
                    }
                }
            }
        }

        event
    }

    fn is_ball(&self, update: &ActorUpdate) -> bool {
        (self.ball_id.is_some() && update.id == self.ball_id) || update.has_class(BALL_CLASS_NAME)
    }
}

impl<'a> Iterator for EventIterator<'a> {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        if self.config.max_frames.is_some_and(|max| self.emitted >= max) {
            return None;
        }
        loop {
            let frame = self.frames.next()?;
            // Frames outside the time range still update actor tracking
            let event = self.process_frame(frame);
            if self.config.should_process_time(event.time) {
                self.emitted += 1;
                return Some(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay() -> ReplayFile {
        ReplayFile::from_json(
            r#"{"Frames": [
            {"Time": 0.0, "ActorUpdates": [
                {"Id": 10, "TypeName": "Archetypes.Teams.Team0"},
                {"Id": 20, "ClassName": "TAGame.PRI_TA", "Engine.PlayerReplicationInfo:PlayerName": "Alpha",
                 "Engine.PlayerReplicationInfo:Team": {"ActorId": 10}},
                {"Id": 5, "ClassName": "TAGame.Ball_TA",
                 "TAGame.RBActor_TA:ReplicatedRBState": {"Position": {"X": 0.0, "Y": 0.0, "Z": 93.0}}}
            ]},
            {"Time": 0.5, "ActorUpdates": [
                {"Id": 30, "ClassName": "TAGame.Car_TA", "Engine.Pawn:PlayerReplicationInfo": {"ActorId": 20},
                 "TAGame.RBActor_TA:ReplicatedRBState": {"Position": {"X": 100.0, "Y": 200.0, "Z": 17.0}}}
            ]},
            {"Time": 1.0, "ActorUpdates": [
                {"Id": 5, "TAGame.RBActor_TA:ReplicatedRBState": {"Position": {"X": 7.0, "Y": 8.0, "Z": 93.0}}},
                {"Id": 30, "TAGame.RBActor_TA:ReplicatedRBState": {"Position": {"X": 110.0, "Y": 210.0, "Z": 17.0}}}
            ]}
        ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_tracks_actors_by_class_then_id() {
        let extractor = FrameExtractor::from_replay(replay(), &ExtractorConfig::new());
        let events: Vec<Event> = extractor.events(&ExtractorConfig::new()).collect();
        assert_eq!(events.len(), 3);

        assert_eq!(events[0].ball, Some(Position::new(0.0, 0.0)));
        assert!(events[0].player.is_empty());

        assert!(events[1].ball.is_none());
        assert_eq!(events[1].player_position(1), Some(&Position::new(100.0, 200.0)));

        assert_eq!(events[2].ball, Some(Position::new(7.0, 8.0)));
        assert_eq!(events[2].player_position(1), Some(&Position::new(110.0, 210.0)));
    }

    #[test]
    fn test_time_range_and_limit() {
        let extractor = FrameExtractor::from_replay(replay(), &ExtractorConfig::new());
        let config = ExtractorConfig::new().with_time_range(Some(0.5), None);
        let events: Vec<Event> = extractor.events(&config).collect();
        assert_eq!(events.len(), 2);
        // Ball id learned in the skipped first frame is still used
        assert_eq!(events[1].ball, Some(Position::new(7.0, 8.0)));

        let config = ExtractorConfig::new().with_max_frames(1);
        assert_eq!(extractor.events(&config).count(), 1);
    }

    #[test]
    fn test_stats() {
        let extractor = FrameExtractor::from_replay(replay(), &ExtractorConfig::new());
        assert_eq!(
            extractor.stats(),
            ExtractionStats {
                num_frames: 3,
                num_players: 1,
                frames_with_ball: 2,
            }
        );
        assert_eq!(extractor.players()[0].name, "Alpha");
    }
}
