//! Player information from the first replay frame

use super::{ReplayFrame, PLAYER_INFO_CLASS_NAME, TEAM_0_TYPE_NAME, TEAM_1_TYPE_NAME};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Team {
    /// Team0 archetype
    Orange,
    /// Team1 archetype
    Blue,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Orange => write!(f, "Orange"),
            Team::Blue => write!(f, "Blue"),
        }
    }
}

/// A player as listed in the first frame; `player.N` in queries is the Nth entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Actor id of the player information actor (referenced by the player's car)
    pub actor_id: i64,
    pub name: String,
    pub team: Team,
}

/// Collect player information actors from the first frame, in appearance order
pub fn extract_player_info(first_frame: &ReplayFrame, max_players: usize) -> Vec<PlayerInfo> {
    let mut team_ids: [Option<i64>; 2] = [None, None];
    for update in &first_frame.actor_updates {
        if update.has_type(TEAM_0_TYPE_NAME) {
            team_ids[0] = update.id;
        }
        if update.has_type(TEAM_1_TYPE_NAME) {
            team_ids[1] = update.id;
        }
    }

    let mut players = Vec::new();
    for update in first_frame.actor_updates.iter().filter(|u| u.has_class(PLAYER_INFO_CLASS_NAME)) {
        let Some(actor_id) = update.id else {
            log::warn!("Player information actor without an id, skipping");
            continue;
        };
        if players.len() == max_players {
            log::warn!(
                "More than {} players in replay, ignoring player actor {}",
                max_players,
                actor_id
            );
            continue;
        }
        let team_id = update.team_ref.map(|r| r.actor_id);
        let team = if team_id.is_some() && team_id == team_ids[0] {
            Team::Orange
        } else {
            Team::Blue
        };
        players.push(PlayerInfo {
            actor_id,
            name: update.player_name.clone().unwrap_or_default(),
            team,
        });
    }

    log::info!("Found {} players in first frame", players.len());
    players
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::ReplayFile;

    const FIRST_FRAME: &str = r#"{"Frames": [{"Time": 0.0, "ActorUpdates": [
        {"Id": 10, "TypeName": "Archetypes.Teams.Team0"},
        {"Id": 11, "TypeName": "Archetypes.Teams.Team1"},
        {"Id": 20, "ClassName": "TAGame.PRI_TA", "Engine.PlayerReplicationInfo:PlayerName": "Alpha",
         "Engine.PlayerReplicationInfo:Team": {"ActorId": 10}},
        {"Id": 21, "ClassName": "TAGame.PRI_TA", "Engine.PlayerReplicationInfo:PlayerName": "Bravo",
         "Engine.PlayerReplicationInfo:Team": {"ActorId": 11}},
        {"Id": 22, "ClassName": "TAGame.PRI_TA", "Engine.PlayerReplicationInfo:PlayerName": "Charlie",
         "Engine.PlayerReplicationInfo:Team": {"ActorId": 10}}
    ]}]}"#;

    #[test]
    fn test_players_in_order_with_teams() {
        let replay = ReplayFile::from_json(FIRST_FRAME).unwrap();
        let players = extract_player_info(&replay.frames[0], 6);
        let summary: Vec<(i64, &str, Team)> = players
            .iter()
            .map(|p| (p.actor_id, p.name.as_str(), p.team))
            .collect();
        assert_eq!(
            summary,
            vec![
                (20, "Alpha", Team::Orange),
                (21, "Bravo", Team::Blue),
                (22, "Charlie", Team::Orange),
            ]
        );
    }

    #[test]
    fn test_player_limit() {
        let replay = ReplayFile::from_json(FIRST_FRAME).unwrap();
        let players = extract_player_info(&replay.frames[0], 2);
        assert_eq!(players.len(), 2);
        assert_eq!(players[1].name, "Bravo");
    }
}
