//! Replay JSON model
//!
//! Typed view of the JSON replay dump: a list of frames, each with a time
//! offset and the actor updates that happened in it. Only the fields needed to
//! follow the ball and the players' cars are modelled; everything else in the
//! dump is ignored.

pub mod players;

use crate::types::{ReplayError, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Class name of the ball actor
pub const BALL_CLASS_NAME: &str = "TAGame.Ball_TA";
/// Class name of a player's car actor
pub const CAR_CLASS_NAME: &str = "TAGame.Car_TA";
/// Class name of a player information actor
pub const PLAYER_INFO_CLASS_NAME: &str = "TAGame.PRI_TA";
/// Type names of the two team actors
pub const TEAM_0_TYPE_NAME: &str = "Archetypes.Teams.Team0";
pub const TEAM_1_TYPE_NAME: &str = "Archetypes.Teams.Team1";

/// A whole replay dump
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayFile {
    #[serde(rename = "Frames")]
    pub frames: Vec<ReplayFrame>,
}

/// One frame of the replay
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayFrame {
    #[serde(rename = "Time")]
    pub time: f64,
    #[serde(rename = "ActorUpdates", default)]
    pub actor_updates: Vec<ActorUpdate>,
}

/// One actor's update within a frame
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActorUpdate {
    #[serde(rename = "Id")]
    pub id: Option<i64>,
    #[serde(rename = "ClassName")]
    pub class_name: Option<String>,
    #[serde(rename = "TypeName")]
    pub type_name: Option<String>,
    #[serde(rename = "TAGame.RBActor_TA:ReplicatedRBState")]
    pub rigid_body: Option<RigidBodyState>,
    #[serde(rename = "Engine.Pawn:PlayerReplicationInfo")]
    pub player_info_ref: Option<ActorRef>,
    #[serde(rename = "Engine.PlayerReplicationInfo:PlayerName")]
    pub player_name: Option<String>,
    #[serde(rename = "Engine.PlayerReplicationInfo:Team")]
    pub team_ref: Option<ActorRef>,
}

impl ActorUpdate {
    pub fn has_class(&self, class_name: &str) -> bool {
        self.class_name.as_deref() == Some(class_name)
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.type_name.as_deref() == Some(type_name)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RigidBodyState {
    #[serde(rename = "Position")]
    pub position: Vector3,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Vector3 {
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(rename = "Z", default)]
    pub z: f64,
}

/// Reference from one actor to another
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ActorRef {
    #[serde(rename = "ActorId")]
    pub actor_id: i64,
}

impl ReplayFile {
    /// Parse a replay dump from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let replay: ReplayFile = serde_json::from_str(json)?;
        replay.validate()
    }

    /// Read and parse a replay dump from disk
    pub fn open(path: &Path) -> Result<Self> {
        log::info!("Reading replay: {:?}", path);
        let reader = BufReader::new(File::open(path)?);
        let replay: ReplayFile = serde_json::from_reader(reader)?;
        replay.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.frames.is_empty() {
            return Err(ReplayError::InvalidReplay("replay has no frames".to_string()));
        }
        log::debug!("Replay has {} frames", self.frames.len());
        Ok(self)
    }
}
