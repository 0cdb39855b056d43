//! Core types for the replay query library
//!
//! This module defines the telemetry events consumed by queries and every error
//! type the library can surface. Events are immutable snapshots of one sampled
//! instant; queries never mutate them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Event time, in seconds since the start of the replay
pub type Seconds = f64;

/// Result type for replay loading and extraction
pub type Result<T> = std::result::Result<T, ReplayError>;

/// Highest player index addressable from a query (`player.1` .. `player.6`)
pub const MAX_PLAYERS: u8 = 6;

/// A 2D position in the replay's native axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One timestamped sample of ball and player positions
///
/// `ball` is absent until the ball actor has been resolved; `player` only holds
/// entries for players whose car was updated in this frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Replay time of this sample (non-decreasing across a session)
    pub time: Seconds,
    /// Ball position, if known for this sample
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ball: Option<Position>,
    /// Player positions keyed by player index (1..=6)
    #[serde(default)]
    pub player: BTreeMap<u8, Position>,
}

impl Event {
    /// Create an event with no known positions
    pub fn new(time: Seconds) -> Self {
        Self {
            time,
            ball: None,
            player: BTreeMap::new(),
        }
    }

    /// Builder method: set the ball position
    pub fn with_ball(mut self, x: f64, y: f64) -> Self {
        self.ball = Some(Position::new(x, y));
        self
    }

    /// Builder method: set a player's position
    pub fn with_player(mut self, index: u8, x: f64, y: f64) -> Self {
        self.player.insert(index, Position::new(x, y));
        self
    }

    /// Position of the given player, if present in this sample
    pub fn player_position(&self, index: u8) -> Option<&Position> {
        self.player.get(&index)
    }
}

/// Errors raised while parsing a single query block
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryParseError {
    #[error("IF clause missing from the query.")]
    MissingIf,

    #[error("FOR clause missing from the query.")]
    MissingFor,

    #[error("THEN clause missing from the query.")]
    MissingThen,

    #[error("FOR clause must start with 'FOR LAST '.")]
    MalformedFor,

    #[error("Time window type (SECONDS or ENTRIES) missing from the FOR clause.")]
    MissingWindowKind,

    #[error("EVERY clause missing from the query.")]
    MissingEvery,

    #[error("Print instruction missing from the THEN clause (expected PRINT(\"message\")).")]
    MissingPrint,

    #[error("'SECONDS' keyword missing from the EVERY clause.")]
    MalformedEvery,

    #[error("PRINT message must not start with '!!' (reserved for evaluation errors).")]
    ReservedMessage,

    #[error("Time window value (FOR) must be a non-negative number, got '{0}'.")]
    InvalidThreshold(String),

    #[error("DELAY (EVERY) must be a non-negative number, got '{0}'.")]
    InvalidDelay(String),
}

/// A parse failure inside a batch of queries, with the block's 1-based position
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Input query #{position} format error: {source}")]
pub struct QueryBatchError {
    pub position: usize,
    #[source]
    pub source: QueryParseError,
}

/// Errors raised while evaluating a condition against one event
///
/// These never abort a run: a query turns them into a diagnostic output.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedCharacter(char, usize),

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("unknown name '{0}'")]
    UnknownName(String),

    #[error("operand '{0}' has no value")]
    Unresolved(String),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

/// Errors that can occur while loading a replay and extracting events
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Failed to parse replay JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid replay: {0}")]
    InvalidReplay(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Outcome of evaluating a condition against one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionResult {
    /// The condition holds for this event
    Correct,
    /// The condition does not hold for this event
    Incorrect,
    /// A referenced operand is not yet known; the event is undecidable
    Incomplete,
    /// The condition could not be evaluated
    Error,
}

impl fmt::Display for ConditionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionResult::Correct => write!(f, "Correct"),
            ConditionResult::Incorrect => write!(f, "Incorrect"),
            ConditionResult::Incomplete => write!(f, "Incomplete"),
            ConditionResult::Error => write!(f, "Error"),
        }
    }
}
