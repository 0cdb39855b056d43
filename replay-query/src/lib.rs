//! Replay Query Library
//!
//! Continuous temporal queries over a moving-object telemetry stream (the ball
//! and up to six players of a replay), with debounced notifications.
//!
//! # Architecture
//!
//! - [`condition`]: restricted expression language over a fixed operand
//!   vocabulary, evaluated per event to Correct/Incorrect/Incomplete/Error
//! - [`query`]: the four-clause query grammar and the per-query
//!   sliding-window/debounce state machine
//! - [`manager`]: ordered fan-out of events to queries and output forwarding
//! - [`extractor`]: turns a JSON replay dump into the event stream
//!
//! The library performs no terminal output and never blocks on anything but
//! file reads in [`FrameExtractor::open`]. Pacing, rendering and user
//! interaction are left to the application (replay-query-cli).
//!
//! # Example Usage
//!
//! ```
//! use replay_query::{Event, QueryManager};
//!
//! let mut manager = QueryManager::from_batch(
//!     "IF ball.x > midfield.x\nFOR LAST 2 ENTRIES\nTHEN PRINT(\"pressing\")\nEVERY 1 SECONDS",
//! )
//! .unwrap();
//!
//! let mut output: Vec<String> = Vec::new();
//! for time in [0.0, 0.1, 0.2] {
//!     // Query-language x is the replay's native y axis
//!     let event = Event::new(time).with_ball(0.0, 250.0);
//!     manager.add_message(&event, &mut output);
//! }
//! assert_eq!(output, vec!["pressing", "pressing"]);
//! ```

// Public modules
pub mod condition;
pub mod config;
pub mod extractor;
pub mod manager;
pub mod query;
pub mod replay;
pub mod types;

// Re-export main types for convenience
pub use condition::Condition;
pub use config::ExtractorConfig;
pub use extractor::{EventIterator, ExtractionStats, FrameExtractor};
pub use manager::{parse_batch, split_blocks, ManagerStats, OutputSink, QueryManager};
pub use query::window::{Window, WindowKind, WindowPhase, WindowState};
pub use query::{
    Emission, Query, DEFAULT_QUERIES, DIAGNOSTIC_PREFIX, EVALUATION_ERROR_MESSAGE, TUTORIAL,
};
pub use replay::players::{PlayerInfo, Team};
pub use types::{
    ConditionResult, EvaluationError, Event, Position, QueryBatchError, QueryParseError,
    ReplayError, Result, Seconds,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
