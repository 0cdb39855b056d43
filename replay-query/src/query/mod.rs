//! Continuous queries over the event stream
//!
//! A [`Query`] is parsed once from text and then fed every event of a run in
//! time order. Each event either extends, resets or leaves alone the query's
//! window, and may produce an [`Emission`].

pub mod parser;
pub mod window;

use crate::condition::Condition;
use crate::types::{ConditionResult, Event, QueryParseError, Seconds};
use parser::QueryDefinition;
use std::fmt;
use std::str::FromStr;
use window::{Window, WindowKind, WindowState};

/// Marks diagnostic output; PRINT messages may not start with it
pub const DIAGNOSTIC_PREFIX: &str = "!!";

/// Output produced when a condition cannot be evaluated for an event
pub const EVALUATION_ERROR_MESSAGE: &str = "!! Error evaluating query condition!";

/// Help text describing the query language
pub const TUTORIAL: &str = "QUERY FORMAT:
  IF condition
  FOR LAST x time_window
  THEN PRINT(\"message\")
  EVERY delay SECONDS

TERMINOLOGY:
- condition: a boolean expression over predefined operands, numbers, true/false,
  comparisons (< > <= >= == !=), arithmetic (+ - * / // % **), and/or/not, parentheses;
- predefined operands:
  - ball.x;
  - ball.y;
  - player.1/2/3/4/5/6.x;
  - player.1/2/3/4/5/6.y;
  - midfield.x (0);
- x: number
- time_window: 'SECONDS' or 'ENTRIES'
- message: a string printed when the condition is true 'FOR the LAST x SECONDS/ENTRIES'
- delay: the message will be printed AT MOST every 'delay' seconds (SECONDS windows)

Lines starting with '!!' report a condition that could not be evaluated; messages
may not start with '!!'.

You can start multiple queries at once; separate them by a blank line.
";

/// Query set used when none is supplied
pub const DEFAULT_QUERIES: &str = "IF ball.x < midfield.x
FOR LAST 2 SECONDS
THEN PRINT(\"Left team defending\")
EVERY 1 SECONDS

IF ball.x > midfield.x
FOR LAST 2 SECONDS
THEN PRINT(\"Right team defending\")
EVERY 1 SECONDS

IF player.3.x > midfield.x and player.5.x > midfield.x and player.6.x > midfield.x
FOR LAST 1 SECONDS
THEN PRINT(\"Entire orange team is offensive\")
EVERY 0.5 SECONDS";

/// Something a query produced for one event
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    /// The query's PRINT message
    Message(String),
    /// The condition could not be evaluated for this event
    Diagnostic,
}

impl Emission {
    pub fn text(&self) -> &str {
        match self {
            Emission::Message(message) => message,
            Emission::Diagnostic => EVALUATION_ERROR_MESSAGE,
        }
    }

    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Emission::Diagnostic)
    }
}

impl fmt::Display for Emission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// One continuous query with its window state
#[derive(Debug, Clone)]
pub struct Query {
    definition: QueryDefinition,
    condition: Condition,
    state: WindowState,
}

impl Query {
    /// Parse a query block and compile its condition
    pub fn parse(text: &str) -> std::result::Result<Self, QueryParseError> {
        parser::parse_query(text).map(Self::from_definition)
    }

    /// Build a query from already-parsed clauses, starting idle
    pub fn from_definition(definition: QueryDefinition) -> Self {
        let condition = Condition::new(&definition.condition);
        log::debug!(
            "Query '{}' FOR {} EVERY {} SECONDS -> \"{}\"",
            condition.text(),
            definition.window,
            definition.delay,
            definition.message
        );
        Self {
            definition,
            condition,
            state: WindowState::new(),
        }
    }

    /// Condition text as evaluated, with operand axes swapped
    pub fn condition(&self) -> &str {
        self.condition.text()
    }

    pub fn compiled_condition(&self) -> &Condition {
        &self.condition
    }

    pub fn definition(&self) -> &QueryDefinition {
        &self.definition
    }

    pub fn window(&self) -> &Window {
        &self.definition.window
    }

    pub fn window_kind(&self) -> WindowKind {
        self.definition.window.kind
    }

    pub fn threshold(&self) -> f64 {
        self.definition.window.threshold
    }

    pub fn message(&self) -> &str {
        &self.definition.message
    }

    pub fn delay(&self) -> Seconds {
        self.definition.delay
    }

    pub fn state(&self) -> &WindowState {
        &self.state
    }

    /// Feed one event; returns what the query emits for it, if anything
    pub fn add_message(&mut self, event: &Event) -> Option<Emission> {
        match self.condition.evaluate(event) {
            ConditionResult::Error => Some(Emission::Diagnostic),
            ConditionResult::Incomplete => None,
            ConditionResult::Incorrect => {
                self.state.reset();
                None
            }
            ConditionResult::Correct => {
                let window = self.definition.window;
                if self.state.record_fit(&window, self.definition.delay, event.time) {
                    log::trace!("Query '{}' triggered at t={}", self.condition.text(), event.time);
                    Some(Emission::Message(self.definition.message.clone()))
                } else {
                    None
                }
            }
        }
    }
}

impl FromStr for Query {
    type Err = QueryParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Query::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use window::WindowPhase;

    fn ball_y(time: f64, y: f64) -> Event {
        // Query-language ball.x reads the native y axis
        Event::new(time).with_ball(0.0, y)
    }

    #[test]
    fn test_parse_swaps_condition_axes() {
        let query: Query = "IF ball.x < midfield.x\nFOR LAST 2 SECONDS\nTHEN PRINT(\"msg\")\nEVERY 1 SECONDS"
            .parse()
            .unwrap();
        assert_eq!(query.window_kind(), WindowKind::Seconds);
        assert_eq!(query.threshold(), 2.0);
        assert_eq!(query.delay(), 1.0);
        assert_eq!(query.message(), "msg");
        assert_eq!(query.condition(), "ball.y < midfield.x");
        assert_eq!(query.definition().condition, "ball.x < midfield.x");
    }

    #[test]
    fn test_incorrect_resets_streak() {
        let mut query = Query::parse("IF ball.x > 0 FOR LAST 3 ENTRIES THEN PRINT(\"x\") EVERY 0 SECONDS").unwrap();
        assert_eq!(query.add_message(&ball_y(0.0, 1.0)), None);
        assert_eq!(query.add_message(&ball_y(0.1, 1.0)), None);
        assert_eq!(query.state().fit_count, 2);
        assert_eq!(query.add_message(&ball_y(0.2, -1.0)), None);
        assert_eq!(query.state().fit_count, 0);
        assert_eq!(query.state().phase(), WindowPhase::Idle);
        assert_eq!(query.add_message(&ball_y(0.3, 1.0)), None);
        assert_eq!(query.add_message(&ball_y(0.4, 1.0)), None);
        assert_eq!(
            query.add_message(&ball_y(0.5, 1.0)),
            Some(Emission::Message("x".to_string()))
        );
    }

    #[test]
    fn test_incomplete_freezes_state() {
        let mut query = Query::parse("IF ball.x > 0 FOR LAST 3 ENTRIES THEN PRINT(\"x\") EVERY 0 SECONDS").unwrap();
        query.add_message(&ball_y(0.0, 1.0));
        query.add_message(&ball_y(0.1, 1.0));
        let before = *query.state();
        assert_eq!(query.add_message(&Event::new(0.2)), None);
        assert_eq!(*query.state(), before);
        assert_eq!(
            query.add_message(&ball_y(0.3, 1.0)),
            Some(Emission::Message("x".to_string()))
        );
    }

    #[test]
    fn test_error_emits_diagnostic_without_touching_state() {
        let mut query = Query::parse("IF ball.x / 0 > 1 FOR LAST 1 ENTRIES THEN PRINT(\"x\") EVERY 0 SECONDS").unwrap();
        let before = *query.state();
        let emission = query.add_message(&ball_y(0.0, 1.0));
        assert_eq!(emission, Some(Emission::Diagnostic));
        assert_eq!(emission.map(|e| e.to_string()), Some(EVALUATION_ERROR_MESSAGE.to_string()));
        assert_eq!(*query.state(), before);
    }

    #[test]
    fn test_default_queries_parse() {
        let blocks: Vec<&str> = DEFAULT_QUERIES.split("\n\n").collect();
        assert_eq!(blocks.len(), 3);
        for block in blocks {
            assert!(Query::parse(block).is_ok(), "failed to parse {:?}", block);
        }
    }

    #[test]
    fn test_diagnostic_cannot_be_forged() {
        assert!(EVALUATION_ERROR_MESSAGE.starts_with(DIAGNOSTIC_PREFIX));
        assert_eq!(
            Query::parse("IF ball.x > 0 FOR LAST 1 ENTRIES THEN PRINT(\"!! Error evaluating query condition!\") EVERY 0 SECONDS")
                .unwrap_err(),
            QueryParseError::ReservedMessage
        );
        // Without the marker the same words are an ordinary message
        let mut query =
            Query::parse("IF ball.x > 0 FOR LAST 1 ENTRIES THEN PRINT(\"Error evaluating query condition!\") EVERY 0 SECONDS")
                .unwrap();
        let emission = query.add_message(&ball_y(0.0, 1.0)).unwrap();
        assert!(!emission.is_diagnostic());
        assert_ne!(emission.text(), EVALUATION_ERROR_MESSAGE);
    }

    #[test]
    fn test_message_keeps_case() {
        let query = Query::parse("if ball.x > 0 for last 1 seconds then print(\"Left Team\") every 1 seconds").unwrap();
        assert_eq!(query.message(), "Left Team");
    }
}
