//! Query manager
//!
//! Holds the queries of one run in registration order and fans each event out
//! to all of them. Outputs are forwarded to an [`OutputSink`] in that same
//! order. A manager is meant to be built fresh for every run; it is not shared
//! between threads.

use crate::query::{Emission, Query};
use crate::types::{Event, QueryBatchError};

/// Destination for query output, one string per emission or diagnostic
pub trait OutputSink {
    fn emit(&mut self, output: &str);
}

impl OutputSink for Vec<String> {
    fn emit(&mut self, output: &str) {
        self.push(output.to_string());
    }
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn emit(&mut self, output: &str) {
        (**self).emit(output);
    }
}

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerStats {
    pub events: usize,
    pub messages: usize,
    pub diagnostics: usize,
}

/// Ordered collection of queries
#[derive(Debug, Default)]
pub struct QueryManager {
    queries: Vec<Query>,
    stats: ManagerStats,
}

impl QueryManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a batch of blank-line separated queries into a fresh manager
    pub fn from_batch(text: &str) -> std::result::Result<Self, QueryBatchError> {
        let mut manager = Self::new();
        for query in parse_batch(text)? {
            manager.add_query(query);
        }
        Ok(manager)
    }

    /// Register a query after all existing ones
    pub fn add_query(&mut self, query: Query) {
        self.queries.push(query);
    }

    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn stats(&self) -> ManagerStats {
        self.stats
    }

    /// Feed one event to every query, collecting outputs in registration order
    pub fn evaluate(&mut self, event: &Event) -> Vec<Emission> {
        self.stats.events += 1;
        let emissions: Vec<Emission> = self
            .queries
            .iter_mut()
            .filter_map(|query| query.add_message(event))
            .collect();
        for emission in &emissions {
            if emission.is_diagnostic() {
                self.stats.diagnostics += 1;
            } else {
                self.stats.messages += 1;
            }
        }
        emissions
    }

    /// Feed one event and forward its outputs to `sink`; returns how many were forwarded
    pub fn add_message<S: OutputSink + ?Sized>(&mut self, event: &Event, sink: &mut S) -> usize {
        let emissions = self.evaluate(event);
        for emission in &emissions {
            log::trace!("t={}: {}", event.time, emission);
            sink.emit(emission.text());
        }
        emissions.len()
    }
}

/// Split query text into blocks separated by blank lines
pub fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }
    blocks
}

/// Parse every block of a batch, failing on the first malformed one
pub fn parse_batch(text: &str) -> std::result::Result<Vec<Query>, QueryBatchError> {
    let queries = split_blocks(text)
        .iter()
        .enumerate()
        .map(|(index, block)| {
            Query::parse(block).map_err(|source| QueryBatchError {
                position: index + 1,
                source,
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    log::info!("Parsed {} queries", queries.len());
    Ok(queries)
}
