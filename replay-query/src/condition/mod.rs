//! Condition compilation and evaluation
//!
//! A [`Condition`] is built once from the IF clause text. Construction swaps the
//! x/y axes of every dynamic operand (the replay stores positions with the two
//! axes reversed relative to the query language), records which operands are
//! referenced, and parses the expression. A condition that fails to parse is
//! still a valid condition: it reports [`ConditionResult::Error`] on every
//! decidable event.

pub mod expression;
pub mod lexer;
pub mod operand;

use crate::types::{ConditionResult, EvaluationError, Event};
use expression::Expr;
use lexer::{tokenize, TokenKind};
use operand::Operand;

/// A compiled condition
#[derive(Debug, Clone)]
pub struct Condition {
    /// Condition text after the axis swap
    text: String,
    /// Dynamic operands referenced in the text, in first-use order
    referenced: Vec<Operand>,
    compiled: std::result::Result<Expr, EvaluationError>,
}

impl Condition {
    /// Compile condition text, applying the axis swap exactly once
    pub fn new(text: &str) -> Self {
        let text = swap_axes(&text.to_lowercase());
        let tokens = tokenize(&text);

        let mut referenced = Vec::new();
        for token in &tokens {
            if let TokenKind::Operand(op) = token.kind {
                if op.is_dynamic() && !referenced.contains(&op) {
                    referenced.push(op);
                }
            }
        }

        let compiled = Expr::from_tokens(tokens);
        if let Err(e) = &compiled {
            log::debug!("Condition '{}' does not compile: {}", text, e);
        }

        Self {
            text,
            referenced,
            compiled,
        }
    }

    /// Condition text as evaluated (axes already swapped)
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Dynamic operands this condition needs from an event
    pub fn referenced_operands(&self) -> &[Operand] {
        &self.referenced
    }

    /// True if the condition text parsed into an expression
    pub fn is_well_formed(&self) -> bool {
        self.compiled.is_ok()
    }

    /// Why the condition text did not parse, if it did not
    pub fn compile_error(&self) -> Option<&EvaluationError> {
        self.compiled.as_ref().err()
    }

    /// Evaluate against one event, keeping the error detail
    ///
    /// Returns `Ok(None)` when a referenced operand is missing from the event.
    pub fn try_evaluate(&self, event: &Event) -> std::result::Result<Option<bool>, EvaluationError> {
        // Resolve every referenced operand up front; only plain numbers reach the evaluator
        let mut values: Vec<(Operand, f64)> = Vec::with_capacity(self.referenced.len());
        for op in &self.referenced {
            match op.resolve(event) {
                Some(value) => values.push((*op, value)),
                None => return Ok(None),
            }
        }

        let expr = self.compiled.as_ref().map_err(|e| e.clone())?;
        let lookup = |op: Operand| -> Option<f64> {
            match op {
                Operand::Midfield => Some(operand::MIDFIELD),
                _ => values.iter().find(|(known, _)| *known == op).map(|(_, v)| *v),
            }
        };
        expr.evaluate(&lookup).map(|value| Some(value.truthy()))
    }

    /// Evaluate against one event
    pub fn evaluate(&self, event: &Event) -> ConditionResult {
        match self.try_evaluate(event) {
            Ok(Some(true)) => ConditionResult::Correct,
            Ok(Some(false)) => ConditionResult::Incorrect,
            Ok(None) => ConditionResult::Incomplete,
            Err(e) => {
                log::warn!("Error evaluating condition '{}' at t={}: {}", self.text, event.time, e);
                ConditionResult::Error
            }
        }
    }
}

/// Swap `.x` and `.y` on every dynamic operand in the text
///
/// Works on operand tokens, so each operand is rewritten exactly once and all
/// other text (including unknown names) is left untouched.
pub fn swap_axes(text: &str) -> String {
    let mut swapped = String::with_capacity(text.len());
    let mut last = 0;
    for token in tokenize(text) {
        if let TokenKind::Operand(op) = token.kind {
            if op.is_dynamic() {
                swapped.push_str(&text[last..token.span.start]);
                swapped.push_str(&op.with_swapped_axis().to_string());
                last = token.span.end;
            }
        }
    }
    swapped.push_str(&text[last..]);
    swapped
}
