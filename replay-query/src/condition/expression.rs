//! Restricted expression language
//!
//! A recursive-descent parser and evaluator for conditions built only from
//! numeric/boolean literals, operands, arithmetic, comparisons and boolean
//! connectives. There are no calls, no attribute access and no names beyond
//! the operand vocabulary, so nothing in condition text can reach anything
//! other than the numbers handed to [`Expr::evaluate`].
//!
//! Precedence, loosest first:
//!
//! ```text
//! or  →  and  →  not  →  comparison (chained)  →  + -  →  * / // %  →  unary + -  →  **
//! ```

use super::lexer::{tokenize, Token, TokenKind};
use super::operand::Operand;
use crate::types::EvaluationError;

type EvalResult<T> = std::result::Result<T, EvaluationError>;

/// Deepest allowed nesting of parentheses and prefix operators
pub const MAX_NESTING: usize = 64;

/// Longest condition accepted, in tokens; bounds the depth of operator chains
pub const MAX_TOKENS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
}

/// Parsed condition
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Bool(bool),
    Operand(Operand),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `a < b <= c` holds when every adjacent pair holds
    Compare(Box<Expr>, Vec<(CompareOp, Expr)>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// Runtime value of a sub-expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
}

impl Value {
    /// Numbers are truthy when non-zero
    pub fn truthy(self) -> bool {
        match self {
            Value::Number(n) => n != 0.0,
            Value::Bool(b) => b,
        }
    }

    fn number(self, context: &str) -> EvalResult<f64> {
        match self {
            Value::Number(n) => Ok(n),
            Value::Bool(_) => Err(EvaluationError::TypeMismatch(format!(
                "{} expects numbers, got a boolean",
                context
            ))),
        }
    }
}

impl Expr {
    /// Parse condition text into an expression tree
    pub fn parse(text: &str) -> EvalResult<Expr> {
        Self::from_tokens(tokenize(text))
    }

    pub(crate) fn from_tokens(tokens: Vec<Token>) -> EvalResult<Expr> {
        if tokens.len() > MAX_TOKENS {
            return Err(EvaluationError::Syntax(format!(
                "condition too long ({} tokens, at most {})",
                tokens.len(),
                MAX_TOKENS
            )));
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser.parse_or()?;
        match parser.peek() {
            None => Ok(expr),
            Some(kind) => Err(EvaluationError::Syntax(format!("unexpected {:?} after expression", kind))),
        }
    }

    /// Evaluate with operand values supplied by `lookup`
    pub fn evaluate<F>(&self, lookup: &F) -> EvalResult<Value>
    where
        F: Fn(Operand) -> Option<f64>,
    {
        match self {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Operand(op) => lookup(*op)
                .map(Value::Number)
                .ok_or_else(|| EvaluationError::Unresolved(op.to_string())),
            Expr::Unary(op, inner) => {
                let value = inner.evaluate(lookup)?.number("unary operator")?;
                Ok(Value::Number(match op {
                    UnaryOp::Neg => -value,
                    UnaryOp::Pos => value,
                }))
            }
            Expr::Binary(op, lhs, rhs) => {
                let a = lhs.evaluate(lookup)?.number("arithmetic")?;
                let b = rhs.evaluate(lookup)?.number("arithmetic")?;
                arithmetic(*op, a, b).map(Value::Number)
            }
            Expr::Compare(first, rest) => {
                let mut left = first.evaluate(lookup)?;
                for (op, expr) in rest {
                    let right = expr.evaluate(lookup)?;
                    if !compare(*op, left, right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::Not(inner) => Ok(Value::Bool(!inner.evaluate(lookup)?.truthy())),
            Expr::And(lhs, rhs) => {
                if !lhs.evaluate(lookup)?.truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(rhs.evaluate(lookup)?.truthy()))
            }
            Expr::Or(lhs, rhs) => {
                if lhs.evaluate(lookup)?.truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(rhs.evaluate(lookup)?.truthy()))
            }
        }
    }
}

fn arithmetic(op: BinaryOp, a: f64, b: f64) -> EvalResult<f64> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(EvaluationError::DivisionByZero);
            }
            a / b
        }
        BinaryOp::FloorDiv => {
            if b == 0.0 {
                return Err(EvaluationError::DivisionByZero);
            }
            (a / b).floor()
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Err(EvaluationError::DivisionByZero);
            }
            // Result takes the sign of the divisor
            a - b * (a / b).floor()
        }
        BinaryOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(EvaluationError::DivisionByZero);
            }
            a.powf(b)
        }
    };
    if result.is_nan() {
        return Err(EvaluationError::TypeMismatch(format!(
            "{:?} of {} and {} is not a real number",
            op, a, b
        )));
    }
    Ok(result)
}

fn compare(op: CompareOp, left: Value, right: Value) -> EvalResult<bool> {
    match (op, left, right) {
        (CompareOp::Equal, Value::Bool(a), Value::Bool(b)) => Ok(a == b),
        (CompareOp::NotEqual, Value::Bool(a), Value::Bool(b)) => Ok(a != b),
        (_, Value::Number(a), Value::Number(b)) => Ok(match op {
            CompareOp::Less => a < b,
            CompareOp::Greater => a > b,
            CompareOp::LessEqual => a <= b,
            CompareOp::GreaterEqual => a >= b,
            CompareOp::Equal => a == b,
            CompareOp::NotEqual => a != b,
        }),
        _ => Err(EvaluationError::TypeMismatch(format!(
            "cannot apply {:?} to {:?} and {:?}",
            op, left, right
        ))),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Current nesting of parentheses and prefix operators
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<TokenKind> {
        let kind = self.tokens.get(self.pos).map(|t| t.kind.clone());
        if kind.is_some() {
            self.pos += 1;
        }
        kind
    }

    /// Run `parse` one nesting level deeper
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> EvalResult<T>) -> EvalResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(EvaluationError::Syntax("condition nested too deeply".to_string()));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn eat(&mut self, expected: &TokenKind) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> EvalResult<Expr> {
        let mut expr = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let rhs = self.parse_and()?;
            expr = Expr::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> EvalResult<Expr> {
        let mut expr = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            let rhs = self.parse_not()?;
            expr = Expr::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_not(&mut self) -> EvalResult<Expr> {
        if self.eat(&TokenKind::Not) {
            let inner = self.nested(Self::parse_not)?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> EvalResult<Expr> {
        let first = self.parse_sum()?;
        let mut rest = Vec::new();
        while let Some(op) = self.peek().and_then(compare_op) {
            self.pos += 1;
            rest.push((op, self.parse_sum()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare(Box::new(first), rest))
        }
    }

    fn parse_sum(&mut self) -> EvalResult<Expr> {
        let mut expr = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => return Ok(expr),
            };
            self.pos += 1;
            let rhs = self.parse_term()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(rhs));
        }
    }

    fn parse_term(&mut self) -> EvalResult<Expr> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::DoubleSlash) => BinaryOp::FloorDiv,
                Some(TokenKind::Percent) => BinaryOp::Mod,
                _ => return Ok(expr),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            expr = Expr::Binary(op, Box::new(expr), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> EvalResult<Expr> {
        let op = match self.peek() {
            Some(TokenKind::Minus) => UnaryOp::Neg,
            Some(TokenKind::Plus) => UnaryOp::Pos,
            _ => return self.parse_power(),
        };
        self.pos += 1;
        let inner = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary(op, Box::new(inner)))
    }

    fn parse_power(&mut self) -> EvalResult<Expr> {
        let base = self.parse_atom()?;
        if self.eat(&TokenKind::Power) {
            // Right-associative, and binds tighter than a unary minus on its left
            let exponent = self.nested(Self::parse_unary)?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> EvalResult<Expr> {
        match self.advance() {
            Some(TokenKind::Number(n)) => Ok(Expr::Number(n)),
            Some(TokenKind::True) => Ok(Expr::Bool(true)),
            Some(TokenKind::False) => Ok(Expr::Bool(false)),
            Some(TokenKind::Operand(op)) => Ok(Expr::Operand(op)),
            Some(TokenKind::LeftParen) => {
                let inner = self.nested(Self::parse_or)?;
                if !self.eat(&TokenKind::RightParen) {
                    return Err(EvaluationError::Syntax("missing ')'".to_string()));
                }
                Ok(inner)
            }
            Some(TokenKind::Name(name)) => Err(EvaluationError::UnknownName(name)),
            Some(TokenKind::Invalid(err)) => Err(err),
            Some(other) => Err(EvaluationError::Syntax(format!("unexpected {:?}", other))),
            None => Err(EvaluationError::Syntax("unexpected end of condition".to_string())),
        }
    }
}

fn compare_op(kind: &TokenKind) -> Option<CompareOp> {
    match kind {
        TokenKind::Less => Some(CompareOp::Less),
        TokenKind::Greater => Some(CompareOp::Greater),
        TokenKind::LessEqual => Some(CompareOp::LessEqual),
        TokenKind::GreaterEqual => Some(CompareOp::GreaterEqual),
        TokenKind::Equal => Some(CompareOp::Equal),
        TokenKind::NotEqual => Some(CompareOp::NotEqual),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::operand::Axis;

    fn eval(text: &str) -> EvalResult<Value> {
        Expr::parse(text)?.evaluate(&|_| None)
    }

    fn eval_with(text: &str, ball_x: f64) -> EvalResult<Value> {
        Expr::parse(text)?.evaluate(&|op| match op {
            Operand::Ball(Axis::X) => Some(ball_x),
            Operand::Midfield => Some(0.0),
            _ => None,
        })
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(eval("1 + 2 * 3 == 7"), Ok(Value::Bool(true)));
        assert_eq!(eval("(1 + 2) * 3"), Ok(Value::Number(9.0)));
        assert_eq!(eval("-2 ** 2"), Ok(Value::Number(-4.0)));
        assert_eq!(eval("2 ** 3 ** 2"), Ok(Value::Number(512.0)));
        assert_eq!(eval("7 // 2"), Ok(Value::Number(3.0)));
        assert_eq!(eval("-7 % 3"), Ok(Value::Number(2.0)));
    }

    #[test]
    fn test_boolean_connectives() {
        assert_eq!(eval("1 < 2 and 3 > 4"), Ok(Value::Bool(false)));
        assert_eq!(eval("1 < 2 or 3 > 4"), Ok(Value::Bool(true)));
        assert_eq!(eval("not 1 < 2"), Ok(Value::Bool(false)));
        assert_eq!(eval("not false and true"), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_short_circuit_skips_errors() {
        assert_eq!(eval("false and 1 / 0 > 0"), Ok(Value::Bool(false)));
        assert_eq!(eval("true or 1 / 0 > 0"), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_chained_comparison() {
        assert_eq!(eval_with("-100 < ball.x < 100", 5.0), Ok(Value::Bool(true)));
        assert_eq!(eval_with("-100 < ball.x < 100", 500.0), Ok(Value::Bool(false)));
        assert_eq!(eval_with("ball.x < midfield.x", -1.0), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_errors() {
        assert_eq!(eval("1 / 0 > 0"), Err(EvaluationError::DivisionByZero));
        assert_eq!(eval("1 % 0"), Err(EvaluationError::DivisionByZero));
        assert_eq!(eval("foo > 1"), Err(EvaluationError::UnknownName("foo".to_string())));
        assert!(matches!(eval("true + 1"), Err(EvaluationError::TypeMismatch(_))));
        assert!(matches!(eval("true < 1"), Err(EvaluationError::TypeMismatch(_))));
        assert!(matches!(eval("1 <"), Err(EvaluationError::Syntax(_))));
        assert!(matches!(eval("(1 < 2"), Err(EvaluationError::Syntax(_))));
        assert!(matches!(eval("1 2"), Err(EvaluationError::Syntax(_))));
        assert!(matches!(eval(""), Err(EvaluationError::Syntax(_))));
    }

    #[test]
    fn test_no_code_paths_from_text() {
        // Call syntax and attribute access are not part of the grammar
        assert!(eval("__import__('os').system('true')").is_err());
        assert!(eval("print(1)").is_err());
        assert!(eval("(1).real").is_err());
    }

    #[test]
    fn test_unresolved_operand() {
        assert_eq!(
            Expr::parse("ball.y > 0").unwrap().evaluate(&|_| None),
            Err(EvaluationError::Unresolved("ball.y".to_string()))
        );
    }

    #[test]
    fn test_nesting_limit() {
        let shallow = format!("{}1 > 0{}", "(".repeat(MAX_NESTING - 1), ")".repeat(MAX_NESTING - 1));
        assert_eq!(eval(&shallow), Ok(Value::Bool(true)));

        let nested: EvalResult<Value> = Err(EvaluationError::Syntax("condition nested too deeply".to_string()));
        let deep = format!("{}1 > 0{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        assert_eq!(eval(&deep), nested);
        assert_eq!(eval(&format!("{}1 > 0", "not ".repeat(MAX_NESTING + 1))), nested);
        assert_eq!(eval(&format!("{}1", "-".repeat(MAX_NESTING + 1))), nested);
        assert_eq!(eval(&format!("2{}", " ** 2".repeat(MAX_NESTING + 1))), nested);
    }

    #[test]
    fn test_huge_conditions_are_rejected_not_overflowed() {
        for text in [
            format!("{}ball.x > 0", "not ".repeat(10_000)),
            format!("{}ball.x > 0{}", "(".repeat(10_000), ")".repeat(10_000)),
            format!("ball.x{} > 0", " + 1".repeat(100_000)),
            format!("ball.x > 0{}", " and true".repeat(100_000)),
        ] {
            assert!(matches!(eval_with(&text, 1.0), Err(EvaluationError::Syntax(_))));
        }
    }
}
