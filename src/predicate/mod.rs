// src/predicate/mod.rs — Stage predicates
//
// A predicate is a small boolean expression over the bindings `token` and
// `result`. It is compiled once (when the stage set loads) and then evaluated
// for every candidate. Nothing in here executes code from the predicate text:
// the grammar only knows literals, the two bindings, comparison and boolean
// operators and a fixed set of string helpers.

pub mod ast;
mod interp;
mod parser;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use interp::{utf8_bits, Value};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredicateError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("unknown name '{0}' (only `token` and `result` are bound)")]
    UnknownName(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{func}() takes {expected} argument(s), got {got}")]
    Arity {
        func: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("type error: {0}")]
    Type(String),

    #[error("predicate is empty")]
    Empty,
}

/// A compiled stage predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    source: String,
    expr: ast::Expr,
}

impl Predicate {
    pub fn compile(source: &str) -> Result<Self, PredicateError> {
        let expr = parser::parse(source)?;
        Ok(Self {
            source: source.trim().to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against a token/response pair, surfacing runtime errors.
    pub fn eval(&self, token: &str, result: &str) -> Result<bool, PredicateError> {
        let env = interp::Env { token, result };
        interp::eval(&self.expr, &env).map(|v| v.truthy())
    }

    /// Verdict used by the pipeline. A runtime error counts as `false`, which
    /// keeps the token in the candidate pool.
    pub fn verdict(&self, token: &str, result: &str) -> bool {
        match self.eval(token, result) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(
                    predicate = %self.source,
                    token = ?token,
                    "Predicate evaluation failed, treating as not passed: {e}"
                );
                false
            }
        }
    }
}

impl FromStr for Predicate {
    type Err = PredicateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Compile and evaluate in one go. Any failure, including a malformed
/// expression, yields `false`.
pub fn evaluate(source: &str, token: &str, result: &str) -> bool {
    match Predicate::compile(source) {
        Ok(predicate) => predicate.verdict(token, result),
        Err(e) => {
            tracing::warn!(predicate = %source, "Predicate does not compile: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_passes_membership() {
        let p = Predicate::compile("token in result").unwrap();
        assert!(p.verdict("Banana", "Sure: Banana"));
        assert!(!p.verdict("Banana", "I cannot do that"));
    }

    #[test]
    fn test_binary_helper_matches_bit_rendering() {
        let p = Predicate::compile("binary(token) in result").unwrap();
        assert!(p.verdict("A", "The bits are 01000001."));
        assert!(!p.verdict("A", "The bits are 01000010."));
    }

    #[test]
    fn test_runtime_error_fails_closed() {
        let p = Predicate::compile("int(result) > 3").unwrap();
        assert!(p.eval("x", "not a number").is_err());
        assert!(!p.verdict("x", "not a number"));
    }

    #[test]
    fn test_negated_runtime_error_still_fails_closed() {
        // The error short-circuits the whole expression; `not` never turns it into true.
        let p = Predicate::compile("not (token < 3)").unwrap();
        assert!(!p.verdict("abc", "abc"));
    }

    #[test]
    fn test_evaluate_malformed_is_false() {
        assert!(!evaluate("token in", "a", "a"));
        assert!(!evaluate("__import__('os')", "a", "a"));
        assert!(evaluate("token == result", "a", "a"));
    }

    #[test]
    fn test_source_is_trimmed_and_displayed() {
        let p: Predicate = "  token in result ".parse().unwrap();
        assert_eq!(p.source(), "token in result");
        assert_eq!(p.to_string(), "token in result");
    }

    #[test]
    fn test_control_characters_in_token() {
        let p = Predicate::compile("token in result").unwrap();
        assert!(p.verdict("\u{0}\t", "echo: \u{0}\t"));
        assert!(p.verdict("", "anything"));
    }
}
