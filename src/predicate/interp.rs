// src/predicate/interp.rs — Tree-walking interpreter over the predicate AST

use super::ast::{Binding, CmpOp, Expr, Func};
use super::PredicateError;

/// Runtime value. Predicates only ever see strings, integers and booleans.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl Value {
    /// Python-style truthiness.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Int(n) => *n != 0,
            Value::Bool(b) => *b,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
        }
    }

    fn render(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
        }
    }
}

pub(crate) struct Env<'a> {
    pub token: &'a str,
    pub result: &'a str,
}

fn type_error(message: String) -> PredicateError {
    PredicateError::Type(message)
}

pub(crate) fn eval(expr: &Expr, env: &Env<'_>) -> Result<Value, PredicateError> {
    match expr {
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Var(Binding::Token) => Ok(Value::Str(env.token.to_string())),
        Expr::Var(Binding::Result) => Ok(Value::Str(env.result.to_string())),
        Expr::Neg(inner) => match eval(inner, env)? {
            Value::Int(n) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| type_error("integer overflow".into())),
            other => Err(type_error(format!("cannot negate {}", other.type_name()))),
        },
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, env)?.truthy())),
        Expr::And(lhs, rhs) => {
            if !eval(lhs, env)?.truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval(rhs, env)?.truthy()))
        }
        Expr::Or(lhs, rhs) => {
            if eval(lhs, env)?.truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval(rhs, env)?.truthy()))
        }
        Expr::Add(lhs, rhs) => match (eval(lhs, env)?, eval(rhs, env)?) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(b)
                .map(Value::Int)
                .ok_or_else(|| type_error("integer overflow".into())),
            (a, b) => Err(type_error(format!(
                "cannot add {} and {}",
                a.type_name(),
                b.type_name()
            ))),
        },
        Expr::Compare { op, lhs, rhs } => {
            let lhs = eval(lhs, env)?;
            let rhs = eval(rhs, env)?;
            compare(*op, &lhs, &rhs).map(Value::Bool)
        }
        Expr::Call { func, args } => {
            let values = args
                .iter()
                .map(|a| eval(a, env))
                .collect::<Result<Vec<_>, _>>()?;
            call(*func, &values)
        }
    }
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<bool, PredicateError> {
    use std::cmp::Ordering;

    let ordering = || -> Result<Ordering, PredicateError> {
        match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (a, b) => Err(type_error(format!(
                "cannot order {} and {}",
                a.type_name(),
                b.type_name()
            ))),
        }
    };

    match op {
        // Mixed types are simply unequal.
        CmpOp::Eq => Ok(lhs == rhs),
        CmpOp::Ne => Ok(lhs != rhs),
        CmpOp::Lt => Ok(ordering()? == Ordering::Less),
        CmpOp::Le => Ok(ordering()? != Ordering::Greater),
        CmpOp::Gt => Ok(ordering()? == Ordering::Greater),
        CmpOp::Ge => Ok(ordering()? != Ordering::Less),
        CmpOp::In => contains(rhs, lhs),
        CmpOp::NotIn => contains(rhs, lhs).map(|found| !found),
    }
}

fn contains(haystack: &Value, needle: &Value) -> Result<bool, PredicateError> {
    match (haystack, needle) {
        (Value::Str(h), Value::Str(n)) => Ok(h.contains(n.as_str())),
        (h, n) => Err(type_error(format!(
            "'in' needs two strings, got {} in {}",
            n.type_name(),
            h.type_name()
        ))),
    }
}

fn expect_str(func: Func, value: &Value) -> Result<&str, PredicateError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(type_error(format!(
            "{}() expects a string, got {}",
            func.name(),
            other.type_name()
        ))),
    }
}

fn call(func: Func, args: &[Value]) -> Result<Value, PredicateError> {
    let value = match func {
        Func::Len => Value::Int(expect_str(func, &args[0])?.chars().count() as i64),
        Func::Lower => Value::Str(expect_str(func, &args[0])?.to_lowercase()),
        Func::Upper => Value::Str(expect_str(func, &args[0])?.to_uppercase()),
        Func::Strip => Value::Str(expect_str(func, &args[0])?.trim().to_string()),
        Func::Contains => {
            Value::Bool(expect_str(func, &args[0])?.contains(expect_str(func, &args[1])?))
        }
        Func::StartsWith => {
            Value::Bool(expect_str(func, &args[0])?.starts_with(expect_str(func, &args[1])?))
        }
        Func::EndsWith => {
            Value::Bool(expect_str(func, &args[0])?.ends_with(expect_str(func, &args[1])?))
        }
        Func::Binary => Value::Str(utf8_bits(expect_str(func, &args[0])?, " ")),
        Func::Bits => Value::Str(utf8_bits(expect_str(func, &args[0])?, "")),
        Func::Str => Value::Str(args[0].render()),
        Func::Int => match &args[0] {
            Value::Int(n) => Value::Int(*n),
            Value::Bool(b) => Value::Int(i64::from(*b)),
            Value::Str(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| type_error(format!("int() cannot parse {s:?}")))?,
        },
    };
    Ok(value)
}

/// UTF-8 bytes of `s`, each rendered as eight binary digits.
pub fn utf8_bits(s: &str, separator: &str) -> String {
    s.as_bytes()
        .iter()
        .map(|b| format!("{b:08b}"))
        .collect::<Vec<_>>()
        .join(separator)
}
