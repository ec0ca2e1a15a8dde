// src/predicate/ast.rs — Predicate syntax tree

/// The two names a predicate may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Token,
    Result,
}

impl Binding {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "token" => Some(Binding::Token),
            "result" => Some(Binding::Result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

/// Whitelisted helper functions. Anything else is rejected when compiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Len,
    Lower,
    Upper,
    Strip,
    Contains,
    StartsWith,
    EndsWith,
    Binary,
    Bits,
    Str,
    Int,
}

impl Func {
    pub fn from_name(name: &str) -> Option<Self> {
        let func = match name {
            "len" => Func::Len,
            "lower" => Func::Lower,
            "upper" => Func::Upper,
            "strip" => Func::Strip,
            "contains" => Func::Contains,
            "startswith" => Func::StartsWith,
            "endswith" => Func::EndsWith,
            "binary" => Func::Binary,
            "bits" => Func::Bits,
            "str" => Func::Str,
            "int" => Func::Int,
            _ => return None,
        };
        Some(func)
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Len => "len",
            Func::Lower => "lower",
            Func::Upper => "upper",
            Func::Strip => "strip",
            Func::Contains => "contains",
            Func::StartsWith => "startswith",
            Func::EndsWith => "endswith",
            Func::Binary => "binary",
            Func::Bits => "bits",
            Func::Str => "str",
            Func::Int => "int",
        }
    }

    /// Number of arguments, counting a method receiver.
    pub fn arity(self) -> usize {
        match self {
            Func::Contains | Func::StartsWith | Func::EndsWith => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Int(i64),
    Bool(bool),
    Var(Binding),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Compare {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Func,
        args: Vec<Expr>,
    },
}
