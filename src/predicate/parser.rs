// src/predicate/parser.rs — Tokenizer and recursive-descent parser for predicates
//
// Precedence, loosest first: or, and, not, comparison, +, unary -, method call.

use std::iter::Peekable;
use std::str::CharIndices;

use super::ast::{Binding, CmpOp, Expr, Func};
use super::PredicateError;

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Str(String),
    Int(i64),
    Ident(String),
    LParen,
    RParen,
    Comma,
    Dot,
    Plus,
    Minus,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    End,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Str(s) => format!("string {s:?}"),
            Tok::Int(n) => format!("number {n}"),
            Tok::Ident(name) => format!("'{name}'"),
            Tok::LParen => "'('".into(),
            Tok::RParen => "')'".into(),
            Tok::Comma => "','".into(),
            Tok::Dot => "'.'".into(),
            Tok::Plus => "'+'".into(),
            Tok::Minus => "'-'".into(),
            Tok::EqEq => "'=='".into(),
            Tok::NotEq => "'!='".into(),
            Tok::Lt => "'<'".into(),
            Tok::Le => "'<='".into(),
            Tok::Gt => "'>'".into(),
            Tok::Ge => "'>='".into(),
            Tok::AndAnd => "'&&'".into(),
            Tok::OrOr => "'||'".into(),
            Tok::Bang => "'!'".into(),
            Tok::End => "end of input".into(),
        }
    }
}

const RESERVED: [&str; 4] = ["and", "or", "not", "in"];

/// Nesting budget shared by parentheses, call arguments, prefix operators and
/// operator chains. Bounds the height of every tree the parser returns.
const MAX_DEPTH: usize = 64;

fn syntax(offset: usize, message: impl Into<String>) -> PredicateError {
    PredicateError::Syntax {
        offset,
        message: message.into(),
    }
}

fn lex(src: &str) -> Result<Vec<(Tok, usize)>, PredicateError> {
    let mut out = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(i, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let tok = match c {
            '(' | ')' | ',' | '.' | '+' | '-' => {
                chars.next();
                match c {
                    '(' => Tok::LParen,
                    ')' => Tok::RParen,
                    ',' => Tok::Comma,
                    '.' => Tok::Dot,
                    '+' => Tok::Plus,
                    _ => Tok::Minus,
                }
            }
            '=' => {
                chars.next();
                if !eat(&mut chars, '=') {
                    return Err(syntax(i, "assignment is not allowed, use '=='"));
                }
                Tok::EqEq
            }
            '!' => {
                chars.next();
                if eat(&mut chars, '=') {
                    Tok::NotEq
                } else {
                    Tok::Bang
                }
            }
            '<' => {
                chars.next();
                if eat(&mut chars, '=') {
                    Tok::Le
                } else {
                    Tok::Lt
                }
            }
            '>' => {
                chars.next();
                if eat(&mut chars, '=') {
                    Tok::Ge
                } else {
                    Tok::Gt
                }
            }
            '&' => {
                chars.next();
                if !eat(&mut chars, '&') {
                    return Err(syntax(i, "expected '&&'"));
                }
                Tok::AndAnd
            }
            '|' => {
                chars.next();
                if !eat(&mut chars, '|') {
                    return Err(syntax(i, "expected '||'"));
                }
                Tok::OrOr
            }
            '\'' | '"' => {
                chars.next();
                Tok::Str(lex_string(&mut chars, c, i)?)
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '_' {
                        if d != '_' {
                            digits.push(d);
                        }
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n = digits
                    .parse::<i64>()
                    .map_err(|_| syntax(i, format!("integer literal {digits} is out of range")))?;
                Tok::Int(n)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                Tok::Ident(ident)
            }
            other => return Err(syntax(i, format!("unexpected character {other:?}"))),
        };
        out.push((tok, i));
    }

    out.push((Tok::End, src.len()));
    Ok(out)
}

fn eat(chars: &mut Peekable<CharIndices<'_>>, want: char) -> bool {
    if matches!(chars.peek(), Some(&(_, c)) if c == want) {
        chars.next();
        true
    } else {
        false
    }
}

fn lex_string(
    chars: &mut Peekable<CharIndices<'_>>,
    quote: char,
    start: usize,
) -> Result<String, PredicateError> {
    let mut s = String::new();
    loop {
        let Some((i, c)) = chars.next() else {
            return Err(syntax(start, "unterminated string literal"));
        };
        if c == quote {
            return Ok(s);
        }
        if c != '\\' {
            s.push(c);
            continue;
        }
        let Some((_, esc)) = chars.next() else {
            return Err(syntax(i, "unterminated escape sequence"));
        };
        match esc {
            'n' => s.push('\n'),
            't' => s.push('\t'),
            'r' => s.push('\r'),
            '0' => s.push('\0'),
            '\\' => s.push('\\'),
            '\'' => s.push('\''),
            '"' => s.push('"'),
            'x' => s.push(lex_hex_escape(chars, 2, i)?),
            'u' => s.push(lex_hex_escape(chars, 4, i)?),
            other => return Err(syntax(i, format!("unknown escape '\\{other}'"))),
        }
    }
}

fn lex_hex_escape(
    chars: &mut Peekable<CharIndices<'_>>,
    width: usize,
    offset: usize,
) -> Result<char, PredicateError> {
    let mut hex = String::with_capacity(width);
    for _ in 0..width {
        match chars.next() {
            Some((_, h)) if h.is_ascii_hexdigit() => hex.push(h),
            _ => return Err(syntax(offset, format!("expected {width} hex digits"))),
        }
    }
    u32::from_str_radix(&hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| syntax(offset, format!("invalid code point \\u{hex}")))
}

struct Parser {
    tokens: Vec<(Tok, usize)>,
    pos: usize,
    depth: usize,
}

pub(crate) fn parse(source: &str) -> Result<Expr, PredicateError> {
    let tokens = lex(source)?;
    if tokens.len() == 1 {
        return Err(PredicateError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;
    match parser.peek() {
        Tok::End => Ok(expr),
        other => Err(syntax(
            parser.offset(),
            format!("unexpected {} after expression", other.describe()),
        )),
    }
}

impl Parser {
    fn peek(&self) -> &Tok {
        &self.tokens[self.pos].0
    }

    fn peek_at(&self, ahead: usize) -> &Tok {
        let idx = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[idx].0
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos].1
    }

    fn advance(&mut self) -> Tok {
        let tok = self.tokens[self.pos].0.clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn is_keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Tok::Ident(name) if name == word)
    }

    fn expect(&mut self, want: Tok) -> Result<(), PredicateError> {
        if *self.peek() == want {
            self.advance();
            Ok(())
        } else {
            Err(syntax(
                self.offset(),
                format!("expected {}, found {}", want.describe(), self.peek().describe()),
            ))
        }
    }

    fn descend(&mut self) -> Result<(), PredicateError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(syntax(self.offset(), "expression nested too deeply"));
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Expr, PredicateError> {
        self.descend()?;
        let mark = self.depth;
        let mut lhs = self.parse_and()?;
        while self.is_keyword("or") || *self.peek() == Tok::OrOr {
            self.descend()?;
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        self.depth = mark - 1;
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, PredicateError> {
        let mark = self.depth;
        let mut lhs = self.parse_not()?;
        while self.is_keyword("and") || *self.peek() == Tok::AndAnd {
            self.descend()?;
            self.advance();
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        self.depth = mark;
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, PredicateError> {
        if self.is_keyword("not") || *self.peek() == Tok::Bang {
            self.descend()?;
            self.advance();
            let inner = self.parse_not()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr, PredicateError> {
        let lhs = self.parse_sum()?;
        let (op, width) = match self.peek() {
            Tok::EqEq => (CmpOp::Eq, 1),
            Tok::NotEq => (CmpOp::Ne, 1),
            Tok::Lt => (CmpOp::Lt, 1),
            Tok::Le => (CmpOp::Le, 1),
            Tok::Gt => (CmpOp::Gt, 1),
            Tok::Ge => (CmpOp::Ge, 1),
            Tok::Ident(name) if name == "in" => (CmpOp::In, 1),
            Tok::Ident(name)
                if name == "not" && matches!(self.peek_at(1), Tok::Ident(n) if n == "in") =>
            {
                (CmpOp::NotIn, 2)
            }
            _ => return Ok(lhs),
        };
        for _ in 0..width {
            self.advance();
        }
        let rhs = self.parse_sum()?;
        Ok(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_sum(&mut self) -> Result<Expr, PredicateError> {
        let mark = self.depth;
        let mut lhs = self.parse_unary()?;
        while *self.peek() == Tok::Plus {
            self.descend()?;
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Add(Box::new(lhs), Box::new(rhs));
        }
        self.depth = mark;
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, PredicateError> {
        if *self.peek() == Tok::Minus {
            self.descend()?;
            self.advance();
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, PredicateError> {
        let mark = self.depth;
        let mut expr = self.parse_primary()?;
        while *self.peek() == Tok::Dot {
            self.descend()?;
            self.advance();
            let offset = self.offset();
            let name = match self.advance() {
                Tok::Ident(name) => name,
                other => {
                    return Err(syntax(
                        offset,
                        format!("expected method name, found {}", other.describe()),
                    ))
                }
            };
            self.expect(Tok::LParen)?;
            let mut args = vec![expr];
            args.extend(self.parse_args()?);
            expr = make_call(&name, args)?;
        }
        self.depth = mark;
        Ok(expr)
    }

    /// Arguments after an opening parenthesis, consuming the closing one.
    fn parse_args(&mut self) -> Result<Vec<Expr>, PredicateError> {
        let mut args = Vec::new();
        if *self.peek() == Tok::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_or()?);
            match self.peek() {
                Tok::Comma => {
                    self.advance();
                }
                Tok::RParen => {
                    self.advance();
                    return Ok(args);
                }
                other => {
                    return Err(syntax(
                        self.offset(),
                        format!("expected ',' or ')', found {}", other.describe()),
                    ))
                }
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, PredicateError> {
        let offset = self.offset();
        match self.advance() {
            Tok::Str(s) => Ok(Expr::Str(s)),
            Tok::Int(n) => Ok(Expr::Int(n)),
            Tok::LParen => {
                let inner = self.parse_or()?;
                self.expect(Tok::RParen)?;
                Ok(inner)
            }
            Tok::Ident(name) => {
                if *self.peek() == Tok::LParen {
                    self.advance();
                    let args = self.parse_args()?;
                    return make_call(&name, args);
                }
                match name.as_str() {
                    "true" | "True" => Ok(Expr::Bool(true)),
                    "false" | "False" => Ok(Expr::Bool(false)),
                    word if RESERVED.contains(&word) => {
                        Err(syntax(offset, format!("unexpected keyword '{word}'")))
                    }
                    _ => Binding::from_name(&name)
                        .map(Expr::Var)
                        .ok_or_else(|| PredicateError::UnknownName(name.clone())),
                }
            }
            other => Err(syntax(
                offset,
                format!("unexpected {}", other.describe()),
            )),
        }
    }
}

fn make_call(name: &str, args: Vec<Expr>) -> Result<Expr, PredicateError> {
    let func = Func::from_name(name).ok_or_else(|| PredicateError::UnknownFunction(name.into()))?;
    if args.len() != func.arity() {
        return Err(PredicateError::Arity {
            func: func.name(),
            expected: func.arity(),
            got: args.len(),
        });
    }
    Ok(Expr::Call { func, args })
}
