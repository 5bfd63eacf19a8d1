use std::{collections::HashMap, fmt::Display, mem};

use miette::{Diagnostic, Error, IntoDiagnostic, NamedSource, SourceSpan};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    Lexer,
    lex::{Keyword, Token, TokenKind},
    system::Output,
};

#[derive(Error, Debug, Diagnostic)]
#[error("Mismatch token type: expected {expected}, found {found}")]
#[diagnostic(code(cobra::token_mismatch), help("use {expected} here instead"))]
pub struct TokenMismatchError {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    bad_bit: SourceSpan,

    pub expected: String,
    pub found: String,
}

#[derive(Error, Debug, Diagnostic)]
#[error("Variable '{name}' used before declared")]
#[diagnostic(
    code(cobra::undeclared_variable),
    help("assign it first, e.g. `set {name} = 0`")
)]
pub struct UndeclaredVariableError {
    #[source_code]
    src: NamedSource<String>,

    #[label("this variable")]
    bad_bit: SourceSpan,

    pub name: String,
}

#[derive(Error, Debug, Diagnostic)]
#[error("Cannot divide by zero")]
#[diagnostic(code(cobra::divide_by_zero))]
pub struct DivideByZeroError {
    #[source_code]
    src: NamedSource<String>,

    #[label("the right-hand side of this division is zero")]
    bad_bit: SourceSpan,
}

#[derive(Error, Debug, Diagnostic)]
#[error("Did not recognize command: {command}")]
#[diagnostic(
    code(cobra::unrecognized_command),
    help("statements start with print, set, clear, quit or a number")
)]
pub struct UnrecognizedCommandError {
    #[source_code]
    src: NamedSource<String>,

    #[label("this token")]
    bad_bit: SourceSpan,

    pub command: String,
}

#[derive(Error, Debug, Diagnostic)]
#[error("Invalid operands: {reason}")]
#[diagnostic(code(cobra::invalid_operand))]
pub struct InvalidOperandError {
    #[source_code]
    src: NamedSource<String>,

    #[label("this operator")]
    bad_bit: SourceSpan,

    pub reason: ArithmeticError,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArithmeticError {
    #[error("cannot divide by zero")]
    DivideByZero,
    #[error("unsupported operand types for {op}: {lhs} and {rhs}")]
    Unsupported {
        op: char,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("integer overflow in {op}")]
    Overflow { op: char },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int(n) => *n == 0,
            Value::Float(n) => *n == 0.0,
            Value::Str(_) => false,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::Str(_) => None,
        }
    }

    /// Shared numeric promotion: `int op int` stays integral, anything with a float is a float.
    fn numeric(
        &self,
        rhs: &Value,
        op: char,
        int: impl FnOnce(i64, i64) -> Option<i64>,
        float: impl FnOnce(f64, f64) -> f64,
    ) -> Result<Value, ArithmeticError> {
        match (self, rhs) {
            (Value::Int(lhs), Value::Int(rhs)) => int(*lhs, *rhs)
                .map(Value::Int)
                .ok_or(ArithmeticError::Overflow { op }),
            _ => match (self.as_f64(), rhs.as_f64()) {
                (Some(lhs), Some(rhs)) => Ok(Value::Float(float(lhs, rhs))),
                _ => Err(ArithmeticError::Unsupported {
                    op,
                    lhs: self.type_name(),
                    rhs: rhs.type_name(),
                }),
            },
        }
    }

    /// Numeric addition, or concatenation when the left side is a string.
    pub fn add(&self, rhs: &Value) -> Result<Value, ArithmeticError> {
        match self {
            Value::Str(lhs) => Ok(Value::Str(format!("{lhs}{rhs}"))),
            _ => self.numeric(rhs, '+', i64::checked_add, |lhs, rhs| lhs + rhs),
        }
    }

    pub fn sub(&self, rhs: &Value) -> Result<Value, ArithmeticError> {
        self.numeric(rhs, '-', i64::checked_sub, |lhs, rhs| lhs - rhs)
    }

    pub fn mul(&self, rhs: &Value) -> Result<Value, ArithmeticError> {
        self.numeric(rhs, '*', i64::checked_mul, |lhs, rhs| lhs * rhs)
    }

    /// Division that yields an `Int` when the remainder is zero and a `Float` otherwise.
    pub fn div(&self, rhs: &Value) -> Result<Value, ArithmeticError> {
        if rhs.is_zero() {
            return Err(ArithmeticError::DivideByZero);
        }
        match (self, rhs) {
            (Value::Int(lhs), Value::Int(rhs)) => match lhs.checked_rem(*rhs) {
                Some(0) => lhs
                    .checked_div(*rhs)
                    .map(Value::Int)
                    .ok_or(ArithmeticError::Overflow { op: '/' }),
                Some(_) => Ok(Value::Float(*lhs as f64 / *rhs as f64)),
                None => Err(ArithmeticError::Overflow { op: '/' }),
            },
            _ => match (self.as_f64(), rhs.as_f64()) {
                (Some(lhs), Some(rhs)) => {
                    let quotient = lhs / rhs;
                    let exact = lhs % rhs == 0.0
                        && quotient.is_finite()
                        && quotient >= i64::MIN as f64
                        && quotient < i64::MAX as f64;
                    Ok(if exact {
                        Value::Int(quotient as i64)
                    } else {
                        Value::Float(quotient)
                    })
                }
                _ => Err(ArithmeticError::Unsupported {
                    op: '/',
                    lhs: self.type_name(),
                    rhs: rhs.type_name(),
                }),
            },
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => {
                if n.is_finite() && *n == n.trunc() {
                    write!(f, "{n:.1}")
                } else {
                    write!(f, "{n}")
                }
            }
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

/// The variable store of one session. Entries live as long as the environment.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Bare expression statements echo their value.
    Interactive,
    /// Bare expression statements are evaluated and discarded.
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Quit,
}

/// Evaluates statements straight off the token stream, one token of lookahead.
pub struct Interpreter<'de, 'env> {
    lexer: Lexer<'de>,
    current: Token<'de>,
    environment: &'env mut Environment,
    output: &'env mut dyn Output,
    mode: Mode,
}

impl<'de, 'env> Interpreter<'de, 'env> {
    pub fn new(
        mut lexer: Lexer<'de>,
        environment: &'env mut Environment,
        output: &'env mut dyn Output,
        mode: Mode,
    ) -> Result<Self, Error> {
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            environment,
            output,
            mode,
        })
    }

    fn advance(&mut self) -> Result<Token<'de>, Error> {
        let next = self.lexer.next_token()?;
        Ok(mem::replace(&mut self.current, next))
    }

    fn mismatch(&self, expected: impl Into<String>) -> Error {
        TokenMismatchError {
            src: self.lexer.named_source(),
            bad_bit: self.current.span(),
            expected: expected.into(),
            found: self.current.kind.to_string(),
        }
        .into()
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token<'de>, Error> {
        if mem::discriminant(&self.current.kind) == mem::discriminant(&expected) {
            self.advance()
        } else {
            Err(self.mismatch(expected.to_string()))
        }
    }

    fn arithmetic(
        &self,
        op: Token<'de>,
        result: Result<Value, ArithmeticError>,
    ) -> Result<Value, Error> {
        result.map_err(|reason| match reason {
            ArithmeticError::DivideByZero => DivideByZeroError {
                src: self.lexer.named_source(),
                bad_bit: op.span(),
            }
            .into(),
            reason => InvalidOperandError {
                src: self.lexer.named_source(),
                bad_bit: op.span(),
                reason,
            }
            .into(),
        })
    }

    fn lookup(&self, token: Token<'de>) -> Result<Value, Error> {
        match self.environment.get(token.literal) {
            Some(value) => Ok(value.clone()),
            None => Err(UndeclaredVariableError {
                src: self.lexer.named_source(),
                bad_bit: token.span(),
                name: token.literal.to_string(),
            }
            .into()),
        }
    }

    fn factor(&mut self) -> Result<Value, Error> {
        match self.current.kind {
            TokenKind::Str => {
                let token = self.advance()?;
                Ok(Value::Str(token.literal.to_string()))
            }
            TokenKind::Ident => {
                let token = self.advance()?;
                self.lookup(token)
            }
            TokenKind::Int(n) => {
                self.advance()?;
                Ok(Value::Int(n))
            }
            TokenKind::Float(n) => {
                self.advance()?;
                Ok(Value::Float(n))
            }
            TokenKind::LeftParen => {
                self.advance()?;
                let result = self.expr()?;
                self.expect(TokenKind::RightParen)?;
                Ok(result)
            }
            _ => Err(self.mismatch("an operand")),
        }
    }

    fn term(&mut self) -> Result<Value, Error> {
        let mut result = self.factor()?;
        loop {
            let outcome = match self.current.kind {
                TokenKind::Star => {
                    let op = self.advance()?;
                    let rhs = self.factor()?;
                    self.arithmetic(op, result.mul(&rhs))?
                }
                TokenKind::Slash => {
                    let op = self.advance()?;
                    let rhs = self.factor()?;
                    self.arithmetic(op, result.div(&rhs))?
                }
                _ => return Ok(result),
            };
            result = outcome;
        }
    }

    fn expr(&mut self) -> Result<Value, Error> {
        let mut result = self.term()?;
        loop {
            let outcome = match self.current.kind {
                TokenKind::Plus => {
                    let op = self.advance()?;
                    let rhs = self.term()?;
                    self.arithmetic(op, result.add(&rhs))?
                }
                TokenKind::Minus => {
                    let op = self.advance()?;
                    let rhs = self.term()?;
                    self.arithmetic(op, result.sub(&rhs))?
                }
                _ => return Ok(result),
            };
            result = outcome;
        }
    }

    /// Evaluates a single expression starting at the current token.
    pub fn eval_expr(&mut self) -> Result<Value, Error> {
        self.expr()
    }

    fn assign(&mut self) -> Result<(), Error> {
        self.expect(TokenKind::Keyword(Keyword::Set))?;
        let name = self.expect(TokenKind::Ident)?;
        if self.current.kind == TokenKind::Assign {
            self.advance()?;
        }

        let value = match self.current.kind {
            TokenKind::Int(n) => Value::Int(n),
            TokenKind::Float(n) => Value::Float(n),
            // an identifier is stored as its own name, not looked up
            TokenKind::Str | TokenKind::Ident => Value::Str(self.current.literal.to_string()),
            _ => return Err(self.mismatch("a literal value")),
        };
        self.advance()?;

        trace!(name = name.literal, %value, "set");
        self.environment.define(name.literal, value);
        Ok(())
    }

    /// Runs statements until the end of input or a `quit`.
    pub fn run(&mut self) -> Result<Outcome, Error> {
        loop {
            trace!(token = %self.current.kind, offset = self.current.offset, "statement");
            match self.current.kind {
                TokenKind::Eof => return Ok(Outcome::Completed),
                TokenKind::Keyword(Keyword::Print) => {
                    self.advance()?;
                    self.expect(TokenKind::LeftParen)?;
                    let value = self.expr()?;
                    self.expect(TokenKind::RightParen)?;
                    self.output.emit(&value).into_diagnostic()?;
                }
                TokenKind::Int(_) | TokenKind::Float(_) => {
                    let value = self.expr()?;
                    if self.mode == Mode::Interactive {
                        self.output.emit(&value).into_diagnostic()?;
                    }
                }
                TokenKind::Keyword(Keyword::Set) => self.assign()?,
                TokenKind::Keyword(Keyword::Clear) => {
                    self.advance()?;
                    self.output.clear_screen().into_diagnostic()?;
                }
                TokenKind::Keyword(Keyword::Quit) => {
                    debug!(offset = self.current.offset, "quit requested");
                    return Ok(Outcome::Quit);
                }
                _ => match self.current.value().filter(|value| !value.is_empty()) {
                    None => {
                        self.advance()?;
                    }
                    Some(command) => {
                        return Err(UnrecognizedCommandError {
                            src: self.lexer.named_source(),
                            bad_bit: self.current.span(),
                            command,
                        }
                        .into());
                    }
                },
            }
        }
    }
}
