pub mod eval;
pub mod lex;
pub mod system;

use miette::Error;

pub use eval::{Environment, Interpreter, Mode, Outcome, Value};
pub use lex::Lexer;
pub use system::{Config, Output, Session, Terminal, Transcript};

use eval::{
    DivideByZeroError, InvalidOperandError, TokenMismatchError, UndeclaredVariableError,
    UnrecognizedCommandError,
};
use lex::{InvalidCharInWordError, MalformedNumberError, UnrecognizedCharError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedNumber,
    UnrecognizedCharacter,
    InvalidCharacterInWord,
    TokenMismatch,
    UndeclaredVariable,
    DivideByZero,
    UnrecognizedCommand,
    InvalidOperand,
}

impl ErrorKind {
    /// Classifies a report produced by the lexer or interpreter; `None` for anything else (I/O).
    pub fn of(error: &Error) -> Option<Self> {
        let kind = if error.downcast_ref::<MalformedNumberError>().is_some() {
            ErrorKind::MalformedNumber
        } else if error.downcast_ref::<UnrecognizedCharError>().is_some() {
            ErrorKind::UnrecognizedCharacter
        } else if error.downcast_ref::<InvalidCharInWordError>().is_some() {
            ErrorKind::InvalidCharacterInWord
        } else if error.downcast_ref::<TokenMismatchError>().is_some() {
            ErrorKind::TokenMismatch
        } else if error.downcast_ref::<UndeclaredVariableError>().is_some() {
            ErrorKind::UndeclaredVariable
        } else if error.downcast_ref::<DivideByZeroError>().is_some() {
            ErrorKind::DivideByZero
        } else if error.downcast_ref::<UnrecognizedCommandError>().is_some() {
            ErrorKind::UnrecognizedCommand
        } else if error.downcast_ref::<InvalidOperandError>().is_some() {
            ErrorKind::InvalidOperand
        } else {
            return None;
        };
        Some(kind)
    }
}

/// Runs `source` as a script in a fresh session and returns everything it printed.
pub fn run_script(source: &str) -> Result<Transcript, Error> {
    let mut session = Session::new(Transcript::default(), Config::default());
    session.run_source(None, source, Mode::Script)?;
    Ok(session.into_output())
}
