use std::io::{self, BufRead, Write};

use miette::{Error, IntoDiagnostic};
use tracing::debug;

use crate::{
    ErrorKind, Lexer,
    eval::{Environment, Interpreter, Mode, Outcome, Value},
};

const CLEAR_SCREEN: &str = "\x1b[H\x1b[J";

/// Where printed values and screen clears go.
pub trait Output {
    fn emit(&mut self, value: &Value) -> io::Result<()>;
    fn clear_screen(&mut self) -> io::Result<()>;
}

/// Writes values one per line to a terminal-like stream.
pub struct Terminal<W> {
    out: W,
}

impl<W: Write> Terminal<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Output for Terminal<W> {
    fn emit(&mut self, value: &Value) -> io::Result<()> {
        writeln!(self.out, "{value}")?;
        self.out.flush()
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        write!(self.out, "{CLEAR_SCREEN}")?;
        self.out.flush()
    }
}

/// Records output in memory.
#[derive(Debug, Default)]
pub struct Transcript {
    pub lines: Vec<String>,
    pub clears: usize,
}

impl Output for Transcript {
    fn emit(&mut self, value: &Value) -> io::Result<()> {
        self.lines.push(value.to_string());
        Ok(())
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        self.clears += 1;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub prompt: String,
    /// Characters rejected inside keywords and identifiers.
    pub invalid_word_chars: Vec<char>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: "JB> ".to_string(),
            invalid_word_chars: Vec::new(),
        }
    }
}

/// One interpreter session: the variable store survives across runs.
pub struct Session<O> {
    environment: Environment,
    output: O,
    config: Config,
}

impl<O: Output> Session<O> {
    pub fn new(output: O, config: Config) -> Self {
        Self {
            environment: Environment::new(),
            output,
            config,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn into_output(self) -> O {
        self.output
    }

    pub fn run_source(
        &mut self,
        filename: Option<&str>,
        source: &str,
        mode: Mode,
    ) -> Result<Outcome, Error> {
        let lexer = Lexer::new(filename, source)
            .with_invalid_chars(self.config.invalid_word_chars.iter().copied());
        let outcome =
            Interpreter::new(lexer, &mut self.environment, &mut self.output, mode)?.run()?;
        debug!(?outcome, variables = self.environment.len(), "run finished");
        Ok(outcome)
    }

    /// Reads and runs one line at a time until end of input or `quit`.
    ///
    /// Prompts and error reports go to `console`; a failing line does not end the session.
    pub fn repl<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        mut console: W,
    ) -> Result<(), Error> {
        let mut line = String::new();
        loop {
            write!(console, "{}", self.config.prompt).into_diagnostic()?;
            console.flush().into_diagnostic()?;

            line.clear();
            if input.read_line(&mut line).into_diagnostic()? == 0 {
                debug!("end of input");
                writeln!(console).into_diagnostic()?;
                return Ok(());
            }

            let text = line.trim_end_matches(['\n', '\r']);
            if text.is_empty() {
                continue;
            }

            match self.run_source(None, text, Mode::Interactive) {
                Ok(Outcome::Completed) => {}
                Ok(Outcome::Quit) => return Ok(()),
                Err(e) => {
                    debug!(kind = ?ErrorKind::of(&e), "line failed");
                    writeln!(console, "{e:?}").into_diagnostic()?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repl(input: &str) -> (Session<Transcript>, String) {
        let mut session = Session::new(Transcript::default(), Config::default());
        let mut console = Vec::new();
        session.repl(input.as_bytes(), &mut console).unwrap();
        (session, String::from_utf8(console).unwrap())
    }

    #[test]
    fn terminal_writes_values_and_clear_sequence() {
        let mut terminal = Terminal::new(Vec::new());
        terminal.emit(&Value::Int(5)).unwrap();
        terminal.emit(&Value::Str("hi".into())).unwrap();
        terminal.clear_screen().unwrap();
        assert_eq!(
            String::from_utf8(terminal.into_inner()).unwrap(),
            "5\nhi\n\x1b[H\x1b[J"
        );
    }

    #[test]
    fn variables_persist_across_lines() {
        let (session, console) = repl("set x = 5\nprint(x + 3)\n\nprint(x * 2)\n");
        assert_eq!(session.output().lines, ["8", "10"]);
        assert_eq!(console.matches("JB> ").count(), 5);
        assert_eq!(session.environment().get("x"), Some(&Value::Int(5)));
    }

    #[test]
    fn failing_line_keeps_the_session_alive() {
        let (session, console) = repl("print(y)\nset y = 1\nprint(y)\n");
        assert_eq!(session.output().lines, ["1"]);
        assert!(console.contains("used before declared"));
    }

    #[test]
    fn quit_ends_the_session() {
        let (session, _) = repl("print(1)\nquit\nprint(2)\n");
        assert_eq!(session.output().lines, ["1"]);
    }

    #[test]
    fn bare_numbers_echo() {
        let (session, _) = repl("3 * 4\n7 / 2\n");
        assert_eq!(session.output().lines, ["12", "3.5"]);
    }

    #[test]
    fn windows_line_endings() {
        let (session, _) = repl("print(\"a\")\r\n");
        assert_eq!(session.output().lines, ["a"]);
    }

    #[test]
    fn configured_invalid_chars_reach_the_lexer() {
        let config = Config {
            invalid_word_chars: vec!['_'],
            ..Config::default()
        };
        let mut session = Session::new(Transcript::default(), config);
        let error = session
            .run_source(Some("script.cb"), "set a_b = 1", Mode::Script)
            .unwrap_err();
        assert_eq!(ErrorKind::of(&error), Some(ErrorKind::InvalidCharacterInWord));
    }

    #[test]
    fn script_mode_discards_bare_expressions() {
        let mut session = Session::new(Transcript::default(), Config::default());
        let outcome = session
            .run_source(None, "1 + 2\nprint(3)", Mode::Script)
            .unwrap();
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(session.into_output().lines, ["3"]);
    }
}
