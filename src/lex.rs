use std::fmt::Display;

use miette::{Diagnostic, Error, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
#[error("Malformed number '{literal}'")]
#[diagnostic(code(cobra::malformed_number), help("{reason}"))]
pub struct MalformedNumberError {
    #[source_code]
    src: NamedSource<String>,

    #[label("this numeric literal")]
    bad_bit: SourceSpan,

    pub literal: String,
    pub reason: &'static str,
}

#[derive(Error, Debug, Diagnostic)]
#[error("Cannot parse char: '{token}'")]
#[diagnostic(
    code(cobra::unrecognized_char),
    help("remove or correct the character: `{token}`")
)]
pub struct UnrecognizedCharError {
    #[source_code]
    src: NamedSource<String>,

    #[label("this character")]
    bad_bit: SourceSpan,

    pub token: char,
}

#[derive(Error, Debug, Diagnostic)]
#[error("Invalid char '{token}' in word")]
#[diagnostic(code(cobra::invalid_char_in_word))]
pub struct InvalidCharInWordError {
    #[source_code]
    src: NamedSource<String>,

    #[label("not allowed in a keyword or variable name")]
    bad_bit: SourceSpan,

    pub token: char,
    /// The part of the word scanned before the offending character.
    pub word: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'de> {
    pub kind: TokenKind,
    pub literal: &'de str,
    pub offset: usize,
    pub len: usize,
}

impl Token<'_> {
    pub fn span(&self) -> SourceSpan {
        SourceSpan::from(self.offset..self.offset + self.len)
    }

    /// The literal payload of the token as text, `None` for brackets and end of input.
    pub fn value(&self) -> Option<String> {
        match self.kind {
            TokenKind::Int(n) => Some(n.to_string()),
            TokenKind::Float(n) => Some(n.to_string()),
            TokenKind::Keyword(keyword) => Some(keyword.to_string()),
            TokenKind::Str
            | TokenKind::Ident
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Assign
            | TokenKind::Greater
            | TokenKind::GreaterEqual
            | TokenKind::Less
            | TokenKind::LessEqual => Some(self.literal.to_string()),
            TokenKind::LeftParen
            | TokenKind::RightParen
            | TokenKind::LeftBrace
            | TokenKind::RightBrace
            | TokenKind::LeftBracket
            | TokenKind::RightBracket
            | TokenKind::Eof => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Float(f64),
    Str,
    Ident,
    Keyword(Keyword),
    Plus,
    Minus,
    Star,
    Slash,
    Assign,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Eof,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TokenKind::Int(_) => "INT",
            TokenKind::Float(_) => "FLOAT",
            TokenKind::Str => "STRING",
            TokenKind::Ident => "IDENTIFIER",
            TokenKind::Keyword(_) => "KEYWORD",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Star => "STAR",
            TokenKind::Slash => "SLASH",
            TokenKind::Assign => "ASSIGN",
            TokenKind::Greater => "GREATER",
            TokenKind::GreaterEqual => "GREATER_EQUAL",
            TokenKind::Less => "LESS",
            TokenKind::LessEqual => "LESS_EQUAL",
            TokenKind::LeftParen => "LEFT_PAREN",
            TokenKind::RightParen => "RIGHT_PAREN",
            TokenKind::LeftBrace => "LEFT_BRACE",
            TokenKind::RightBrace => "RIGHT_BRACE",
            TokenKind::LeftBracket => "LEFT_BRACKET",
            TokenKind::RightBracket => "RIGHT_BRACKET",
            TokenKind::Eof => "EOF",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Print,
    Set,
    Clear,
    Quit,
    // recognized, never executed
    If,
    For,
    While,
}

impl Keyword {
    /// Case-insensitive keyword lookup.
    pub fn from_word(word: &str) -> Option<Self> {
        Some(match word.to_lowercase().as_str() {
            "print" => Keyword::Print,
            "set" => Keyword::Set,
            "clear" | "cls" => Keyword::Clear,
            "quit" => Keyword::Quit,
            "if" => Keyword::If,
            "for" => Keyword::For,
            "while" => Keyword::While,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Print => "PRINT",
            Keyword::Set => "SET",
            Keyword::Clear => "CLEAR",
            Keyword::Quit => "QUIT",
            Keyword::If => "IF",
            Keyword::For => "FOR",
            Keyword::While => "WHILE",
        }
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn ends_word(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '+' | '-' | '*' | '/' | '(' | ')' | '{' | '}' | '[' | ']' | '=' | '<' | '>'
        )
}

pub struct Lexer<'de> {
    filename: Option<&'de str>,
    whole: &'de str,
    rest: &'de str,
    pub byte: usize,
    invalid_chars: Vec<char>,
    done: bool,
}

impl<'de> Lexer<'de> {
    pub fn new(filename: Option<&'de str>, input: &'de str) -> Self {
        Lexer {
            filename,
            whole: input,
            rest: input,
            byte: 0,
            invalid_chars: Vec::new(),
            done: false,
        }
    }

    /// Characters that may not appear inside a keyword or identifier.
    pub fn with_invalid_chars(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        self.invalid_chars = chars.into_iter().collect();
        self
    }

    pub(crate) fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.filename.unwrap_or("<input>"), self.whole.to_string())
    }

    fn bump(&mut self, n: usize) -> &'de str {
        let (taken, rest) = self.rest.split_at(n);
        self.rest = rest;
        self.byte += n;
        taken
    }

    fn single(&mut self, kind: TokenKind) -> Token<'de> {
        let offset = self.byte;
        let literal = self.bump(1);
        Token {
            kind,
            literal,
            offset,
            len: 1,
        }
    }

    /// Scans a numeric literal; `sign` is the byte length of a leading `-`, if any.
    fn number(&mut self, sign: usize) -> Result<Token<'de>, Error> {
        let offset = self.byte;
        let body = &self.rest[sign..];
        let end = body
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(body.len());
        let dots = body[..end].matches('.').count();
        let literal = self.bump(sign + end);

        let malformed = |reason| -> Error {
            MalformedNumberError {
                src: self.named_source(),
                bad_bit: SourceSpan::from(offset..offset + literal.len()),
                literal: literal.to_string(),
                reason,
            }
            .into()
        };

        let kind = match dots {
            0 => TokenKind::Int(
                literal
                    .parse()
                    .map_err(|_| malformed("integer literal does not fit in 64 bits"))?,
            ),
            1 => TokenKind::Float(
                literal
                    .parse()
                    .map_err(|_| malformed("a decimal point needs at least one digit"))?,
            ),
            _ => return Err(malformed("a number may contain at most one decimal point")),
        };

        Ok(Token {
            kind,
            literal,
            offset,
            len: literal.len(),
        })
    }

    /// Returns the next token, or `Eof` once the input is exhausted (repeatedly).
    pub fn next_token(&mut self) -> Result<Token<'de>, Error> {
        loop {
            let Some(c) = self.rest.chars().next() else {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    literal: "",
                    offset: self.byte,
                    len: 0,
                });
            };
            let offset = self.byte;

            enum Start {
                Minus,
                Number,
                Word,
                String,
                IfEqualElse(TokenKind, TokenKind),
            }

            let started = match c {
                c if c.is_whitespace() => {
                    self.bump(c.len_utf8());
                    continue;
                }
                '-' => Start::Minus,
                '0'..='9' | '.' => Start::Number,
                '+' => return Ok(self.single(TokenKind::Plus)),
                '*' => return Ok(self.single(TokenKind::Star)),
                '/' => return Ok(self.single(TokenKind::Slash)),
                '"' => Start::String,
                '=' => return Ok(self.single(TokenKind::Assign)),
                '(' => return Ok(self.single(TokenKind::LeftParen)),
                ')' => return Ok(self.single(TokenKind::RightParen)),
                '{' => return Ok(self.single(TokenKind::LeftBrace)),
                '}' => return Ok(self.single(TokenKind::RightBrace)),
                '[' => return Ok(self.single(TokenKind::LeftBracket)),
                ']' => return Ok(self.single(TokenKind::RightBracket)),
                '<' => Start::IfEqualElse(TokenKind::LessEqual, TokenKind::Less),
                '>' => Start::IfEqualElse(TokenKind::GreaterEqual, TokenKind::Greater),
                c if c.is_alphabetic() => Start::Word,
                c => {
                    return Err(UnrecognizedCharError {
                        src: self.named_source(),
                        bad_bit: SourceSpan::from(offset..offset + c.len_utf8()),
                        token: c,
                    }
                    .into());
                }
            };

            return match started {
                Start::Minus => {
                    if self.rest[1..].starts_with(|c: char| c.is_ascii_digit()) {
                        self.number(1)
                    } else {
                        Ok(self.single(TokenKind::Minus))
                    }
                }
                Start::Number => self.number(0),
                Start::Word => {
                    let rest = self.rest;
                    let mut end = rest.len();
                    for (i, ch) in rest.char_indices() {
                        if self.invalid_chars.contains(&ch) {
                            return Err(InvalidCharInWordError {
                                src: self.named_source(),
                                bad_bit: SourceSpan::from(
                                    offset + i..offset + i + ch.len_utf8(),
                                ),
                                token: ch,
                                word: rest[..i].to_string(),
                            }
                            .into());
                        }
                        if ends_word(ch) {
                            end = i;
                            break;
                        }
                    }

                    let literal = self.bump(end);
                    let kind = Keyword::from_word(literal)
                        .map_or(TokenKind::Ident, TokenKind::Keyword);
                    Ok(Token {
                        kind,
                        literal,
                        offset,
                        len: literal.len(),
                    })
                }
                Start::String => {
                    self.bump(1);
                    let rest = self.rest;
                    let (literal, consumed) = match rest.find('"') {
                        Some(end) => (&rest[..end], end + 1),
                        None => {
                            tracing::debug!(offset, "string literal runs to end of input");
                            (rest, rest.len())
                        }
                    };
                    self.bump(consumed);
                    Ok(Token {
                        kind: TokenKind::Str,
                        literal,
                        offset,
                        len: self.byte - offset,
                    })
                }
                Start::IfEqualElse(yes, no) => {
                    if self.rest[1..].starts_with('=') {
                        let literal = self.bump(2);
                        Ok(Token {
                            kind: yes,
                            literal,
                            offset,
                            len: 2,
                        })
                    } else {
                        Ok(self.single(no))
                    }
                }
            };
        }
    }
}

impl<'de> Iterator for Lexer<'de> {
    type Item = Result<Token<'de>, Error>;

    /// Yields every token up to and including the single `Eof`, stopping early on an error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let token = self.next_token();
        self.done = !matches!(token, Ok(Token { kind, .. }) if kind != TokenKind::Eof);
        Some(token)
    }
}
