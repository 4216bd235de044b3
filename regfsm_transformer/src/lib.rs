//! Compiles a textual regular expression into a finite-state automaton.
//!
//! The pipeline is: lexer -> recursive-descent parser (Thompson
//! construction) -> breadth-first renumbering -> shared [`Fsm`]
//! representation, with optional subset construction to derive a DFA and
//! exporters for matching, the formal 5-tuple and a dot graph description.

use std::fmt;

pub mod automata;
mod dot;
pub mod fsm;
pub mod lexer;
pub mod regex;

pub use crate::automata::Nfa;
pub use crate::fsm::{FiveTuple, Fsm, FsmKind, Label};
pub use crate::lexer::{Token, TokenKind};
pub use crate::regex::RegParser;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Lexing hit a character outside the supported input grammar.
    UnknownCharacter(char),
    /// The pattern ends with a backslash.
    DanglingEscape,
    /// A backslash escape that is neither a whitespace escape nor a class.
    InvalidEscape(char),
    /// The parser needed one token kind and found another.
    UnexpectedToken { expected: TokenKind, found: Token },
    /// A term was expected but the lookahead cannot start one.
    InvalidTerm(Token),
    /// `match_text` was invoked on an NFA instance.
    NfaMatchUnsupported,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownCharacter(c) => write!(f, "unknown character: {c:?}"),
            Error::DanglingEscape => write!(f, "expected a character after '\\'"),
            Error::InvalidEscape(c) => write!(f, "invalid escape sequence: \\{c}"),
            Error::UnexpectedToken { expected, found } => {
                write!(f, "expected {expected:?}, found '{}'", found.text())
            }
            Error::InvalidTerm(token) => write!(f, "invalid term: '{}'", token.text()),
            Error::NfaMatchUnsupported => write!(f, "match is not supported on an NFA"),
        }
    }
}

impl std::error::Error for Error {}

/// Parse a pattern into its canonically numbered NFA.
pub fn parse(pattern: &str) -> Result<Nfa> {
    RegParser::new(pattern)?.parse()
}

/// Compile a pattern and export the NFA.
pub fn to_nfa(pattern: &str) -> Result<Fsm> {
    Ok(parse(pattern)?.to_fsm())
}

/// Compile a pattern and derive an equivalent DFA by subset construction.
pub fn to_dfa(pattern: &str) -> Result<Fsm> {
    Ok(parse(pattern)?.to_dfa())
}
