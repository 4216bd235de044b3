use derive_getters::Getters;
use either::{Either, Left, Right};
use nom::character::complete::anychar;
use nom::error::Error as NomError;

use regfsm_util::is_reg_char;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Literal,
    LParen,
    RParen,
    Star,
    Plus,
    Question,
    Or,
    Class,
    End,
    /// The ε marker. Internal to construction, never lexed.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Token {
    kind: TokenKind,
    text: String,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Token { kind, text: text.into() }
    }

    pub fn end() -> Self {
        Token::new(TokenKind::End, "EOF")
    }

    pub fn empty() -> Self {
        Token::new(TokenKind::Empty, "ε")
    }

    /// The character carried by a literal token.
    pub fn symbol(&self) -> Option<char> {
        match self.kind {
            TokenKind::Literal => self.text.chars().next(),
            _ => None,
        }
    }
}

/// Scans a pattern string into operator, literal and class tokens.
pub struct Lexer<'a> {
    rest: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(pattern: &'a str) -> Self {
        Lexer { rest: pattern }
    }

    pub fn has_next(&self) -> bool {
        !self.rest.is_empty()
    }

    /// Produce the next token. Exhausted input yields the end sentinel
    /// repeatedly.
    pub fn next_token(&mut self) -> Result<Token> {
        let (rest, current) = match anychar::<_, NomError<&str>>(self.rest) {
            Ok(pulled) => pulled,
            Err(_) => return Ok(Token::end()),
        };
        self.rest = rest;

        match current {
            '\\' => self.escape_token(),
            '(' => Ok(Token::new(TokenKind::LParen, "(")),
            ')' => Ok(Token::new(TokenKind::RParen, ")")),
            '*' => Ok(Token::new(TokenKind::Star, "*")),
            '+' => Ok(Token::new(TokenKind::Plus, "+")),
            '?' => Ok(Token::new(TokenKind::Question, "?")),
            '|' => Ok(Token::new(TokenKind::Or, "|")),
            c if is_reg_char(c) => Ok(Token::new(TokenKind::Literal, c.to_string())),
            c => Err(Error::UnknownCharacter(c)),
        }
    }

    fn escape_token(&mut self) -> Result<Token> {
        let (rest, escaped) = match anychar::<_, NomError<&str>>(self.rest) {
            Ok(pulled) => pulled,
            Err(_) => return Err(Error::DanglingEscape),
        };
        self.rest = rest;

        match resolve_escape(escaped)? {
            Left(literal) => Ok(Token::new(TokenKind::Literal, literal.to_string())),
            Right(class) => Ok(Token::new(TokenKind::Class, class)),
        }
    }
}

/// An escape resolves to either a literal character or a class spelling.
fn resolve_escape(escaped: char) -> Result<Either<char, &'static str>> {
    match escaped {
        'n' => Ok(Left('\n')),
        't' => Ok(Left('\t')),
        'r' => Ok(Left('\r')),
        '\\' => Ok(Left('\\')),
        'd' => Ok(Right("\\d")),
        'w' => Ok(Right("\\w")),
        other => Err(Error::InvalidEscape(other)),
    }
}
