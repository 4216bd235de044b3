use regfsm_util::{digit_class, word_class};

use crate::automata::{self, Fragment, Nfa, NfaState};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::{Error, Result};

/// Recursive-descent parser with one-token lookahead, building Thompson
/// NFA fragments bottom-up in a private state arena.
///
/// Grammar:
/// ```text
/// expression    := concatenation ('|' expression)?
/// concatenation := factor concatenation?
/// factor        := term ('*' | '+' | '?')?
/// term          := LITERAL | '(' expression ')' | CLASS
/// ```
pub struct RegParser<'a> {
    lexer: Lexer<'a>,
    look_ahead: Token,
    states: Vec<NfaState>,
}

impl<'a> RegParser<'a> {
    pub fn new(pattern: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(pattern);
        let look_ahead = lexer.next_token()?;
        Ok(RegParser { lexer, look_ahead, states: Vec::new() })
    }

    /// Parse the whole pattern. Trailing input after the top-level
    /// expression is an error; no partial automaton is ever returned.
    pub fn parse(mut self) -> Result<Nfa> {
        let fragment = self.expression()?;
        self.expect(TokenKind::End)?;
        Ok(Nfa::from_parts(self.states, &fragment).renumbered())
    }

    fn expression(&mut self) -> Result<Fragment> {
        let mut fragment = self.concatenation()?;
        if *self.look_ahead.kind() == TokenKind::Or {
            self.expect(TokenKind::Or)?;
            let rhs = self.expression()?;
            fragment = automata::alternate(&mut self.states, fragment, rhs);
        }
        Ok(fragment)
    }

    // Right-recursive run of factors; a factor follows iff the lookahead
    // can start a term.
    fn concatenation(&mut self) -> Result<Fragment> {
        let fragment = self.factor()?;
        match self.look_ahead.kind() {
            TokenKind::Literal | TokenKind::Class | TokenKind::LParen => {
                let rest = self.concatenation()?;
                Ok(automata::concatenate(&mut self.states, fragment, rest))
            }
            _ => Ok(fragment),
        }
    }

    fn factor(&mut self) -> Result<Fragment> {
        let fragment = self.term()?;
        match self.look_ahead.kind() {
            TokenKind::Star => {
                self.expect(TokenKind::Star)?;
                Ok(automata::star(&mut self.states, fragment))
            }
            TokenKind::Plus => {
                self.expect(TokenKind::Plus)?;
                Ok(automata::plus(&mut self.states, fragment))
            }
            TokenKind::Question => {
                self.expect(TokenKind::Question)?;
                Ok(automata::optional(&mut self.states, fragment))
            }
            _ => Ok(fragment),
        }
    }

    fn term(&mut self) -> Result<Fragment> {
        match self.look_ahead.kind() {
            TokenKind::Literal => {
                let symbol = match self.look_ahead.symbol() {
                    Some(symbol) => symbol,
                    None => return Err(Error::InvalidTerm(self.look_ahead.clone())),
                };
                self.expect(TokenKind::Literal)?;
                Ok(automata::literal(&mut self.states, symbol))
            }
            TokenKind::LParen => {
                self.expect(TokenKind::LParen)?;
                let fragment = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(fragment)
            }
            TokenKind::Class if self.look_ahead.text() == "\\d" => {
                self.expect(TokenKind::Class)?;
                Ok(automata::class(&mut self.states, &digit_class()))
            }
            TokenKind::Class if self.look_ahead.text() == "\\w" => {
                self.expect(TokenKind::Class)?;
                Ok(automata::class(&mut self.states, &word_class()))
            }
            _ => Err(Error::InvalidTerm(self.look_ahead.clone())),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        if *self.look_ahead.kind() == kind {
            self.look_ahead = self.lexer.next_token()?;
            Ok(())
        } else {
            Err(Error::UnexpectedToken { expected: kind, found: self.look_ahead.clone() })
        }
    }
}
