use super::token::{Token, TokenKind};
use crate::error::{Error, Pos};
use std::iter::Peekable;

/// Recursive descent driver over lexical tokens. Comments are invisible to
/// every lookahead; errors are collected so parsing can continue at the
/// next line.
pub struct Parser<I: Iterator<Item = Token>> {
    input: Peekable<I>,
    reported: Vec<Error>,
    /// Position of the last consumed token, for end of input errors.
    last: Pos,
}

impl<I: Iterator<Item = Token>> Parser<I> {
    pub fn new(input: I) -> Self {
        Parser {
            input: input.peekable(),
            reported: Vec::new(),
            last: Pos::default(),
        }
    }

    pub fn error(&mut self, err: Error) {
        self.reported.push(err);
    }

    pub fn into_errors(self) -> Vec<Error> {
        self.reported
    }
}

impl<I: Iterator<Item = Token>> Parser<I> {
    fn drop_comments(&mut self) {
        while let Some(Token {
            kind: TokenKind::Comment(_),
            ..
        }) = self.input.peek()
        {
            self.input.next();
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.input.next()?;
        self.last = token.pos.clone();
        Some(token)
    }

    pub fn peek(&mut self) -> Option<&Token> {
        self.drop_comments();
        self.input.peek()
    }

    pub fn next(&mut self) -> Option<Token> {
        self.drop_comments();
        self.advance()
    }

    /// True when the upcoming token satisfies `pred`.
    pub fn at<F: Fn(&Token) -> bool>(&mut self, pred: F) -> bool {
        self.peek().is_some_and(pred)
    }

    /// Takes the upcoming token only when it satisfies `pred`.
    pub fn eat_if<F: Fn(&Token) -> bool>(&mut self, pred: F) -> Option<Token> {
        match self.at(pred) {
            true => self.advance(),
            false => None,
        }
    }

    /// Discards tokens up to, not including, the first one satisfying `pred`.
    pub fn skip_until<F: Fn(&Token) -> bool>(&mut self, pred: F) {
        while self.input.peek().is_some_and(|token| !pred(token)) {
            self.advance();
        }
    }

    pub fn skip_newlines(&mut self) {
        while self
            .eat_if(|token| token.kind == TokenKind::Newline)
            .is_some()
        {}
    }

    pub fn require<F: Fn(&Token) -> bool>(&mut self, pred: F) -> Result<Token, Error> {
        match self.eat_if(pred) {
            Some(token) => Ok(token),
            None => Err(self.unexpected()),
        }
    }

    pub fn eof(&self) -> Error {
        Error::UnexpectedEOF(self.last.clone())
    }

    /// Error naming the upcoming token, or end of input.
    pub fn unexpected(&mut self) -> Error {
        match self.peek() {
            Some(token) => Error::UnexpectedToken(token.pos.clone(), token.kind.to_string()),
            None => self.eof(),
        }
    }
}

/// `check!(p, Kind)`: is the next token of this kind?
#[macro_export]
macro_rules! check {
    ($p:expr, $kind:pat) => {
        $p.at(|token| matches!(&token.kind, $kind))
    };
}

/// `expect!(p, Kind)?`: the next token, which must be of this kind.
#[macro_export]
macro_rules! expect {
    ($p:expr, $kind:pat) => {
        $p.require(|token| matches!(&token.kind, $kind))
    };
}

/// `optional!(p, Kind)` takes a token of this kind if present.
/// `optional!(p, Kind, rule)` also parses `rule` after it.
#[macro_export]
macro_rules! optional {
    ($p:expr, $kind:pat) => {
        $p.eat_if(|token| matches!(&token.kind, $kind))
    };
    ($p:expr, $kind:pat, $rule:expr) => {
        match $p.eat_if(|token| matches!(&token.kind, $kind)) {
            Some(_) => Some($rule),
            None => None,
        }
    };
}

/// Skips to the next token of this kind, after an error.
#[macro_export]
macro_rules! recover {
    ($p:expr, $kind:pat) => {
        $p.skip_until(|token| matches!(&token.kind, $kind))
    };
}

/// `repeat!(p, rule, End)` parses `rule` until `End`.
/// `repeat!(p, rule, Sep, End)` parses `rule` separated by `Sep` until `End`.
/// The terminator is left in place.
#[macro_export]
macro_rules! repeat {
    ($p:expr, $rule:expr, $end:pat) => {{
        let mut items = Vec::new();
        while !$p.at(|token| matches!(&token.kind, $end)) {
            items.push($rule?);
        }
        items
    }};
    ($p:expr, $rule:expr, $sep:pat, $end:pat) => {{
        let mut items = Vec::new();
        if !$p.at(|token| matches!(&token.kind, $end)) {
            loop {
                items.push($rule?);
                if $p.eat_if(|token| matches!(&token.kind, $sep)).is_none() {
                    break;
                }
            }
        }
        items
    }};
}
