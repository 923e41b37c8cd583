use super::token::{Token, TokenKind};
use crate::error::Pos;
use std::iter::Peekable;
use std::str::CharIndices;

/// Splits source text into tokens, one `Newline` at the end of every line.
pub struct Lexer<'a> {
    file: &'a str,
    code: &'a str,
    first_row: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(file: &'a str, code: &'a str) -> Self {
        Self {
            file,
            code,
            first_row: 0,
        }
    }

    /// Row of the first line of `code` within its file.
    pub fn starting_at(mut self, row: usize) -> Self {
        self.first_row = row;
        self
    }

    pub fn parse(self) -> Vec<Token> {
        let mut out = Vec::new();
        let mut in_block = false;
        for (offset, text) in self.code.lines().enumerate() {
            let mut line = Line {
                chars: text.char_indices().peekable(),
                file: self.file,
                row: self.first_row + offset,
                in_block,
            };
            line.scan(&mut out);
            in_block = line.in_block;
        }
        out
    }
}

/// Cursor over a single line. `in_block` carries an open `/* */` comment
/// from one line to the next.
struct Line<'a> {
    chars: Peekable<CharIndices<'a>>,
    file: &'a str,
    row: usize,
    in_block: bool,
}

impl<'a> Line<'a> {
    fn at(&self, n: usize) -> Option<char> {
        self.chars.clone().nth(n).map(|(_, ch)| ch)
    }

    fn bump(&mut self, n: usize) {
        for _ in 0..n {
            self.chars.next();
        }
    }

    fn scan(&mut self, out: &mut Vec<Token>) {
        let mut col = 0;
        while let Some(&(idx, ch)) = self.chars.peek() {
            col = idx + 1;
            if self.in_block {
                self.bump(1);
                if ch == '*' && self.at(0) == Some('/') {
                    self.bump(1);
                    self.in_block = false;
                }
                continue;
            }
            if ch.is_whitespace() {
                self.bump(1);
                continue;
            }

            let pos = Pos::new(self.file, self.row, idx);
            let next = self.at(1);
            let kind = match (ch, next) {
                ('/', Some('/')) => {
                    self.bump(2);
                    while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
                    let text = self.chars.by_ref().map(|(_, c)| c).collect();
                    out.push(Token::new(TokenKind::Comment(text), pos));
                    break;
                }
                ('/', Some('*')) => {
                    self.bump(2);
                    self.in_block = true;
                    continue;
                }
                ('$', _) => {
                    self.bump(1);
                    self.digits("$", 16)
                }
                ('0'..='9', _) => self.number(),
                ('\'', _) => self.char_literal(),
                ('"', _) => self.text_literal(),
                ('a'..='z' | 'A'..='Z' | '_', _) => self.word(),
                _ => match punctuation(ch, next) {
                    Some((kind, width)) => {
                        self.bump(width);
                        kind
                    }
                    None => {
                        self.bump(1);
                        TokenKind::Error(ch.to_string())
                    }
                },
            };
            out.push(Token::new(kind, pos));
        }
        out.push(Token::new(
            TokenKind::Newline,
            Pos::new(self.file, self.row, col),
        ));
    }

    fn word(&mut self) -> TokenKind {
        let mut name = String::new();
        while let Some((_, ch)) = self
            .chars
            .next_if(|(_, ch)| ch.is_ascii_alphanumeric() || *ch == '_')
        {
            name.push(ch);
        }
        KEYWORDS
            .iter()
            .find(|(word, _)| *word == name)
            .map(|(_, kind)| kind.clone())
            .unwrap_or(TokenKind::Ident(name))
    }

    fn number(&mut self) -> TokenKind {
        match (self.at(0), self.at(1)) {
            (Some('0'), Some('x' | 'X')) => {
                self.bump(2);
                self.digits("0x", 16)
            }
            (Some('0'), Some('b' | 'B')) => {
                self.bump(2);
                self.digits("0b", 2)
            }
            _ => self.digits("", 10),
        }
    }

    /// Digits in `radix`, `_` separators allowed, `K` suffix for kilobytes.
    fn digits(&mut self, prefix: &str, radix: u32) -> TokenKind {
        let mut lexeme = prefix.to_string();
        let mut value = String::new();
        while let Some((_, ch)) = self
            .chars
            .next_if(|(_, ch)| *ch == '_' || ch.is_digit(radix))
        {
            lexeme.push(ch);
            if ch != '_' {
                value.push(ch);
            }
        }
        let scale = match self.chars.next_if(|(_, ch)| *ch == 'K') {
            Some(_) => {
                lexeme.push('K');
                1024
            }
            None => 1,
        };
        match i64::from_str_radix(&value, radix) {
            Ok(num) => TokenKind::Number(lexeme, num * scale),
            Err(_) => TokenKind::Error(lexeme),
        }
    }

    fn escaped(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        match ch {
            'n' => Some('\n'),
            't' => Some('\t'),
            'r' => Some('\r'),
            '0' => Some('\0'),
            '\\' | '\'' | '"' => Some(ch),
            _ => None,
        }
    }

    fn char_literal(&mut self) -> TokenKind {
        self.bump(1);
        let value = match self.chars.next() {
            Some((_, '\\')) => self.escaped(),
            other => other.map(|(_, ch)| ch),
        };
        match (value, self.chars.next()) {
            (Some(ch), Some((_, '\''))) => TokenKind::Char(ch),
            _ => TokenKind::Error("'".to_string()),
        }
    }

    fn text_literal(&mut self) -> TokenKind {
        self.bump(1);
        let mut text = String::new();
        while let Some((_, ch)) = self.chars.next() {
            match ch {
                '"' => return TokenKind::Text(text),
                '\\' => match self.escaped() {
                    Some(ch) => text.push(ch),
                    None => return TokenKind::Error(format!("\"{text}\\")),
                },
                _ => text.push(ch),
            }
        }
        // unterminated
        TokenKind::Error(format!("\"{text}"))
    }
}

/// Punctuation starting with `ch`, and how many characters it spans.
fn punctuation(ch: char, next: Option<char>) -> Option<(TokenKind, usize)> {
    use TokenKind::*;
    let kind = match (ch, next) {
        ('<', Some('<')) => return Some((LAngleLAngle, 2)),
        ('>', Some('>')) => return Some((RAngleRAngle, 2)),
        ('<', _) => LAngle,
        ('>', _) => RAngle,
        ('=', _) => Equal,
        ('+', _) => Plus,
        ('-', _) => Minus,
        ('*', _) => Star,
        ('/', _) => Slash,
        ('%', _) => Percent,
        ('&', _) => Ampasand,
        ('|', _) => Pipe,
        ('^', _) => Caret,
        ('~', _) => Tilde,
        ('#', _) => Hash,
        (':', _) => Colon,
        (';', _) => Semicolon,
        (',', _) => Comma,
        ('.', _) => Period,
        ('(', _) => LParen,
        (')', _) => RParen,
        ('[', _) => LBracket,
        (']', _) => RBracket,
        ('{', _) => LCurly,
        ('}', _) => RCurly,
        _ => return None,
    };
    Some((kind, 1))
}

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("function", TokenKind::KwFunction),
    ("inline", TokenKind::KwInline),
    ("interrupt", TokenKind::KwInterrupt),
    ("noreturn", TokenKind::KwNoreturn),
    ("if", TokenKind::KwIf),
    ("else", TokenKind::KwElse),
    ("while", TokenKind::KwWhile),
    ("do", TokenKind::KwDo),
    ("forever", TokenKind::KwForever),
    ("switch", TokenKind::KwSwitch),
    ("case", TokenKind::KwCase),
    ("default", TokenKind::KwDefault),
    ("return", TokenKind::KwReturn),
    ("struct", TokenKind::KwStruct),
    ("typedef", TokenKind::KwTypedef),
    ("enum", TokenKind::KwEnum),
    ("shared", TokenKind::KwShared),
    ("sizeof", TokenKind::KwSizeof),
];
