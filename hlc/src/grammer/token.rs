use crate::error::Pos;
use std::fmt;

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Pos,
}

impl Token {
    pub fn new(kind: TokenKind, pos: Pos) -> Self {
        Token { kind, pos }
    }
}

/// Lexical classes. Punctuation is named after its glyph.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LAngleLAngle,
    RAngleRAngle,
    LAngle,
    RAngle,
    Equal,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Ampasand,
    Pipe,
    Caret,
    Tilde,
    Hash,
    Colon,
    Semicolon,
    Comma,
    Period,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LCurly,
    RCurly,

    KwFunction,
    KwInline,
    KwInterrupt,
    KwNoreturn,
    KwIf,
    KwElse,
    KwWhile,
    KwDo,
    KwForever,
    KwSwitch,
    KwCase,
    KwDefault,
    KwReturn,
    KwStruct,
    KwTypedef,
    KwEnum,
    KwShared,
    KwSizeof,

    Ident(String),
    /// Source spelling and value.
    Number(String, i64),
    Text(String),
    Char(char),

    Newline,
    Comment(String),
    /// Input the lexer could not classify, kept for the parser to report.
    Error(String),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier {name}"),
            TokenKind::Number(lexeme, _) => write!(f, "number {lexeme}"),
            TokenKind::Text(text) => write!(f, "text {text:?}"),
            TokenKind::Char(ch) => write!(f, "char {ch:?}"),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Error(lexeme) => write!(f, "invalid input {lexeme:?}"),
            kind => write!(f, "{kind:?}"),
        }
    }
}
