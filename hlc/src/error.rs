use crate::token::expr::EvalError;
use arch::EncodeError;
use std::fmt;
use thiserror::Error;

/// Source location of a token, without a lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pos {
    pub file: String,
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub fn new(file: &str, row: usize, col: usize) -> Self {
        Self {
            file: file.to_string(),
            row,
            col,
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.row + 1, self.col + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Syntax,
    Structural,
    Reference,
    Convergence,
    Layout,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Syntax errors
    #[error("{0}: unexpected end of input")]
    UnexpectedEOF(Pos),

    #[error("{0}: unexpected {1}")]
    UnexpectedToken(Pos, String),

    #[error("{0}: unknown directive: {1}")]
    UnknownDirective(Pos, String),

    #[error("{0}: {1} is not a constant")]
    NotAConstant(Pos, String),

    #[error("{0}: {1} is out of range")]
    OutOfRange(Pos, i64),

    #[error("{0}: {1} is not supported by the {2}")]
    UnsupportedOp(Pos, String, &'static str),

    // Structural errors
    #[error("{0}: function {1} must be declared at file scope")]
    NestedFunction(Pos, String),

    #[error("{0}: function {1} must be followed by a block")]
    FunctionWithoutBlock(Pos, String),

    #[error("{0}: only inline functions take parameters: {1}")]
    UnexpectedParams(Pos, String),

    #[error("{0}: unmatched block close")]
    UnmatchedClose(Pos),

    #[error("{0}: else without if")]
    ElseWithoutIf(Pos),

    #[error("{0}: {1} outside of a switch")]
    CaseOutsideSwitch(Pos, String),

    #[error("{0}: switch already has a default")]
    DuplicateDefault(Pos),

    #[error("{0}: statement outside of a case")]
    StatementInSwitch(Pos),

    #[error("{0}: {1} must hold exactly one block")]
    MalformedCase(Pos, String),

    #[error("{0}: do block is not followed by while")]
    DoWithoutWhile(Pos),

    #[error("{0}: {1} has no statement")]
    MissingStatement(Pos, String),

    #[error("{0}: return outside of a function")]
    ReturnOutsideFunction(Pos),

    #[error("{0}: return inside inline function {1}")]
    ReturnInInline(Pos, String),

    #[error("{0}: initializer without a variable")]
    StrayInitializer(Pos),

    #[error("{0}: {1} unclosed block(s)")]
    UnclosedBlock(Pos, usize),

    #[error("{0}: {1} left over after structuring")]
    Unstructured(Pos, String),

    #[error("cannot pop the global namespace")]
    PopGlobal,

    // Reference errors
    #[error("{0}: unknown function: {1}")]
    UnknownFunction(Pos, String),

    #[error("{0}: {1} is not a function")]
    NotAFunction(Pos, String),

    #[error("{0}: unknown type: {1}")]
    UnknownType(Pos, String),

    #[error("{0}: {1} is not a value")]
    NotAValue(Pos, String),

    #[error("{0}: {1} has no member {2}")]
    NoSuchMember(Pos, String, String),

    #[error("{0}: {1} takes {2} argument(s), got {3}")]
    ArgumentCount(Pos, String, usize, usize),

    #[error("{0}: invalid operand for {1}")]
    InvalidOperand(Pos, String),

    #[error("{0}: {1}")]
    Eval(Pos, EvalError),

    #[error("{0}: {1} is defined in terms of itself")]
    RecursiveDefinition(Pos, String),

    #[error("{0}: {1} names both a function and a label or variable")]
    NameClash(Pos, String),

    // Convergence errors
    #[error("{stage} made no progress after {rounds} round(s), stuck on:\n{}", .stuck.join("\n"))]
    NoProgress {
        stage: &'static str,
        rounds: usize,
        stuck: Vec<String>,
    },

    #[error("{0}: inline function {1} expands into itself")]
    RecursiveMacro(Pos, String),

    #[error("{0} did not converge within {1} rounds")]
    TooManyRounds(&'static str, usize),

    // Layout errors
    #[error("{0}: region 0x{1:04X}-0x{2:04X} overlaps region 0x{3:04X}-0x{4:04X} in bank {5}")]
    RegionOverlap(Pos, usize, usize, usize, usize, usize),

    #[error("{0}: bank {1} already has an open region")]
    RegionAlreadyOpen(Pos, usize),

    #[error("{0}: no open region in bank {1}")]
    NoOpenRegion(Pos, usize),

    #[error("{0}: region at 0x{1:04X} exceeds its size of {2} bytes")]
    RegionOverflow(Pos, usize, usize),

    #[error("{0}: bank {1} exceeds its size of {2} bytes")]
    BankOverflow(Pos, usize, usize),

    #[error("{0}: no open ram region to place {1}")]
    NoRamRegion(Pos, String),

    #[error("{0}: ram region is full, cannot place {2} bytes for {1}")]
    RamOverflow(Pos, String, usize),

    #[error("{0}: {1} is bound to both 0x{2:04X} and 0x{3:04X}")]
    DuplicateLabel(Pos, String, u16, u16),

    #[error("{0}: address 0x{1:X} is outside the address space")]
    AddressOutOfRange(Pos, usize),

    #[error("{0}: {1}")]
    Encode(Pos, EncodeError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            Io(_) => ErrorKind::Io,
            UnexpectedEOF(..)
            | UnexpectedToken(..)
            | UnknownDirective(..)
            | NotAConstant(..)
            | OutOfRange(..)
            | UnsupportedOp(..) => ErrorKind::Syntax,
            NestedFunction(..)
            | FunctionWithoutBlock(..)
            | UnexpectedParams(..)
            | UnmatchedClose(..)
            | ElseWithoutIf(..)
            | CaseOutsideSwitch(..)
            | DuplicateDefault(..)
            | StatementInSwitch(..)
            | MalformedCase(..)
            | DoWithoutWhile(..)
            | MissingStatement(..)
            | ReturnOutsideFunction(..)
            | ReturnInInline(..)
            | StrayInitializer(..)
            | UnclosedBlock(..)
            | Unstructured(..)
            | PopGlobal => ErrorKind::Structural,
            UnknownFunction(..)
            | NotAFunction(..)
            | UnknownType(..)
            | NotAValue(..)
            | NoSuchMember(..)
            | ArgumentCount(..)
            | InvalidOperand(..)
            | Eval(..)
            | RecursiveDefinition(..)
            | NameClash(..) => ErrorKind::Reference,
            NoProgress { .. } | RecursiveMacro(..) | TooManyRounds(..) => ErrorKind::Convergence,
            RegionOverlap(..)
            | RegionAlreadyOpen(..)
            | NoOpenRegion(..)
            | RegionOverflow(..)
            | BankOverflow(..)
            | NoRamRegion(..)
            | RamOverflow(..)
            | DuplicateLabel(..)
            | AddressOutOfRange(..)
            | Encode(..) => ErrorKind::Layout,
        }
    }
}
