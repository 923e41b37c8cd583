use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Lo,
    Hi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

/// Operand expression.
///
/// `Name` is a source identifier (possibly dotted, `player.x`) that has not
/// been bound yet; `Ref` is a bound symbol whose address is only known once
/// layout assigns it.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(i64),
    Name(String),
    Ref(String),
    Sizeof(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl UnaryOp {
    pub fn apply(self, v: i64) -> i64 {
        match self {
            UnaryOp::Neg => v.wrapping_neg(),
            UnaryOp::Not => !v,
            UnaryOp::Lo => v & 0xFF,
            UnaryOp::Hi => (v >> 8) & 0xFF,
        }
    }
}

impl BinaryOp {
    pub fn apply(self, l: i64, r: i64) -> Result<i64, EvalError> {
        Ok(match self {
            BinaryOp::Add => l.wrapping_add(r),
            BinaryOp::Sub => l.wrapping_sub(r),
            BinaryOp::Mul => l.wrapping_mul(r),
            BinaryOp::Div => l.checked_div(r).ok_or(EvalError::DivisionByZero)?,
            BinaryOp::Mod => l.checked_rem(r).ok_or(EvalError::DivisionByZero)?,
            BinaryOp::And => l & r,
            BinaryOp::Or => l | r,
            BinaryOp::Xor => l ^ r,
            BinaryOp::Shl => l.wrapping_shl(r as u32),
            BinaryOp::Shr => l.wrapping_shr(r as u32),
        })
    }

    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }
}

impl Expr {
    pub fn binary(op: BinaryOp, l: Expr, r: Expr) -> Self {
        Expr::Binary(op, Box::new(l), Box::new(r))
    }

    pub fn unary(op: UnaryOp, e: Expr) -> Self {
        Expr::Unary(op, Box::new(e))
    }

    pub fn number(&self) -> Option<i64> {
        match self {
            Expr::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Folds constant subtrees into numbers.
    pub fn fold(self) -> Result<Self, EvalError> {
        Ok(match self {
            Expr::Unary(op, e) => match e.fold()? {
                Expr::Number(v) => Expr::Number(op.apply(v)),
                e => Expr::unary(op, e),
            },
            Expr::Binary(op, l, r) => match (l.fold()?, r.fold()?) {
                (Expr::Number(l), Expr::Number(r)) => Expr::Number(op.apply(l, r)?),
                (l, r) => Expr::binary(op, l, r),
            },
            e => e,
        })
    }

    /// Evaluates with bound addresses. `Ok(None)` means some reference is
    /// still unknown.
    pub fn eval<F: Fn(&str) -> Option<i64>>(&self, lookup: &F) -> Result<Option<i64>, EvalError> {
        Ok(match self {
            Expr::Number(n) => Some(*n),
            Expr::Ref(key) => lookup(key),
            Expr::Name(_) | Expr::Sizeof(_) => None,
            Expr::Unary(op, e) => e.eval(lookup)?.map(|v| op.apply(v)),
            Expr::Binary(op, l, r) => match (l.eval(lookup)?, r.eval(lookup)?) {
                (Some(l), Some(r)) => Some(op.apply(l, r)?),
                _ => None,
            },
        })
    }

    /// Replaces bare names found in `args`, used for inline function parameters.
    pub fn substitute(&self, args: &IndexMap<String, Expr>) -> Self {
        match self {
            Expr::Name(name) => args.get(name).cloned().unwrap_or_else(|| self.clone()),
            Expr::Unary(op, e) => Expr::unary(*op, e.substitute(args)),
            Expr::Binary(op, l, r) => Expr::binary(*op, l.substitute(args), r.substitute(args)),
            e => e.clone(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) if *n > 9 => write!(f, "0x{n:X}"),
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Name(name) | Expr::Ref(name) => write!(f, "{name}"),
            Expr::Sizeof(name) => write!(f, "sizeof({name})"),
            Expr::Unary(UnaryOp::Neg, e) => write!(f, "-{e}"),
            Expr::Unary(UnaryOp::Not, e) => write!(f, "~{e}"),
            Expr::Unary(UnaryOp::Lo, e) => write!(f, "lo({e})"),
            Expr::Unary(UnaryOp::Hi, e) => write!(f, "hi({e})"),
            Expr::Binary(op, l, r) => write!(f, "({l}{}{r})", op.symbol()),
        }
    }
}
