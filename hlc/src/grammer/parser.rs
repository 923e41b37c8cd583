use super::parsercore::Parser;
use super::token::{Token, TokenKind::*};
use crate::error::{Error, Pos};
use crate::scope::Namespace;
use crate::token::{self as ast, BinaryOp, DeclKind, Dim, Expr, InitValue, UnaryOp};
use crate::{check, expect, optional, recover, repeat};
use arch::{Condition, Cpu, Distance, Mode, Op, Operand, Polarity, Reg, Test};
use indexmap::IndexMap;

impl<I: Iterator<Item = Token>> Parser<I> {
    /// Parses one code chunk into primitive tokens for the structurer.
    pub fn parse(mut self, cpu: &dyn Cpu) -> (Vec<ast::Token>, Vec<Error>) {
        let mut tokens = Vec::new();
        loop {
            while optional!(self, Newline | Semicolon).is_some() {}
            if self.peek().is_none() {
                break;
            }
            match self.parse_statement(cpu) {
                Ok(toks) => tokens.extend(toks),
                Err(err) => {
                    self.error(err);
                    recover!(self, Newline);
                }
            }
        }
        (tokens, self.into_errors())
    }
}

impl<I: Iterator<Item = Token>> Parser<I> {
    fn parse_statement(&mut self, cpu: &dyn Cpu) -> Result<Vec<ast::Token>, Error> {
        let Some(token) = self.peek() else {
            return Err(self.eof());
        };
        let pos = token.pos.clone();
        match token.kind.clone() {
            KwFunction | KwInline | KwInterrupt => single(ast::Token::FunctionDecl(self.parse_function()?)),
            KwIf | KwElse | KwWhile | KwDo | KwForever | KwSwitch | KwCase | KwDefault => {
                single(ast::Token::ConditionalDecl(self.parse_conditional()?))
            }
            LCurly => {
                self.next();
                single(ast::Token::ScopeBegin(pos))
            }
            RCurly => {
                self.next();
                single(ast::Token::ScopeEnd(pos))
            }
            KwReturn => {
                self.next();
                single(ast::Token::FunctionReturn(ast::FunctionReturn {
                    interrupt: false,
                    pos,
                }))
            }
            KwStruct | KwTypedef | KwEnum => single(ast::Token::TypeDecl(self.parse_typedecl()?)),
            KwShared => {
                self.next();
                let ty = self.parse_ident()?;
                self.parse_variable(true, ty, pos)
            }
            Ident(name) => {
                self.next();
                if optional!(self, Colon).is_some() {
                    return single(ast::Token::Label(ast::Label::new(&name, pos)));
                }
                if let Some(op) = Op::parse(&name) {
                    if !cpu.supports(op) {
                        return Err(Error::UnsupportedOp(pos, name, cpu.name()));
                    }
                    let operand = self.parse_operand(op, cpu)?;
                    return single(ast::Token::InstructionLine(ast::InstructionLine::new(
                        op,
                        operand,
                        Namespace::global(),
                        pos,
                    )));
                }
                if check!(self, Ident(_)) {
                    return self.parse_variable(false, name, pos);
                }
                if check!(self, LParen) {
                    return single(ast::Token::FunctionCall(self.parse_call(name, pos)?));
                }
                Err(self.unexpected())
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_ident(&mut self) -> Result<String, Error> {
        match expect!(self, Ident(_))?.kind {
            Ident(name) => Ok(name),
            _ => Err(self.eof()),
        }
    }

    /// function = "function" ["noreturn"] ident "(" ")"
    /// inline = "inline" ident "(" [ ident { "," ident } ] ")"
    /// interrupt = "interrupt" [ "." ident ] ["noreturn"] ident "(" ")"
    fn parse_function(&mut self) -> Result<ast::FunctionDecl, Error> {
        let Some(keyword) = self.next() else {
            return Err(self.eof());
        };
        let kind = match keyword.kind {
            KwFunction => ast::FunctionKind::Subroutine,
            KwInline => ast::FunctionKind::Macro,
            _ => ast::FunctionKind::Interrupt(optional!(self, Period, self.parse_ident()?)),
        };
        let noreturn = optional!(self, KwNoreturn).is_some();
        let name = self.parse_ident()?;
        expect!(self, LParen)?;
        let params = repeat!(self, self.parse_ident(), Comma, RParen);
        expect!(self, RParen)?;
        if kind != ast::FunctionKind::Macro && !params.is_empty() {
            return Err(Error::UnexpectedParams(keyword.pos, name));
        }
        Ok(ast::FunctionDecl {
            name,
            kind,
            noreturn,
            params,
            pos: keyword.pos,
        })
    }

    /// conditional = "if" test | "else" | "while" test | "do" | "forever"
    ///             | "switch" "(" reg ")" | "case" [ "#" ] expr | "default"
    fn parse_conditional(&mut self) -> Result<ast::ConditionalDecl, Error> {
        let Some(keyword) = self.next() else {
            return Err(self.eof());
        };
        let kind = match keyword.kind {
            KwIf => DeclKind::If(self.parse_test()?),
            KwElse => DeclKind::Else,
            KwWhile => DeclKind::While(self.parse_test()?),
            KwDo => DeclKind::Do,
            KwForever => DeclKind::Forever,
            KwSwitch => DeclKind::Switch(self.parse_reg()?),
            KwCase => {
                optional!(self, Hash);
                DeclKind::Case(self.parse_expr()?)
            }
            _ => DeclKind::Default,
        };
        Ok(ast::ConditionalDecl {
            kind,
            pos: keyword.pos,
        })
    }

    /// test = "(" [ "near" | "far" ] [ "is" | "has" | "no" | "not" ] condition ")"
    fn parse_test(&mut self) -> Result<Test, Error> {
        expect!(self, LParen)?;
        let mut words = Vec::new();
        while !check!(self, RParen) {
            let token = expect!(self, Ident(_) | Number(..))?;
            match token.kind {
                Ident(word) | Number(word, _) => words.push((word, token.pos)),
                _ => return Err(self.eof()),
            }
        }
        let close = expect!(self, RParen)?;

        let mut words = words.into_iter().peekable();
        let distance = match words.next_if(|(word, _)| word.parse::<Distance>().is_ok()) {
            Some((word, _)) => word.parse().unwrap_or_default(),
            None => Distance::Near,
        };
        let polarity = match words.next_if(|(word, _)| word.parse::<Polarity>().is_ok()) {
            Some((word, _)) => word.parse().unwrap_or_default(),
            None => Polarity::Is,
        };
        let cond = match words.next() {
            Some((word, pos)) => word
                .parse::<Condition>()
                .map_err(|_| Error::UnexpectedToken(pos, format!("condition {word}")))?,
            None => return Err(Error::UnexpectedToken(close.pos, "empty test".to_string())),
        };
        if let Some((word, pos)) = words.next() {
            return Err(Error::UnexpectedToken(pos, format!("identifier {word}")));
        }
        Ok(Test {
            distance,
            polarity,
            cond,
        })
    }

    /// reg = "(" [ "reg" "." ] ( "a" | "x" | "y" ) ")"
    fn parse_reg(&mut self) -> Result<Reg, Error> {
        expect!(self, LParen)?;
        let pos = self.peek().map(|token| token.pos.clone()).unwrap_or_default();
        let mut name = self.parse_ident()?;
        if optional!(self, Period).is_some() {
            name = format!("{name}.{}", self.parse_ident()?);
        }
        expect!(self, RParen)?;
        Reg::parse(&name).map_err(|msg| Error::UnexpectedToken(pos, msg))
    }

    /// operand = [ "#" expr | "(" expr "," "x" ")" | "(" expr ")" [ "," "y" ]
    ///           | expr [ "," ( "x" | "y" ) ] ]
    fn parse_operand(&mut self, op: Op, cpu: &dyn Cpu) -> Result<Operand<Expr>, Error> {
        if !check!(
            self,
            Hash | LParen | Ident(_) | Number(..) | Char(_) | Minus | Tilde | LAngle | RAngle | KwSizeof
        ) {
            return Ok(Operand::None);
        }

        if optional!(self, Hash).is_some() {
            return Ok(Operand::Immediate(self.parse_expr()?));
        }

        if optional!(self, LParen).is_some() {
            let expr = self.parse_expr()?;
            if optional!(self, Comma).is_some() {
                self.parse_index("x")?;
                expect!(self, RParen)?;
                return Ok(Operand::IndexedIndirect(expr));
            }
            expect!(self, RParen)?;
            if optional!(self, Comma).is_some() {
                self.parse_index("y")?;
                return Ok(Operand::IndirectIndexed(expr));
            }
            return Ok(Operand::Indirect(expr));
        }

        let expr = self.parse_expr()?;
        if optional!(self, Comma).is_some() {
            let token = expect!(self, Ident(_))?;
            return match token.kind {
                Ident(reg) if reg.eq_ignore_ascii_case("x") => Ok(Operand::IndexedX(expr)),
                Ident(reg) if reg.eq_ignore_ascii_case("y") => Ok(Operand::IndexedY(expr)),
                kind => Err(Error::UnexpectedToken(token.pos, kind.to_string())),
            };
        }
        match &expr {
            Expr::Name(name)
                if name.eq_ignore_ascii_case("a") && cpu.opcode(op, Mode::Accumulator).is_some() =>
            {
                Ok(Operand::Accumulator)
            }
            _ => Ok(Operand::Address(expr)),
        }
    }

    fn parse_index(&mut self, reg: &str) -> Result<(), Error> {
        let token = expect!(self, Ident(_))?;
        match token.kind {
            Ident(name) if name.eq_ignore_ascii_case(reg) => Ok(()),
            kind => Err(Error::UnexpectedToken(token.pos, kind.to_string())),
        }
    }

    /// call = ident "(" [ expr { "," expr } ] ")"
    fn parse_call(&mut self, name: String, pos: Pos) -> Result<ast::FunctionCall, Error> {
        expect!(self, LParen)?;
        let args = repeat!(self, self.parse_expr(), Comma, RParen);
        expect!(self, RParen)?;
        Ok(ast::FunctionCall {
            name,
            args,
            ns: Namespace::global(),
            expansion: Vec::new(),
            pos,
        })
    }

    /// dim = [ "[" [ expr ] "]" ]
    fn parse_dim(&mut self) -> Result<Dim, Error> {
        if optional!(self, LBracket).is_none() {
            return Ok(Dim::Scalar);
        }
        if optional!(self, RBracket).is_some() {
            return Ok(Dim::Array(None));
        }
        let len = self.parse_expr()?;
        expect!(self, RBracket)?;
        Ok(Dim::Array(Some(len)))
    }

    /// variable = [ "shared" ] type ident dim [ ":" expr ] [ "=" initializer ]
    fn parse_variable(&mut self, shared: bool, ty: String, pos: Pos) -> Result<Vec<ast::Token>, Error> {
        let name = self.parse_ident()?;
        let dim = self.parse_dim()?;
        let address = optional!(self, Colon, self.parse_expr()?);
        let init = optional!(self, Equal, self.parse_initializer()?);

        let mut tokens = vec![ast::Token::Variable(ast::Variable {
            ty,
            name,
            shared,
            dim,
            address,
            init: None,
            ns: Namespace::global(),
            size: None,
            pos,
        })];
        tokens.extend(init.map(ast::Token::Initializer));
        Ok(tokens)
    }

    /// initializer = text | expr | "{" [ expr { "," expr } [ "," ] ] "}"
    fn parse_initializer(&mut self) -> Result<ast::Initializer, Error> {
        let pos = self.peek().map(|token| token.pos.clone()).ok_or_else(|| self.eof())?;
        if let Some(Token { kind: Text(text), .. }) = optional!(self, Text(_)) {
            return Ok(ast::Initializer {
                value: InitValue::Text(text),
                pos,
            });
        }
        if optional!(self, LCurly).is_none() {
            return Ok(ast::Initializer {
                value: InitValue::Values(vec![self.parse_expr()?]),
                pos,
            });
        }
        let mut values = Vec::new();
        loop {
            self.skip_newlines();
            if optional!(self, RCurly).is_some() {
                break;
            }
            values.push(self.parse_expr()?);
            self.skip_newlines();
            if optional!(self, Comma).is_none() {
                expect!(self, RCurly)?;
                break;
            }
        }
        Ok(ast::Initializer {
            value: InitValue::Values(values),
            pos,
        })
    }

    /// struct = "struct" ident "{" { ident ident dim [ "," | ";" ] } "}"
    /// typedef = "typedef" ident ident dim
    /// enum = "enum" ident "{" [ ident [ "=" expr ] { "," ident [ "=" expr ] } ] "}"
    fn parse_typedecl(&mut self) -> Result<ast::TypeDecl, Error> {
        let Some(keyword) = self.next() else {
            return Err(self.eof());
        };
        let pos = keyword.pos;
        match keyword.kind {
            KwStruct => {
                let name = self.parse_ident()?;
                self.skip_newlines();
                expect!(self, LCurly)?;
                let mut fields = Vec::new();
                loop {
                    while optional!(self, Newline | Comma | Semicolon).is_some() {}
                    if optional!(self, RCurly).is_some() {
                        break;
                    }
                    let ty = self.parse_ident()?;
                    let name = self.parse_ident()?;
                    let dim = self.parse_dim()?;
                    fields.push(ast::Field { ty, name, dim });
                }
                Ok(ast::TypeDecl::Struct(ast::StructDef { name, fields }, pos))
            }
            KwTypedef => {
                let ty = self.parse_ident()?;
                let name = self.parse_ident()?;
                let dim = self.parse_dim()?;
                Ok(ast::TypeDecl::Typedef(ast::Typedef { name, ty, dim }, pos))
            }
            _ => {
                let name = self.parse_ident()?;
                self.skip_newlines();
                expect!(self, LCurly)?;
                let mut members: IndexMap<String, i64> = IndexMap::new();
                let mut next = 0;
                loop {
                    while optional!(self, Newline | Comma).is_some() {}
                    if optional!(self, RCurly).is_some() {
                        break;
                    }
                    let member = self.parse_ident()?;
                    if optional!(self, Equal).is_some() {
                        let known = members
                            .iter()
                            .map(|(name, value)| (name.clone(), Expr::Number(*value)))
                            .collect();
                        next = self.parse_const_with(&known)?;
                    }
                    members.insert(member, next);
                    next += 1;
                }
                Ok(ast::TypeDecl::Enum(ast::EnumDef { name, members }, pos))
            }
        }
    }
}

fn single(token: ast::Token) -> Result<Vec<ast::Token>, Error> {
    Ok(vec![token])
}

// ----------------------------------------------------------------------------
// Expressions
// ----------------------------------------------------------------------------

const LEVELS: usize = 6;

fn binary_op(kind: &super::token::TokenKind, level: usize) -> Option<BinaryOp> {
    match (level, kind) {
        (0, Pipe) => Some(BinaryOp::Or),
        (1, Caret) => Some(BinaryOp::Xor),
        (2, Ampasand) => Some(BinaryOp::And),
        (3, LAngleLAngle) => Some(BinaryOp::Shl),
        (3, RAngleRAngle) => Some(BinaryOp::Shr),
        (4, Plus) => Some(BinaryOp::Add),
        (4, Minus) => Some(BinaryOp::Sub),
        (5, Star) => Some(BinaryOp::Mul),
        (5, Slash) => Some(BinaryOp::Div),
        (5, Percent) => Some(BinaryOp::Mod),
        _ => None,
    }
}

impl<I: Iterator<Item = Token>> Parser<I> {
    /// expr = or, constant parts folded
    pub fn parse_expr(&mut self) -> Result<Expr, Error> {
        let pos = self.peek().map(|token| token.pos.clone()).unwrap_or_default();
        self.parse_binary(0)?
            .fold()
            .map_err(|err| Error::Eval(pos, err))
    }

    /// An expression that must fold to a number.
    pub fn parse_const(&mut self) -> Result<i64, Error> {
        self.parse_const_with(&IndexMap::new())
    }

    fn parse_const_with(&mut self, known: &IndexMap<String, Expr>) -> Result<i64, Error> {
        let pos = self.peek().map(|token| token.pos.clone()).unwrap_or_default();
        let expr = self
            .parse_expr()?
            .substitute(known)
            .fold()
            .map_err(|err| Error::Eval(pos.clone(), err))?;
        expr.number()
            .ok_or_else(|| Error::NotAConstant(pos, expr.to_string()))
    }

    fn parse_binary(&mut self, level: usize) -> Result<Expr, Error> {
        if level == LEVELS {
            return self.parse_unary();
        }
        let mut lhs = self.parse_binary(level + 1)?;
        while let Some(op) = self.peek().and_then(|token| binary_op(&token.kind, level)) {
            self.next();
            let rhs = self.parse_binary(level + 1)?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    /// unary = ( "-" | "~" | "<" | ">" ) unary | primary
    fn parse_unary(&mut self) -> Result<Expr, Error> {
        let op = match self.peek().map(|token| &token.kind) {
            Some(Minus) => Some(UnaryOp::Neg),
            Some(Tilde) => Some(UnaryOp::Not),
            Some(LAngle) => Some(UnaryOp::Lo),
            Some(RAngle) => Some(UnaryOp::Hi),
            _ => None,
        };
        match op {
            Some(op) => {
                self.next();
                Ok(Expr::unary(op, self.parse_unary()?))
            }
            None => self.parse_primary(),
        }
    }

    /// primary = number | char | "(" expr ")" | "sizeof" "(" name ")"
    ///         | ( "lo" | "hi" ) "(" expr ")" | name
    /// name = ident { "." ident }
    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let Some(token) = self.next() else {
            return Err(self.eof());
        };
        match token.kind {
            Number(_, value) => Ok(Expr::Number(value)),
            Char(ch) => Ok(Expr::Number(ch as i64)),
            LParen => {
                let expr = self.parse_binary(0)?;
                expect!(self, RParen)?;
                Ok(expr)
            }
            KwSizeof => {
                expect!(self, LParen)?;
                let name = self.parse_name()?;
                expect!(self, RParen)?;
                Ok(Expr::Sizeof(name))
            }
            Ident(name) if (name == "lo" || name == "hi") && check!(self, LParen) => {
                expect!(self, LParen)?;
                let expr = self.parse_binary(0)?;
                expect!(self, RParen)?;
                let op = if name == "lo" { UnaryOp::Lo } else { UnaryOp::Hi };
                Ok(Expr::unary(op, expr))
            }
            Ident(mut name) => {
                while optional!(self, Period).is_some() {
                    name.push('.');
                    name.push_str(&self.parse_ident()?);
                }
                Ok(Expr::Name(name))
            }
            kind => Err(Error::UnexpectedToken(token.pos, kind.to_string())),
        }
    }

    fn parse_name(&mut self) -> Result<String, Error> {
        let mut name = self.parse_ident()?;
        while optional!(self, Period).is_some() {
            name.push('.');
            name.push_str(&self.parse_ident()?);
        }
        Ok(name)
    }
}
