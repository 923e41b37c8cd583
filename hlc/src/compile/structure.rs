use crate::error::{Error, Pos};
use crate::scope::{FunctionSymbol, Namespace, Symbol};
use crate::session::Session;
use crate::token::{
    Block, CondMode, Conditional, ConditionalDecl, DeclKind, Function, FunctionDecl,
    FunctionReturn, Token, TypeDecl,
};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Folds a flat token stream into Function and Conditional containers.
///
/// Braced, brace-less and chained brace-less blocks all end up in the same
/// shape, so `if (zero) { inx }` and `if (zero) inx` give equal trees.
pub fn structure(session: &mut Session, tokens: Vec<Token>) -> Result<Vec<Token>, Error> {
    let count = tokens.len();
    let output = Structurer::new(session, tokens).run()?;
    debug!(input = count, output = output.len(), "structured");
    Ok(output)
}

/// Token queue with one token of lookahead and pushback.
struct Cursor {
    queue: VecDeque<Token>,
}

impl Cursor {
    fn next(&mut self) -> Option<Token> {
        self.queue.pop_front()
    }

    fn peek(&self) -> Option<&Token> {
        self.queue.front()
    }

    fn push_front(&mut self, token: Token) {
        self.queue.push_front(token);
    }
}

enum Frame {
    Function {
        func: Function,
        depth: usize,
    },
    /// `one_line` is set when the block was opened by a brace-less
    /// conditional, and must be closed as soon as that child is done.
    Conditional {
        cond: Conditional,
        one_line: bool,
    },
}

impl Frame {
    fn pos(&self) -> Pos {
        match self {
            Frame::Function { func, .. } => func.decl.pos.clone(),
            Frame::Conditional { cond, .. } => cond.pos().clone(),
        }
    }
}

struct Structurer<'s> {
    session: &'s mut Session,
    input: Cursor,
    frames: Vec<Frame>,
    /// Bare blocks opened outside of any container.
    bare: Vec<Pos>,
    output: Vec<Token>,
}

impl<'s> Structurer<'s> {
    fn new(session: &'s mut Session, tokens: Vec<Token>) -> Self {
        Self {
            session,
            input: Cursor {
                queue: tokens.into(),
            },
            frames: Vec::new(),
            bare: Vec::new(),
            output: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, Error> {
        while let Some(token) = self.input.next() {
            self.step(token)?;
        }
        self.check_closed()?;
        Ok(self.output)
    }

    /// A subroutine's entry label is its own name, so it must not share that
    /// name with a global label or variable.
    fn claim_global(&self, symbol: &Symbol, pos: &Pos) -> Result<(), Error> {
        let placed = |symbol: &Symbol| match symbol {
            Symbol::Function(func) => Some(!func.decl.is_macro()),
            Symbol::Label(_) | Symbol::Variable(_) => Some(false),
            _ => None,
        };
        let global = Namespace::global();
        let Some((ns, existing)) = self.session.scopes.lookup_entry(symbol.name(), Some(&global)) else {
            return Ok(());
        };
        match (placed(existing), placed(symbol)) {
            (Some(a), Some(b)) if ns == global && a != b && (a || b) => {
                Err(Error::NameClash(pos.clone(), symbol.name().to_string()))
            }
            _ => Ok(()),
        }
    }

    fn ns(&self) -> Namespace {
        self.session.scopes.current().clone()
    }

    fn check_closed(&self) -> Result<(), Error> {
        let open = self.frames.len() + self.bare.len();
        match (self.frames.first(), self.bare.first()) {
            (Some(frame), _) => Err(Error::UnclosedBlock(frame.pos(), open)),
            (None, Some(pos)) => Err(Error::UnclosedBlock(pos.clone(), open)),
            (None, None) => Ok(()),
        }
    }

    fn step(&mut self, token: Token) -> Result<(), Error> {
        match token {
            Token::FunctionDecl(decl) => self.function(decl),
            Token::ConditionalDecl(decl) => self.conditional(decl),
            Token::ScopeBegin(pos) => self.open_bare(pos),
            Token::ScopeEnd(pos) => self.close(pos),
            Token::Variable(mut var) => {
                var.ns = self.ns();
                if matches!(self.input.peek(), Some(Token::Initializer(_))) {
                    if let Some(Token::Initializer(init)) = self.input.next() {
                        var.init = Some(init);
                    }
                }
                let symbol = Symbol::Variable(var.clone());
                if var.ns == Namespace::global() {
                    self.claim_global(&symbol, &var.pos)?;
                }
                self.session.scopes.define(symbol, None);
                self.emit(Token::Variable(var))
            }
            Token::Initializer(init) => Err(Error::StrayInitializer(init.pos)),
            Token::Label(label) => {
                let symbol = Symbol::Label(label.clone());
                self.claim_global(&symbol, &label.pos)?;
                self.session.scopes.define(symbol, Some(&Namespace::global()));
                self.emit(Token::Label(label))
            }
            Token::TypeDecl(decl) => {
                let symbol = match decl {
                    TypeDecl::Struct(def, _) => Symbol::Struct(def),
                    TypeDecl::Typedef(def, _) => Symbol::Typedef(def),
                    TypeDecl::Enum(def, _) => Symbol::Enum(def),
                };
                self.session.scopes.define(symbol, None);
                Ok(())
            }
            Token::FunctionReturn(ret) => self.ret(ret),
            Token::FunctionCall(mut call) => {
                call.ns = self.ns();
                self.emit(Token::FunctionCall(call))
            }
            Token::InstructionLine(mut line) => {
                line.ns = self.ns();
                self.emit(Token::InstructionLine(line))
            }
            Token::FileEnd(name) => {
                self.check_closed()?;
                self.emit(Token::FileEnd(name))
            }
            token @ (Token::FileBegin(_)
            | Token::Directive(..)
            | Token::Function(_)
            | Token::Conditional(_)) => self.emit(token),
        }
    }

    fn function(&mut self, decl: FunctionDecl) -> Result<(), Error> {
        if !self.frames.is_empty() || !self.bare.is_empty() {
            return Err(Error::NestedFunction(decl.pos, decl.name));
        }
        if !matches!(self.input.next(), Some(Token::ScopeBegin(_))) {
            return Err(Error::FunctionWithoutBlock(decl.pos, decl.name));
        }
        let ns = self.session.scopes.push(Some(&decl.name)).clone();
        trace!(name = %decl.name, "open function");
        self.frames.push(Frame::Function {
            func: Function {
                decl,
                body: Vec::new(),
                ns,
            },
            depth: 1,
        });
        Ok(())
    }

    fn conditional(&mut self, decl: ConditionalDecl) -> Result<(), Error> {
        let ns = self.ns();
        match (decl.kind.clone(), self.frames.last_mut()) {
            (DeclKind::Else, Some(Frame::Conditional { cond, .. }))
                if cond.mode == CondMode::If && cond.depth == 0 =>
            {
                cond.mode = CondMode::IfElse;
                cond.blocks.push(Block::new(decl));
            }
            (DeclKind::Else, _) => return Err(Error::ElseWithoutIf(decl.pos)),
            (DeclKind::Case(_) | DeclKind::Default, Some(Frame::Conditional { cond, .. }))
                if cond.is_switch() && cond.depth == 1 =>
            {
                if decl.kind == DeclKind::Default {
                    if cond.mode == CondMode::SwitchDefault {
                        return Err(Error::DuplicateDefault(decl.pos));
                    }
                    cond.mode = CondMode::SwitchDefault;
                }
                self.frames.push(Frame::Conditional {
                    cond: Conditional::new(decl, 0, ns),
                    one_line: false,
                });
            }
            (DeclKind::Case(_) | DeclKind::Default, _) => {
                return Err(Error::CaseOutsideSwitch(decl.pos.clone(), decl.to_string()));
            }
            _ => self.frames.push(Frame::Conditional {
                cond: Conditional::new(decl, 0, ns),
                one_line: false,
            }),
        }
        self.open_block()
    }

    /// Opens the block of the conditional on top, normalizing its form.
    fn open_block(&mut self) -> Result<(), Error> {
        self.session.scopes.push(None);
        let Some(Frame::Conditional { cond, one_line }) = self.frames.last_mut() else {
            return Err(Error::PopGlobal);
        };
        cond.depth = 1;
        let block = cond.current();
        block.open = true;
        let (decl, pos) = (block.decl.to_string(), block.decl.pos.clone());
        trace!(decl = %decl, "open block");

        match self.input.peek() {
            Some(Token::ScopeBegin(_)) => {
                self.input.next();
            }
            Some(Token::ConditionalDecl(next)) if next.kind != DeclKind::Else => {
                *one_line = true;
            }
            Some(
                Token::InstructionLine(_)
                | Token::FunctionCall(_)
                | Token::FunctionReturn(_)
                | Token::Variable(_)
                | Token::Label(_),
            ) => {
                let Some(statement) = self.input.next() else {
                    return Err(Error::MissingStatement(pos, decl));
                };
                let init = match (&statement, self.input.peek()) {
                    (Token::Variable(_), Some(Token::Initializer(_))) => self.input.next(),
                    _ => None,
                };
                self.input.push_front(Token::ScopeEnd(pos));
                if let Some(init) = init {
                    self.input.push_front(init);
                }
                self.input.push_front(statement);
            }
            _ => return Err(Error::MissingStatement(pos, decl)),
        }
        Ok(())
    }

    fn open_bare(&mut self, pos: Pos) -> Result<(), Error> {
        match self.frames.last_mut() {
            Some(Frame::Function { depth, .. }) => *depth += 1,
            Some(Frame::Conditional { cond, .. }) => cond.depth += 1,
            None => self.bare.push(pos.clone()),
        }
        self.session.scopes.push(None);
        self.emit(Token::ScopeBegin(pos))
    }

    fn close(&mut self, pos: Pos) -> Result<(), Error> {
        let Some(mut frame) = self.frames.pop() else {
            if self.bare.pop().is_none() {
                return Err(Error::UnmatchedClose(pos));
            }
            self.session.scopes.pop()?;
            return self.emit(Token::ScopeEnd(pos));
        };
        self.session.scopes.pop()?;

        let depth = match &mut frame {
            Frame::Function { depth, .. } => depth,
            Frame::Conditional { cond, .. } => &mut cond.depth,
        };
        *depth -= 1;
        if *depth > 0 {
            self.frames.push(frame);
            return self.emit(Token::ScopeEnd(pos));
        }

        if matches!(frame, Frame::Function { .. }) {
            return self.finish(frame, pos);
        }
        let Frame::Conditional { cond, .. } = &mut frame else {
            return Err(Error::UnmatchedClose(pos));
        };
        cond.current().open = false;
        match cond.mode {
            CondMode::If => {
                let has_else = matches!(
                    self.input.peek(),
                    Some(Token::ConditionalDecl(ConditionalDecl {
                        kind: DeclKind::Else,
                        ..
                    }))
                );
                if has_else {
                    self.frames.push(frame);
                    return Ok(());
                }
            }
            CondMode::DoWhile => match self.input.next() {
                Some(Token::ConditionalDecl(ConditionalDecl {
                    kind: DeclKind::While(test),
                    ..
                })) => cond.post = Some(test),
                _ => return Err(Error::DoWithoutWhile(cond.pos().clone())),
            },
            CondMode::Case | CondMode::Default => return self.attach_case(frame, pos),
            _ => {}
        }
        self.finish(frame, pos)
    }

    /// Hands a finished case or default block to its switch.
    fn attach_case(&mut self, frame: Frame, pos: Pos) -> Result<(), Error> {
        let Frame::Conditional { mut cond, .. } = frame else {
            return Err(Error::UnmatchedClose(pos));
        };
        if cond.blocks.len() != 1 {
            return Err(Error::MalformedCase(cond.pos().clone(), cond.mode.to_string()));
        }
        let Some(Frame::Conditional { cond: switch, .. }) = self.frames.last_mut() else {
            return Err(Error::CaseOutsideSwitch(cond.pos().clone(), cond.mode.to_string()));
        };
        if let Some(block) = cond.blocks.pop() {
            trace!(decl = %block.decl, tokens = block.tokens.len(), "attach case");
            switch.blocks.push(block);
        }
        self.cascade(pos);
        Ok(())
    }

    fn finish(&mut self, frame: Frame, pos: Pos) -> Result<(), Error> {
        let token = match frame {
            Frame::Function { func, .. } => {
                let body = if func.decl.is_macro() {
                    func.body.clone()
                } else {
                    Vec::new()
                };
                let symbol = Symbol::Function(FunctionSymbol {
                    decl: func.decl.clone(),
                    body,
                    entry: None,
                });
                self.claim_global(&symbol, &func.decl.pos)?;
                self.session.scopes.define(symbol, Some(&Namespace::global()));
                trace!(name = %func.decl.name, tokens = func.body.len(), "close function");
                Token::Function(func)
            }
            Frame::Conditional { cond, .. } => {
                trace!(mode = %cond.mode, blocks = cond.blocks.len(), "close conditional");
                Token::Conditional(cond)
            }
        };
        self.emit(token)?;
        self.cascade(pos);
        Ok(())
    }

    /// Closes a block that was opened implicitly for a brace-less child.
    fn cascade(&mut self, pos: Pos) {
        if let Some(Frame::Conditional { one_line, .. }) = self.frames.last_mut() {
            if *one_line {
                *one_line = false;
                self.input.push_front(Token::ScopeEnd(pos));
            }
        }
    }

    fn ret(&mut self, mut ret: FunctionReturn) -> Result<(), Error> {
        let func = self.frames.iter().find_map(|frame| match frame {
            Frame::Function { func, .. } => Some(&func.decl),
            Frame::Conditional { .. } => None,
        });
        match func {
            None => Err(Error::ReturnOutsideFunction(ret.pos)),
            Some(decl) if decl.is_macro() => Err(Error::ReturnInInline(ret.pos, decl.name.clone())),
            Some(decl) => {
                ret.interrupt = decl.is_interrupt();
                self.emit(Token::FunctionReturn(ret))
            }
        }
    }

    fn emit(&mut self, token: Token) -> Result<(), Error> {
        match self.frames.last_mut() {
            Some(Frame::Function { func, .. }) => func.body.push(token),
            Some(Frame::Conditional { cond, .. }) if cond.is_switch() => {
                let pos = token.pos().cloned().unwrap_or_else(|| cond.pos().clone());
                return Err(Error::StatementInSwitch(pos));
            }
            Some(Frame::Conditional { cond, .. }) => cond.current().tokens.push(token),
            None => self.output.push(token),
        }
        Ok(())
    }
}
