//! Lowering of structured control flow into labels and branches.
//!
//! Every generated branch names its target label; the label is bound to an
//! address only during layout.

use crate::error::{Error, Pos};
use crate::scope::{Namespace, Symbol};
use crate::session::Session;
use crate::token::{Block, CondMode, Conditional, DeclKind, Expr, Function, InstructionLine, Label, Token};
use arch::{Distance, Flag, Op, Operand, Test};
use itertools::chain;
use std::iter;
use tracing::trace;

/// `name: body ret`. Inline functions lower to nothing, their bodies are
/// spliced at the call sites.
pub fn function(session: &mut Session, func: &Function) -> Result<Vec<Token>, Error> {
    let decl = &func.decl;
    if decl.is_macro() {
        return Ok(Vec::new());
    }
    let global = Namespace::global();
    if let Some(Symbol::Function(symbol)) = session.scopes.lookup(&decl.name, Some(&global)) {
        let mut symbol = symbol.clone();
        symbol.entry = Some(decl.name.clone());
        session.scopes.define(Symbol::Function(symbol), Some(&global));
    }

    let ret = (!decl.noreturn).then(|| {
        let op = session.cpu().ret(decl.is_interrupt());
        Token::InstructionLine(InstructionLine::new(op, Operand::None, func.ns.clone(), decl.pos.clone()))
    });
    trace!(name = %decl.name, "lower function");
    Ok(chain!(
        iter::once(Token::Label(Label::new(&decl.name, decl.pos.clone()))),
        func.body.iter().cloned(),
        ret,
    )
    .collect())
}

pub fn conditional(session: &mut Session, cond: &Conditional) -> Result<Vec<Token>, Error> {
    let mut out = Emitter {
        session,
        ns: cond.ns.clone(),
        pos: cond.pos().clone(),
        tokens: Vec::new(),
    };
    let first = &cond.blocks[0];
    match cond.mode {
        CondMode::If => {
            let test = out.test(first)?;
            out.if_(test, first);
        }
        CondMode::IfElse => {
            let test = out.test(first)?;
            let otherwise = out.block(cond, 1)?;
            out.if_else(test, first, otherwise);
        }
        CondMode::While => {
            let test = out.test(first)?;
            out.while_(test, first);
        }
        CondMode::DoWhile => {
            let test = cond.post.ok_or_else(|| Error::DoWithoutWhile(out.pos.clone()))?;
            out.do_while(test, first);
        }
        CondMode::Forever => out.forever(first),
        CondMode::Switch | CondMode::SwitchDefault => out.switch(cond)?,
        CondMode::Case | CondMode::Default => {
            return Err(Error::CaseOutsideSwitch(out.pos, cond.mode.to_string()));
        }
    }
    trace!(mode = %cond.mode, tokens = out.tokens.len(), "lower conditional");
    Ok(out.tokens)
}

struct Emitter<'s> {
    session: &'s mut Session,
    ns: Namespace,
    pos: Pos,
    tokens: Vec<Token>,
}

impl Emitter<'_> {
    fn test(&self, block: &Block) -> Result<Test, Error> {
        block
            .decl
            .test()
            .ok_or_else(|| Error::Unstructured(self.pos.clone(), block.decl.to_string()))
    }

    fn block<'c>(&self, cond: &'c Conditional, idx: usize) -> Result<&'c Block, Error> {
        cond.blocks
            .get(idx)
            .ok_or_else(|| Error::Unstructured(self.pos.clone(), cond.to_string()))
    }

    fn label(&mut self) -> String {
        self.session.new_label(&self.pos)
    }

    fn bind(&mut self, name: &str) {
        self.tokens.push(Token::Label(Label::new(name, self.pos.clone())));
    }

    fn inst(&mut self, op: Op, operand: Operand<Expr>) {
        self.tokens.push(Token::InstructionLine(InstructionLine::new(
            op,
            operand,
            self.ns.clone(),
            self.pos.clone(),
        )));
    }

    fn goto(&mut self, op: Op, target: &str) {
        self.inst(op, Operand::Address(Expr::Name(target.to_string())));
    }

    fn jump(&mut self, target: &str) {
        let op = self.session.cpu().jump();
        self.goto(op, target);
    }

    /// Branch taken when `test` holds.
    fn take(&mut self, test: Test, target: &str) {
        let (flag, state) = test.flag();
        let op = self.session.cpu().branch(flag, state);
        self.goto(op, target);
    }

    /// Branch taken when `test` fails.
    fn skip(&mut self, test: Test, target: &str) {
        let (flag, state) = test.flag();
        let op = self.session.cpu().branch(flag, !state);
        self.goto(op, target);
    }

    fn body(&mut self, block: &Block) {
        self.tokens.extend(block.tokens.iter().cloned());
    }

    /// Jumps to `target` unless `test` holds. Far tests branch over a jump.
    fn leave_unless(&mut self, test: Test, target: &str) {
        match test.distance {
            Distance::Near => self.skip(test, target),
            Distance::Far => {
                let body = self.label();
                self.take(test, &body);
                self.jump(target);
                self.bind(&body);
            }
        }
    }

    fn if_(&mut self, test: Test, body: &Block) {
        let after = self.label();
        self.leave_unless(test, &after);
        self.body(body);
        self.bind(&after);
    }

    fn if_else(&mut self, test: Test, then: &Block, otherwise: &Block) {
        let else_ = self.label();
        let after = self.label();
        self.leave_unless(test, &else_);
        self.body(then);
        self.jump(&after);
        self.bind(&else_);
        self.body(otherwise);
        self.bind(&after);
    }

    fn while_(&mut self, test: Test, body: &Block) {
        let head = self.label();
        let exit = self.label();
        self.bind(&head);
        self.leave_unless(test, &exit);
        self.body(body);
        self.jump(&head);
        self.bind(&exit);
    }

    fn do_while(&mut self, test: Test, body: &Block) {
        let head = self.label();
        self.bind(&head);
        self.body(body);
        match test.distance {
            Distance::Near => self.take(test, &head),
            Distance::Far => {
                let after = self.label();
                self.skip(test, &after);
                self.jump(&head);
                self.bind(&after);
            }
        }
    }

    fn forever(&mut self, body: &Block) {
        let head = self.label();
        self.bind(&head);
        self.body(body);
        self.jump(&head);
    }

    /// Compare-and-branch chain over the cases in declaration order.
    fn switch(&mut self, cond: &Conditional) -> Result<(), Error> {
        let DeclKind::Switch(reg) = cond.blocks[0].decl.kind else {
            return Err(Error::Unstructured(self.pos.clone(), cond.to_string()));
        };
        let cases = &cond.blocks[1..];
        let nexts = cases
            .iter()
            .map(|block| match block.decl.kind {
                DeclKind::Case(_) => Some(self.label()),
                _ => None,
            })
            .collect::<Vec<_>>();
        let end = self.label();
        let compare = self.session.cpu().compare(reg);
        let not_equal = self.session.cpu().branch(Flag::Z, false);

        for (idx, (block, next)) in cases.iter().zip(&nexts).enumerate() {
            let last = idx + 1 == cases.len();
            match (&block.decl.kind, next) {
                (DeclKind::Case(value), Some(next)) => {
                    self.inst(compare, Operand::Immediate(value.clone()));
                    self.goto(not_equal, next);
                    self.body(block);
                    self.jump(&end);
                    self.bind(next);
                }
                (DeclKind::Default, _) => {
                    self.body(block);
                    if !last {
                        self.jump(&end);
                    }
                }
                _ => return Err(Error::MalformedCase(block.decl.pos.clone(), block.decl.to_string())),
            }
        }
        self.bind(&end);
        Ok(())
    }
}
