use super::eval::Lookup;
use super::lower;
use crate::error::Error;
use crate::scope::{FunctionSymbol, Symbol};
use crate::session::Session;
use crate::token::{
    Conditional, DeclKind, Dim, Expr, FunctionCall, InitValue, InstructionLine, Token, Variable,
};
use arch::Operand;
use indexmap::IndexMap;
use tracing::{debug, trace};

/// Upper bound on rounds; each round must shrink or rewrite the list.
pub const MAX_ROUNDS: usize = 256;

/// Rewrites the list until every token is flat and resolved.
///
/// Structured tokens are lowered, calls expanded or turned into `jsr`, and
/// every operand is bound to numbers or symbol references with an
/// addressing mode chosen. A round that changes nothing while tokens are
/// still pending is a convergence error.
pub fn resolve(session: &mut Session, tokens: Vec<Token>) -> Result<Vec<Token>, Error> {
    let mut current = tokens;
    for round in 1..=MAX_ROUNDS {
        let mut next = Vec::with_capacity(current.len());
        let mut unresolved = 0;
        for token in &current {
            let (tokens, count) = resolve_token(session, token)?;
            next.extend(tokens);
            unresolved += count;
        }
        debug!(round, unresolved, tokens = next.len(), "resolve round");

        if unresolved == 0 {
            return Ok(next);
        }
        if next == current {
            return Err(Error::NoProgress {
                stage: "resolve",
                rounds: round,
                stuck: next.iter().filter(|t| is_pending(t)).map(Token::located).collect(),
            });
        }
        current = next;
    }
    Err(Error::TooManyRounds("resolve", MAX_ROUNDS))
}

fn is_pending(token: &Token) -> bool {
    match token {
        Token::InstructionLine(line) => !line.is_resolved(),
        Token::Variable(var) => var.size.is_none(),
        Token::Function(_)
        | Token::FunctionCall(_)
        | Token::FunctionReturn(_)
        | Token::Conditional(_) => true,
        _ => false,
    }
}

/// One token's replacement and how many of its parts are still unresolved.
fn resolve_token(session: &mut Session, token: &Token) -> Result<(Vec<Token>, usize), Error> {
    let lowered = |tokens: Vec<Token>| {
        let count = tokens.len();
        (tokens, count)
    };
    match token {
        Token::ScopeBegin(_) | Token::ScopeEnd(_) | Token::TypeDecl(_) => Ok((Vec::new(), 0)),
        Token::Function(func) => lower::function(session, func).map(lowered),
        Token::Conditional(cond) => lower::conditional(session, cond).map(lowered),
        Token::FunctionCall(call) => self::call(session, call),
        Token::FunctionReturn(ret) => {
            let op = session.cpu().ret(ret.interrupt);
            let line = InstructionLine::new(op, Operand::None, Default::default(), ret.pos.clone());
            Ok((vec![Token::InstructionLine(line)], 1))
        }
        Token::InstructionLine(line) => instruction(session, line),
        Token::Variable(var) => variable(session, var),
        Token::Label(_) | Token::FileBegin(_) | Token::FileEnd(_) | Token::Directive(..) => {
            Ok((vec![token.clone()], 0))
        }
        Token::FunctionDecl(_) | Token::ConditionalDecl(_) | Token::Initializer(_) => Err(
            Error::Unstructured(token.pos().cloned().unwrap_or_default(), token.to_string()),
        ),
    }
}

fn call(session: &mut Session, call: &FunctionCall) -> Result<(Vec<Token>, usize), Error> {
    let func = match session.scopes.lookup(&call.name, Some(&call.ns)) {
        Some(Symbol::Function(func)) => func.clone(),
        Some(_) => return Err(Error::NotAFunction(call.pos.clone(), call.name.clone())),
        None => return Err(Error::UnknownFunction(call.pos.clone(), call.name.clone())),
    };
    if func.decl.is_macro() {
        return expand(session, call, &func);
    }
    if !call.args.is_empty() {
        return Err(Error::ArgumentCount(call.pos.clone(), call.name.clone(), 0, call.args.len()));
    }
    match &func.entry {
        Some(entry) => {
            let line = InstructionLine::new(
                session.cpu().call(),
                Operand::Address(Expr::Name(entry.clone())),
                call.ns.clone(),
                call.pos.clone(),
            );
            Ok((vec![Token::InstructionLine(line)], 1))
        }
        None => Ok((vec![Token::FunctionCall(call.clone())], 1)),
    }
}

/// Splices an inline function body with its parameters replaced.
fn expand(
    session: &Session,
    call: &FunctionCall,
    func: &FunctionSymbol,
) -> Result<(Vec<Token>, usize), Error> {
    let name = &func.decl.name;
    if call.expansion.contains(name) {
        return Err(Error::RecursiveMacro(call.pos.clone(), name.clone()));
    }
    let params = &func.decl.params;
    if params.len() != call.args.len() {
        return Err(Error::ArgumentCount(
            call.pos.clone(),
            name.clone(),
            params.len(),
            call.args.len(),
        ));
    }

    let lookup = Lookup::new(&session.scopes, &call.ns, &call.pos);
    let mut args = IndexMap::new();
    for (param, arg) in params.iter().zip(&call.args) {
        match lookup.bind(arg)? {
            Some(value) => args.insert(param.clone(), value),
            None => return Ok((vec![Token::FunctionCall(call.clone())], 1)),
        };
    }
    let mut chain = call.expansion.clone();
    chain.push(name.clone());

    trace!(name = %name, depth = chain.len(), "expand inline");
    let body = func
        .body
        .iter()
        .map(|token| splice(token, &args, &chain))
        .collect::<Vec<_>>();
    let count = body.len();
    Ok((body, count))
}

/// Copy of `token` with parameters substituted and nested calls marked as
/// part of the expansion `chain`.
fn splice(token: &Token, args: &IndexMap<String, Expr>, chain: &[String]) -> Token {
    let subst = |expr: &Expr| expr.substitute(args);
    match token {
        Token::InstructionLine(line) => Token::InstructionLine(InstructionLine {
            operand: line.operand.clone().map(|expr| subst(&expr)),
            ..line.clone()
        }),
        Token::FunctionCall(call) => Token::FunctionCall(FunctionCall {
            args: call.args.iter().map(subst).collect(),
            expansion: chain.to_vec(),
            ..call.clone()
        }),
        Token::Conditional(cond) => {
            let mut cond: Conditional = cond.clone();
            for block in &mut cond.blocks {
                if let DeclKind::Case(value) = &mut block.decl.kind {
                    *value = subst(value);
                }
                block.tokens = block.tokens.iter().map(|t| splice(t, args, chain)).collect();
            }
            Token::Conditional(cond)
        }
        Token::Variable(var) => {
            let mut var = var.clone();
            var.address = var.address.as_ref().map(subst);
            if let Dim::Array(Some(len)) = &mut var.dim {
                *len = subst(len);
            }
            if let Some(InitValue::Values(values)) = var.init.as_mut().map(|init| &mut init.value) {
                values.iter_mut().for_each(|value| *value = subst(value));
            }
            Token::Variable(var)
        }
        token => token.clone(),
    }
}

fn instruction(session: &Session, line: &InstructionLine) -> Result<(Vec<Token>, usize), Error> {
    let lookup = Lookup::new(&session.scopes, &line.ns, &line.pos);
    let operand = match line.operand.value() {
        None => line.operand.clone(),
        Some(expr) => match lookup.bind(expr)? {
            Some(value) => line.operand.clone().map(|_| value),
            None => return Ok((vec![Token::InstructionLine(line.clone())], 1)),
        },
    };
    let zero_page = matches!(operand.value(), Some(Expr::Number(n)) if (0..0x100).contains(n));
    let mode = session
        .cpu()
        .select(line.op, &operand.shape(), zero_page)
        .ok_or_else(|| Error::InvalidOperand(line.pos.clone(), line.to_string()))?;
    let line = InstructionLine {
        operand,
        mode: Some(mode),
        ..line.clone()
    };
    Ok((vec![Token::InstructionLine(line)], 0))
}

fn variable(session: &Session, var: &Variable) -> Result<(Vec<Token>, usize), Error> {
    let lookup = Lookup::new(&session.scopes, &var.ns, &var.pos);
    let mut var = var.clone();
    let mut unresolved = 0;

    var.size = lookup.variable_size(&var)?;
    unresolved += var.size.is_none() as usize;

    if let Some(address) = var.address.clone() {
        match lookup.bind(&address)? {
            Some(address) => var.address = Some(address),
            None => unresolved += 1,
        }
    }
    if let Some(InitValue::Values(values)) = var.init.as_mut().map(|init| &mut init.value) {
        for value in values.iter_mut() {
            match lookup.bind(value)? {
                Some(bound) => *value = bound,
                None => unresolved += 1,
            }
        }
    }
    Ok((vec![Token::Variable(var)], unresolved))
}
