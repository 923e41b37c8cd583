pub mod eval;
pub mod lower;
pub mod resolve;
pub mod structure;
pub mod types;

use crate::error::Error;
use crate::grammer::{lexer::Lexer, parsercore::Parser};
use crate::session::Session;
use crate::source::Input;
use crate::token::Token;
use tracing::debug;

pub use resolve::resolve;
pub use structure::structure;

/// Parses code chunks into primitive tokens, passing markers through.
/// Stops at the first syntax error.
pub fn scan(session: &Session, inputs: Vec<Input>) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    for input in inputs {
        match input {
            Input::Code(chunk) => {
                let lexed = Lexer::new(&chunk.file, &chunk.text)
                    .starting_at(chunk.line)
                    .parse();
                let (parsed, errors) = Parser::new(lexed.into_iter()).parse(session.cpu());
                if let Some(err) = errors.into_iter().next() {
                    return Err(err);
                }
                tokens.extend(parsed);
            }
            Input::FileBegin(name) => tokens.push(Token::FileBegin(name)),
            Input::FileEnd(name) => tokens.push(Token::FileEnd(name)),
            Input::Directive(directive, pos) => tokens.push(Token::Directive(directive, pos)),
        }
    }
    debug!(tokens = tokens.len(), "scanned");
    Ok(tokens)
}
