pub mod compile;
pub mod error;
pub mod grammer;
pub mod linker;
pub mod scope;
pub mod session;
pub mod source;
pub mod token;
pub mod util;

pub use error::{Error, ErrorKind, Pos};
pub use linker::{layout, Image};
pub use scope::{Namespace, ScopeTable, Symbol};
pub use session::Session;
pub use source::{split, Chunk, Directive, Input, VectorKind};
pub use util::display::binprint;

use tracing::info;

/// Runs every stage over `inputs`: scan, structure, resolve and layout.
pub fn compile(session: &mut Session, inputs: Vec<Input>) -> Result<Image, Error> {
    let tokens = compile::scan(session, inputs)?;
    let tokens = compile::structure(session, tokens)?;
    let tokens = compile::resolve(session, tokens)?;
    let image = linker::layout(session, &tokens)?;
    info!(
        banks = image.banks.len(),
        labels = image.labels.len(),
        "compiled"
    );
    Ok(image)
}
