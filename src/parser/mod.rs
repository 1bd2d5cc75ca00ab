//! rulisp parser module
//!
//! Reads tokens into [`Expr`] trees.

mod expr;
mod reader;

pub use expr::Expr;
pub use reader::Reader;

use crate::error::Result;
use crate::lexer::Scanner;

/// Scan and read every top-level form in `source`
pub fn parse(source: &str) -> Result<Vec<Expr>> {
    let tokens = Scanner::new(source).scan_tokens()?;
    Reader::new(tokens).read_all()
}
