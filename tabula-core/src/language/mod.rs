//! The scripting language: lexing, parsing and dependency ordering.

use std::{fmt, sync::Arc};

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod sort;

/// Name shown for sources that did not come from a file
pub const INLINE_SOURCE: &str = "input";

/// A 1-based location in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub file: Arc<str>,
    pub line: usize,
    pub column: usize,
}
impl Position {
    pub fn new(file: Arc<str>, line: usize, column: usize) -> Self {
        Self { file, line, column }
    }
}
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = if self.file.is_empty() {
            INLINE_SOURCE
        } else {
            &self.file
        };
        write!(f, "{file}:{}:{}", self.line, self.column)
    }
}
impl Default for Position {
    fn default() -> Self {
        Self::new(Arc::from(""), 1, 1)
    }
}
