use std::{io, path::Path};

use tracing::{debug, instrument};

use crate::{
    eval::{EvalError, Evaluator},
    language::{ast::Program, lexer::LexError, parser::SyntaxError, sort::SortError},
    script::IncludeError,
    sheet::{GridTooLarge, Sheet},
};

pub mod cell;
pub mod eval;
pub mod format;
pub mod functions;
pub mod language;
pub mod script;
pub mod sheet;
pub mod value;

pub use crate::{cell::CellIdx, value::Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Reorder `let` statements by their dependencies before running
    pub sort: bool,
    /// Allow `EXEC` to start processes
    pub allow_exec: bool,
}

/// Any failure between reading a script and producing the final grid
///
/// The wrapped errors already render their position, so they are part of the
/// message rather than a separate source.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("lexical error: {0}")]
    Lexical(LexError),
    #[error("syntax error: {0}")]
    Syntax(SyntaxError),
    #[error("include error: {0}")]
    Include(IncludeError),
    #[error("dependency error: {0}")]
    Dependency(SortError),
    #[error("evaluation error: {0}")]
    Evaluation(EvalError),
    #[error("evaluation error: {0}")]
    Grid(GridTooLarge),
    #[error("I/O error: failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}
impl From<LexError> for Error {
    fn from(err: LexError) -> Self {
        Self::Lexical(err)
    }
}
impl From<SyntaxError> for Error {
    fn from(err: SyntaxError) -> Self {
        Self::Syntax(err)
    }
}
impl From<IncludeError> for Error {
    fn from(err: IncludeError) -> Self {
        Self::Include(err)
    }
}
impl From<SortError> for Error {
    fn from(err: SortError) -> Self {
        Self::Dependency(err)
    }
}
impl From<EvalError> for Error {
    fn from(err: EvalError) -> Self {
        Self::Evaluation(err)
    }
}
impl From<GridTooLarge> for Error {
    fn from(err: GridTooLarge) -> Self {
        Self::Grid(err)
    }
}

/// Loads scripts and runs them over grids
#[derive(Debug, Default)]
pub struct Tabula {
    config: Config,
}

impl Tabula {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Loads a script file along with everything it includes
    pub fn parse_file(&self, path: &Path) -> Result<Program, Error> {
        script::load_file(path)
    }

    /// Loads inline script text. Includes resolve against the working directory.
    pub fn parse_source(&self, source: &str) -> Result<Program, Error> {
        script::load_source(source, None)
    }

    /// Runs a program over CSV records and returns the resulting records
    ///
    /// The grid is first grown to cover every cell the program names, with
    /// every cell trimmed. With [Config::sort] set, `let` statements run in
    /// dependency order.
    #[instrument(skip_all)]
    pub fn run(&self, program: Program, records: Vec<Vec<String>>) -> Result<Vec<Vec<String>>, Error> {
        let program = match self.config.sort {
            true => language::sort::sort_program(program)?,
            false => program,
        };

        let mut sheet = Sheet::new(records);
        sheet.ensure_dimensions(program.cells())?;
        debug!(rows = sheet.height(), "grid ready");

        let mut evaluator = Evaluator::new(&self.config, sheet);
        evaluator.run(&program)?;
        Ok(evaluator.into_sheet().into_rows())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn records(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect()
    }

    #[test]
    fn runs_inline_scripts() {
        let tabula = Tabula::default();
        let program = tabula.parse_source("let C1 = A1 + B1;").unwrap();
        let out = tabula.run(program, records(&[&[" 1 ", "2"]])).unwrap();
        assert_eq!(out, records(&[&["1", "2", "3"]]));
    }

    #[test]
    fn sorting_is_opt_in() {
        let source = "let A1 = x; let x = 5;";

        let tabula = Tabula::default();
        let program = tabula.parse_source(source).unwrap();
        let err = tabula.run(program, vec![]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "evaluation error: x not found in context at input:1:10"
        );

        let tabula = Tabula::new(Config {
            sort: true,
            ..Config::default()
        });
        let program = tabula.parse_source(source).unwrap();
        assert_eq!(tabula.run(program, vec![]).unwrap(), records(&[&["5"]]));
    }

    #[test]
    fn far_away_cells_fail_instead_of_allocating() {
        let tabula = Tabula::default();
        let program = tabula.parse_source("let ZZZZZZZZZZZZZ1 = 1;").unwrap();
        let err = tabula.run(program, records(&[&["1"]])).unwrap_err();
        assert!(matches!(err, Error::Grid(_)), "{err}");
        assert!(err.to_string().starts_with("evaluation error: cell "), "{err}");
    }

    #[test]
    fn error_categories() {
        let tabula = Tabula::default();
        let err = tabula.parse_source("let A1 = \"open;").unwrap_err();
        assert!(err.to_string().starts_with("lexical error: "), "{err}");

        let err = tabula.parse_source("let A1 = ;").unwrap_err();
        assert!(err.to_string().starts_with("syntax error: "), "{err}");

        let err = tabula
            .parse_file(Path::new("/definitely/not/here.tbl"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "I/O error: failed to read /definitely/not/here.tbl"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
