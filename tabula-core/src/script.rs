use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, instrument};

use crate::{
    Error,
    language::{
        INLINE_SOURCE, Position,
        ast::Program,
        parser::{Include, ParsedFile, parse_source},
    },
};

#[derive(Debug, thiserror::Error)]
pub enum IncludeErrorKind {
    #[error("include file not found: {0}")]
    NotFound(String),
    #[error("circular include dependency detected: {from} -> {to}")]
    Circular { from: String, to: String },
    #[error("failed to read include file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
#[error("{kind} at {pos}")]
pub struct IncludeError {
    pub kind: IncludeErrorKind,
    pub pos: Position,
}

/// Parses a script and everything it `#include`s into one [Program]
///
/// Include paths resolve against the directory of the including file. A file
/// that was already fully loaded is skipped, so diamond includes load once. A
/// file that is still being loaded further up the include chain is a cycle.
/// Included statements come first, in the order each file finishes loading.
#[derive(Debug, Default)]
struct Loader {
    /// Files currently being loaded, outermost first
    stack: Vec<PathBuf>,
    done: HashSet<PathBuf>,
    program: Program,
    seen: HashSet<String>,
}

impl Loader {
    fn append(&mut self, parsed: ParsedFile) {
        self.program.statements.extend(parsed.statements);
        for id in parsed.identifiers {
            if self.seen.insert(id.clone()) {
                self.program.identifiers.push(id);
            }
        }
    }

    fn current_file(&self) -> String {
        self.stack
            .last()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| INLINE_SOURCE.to_string())
    }

    fn include(&mut self, base: &Path, include: &Include) -> Result<(), Error> {
        let path = base.join(&include.path);
        let fail = |kind| IncludeError {
            kind,
            pos: include.pos.clone(),
        };

        let canonical = path.canonicalize().map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => fail(IncludeErrorKind::NotFound(include.path.clone())),
            _ => fail(IncludeErrorKind::Read {
                path: include.path.clone(),
                source,
            }),
        })?;

        if self.stack.contains(&canonical) {
            return Err(fail(IncludeErrorKind::Circular {
                from: self.current_file(),
                to: canonical.display().to_string(),
            })
            .into());
        }
        if self.done.contains(&canonical) {
            debug!(path = %canonical.display(), "skipping already included file");
            return Ok(());
        }

        let source = fs::read_to_string(&canonical).map_err(|source| {
            fail(IncludeErrorKind::Read {
                path: include.path.clone(),
                source,
            })
        })?;
        debug!(path = %canonical.display(), "including");

        self.stack.push(canonical.clone());
        let parsed = parse_source(&source, Arc::from(path.display().to_string()))?;
        let dir = canonical.parent().unwrap_or(base).to_path_buf();
        for nested in &parsed.includes {
            self.include(&dir, nested)?;
        }
        self.stack.pop();
        self.done.insert(canonical);

        self.append(parsed);
        Ok(())
    }
}

/// Loads a script from text
///
/// `name` is the script's path if it has one. It labels positions, anchors
/// relative includes, and lets a file that includes itself be detected.
/// Without it, includes resolve against the working directory.
#[instrument(skip(source))]
pub fn load_source(source: &str, name: Option<&Path>) -> Result<Program, Error> {
    let mut loader = Loader::default();

    let label = name.map(|p| p.display().to_string()).unwrap_or_default();
    let base = match name.and_then(Path::parent) {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    if let Some(canonical) = name.and_then(|p| p.canonicalize().ok()) {
        loader.stack.push(canonical);
    }

    let parsed = parse_source(source, Arc::from(label))?;
    for include in &parsed.includes {
        loader.include(&base, include)?;
    }
    loader.append(parsed);

    debug!(
        statements = loader.program.statements.len(),
        identifiers = loader.program.identifiers.len(),
        "loaded script"
    );
    Ok(loader.program)
}

/// Reads and loads a script file
pub fn load_file(path: &Path) -> Result<Program, Error> {
    let source = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_source(&source, Some(path))
}
