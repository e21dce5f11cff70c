use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument};

use super::{
    Position,
    ast::{Program, Statement},
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("circular dependency detected among {} at {pos}", names.join(", "))]
pub struct SortError {
    /// Names that could not be ordered, sorted
    pub names: Vec<String>,
    pub pos: Position,
}

/// Reorders `let` statements so every definition precedes its uses
///
/// Kahn's algorithm over the defined names. Ready names are taken in
/// lexicographic order, so the result is deterministic. A name assigned by
/// several statements keeps those statements together in source order. `fmt`
/// and bare expression statements follow the sorted block in their original
/// order.
#[instrument(skip_all)]
pub fn sort_program(program: Program) -> Result<Program, SortError> {
    let Program {
        statements,
        identifiers,
    } = program;

    let mut defines: BTreeMap<String, Vec<Statement>> = BTreeMap::new();
    let mut rest = Vec::new();
    for statement in statements {
        match statement.defines() {
            Some(name) => defines.entry(name.to_string()).or_default().push(statement),
            None => rest.push(statement),
        }
    }

    // edges run dependency -> dependent
    let mut dependents: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut in_degree: BTreeMap<&str, usize> = defines.keys().map(|k| (k.as_str(), 0)).collect();
    for (name, group) in &defines {
        let name = name.as_str();
        let deps = group
            .iter()
            .flat_map(|s| s.expr().dependencies())
            .filter_map(|dep| defines.get_key_value(&dep).map(|(k, _)| k.as_str()))
            .filter(|dep| *dep != name)
            .collect::<BTreeSet<_>>();

        for dep in deps {
            if dependents.entry(dep).or_default().insert(name) {
                *in_degree.entry(name).or_default() += 1;
            }
        }
    }

    let mut ready = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| *name)
        .collect::<BTreeSet<_>>();
    let mut order = Vec::with_capacity(defines.len());
    while let Some(name) = ready.pop_first() {
        order.push(name.to_string());
        for dependent in dependents.get(name).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(*dependent);
                }
            }
        }
    }

    if order.len() != defines.len() {
        let sorted = order.iter().map(String::as_str).collect::<BTreeSet<_>>();
        let stuck = defines
            .iter()
            .filter(|(name, _)| !sorted.contains(name.as_str()))
            .collect::<Vec<_>>();
        let pos = stuck
            .iter()
            .flat_map(|(_, group)| group.iter().map(|s| s.pos().clone()))
            .min_by_key(|pos| (pos.line, pos.column))
            .unwrap_or_default();
        return Err(SortError {
            names: stuck.into_iter().map(|(name, _)| name.clone()).collect(),
            pos,
        });
    }

    debug!(order = ?order, "sorted definitions");

    let mut statements = Vec::new();
    for name in order {
        if let Some(group) = defines.remove(&name) {
            statements.extend(group);
        }
    }
    statements.extend(rest);

    Ok(Program {
        statements,
        identifiers,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::language::parser::parse_source;

    fn sorted(source: &str) -> Result<Vec<String>, SortError> {
        let parsed = parse_source(source, Arc::from("")).unwrap();
        let program = Program {
            statements: parsed.statements,
            identifiers: parsed.identifiers,
        };
        Ok(sort_program(program)?
            .statements
            .iter()
            .map(ToString::to_string)
            .collect())
    }

    #[test]
    fn definitions_precede_uses() {
        assert_eq!(
            sorted("let C1 = B1 + 1; let B1 = A1 * 2; let A1 = 5;").unwrap(),
            ["let A1 = 5;", "let B1 = (A1 * 2);", "let C1 = (B1 + 1);"]
        );
    }

    #[test]
    fn ties_are_lexicographic() {
        assert_eq!(
            sorted("let z = 1; let b = 2; let a = z + b;").unwrap(),
            ["let b = 2;", "let z = 1;", "let a = (z + b);"]
        );
    }

    #[test]
    fn other_statements_trail() {
        assert_eq!(
            sorted("fmt A1 = \"%d\"; let A1 = x; A1 + 1; let x = 3;").unwrap(),
            ["let x = 3;", "let A1 = x;", "fmt A1 = \"%d\";", "(A1 + 1);"]
        );
    }

    #[test]
    fn repeated_definitions_stay_together() {
        assert_eq!(
            sorted("let A2 = A2 * 2; let B1 = A2; let A2 = 20;").unwrap(),
            ["let A2 = (A2 * 2);", "let A2 = 20;", "let B1 = A2;"]
        );
    }

    #[test]
    fn ranges_are_dependencies() {
        assert_eq!(
            sorted("let total = SUM(A1:A2); let A2 = 2; let A1 = 1;").unwrap(),
            ["let A1 = 1;", "let A2 = 2;", "let total = SUM(A1:A2);"]
        );
    }

    #[test]
    fn cycles_are_rejected() {
        let err = sorted("let ok = 1; let A1 = B1; let B1 = A1;").unwrap_err();
        assert_eq!(err.names, ["A1", "B1"]);
        assert_eq!(
            err.to_string(),
            "circular dependency detected among A1, B1 at input:1:17"
        );
    }
}
