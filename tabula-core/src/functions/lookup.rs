use super::{CallError, rejected};
use crate::{
    cell::{CellIdx, MAX_RANGE_CELLS, canonical_name, expand_range, range_len},
    eval::Evaluator,
    value::Value,
};

/// The cell a reference argument points at; the first cell for a range
fn first_cell(value: &Value) -> Option<CellIdx> {
    match value {
        Value::Ident(name) | Value::Str(name) => CellIdx::parse(name.trim()),
        Value::Range(cells) => cells.first().copied(),
        _ => None,
    }
}

fn one_based(n: usize) -> Value {
    Value::Int(n as i64 + 1)
}

/// Cell name for a 1-based row and column
pub fn address(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Int(row), Value::Int(col)] => {
            let index = |n: i64, value: &Value| {
                n.checked_sub(1)
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| CallError::Invalid(value.clone()))
            };
            let idx = CellIdx::new(index(*row, &args[0])?, index(*col, &args[1])?);
            Ok(Value::Ident(idx.name()))
        }
        _ => Err(rejected(args)),
    }
}

pub fn row(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [value] => first_cell(value)
            .map(|idx| one_based(idx.row))
            .ok_or_else(|| CallError::Invalid(value.clone())),
        _ => Err(rejected(args)),
    }
}

pub fn column(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [value] => first_cell(value)
            .map(|idx| one_based(idx.col))
            .ok_or_else(|| CallError::Invalid(value.clone())),
        _ => Err(rejected(args)),
    }
}

/// Reads a cell or variable named at runtime, through its format
pub fn r#ref(ctx: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Ident(name) | Value::Str(name)] => Ok(ctx.lookup(&canonical_name(name.trim()))?),
        _ => Err(rejected(args)),
    }
}

pub fn range(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [start, end] => {
            let cell = |value: &Value| match value {
                Value::Ident(name) | Value::Str(name) => {
                    CellIdx::parse(name.trim()).ok_or_else(|| CallError::Invalid(value.clone()))
                }
                _ => Err(CallError::Invalid(value.clone())),
            };
            let (start, end) = (cell(start)?, cell(end)?);
            match range_len(start, end) {
                Some(len) if len <= MAX_RANGE_CELLS => Ok(Value::Range(expand_range(start, end))),
                _ => Err(CallError::Failed(format!(
                    "{start}:{end} names more than {MAX_RANGE_CELLS} cells"
                ))),
            }
        }
        _ => Err(rejected(args)),
    }
}
