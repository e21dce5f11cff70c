use super::{CallError, math::sum};
use crate::{eval::Evaluator, value::Value};

/// Integer division when every argument is an integer
pub fn average(ctx: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    let total = sum(ctx, args)?;
    Ok((total / Value::Int(args.len() as i64))?)
}

pub fn count(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    let numbers = args.iter().filter(|v| v.is_numeric()).count();
    Ok(Value::Int(numbers as i64))
}

pub fn counta(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    let filled = args
        .iter()
        .filter(|v| !matches!(v, Value::Str(s) if s.is_empty()))
        .count();
    Ok(Value::Int(filled as i64))
}
