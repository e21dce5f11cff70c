use super::CallError;
use crate::{eval::Evaluator, value::Value};

fn test(args: &[Value], predicate: fn(&Value) -> bool) -> Result<Value, CallError> {
    Ok(Value::Bool(args.first().is_some_and(predicate)))
}

pub fn is_number(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    test(args, Value::is_numeric)
}

pub fn is_text(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    test(args, Value::is_str)
}

pub fn is_logical(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    test(args, Value::is_bool)
}

/// Only empty text is blank
pub fn is_blank(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    test(args, |v| matches!(v, Value::Str(s) if s.is_empty()))
}
