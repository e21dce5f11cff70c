use super::{CallError, rejected};
use crate::{eval::Evaluator, value::Value};

/// Both branches are already evaluated, so a failing branch fails the call
pub fn r#if(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Bool(true), positive, _] => Ok(positive.clone()),
        [Value::Bool(false), _, negative] => Ok(negative.clone()),
        _ => Err(rejected(args)),
    }
}

pub fn not(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Bool(b)] => Ok(Value::Bool(!b)),
        _ => Err(rejected(args)),
    }
}

pub fn and(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Bool(a), Value::Bool(b)] => Ok(Value::Bool(*a && *b)),
        _ => Err(rejected(args)),
    }
}

pub fn or(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Bool(a), Value::Bool(b)] => Ok(Value::Bool(*a || *b)),
        _ => Err(rejected(args)),
    }
}

pub fn r#true(_: &Evaluator<'_>, _: &[Value]) -> Result<Value, CallError> {
    Ok(true.into())
}

pub fn r#false(_: &Evaluator<'_>, _: &[Value]) -> Result<Value, CallError> {
    Ok(false.into())
}
