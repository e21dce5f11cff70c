use std::{cmp::Ordering, ops};

use super::{CallError, rejected};
use crate::{
    eval::Evaluator,
    value::{OpError, Value},
};

pub fn sum(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    Ok(args.iter().cloned().try_fold(Value::Int(0), ops::Add::add)?)
}

pub fn add(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [a, b] => Ok((a.clone() + b.clone())?),
        _ => Err(rejected(args)),
    }
}

pub fn product(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    Ok(args.iter().cloned().try_fold(Value::Int(1), ops::Mul::mul)?)
}

/// The greatest (or least) of some numbers, as a float if any of them is one
///
/// NaN is skipped.
fn extreme(values: &[Value], keep: Ordering) -> Result<Value, CallError> {
    let mut numbers = values
        .iter()
        .filter(|v| !matches!(v, Value::Float(x) if x.is_nan()));
    let Some(mut best) = numbers.next() else {
        return Ok(Value::Int(0));
    };
    for value in numbers {
        if value.compare("<", best)? == Some(keep) {
            best = value;
        }
    }

    let widen = values.iter().any(|v| matches!(v, Value::Float(_)));
    Ok(match best {
        Value::Int(i) if widen => Value::Float(*i as f64),
        other => other.clone(),
    })
}

/// Numeric-looking strings become numbers
fn coerced(args: &[Value]) -> Result<Vec<Value>, CallError> {
    args.iter()
        .map(|value| match value {
            Value::Str(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .map(Value::Int)
                    .or_else(|_| s.parse::<f64>().map(Value::Float))
                    .map_err(|_| CallError::Invalid(value.clone()))
            }
            other => Ok(other.clone()),
        })
        .collect()
}

pub fn max(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    extreme(args, Ordering::Greater)
}

pub fn min(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    extreme(args, Ordering::Less)
}

pub fn maxa(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    extreme(&coerced(args)?, Ordering::Greater)
}

pub fn mina(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    extreme(&coerced(args)?, Ordering::Less)
}

pub fn abs(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Int(i)] => Ok(i.checked_abs().map(Value::Int).ok_or(OpError::Overflow("ABS"))?),
        [Value::Float(x)] => Ok(Value::Float(x.abs())),
        _ => Err(rejected(args)),
    }
}

/// `round(value / step) * step`, an integer when the step is whole
fn stepped(args: &[Value], round: fn(f64) -> f64) -> Result<Value, CallError> {
    let (value, step) = match args {
        [value] => (value.as_f64(), Some(1.0)),
        [value, step] => (value.as_f64(), step.as_f64()),
        _ => return Err(rejected(args)),
    };
    let (Some(value), Some(step)) = (value, step) else {
        return Err(rejected(args));
    };
    if step == 0.0 {
        return Err(OpError::DivideByZero.into());
    }

    let result = round(value / step) * step;
    if step.fract() == 0.0 {
        Ok(Value::Int(result as i64))
    } else {
        Ok(Value::Float(result))
    }
}

pub fn ceiling(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    stepped(args, f64::ceil)
}

pub fn floor(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    stepped(args, f64::floor)
}

pub fn round(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    stepped(args, f64::round)
}

pub fn int(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Int(i)] => Ok(Value::Int(*i)),
        [Value::Float(x)] => Ok(Value::Int(x.trunc() as i64)),
        _ => Err(rejected(args)),
    }
}

pub fn power(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Int(base), Value::Int(exponent)] if *exponent >= 0 => {
            let exact = u32::try_from(*exponent)
                .ok()
                .and_then(|e| base.checked_pow(e));
            Ok(match exact {
                Some(result) => Value::Int(result),
                None => Value::Float((*base as f64).powf(*exponent as f64)),
            })
        }
        [base, exponent] => match (base.as_f64(), exponent.as_f64()) {
            (Some(base), Some(exponent)) => Ok(Value::Float(base.powf(exponent))),
            _ => Err(rejected(args)),
        },
        _ => Err(rejected(args)),
    }
}

pub fn r#mod(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [dividend, divisor] => Ok((dividend.clone() % divisor.clone())?),
        _ => Err(rejected(args)),
    }
}

pub fn sqrt(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [value] => match value.as_f64() {
            Some(x) if x >= 0.0 => Ok(Value::Float(x.sqrt())),
            _ => Err(CallError::Invalid(value.clone())),
        },
        _ => Err(rejected(args)),
    }
}
