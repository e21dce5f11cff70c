use super::{CallError, rejected};
use crate::{eval::Evaluator, format::read_value, value::Value};

pub fn concatenate(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    Ok(Value::Str(args.iter().filter_map(Value::as_str).collect()))
}

pub fn len(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Str(s)] => Ok(Value::Int(s.chars().count() as i64)),
        _ => Err(rejected(args)),
    }
}

pub fn lower(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Str(s)] => Ok(Value::Str(s.to_lowercase())),
        _ => Err(rejected(args)),
    }
}

pub fn upper(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Str(s)] => Ok(Value::Str(s.to_uppercase())),
        _ => Err(rejected(args)),
    }
}

pub fn trim(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Str(s)] => Ok(Value::from(s.trim())),
        _ => Err(rejected(args)),
    }
}

pub fn exact(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Str(a), Value::Str(b)] => Ok(Value::Bool(a == b)),
        _ => Err(rejected(args)),
    }
}

/// Byte offset of the `n`th character, or the end of the string
fn char_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map_or(s.len(), |(i, _)| i)
}

/// Zero-based character index of `what` in `where`, searching from `start`
pub fn find(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    let (what, haystack, start) = match args {
        [Value::Str(what), Value::Str(haystack)] => (what, haystack, 0),
        [Value::Str(what), Value::Str(haystack), Value::Int(start)] => (what, haystack, *start),
        _ => return Err(rejected(args)),
    };

    let chars = haystack.chars().count();
    let start = match usize::try_from(start) {
        Ok(start) if start <= chars => start,
        _ if what.is_empty() && haystack.is_empty() => return Ok(Value::Int(0)),
        _ => return Ok(Value::Int(-1)),
    };
    if what.is_empty() {
        return Ok(Value::Int(0));
    }

    let offset = char_offset(haystack, start);
    let found = haystack[offset..]
        .find(what.as_str())
        .map_or(-1, |i| haystack[..offset + i].chars().count() as i64);
    Ok(Value::Int(found))
}

/// Clamps a character count to `0..=len`
fn amount(args: &[Value], len: usize) -> usize {
    match args.get(1) {
        Some(Value::Int(n)) => usize::try_from(*n).unwrap_or(0).min(len),
        _ => 1.min(len),
    }
}

pub fn left(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Str(s), ..] => {
            let n = amount(args, s.chars().count());
            Ok(Value::Str(s.chars().take(n).collect()))
        }
        _ => Err(rejected(args)),
    }
}

pub fn right(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Str(s), ..] => {
            let len = s.chars().count();
            let n = amount(args, len);
            Ok(Value::Str(s.chars().skip(len - n).collect()))
        }
        _ => Err(rejected(args)),
    }
}

/// `amount` characters from the 1-based `start`
pub fn mid(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Str(s), Value::Int(start), Value::Int(amount)] => {
            let skip = usize::try_from(start.saturating_sub(1)).unwrap_or(0);
            let take = usize::try_from(*amount).unwrap_or(0);
            Ok(Value::Str(s.chars().skip(skip).take(take).collect()))
        }
        _ => Err(rejected(args)),
    }
}

/// Replaces every occurrence, or only the `n`th one when `n` is positive
pub fn substitute(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    let (text, old, new, instance) = match args {
        [Value::Str(text), Value::Str(old), Value::Str(new)] => (text, old, new, 0),
        [Value::Str(text), Value::Str(old), Value::Str(new), Value::Int(n)] => (text, old, new, *n),
        _ => return Err(rejected(args)),
    };
    if instance < 0 {
        return Err(CallError::Invalid(Value::Int(instance)));
    }
    if old.is_empty() {
        return Ok(Value::Str(text.clone()));
    }

    let replaced = match instance {
        0 => text.replace(old.as_str(), new),
        n => match text.match_indices(old.as_str()).nth(n as usize - 1) {
            Some((i, _)) => format!("{}{new}{}", &text[..i], &text[i + old.len()..]),
            None => text.clone(),
        },
    };
    Ok(Value::Str(replaced))
}

/// Reads text the way an unformatted cell is read
pub fn value(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Str(s)] => Ok(read_value(s, None)?),
        _ => Err(rejected(args)),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{functions::testing::eval, value::Value};

    fn text(source: &str) -> Value {
        Value::from(source)
    }

    #[test]
    fn basic_string_functions() {
        assert_eq!(eval(r#"CONCATENATE("a", "b", "c")"#), Ok(text("abc")));
        assert_eq!(eval("CONCATENATE()"), Ok(text("")));
        assert_eq!(eval(r#"LEN("héllo")"#), Ok(Value::Int(5)));
        assert_eq!(eval(r#"LOWER("MiXeD")"#), Ok(text("mixed")));
        assert_eq!(eval(r#"UPPER("MiXeD")"#), Ok(text("MIXED")));
        assert_eq!(eval(r#"TRIM("  padded  ")"#), Ok(text("padded")));
        assert_eq!(eval(r#"EXACT("a", "a")"#), Ok(Value::Bool(true)));
        assert_eq!(eval(r#"EXACT("a", "A")"#), Ok(Value::Bool(false)));
        assert_eq!(
            eval(r#"CONCATENATE("a", 1)"#),
            Err("CONCATENATE(values:string...):string received invalid argument 1".into())
        );
    }

    #[test]
    fn find_is_zero_based() {
        assert_eq!(eval(r#"FIND("lo", "hello")"#), Ok(Value::Int(3)));
        assert_eq!(eval(r#"FIND("l", "hello", 3)"#), Ok(Value::Int(3)));
        assert_eq!(eval(r#"FIND("h", "hello", 1)"#), Ok(Value::Int(-1)));
        assert_eq!(eval(r#"FIND("z", "hello")"#), Ok(Value::Int(-1)));
        assert_eq!(eval(r#"FIND("", "hello")"#), Ok(Value::Int(0)));
        assert_eq!(eval(r#"FIND("o", "héllo")"#), Ok(Value::Int(4)));
        assert_eq!(eval(r#"FIND("l", "hello", -1)"#), Ok(Value::Int(-1)));
        assert_eq!(eval(r#"FIND("l", "hello", 9)"#), Ok(Value::Int(-1)));
        assert_eq!(eval(r#"FIND("", "", 3)"#), Ok(Value::Int(0)));
    }

    #[test]
    fn slicing() {
        assert_eq!(eval(r#"LEFT("hello")"#), Ok(text("h")));
        assert_eq!(eval(r#"LEFT("hello", 3)"#), Ok(text("hel")));
        assert_eq!(eval(r#"LEFT("hello", 10)"#), Ok(text("hello")));
        assert_eq!(eval(r#"LEFT("hello", -1)"#), Ok(text("")));
        assert_eq!(eval(r#"RIGHT("hello")"#), Ok(text("o")));
        assert_eq!(eval(r#"RIGHT("hello", 3)"#), Ok(text("llo")));
        assert_eq!(eval(r#"RIGHT("hello", 10)"#), Ok(text("hello")));
        assert_eq!(eval(r#"RIGHT("", 2)"#), Ok(text("")));
        assert_eq!(eval(r#"MID("hello", 2, 3)"#), Ok(text("ell")));
        assert_eq!(eval(r#"MID("hello", 0, 2)"#), Ok(text("he")));
        assert_eq!(eval(r#"MID("hello", 4, 10)"#), Ok(text("lo")));
        assert_eq!(eval(r#"MID("hello", 9, 1)"#), Ok(text("")));
        assert_eq!(eval(r#"MID("hello", 1, 0)"#), Ok(text("")));
    }

    #[test]
    fn substitution() {
        assert_eq!(eval(r#"SUBSTITUTE("a-b-c", "-", "+")"#), Ok(text("a+b+c")));
        assert_eq!(eval(r#"SUBSTITUTE("a-b-c", "-", "+", 0)"#), Ok(text("a+b+c")));
        assert_eq!(eval(r#"SUBSTITUTE("a-b-c", "-", "+", 2)"#), Ok(text("a-b+c")));
        assert_eq!(eval(r#"SUBSTITUTE("a-b-c", "-", "+", 3)"#), Ok(text("a-b-c")));
        assert_eq!(eval(r#"SUBSTITUTE("abc", "", "x")"#), Ok(text("abc")));
        assert_eq!(
            eval(r#"SUBSTITUTE("abc", "b", "x", -1)"#),
            Err("SUBSTITUTE(text:string, old:string, new:string, [instance:int]):string received invalid argument -1".into())
        );
    }

    #[test]
    fn value_reads_like_a_cell() {
        assert_eq!(eval(r#"VALUE("42")"#), Ok(Value::Int(42)));
        assert_eq!(eval(r#"VALUE("2.5")"#), Ok(Value::Float(2.5)));
        assert_eq!(eval(r#"VALUE("true")"#), Ok(Value::Bool(true)));
        assert_eq!(eval(r#"VALUE("abc")"#), Ok(text("abc")));
    }
}
