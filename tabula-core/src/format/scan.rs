//! scanf-style reading of a single value.

use std::sync::LazyLock;

use regex::Regex;

use super::{Directive, Placeholder, Segment};
use crate::value::Value;

static DECIMAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+").unwrap());
static OCTAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?(?:0[oO])?[0-7]+").unwrap());
static HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(?:0[xX])?[0-9a-fA-F]+").unwrap());
static PREFIXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:0[xX][0-9a-fA-F]+|0[bB][01]+|0[oO][0-7]+|[0-9]+)").unwrap()
});
static FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?|(?i:infinity|inf|nan))")
        .unwrap()
});
static BOOL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?i:true|false|t|f|1|0)").unwrap());

const MISMATCH: &str = "input does not match format";
const EOF: &str = "unexpected end of input";

/// Cursor over the input text
struct Input<'a> {
    rest: &'a str,
}

impl<'a> Input<'a> {
    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    /// The next token, at most `width` characters long
    fn window(&self, width: Option<usize>) -> &'a str {
        match width.and_then(|w| self.rest.char_indices().nth(w)) {
            Some((end, _)) => &self.rest[..end],
            None => self.rest,
        }
    }

    fn take(&mut self, len: usize) -> &'a str {
        let (token, rest) = self.rest.split_at(len);
        self.rest = rest;
        token
    }

    fn token(&mut self, pattern: &Regex, width: Option<usize>, expected: &str) -> Result<&'a str, String> {
        if self.rest.is_empty() {
            return Err(EOF.to_string());
        }
        let len = pattern
            .find(self.window(width))
            .map(|m| m.end())
            .filter(|len| *len > 0)
            .ok_or_else(|| format!("expected {expected}"))?;
        Ok(self.take(len))
    }

    fn literal(&mut self, text: &str) -> Result<(), String> {
        let mut expected = text.chars().peekable();
        while let Some(c) = expected.next() {
            if c.is_whitespace() {
                while expected.next_if(|c| c.is_whitespace()).is_some() {}
                self.skip_whitespace();
                continue;
            }
            let mut actual = self.rest.chars();
            match actual.next() {
                Some(a) if a == c => self.rest = actual.as_str(),
                Some(_) => return Err(MISMATCH.to_string()),
                None => return Err(EOF.to_string()),
            }
        }
        Ok(())
    }
}

fn int(token: &str, verb: char) -> Result<i64, String> {
    let (negative, body) = match token.strip_prefix('-') {
        Some(body) => (true, body),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };
    let lower = body.to_ascii_lowercase();
    let (radix, digits) = match verb {
        'o' => (8, lower.strip_prefix("0o").unwrap_or(&lower)),
        'x' | 'X' => (16, lower.strip_prefix("0x").unwrap_or(&lower)),
        'i' => match lower.get(..2) {
            Some("0x") => (16, &lower[2..]),
            Some("0b") => (2, &lower[2..]),
            Some("0o") => (8, &lower[2..]),
            _ => (10, lower.as_str()),
        },
        _ => (10, lower.as_str()),
    };
    let sign = if negative { "-" } else { "" };
    i64::from_str_radix(&format!("{sign}{digits}"), radix).map_err(|e| e.to_string())
}

fn directive(input: &mut Input, d: &Directive, placeholder: Placeholder) -> Result<Value, String> {
    if d.verb != 'c' {
        input.skip_whitespace();
    }
    match placeholder {
        Placeholder::Int => {
            let pattern = match d.verb {
                'o' => &OCTAL,
                'x' | 'X' => &HEX,
                'i' => &PREFIXED,
                _ => &DECIMAL,
            };
            let token = input.token(pattern, d.width, "integer")?;
            int(token, d.verb).map(Value::Int)
        }
        Placeholder::Float => {
            let token = input.token(&FLOAT, d.width, "float")?;
            token
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| e.to_string())
        }
        Placeholder::Str if d.verb == 'c' => {
            let c = input.rest.chars().next().ok_or_else(|| EOF.to_string())?;
            Ok(Value::Str(input.take(c.len_utf8()).to_string()))
        }
        Placeholder::Str => {
            let window = input.window(d.width);
            let len = window.find(char::is_whitespace).unwrap_or(window.len());
            if len == 0 {
                return Err(EOF.to_string());
            }
            Ok(Value::Str(input.take(len).to_string()))
        }
        Placeholder::Bool => {
            let token = input.token(&BOOL, d.width, "boolean")?;
            Ok(Value::Bool(matches!(
                token.to_ascii_lowercase().as_str(),
                "true" | "t" | "1"
            )))
        }
    }
}

/// Matches `text` against the segments of a single-directive format and
/// returns the directive's value. Input past the last segment is ignored.
pub fn scan(text: &str, segments: &[Segment], placeholder: Placeholder) -> Result<Value, String> {
    let mut input = Input { rest: text };
    let mut value = None;
    for segment in segments {
        match segment {
            Segment::Literal(literal) => input.literal(literal)?,
            Segment::Percent => input.literal("%")?,
            Segment::Directive(d) => value = Some(directive(&mut input, d, placeholder)?),
        }
    }
    value.ok_or_else(|| "no directive to read".to_string())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::format::parse_segments;

    fn read(text: &str, spec: &str, placeholder: Placeholder) -> Result<Value, String> {
        scan(text, &parse_segments(spec).unwrap(), placeholder)
    }

    #[test]
    fn integers() {
        let cases = [
            ("42", "%d", 42),
            ("  -42", "%d", -42),
            ("42kg", "%dkg", 42),
            ("84 pounds", "%d pounds", 84),
            ("84pounds", "%d pounds", 84),
            ("$12.50", "$%d", 12),
            ("12345", "%3d", 123),
            ("ff", "%x", 255),
            ("-0xFF", "%X", -255),
            ("17", "%o", 15),
            ("0b101", "%i", 5),
            ("0x10", "%i", 16),
            ("100%", "%d%%", 100),
        ];
        for (text, spec, expected) in cases {
            assert_eq!(
                read(text, spec, Placeholder::Int),
                Ok(Value::Int(expected)),
                "{text} {spec}"
            );
        }
    }

    #[test]
    fn integer_failures() {
        assert_eq!(read("abc", "%d", Placeholder::Int), Err("expected integer".into()));
        assert_eq!(read("", "%d", Placeholder::Int), Err(EOF.into()));
        assert_eq!(read("42", "%dkg", Placeholder::Int), Err(EOF.into()));
        assert_eq!(read("42lb", "%dkg", Placeholder::Int), Err(MISMATCH.into()));
        assert_eq!(read("x42", "y%d", Placeholder::Int), Err(MISMATCH.into()));
        assert!(read("99999999999999999999", "%d", Placeholder::Int).is_err());
    }

    #[test]
    fn floats() {
        let cases = [
            ("3.14", "%f", 3.14),
            ("  3.14  ", "%f", 3.14),
            ("1e3", "%g", 1000.0),
            (".5", "%f", 0.5),
            ("-2", "%f", -2.0),
            ("12.5%", "%f%%", 12.5),
            ("$1.25", "$%f", 1.25),
        ];
        for (text, spec, expected) in cases {
            assert_eq!(
                read(text, spec, Placeholder::Float),
                Ok(Value::Float(expected)),
                "{text} {spec}"
            );
        }
        assert_eq!(
            read("inf", "%f", Placeholder::Float),
            Ok(Value::Float(f64::INFINITY))
        );
        assert_eq!(
            read("abc", "%f", Placeholder::Float),
            Err("expected float".into())
        );
    }

    #[test]
    fn strings_and_booleans() {
        assert_eq!(
            read("  hello world", "%s", Placeholder::Str),
            Ok(Value::Str("hello".into()))
        );
        assert_eq!(
            read("name: Ann", "name: %s", Placeholder::Str),
            Ok(Value::Str("Ann".into()))
        );
        assert_eq!(read(" x", "%c", Placeholder::Str), Ok(Value::Str(" ".into())));
        assert_eq!(read("", "%s", Placeholder::Str), Err(EOF.into()));
        assert_eq!(read("TRUE", "%t", Placeholder::Bool), Ok(Value::Bool(true)));
        assert_eq!(read("f", "%t", Placeholder::Bool), Ok(Value::Bool(false)));
        assert_eq!(read("done: 1", "done: %t", Placeholder::Bool), Ok(Value::Bool(true)));
        assert_eq!(
            read("yes", "%t", Placeholder::Bool),
            Err("expected boolean".into())
        );
    }
}
