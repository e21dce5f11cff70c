//! Reading grid text into values and rendering values back to text.
//!
//! A format is either a printf/scanf style string with exactly one
//! directive (`%d`, `%.2f`, `%-10s`, `%t`, ...) or, when it has no
//! directive, a date layout such as `02.01.2006`.

use std::sync::LazyLock;

use chumsky::prelude::*;
use regex::Regex;

use crate::value::{Value, ValueKind};

pub mod layout;
mod printf;
mod scan;

use layout::Layout;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormatError {
    #[error("failed to parse {text:?} with format {spec:?}: {reason}")]
    Parse {
        text: String,
        spec: String,
        reason: String,
    },
    #[error("invalid format {spec:?}: {reason}")]
    Invalid { spec: String, reason: String },
    #[error("multiple placeholders found ({0}), expected exactly one")]
    Multiple(usize),
    #[error("no placeholder found in format {0:?}")]
    NoPlaceholder(String),
    #[error("cannot format {kind} value with format {spec:?}")]
    Mismatch { kind: ValueKind, spec: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub minus: bool,
    pub plus: bool,
    pub sharp: bool,
    pub space: bool,
    pub zero: bool,
}
impl From<&str> for Flags {
    fn from(flags: &str) -> Self {
        let mut out = Flags::default();
        for c in flags.chars() {
            match c {
                '-' => out.minus = true,
                '+' => out.plus = true,
                '#' => out.sharp = true,
                ' ' => out.space = true,
                '0' => out.zero = true,
                _ => {}
            }
        }
        out
    }
}

/// One `%` conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub flags: Flags,
    pub width: Option<usize>,
    pub precision: Option<usize>,
    pub verb: char,
}
impl Directive {
    fn verb(verb: char) -> Self {
        Self {
            flags: Flags::default(),
            width: None,
            precision: None,
            verb,
        }
    }

    /// The directive reduced to its verb, `%-9.2f` -> `%f`
    fn cleaned(&self) -> Self {
        Self::verb(self.verb)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// `%%`
    Percent,
    Directive(Directive),
}

fn segments<'src>() -> impl Parser<'src, &'src str, Vec<Segment>> {
    let percent = just("%%").to(Segment::Percent);
    let directive = just('%')
        .ignore_then(one_of("-+# 0").repeated().collect::<String>())
        .then(text::digits(10).to_slice().or_not())
        .then(just('.').ignore_then(text::digits(10).to_slice().or_not()).or_not())
        .then(any().filter(|c: &char| c.is_ascii_alphabetic()))
        .map(|(((flags, width), precision), verb)| {
            Segment::Directive(Directive {
                flags: Flags::from(flags.as_str()),
                width: width.and_then(|w: &str| w.parse().ok()),
                precision: precision
                    .map(|p: Option<&str>| p.and_then(|p| p.parse().ok()).unwrap_or(0)),
                verb,
            })
        });
    let literal = none_of("%")
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(Segment::Literal);
    // a `%` that starts no directive is plain text
    let stray = just('%').to(Segment::Literal("%".to_string()));

    choice((percent, directive, literal, stray))
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
}

pub(crate) fn parse_segments(spec: &str) -> Option<Vec<Segment>> {
    segments().parse(spec).into_result().ok()
}

/// The value type a directive reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Int,
    Float,
    Str,
    Bool,
}
impl Placeholder {
    pub fn of(verb: char) -> Option<Self> {
        match verb {
            'd' | 'o' | 'u' | 'x' | 'X' | 'i' => Some(Placeholder::Int),
            'e' | 'E' | 'f' | 'F' | 'g' | 'G' | 'a' | 'A' => Some(Placeholder::Float),
            's' | 'c' => Some(Placeholder::Str),
            't' => Some(Placeholder::Bool),
            _ => None,
        }
    }
}

/// A classified format string
#[derive(Debug, Clone)]
pub enum FormatSpec {
    Printf {
        placeholder: Placeholder,
        segments: Vec<Segment>,
    },
    Layout(Layout),
}

impl FormatSpec {
    pub fn parse(spec: &str) -> Result<Self, FormatError> {
        let segments = parse_segments(spec).ok_or_else(|| FormatError::Invalid {
            spec: spec.to_string(),
            reason: "malformed directive".to_string(),
        })?;

        let directives = segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Directive(d) => Some(d),
                _ => None,
            })
            .collect::<Vec<_>>();
        let mut recognized = directives
            .iter()
            .filter_map(|d| Placeholder::of(d.verb));

        match (recognized.next(), recognized.count()) {
            (None, _) => Ok(FormatSpec::Layout(Layout::new(spec))),
            (Some(placeholder), 0) => {
                if let Some(d) = directives.iter().find(|d| Placeholder::of(d.verb).is_none()) {
                    return Err(FormatError::Invalid {
                        spec: spec.to_string(),
                        reason: format!("unsupported verb %{}", d.verb),
                    });
                }
                Ok(FormatSpec::Printf {
                    placeholder,
                    segments,
                })
            }
            (Some(_), more) => Err(FormatError::Multiple(more + 1)),
        }
    }
}

static FLOAT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?\d+\.\d+$").unwrap());
static INT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?\d+$").unwrap());
static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^"(.*)"$"#).unwrap());

/// Guesses the type of unformatted text
fn read_default(text: &str) -> Value {
    let text = text.trim();
    if let Some(date) = layout::parse_default(text) {
        return Value::Date(date);
    }
    if FLOAT.is_match(text) {
        if let Ok(x) = text.parse() {
            return Value::Float(x);
        }
    }
    if INT.is_match(text) {
        if let Ok(i) = text.parse() {
            return Value::Int(i);
        }
    }
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Some(inner) = QUOTED.captures(text).and_then(|c| c.get(1)) {
        return Value::Str(inner.as_str().to_string());
    }
    Value::Str(text.to_string())
}

/// Reads cell or variable text as a value, through `spec` when there is one
pub fn read_value(text: &str, spec: Option<&str>) -> Result<Value, FormatError> {
    let Some(spec) = spec.filter(|s| !s.is_empty()) else {
        return Ok(read_default(text));
    };
    let failed = |reason: String| FormatError::Parse {
        text: text.to_string(),
        spec: spec.to_string(),
        reason,
    };

    match FormatSpec::parse(spec)? {
        FormatSpec::Layout(layout) => layout
            .parse(text)
            .map(Value::Date)
            .map_err(|e| failed(e.to_string())),
        FormatSpec::Printf {
            placeholder,
            segments,
        } => {
            let segments = match placeholder {
                Placeholder::Float | Placeholder::Str => segments
                    .into_iter()
                    .map(|segment| match segment {
                        Segment::Directive(d) => Segment::Directive(d.cleaned()),
                        other => other,
                    })
                    .collect(),
                Placeholder::Int | Placeholder::Bool => segments,
            };
            scan::scan(text, &segments, placeholder).map_err(failed)
        }
    }
}

/// Renders a value as text, through `spec` when there is one
pub fn write_value(value: &Value, spec: Option<&str>) -> Result<String, FormatError> {
    let spec = spec.filter(|s| !s.is_empty());
    let mismatch = || FormatError::Mismatch {
        kind: value.kind(),
        spec: spec.unwrap_or_default().to_string(),
    };

    if let Value::Date(date) = value {
        let layout = Layout::new(spec.unwrap_or(layout::DATETIME));
        return layout.format(date).map_err(|_| mismatch());
    }

    let Some(spec) = spec else {
        return match value {
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(x) => Ok(printf::float(&Directive::verb('g'), *x)),
            Value::Str(s) | Value::Ident(s) => Ok(s.clone()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Date(_) | Value::Range(_) => Err(mismatch()),
        };
    };

    let FormatSpec::Printf {
        placeholder,
        segments,
    } = FormatSpec::parse(spec)?
    else {
        return Err(FormatError::NoPlaceholder(spec.to_string()));
    };

    let mut out = String::new();
    for segment in &segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Percent => out.push('%'),
            Segment::Directive(d) => out.push_str(&match (placeholder, value) {
                (Placeholder::Int, Value::Int(i)) => printf::int(d, *i),
                (Placeholder::Float, Value::Int(i)) => printf::float(d, *i as f64),
                (Placeholder::Float, Value::Float(x)) => printf::float(d, *x),
                (Placeholder::Str, Value::Str(s) | Value::Ident(s)) => printf::string(d, s),
                (Placeholder::Bool, Value::Bool(b)) => printf::boolean(d, *b),
                _ => return Err(mismatch()),
            }),
        }
    }
    Ok(out)
}
