use std::{cmp::Ordering, fmt, ops};

use chrono::NaiveDateTime;

use crate::cell::CellIdx;

/// A typed value flowing through the evaluator
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Date(NaiveDateTime),
    /// A cell or variable name, produced by lookup functions
    Ident(String),
    /// An enumerated cell range, produced by `:` and `RANGE`
    Range(Vec<CellIdx>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Float,
    Str,
    Bool,
    Date,
    Ident,
    Range,
}
impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Str => "string",
            ValueKind::Bool => "boolean",
            ValueKind::Date => "date",
            ValueKind::Ident => "identifier",
            ValueKind::Range => "range",
        })
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::Bool(_) => ValueKind::Bool,
            Value::Date(_) => ValueKind::Date,
            Value::Ident(_) => ValueKind::Ident,
            Value::Range(_) => ValueKind::Range,
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }
    pub fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }
    pub fn is_date(&self) -> bool {
        matches!(self, Value::Date(_))
    }
    pub fn is_ident(&self) -> bool {
        matches!(self, Value::Ident(_))
    }
    pub fn is_range(&self) -> bool {
        matches!(self, Value::Range(_))
    }
    pub fn is_any(&self) -> bool {
        true
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// `==` / `!=`, defined over like kinds plus mixed numerics
    pub fn equals(&self, rhs: &Value) -> Result<bool, OpError> {
        match (self, rhs) {
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            _ => Ok(self.compare("==", rhs)? == Some(Ordering::Equal)),
        }
    }

    /// `<` `>` `<=` `>=`, defined over numerics, strings and dates
    ///
    /// `None` when a NaN is involved, which makes every ordered comparison
    /// false.
    pub fn compare(&self, op: &'static str, rhs: &Value) -> Result<Option<Ordering>, OpError> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(b))),
            (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
            (Value::Date(a), Value::Date(b)) => Ok(Some(a.cmp(b))),
            (a, b) if a.is_numeric() && b.is_numeric() => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
                _ => Ok(None),
            },
            _ => Err(OpError::unsupported(op, self, rhs)),
        }
    }
}

impl fmt::Display for Value {
    /// Rendering used in diagnostics, not for grid output
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            Value::Ident(name) => f.write_str(name),
            Value::Range(cells) => {
                let names = cells.iter().map(CellIdx::name).collect::<Vec<_>>();
                write!(f, "[{}]", names.join(", "))
            }
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}
impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}
impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}
impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::Date(value)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OpError {
    #[error("division by zero")]
    DivideByZero,
    #[error("integer overflow in {0}")]
    Overflow(&'static str),
    #[error("operator {op} is not supported for type: {lhs} and {rhs}")]
    Unsupported {
        op: &'static str,
        lhs: ValueKind,
        rhs: ValueKind,
    },
    #[error("operator {op} is not supported for type: {operand}")]
    UnsupportedPrefix { op: &'static str, operand: ValueKind },
}
impl OpError {
    fn unsupported(op: &'static str, lhs: &Value, rhs: &Value) -> Self {
        Self::Unsupported {
            op,
            lhs: lhs.kind(),
            rhs: rhs.kind(),
        }
    }
}

/// Applies an arithmetic operator with int/float widening
fn arithmetic(
    op: &'static str,
    lhs: Value,
    rhs: Value,
    int: impl FnOnce(i64, i64) -> Result<i64, OpError>,
    float: impl FnOnce(f64, f64) -> Result<f64, OpError>,
) -> Result<Value, OpError> {
    match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => int(*a, *b).map(Value::Int),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            match (lhs.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => float(a, b).map(Value::Float),
                _ => Err(OpError::unsupported(op, &lhs, &rhs)),
            }
        }
        _ => Err(OpError::unsupported(op, &lhs, &rhs)),
    }
}

impl ops::Neg for Value {
    type Output = Result<Value, OpError>;

    fn neg(self) -> Self::Output {
        match self {
            Value::Int(i) => i.checked_neg().map(Value::Int).ok_or(OpError::Overflow("-")),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(OpError::UnsupportedPrefix {
                op: "-",
                operand: other.kind(),
            }),
        }
    }
}

impl ops::Not for Value {
    type Output = Result<Value, OpError>;

    fn not(self) -> Self::Output {
        match self {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(OpError::UnsupportedPrefix {
                op: "!",
                operand: other.kind(),
            }),
        }
    }
}

impl ops::Add for Value {
    type Output = Result<Value, OpError>;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (lhs, rhs) => arithmetic(
                "+",
                lhs,
                rhs,
                |a, b| a.checked_add(b).ok_or(OpError::Overflow("+")),
                |a, b| Ok(a + b),
            ),
        }
    }
}

impl ops::Sub for Value {
    type Output = Result<Value, OpError>;

    fn sub(self, rhs: Self) -> Self::Output {
        arithmetic(
            "-",
            self,
            rhs,
            |a, b| a.checked_sub(b).ok_or(OpError::Overflow("-")),
            |a, b| Ok(a - b),
        )
    }
}

impl ops::Mul for Value {
    type Output = Result<Value, OpError>;

    fn mul(self, rhs: Self) -> Self::Output {
        arithmetic(
            "*",
            self,
            rhs,
            |a, b| a.checked_mul(b).ok_or(OpError::Overflow("*")),
            |a, b| Ok(a * b),
        )
    }
}

impl ops::Div for Value {
    type Output = Result<Value, OpError>;

    /// Integer operands truncate toward zero
    fn div(self, rhs: Self) -> Self::Output {
        arithmetic(
            "/",
            self,
            rhs,
            |a, b| match b {
                0 => Err(OpError::DivideByZero),
                _ => a.checked_div(b).ok_or(OpError::Overflow("/")),
            },
            |a, b| {
                if b == 0.0 {
                    Err(OpError::DivideByZero)
                } else {
                    Ok(a / b)
                }
            },
        )
    }
}

impl ops::Rem for Value {
    type Output = Result<Value, OpError>;

    /// The result takes the sign of the dividend
    fn rem(self, rhs: Self) -> Self::Output {
        arithmetic(
            "%",
            self,
            rhs,
            |a, b| match b {
                0 => Err(OpError::DivideByZero),
                _ => a.checked_rem(b).ok_or(OpError::Overflow("%")),
            },
            |a, b| {
                if b == 0.0 {
                    Err(OpError::DivideByZero)
                } else {
                    Ok(a % b)
                }
            },
        )
    }
}
