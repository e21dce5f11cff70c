use std::{cmp::Ordering, collections::HashMap};

use tracing::{instrument, trace};

use crate::{
    Config,
    cell::CellIdx,
    format::{FormatError, read_value, write_value},
    functions::{self, guard::Arity},
    language::{
        Position,
        ast::{Expr, ExprKind, InfixOp, PrefixOp, Program, Statement},
    },
    sheet::{OutOfBounds, Sheet},
    value::{OpError, Value, ValueKind},
};

#[derive(Debug, thiserror::Error)]
pub enum EvalErrorKind {
    #[error("{0} not found in context")]
    UnknownVariable(String),
    #[error(transparent)]
    OutOfBounds(#[from] OutOfBounds),
    #[error("unsupported function call {0}")]
    UnknownFunction(String),
    #[error("{signature} expects {expected}, got {got}")]
    Arity {
        signature: &'static str,
        expected: Arity,
        got: usize,
    },
    #[error("{signature} received invalid argument {value}")]
    InvalidArgument {
        signature: &'static str,
        value: Value,
    },
    #[error(transparent)]
    Operator(#[from] OpError),
    #[error("fmt {target} accepts only strings, but got {kind}")]
    FmtNotString { target: String, kind: ValueKind },
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("EXEC is disabled; enable it explicitly to run external commands")]
    ExecDisabled,
    #[error("{command} failed: {reason}")]
    Exec { command: String, reason: String },
    #[error("{signature} failed: {reason}")]
    Failed {
        signature: &'static str,
        reason: String,
    },
}

#[derive(Debug, thiserror::Error)]
#[error("{kind} at {pos}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub pos: Position,
}
impl EvalError {
    fn at(pos: &Position) -> impl Fn(EvalErrorKind) -> Self + '_ {
        |kind| Self {
            kind,
            pos: pos.clone(),
        }
    }
}

/// Runs statements against a grid
///
/// Cells live in the [Sheet], other names in a variable context. Both hold
/// text: every assignment renders its value through the target's format and
/// every read parses it back, so a `fmt` applies in both directions.
#[derive(Debug)]
pub struct Evaluator<'a> {
    config: &'a Config,
    sheet: Sheet,
    context: HashMap<String, String>,
    formats: HashMap<String, String>,
}

impl<'a> Evaluator<'a> {
    pub fn new(config: &'a Config, sheet: Sheet) -> Self {
        Self {
            config,
            sheet,
            context: HashMap::new(),
            formats: HashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    pub fn into_sheet(self) -> Sheet {
        self.sheet
    }

    /// Raw text of a variable
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.context.get(name).map(String::as_str)
    }

    /// Executes every statement in order, stopping at the first failure
    ///
    /// On failure the grid keeps the writes of the statements before it.
    #[instrument(skip_all, fields(statements = program.statements.len()))]
    pub fn run(&mut self, program: &Program) -> Result<(), EvalError> {
        for statement in &program.statements {
            trace!(%statement, "executing");
            self.execute(statement)?;
        }
        Ok(())
    }

    pub fn execute(&mut self, statement: &Statement) -> Result<(), EvalError> {
        match statement {
            Statement::Let { target, value } => {
                let value = self.eval(value)?;
                let fail = EvalError::at(&target.pos);
                let format = self.formats.get(&target.name).map(String::as_str);
                let text = write_value(&value, format).map_err(|e| fail(e.into()))?;

                match CellIdx::parse(&target.name) {
                    Some(idx) => {
                        self.sheet.set(idx, text).map_err(|e| fail(e.into()))?;
                    }
                    None => {
                        self.context.insert(target.name.clone(), text);
                    }
                }
            }
            Statement::Fmt { target, value } => match self.eval(value)? {
                Value::Str(spec) => {
                    self.formats.insert(target.name.clone(), spec);
                }
                other => {
                    return Err(EvalError::at(&value.pos)(EvalErrorKind::FmtNotString {
                        target: target.name.clone(),
                        kind: other.kind(),
                    }));
                }
            },
            Statement::Expr(expr) => {
                self.eval(expr)?;
            }
        }
        Ok(())
    }

    /// Reads a cell or variable through its format
    ///
    /// Cells past the edge of the grid read as empty text.
    pub fn lookup(&self, name: &str) -> Result<Value, EvalErrorKind> {
        let text = match CellIdx::parse(name) {
            Some(idx) => self.sheet.get(idx).unwrap_or_default(),
            None => self
                .context
                .get(name)
                .map(String::as_str)
                .ok_or_else(|| EvalErrorKind::UnknownVariable(name.to_string()))?,
        };
        let format = self.formats.get(name).map(String::as_str);
        Ok(read_value(text, format)?)
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        let fail = EvalError::at(&expr.pos);
        match &expr.kind {
            ExprKind::Int(i) => Ok(Value::Int(*i)),
            ExprKind::Float(x) => Ok(Value::Float(*x)),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Ident(name) => self.lookup(name).map_err(fail),
            ExprKind::Range { cells, .. } => Ok(Value::Range(cells.clone())),
            ExprKind::Prefix(op, operand) => {
                let operand = self.eval(operand)?;
                let result = match op {
                    PrefixOp::Neg => -operand,
                    PrefixOp::Not => !operand,
                };
                result.map_err(|e| fail(e.into()))
            }
            ExprKind::Infix(op, lhs, rhs) => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                infix(*op, lhs, rhs).map_err(|e| fail(e.into()))
            }
            ExprKind::Call(name, args) => self.call(expr, name, args),
        }
    }

    fn call(&self, expr: &Expr, name: &str, args: &[Expr]) -> Result<Value, EvalError> {
        let fail = EvalError::at(&expr.pos);
        let builtin = functions::lookup(name)
            .ok_or_else(|| fail(EvalErrorKind::UnknownFunction(name.to_string())))?;

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let value = match &arg.kind {
                ExprKind::Ident(cell) if builtin.takes_refs && CellIdx::parse(cell).is_some() => {
                    Value::Ident(cell.clone())
                }
                _ => self.eval(arg)?,
            };
            match value {
                Value::Range(cells) if !builtin.takes_refs => {
                    for cell in cells {
                        let value = self.lookup(&cell.name()).map_err(EvalError::at(&arg.pos))?;
                        values.push(value);
                    }
                }
                value => values.push(value),
            }
        }

        builtin.call(self, &values).map_err(fail)
    }
}

/// False whenever the operands are unordered
fn ordered(
    lhs: &Value,
    symbol: &'static str,
    rhs: &Value,
    holds: fn(Ordering) -> bool,
) -> Result<Value, OpError> {
    let ord = lhs.compare(symbol, rhs)?;
    Ok(Value::Bool(ord.is_some_and(holds)))
}

fn infix(op: InfixOp, lhs: Value, rhs: Value) -> Result<Value, OpError> {
    let symbol = op.symbol();
    match op {
        InfixOp::Add => lhs + rhs,
        InfixOp::Sub => lhs - rhs,
        InfixOp::Mul => lhs * rhs,
        InfixOp::Div => lhs / rhs,
        InfixOp::Rem => lhs % rhs,
        InfixOp::Eq => lhs.equals(&rhs).map(Value::Bool),
        InfixOp::NotEq => lhs.equals(&rhs).map(|eq| Value::Bool(!eq)),
        InfixOp::Lt => ordered(&lhs, symbol, &rhs, Ordering::is_lt),
        InfixOp::Gt => ordered(&lhs, symbol, &rhs, Ordering::is_gt),
        InfixOp::LtEq => ordered(&lhs, symbol, &rhs, Ordering::is_le),
        InfixOp::GtEq => ordered(&lhs, symbol, &rhs, Ordering::is_ge),
    }
}
