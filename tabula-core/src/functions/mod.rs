//! The built-in function library.
//!
//! Each built-in is a plain function over already evaluated arguments,
//! registered with its signature and an argument [Guard]. Names are matched
//! case-insensitively.

use std::{collections::HashMap, sync::LazyLock};

use crate::{
    eval::{EvalErrorKind, Evaluator},
    format::FormatError,
    value::{OpError, Value},
};

pub mod guard;

mod date;
mod external;
mod info;
mod logical;
mod lookup;
mod math;
mod statistical;
mod text;

use guard::{Guard, Predicate};

/// Failure inside a built-in's body, before the signature is attached
#[derive(Debug)]
pub enum CallError {
    Invalid(Value),
    Failed(String),
    Eval(EvalErrorKind),
}
impl From<EvalErrorKind> for CallError {
    fn from(kind: EvalErrorKind) -> Self {
        Self::Eval(kind)
    }
}
impl From<OpError> for CallError {
    fn from(err: OpError) -> Self {
        Self::Eval(err.into())
    }
}
impl From<FormatError> for CallError {
    fn from(err: FormatError) -> Self {
        Self::Eval(err.into())
    }
}

/// Rejects arguments a guard let through but the body can't use
pub(crate) fn rejected(args: &[Value]) -> CallError {
    match args.first() {
        Some(value) => CallError::Invalid(value.clone()),
        None => CallError::Failed("missing argument".to_string()),
    }
}

pub type BuiltinFn = fn(&Evaluator<'_>, &[Value]) -> Result<Value, CallError>;

pub struct Builtin {
    pub name: &'static str,
    pub signature: &'static str,
    pub guard: Guard,
    /// Bare cell names and ranges are passed as references, not contents
    pub takes_refs: bool,
    func: BuiltinFn,
}

impl Builtin {
    const fn new(name: &'static str, signature: &'static str, guard: Guard, func: BuiltinFn) -> Self {
        Self {
            name,
            signature,
            guard,
            takes_refs: false,
            func,
        }
    }

    const fn with_refs(mut self) -> Self {
        self.takes_refs = true;
        self
    }

    pub fn call(&self, ctx: &Evaluator<'_>, args: &[Value]) -> Result<Value, EvalErrorKind> {
        self.guard.check(self.signature, args)?;
        (self.func)(ctx, args).map_err(|err| match err {
            CallError::Invalid(value) => EvalErrorKind::InvalidArgument {
                signature: self.signature,
                value,
            },
            CallError::Failed(reason) => EvalErrorKind::Failed {
                signature: self.signature,
                reason,
            },
            CallError::Eval(kind) => kind,
        })
    }
}

const NUM: Predicate = Value::is_numeric;
const INT: Predicate = Value::is_int;
const STR: Predicate = Value::is_str;
const BOOL: Predicate = Value::is_bool;
const DATE: Predicate = Value::is_date;
const ANY: Predicate = Value::is_any;

fn is_number_or_str(value: &Value) -> bool {
    value.is_numeric() || value.is_str()
}
fn is_name(value: &Value) -> bool {
    value.is_ident() || value.is_str()
}
fn is_reference(value: &Value) -> bool {
    value.is_ident() || value.is_range() || value.is_str()
}

const ROUNDING: Guard = Guard::Optional {
    required: &[NUM],
    optional: &[NUM],
};

#[rustfmt::skip]
static BUILTINS: &[Builtin] = &[
    // numbers
    Builtin::new("SUM", "SUM(values:number...):number", Guard::SameType(NUM), math::sum),
    Builtin::new("ADD", "ADD(a:number, b:number):number", Guard::Exact(&[NUM, NUM]), math::add),
    Builtin::new("PRODUCT", "PRODUCT(values:number...):number", Guard::SameType(NUM), math::product),
    Builtin::new("AVERAGE", "AVERAGE(values:number...):number", Guard::NonEmpty(NUM), statistical::average),
    Builtin::new("MAX", "MAX(values:number...):number", Guard::SameType(NUM), math::max),
    Builtin::new("MIN", "MIN(values:number...):number", Guard::SameType(NUM), math::min),
    Builtin::new("MAXA", "MAXA(values:number|string...):number", Guard::SameType(is_number_or_str), math::maxa),
    Builtin::new("MINA", "MINA(values:number|string...):number", Guard::SameType(is_number_or_str), math::mina),
    Builtin::new("ABS", "ABS(value:number):number", Guard::Exact(&[NUM]), math::abs),
    Builtin::new("CEILING", "CEILING(value:number, [step:number]):number", ROUNDING, math::ceiling),
    Builtin::new("FLOOR", "FLOOR(value:number, [step:number]):number", ROUNDING, math::floor),
    Builtin::new("ROUND", "ROUND(value:number, [step:number]):number", ROUNDING, math::round),
    Builtin::new("INT", "INT(value:number):number", Guard::Exact(&[NUM]), math::int),
    Builtin::new("POWER", "POWER(base:number, exponent:number):number", Guard::Exact(&[NUM, NUM]), math::power),
    Builtin::new("MOD", "MOD(dividend:number, divisor:number):number", Guard::Exact(&[NUM, NUM]), math::r#mod),
    Builtin::new("SQRT", "SQRT(value:number):number", Guard::Exact(&[NUM]), math::sqrt),
    Builtin::new("COUNT", "COUNT(values:any...):number", Guard::Any, statistical::count),
    Builtin::new("COUNTA", "COUNTA(values:any...):number", Guard::Any, statistical::counta),
    // strings
    Builtin::new("CONCATENATE", "CONCATENATE(values:string...):string", Guard::SameType(STR), text::concatenate),
    Builtin::new("LEN", "LEN(value:string):number", Guard::Exact(&[STR]), text::len),
    Builtin::new("LOWER", "LOWER(value:string):string", Guard::Exact(&[STR]), text::lower),
    Builtin::new("UPPER", "UPPER(value:string):string", Guard::Exact(&[STR]), text::upper),
    Builtin::new("TRIM", "TRIM(value:string):string", Guard::Exact(&[STR]), text::trim),
    Builtin::new("EXACT", "EXACT(a:string, b:string):boolean", Guard::Exact(&[STR, STR]), text::exact),
    Builtin::new("FIND", "FIND(what:string, where:string, [start:int]):number", Guard::Optional { required: &[STR, STR], optional: &[INT] }, text::find),
    Builtin::new("LEFT", "LEFT(value:string, [amount:int]):string", Guard::Optional { required: &[STR], optional: &[INT] }, text::left),
    Builtin::new("RIGHT", "RIGHT(value:string, [amount:int]):string", Guard::Optional { required: &[STR], optional: &[INT] }, text::right),
    Builtin::new("MID", "MID(value:string, start:int, amount:int):string", Guard::Exact(&[STR, INT, INT]), text::mid),
    Builtin::new("SUBSTITUTE", "SUBSTITUTE(text:string, old:string, new:string, [instance:int]):string", Guard::Optional { required: &[STR, STR, STR], optional: &[INT] }, text::substitute),
    Builtin::new("VALUE", "VALUE(value:string):any", Guard::Exact(&[STR]), text::value),
    // logical
    Builtin::new("IF", "IF(predicate:boolean, positive:any, negative:any):any", Guard::Exact(&[BOOL, ANY, ANY]), logical::r#if),
    Builtin::new("NOT", "NOT(value:boolean):boolean", Guard::Exact(&[BOOL]), logical::not),
    Builtin::new("AND", "AND(a:boolean, b:boolean):boolean", Guard::Exact(&[BOOL, BOOL]), logical::and),
    Builtin::new("OR", "OR(a:boolean, b:boolean):boolean", Guard::Exact(&[BOOL, BOOL]), logical::or),
    Builtin::new("TRUE", "TRUE():boolean", Guard::Arity(0), logical::r#true),
    Builtin::new("FALSE", "FALSE():boolean", Guard::Arity(0), logical::r#false),
    // dates
    Builtin::new("TODATE", "TODATE(layout:string, value:string):date", Guard::Exact(&[STR, STR]), date::todate),
    Builtin::new("FROMDATE", "FROMDATE(layout:string, source:date):string", Guard::Exact(&[STR, DATE]), date::fromdate),
    Builtin::new("DAY", "DAY(value:date):number", Guard::Exact(&[DATE]), date::day),
    Builtin::new("MONTH", "MONTH(value:date):number", Guard::Exact(&[DATE]), date::month),
    Builtin::new("YEAR", "YEAR(value:date):number", Guard::Exact(&[DATE]), date::year),
    Builtin::new("HOUR", "HOUR(value:date):number", Guard::Exact(&[DATE]), date::hour),
    Builtin::new("MINUTE", "MINUTE(value:date):number", Guard::Exact(&[DATE]), date::minute),
    Builtin::new("SECOND", "SECOND(value:date):number", Guard::Exact(&[DATE]), date::second),
    Builtin::new("WEEKDAY", "WEEKDAY(value:date):number", Guard::Exact(&[DATE]), date::weekday),
    Builtin::new("NOW", "NOW():date", Guard::Arity(0), date::now),
    Builtin::new("DATE", "DATE(year:int, month:int, day:int):date", Guard::Exact(&[INT, INT, INT]), date::date),
    Builtin::new("DATEDIF", "DATEDIF(start:date, end:date, unit:string):number", Guard::Exact(&[DATE, DATE, STR]), date::datedif),
    Builtin::new("DAYS", "DAYS(start:date, end:date):number", Guard::Exact(&[DATE, DATE]), date::days),
    Builtin::new("DATEVALUE", "DATEVALUE(value:string):date", Guard::Exact(&[STR]), date::datevalue),
    // information
    Builtin::new("ISNUMBER", "ISNUMBER(value:any):boolean", Guard::Arity(1), info::is_number),
    Builtin::new("ISTEXT", "ISTEXT(value:any):boolean", Guard::Arity(1), info::is_text),
    Builtin::new("ISLOGICAL", "ISLOGICAL(value:any):boolean", Guard::Arity(1), info::is_logical),
    Builtin::new("ISBLANK", "ISBLANK(value:any):boolean", Guard::Arity(1), info::is_blank),
    // lookup
    Builtin::new("ADDRESS", "ADDRESS(row:int, column:int):identifier", Guard::Exact(&[INT, INT]), lookup::address),
    Builtin::new("ROW", "ROW(cell:identifier|range):number", Guard::Exact(&[is_reference]), lookup::row).with_refs(),
    Builtin::new("COLUMN", "COLUMN(cell:identifier|range):number", Guard::Exact(&[is_reference]), lookup::column).with_refs(),
    Builtin::new("REF", "REF(name:string|identifier):any", Guard::Exact(&[is_name]), lookup::r#ref),
    Builtin::new("RANGE", "RANGE(start:identifier|string, end:identifier|string):range", Guard::Exact(&[is_name, is_name]), lookup::range),
    // external
    Builtin::new("EXEC", "EXEC(command:string, args:string...):string", Guard::NonEmpty(STR), external::exec),
];

static BY_NAME: LazyLock<HashMap<&'static str, &'static Builtin>> =
    LazyLock::new(|| BUILTINS.iter().map(|b| (b.name, b)).collect());

/// Finds a built-in by name, ignoring case
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BY_NAME.get(name.to_ascii_uppercase().as_str()).copied()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use crate::{
        Config,
        eval::Evaluator,
        language::parser::parse_source,
        sheet::Sheet,
        value::Value,
    };

    /// Evaluates one expression against a grid
    pub fn eval_in(config: &Config, rows: &[&[&str]], source: &str) -> Result<Value, String> {
        let sheet = Sheet::new(
            rows.iter()
                .map(|row| row.iter().map(ToString::to_string).collect())
                .collect(),
        );
        let evaluator = Evaluator::new(config, sheet);
        let parsed = parse_source(&format!("{source};"), Arc::from("")).map_err(|e| e.to_string())?;
        evaluator
            .eval(parsed.statements[0].expr())
            .map_err(|e| e.kind.to_string())
    }

    pub fn eval(source: &str) -> Result<Value, String> {
        eval_in(&Config::default(), &[], source)
    }
}
