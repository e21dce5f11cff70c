use chrono::{Datelike, Local, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

use super::{CallError, rejected};
use crate::{
    eval::Evaluator,
    format::{FormatError, layout::Layout},
    value::{Value, ValueKind},
};

/// Layouts DATEVALUE tries, in order
const DATEVALUE_LAYOUTS: &[&str] = &[
    "2006-01-02",
    "2006-01-02 15:04:05",
    "2006-01-02 15:04",
    "01/02/2006",
];

pub fn todate(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Str(layout), Value::Str(text)] => Layout::new(layout)
            .parse(text)
            .map(Value::Date)
            .map_err(|e| {
                FormatError::Parse {
                    text: text.clone(),
                    spec: layout.clone(),
                    reason: e.to_string(),
                }
                .into()
            }),
        _ => Err(rejected(args)),
    }
}

pub fn fromdate(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Str(layout), Value::Date(date)] => Layout::new(layout)
            .format(date)
            .map(Value::Str)
            .map_err(|_| {
                FormatError::Mismatch {
                    kind: ValueKind::Date,
                    spec: layout.clone(),
                }
                .into()
            }),
        _ => Err(rejected(args)),
    }
}

fn part(args: &[Value], get: fn(&NaiveDateTime) -> i64) -> Result<Value, CallError> {
    match args {
        [Value::Date(date)] => Ok(Value::Int(get(date))),
        _ => Err(rejected(args)),
    }
}

pub fn day(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    part(args, |d| d.day().into())
}

pub fn month(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    part(args, |d| d.month().into())
}

pub fn year(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    part(args, |d| d.year().into())
}

pub fn hour(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    part(args, |d| d.hour().into())
}

pub fn minute(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    part(args, |d| d.minute().into())
}

pub fn second(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    part(args, |d| d.second().into())
}

/// 0 for Sunday through 6 for Saturday
pub fn weekday(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    part(args, |d| d.weekday().num_days_from_sunday().into())
}

pub fn now(_: &Evaluator<'_>, _: &[Value]) -> Result<Value, CallError> {
    Ok(Value::Date(Local::now().naive_local()))
}

/// Midnight of the given day, carrying overflowing months and days over
fn normalized(year: i64, month: i64, day: i64) -> Option<NaiveDateTime> {
    let months = year.checked_mul(12)?.checked_add(month.checked_sub(1)?)?;
    let year = i32::try_from(months.div_euclid(12)).ok()?;
    let month = u32::try_from(months.rem_euclid(12) + 1).ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_signed(TimeDelta::try_days(day.checked_sub(1)?)?)?
        .and_hms_opt(0, 0, 0)
}

pub fn date(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Int(year), Value::Int(month), Value::Int(day)] => normalized(*year, *month, *day)
            .map(Value::Date)
            .ok_or_else(|| CallError::Failed(format!("{year}-{month}-{day} is out of range"))),
        _ => Err(rejected(args)),
    }
}

/// Complete months from `start` to `end`
fn whole_months(start: NaiveDate, end: NaiveDate) -> i64 {
    let months = i64::from(end.year() - start.year()) * 12 + i64::from(end.month())
        - i64::from(start.month());
    if end.day() < start.day() {
        months - 1
    } else {
        months
    }
}

fn add_months(date: NaiveDate, months: i64) -> Result<NaiveDate, CallError> {
    u32::try_from(months)
        .ok()
        .and_then(|m| date.checked_add_months(Months::new(m)))
        .ok_or_else(|| CallError::Failed("date out of range".to_string()))
}

/// Difference between two dates in whole units
///
/// `Y`, `M` and `D` count complete years, months and days. `YM` is months
/// ignoring years, `MD` days ignoring months and `YD` days ignoring years.
pub fn datedif(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    let [Value::Date(start), Value::Date(end), Value::Str(unit)] = args else {
        return Err(rejected(args));
    };
    if start > end {
        return Err(CallError::Failed("start date is after end date".to_string()));
    }

    let (start, end) = (start.date(), end.date());
    let months = whole_months(start, end);
    let result = match unit.to_ascii_uppercase().as_str() {
        "D" => (end - start).num_days(),
        "M" => months,
        "Y" => months / 12,
        "YM" => months % 12,
        "MD" => (end - add_months(start, months)?).num_days(),
        "YD" => (end - add_months(start, months / 12 * 12)?).num_days(),
        _ => return Err(CallError::Invalid(Value::Str(unit.clone()))),
    };
    Ok(Value::Int(result))
}

pub fn days(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [Value::Date(start), Value::Date(end)] => {
            Ok(Value::Int((end.date() - start.date()).num_days()))
        }
        _ => Err(rejected(args)),
    }
}

pub fn datevalue(_: &Evaluator<'_>, args: &[Value]) -> Result<Value, CallError> {
    match args {
        [value @ Value::Str(text)] => DATEVALUE_LAYOUTS
            .iter()
            .find_map(|layout| Layout::new(layout).parse(text.trim()).ok())
            .map(Value::Date)
            .ok_or_else(|| CallError::Invalid(value.clone())),
        _ => Err(rejected(args)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use crate::{functions::testing::eval, value::Value};

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::Date(
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn building_dates() {
        assert_eq!(eval("DATE(2024, 3, 5)"), Ok(date(2024, 3, 5)));
        assert_eq!(eval("DATE(2024, 13, 1)"), Ok(date(2025, 1, 1)));
        assert_eq!(eval("DATE(2024, 3, 0)"), Ok(date(2024, 2, 29)));
        assert_eq!(eval("DATE(2024, 1, 32)"), Ok(date(2024, 2, 1)));
        assert_eq!(eval("DATE(2024, 0, 1)"), Ok(date(2023, 12, 1)));
        assert_eq!(eval(r#"DATEVALUE("2024-03-05")"#), Ok(date(2024, 3, 5)));
        assert_eq!(eval(r#"DATEVALUE("03/05/2024")"#), Ok(date(2024, 3, 5)));
        assert_eq!(
            eval(r#"DATEVALUE("5th of March")"#),
            Err("DATEVALUE(value:string):date received invalid argument \"5th of March\"".into())
        );
        assert!(matches!(eval("NOW()"), Ok(Value::Date(_))));
    }

    #[test]
    fn layouts() {
        assert_eq!(
            eval(r#"TODATE("02.01.2006", "05.03.2024")"#),
            Ok(date(2024, 3, 5))
        );
        assert!(eval(r#"TODATE("02.01.2006", "2024-03-05")"#).is_err());
        assert_eq!(
            eval(r#"FROMDATE("Jan 2, 2006", DATE(2024, 3, 5))"#),
            Ok(Value::from("Mar 5, 2024"))
        );
    }

    #[test]
    fn parts() {
        assert_eq!(eval("DAY(DATE(2024, 3, 5))"), Ok(Value::Int(5)));
        assert_eq!(eval("MONTH(DATE(2024, 3, 5))"), Ok(Value::Int(3)));
        assert_eq!(eval("YEAR(DATE(2024, 3, 5))"), Ok(Value::Int(2024)));
        assert_eq!(eval("WEEKDAY(DATE(2024, 3, 3))"), Ok(Value::Int(0)));
        assert_eq!(eval("WEEKDAY(DATE(2024, 3, 9))"), Ok(Value::Int(6)));
        assert_eq!(
            eval(r#"HOUR(DATEVALUE("2024-03-05 10:20:30"))"#),
            Ok(Value::Int(10))
        );
        assert_eq!(
            eval(r#"MINUTE(DATEVALUE("2024-03-05 10:20"))"#),
            Ok(Value::Int(20))
        );
        assert_eq!(
            eval(r#"SECOND(DATEVALUE("2024-03-05 10:20:30"))"#),
            Ok(Value::Int(30))
        );
        assert_eq!(
            eval("DAY(5)"),
            Err("DAY(value:date):number received invalid argument 5".into())
        );
    }

    #[test]
    fn differences() {
        let dif = |unit: &str| eval(&format!(r#"DATEDIF(DATE(2020, 1, 15), DATE(2024, 3, 10), "{unit}")"#));
        assert_eq!(dif("Y"), Ok(Value::Int(4)));
        assert_eq!(dif("M"), Ok(Value::Int(49)));
        assert_eq!(dif("D"), Ok(Value::Int(1516)));
        assert_eq!(dif("YM"), Ok(Value::Int(1)));
        assert_eq!(dif("MD"), Ok(Value::Int(24)));
        assert_eq!(dif("YD"), Ok(Value::Int(55)));
        assert_eq!(dif("d"), Ok(Value::Int(1516)));
        assert_eq!(
            dif("W"),
            Err("DATEDIF(start:date, end:date, unit:string):number received invalid argument \"W\"".into())
        );
        assert!(eval(r#"DATEDIF(DATE(2024, 1, 2), DATE(2024, 1, 1), "D")"#).is_err());
        assert_eq!(
            eval("DAYS(DATE(2024, 1, 1), DATE(2024, 3, 1))"),
            Ok(Value::Int(60))
        );
        assert_eq!(
            eval("DAYS(DATE(2024, 3, 1), DATE(2024, 1, 1))"),
            Ok(Value::Int(-60))
        );
    }
}
