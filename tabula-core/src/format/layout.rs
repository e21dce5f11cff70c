//! Reference-time date layouts (`2006-01-02 15:04:05`) translated to
//! chrono format items.

use std::{fmt::Write, sync::LazyLock};

use chrono::{
    NaiveDateTime,
    format::{Fixed, Item, Numeric, Pad, ParseResult, Parsed},
};

/// How dates render when no format is set
pub const DATETIME: &str = "2006-01-02 15:04:05";

/// Layouts tried, in order, when reading text without a format
pub const DEFAULT_LAYOUTS: &[&str] = &[
    "2006-01-02",
    "2006-01-02 15:04",
    "02.01.2006",
    "02.01.2006 15:04",
    "02.01.2006 15:04:05",
    "01/02/2006",
    "01/02/2006 15:04",
    "01/02/2006 15:04:05",
    DATETIME,
    "15:04:05",
    "3:04PM",
];

static DEFAULTS: LazyLock<Vec<Layout>> =
    LazyLock::new(|| DEFAULT_LAYOUTS.iter().map(|l| Layout::new(l)).collect());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Year,
    Month,
    Day,
    YearDay,
    Hour,
    Hour12,
    AmPm,
    Minute,
    Second,
    Other,
}

const fn num(numeric: Numeric, pad: Pad) -> Item<'static> {
    Item::Numeric(numeric, pad)
}

const fn fixed(fixed: Fixed) -> Item<'static> {
    Item::Fixed(fixed)
}

/// Layout tokens, longest first where they share a prefix
const CHUNKS: &[(&str, Item<'static>, Field)] = &[
    ("January", fixed(Fixed::LongMonthName), Field::Month),
    ("Jan", fixed(Fixed::ShortMonthName), Field::Month),
    ("Monday", fixed(Fixed::LongWeekdayName), Field::Other),
    ("Mon", fixed(Fixed::ShortWeekdayName), Field::Other),
    ("MST", fixed(Fixed::TimezoneName), Field::Other),
    ("2006", num(Numeric::Year, Pad::Zero), Field::Year),
    ("002", num(Numeric::Ordinal, Pad::Zero), Field::YearDay),
    ("01", num(Numeric::Month, Pad::Zero), Field::Month),
    ("02", num(Numeric::Day, Pad::Zero), Field::Day),
    ("03", num(Numeric::Hour12, Pad::Zero), Field::Hour12),
    ("04", num(Numeric::Minute, Pad::Zero), Field::Minute),
    ("05", num(Numeric::Second, Pad::Zero), Field::Second),
    ("06", num(Numeric::YearMod100, Pad::Zero), Field::Year),
    ("15", num(Numeric::Hour, Pad::Zero), Field::Hour),
    ("1", num(Numeric::Month, Pad::None), Field::Month),
    ("2", num(Numeric::Day, Pad::None), Field::Day),
    ("_2", num(Numeric::Day, Pad::Space), Field::Day),
    ("3", num(Numeric::Hour12, Pad::None), Field::Hour12),
    ("4", num(Numeric::Minute, Pad::None), Field::Minute),
    ("5", num(Numeric::Second, Pad::None), Field::Second),
    ("PM", fixed(Fixed::UpperAmPm), Field::AmPm),
    ("pm", fixed(Fixed::LowerAmPm), Field::AmPm),
    ("-07:00", fixed(Fixed::TimezoneOffsetColon), Field::Other),
    ("-0700", fixed(Fixed::TimezoneOffset), Field::Other),
    ("-07", fixed(Fixed::TimezoneOffsetTripleColon), Field::Other),
    ("Z07:00", fixed(Fixed::TimezoneOffsetColonZ), Field::Other),
    ("Z0700", fixed(Fixed::TimezoneOffsetZ), Field::Other),
];

/// Matches the layout token at the start of `rest`, if any
fn chunk(rest: &str) -> Option<(Item<'static>, Field, usize)> {
    if rest.starts_with("_2006") {
        return None;
    }
    if let Some(found) = fraction(rest) {
        return Some(found);
    }
    CHUNKS
        .iter()
        .find(|(token, _, _)| {
            rest.starts_with(token)
                // "Month" is text, "Mon" is a weekday
                && !(matches!(*token, "Jan" | "Mon")
                    && rest[token.len()..].starts_with(|c: char| c.is_ascii_lowercase()))
        })
        .map(|(token, item, field)| (item.clone(), *field, token.len()))
}

/// `.000`, `.000000`, `.000000000` or a run of `.9`s
fn fraction(rest: &str) -> Option<(Item<'static>, Field, usize)> {
    let digits = rest.strip_prefix('.')?;
    let first = digits.chars().next().filter(|c| matches!(c, '0' | '9'))?;
    let run = digits.chars().take_while(|c| *c == first).count();
    if digits[run..].starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let item = match (first, run) {
        ('9', _) => Fixed::Nanosecond,
        (_, 3) => Fixed::Nanosecond3,
        (_, 6) => Fixed::Nanosecond6,
        (_, 9) => Fixed::Nanosecond9,
        _ => return None,
    };
    Some((fixed(item), Field::Other, run + 1))
}

/// A compiled date layout
#[derive(Debug, Clone)]
pub struct Layout {
    items: Vec<Item<'static>>,
    fields: Vec<Field>,
}

impl Layout {
    pub fn new(layout: &str) -> Self {
        let mut items = Vec::new();
        let mut fields = Vec::new();
        let mut literal = String::new();
        let mut rest = layout;

        while let Some(c) = rest.chars().next() {
            match chunk(rest) {
                Some((item, field, len)) => {
                    if !literal.is_empty() {
                        items.push(Item::OwnedLiteral(std::mem::take(&mut literal).into()));
                    }
                    items.push(item);
                    fields.push(field);
                    rest = &rest[len..];
                }
                None => {
                    literal.push(c);
                    rest = &rest[c.len_utf8()..];
                }
            }
        }
        if !literal.is_empty() {
            items.push(Item::OwnedLiteral(literal.into()));
        }

        Self { items, fields }
    }

    fn has(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    /// Parses `text`, which must match the whole layout. Fields the layout
    /// lacks default to year 0, January 1st, midnight.
    pub fn parse(&self, text: &str) -> ParseResult<NaiveDateTime> {
        let mut parsed = Parsed::new();
        chrono::format::parse(&mut parsed, text, self.items.iter())?;

        if !self.has(Field::Year) {
            parsed.set_year(0)?;
        }
        if !self.has(Field::YearDay) {
            if !self.has(Field::Month) {
                parsed.set_month(1)?;
            }
            if !self.has(Field::Day) {
                parsed.set_day(1)?;
            }
        }
        match (
            self.has(Field::Hour),
            self.has(Field::Hour12),
            self.has(Field::AmPm),
        ) {
            (false, false, true) => parsed.set_hour12(12)?,
            (false, false, false) => parsed.set_hour(0)?,
            (false, true, false) => parsed.set_ampm(false)?,
            _ => {}
        }
        if !self.has(Field::Minute) {
            parsed.set_minute(0)?;
        }
        if !self.has(Field::Second) {
            parsed.set_second(0)?;
        }

        let date = parsed.to_naive_date()?;
        let time = parsed.to_naive_time()?;
        Ok(date.and_time(time))
    }

    /// Renders a date, treating it as UTC for zone tokens
    pub fn format(&self, date: &NaiveDateTime) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        write!(out, "{}", date.and_utc().format_with_items(self.items.iter()))?;
        Ok(out)
    }
}

/// Tries each of [DEFAULT_LAYOUTS] in turn
pub fn parse_default(text: &str) -> Option<NaiveDateTime> {
    DEFAULTS.iter().find_map(|layout| layout.parse(text).ok())
}
