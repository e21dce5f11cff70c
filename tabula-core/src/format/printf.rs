//! printf-style rendering of a single directive.

use super::Directive;

/// Pads `body` out to the directive's width, counted in characters
fn pad(d: &Directive, body: String, fill: char) -> String {
    let len = body.chars().count();
    let Some(missing) = d.width.and_then(|w| w.checked_sub(len)) else {
        return body;
    };
    if d.flags.minus {
        body + &" ".repeat(missing)
    } else {
        std::iter::repeat_n(fill, missing).chain(body.chars()).collect()
    }
}

fn fill(d: &Directive) -> char {
    if d.flags.zero && !d.flags.minus {
        '0'
    } else {
        ' '
    }
}

/// `d i u o x X`
pub fn int(d: &Directive, value: i64) -> String {
    let negative = value < 0;
    let magnitude = value.unsigned_abs();
    let mut digits = match d.verb {
        'o' => format!("{magnitude:o}"),
        'x' => format!("{magnitude:x}"),
        'X' => format!("{magnitude:X}"),
        _ => magnitude.to_string(),
    };

    let signed = negative || d.flags.plus || d.flags.space;
    let precision = match d.precision {
        Some(p) => Some(p),
        // zero padding goes through the precision so it lands after the sign
        None if d.flags.zero && !d.flags.minus => d
            .width
            .map(|w| w.saturating_sub(usize::from(signed))),
        None => None,
    };
    match precision {
        Some(0) if magnitude == 0 => digits.clear(),
        Some(p) if digits.len() < p => digits.insert_str(0, &"0".repeat(p - digits.len())),
        _ => {}
    }

    if d.flags.sharp {
        match d.verb {
            'o' if !digits.starts_with('0') => digits.insert(0, '0'),
            'x' => digits.insert_str(0, "0x"),
            'X' => digits.insert_str(0, "0X"),
            _ => {}
        }
    }

    let sign = if negative {
        "-"
    } else if d.flags.plus {
        "+"
    } else if d.flags.space {
        " "
    } else {
        ""
    };
    pad(d, format!("{sign}{digits}"), ' ')
}

/// Significant digits of a `{:e}` rendering with trailing zeros removed,
/// and the position of the decimal point relative to them
fn decimal(scientific: &str) -> (String, i32) {
    let (mantissa, exp) = scientific.split_once('e').unwrap_or((scientific, "0"));
    let exp = exp.parse::<i32>().unwrap_or(0);
    let digits = mantissa
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>();
    let digits = digits.trim_end_matches('0');
    if digits.is_empty() {
        (String::new(), 0)
    } else {
        (digits.to_string(), exp + 1)
    }
}

fn exponent_suffix(out: &mut String, exp: i32, upper: bool) {
    out.push(if upper { 'E' } else { 'e' });
    out.push(if exp < 0 { '-' } else { '+' });
    out.push_str(&format!("{:02}", exp.unsigned_abs()));
}

/// `d.ddde±dd` from significant digits, with `precision` fraction digits
fn exponent_form(digits: &str, point: i32, precision: usize, upper: bool) -> String {
    let mut out = String::new();
    let mut chars = digits.chars();
    out.push(chars.next().unwrap_or('0'));
    if precision > 0 {
        out.push('.');
        let fraction = chars.chain(std::iter::repeat('0')).take(precision);
        out.extend(fraction);
    }
    let exp = if digits.is_empty() { 0 } else { point - 1 };
    exponent_suffix(&mut out, exp, upper);
    out
}

/// `ddd.ddd` from significant digits, with `precision` fraction digits
fn fixed_form(digits: &str, point: i32, precision: usize) -> String {
    let digit_at = |i: i32| {
        usize::try_from(i)
            .ok()
            .and_then(|i| digits.as_bytes().get(i))
            .map_or('0', |b| char::from(*b))
    };
    let mut out = String::new();
    if point > 0 {
        out.extend((0..point).map(digit_at));
    } else {
        out.push('0');
    }
    if precision > 0 {
        out.push('.');
        let precision = i32::try_from(precision).unwrap_or(i32::MAX);
        out.extend((0..precision).map(|i| digit_at(point + i)));
    }
    out
}

/// `%g`: exponent form for very small or large magnitudes, fixed otherwise.
/// Without a precision the shortest round-tripping digits are used.
fn general(value: f64, precision: Option<usize>, upper: bool) -> String {
    let (digits, point, precision, exp_limit) = match precision {
        None => {
            let (digits, point) = decimal(&format!("{value:e}"));
            let n = digits.len();
            (digits, point, n, 6)
        }
        Some(p) => {
            let p = p.max(1);
            let (digits, point) = decimal(&format!("{:.*e}", p - 1, value));
            let n = digits.len();
            let limit = if p > n && n as i32 >= point { n } else { p };
            (digits, point, p, limit)
        }
    };

    let exp = point - 1;
    if exp < -4 || exp >= exp_limit as i32 {
        let precision = precision.min(digits.len());
        return exponent_form(&digits, point, precision.saturating_sub(1), upper);
    }
    let precision = if precision as i32 > point {
        digits.len()
    } else {
        precision
    };
    let fraction = (precision as i32 - point).max(0) as usize;
    fixed_form(&digits, point, fraction)
}

/// `%a`: hexadecimal mantissa and binary exponent, `0x1.8p+01`
fn hex(value: f64, precision: Option<usize>, upper: bool) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";

    let bits = value.to_bits();
    let mut exp = ((bits >> 52) & 0x7ff) as i32;
    let mut mantissa = bits & ((1 << 52) - 1);
    if exp == 0 {
        exp = 1;
    } else {
        mantissa |= 1 << 52;
    }
    exp -= 1023;
    if mantissa == 0 {
        exp = 0;
    }

    // leading 1 at bit 60, four bits per hex digit after it
    mantissa <<= 8;
    while mantissa != 0 && mantissa & (1 << 60) == 0 {
        mantissa <<= 1;
        exp -= 1;
    }
    if let Some(p) = precision.filter(|p| *p < 15) {
        let shift = (p * 4) as u32;
        let extra = (mantissa << shift) & ((1 << 60) - 1);
        mantissa >>= 60 - shift;
        if extra | (mantissa & 1) > 1 << 59 {
            mantissa += 1;
        }
        mantissa <<= 60 - shift;
        if mantissa & (1 << 61) != 0 {
            mantissa >>= 1;
            exp += 1;
        }
    }

    let mut out = String::from("0x");
    out.push(if (mantissa >> 60) & 1 == 1 { '1' } else { '0' });
    mantissa <<= 4;
    let fraction = match precision {
        None if mantissa != 0 => {
            let mut fraction = String::new();
            while mantissa != 0 {
                fraction.push(char::from(DIGITS[((mantissa >> 60) & 15) as usize]));
                mantissa <<= 4;
            }
            fraction
        }
        Some(p) if p > 0 => (0..p)
            .map(|_| {
                let digit = char::from(DIGITS[((mantissa >> 60) & 15) as usize]);
                mantissa <<= 4;
                digit
            })
            .collect(),
        _ => String::new(),
    };
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(&fraction);
    }
    out.push('p');
    out.push(if exp < 0 { '-' } else { '+' });
    out.push_str(&format!("{:02}", exp.unsigned_abs()));

    if upper { out.to_uppercase() } else { out }
}

/// `e E f F g G a A`
pub fn float(d: &Directive, value: f64) -> String {
    if value.is_nan() || value.is_infinite() {
        let body = if value.is_nan() {
            let sign = if d.flags.plus {
                "+"
            } else if d.flags.space {
                " "
            } else {
                ""
            };
            format!("{sign}NaN")
        } else {
            let sign = if value < 0.0 {
                "-"
            } else if d.flags.space && !d.flags.plus {
                " "
            } else {
                "+"
            };
            format!("{sign}Inf")
        };
        return pad(d, body, ' ');
    }

    let magnitude = value.abs();
    let upper = d.verb.is_ascii_uppercase();
    let body = match d.verb {
        'e' | 'E' => {
            let (digits, point) = decimal(&format!("{:.*e}", d.precision.unwrap_or(6), magnitude));
            exponent_form(&digits, point, d.precision.unwrap_or(6), upper)
        }
        'f' | 'F' => format!("{:.*}", d.precision.unwrap_or(6), magnitude),
        'a' | 'A' => hex(magnitude, d.precision, upper),
        _ => general(magnitude, d.precision, upper),
    };

    let sign = if value.is_sign_negative() {
        "-"
    } else if d.flags.plus {
        "+"
    } else if d.flags.space {
        " "
    } else {
        ""
    };
    let len = sign.len() + body.len();
    match d.width {
        Some(width) if d.flags.zero && !d.flags.minus && width > len => {
            format!("{sign}{}{body}", "0".repeat(width - len))
        }
        _ => pad(d, format!("{sign}{body}"), ' '),
    }
}

/// `s c`
pub fn string(d: &Directive, value: &str) -> String {
    let body = match (d.verb, d.precision) {
        ('c', _) => value.chars().take(1).collect(),
        (_, Some(p)) => value.chars().take(p).collect(),
        (_, None) => value.to_string(),
    };
    pad(d, body, fill(d))
}

/// `t`
pub fn boolean(d: &Directive, value: bool) -> String {
    pad(d, value.to_string(), fill(d))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::format::{Segment, parse_segments};

    fn directive(spec: &str) -> Directive {
        parse_segments(spec)
            .unwrap()
            .into_iter()
            .find_map(|segment| match segment {
                Segment::Directive(d) => Some(d),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn integers() {
        let cases = [
            ("%d", 42, "42"),
            ("%d", -42, "-42"),
            ("%5d", 42, "   42"),
            ("%-5d|", 42, "42   "),
            ("%05d", -42, "-0042"),
            ("%+d", 42, "+42"),
            ("% d", 42, " 42"),
            ("%.3d", 7, "007"),
            ("%6.3d", -7, "  -007"),
            ("%.0d", 0, ""),
            ("%x", 255, "ff"),
            ("%X", 255, "FF"),
            ("%x", -255, "-ff"),
            ("%#x", 255, "0xff"),
            ("%#o", 8, "010"),
            ("%o", 8, "10"),
            ("%#08x", 255, "0x000000ff"),
            ("%d", i64::MIN, "-9223372036854775808"),
        ];
        for (spec, value, expected) in cases {
            let expected = expected.trim_end_matches('|');
            assert_eq!(int(&directive(spec.trim_end_matches('|')), value), expected, "{spec}");
        }
    }

    #[test]
    fn floats() {
        let cases = [
            ("%f", 3.14159, "3.141590"),
            ("%.2f", 3.14159, "3.14"),
            ("%8.3f", -3.14159, "  -3.142"),
            ("%08.3f", -3.14159, "-003.142"),
            ("%-8.1f|", 2.5, "2.5     "),
            ("%+.1f", 2.0, "+2.0"),
            ("%.0f", 2.5, "2"),
            ("%e", 1234.5678, "1.234568e+03"),
            ("%.2E", 0.000123, "1.23E-04"),
            ("%e", 0.0, "0.000000e+00"),
            ("%g", 100000.0, "100000"),
            ("%g", 1000000.0, "1e+06"),
            ("%g", 0.0001, "0.0001"),
            ("%g", 0.00001, "1e-05"),
            ("%g", 0.1 + 0.2, "0.30000000000000004"),
            ("%g", 3.0, "3"),
            ("%g", 0.0, "0"),
            ("%G", 1e-10, "1E-10"),
            ("%.3g", 3.14159, "3.14"),
            ("%.3g", 1.0, "1"),
            ("%.3g", 1234.5, "1.23e+03"),
            ("%.10g", 0.5, "0.5"),
            ("%a", 3.0, "0x1.8p+01"),
            ("%a", 1.0, "0x1p+00"),
            ("%.2a", 1.0, "0x1.00p+00"),
            ("%A", 0.5, "0X1P-01"),
            ("%f", f64::INFINITY, "+Inf"),
            ("%5f", f64::NEG_INFINITY, " -Inf"),
            ("%f", f64::NAN, "NaN"),
            ("%06f", f64::NAN, "   NaN"),
        ];
        for (spec, value, expected) in cases {
            let d = directive(spec.trim_end_matches('|'));
            assert_eq!(float(&d, value), expected.trim_end_matches('|'), "{spec}");
        }
    }

    #[test]
    fn strings_and_booleans() {
        assert_eq!(string(&directive("%s"), "abc"), "abc");
        assert_eq!(string(&directive("%5s"), "abc"), "  abc");
        assert_eq!(string(&directive("%-5s"), "abc"), "abc  ");
        assert_eq!(string(&directive("%.2s"), "héllo"), "hé");
        assert_eq!(string(&directive("%05s"), "abc"), "00abc");
        assert_eq!(string(&directive("%c"), "xyz"), "x");
        assert_eq!(string(&directive("%4s"), "né"), "  né");
        assert_eq!(boolean(&directive("%t"), true), "true");
        assert_eq!(boolean(&directive("%-6t"), false), "false ");
    }
}
