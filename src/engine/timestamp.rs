//! Timestamp extraction for the `extract_timestamp` rule.
//!
//! Java `SimpleDateFormat` patterns and Go reference layouts are translated to
//! strftime before parsing; epoch formats are read as integers (seconds may
//! carry a fraction).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::rules_group::TimestampFormat;

pub fn parse_timestamp(value: &str, format: TimestampFormat, layout: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    match format {
        TimestampFormat::Strftime => parse_strftime(value, layout),
        TimestampFormat::JavaSdf => parse_strftime(value, &java_to_strftime(layout)?),
        TimestampFormat::Golang => parse_strftime(value, &go_to_strftime(layout)),
        TimestampFormat::SecondTs => parse_seconds(value),
        TimestampFormat::MilliTs => from_units(value.parse().ok()?, 1_000),
        TimestampFormat::MicroTs => from_units(value.parse().ok()?, 1_000_000),
        TimestampFormat::NanoTs => from_units(value.parse().ok()?, 1_000_000_000),
    }
}

fn from_units(value: i64, per_second: i64) -> Option<DateTime<Utc>> {
    let secs = value.div_euclid(per_second);
    let nanos = value.rem_euclid(per_second) * (1_000_000_000 / per_second);
    DateTime::from_timestamp(secs, u32::try_from(nanos).ok()?)
}

fn parse_seconds(value: &str) -> Option<DateTime<Utc>> {
    match value.split_once('.') {
        None => DateTime::from_timestamp(value.parse().ok()?, 0),
        Some((whole, fraction)) => {
            let secs: i64 = whole.parse().ok()?;
            if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let digits: String = fraction.chars().chain(std::iter::repeat('0')).take(9).collect();
            let nanos: u32 = digits.parse().ok()?;
            // "-1.5" is 1.5 seconds before the epoch
            if whole.starts_with('-') && nanos > 0 {
                DateTime::from_timestamp(secs - 1, 1_000_000_000 - nanos)
            } else {
                DateTime::from_timestamp(secs, nanos)
            }
        }
    }
}

fn parse_strftime(value: &str, format: &str) -> Option<DateTime<Utc>> {
    // A literal "Z" stands for UTC where the layout expects a numeric offset.
    let value = if value.ends_with('Z') && format.contains("%:z") {
        format!("{}+00:00", &value[..value.len() - 1])
    } else if value.ends_with('Z') && format.contains("%z") {
        format!("{}+0000", &value[..value.len() - 1])
    } else {
        value.to_string()
    };

    if let Ok(dt) = DateTime::parse_from_str(&value, format) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(&value, format) {
        return Some(naive.and_utc());
    }
    if has_time_fields(format) {
        return None;
    }
    NaiveDate::parse_from_str(&value, format)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn has_time_fields(format: &str) -> bool {
    const TIME_SPECIFIERS: [char; 12] = ['H', 'I', 'k', 'l', 'M', 'S', 'p', 'P', 'T', 'R', 'X', 'r'];

    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            continue;
        }
        let Some(mut spec) = chars.next() else {
            break;
        };
        while matches!(spec, '-' | '_' | '0' | '.' | ':' | '3' | '6' | '9') {
            match chars.next() {
                Some(next) => spec = next,
                None => return false,
            }
        }
        if TIME_SPECIFIERS.contains(&spec) {
            return true;
        }
    }
    false
}

/// Translates a Java `SimpleDateFormat` pattern into strftime.
///
/// Returns `None` for pattern letters with no strftime counterpart, which
/// Java rejects as well.
pub fn java_to_strftime(pattern: &str) -> Option<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            // '' is a literal quote, otherwise everything up to the next quote is literal
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        let spec = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1 | 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', _) => "%d",
            ('H', _) => "%H",
            ('h', _) => "%I",
            ('m', _) => "%M",
            ('s', _) => "%S",
            ('S', 1..=3) => "%3f",
            ('S', 4..=6) => "%6f",
            ('S', _) => "%9f",
            ('k', _) => "%H",
            ('K', _) => "%I",
            ('a', _) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('u', _) => "%u",
            ('z', _) => "%Z",
            ('Z', _) => "%z",
            ('X', 1 | 2) => "%z",
            ('X', _) => "%:z",
            ('D', _) => "%j",
            _ => return None,
        };
        out.push_str(spec);
        i += run;
    }

    Some(out)
}

/// Go reference-time tokens, longest first so prefixes never shadow them.
const GO_TOKENS: [(&str, &str); 30] = [
    ("January", "%B"),
    ("Monday", "%A"),
    (".000000000", "%.9f"),
    (".999999999", "%.f"),
    (".000000", "%.6f"),
    (".999999", "%.f"),
    ("Z07:00", "%:z"),
    ("-07:00", "%:z"),
    ("Z0700", "%z"),
    ("-0700", "%z"),
    ("2006", "%Y"),
    (".000", "%.3f"),
    (".999", "%.f"),
    ("Jan", "%b"),
    ("Mon", "%a"),
    ("MST", "%Z"),
    ("01", "%m"),
    ("02", "%d"),
    ("_2", "%e"),
    ("15", "%H"),
    ("03", "%I"),
    ("04", "%M"),
    ("05", "%S"),
    ("06", "%y"),
    ("PM", "%p"),
    ("1", "%-m"),
    ("2", "%-d"),
    ("3", "%-I"),
    ("4", "%-M"),
    ("5", "%-S"),
];

/// Translates a Go reference layout (`2006-01-02T15:04:05Z07:00`) into strftime.
pub fn go_to_strftime(layout: &str) -> String {
    let mut out = String::new();
    let mut rest = layout;

    'outer: while !rest.is_empty() {
        for (token, spec) in GO_TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(spec);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            push_literal(&mut out, c);
        }
        rest = chars.as_str();
    }

    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}
