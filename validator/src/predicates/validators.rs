//! Built-in validators
//!
//! Every validator receives the coerced string form of the field value and
//! the call arguments. Option objects follow the conventional shapes, e.g.
//! `isInt({"min": 0, "max": 120})` or `isLength({"min": 1})`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::{arg_string, number_of, option_number};

lazy_static! {
    /// Local part and dotted domain with a 2+ letter TLD
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*\.[a-zA-Z]{2,}$"
    ).unwrap();

    /// Optional scheme, host (name, localhost or IPv4), optional port and path
    static ref URL_REGEX: Regex = Regex::new(
        r"^(?:(?:https?|ftp)://)?(?:[^\s:@/]+(?::[^\s:@/]*)?@)?(?:localhost|(?:[a-zA-Z0-9-]+\.)+[a-zA-Z]{2,}|\d{1,3}(?:\.\d{1,3}){3})(?::\d{1,5})?(?:[/?#]\S*)?$"
    ).unwrap();

    static ref INT_REGEX: Regex = Regex::new(r"^[-+]?(?:0|[1-9][0-9]*)$").unwrap();

    static ref INT_LEADING_ZEROES_REGEX: Regex = Regex::new(r"^[-+]?[0-9]+$").unwrap();

    static ref FLOAT_REGEX: Regex = Regex::new(
        r"^[-+]?(?:[0-9]+)?(?:\.[0-9]*)?(?:[eE][-+]?[0-9]+)?$"
    ).unwrap();

    static ref NUMERIC_REGEX: Regex = Regex::new(r"^[-+]?(?:[0-9]*\.)?[0-9]+$").unwrap();

    static ref UUID_REGEX: Regex = Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-([0-9a-fA-F])[0-9a-fA-F]{3}-([0-9a-fA-F])[0-9a-fA-F]{3}-[0-9a-fA-F]{12}$"
    ).unwrap();
}

/// The static validator table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidatorKind {
    IsEmail,
    IsInt,
    IsFloat,
    IsLength,
    IsNumeric,
    IsAlpha,
    IsAlphanumeric,
    IsUrl,
    IsUuid,
    IsBoolean,
    IsJson,
    IsIn,
    IsEmpty,
    IsLowercase,
    IsUppercase,
    IsBefore,
    IsAfter,
    Contains,
    Equals,
    Matches,
}

impl ValidatorKind {
    pub const ALL: [ValidatorKind; 20] = [
        ValidatorKind::IsEmail,
        ValidatorKind::IsInt,
        ValidatorKind::IsFloat,
        ValidatorKind::IsLength,
        ValidatorKind::IsNumeric,
        ValidatorKind::IsAlpha,
        ValidatorKind::IsAlphanumeric,
        ValidatorKind::IsUrl,
        ValidatorKind::IsUuid,
        ValidatorKind::IsBoolean,
        ValidatorKind::IsJson,
        ValidatorKind::IsIn,
        ValidatorKind::IsEmpty,
        ValidatorKind::IsLowercase,
        ValidatorKind::IsUppercase,
        ValidatorKind::IsBefore,
        ValidatorKind::IsAfter,
        ValidatorKind::Contains,
        ValidatorKind::Equals,
        ValidatorKind::Matches,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ValidatorKind::IsEmail => "isEmail",
            ValidatorKind::IsInt => "isInt",
            ValidatorKind::IsFloat => "isFloat",
            ValidatorKind::IsLength => "isLength",
            ValidatorKind::IsNumeric => "isNumeric",
            ValidatorKind::IsAlpha => "isAlpha",
            ValidatorKind::IsAlphanumeric => "isAlphanumeric",
            ValidatorKind::IsUrl => "isURL",
            ValidatorKind::IsUuid => "isUUID",
            ValidatorKind::IsBoolean => "isBoolean",
            ValidatorKind::IsJson => "isJSON",
            ValidatorKind::IsIn => "isIn",
            ValidatorKind::IsEmpty => "isEmpty",
            ValidatorKind::IsLowercase => "isLowercase",
            ValidatorKind::IsUppercase => "isUppercase",
            ValidatorKind::IsBefore => "isBefore",
            ValidatorKind::IsAfter => "isAfter",
            ValidatorKind::Contains => "contains",
            ValidatorKind::Equals => "equals",
            ValidatorKind::Matches => "matches",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn check(&self, value: &str, args: &[Value]) -> bool {
        match self {
            ValidatorKind::IsEmail => EMAIL_REGEX.is_match(value),
            ValidatorKind::IsInt => is_int(value, args),
            ValidatorKind::IsFloat => is_float(value, args),
            ValidatorKind::IsLength => is_length(value, args),
            ValidatorKind::IsNumeric => NUMERIC_REGEX.is_match(value),
            ValidatorKind::IsAlpha => {
                !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic())
            }
            ValidatorKind::IsAlphanumeric => {
                !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric())
            }
            ValidatorKind::IsUrl => value.len() < 2084 && URL_REGEX.is_match(value),
            ValidatorKind::IsUuid => is_uuid(value, arg_string(args, 0).as_deref()),
            ValidatorKind::IsBoolean => matches!(value, "true" | "false" | "1" | "0"),
            ValidatorKind::IsJson => serde_json::from_str::<Value>(value)
                .map(|parsed| parsed.is_object() || parsed.is_array())
                .unwrap_or(false),
            ValidatorKind::IsIn => is_in(value, args.first()),
            ValidatorKind::IsEmpty => value.is_empty(),
            ValidatorKind::IsLowercase => value == value.to_lowercase(),
            ValidatorKind::IsUppercase => value == value.to_uppercase(),
            ValidatorKind::IsBefore => compare_dates(value, args).map_or(false, |(v, c)| v < c),
            ValidatorKind::IsAfter => compare_dates(value, args).map_or(false, |(v, c)| v > c),
            ValidatorKind::Contains => value.contains(&arg_string(args, 0).unwrap_or_default()),
            ValidatorKind::Equals => value == arg_string(args, 0).unwrap_or_default(),
            ValidatorKind::Matches => matches_pattern(value, args),
        }
    }
}

fn is_int(value: &str, args: &[Value]) -> bool {
    let allow_leading_zeroes = args
        .first()
        .and_then(|options| options.get("allow_leading_zeroes"))
        .and_then(Value::as_bool)
        .unwrap_or(true);

    let regex = if allow_leading_zeroes {
        &*INT_LEADING_ZEROES_REGEX
    } else {
        &*INT_REGEX
    };
    if !regex.is_match(value) {
        return false;
    }

    value
        .parse::<f64>()
        .map(|number| within_bounds(number, args))
        .unwrap_or(false)
}

fn is_float(value: &str, args: &[Value]) -> bool {
    if matches!(value, "" | "." | "-" | "+") || !FLOAT_REGEX.is_match(value) {
        return false;
    }

    value
        .parse::<f64>()
        .map(|number| within_bounds(number, args))
        .unwrap_or(false)
}

fn within_bounds(number: f64, args: &[Value]) -> bool {
    option_number(args, "min").map_or(true, |min| number >= min)
        && option_number(args, "max").map_or(true, |max| number <= max)
        && option_number(args, "gt").map_or(true, |gt| number > gt)
        && option_number(args, "lt").map_or(true, |lt| number < lt)
}

/// Accepts `{"min", "max"}` or positional `min, max`
fn is_length(value: &str, args: &[Value]) -> bool {
    let (min, max) = match args.first() {
        Some(Value::Object(_)) => (option_number(args, "min"), option_number(args, "max")),
        Some(first) => (number_of(first), args.get(1).and_then(number_of)),
        None => (None, None),
    };

    let len = value.chars().count() as f64;
    len >= min.unwrap_or(0.0) && max.map_or(true, |max| len <= max)
}

fn is_uuid(value: &str, version: Option<&str>) -> bool {
    let Some(captures) = UUID_REGEX.captures(value) else {
        return false;
    };

    let version_digit = captures.get(1).map(|m| m.as_str());
    let variant_digit = captures.get(2).map(|m| m.as_str().to_ascii_lowercase());
    let rfc_variant = matches!(variant_digit.as_deref(), Some("8" | "9" | "a" | "b"));

    match version {
        None | Some("all") => true,
        Some(v @ ("3" | "4" | "5")) => version_digit == Some(v) && (v == "3" || rfc_variant),
        Some(_) => false,
    }
}

fn is_in(value: &str, options: Option<&Value>) -> bool {
    match options {
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| crate::coerce::legacy_string(Some(item)) == value),
        Some(Value::Object(map)) => map.contains_key(value),
        Some(Value::String(haystack)) => haystack.contains(value),
        _ => false,
    }
}

/// Parse the value and the comparison date (first argument, default now)
fn compare_dates(value: &str, args: &[Value]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let original = parse_date(value)?;
    let comparison = match arg_string(args, 0) {
        Some(date) => parse_date(&date)?,
        None => Utc::now(),
    };
    Some((original, comparison))
}

fn matches_pattern(value: &str, args: &[Value]) -> bool {
    let Some(pattern) = arg_string(args, 0) else {
        return false;
    };
    let flags: String = arg_string(args, 1)
        .unwrap_or_default()
        .chars()
        .filter(|c| matches!(c, 'i' | 'm' | 's' | 'x'))
        .collect();

    let source = if flags.is_empty() {
        pattern
    } else {
        format!("(?{}){}", flags, pattern)
    };

    match Regex::new(&source) {
        Ok(regex) => regex.is_match(value),
        Err(err) => {
            tracing::warn!(pattern = %source, error = %err, "Ignoring invalid `matches` pattern");
            false
        }
    }
}

/// Lenient date parsing shared with the `toDate` sanitizer
pub(crate) fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}
