//! Built-in sanitizers
//!
//! Sanitizers receive the coerced string form of the field value and return
//! the replacement value. Conversions (`toInt`, `toFloat`, `toDate`) return
//! JSON `null` when the input cannot be converted.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Number, Value};

use super::arg_string;
use super::validators::{parse_date, ValidatorKind};

lazy_static! {
    /// Control characters, including newlines
    static ref LOW_CHARS: Regex = Regex::new(r"[\x00-\x1F\x7F]").unwrap();

    /// Control characters except `\n` and `\r`
    static ref LOW_CHARS_KEEP_NEW_LINES: Regex =
        Regex::new(r"[\x00-\x09\x0B\x0C\x0E-\x1F\x7F]").unwrap();

    /// Leading numeric prefix accepted by `toFloat`
    static ref FLOAT_PREFIX: Regex =
        Regex::new(r"^[-+]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][-+]?[0-9]+)?").unwrap();
}

/// The static sanitizer table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SanitizerKind {
    ToString,
    ToBoolean,
    ToInt,
    ToFloat,
    ToDate,
    Trim,
    Ltrim,
    Rtrim,
    Escape,
    Unescape,
    StripLow,
    Whitelist,
    Blacklist,
    NormalizeEmail,
}

impl SanitizerKind {
    pub const ALL: [SanitizerKind; 14] = [
        SanitizerKind::ToString,
        SanitizerKind::ToBoolean,
        SanitizerKind::ToInt,
        SanitizerKind::ToFloat,
        SanitizerKind::ToDate,
        SanitizerKind::Trim,
        SanitizerKind::Ltrim,
        SanitizerKind::Rtrim,
        SanitizerKind::Escape,
        SanitizerKind::Unescape,
        SanitizerKind::StripLow,
        SanitizerKind::Whitelist,
        SanitizerKind::Blacklist,
        SanitizerKind::NormalizeEmail,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SanitizerKind::ToString => "toString",
            SanitizerKind::ToBoolean => "toBoolean",
            SanitizerKind::ToInt => "toInt",
            SanitizerKind::ToFloat => "toFloat",
            SanitizerKind::ToDate => "toDate",
            SanitizerKind::Trim => "trim",
            SanitizerKind::Ltrim => "ltrim",
            SanitizerKind::Rtrim => "rtrim",
            SanitizerKind::Escape => "escape",
            SanitizerKind::Unescape => "unescape",
            SanitizerKind::StripLow => "stripLow",
            SanitizerKind::Whitelist => "whitelist",
            SanitizerKind::Blacklist => "blacklist",
            SanitizerKind::NormalizeEmail => "normalizeEmail",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn apply(&self, value: &str, args: &[Value]) -> Value {
        match self {
            SanitizerKind::ToString => Value::String(value.to_string()),
            SanitizerKind::ToBoolean => Value::Bool(to_boolean(value, args)),
            SanitizerKind::ToInt => to_int(value, args),
            SanitizerKind::ToFloat => to_float(value),
            SanitizerKind::ToDate => parse_date(value)
                .map(|date| Value::String(date.to_rfc3339()))
                .unwrap_or(Value::Null),
            SanitizerKind::Trim => Value::String(trim(value, args, true, true)),
            SanitizerKind::Ltrim => Value::String(trim(value, args, true, false)),
            SanitizerKind::Rtrim => Value::String(trim(value, args, false, true)),
            SanitizerKind::Escape => Value::String(escape(value)),
            SanitizerKind::Unescape => Value::String(unescape(value)),
            SanitizerKind::StripLow => Value::String(strip_low(value, args)),
            SanitizerKind::Whitelist => {
                let chars = arg_string(args, 0).unwrap_or_default();
                Value::String(value.chars().filter(|c| chars.contains(*c)).collect())
            }
            SanitizerKind::Blacklist => {
                let chars = arg_string(args, 0).unwrap_or_default();
                Value::String(value.chars().filter(|c| !chars.contains(*c)).collect())
            }
            SanitizerKind::NormalizeEmail => normalize_email(value),
        }
    }
}

/// Strict mode only accepts `1` and `true`
fn to_boolean(value: &str, args: &[Value]) -> bool {
    let strict = args.first().and_then(Value::as_bool).unwrap_or(false);
    if strict {
        matches!(value, "1" | "true")
    } else {
        !matches!(value, "0" | "false" | "")
    }
}

/// Parse the longest integer prefix in the given radix (default 10)
fn to_int(value: &str, args: &[Value]) -> Value {
    let radix = args
        .first()
        .and_then(Value::as_u64)
        .filter(|radix| (2..=36).contains(radix))
        .unwrap_or(10) as u32;

    let trimmed = value.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let rest = if radix == 16 {
        rest.strip_prefix("0x")
            .or_else(|| rest.strip_prefix("0X"))
            .unwrap_or(rest)
    } else {
        rest
    };

    let digits: String = rest.chars().take_while(|c| c.is_digit(radix)).collect();
    match i64::from_str_radix(&digits, radix) {
        Ok(number) if negative => Value::from(-number),
        Ok(number) => Value::from(number),
        Err(_) => Value::Null,
    }
}

fn to_float(value: &str) -> Value {
    FLOAT_PREFIX
        .find(value.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Trim whitespace, or the characters in the first argument when given
fn trim(value: &str, args: &[Value], left: bool, right: bool) -> String {
    let chars = arg_string(args, 0);
    let strip = |c: char| match &chars {
        Some(set) => set.contains(c),
        None => c.is_whitespace(),
    };

    let mut out = value;
    if left {
        out = out.trim_start_matches(strip);
    }
    if right {
        out = out.trim_end_matches(strip);
    }
    out.to_string()
}

/// Escape characters that are unsafe in HTML and attribute contexts
fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('/', "&#x2F;")
        .replace('\\', "&#x5C;")
        .replace('`', "&#96;")
}

fn unescape(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#x2F;", "/")
        .replace("&#x5C;", "\\")
        .replace("&#96;", "`")
        .replace("&amp;", "&")
}

fn strip_low(value: &str, args: &[Value]) -> String {
    let keep_new_lines = args.first().and_then(Value::as_bool).unwrap_or(false);
    let pattern = if keep_new_lines {
        &*LOW_CHARS_KEEP_NEW_LINES
    } else {
        &*LOW_CHARS
    };
    pattern.replace_all(value, "").to_string()
}

/// Lower-case the address; for Gmail also drop dots and `+tag` suffixes.
/// Returns `false` for values that are not email addresses.
fn normalize_email(value: &str) -> Value {
    if !ValidatorKind::IsEmail.check(value, &[]) {
        return Value::Bool(false);
    }
    let Some((local, domain)) = value.rsplit_once('@') else {
        return Value::Bool(false);
    };

    let domain = domain.to_lowercase();
    let mut local = local.to_lowercase();

    if domain == "gmail.com" || domain == "googlemail.com" {
        if let Some((head, _tag)) = local.split_once('+') {
            local = head.to_string();
        }
        local = local.replace('.', "");
        return Value::String(format!("{}@gmail.com", local));
    }

    Value::String(format!("{}@{}", local, domain))
}
