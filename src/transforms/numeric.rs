//! Numeric operations. Booleans are not numbers here.

use serde_json::{Number, Value};

use super::{param_i64, param_str, to_display_string};
use crate::transform_registry::{Params, TransformError};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    Int(i128),
    Float(f64),
}

impl Num {
    fn from_value(transform: &str, input: &Value) -> Result<Self, TransformError> {
        let n = match input {
            Value::Number(n) => n,
            other => return Err(TransformError::mismatch(transform, "number", other)),
        };
        if let Some(i) = n.as_i64() {
            Ok(Num::Int(i128::from(i)))
        } else if let Some(u) = n.as_u64() {
            Ok(Num::Int(i128::from(u)))
        } else {
            n.as_f64()
                .map(Num::Float)
                .ok_or_else(|| TransformError::mismatch(transform, "number", input))
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }

    fn is_negative(self) -> bool {
        match self {
            Num::Int(i) => i < 0,
            Num::Float(f) => f < 0.0,
        }
    }
}

fn float_value(f: f64) -> Result<Value, TransformError> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| TransformError::ExecutionError(format!("result {} is not a finite number", f)))
}

pub(super) fn abs(input: &Value, _params: &Params) -> Result<Value, TransformError> {
    match Num::from_value("abs", input)? {
        Num::Int(i) => {
            let magnitude = i.unsigned_abs();
            u64::try_from(magnitude)
                .map(Value::from)
                .map_err(|_| TransformError::ExecutionError(format!("abs({}) overflows", i)))
        }
        Num::Float(f) => float_value(f.abs()),
    }
}

/// Round half away from zero to `digits` decimal places. Negative `digits`
/// round to tens, hundreds and so on. Integers are left alone unless
/// `digits` is negative.
pub(super) fn round(input: &Value, params: &Params) -> Result<Value, TransformError> {
    let digits = round_digits(params)?;
    let n = Num::from_value("round", input)?;

    if matches!(n, Num::Int(_)) && digits >= 0 {
        return Ok(input.clone());
    }

    let x = n.as_f64();
    let rounded = if digits >= 0 {
        let factor = 10f64.powi(digits);
        (x * factor).round() / factor
    } else {
        let factor = 10f64.powi(-digits);
        (x / factor).round() * factor
    };
    float_value(rounded)
}

fn round_digits(params: &Params) -> Result<i32, TransformError> {
    let digits = param_i64(params, "digits", 0)?;
    i32::try_from(digits)
        .ok()
        .filter(|d| d.abs() <= 308)
        .ok_or_else(|| TransformError::InvalidArgs(format!("'digits' out of range: {}", digits)))
}

pub(super) fn check_round(params: &Params) -> Result<(), TransformError> {
    round_digits(params).map(|_| ())
}

/// Format a number with a `format_spec` of the form
/// `[[fill]align][sign][0][width][,][.precision][type]`.
pub(super) fn format(input: &Value, params: &Params) -> Result<Value, TransformError> {
    let spec = FormatSpec::parse(param_str(params, "format_spec", "")?)?;
    let n = Num::from_value("format", input)?;
    Ok(Value::String(spec.apply(n)?))
}

pub(super) fn check_format(params: &Params) -> Result<(), TransformError> {
    FormatSpec::parse(param_str(params, "format_spec", "")?).map(|_| ())
}

#[derive(Debug, Clone, PartialEq)]
struct FormatSpec {
    fill: char,
    align: Option<char>,
    sign: char,
    zero: bool,
    width: usize,
    grouping: bool,
    precision: Option<usize>,
    kind: Option<char>,
}

const ALIGNS: &str = "<>^=";
const KINDS: &str = "dfFeE%xXobs";
const MAX_FIELD_SIZE: usize = 1000;

impl FormatSpec {
    fn parse(spec: &str) -> Result<Self, TransformError> {
        let bad = |reason: &str| {
            TransformError::InvalidArgs(format!("invalid format_spec '{}': {}", spec, reason))
        };
        let chars: Vec<char> = spec.chars().collect();
        let mut parsed = FormatSpec {
            fill: ' ',
            align: None,
            sign: '-',
            zero: false,
            width: 0,
            grouping: false,
            precision: None,
            kind: None,
        };
        let mut i = 0;

        if chars.len() >= 2 && ALIGNS.contains(chars[1]) {
            parsed.fill = chars[0];
            parsed.align = Some(chars[1]);
            i = 2;
        } else if chars.first().is_some_and(|c| ALIGNS.contains(*c)) {
            parsed.align = Some(chars[0]);
            i = 1;
        }

        if let Some(&c) = chars.get(i).filter(|c| "+- ".contains(**c)) {
            parsed.sign = c;
            i += 1;
        }

        if chars.get(i) == Some(&'0') {
            parsed.zero = true;
            i += 1;
        }

        let (width, next) = take_digits(&chars, i);
        parsed.width = bounded(&width, "width").map_err(|r| bad(&r))?.unwrap_or(0);
        i = next;

        if chars.get(i) == Some(&',') {
            parsed.grouping = true;
            i += 1;
        }

        if chars.get(i) == Some(&'.') {
            let (precision, next) = take_digits(&chars, i + 1);
            let precision = bounded(&precision, "precision").map_err(|r| bad(&r))?;
            parsed.precision = Some(precision.ok_or_else(|| bad("missing precision after '.'"))?);
            i = next;
        }

        if let Some(&c) = chars.get(i) {
            if !KINDS.contains(c) {
                return Err(bad(&format!("unknown format type '{}'", c)));
            }
            parsed.kind = Some(c);
            i += 1;
        }

        if i != chars.len() {
            return Err(bad("unexpected trailing characters"));
        }
        if parsed.grouping && matches!(parsed.kind, Some('x' | 'X' | 'o' | 'b' | 's')) {
            return Err(bad("',' is only allowed with decimal types"));
        }
        Ok(parsed)
    }

    fn apply(&self, n: Num) -> Result<String, TransformError> {
        let mut body = self.body(n)?;
        if self.grouping {
            body = group_thousands(&body);
        }

        let sign = match (n.is_negative(), self.sign) {
            (true, _) => "-",
            (false, '+') => "+",
            (false, ' ') => " ",
            _ => "",
        };

        let (fill, align) = match (self.align, self.zero) {
            (None, true) => ('0', '='),
            (None, false) => (self.fill, '>'),
            (Some(a), _) => (self.fill, a),
        };

        let len = sign.chars().count() + body.chars().count();
        let pad = self.width.saturating_sub(len);
        let padding = |count: usize| fill.to_string().repeat(count);

        Ok(match align {
            '<' => format!("{}{}{}", sign, body, padding(pad)),
            '^' => format!("{}{}{}{}", padding(pad / 2), sign, body, padding(pad - pad / 2)),
            '=' => format!("{}{}{}", sign, padding(pad), body),
            _ => format!("{}{}{}", padding(pad), sign, body),
        })
    }

    /// The unsigned digits of `n`.
    fn body(&self, n: Num) -> Result<String, TransformError> {
        let int_only = |kind: char| {
            TransformError::ExecutionError(format!("format type '{}' requires an integer", kind))
        };
        let precision = self.precision.unwrap_or(6);

        Ok(match (self.kind, n) {
            (None | Some('d'), Num::Int(i)) => i.unsigned_abs().to_string(),
            (Some('x'), Num::Int(i)) => format!("{:x}", i.unsigned_abs()),
            (Some('X'), Num::Int(i)) => format!("{:X}", i.unsigned_abs()),
            (Some('o'), Num::Int(i)) => format!("{:o}", i.unsigned_abs()),
            (Some('b'), Num::Int(i)) => format!("{:b}", i.unsigned_abs()),
            (Some(kind @ ('d' | 'x' | 'X' | 'o' | 'b')), Num::Float(_)) => return Err(int_only(kind)),
            (Some('f' | 'F'), n) => format!("{:.*}", precision, n.as_f64().abs()),
            (Some('%'), n) => format!("{:.*}%", precision, n.as_f64().abs() * 100.0),
            (Some(kind @ ('e' | 'E')), n) => {
                let formatted = exponent(n.as_f64().abs(), precision);
                if kind == 'E' {
                    formatted.to_uppercase()
                } else {
                    formatted
                }
            }
            (None, Num::Float(f)) => match self.precision {
                Some(p) => format!("{:.*}", p, f.abs()),
                None => to_display_string(&float_value(f.abs())?),
            },
            (Some(_), Num::Int(i)) => i.unsigned_abs().to_string(),
            (Some(_), Num::Float(f)) => to_display_string(&float_value(f.abs())?),
        })
    }
}

/// The run of ASCII digits starting at `start`, and the index after it.
fn take_digits(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while chars.get(end).is_some_and(char::is_ascii_digit) {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

/// Width and precision are capped at [`MAX_FIELD_SIZE`]; `None` when absent.
fn bounded(digits: &str, what: &str) -> Result<Option<usize>, String> {
    if digits.is_empty() {
        return Ok(None);
    }
    digits
        .parse::<usize>()
        .ok()
        .filter(|n| *n <= MAX_FIELD_SIZE)
        .map(Some)
        .ok_or_else(|| format!("{} {} is larger than {}", what, digits, MAX_FIELD_SIZE))
}

/// `1.5e3` style with a signed, at least two digit exponent: `1.500000e+03`.
fn exponent(f: f64, precision: usize) -> String {
    let formatted = format!("{:.*e}", precision, f);
    match formatted.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => formatted,
    }
}

/// Insert `,` every three digits of the leading digit run.
fn group_thousands(body: &str) -> String {
    let split = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    let (digits, rest) = body.split_at(split);

    let mut grouped = String::with_capacity(body.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped.push_str(rest);
    grouped
}
