//! The scalar wire-rule table.
//!
//! Every scalar type has exactly one [`ScalarRule`]. The interpreter, the
//! compiled validator and the code generators all read scalar behavior from
//! here, so the accepted wire forms cannot drift between runtime validation
//! and generated clients.
//!
//! | scalar | wire form | typed form |
//! |--------|-----------|------------|
//! | `boolean` | `true`/`false` | [`Value::Bool`] |
//! | `float32`, `float64` | number or numeric string | [`Value::Float`] |
//! | `int8` … `uint32` | integral number or integer string | [`Value::Int`] / [`Value::UInt`] |
//! | `int64`, `uint64` | decimal string or integer | [`Value::Int`] / [`Value::UInt`] |
//! | `string` | string | [`Value::String`] |
//! | `timestamp` | RFC 3339 string | [`Value::Timestamp`] |

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::schema::ScalarType;
use crate::value::Value;

/// How a scalar is represented on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireRepr {
    Boolean,
    /// A JSON number holding a real value.
    Number,
    /// A JSON number holding an integer of at most 32 bits.
    Integer,
    /// A 64-bit integer carried as a decimal JSON string.
    BigIntString,
    String,
    /// An RFC 3339 JSON string.
    Timestamp,
}

/// Why a scalar rule rejected a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleViolation {
    /// The value has the wrong JSON kind entirely.
    WrongType,
    /// A number with a fractional part where an integer was required.
    NotAnInteger,
    /// An integer outside the width of the scalar.
    OutOfRange,
    /// A string that should encode the scalar but does not.
    Malformed,
}

/// The wire rule for one scalar type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarRule {
    pub scalar: ScalarType,
    pub repr: WireRepr,
    /// Inclusive integer bounds, present for the eight integer scalars.
    pub bounds: Option<(i128, i128)>,
}

impl ScalarType {
    /// Every scalar type, in declaration order.
    pub const ALL: [ScalarType; 13] = [
        ScalarType::Boolean,
        ScalarType::Float32,
        ScalarType::Float64,
        ScalarType::Int8,
        ScalarType::Uint8,
        ScalarType::Int16,
        ScalarType::Uint16,
        ScalarType::Int32,
        ScalarType::Uint32,
        ScalarType::Int64,
        ScalarType::Uint64,
        ScalarType::String,
        ScalarType::Timestamp,
    ];

    /// The wire rule for this scalar.
    pub const fn rule(self) -> ScalarRule {
        let (repr, bounds) = match self {
            ScalarType::Boolean => (WireRepr::Boolean, None),
            ScalarType::Float32 | ScalarType::Float64 => (WireRepr::Number, None),
            ScalarType::Int8 => (WireRepr::Integer, Some((i8::MIN as i128, i8::MAX as i128))),
            ScalarType::Uint8 => (WireRepr::Integer, Some((0, u8::MAX as i128))),
            ScalarType::Int16 => (WireRepr::Integer, Some((i16::MIN as i128, i16::MAX as i128))),
            ScalarType::Uint16 => (WireRepr::Integer, Some((0, u16::MAX as i128))),
            ScalarType::Int32 => (WireRepr::Integer, Some((i32::MIN as i128, i32::MAX as i128))),
            ScalarType::Uint32 => (WireRepr::Integer, Some((0, u32::MAX as i128))),
            ScalarType::Int64 => (
                WireRepr::BigIntString,
                Some((i64::MIN as i128, i64::MAX as i128)),
            ),
            ScalarType::Uint64 => (WireRepr::BigIntString, Some((0, u64::MAX as i128))),
            ScalarType::String => (WireRepr::String, None),
            ScalarType::Timestamp => (WireRepr::Timestamp, None),
        };
        ScalarRule {
            scalar: self,
            repr,
            bounds,
        }
    }

    pub fn is_integer(self) -> bool {
        self.rule().bounds.is_some()
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            ScalarType::Int8 | ScalarType::Int16 | ScalarType::Int32 | ScalarType::Int64
        )
    }
}

impl ScalarRule {
    /// Human-readable name used in diagnostics.
    pub fn expected(&self) -> &'static str {
        self.scalar.as_str()
    }

    /// Diagnostic message for a violation of this rule.
    pub fn message(&self, violation: RuleViolation) -> String {
        let name = self.expected();
        match violation {
            RuleViolation::WrongType => format!("Expected {}", name),
            RuleViolation::NotAnInteger => format!("Expected an integer for {}", name),
            RuleViolation::OutOfRange => match self.bounds {
                Some((min, max)) => format!("Value out of range for {} [{}, {}]", name, min, max),
                None => format!("Value out of range for {}", name),
            },
            RuleViolation::Malformed => format!("Invalid {} string", name),
        }
    }

    /// Typed check: does `value` already hold this scalar?
    pub fn accepts(&self, value: &Value) -> bool {
        match self.repr {
            WireRepr::Boolean => matches!(value, Value::Bool(_)),
            WireRepr::Number => match value {
                Value::Float(f) => self.fits_float(*f),
                Value::Int(_) | Value::UInt(_) => true,
                _ => false,
            },
            WireRepr::Integer | WireRepr::BigIntString => value
                .as_i128()
                .map_or(false, |n| self.in_bounds(n)),
            WireRepr::String => matches!(value, Value::String(_)),
            WireRepr::Timestamp => matches!(value, Value::Timestamp(_)),
        }
    }

    /// Read a wire value into its canonical typed form.
    pub fn read(&self, input: &Value) -> Result<Value, RuleViolation> {
        match self.repr {
            WireRepr::Boolean => match input {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                _ => Err(RuleViolation::WrongType),
            },
            WireRepr::Number => match read_float(input)? {
                Value::Float(f) if !self.fits_float(f) => Err(RuleViolation::OutOfRange),
                value => Ok(value),
            },
            WireRepr::Integer => match input {
                Value::Float(f) => self.from_float(*f),
                Value::String(s) => self.from_integer_str(s),
                other => self.from_integer_value(other),
            },
            WireRepr::BigIntString => match input {
                Value::String(s) => self.from_integer_str(s),
                other => self.from_integer_value(other),
            },
            WireRepr::String => match input {
                Value::String(s) => Ok(Value::String(s.clone())),
                _ => Err(RuleViolation::WrongType),
            },
            WireRepr::Timestamp => match input {
                Value::Timestamp(t) => Ok(Value::Timestamp(*t)),
                Value::String(s) => parse_timestamp(s)
                    .map(Value::Timestamp)
                    .ok_or(RuleViolation::Malformed),
                _ => Err(RuleViolation::WrongType),
            },
        }
    }

    /// Best-effort conversion used by `coerce`.
    ///
    /// Accepts everything [`read`](Self::read) accepts plus the unambiguous
    /// cross-kind conversions.
    pub fn coerce(&self, input: &Value) -> Result<Value, RuleViolation> {
        match (self.repr, input) {
            (WireRepr::Boolean, Value::String(s)) => match s.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(RuleViolation::Malformed),
            },
            (WireRepr::Boolean, Value::Int(_) | Value::UInt(_)) => match input.as_i128() {
                Some(0) => Ok(Value::Bool(false)),
                Some(1) => Ok(Value::Bool(true)),
                _ => Err(RuleViolation::WrongType),
            },
            (WireRepr::BigIntString, Value::Float(f)) => self.from_float(*f),
            (WireRepr::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),
            (WireRepr::String, Value::Int(n)) => Ok(Value::String(n.to_string())),
            (WireRepr::String, Value::UInt(n)) => Ok(Value::String(n.to_string())),
            (WireRepr::String, Value::Float(f)) => Ok(Value::String(f.to_string())),
            (WireRepr::String, Value::Timestamp(t)) => Ok(Value::String(format_timestamp(t))),
            _ => self.read(input),
        }
    }

    /// Write the canonical JSON form of a typed value.
    pub fn write(&self, value: &Value, out: &mut String) -> Result<(), RuleViolation> {
        match (self.repr, value) {
            (WireRepr::Boolean, Value::Bool(b)) => {
                out.push_str(if *b { "true" } else { "false" });
                Ok(())
            }
            (WireRepr::Number, Value::Float(f)) => {
                if !self.fits_float(*f) {
                    return Err(RuleViolation::OutOfRange);
                }
                write_float(*f, out);
                Ok(())
            }
            (WireRepr::Number, Value::Int(n)) => {
                let _ = write!(out, "{}", n);
                Ok(())
            }
            (WireRepr::Number, Value::UInt(n)) => {
                let _ = write!(out, "{}", n);
                Ok(())
            }
            (WireRepr::Integer, _) => {
                let n = self.checked_integer(value)?;
                let _ = write!(out, "{}", n);
                Ok(())
            }
            (WireRepr::BigIntString, _) => {
                let n = self.checked_integer(value)?;
                let _ = write!(out, "\"{}\"", n);
                Ok(())
            }
            (WireRepr::String, Value::String(s)) => {
                write_json_string(s, out);
                Ok(())
            }
            (WireRepr::Timestamp, Value::Timestamp(t)) => {
                out.push('"');
                out.push_str(&format_timestamp(t));
                out.push('"');
                Ok(())
            }
            _ => Err(RuleViolation::WrongType),
        }
    }

    /// Why [`accepts`](Self::accepts) turned `value` down.
    pub fn rejection(&self, value: &Value) -> RuleViolation {
        match (self.repr, value) {
            (WireRepr::Number, Value::Float(_)) => RuleViolation::OutOfRange,
            (WireRepr::Integer | WireRepr::BigIntString, _) if value.as_i128().is_some() => {
                RuleViolation::OutOfRange
            }
            _ => RuleViolation::WrongType,
        }
    }

    /// Non-finite values are representable in both widths.
    fn fits_float(&self, f: f64) -> bool {
        self.scalar != ScalarType::Float32 || !f.is_finite() || f.abs() <= f32::MAX as f64
    }

    fn in_bounds(&self, n: i128) -> bool {
        self.bounds.map_or(true, |(min, max)| n >= min && n <= max)
    }

    fn checked_integer(&self, value: &Value) -> Result<i128, RuleViolation> {
        let n = value.as_i128().ok_or(RuleViolation::WrongType)?;
        if self.in_bounds(n) {
            Ok(n)
        } else {
            Err(RuleViolation::OutOfRange)
        }
    }

    fn canonical(&self, n: i128) -> Result<Value, RuleViolation> {
        if !self.in_bounds(n) {
            return Err(RuleViolation::OutOfRange);
        }
        let value = if self.scalar.is_signed() {
            i64::try_from(n).map(Value::Int)
        } else {
            u64::try_from(n).map(Value::UInt)
        };
        value.map_err(|_| RuleViolation::OutOfRange)
    }

    fn from_integer_value(&self, input: &Value) -> Result<Value, RuleViolation> {
        let n = input.as_i128().ok_or(RuleViolation::WrongType)?;
        self.canonical(n)
    }

    fn from_float(&self, f: f64) -> Result<Value, RuleViolation> {
        if !f.is_finite() || f.fract() != 0.0 {
            return Err(RuleViolation::NotAnInteger);
        }
        // Anything beyond 2^64 cannot fit any integer scalar.
        if f.abs() > 1.8446744073709552e19 {
            return Err(RuleViolation::OutOfRange);
        }
        self.canonical(f as i128)
    }

    /// Integer text. Up to 32 bits any numeric form with an integral value
    /// is read (`"1e2"` is 100); 64-bit text must be plain decimal digits so
    /// it never passes through a float.
    fn from_integer_str(&self, s: &str) -> Result<Value, RuleViolation> {
        let digits = s.strip_prefix('-').unwrap_or(s);
        let negative = digits.len() != s.len();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            if self.repr == WireRepr::Integer {
                if let Ok(f) = s.parse::<f64>() {
                    return self.from_float(f);
                }
            }
            return Err(RuleViolation::Malformed);
        }
        if negative && !self.scalar.is_signed() && digits.bytes().any(|b| b != b'0') {
            return Err(RuleViolation::OutOfRange);
        }
        let n = s.parse::<i128>().map_err(|_| RuleViolation::OutOfRange)?;
        self.canonical(n)
    }
}

fn read_float(input: &Value) -> Result<Value, RuleViolation> {
    match input {
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::UInt(n) => Ok(Value::Float(*n as f64)),
        Value::String(s) => s
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| RuleViolation::Malformed),
        _ => Err(RuleViolation::WrongType),
    }
}

/// Parse an RFC 3339 timestamp, falling back to a naive UTC date-time.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Canonical timestamp text: UTC, `Z` suffix, minimal fractional digits.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Write a float as a JSON number, or as a string for non-finite values.
pub fn write_float(f: f64, out: &mut String) {
    if f.is_nan() {
        out.push_str("\"NaN\"");
    } else if f.is_infinite() {
        out.push_str(if f > 0.0 { "\"Infinity\"" } else { "\"-Infinity\"" });
    } else {
        let _ = write!(out, "{}", f);
    }
}

/// Write `s` as a quoted, escaped JSON string.
pub fn write_json_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
