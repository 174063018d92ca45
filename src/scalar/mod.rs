//! Scalar Descriptors
//!
//! A scalar is a leaf type: a JSON base kind plus a list of constraints.
//! Every scalar offers the same four operations:
//!
//! - `validate`: accept or reject a JSON value, returning its canonical form
//! - `parse_external`: like `validate`, but also accepts string-encoded
//!   numbers and booleans coming from untyped transports
//! - `serialize`: canonical output form; left-inverse of `parse_external`
//! - `json_schema`: the JSON-Schema fragment, constant or lazy
//!
//! Failure is binary. A value either satisfies every constraint or the scalar
//! reports the first constraint it breaks.

pub mod builtin;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Number, Value};
use std::fmt;
use std::sync::Arc;

use crate::json_schema::JsonNode;

// =============================================================================
// Scalar Kind
// =============================================================================

/// JSON base kind of a scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Integer,
    Number,
    Boolean,
    /// Any JSON value, including objects and arrays
    Any,
    /// Any JSON object
    Object,
}

impl ScalarKind {
    /// JSON-Schema `type` keyword, if the kind has one
    pub fn json_type(&self) -> Option<&'static str> {
        match self {
            Self::String => Some("string"),
            Self::Integer => Some("integer"),
            Self::Number => Some("number"),
            Self::Boolean => Some("boolean"),
            Self::Object => Some("object"),
            Self::Any => None,
        }
    }

    /// True if `value` is of this base kind. Integral floats count as integers.
    pub fn admits(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => true,
                Value::Number(n) => n.as_f64().map_or(false, is_integral),
                _ => false,
            },
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_type().unwrap_or("any"))
    }
}

/// Short name for the JSON kind of a value (for messages)
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Formats
// =============================================================================

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email pattern compiles")
});

const PHONE_PATTERN: &str = r"^\+[1-9][0-9]{1,14}$";
const LOCALE_PATTERN: &str = r"^[a-z]{2,3}(-[A-Z][a-z]{3})?(-([A-Z]{2}|[0-9]{3}))?$";
const TIME_ZONE_PATTERN: &str = r"^(UTC|GMT|Etc/[A-Za-z0-9+-]+|(Africa|America|Antarctica|Arctic|Asia|Atlantic|Australia|Europe|Indian|Pacific)/[A-Za-z_-]+(/[A-Za-z_-]+)?)$";
const CURRENCY_PATTERN: &str = r"^[A-Z]{3}$";
const COUNTRY_PATTERN: &str = r"^[A-Z]{2}$";

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(PHONE_PATTERN).expect("phone pattern compiles"));
static LOCALE: Lazy<Regex> = Lazy::new(|| Regex::new(LOCALE_PATTERN).expect("locale pattern compiles"));
static TIME_ZONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(TIME_ZONE_PATTERN).expect("time zone pattern compiles"));
static CURRENCY: Lazy<Regex> =
    Lazy::new(|| Regex::new(CURRENCY_PATTERN).expect("currency pattern compiles"));
static COUNTRY: Lazy<Regex> = Lazy::new(|| Regex::new(COUNTRY_PATTERN).expect("country pattern compiles"));

/// Well-known string formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Email,
    Url,
    /// E.164 phone number
    Phone,
    /// `YYYY-MM-DD`
    Date,
    /// RFC 3339 timestamp with offset
    DateTime,
    /// `HH:MM[:SS[.fff]]`
    Time,
    /// BCP 47 language tag (language, optional script, optional region)
    Locale,
    /// IANA time zone name
    TimeZone,
    /// ISO 4217 alphabetic code
    CurrencyCode,
    /// ISO 3166-1 alpha-2 code
    CountryCode,
}

impl Format {
    /// Check `s` and return its canonical form
    pub fn normalize(&self, s: &str) -> Result<String, String> {
        match self {
            Self::Email => check(EMAIL.is_match(s), s, "email address"),
            Self::Url => url::Url::parse(s)
                .map(|_| s.to_string())
                .map_err(|e| format!("'{}' is not a valid URL: {}", s, e)),
            Self::Phone => check(PHONE.is_match(s), s, "E.164 phone number"),
            Self::Date => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|d| d.format("%Y-%m-%d").to_string())
                .map_err(|_| format!("'{}' is not a valid date (expected YYYY-MM-DD)", s)),
            Self::DateTime => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
                .map_err(|_| format!("'{}' is not a valid RFC 3339 date-time", s)),
            Self::Time => NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                .map(|t| t.format("%H:%M:%S%.f").to_string())
                .map_err(|_| format!("'{}' is not a valid time of day (expected HH:MM[:SS])", s)),
            Self::Locale => check(LOCALE.is_match(s), s, "locale tag"),
            Self::TimeZone => check(TIME_ZONE.is_match(s), s, "IANA time zone"),
            Self::CurrencyCode => check(CURRENCY.is_match(s), s, "3-letter uppercase currency code"),
            Self::CountryCode => check(COUNTRY.is_match(s), s, "2-letter uppercase country code"),
        }
    }

    /// JSON-Schema keyword/value describing this format
    pub fn json_keyword(&self) -> (&'static str, &'static str) {
        match self {
            Self::Email => ("format", "email"),
            Self::Url => ("format", "uri"),
            Self::Date => ("format", "date"),
            Self::DateTime => ("format", "date-time"),
            Self::Time => ("format", "time"),
            Self::Phone => ("pattern", PHONE_PATTERN),
            Self::Locale => ("pattern", LOCALE_PATTERN),
            Self::TimeZone => ("pattern", TIME_ZONE_PATTERN),
            Self::CurrencyCode => ("pattern", CURRENCY_PATTERN),
            Self::CountryCode => ("pattern", COUNTRY_PATTERN),
        }
    }
}

fn check(ok: bool, s: &str, what: &str) -> Result<String, String> {
    if ok {
        Ok(s.to_string())
    } else {
        Err(format!("'{}' is not a valid {}", s, what))
    }
}

// =============================================================================
// Constraints
// =============================================================================

type CheckFn = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// A single domain restriction on a scalar
#[derive(Clone)]
pub enum Constraint {
    /// Minimum string length in characters
    MinLength(usize),
    /// String must match the regex
    Pattern(Regex),
    /// Inclusive numeric range
    Range { min: f64, max: f64 },
    /// Well-known string format
    Format(Format),
    /// Arbitrary predicate, invisible to JSON-Schema
    Custom(CheckFn),
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinLength(n) => write!(f, "MinLength({})", n),
            Self::Pattern(re) => write!(f, "Pattern({})", re.as_str()),
            Self::Range { min, max } => write!(f, "Range({}..={})", min, max),
            Self::Format(format) => write!(f, "Format({:?})", format),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl Constraint {
    /// Apply to an already kind-checked value, returning its canonical form
    fn apply(&self, value: Value) -> Result<Value, String> {
        match self {
            Self::MinLength(min) => {
                let len = value.as_str().map(|s| s.chars().count()).unwrap_or(0);
                if len < *min {
                    return Err(format!("must be at least {} character(s) long", min));
                }
                Ok(value)
            }
            Self::Pattern(re) => match value.as_str() {
                Some(s) if re.is_match(s) => Ok(value),
                Some(s) => Err(format!("'{}' does not match pattern {}", s, re.as_str())),
                None => Err("pattern applies to strings only".to_string()),
            },
            Self::Range { min, max } => match value.as_f64() {
                Some(n) if n >= *min && n <= *max => Ok(value),
                Some(n) => Err(format!("{} is outside the range [{}, {}]", n, min, max)),
                None => Err("range applies to numbers only".to_string()),
            },
            Self::Format(format) => match value.as_str() {
                Some(s) => format.normalize(s).map(Value::String),
                None => Err("format applies to strings only".to_string()),
            },
            Self::Custom(check) => check(&value).map(|_| value),
        }
    }

    /// Contribute JSON-Schema keywords
    fn write_json(&self, out: &mut Map<String, Value>) {
        match self {
            Self::MinLength(n) => {
                out.insert("minLength".to_string(), json!(n));
            }
            Self::Pattern(re) => {
                out.insert("pattern".to_string(), json!(re.as_str()));
            }
            Self::Range { min, max } => {
                out.insert("minimum".to_string(), number(*min));
                out.insert("maximum".to_string(), number(*max));
            }
            Self::Format(format) => {
                let (key, value) = format.json_keyword();
                out.insert(key.to_string(), json!(value));
            }
            Self::Custom(_) => {}
        }
    }
}

/// Integral bounds render as integers (`-90`, not `-90.0`)
fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        json!(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

// =============================================================================
// ScalarDescriptor
// =============================================================================

/// A named leaf type. Identity is the name; immutable once built.
#[derive(Debug, Clone)]
pub struct ScalarDescriptor {
    name: String,
    description: Option<String>,
    kind: ScalarKind,
    constraints: Vec<Constraint>,
    json_schema: Option<JsonNode>,
}

impl ScalarDescriptor {
    /// Start declaring a scalar
    pub fn builder(name: impl Into<String>, kind: ScalarKind) -> ScalarBuilder {
        ScalarBuilder {
            inner: ScalarDescriptor {
                name: name.into(),
                description: None,
                kind,
                constraints: Vec::new(),
                json_schema: None,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Accept a JSON value and return its canonical form
    pub fn validate(&self, value: &Value) -> Result<Value, String> {
        let mut current = self.check_kind(value)?;
        for constraint in &self.constraints {
            current = constraint.apply(current)?;
        }
        Ok(current)
    }

    /// Like `validate`, but string-encoded numbers and booleans are coerced first
    pub fn parse_external(&self, value: &Value) -> Result<Value, String> {
        let coerced = match (self.kind, value) {
            (ScalarKind::Integer, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("'{}' is not an integer", s))?,
            (ScalarKind::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("'{}' is not a number", s))?,
            (ScalarKind::Boolean, Value::String(s)) => match s.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => return Err(format!("'{}' is not a boolean", s)),
            },
            _ => value.clone(),
        };
        self.validate(&coerced)
    }

    /// Canonical output form of a value produced by `parse_external`
    pub fn serialize(&self, value: &Value) -> Value {
        // Canonicalization is idempotent; values this scalar never accepted pass through
        self.validate(value).unwrap_or_else(|_| value.clone())
    }

    /// One-line human description
    pub fn describe(&self) -> String {
        match &self.description {
            Some(description) => format!("{} ({}): {}", self.name, self.kind, description),
            None => format!("{} ({})", self.name, self.kind),
        }
    }

    /// JSON-Schema fragment, explicit or derived from the constraints
    pub fn json_schema(&self) -> JsonNode {
        if let Some(node) = &self.json_schema {
            return node.clone();
        }
        let mut out = Map::new();
        if let Some(json_type) = self.kind.json_type() {
            out.insert("type".to_string(), json!(json_type));
        }
        for constraint in &self.constraints {
            constraint.write_json(&mut out);
        }
        JsonNode::Value(Value::Object(out))
    }

    fn check_kind(&self, value: &Value) -> Result<Value, String> {
        if !self.kind.admits(value) {
            return Err(format!("expected {}, found {}", self.kind, value_kind(value)));
        }
        match (self.kind, value) {
            (ScalarKind::Integer, Value::Number(n)) if !(n.is_i64() || n.is_u64()) => {
                Ok(n.as_f64().map(|f| Value::from(f as i64)).unwrap_or_else(|| value.clone()))
            }
            _ => Ok(value.clone()),
        }
    }
}

/// Builder for custom scalars
#[derive(Debug)]
pub struct ScalarBuilder {
    inner: ScalarDescriptor,
}

impl ScalarBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.inner.description = Some(description.into());
        self
    }

    pub fn min_length(self, min: usize) -> Self {
        self.constraint(Constraint::MinLength(min))
    }

    pub fn pattern(self, re: Regex) -> Self {
        self.constraint(Constraint::Pattern(re))
    }

    pub fn range(self, min: f64, max: f64) -> Self {
        self.constraint(Constraint::Range { min, max })
    }

    pub fn format(self, format: Format) -> Self {
        self.constraint(Constraint::Format(format))
    }

    /// Arbitrary predicate; not reflected in the derived JSON-Schema
    pub fn check(self, check: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static) -> Self {
        self.constraint(Constraint::Custom(Arc::new(check)))
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.inner.constraints.push(constraint);
        self
    }

    /// Override the derived fragment (constant or lazy)
    pub fn json_schema(mut self, node: impl Into<JsonNode>) -> Self {
        self.inner.json_schema = Some(node.into());
        self
    }

    pub fn build(self) -> ScalarDescriptor {
        self.inner
    }
}
