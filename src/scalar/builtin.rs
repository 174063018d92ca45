//! Built-in Scalars
//!
//! Factories for the scalars every contract can use. Prefer the
//! `ScalarCache` accessors (`cache.email()`, ...) over calling these
//! directly: type-schema stitching requires one instance per name.

use super::{Format, ScalarDescriptor, ScalarKind};

pub const STRING: &str = "String";
pub const INT: &str = "Int";
pub const FLOAT: &str = "Float";
pub const BOOLEAN: &str = "Boolean";
pub const ID: &str = "ID";
pub const NON_EMPTY_STRING: &str = "NonEmptyString";
pub const EMAIL: &str = "EmailAddress";
pub const URL: &str = "URL";
pub const PHONE: &str = "PhoneNumber";
pub const DATE: &str = "Date";
pub const DATE_TIME: &str = "DateTime";
pub const TIME: &str = "Time";
pub const LOCALE: &str = "Locale";
pub const TIME_ZONE: &str = "TimeZone";
pub const LATITUDE: &str = "Latitude";
pub const LONGITUDE: &str = "Longitude";
pub const CURRENCY: &str = "Currency";
pub const COUNTRY_CODE: &str = "CountryCode";
pub const JSON: &str = "JSON";
pub const JSON_OBJECT: &str = "JSONObject";

/// Scalars the type-schema layer knows natively (never redeclared in SDL)
pub const NATIVE: [&str; 5] = [STRING, INT, FLOAT, BOOLEAN, ID];

pub fn string() -> ScalarDescriptor {
    ScalarDescriptor::builder(STRING, ScalarKind::String).build()
}

pub fn int() -> ScalarDescriptor {
    ScalarDescriptor::builder(INT, ScalarKind::Integer).build()
}

pub fn float() -> ScalarDescriptor {
    ScalarDescriptor::builder(FLOAT, ScalarKind::Number).build()
}

pub fn boolean() -> ScalarDescriptor {
    ScalarDescriptor::builder(BOOLEAN, ScalarKind::Boolean).build()
}

pub fn id() -> ScalarDescriptor {
    ScalarDescriptor::builder(ID, ScalarKind::String)
        .description("Opaque identifier")
        .build()
}

pub fn non_empty_string() -> ScalarDescriptor {
    ScalarDescriptor::builder(NON_EMPTY_STRING, ScalarKind::String)
        .description("A string with at least one character")
        .min_length(1)
        .build()
}

pub fn email() -> ScalarDescriptor {
    formatted(EMAIL, "An email address", Format::Email)
}

pub fn url() -> ScalarDescriptor {
    formatted(URL, "An absolute URL", Format::Url)
}

pub fn phone() -> ScalarDescriptor {
    formatted(PHONE, "An E.164 phone number", Format::Phone)
}

pub fn date() -> ScalarDescriptor {
    formatted(DATE, "A calendar date (YYYY-MM-DD)", Format::Date)
}

pub fn date_time() -> ScalarDescriptor {
    formatted(DATE_TIME, "An RFC 3339 timestamp", Format::DateTime)
}

pub fn time() -> ScalarDescriptor {
    formatted(TIME, "A time of day (HH:MM[:SS])", Format::Time)
}

pub fn locale() -> ScalarDescriptor {
    formatted(LOCALE, "A BCP 47 locale tag", Format::Locale)
}

pub fn time_zone() -> ScalarDescriptor {
    formatted(TIME_ZONE, "An IANA time zone name", Format::TimeZone)
}

pub fn latitude() -> ScalarDescriptor {
    ScalarDescriptor::builder(LATITUDE, ScalarKind::Number)
        .description("Latitude in degrees")
        .range(-90.0, 90.0)
        .build()
}

pub fn longitude() -> ScalarDescriptor {
    ScalarDescriptor::builder(LONGITUDE, ScalarKind::Number)
        .description("Longitude in degrees")
        .range(-180.0, 180.0)
        .build()
}

pub fn currency() -> ScalarDescriptor {
    formatted(CURRENCY, "An ISO 4217 currency code", Format::CurrencyCode)
}

pub fn country_code() -> ScalarDescriptor {
    formatted(COUNTRY_CODE, "An ISO 3166-1 alpha-2 country code", Format::CountryCode)
}

pub fn json() -> ScalarDescriptor {
    ScalarDescriptor::builder(JSON, ScalarKind::Any)
        .description("Any JSON value")
        .build()
}

pub fn json_object() -> ScalarDescriptor {
    ScalarDescriptor::builder(JSON_OBJECT, ScalarKind::Object)
        .description("Any JSON object")
        .build()
}

fn formatted(name: &str, description: &str, format: Format) -> ScalarDescriptor {
    ScalarDescriptor::builder(name, ScalarKind::String)
        .description(description)
        .format(format)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_accepts() {
        let test_cases: Vec<(ScalarDescriptor, Value)> = vec![
            (non_empty_string(), json!("x")),
            (email(), json!("ops@example.com")),
            (url(), json!("https://example.com/a?b=c")),
            (phone(), json!("+14155550123")),
            (date(), json!("2024-02-29")),
            (date_time(), json!("2024-02-29T10:15:00Z")),
            (time(), json!("23:59:59")),
            (locale(), json!("en-US")),
            (locale(), json!("zh-Hant-TW")),
            (time_zone(), json!("America/New_York")),
            (time_zone(), json!("UTC")),
            (latitude(), json!(-90)),
            (longitude(), json!(180.0)),
            (currency(), json!("USD")),
            (country_code(), json!("DE")),
            (json(), json!([1, { "a": null }])),
            (json_object(), json!({ "a": 1 })),
            (id(), json!("usr_01")),
        ];

        for (scalar, value) in test_cases {
            assert!(scalar.validate(&value).is_ok(), "{} should accept {}", scalar.name(), value);
        }
    }

    #[test]
    fn test_rejects() {
        let test_cases: Vec<(ScalarDescriptor, Value)> = vec![
            (non_empty_string(), json!("")),
            (email(), json!("not-an-email")),
            (email(), json!("a@b")),
            (url(), json!("not a url")),
            (phone(), json!("555-0123")),
            (date(), json!("2023-02-29")),
            (date_time(), json!("2024-02-29 10:15")),
            (time(), json!("25:00")),
            (locale(), json!("english")),
            (time_zone(), json!("Mars/Olympus Mons")),
            (latitude(), json!(90.01)),
            (longitude(), json!(-180.5)),
            (currency(), json!("usd")),
            (currency(), json!("USDT")),
            (country_code(), json!("DEU")),
            (json_object(), json!([1])),
            (int(), json!("1")),
            (boolean(), json!(0)),
        ];

        for (scalar, value) in test_cases {
            assert!(scalar.validate(&value).is_err(), "{} should reject {}", scalar.name(), value);
        }
    }

    #[test]
    fn test_fragments() {
        assert_eq!(
            non_empty_string().json_schema().resolve(),
            json!({ "type": "string", "minLength": 1 })
        );
        assert_eq!(int().json_schema().resolve(), json!({ "type": "integer" }));
        assert_eq!(
            email().json_schema().resolve(),
            json!({ "type": "string", "format": "email" })
        );
        assert_eq!(
            latitude().json_schema().resolve(),
            json!({ "type": "number", "minimum": -90, "maximum": 90 })
        );
        assert_eq!(
            currency().json_schema().resolve(),
            json!({ "type": "string", "pattern": "^[A-Z]{3}$" })
        );
        assert_eq!(json().json_schema().resolve(), json!({}));
    }

    #[test]
    fn test_date_time_canonical_form() {
        let dt = date_time();
        let parsed = dt.parse_external(&json!("2024-05-01T08:00:00+00:00")).unwrap();
        assert_eq!(parsed, json!("2024-05-01T08:00:00Z"));
        assert_eq!(dt.serialize(&parsed), parsed);
    }
}
