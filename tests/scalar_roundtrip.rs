//! Scalar Round-Trip Properties
//!
//! For every scalar, `serialize(parse_external(v))` reaches a fixed point
//! after one application.

use chrono::{FixedOffset, NaiveDate, TimeZone};
use contract_schemas::{ScalarCache, ScalarDescriptor};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

fn round_trip(scalar: &ScalarDescriptor, value: &Value) -> Value {
    let parsed = scalar
        .parse_external(value)
        .unwrap_or_else(|e| panic!("{} rejected {}: {}", scalar.name(), value, e));
    scalar.serialize(&parsed)
}

fn assert_idempotent(scalar: &Arc<ScalarDescriptor>, value: Value) -> Result<(), TestCaseError> {
    let once = round_trip(scalar, &value);
    let twice = round_trip(scalar, &once);
    prop_assert_eq!(once, twice);
    Ok(())
}

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (1i32..=9999, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

proptest! {
    #[test]
    fn string_round_trip(s in ".*") {
        let cache = ScalarCache::new();
        assert_idempotent(&cache.string(), json!(s))?;
    }

    #[test]
    fn non_empty_string_round_trip(s in ".+") {
        let cache = ScalarCache::new();
        assert_idempotent(&cache.non_empty_string(), json!(s))?;
    }

    #[test]
    fn int_round_trip(n in any::<i64>()) {
        let cache = ScalarCache::new();
        let int = cache.int();
        assert_idempotent(&int, json!(n))?;
        prop_assert_eq!(round_trip(&int, &json!(n.to_string())), json!(n));
    }

    #[test]
    fn integral_float_normalizes_to_int(n in -1_000_000_000i64..1_000_000_000) {
        let cache = ScalarCache::new();
        prop_assert_eq!(round_trip(&cache.int(), &json!(n as f64)), json!(n));
    }

    #[test]
    fn float_round_trip(f in prop::num::f64::NORMAL | prop::num::f64::ZERO) {
        let cache = ScalarCache::new();
        assert_idempotent(&cache.float(), json!(f))?;
    }

    #[test]
    fn boolean_round_trip(b in any::<bool>()) {
        let cache = ScalarCache::new();
        let boolean = cache.boolean();
        assert_idempotent(&boolean, json!(b))?;
        prop_assert_eq!(round_trip(&boolean, &json!(b.to_string())), json!(b));
    }

    #[test]
    fn date_round_trip(date in date_strategy()) {
        let cache = ScalarCache::new();
        let text = date.format("%Y-%m-%d").to_string();
        prop_assert_eq!(round_trip(&cache.date(), &json!(text.clone())), json!(text));
    }

    #[test]
    fn date_time_round_trip(
        secs in 0i64..253_402_214_399,
        offset_minutes in -(14 * 60)..=(14 * 60),
    ) {
        let cache = ScalarCache::new();
        let offset = FixedOffset::east_opt(offset_minutes * 60).unwrap();
        let stamp = offset.timestamp_opt(secs, 0).unwrap();
        assert_idempotent(&cache.date_time(), json!(stamp.to_rfc3339()))?;
    }

    #[test]
    fn latitude_round_trip(lat in -90.0f64..=90.0) {
        let cache = ScalarCache::new();
        assert_idempotent(&cache.latitude(), json!(lat))?;
    }
}

#[test]
fn date_time_is_canonicalized() {
    let cache = ScalarCache::new();
    let date_time = cache.date_time();

    let canonical = round_trip(&date_time, &json!("2024-03-01T10:00:00+00:00"));
    assert_eq!(canonical, json!("2024-03-01T10:00:00Z"));
    assert_eq!(round_trip(&date_time, &canonical), canonical);
}

#[test]
fn out_of_domain_values_are_rejected() {
    let cache = ScalarCache::new();
    assert!(cache.latitude().parse_external(&json!(90.5)).is_err());
    assert!(cache.longitude().parse_external(&json!(-180.1)).is_err());
    assert!(cache.date().parse_external(&json!("2024-02-30")).is_err());
    assert!(cache.int().parse_external(&json!(1.5)).is_err());
    assert!(cache.int().parse_external(&json!("seven")).is_err());
}
