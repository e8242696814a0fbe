//! Example value synthesis for template rows.
//!
//! The shape of a value depends only on the type tag; its content is random
//! (or clock-derived) so users do not mistake examples for real data.
//!
//! | Tag | Example |
//! |-----|---------|
//! | `guid`, `uuid` | fresh v4 UUID |
//! | `string` | `Text ` + 10..=20 alphanumerics |
//! | `boolean` | `TRUE` or `FALSE` |
//! | `integer` | 1..=10000 |
//! | `float` | 0..=10000 divided by 100 |
//! | `datetime` | today as `YYYY-MM-DD` |
//! | `date` | now as an RFC 3339 timestamp |
//! | `time` | now as `HH:MM:SS` |
//! | other | empty |
//!
//! The `date`/`datetime` formats look swapped but are kept as is: existing
//! import adapters parse templates produced with exactly these shapes.

use crate::io::CellValue;
use crate::models::TypeTag;
use chrono::{DateTime, Local};
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};

const DATE_ONLY_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Synthesizes example cell values from type tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExampleValueSynthesizer;

impl ExampleValueSynthesizer {
    /// Creates a synthesizer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Synthesizes a value with the thread RNG and the local clock.
    #[must_use]
    pub fn synthesize(&self, tag: &TypeTag) -> CellValue {
        let now = Local::now().fixed_offset();
        self.synthesize_with(tag, &mut rand::thread_rng(), &now)
    }

    /// Synthesizes a value from an explicit RNG and clock.
    #[must_use]
    pub fn synthesize_with<R, Tz>(
        &self,
        tag: &TypeTag,
        rng: &mut R,
        now: &DateTime<Tz>,
    ) -> CellValue
    where
        R: RngCore + ?Sized,
        Tz: chrono::TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        match tag {
            TypeTag::Guid | TypeTag::Uuid => {
                let uuid = uuid::Builder::from_random_bytes(rng.r#gen()).into_uuid();
                CellValue::Text(uuid.to_string())
            },
            TypeTag::String => {
                let len = rng.gen_range(10..=20);
                let suffix: String = (0..len)
                    .map(|_| char::from(rng.sample(Alphanumeric)))
                    .collect();
                CellValue::Text(format!("Text {suffix}"))
            },
            TypeTag::Boolean => {
                CellValue::from(if rng.gen_bool(0.5) { "TRUE" } else { "FALSE" })
            },
            TypeTag::Integer => CellValue::Integer(rng.gen_range(1..=10_000)),
            TypeTag::Float => CellValue::Float(f64::from(rng.gen_range(0..=10_000_u32)) / 100.0),
            TypeTag::DateTime => CellValue::Text(now.format(DATE_ONLY_FORMAT).to_string()),
            TypeTag::Date => CellValue::Text(now.format(TIMESTAMP_FORMAT).to_string()),
            TypeTag::Time => CellValue::Text(now.format(TIME_FORMAT).to_string()),
            TypeTag::Association(_) | TypeTag::Other(_) => CellValue::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .expect("valid timestamp")
    }

    fn synth(tag: TypeTag) -> CellValue {
        let mut rng = StdRng::seed_from_u64(7);
        ExampleValueSynthesizer.synthesize_with(&tag, &mut rng, &fixed_now())
    }

    #[test]
    fn test_clock_formats_keep_legacy_mapping() {
        assert_eq!(synth(TypeTag::DateTime), CellValue::from("2024-03-09"));
        assert_eq!(synth(TypeTag::Date), CellValue::from("2024-03-09T14:05:07+00:00"));
        assert_eq!(synth(TypeTag::Time), CellValue::from("14:05:07"));
    }

    #[test]
    fn test_guid_is_v4() {
        let CellValue::Text(text) = synth(TypeTag::Uuid) else {
            panic!("guid must be text");
        };
        let parsed = uuid::Uuid::parse_str(&text).expect("uuid");
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_string_shape() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let value =
                ExampleValueSynthesizer.synthesize_with(&TypeTag::String, &mut rng, &fixed_now());
            let CellValue::Text(text) = value else {
                panic!("string must be text");
            };
            let suffix = text.strip_prefix("Text ").expect("prefix");
            assert!((10..=20).contains(&suffix.len()));
            assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_unknown_and_association_tags_are_empty() {
        assert_eq!(synth(TypeTag::Other("decimal".into())), CellValue::Empty);
        assert_eq!(synth(TypeTag::Association("many_to_one".into())), CellValue::Empty);
    }

    #[test]
    fn test_synthesize_uses_thread_rng() {
        let value = ExampleValueSynthesizer::new().synthesize(&TypeTag::Integer);
        assert!(matches!(value, CellValue::Integer(1..=10_000)));
    }
}
