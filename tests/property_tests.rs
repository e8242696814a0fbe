//! Property-based tests for example synthesis and action derivation.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Integer and float examples stay within their ranges
//! - Boolean examples are always TRUE or FALSE
//! - String examples keep their prefix and length bounds
//! - Import action derivation is idempotent

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use metaport::io::CellValue;
use metaport::{
    ActionConfig, ActionConfigDeriver, EntityMetadata, ExampleValueSynthesizer, FieldDescriptor,
    TypeTag,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn synth(tag: &TypeTag, seed: u64) -> CellValue {
    let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
    ExampleValueSynthesizer::new().synthesize_with(tag, &mut StdRng::seed_from_u64(seed), &now)
}

proptest! {
    /// Property: integer examples lie in 1..=10000.
    #[test]
    fn prop_integer_in_range(seed in any::<u64>()) {
        match synth(&TypeTag::Integer, seed) {
            CellValue::Integer(n) => prop_assert!((1..=10_000).contains(&n)),
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    /// Property: float examples lie in 0..=100 with at most two decimals.
    #[test]
    fn prop_float_in_range(seed in any::<u64>()) {
        match synth(&TypeTag::Float, seed) {
            CellValue::Float(f) => {
                prop_assert!((0.0..=100.0).contains(&f));
                prop_assert!(((f * 100.0).round() - f * 100.0).abs() < 1e-6);
            },
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    /// Property: boolean examples are TRUE or FALSE.
    #[test]
    fn prop_boolean_values(seed in any::<u64>()) {
        let value = synth(&TypeTag::Boolean, seed).to_string();
        prop_assert!(value == "TRUE" || value == "FALSE");
    }

    /// Property: string examples are "Text " plus 10 to 20 alphanumerics.
    #[test]
    fn prop_string_shape(seed in any::<u64>()) {
        let value = synth(&TypeTag::String, seed).to_string();
        let suffix = value.strip_prefix("Text ").expect("prefix");
        prop_assert!((10..=20).contains(&suffix.len()));
        prop_assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    /// Property: deriving an import action twice yields the same action.
    #[test]
    fn prop_guess_import_idempotent(
        name in "[a-z]{1,12}",
        plural in "[a-z]{1,12}",
        path in proptest::option::of("/[a-z]{1,8}"),
        adapter in proptest::option::of("[a-z]{1,8}"),
    ) {
        let meta = EntityMetadata::new(name, plural)
            .importable()
            .with_field(FieldDescriptor::new("id", "guid"));
        let mut config = ActionConfig::new("import");
        config.path = path;
        config.import_adapter = adapter;

        let deriver = ActionConfigDeriver::default();
        let once = deriver.guess_import(&meta, config);
        let twice = deriver.guess_import(&meta, once.clone());
        prop_assert_eq!(once, twice);
    }
}
