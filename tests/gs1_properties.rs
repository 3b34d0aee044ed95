use expiry_tracker::barcode::{self, GROUP_SEPARATOR};
use proptest::prelude::*;
use proptest::test_runner::Config;

proptest! {
    #![proptest_config(Config::with_cases(256))]

    #[test]
    fn compact_gtin_is_extracted(gtin in "[0-9]{14}") {
        let parsed = barcode::parse(&format!("01{gtin}"));
        prop_assert!(parsed.is_gs1);
        prop_assert_eq!(parsed.gtin, gtin);
    }

    #[test]
    fn parse_is_idempotent_on_its_raw_output(raw in "[ -~]{0,40}") {
        let once = barcode::parse(&raw);
        let twice = barcode::parse(&once.raw);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn bracketed_and_compact_forms_agree(
        gtin in "[0-9]{14}",
        yy in 0u32..100,
        mm in 1u32..=12,
        dd in 0u32..=28,
        batch in "[A-Za-z0-9]{1,20}",
    ) {
        let expiry = format!("{yy:02}{mm:02}{dd:02}");
        let bracketed = barcode::parse(&format!("(01){gtin}(17){expiry}(10){batch}"));
        let compact = barcode::parse(&format!("01{gtin}17{expiry}10{batch}{GROUP_SEPARATOR}"));
        prop_assert_eq!(&bracketed.gtin, &compact.gtin);
        prop_assert_eq!(&bracketed.expiry_iso, &compact.expiry_iso);
        prop_assert_eq!(&bracketed.expiry_display, &compact.expiry_display);
        prop_assert_eq!(&bracketed.batch, &compact.batch);
        prop_assert_eq!(&bracketed.batch, &batch);
    }

    #[test]
    fn sanitized_codes_are_short_and_clean(raw in "\\PC{0,60}") {
        let parsed = barcode::parse(&format!("(10){raw}"));
        prop_assert!(parsed.batch.chars().count() <= 20);
        prop_assert!(parsed
            .batch
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn plain_barcodes_never_carry_ai_fields(digits in "[1-9][0-9]{7,13}") {
        let parsed = barcode::parse(&digits);
        prop_assert!(!parsed.is_gs1);
        prop_assert_eq!(parsed.gtin.len(), 14);
        prop_assert!(parsed.expiry.is_empty() && parsed.batch.is_empty() && parsed.serial.is_empty());
    }
}
