//! Property-based tests for the type catalog and tokenizer span math, in the
//! same rstest-for-isolated-cases / proptest-for-invariants split the teacher
//! uses in its own lexer test suite.

use a2lparser::schema::types::PredefinedType;
use a2lparser::tokenizer::{tokenize, TokenClass};
use proptest::prelude::*;

proptest! {
    #[test]
    fn uint_in_range_round_trips_through_validate(n in 0u32..=(u16::MAX as u32)) {
        let text = n.to_string();
        let value = PredefinedType::UInt.validate(&text);
        prop_assert_eq!(value.and_then(|v| v.as_uint()), Some(n as u64));
    }

    #[test]
    fn uint_above_range_is_always_rejected(n in (u16::MAX as u64 + 1)..=(u32::MAX as u64 * 4)) {
        let text = n.to_string();
        prop_assert_eq!(PredefinedType::UInt.validate(&text), None);
    }

    #[test]
    fn negative_text_is_never_a_valid_uint(n in 1i64..=1_000_000i64) {
        let text = format!("-{}", n);
        prop_assert_eq!(PredefinedType::UInt.validate(&text), None);
    }

    #[test]
    fn regular_token_span_length_matches_its_byte_length(word in "[A-Za-z][A-Za-z0-9_]{0,30}") {
        let tokens = tokenize(word.as_bytes());
        let regular = tokens
            .iter()
            .find(|t| t.class == TokenClass::Regular)
            .expect("a bareword should tokenize to one Regular token");
        prop_assert_eq!(regular.bytes.len(), word.len());
        prop_assert!(regular.span.start_col <= regular.span.end_col);
        // `end_col` is the column of the last byte consumed (inclusive).
        prop_assert_eq!(regular.span.end_col - regular.span.start_col + 1, word.len());
    }
}
