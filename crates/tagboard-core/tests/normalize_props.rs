use proptest::prelude::*;
use serde_json::{Map, Value, json};
use tagboard_core::tags::normalize::{canonicalize, representations, split_composite};
use tagboard_core::tags::usage::UsageScan;

fn arb_tag() -> impl Strategy<Value = String> {
    "[ \\tA-Za-z0-9_-]{0,12}"
}

fn arb_word() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_-]{0,8}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn canonicalize_is_idempotent(raw in arb_tag()) {
        let once = canonicalize(&raw);
        let twice = once.as_deref().and_then(canonicalize);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn case_and_padding_variants_share_a_canonical_form(word in arb_word(), pad in "[ \\t]{0,3}") {
        let shouted = format!("{pad}{}{pad}", word.to_uppercase());
        prop_assert_eq!(canonicalize(&shouted), canonicalize(&word));
        prop_assert_eq!(canonicalize(&word), Some(word.to_lowercase()));
    }

    #[test]
    fn categorized_tags_yield_bare_and_composite(
        category in arb_word(),
        tags in prop::collection::vec(arb_word(), 1..6),
    ) {
        let mut map = Map::new();
        map.insert(category.clone(), Value::from(tags.clone()));
        let categorized = Value::Object(map);
        let reps = representations(None, Some(&categorized));
        let folded_category = category.to_lowercase();

        for tag in &tags {
            let bare = tag.to_lowercase();
            let scoped = format!("{folded_category}:{bare}");
            prop_assert!(reps.contains(&bare), "missing bare {}", bare);
            prop_assert!(reps.contains(&scoped), "missing composite {}", scoped);
            let expected = Some((folded_category.as_str(), bare.as_str()));
            prop_assert_eq!(split_composite(&scoped), expected);
        }
        for rep in &reps {
            if let Some((cat, _)) = split_composite(rep) {
                prop_assert_eq!(cat, folded_category.as_str());
            }
        }
    }

    #[test]
    fn flat_tags_never_produce_composites(tags in prop::collection::vec(arb_word(), 0..8)) {
        let flat = Value::from(tags.clone());
        let reps = representations(Some(&flat), None);
        prop_assert!(reps.iter().all(|rep| split_composite(rep).is_none()));
        prop_assert!(reps.len() <= tags.len());
    }

    #[test]
    fn duplicates_within_a_document_count_once(
        tags in prop::collection::vec(arb_word(), 1..6),
        repeats in 1usize..4,
    ) {
        let repeated: Vec<String> = tags
            .iter()
            .flat_map(|t| std::iter::repeat_n(t.clone(), repeats))
            .collect();
        let mut scan = UsageScan::default();
        scan.add_document(&json!({ "hashtags": repeated }));

        prop_assert!(scan.counts.values().all(|count| *count == 1));
    }

    #[test]
    fn ranking_is_count_desc_then_tag_asc(
        docs in prop::collection::vec(prop::collection::vec(arb_word(), 0..5), 0..12),
    ) {
        let mut scan = UsageScan::default();
        for tags in &docs {
            scan.add_document(&json!({ "hashtags": tags }));
        }

        let ranked = scan.ranked();
        prop_assert_eq!(ranked.len(), scan.counts.len());
        for pair in ranked.windows(2) {
            let (tag_a, count_a) = pair[0];
            let (tag_b, count_b) = pair[1];
            prop_assert!(
                count_a > count_b || (count_a == count_b && tag_a < tag_b),
                "out of order: {:?} before {:?}", pair[0], pair[1]
            );
        }
        prop_assert_eq!(scan.ranked(), ranked);
    }
}
