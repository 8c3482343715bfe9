//! Property-based tests for signature parsing

use chunkwise_model::TypeSignature;
use proptest::prelude::*;

fn leaf() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["i32", "u8", "String", "bool", "f64", "Uuid"])
        .prop_map(|s| s.to_string())
}

fn signature_text() -> impl Strategy<Value = String> {
    leaf().prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|t| format!("Vec<{t}>")),
            inner.clone().prop_map(|t| format!("Option<{t}>")),
            (inner.clone(), inner.clone()).prop_map(|(k, v)| format!("HashMap<{k}, {v}>")),
            (inner.clone(), 1usize..64).prop_map(|(t, n)| format!("[{t}; {n}]")),
            inner.prop_map(|t| format!("{t}[]")),
        ]
    })
}

proptest! {
    #[test]
    fn parse_never_panics(text in "\\PC{0,40}") {
        let _ = TypeSignature::parse(&text);
    }

    #[test]
    fn canonical_form_is_stable(text in signature_text()) {
        let parsed = TypeSignature::parse(&text).expect("generated signature parses");
        let canonical = parsed.to_string();
        let reparsed = TypeSignature::parse(&canonical).expect("canonical form parses");
        prop_assert_eq!(&parsed, &reparsed);
        prop_assert_eq!(canonical, reparsed.to_string());
    }

    #[test]
    fn whitespace_is_insignificant(text in signature_text()) {
        let spaced: String = text
            .chars()
            .flat_map(|c| match c {
                '<' | '>' | ',' | '[' | ']' | ';' => vec![' ', c, ' '],
                _ => vec![c],
            })
            .collect();
        prop_assert_eq!(
            TypeSignature::parse(&text).expect("parses"),
            TypeSignature::parse(&spaced).expect("spaced parses")
        );
    }
}
