use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;

use super::*;
use crate::constants::{DEFAULT_KEYWORD_MATCH_THRESHOLD, DEFAULT_SIMILARITY_THRESHOLD};

const BUILTIN_CODES: [&str; 6] = [
    "NO_PLASTIC",
    "PLUGGING",
    "RECYCLE",
    "REUSABLE_BAG",
    "REUSABLE_BAG_EXTENDED",
    "TUMBLER_CHALLENGE",
];

#[test]
fn test_builtin_table_parses() {
    let registry = ChallengeRegistry::builtin().unwrap();

    assert_eq!(registry.len(), BUILTIN_CODES.len());
    for code in BUILTIN_CODES {
        assert!(registry.contains(code), "missing {code}");
    }
    assert!(!registry.contrast_phrases().is_empty());
}

#[test]
fn test_specs_are_sorted_by_code() {
    let registry = ChallengeRegistry::builtin().unwrap();
    let codes: Vec<String> = registry.specs().iter().map(|s| s.code.clone()).collect();
    assert_eq!(codes, BUILTIN_CODES);
}

#[test]
fn test_tumbler_spec_contents() {
    let registry = ChallengeRegistry::builtin().unwrap();
    let spec = registry.lookup("TUMBLER_CHALLENGE", "ignored");

    assert_eq!(spec.similarity_threshold, 0.5);
    assert_eq!(spec.keyword_match_threshold, 1);
    assert!(spec.required_keywords("ko").contains(&"텀블러"));
    assert!(spec.required_keywords("en").contains(&"tumbler"));
    assert!(spec.forbidden_keywords.iter().any(|k| k == "플라스틱"));
}

#[test]
fn test_lookup_known_code_shares_instance() {
    let registry = ChallengeRegistry::builtin().unwrap();
    let a = registry.lookup("RECYCLE", "x");
    let b = registry.lookup("RECYCLE", "y");
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_lookup_unknown_code_synthesizes_generic_spec() {
    let registry = ChallengeRegistry::builtin().unwrap();
    let spec = registry.lookup("BIKE_COMMUTE", "Bike Commute Challenge");

    assert_eq!(spec.code, "BIKE_COMMUTE");
    assert_eq!(spec.target_description, "Bike Commute Challenge");
    assert!(spec.forbidden_keywords.is_empty());
    assert_eq!(spec.similarity_threshold, DEFAULT_SIMILARITY_THRESHOLD);
    assert_eq!(spec.keyword_match_threshold, DEFAULT_KEYWORD_MATCH_THRESHOLD);
    assert_eq!(spec.required_keywords("en"), vec!["bike", "commute"]);
    assert_eq!(spec.required_keywords("ko"), vec!["bike", "commute"]);
    assert_eq!(spec.target_phrases(), vec!["a photo of Bike Commute Challenge"]);
}

#[test]
fn test_title_tokens_korean() {
    assert_eq!(title_tokens("대중교통 이용 챌린지"), vec!["대중교통", "이용"]);
}

#[test]
fn test_title_tokens_falls_back_to_whole_title() {
    assert_eq!(title_tokens("챌린지"), vec!["챌린지"]);
    assert!(title_tokens("   ").is_empty());
}

#[test]
fn test_required_keywords_unknown_language_uses_union() {
    let registry = ChallengeRegistry::builtin().unwrap();
    let spec = registry.lookup("TUMBLER_CHALLENGE", "");

    let union = spec.required_keywords("fr");
    assert!(union.contains(&"텀블러"));
    assert!(union.contains(&"tumbler"));
}

#[test]
fn test_normalize_dedups_keywords_in_order() {
    let json = r#"{
        "challenges": [{
            "code": "X",
            "title": "x",
            "target_description": "x",
            "required_keywords": { "en": ["b", " a ", "b", ""] },
            "forbidden_keywords": ["z", "z"]
        }]
    }"#;

    let registry = ChallengeRegistry::from_json(json).unwrap();
    let spec = registry.get("X").unwrap();
    assert_eq!(spec.required_keywords("en"), vec!["b", "a"]);
    assert_eq!(spec.forbidden_keywords, vec!["z"]);
    assert_eq!(spec.similarity_threshold, DEFAULT_SIMILARITY_THRESHOLD);
}

#[test]
fn test_duplicate_code_rejected() {
    let json = r#"{
        "challenges": [
            { "code": "X", "title": "x", "target_description": "x" },
            { "code": "X", "title": "y", "target_description": "y" }
        ]
    }"#;

    assert!(matches!(
        ChallengeRegistry::from_json(json),
        Err(RegistryError::DuplicateCode { .. })
    ));
}

#[test]
fn test_invalid_thresholds_rejected() {
    let json = r#"{"challenges": [
        { "code": "X", "title": "x", "target_description": "x", "similarity_threshold": 1.5 }
    ]}"#;
    assert!(matches!(
        ChallengeRegistry::from_json(json),
        Err(RegistryError::InvalidSpec { .. })
    ));

    let json = r#"{"challenges": [
        { "code": "X", "title": "x", "target_description": "x", "keyword_match_threshold": 0 }
    ]}"#;
    assert!(matches!(
        ChallengeRegistry::from_json(json),
        Err(RegistryError::InvalidSpec { .. })
    ));
}

#[test]
fn test_malformed_json_rejected() {
    assert!(matches!(
        ChallengeRegistry::from_json("{ not json"),
        Err(RegistryError::Parse(_))
    ));
}

#[test]
fn test_load_merges_external_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "contrast_phrases": ["a cat"],
            "challenges": [
                {{ "code": "TUMBLER_CHALLENGE", "title": "t", "target_description": "t",
                   "similarity_threshold": 0.7, "keyword_match_threshold": 3 }},
                {{ "code": "STAIRS", "title": "계단 오르기", "target_description": "taking the stairs" }}
            ]
        }}"#
    )
    .unwrap();

    let registry = ChallengeRegistry::load(Some(file.path())).unwrap();

    assert_eq!(registry.len(), BUILTIN_CODES.len() + 1);
    assert_eq!(registry.contrast_phrases(), ["a cat".to_string()]);

    let tumbler = registry.get("TUMBLER_CHALLENGE").unwrap();
    assert_eq!(tumbler.similarity_threshold, 0.7);
    assert_eq!(tumbler.keyword_match_threshold, 3);
    assert!(registry.contains("STAIRS"));
}

#[test]
fn test_load_missing_file_is_io_error() {
    let result = ChallengeRegistry::load(Some(Path::new("/no/such/challenges.json")));
    assert!(matches!(result, Err(RegistryError::Io { .. })));
}
