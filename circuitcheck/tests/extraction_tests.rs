//! End-to-end SOA extraction tests over fixture datasheets.

use std::collections::BTreeMap;
use std::path::PathBuf;

use circuitcheck::soa::{ComplianceChecker, LimitExtractor, LimitPattern, Verdict};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_extract_from_text_datasheet() {
    let extractor = LimitExtractor::new();
    let extraction = extractor
        .extract_from_document(&fixture("irf540n.txt"), None)
        .unwrap();

    assert!(!extraction.incomplete);
    assert_eq!(extraction.limits.get("Vds_max"), Some(&100.0));
    assert_eq!(extraction.limits.get("Id_max"), Some(&33.0));
    assert_eq!(extraction.limits.get("Pd_max"), Some(&130.0));
}

#[test]
fn test_extracted_limits_are_consistent() {
    let extractor = LimitExtractor::new();
    let extraction = extractor
        .extract_from_document(&fixture("irf540n.txt"), None)
        .unwrap();
    assert!(extractor.validate(&extraction.limits).is_empty());
}

#[test]
fn test_extraction_feeds_compliance() {
    let extractor = LimitExtractor::new();
    let limits = extractor
        .extract_from_document(&fixture("irf540n.txt"), None)
        .unwrap()
        .limits;

    let operating: BTreeMap<String, f64> =
        [("Vds".to_string(), 24.0), ("Id".to_string(), 5.0)].into();
    let entries = ComplianceChecker::default().check_compliance(&limits, &operating);

    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.verdict == Verdict::Ok));
}

#[test]
fn test_custom_pattern_extends_builtins() {
    let mut extractor = LimitExtractor::new();
    extractor.register(
        LimitPattern::new(
            "Vgs_max",
            vec!["Vgs", "Gate-Source Voltage"],
            "V",
            "Maximum gate-source voltage",
        )
        .with_priority(100),
    );

    let extraction = extractor
        .extract_from_document(&fixture("irf540n.txt"), None)
        .unwrap();
    assert_eq!(extraction.limits.get("Vgs_max"), Some(&20.0));
    // Built-ins still apply.
    assert_eq!(extraction.limits.get("Id_max"), Some(&33.0));
}

#[test]
fn test_missing_document_is_error() {
    let extractor = LimitExtractor::new();
    assert!(extractor
        .extract_from_document(&fixture("does_not_exist.pdf"), None)
        .is_err());
}
