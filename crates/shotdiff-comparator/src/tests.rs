use shotdiff_types::{
    BoundingBox, DiffSeverity, FocusCandidate, FocusChange, FocusExtraction, FocusKind, TextBlock,
    TextExtraction,
};

use crate::{
    ExtractionComparator, FocusComparator, SeverityBands, TextComparator, TextComparatorConfig,
};

fn form(fields: &[(&str, &str)]) -> TextExtraction {
    let mut blocks = vec![TextBlock::new(
        "Registration Form",
        95.0,
        BoundingBox::new(20, 10, 200, 20),
    )];
    for (row, (label, value)) in fields.iter().enumerate() {
        let y = 50 + row as u32 * 40;
        blocks.push(TextBlock::new(*label, 92.0, BoundingBox::new(20, y, 80, 14)));
        blocks.push(TextBlock::new(*value, 90.0, BoundingBox::new(140, y + 1, 160, 14)));
    }
    TextExtraction::new(blocks)
}

fn registration(name_label: &str) -> TextExtraction {
    form(&[
        (name_label, "John Smith"),
        ("Email", "john@example.com"),
        ("Phone", "555-0100"),
    ])
}

#[test]
fn identical_text_matches_with_full_similarity() {
    let comparator = TextComparator::default();
    let verdict = comparator.compare(&registration("Name"), &registration("Name"));
    assert!(verdict.matched);
    assert_eq!(verdict.similarity, 1.0);
    assert_eq!(verdict.reason, "text matches");
    assert_eq!(verdict.severity, None);
}

#[test]
fn identical_text_matches_under_any_threshold() {
    for threshold in [0.0, 0.5, 0.99, 1.0] {
        let comparator = TextComparator::new(TextComparatorConfig {
            similarity_threshold: threshold,
            ..TextComparatorConfig::default()
        });
        assert!(
            comparator
                .compare(&registration("Name"), &registration("Name"))
                .matched
        );
    }
}

#[test]
fn case_is_ignored_by_default_only() {
    let upper = registration("NAME");
    let lower = registration("name");
    assert!(TextComparator::default().compare(&upper, &lower).matched);

    let strict = TextComparator::new(TextComparatorConfig {
        ignore_case: false,
        ..TextComparatorConfig::default()
    });
    assert!(!strict.compare(&upper, &lower).matched);
}

#[test]
fn renamed_label_is_a_small_mismatch() {
    let verdict =
        TextComparator::default().compare(&registration("Name"), &registration("Full Name"));
    assert!(!verdict.matched);
    assert!(verdict.similarity > 0.9 && verdict.similarity < 1.0);
    assert!(matches!(
        verdict.severity,
        Some(DiffSeverity::Minor) | Some(DiffSeverity::Moderate)
    ));
    assert!(
        verdict.reason == "minor differences" || verdict.reason == "differs in several fields"
    );
    assert!(verdict.candidate_text.contains("full name"));
}

#[test]
fn similarity_is_symmetric() {
    let comparator = TextComparator::default();
    let pairs = [
        (registration("Name"), registration("Full Name")),
        (registration("Name"), TextExtraction::empty()),
        (
            form(&[("User", "alice")]),
            form(&[("Username", "bob"), ("Role", "admin")]),
        ),
    ];
    for (a, b) in &pairs {
        assert_eq!(
            comparator.compare(a, b).similarity,
            comparator.compare(b, a).similarity
        );
    }
}

#[test]
fn empty_extractions_match() {
    let verdict =
        TextComparator::default().compare(&TextExtraction::empty(), &TextExtraction::empty());
    assert!(verdict.matched);
    assert_eq!(verdict.similarity, 1.0);
}

#[test]
fn completely_different_text_is_severe() {
    fn line(words: &[&str]) -> TextExtraction {
        let blocks = words
            .iter()
            .enumerate()
            .map(|(i, w)| TextBlock::new(*w, 90.0, BoundingBox::new(i as u32 * 100, 40, 80, 14)))
            .collect();
        TextExtraction::new(blocks)
    }
    let verdict = TextComparator::default().compare(
        &line(&["Name", "John"]),
        &line(&["Invoice", "0042", "Total", "$19.99"]),
    );
    assert!(!verdict.matched);
    assert_eq!(verdict.severity, Some(DiffSeverity::Severe));
    assert_eq!(verdict.reason, "major content differences detected");
}

#[test]
fn threshold_below_one_tolerates_small_changes() {
    let comparator = TextComparator::new(TextComparatorConfig {
        similarity_threshold: 0.9,
        ..TextComparatorConfig::default()
    });
    let verdict = comparator.compare(&registration("Name"), &registration("Full Name"));
    assert!(verdict.matched);
    assert_eq!(verdict.reason, "text matches");
}

#[test]
fn severity_bands_are_inclusive_lower_at_each_boundary() {
    let bands = SeverityBands::default();
    assert_eq!(bands.classify(0.0), DiffSeverity::Minor);
    assert_eq!(bands.classify(0.049_999), DiffSeverity::Minor);
    assert_eq!(bands.classify(0.05), DiffSeverity::Moderate);
    assert_eq!(bands.classify(0.199_999), DiffSeverity::Moderate);
    assert_eq!(bands.classify(0.20), DiffSeverity::Major);
    assert_eq!(bands.classify(0.499_999), DiffSeverity::Major);
    assert_eq!(bands.classify(0.50), DiffSeverity::Severe);
    assert_eq!(bands.classify(1.0), DiffSeverity::Severe);
}

#[test]
fn custom_bands_change_the_reason() {
    let comparator = TextComparator::new(TextComparatorConfig {
        bands: SeverityBands {
            minor_threshold: 0.01,
            moderate_threshold: 0.02,
            major_threshold: 0.03,
        },
        ..TextComparatorConfig::default()
    });
    let verdict = comparator.compare(&registration("Name"), &registration("Full Name"));
    assert_eq!(verdict.severity, Some(DiffSeverity::Severe));
}

fn focus(candidates: Vec<FocusCandidate>) -> FocusExtraction {
    FocusExtraction::new(candidates, 800, 600)
}

fn cursor_at(x: u32, y: u32) -> FocusCandidate {
    FocusCandidate::new(FocusKind::Cursor, BoundingBox::new(x, y, 1, 14))
}

fn ring_at(x: u32, y: u32) -> FocusCandidate {
    FocusCandidate::new(FocusKind::Border, BoundingBox::new(x, y, 200, 30))
}

#[test]
fn no_focus_on_either_side_matches() {
    let verdict = FocusComparator::default().compare(&focus(vec![]), &focus(vec![]));
    assert!(verdict.matched);
    assert_eq!(verdict.change, FocusChange::NoneObserved);
}

#[test]
fn same_cursor_within_tolerance_matches() {
    // 5% of 800 x 600 is 40 x 30.
    let verdict = FocusComparator::default().compare(
        &focus(vec![cursor_at(120, 200)]),
        &focus(vec![cursor_at(150, 220)]),
    );
    assert!(verdict.matched);
    assert_eq!(verdict.detail, "focus unchanged");
    assert!(verdict.reference.is_some() && verdict.candidate.is_some());
}

#[test]
fn cursor_missing_in_candidate_is_lost() {
    let verdict = FocusComparator::default().compare(
        &focus(vec![ring_at(20, 60), cursor_at(120, 200)]),
        &focus(vec![ring_at(20, 60)]),
    );
    assert!(!verdict.matched);
    assert_eq!(verdict.detail, "focus lost");
    assert_eq!(verdict.reference, Some(cursor_at(120, 200)));
}

#[test]
fn cursor_only_in_candidate_is_gained() {
    let verdict =
        FocusComparator::default().compare(&focus(vec![]), &focus(vec![cursor_at(120, 200)]));
    assert!(!verdict.matched);
    assert_eq!(verdict.change, FocusChange::Gained);
}

#[test]
fn cursor_beyond_tolerance_has_moved() {
    let verdict = FocusComparator::default().compare(
        &focus(vec![cursor_at(120, 200)]),
        &focus(vec![cursor_at(120, 280)]),
    );
    assert!(!verdict.matched);
    assert_eq!(verdict.detail, "focus moved");
}

#[test]
fn tolerance_boundary_is_inclusive() {
    let verdict = FocusComparator::default().compare(
        &focus(vec![cursor_at(100, 200)]),
        &focus(vec![cursor_at(140, 230)]),
    );
    assert!(verdict.matched);
}

#[test]
fn cursor_replaced_by_ring_in_place_changes_kind() {
    let ring = FocusCandidate::new(FocusKind::Border, BoundingBox::new(100, 190, 40, 30));
    let verdict = FocusComparator::default()
        .compare(&focus(vec![cursor_at(120, 200)]), &focus(vec![ring]));
    assert!(!verdict.matched);
    assert_eq!(verdict.change, FocusChange::KindChanged);
    assert_eq!(verdict.detail, "focus kind changed");
}

#[test]
fn each_candidate_is_paired_at_most_once() {
    let verdict = FocusComparator::default().compare(
        &focus(vec![cursor_at(120, 200), cursor_at(125, 205)]),
        &focus(vec![cursor_at(122, 202)]),
    );
    assert_eq!(verdict.change, FocusChange::Lost);
}

#[test]
fn verdicts_serialize_for_reports() {
    let verdict = FocusComparator::default().compare(
        &focus(vec![cursor_at(120, 200)]),
        &focus(vec![]),
    );
    let json = serde_json::to_value(&verdict).unwrap();
    assert_eq!(json["detail"], "focus lost");
    assert_eq!(json["change"], "lost");
    assert_eq!(json["reference"]["kind"], "cursor");
}
