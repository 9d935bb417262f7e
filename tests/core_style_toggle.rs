use proptest::collection::vec;
use proptest::prelude::*;
use rich_readme::{
    Coverage, Document, DocumentConfig, EditError, StyleSpanEngine, StyleState, StyleTag,
    check_balance,
};
use rich_readme_naive_oracle as oracle;

const WRAPPERS: [(&str, &str); 5] = [
    ("", ""),
    ("<i>", "</i>"),
    ("<color=red>", "</color>"),
    ("<size=14>", "</size>"),
    ("<b>", "</b>"),
];

/// Balanced rich text: runs of content, each optionally wrapped, some runs
/// grouped under a second wrapper, with the odd placeholder between them.
fn balanced_text(wrappers: usize) -> impl Strategy<Value = String> {
    let run = (0..wrappers, "[a-z ]{1,5}", any::<bool>()).prop_map(move |(w, content, field)| {
        let (open, close) = WRAPPERS[w];
        let field = if field { r#"<o="0000042"></o>"# } else { "" };
        format!("{open}{content}{close}{field}")
    });
    let group = (0..wrappers, vec(run, 1..4)).prop_map(|(w, runs)| {
        let (open, close) = WRAPPERS[w];
        format!("{open}{}{close}", runs.concat())
    });
    vec(group, 1..5).prop_map(|groups| groups.concat())
}

fn any_text() -> impl Strategy<Value = String> {
    vec(
        prop_oneof![
            prop::sample::select(vec!["<b>", "</b>", "<i>", "</i>", "<color=x>", "</color>"])
                .prop_map(str::to_string),
            "[a-z]{1,3}",
        ],
        0..20,
    )
    .prop_map(|fragments| fragments.concat())
}

fn doc(text: &str) -> Document<String> {
    Document::from_rich_text(text)
}

#[test]
fn test_scenario_b_bold_first_word() {
    let mut document = doc("Hi there");
    assert_eq!(document.toggle_style(StyleTag::Bold, 0, 2), Ok(StyleState::Applied));
    assert_eq!(document.rich_text(), "<b>Hi</b> there");
    assert_eq!(document.poor_text(), "Hi there");
}

#[test]
fn test_toggle_over_whole_foreign_pair_wraps_it() {
    let mut document = doc("a <i>bc</i> d");
    document.toggle_style(StyleTag::Bold, 0, 6).unwrap();
    assert_eq!(document.rich_text(), "<b>a <i>bc</i> d</b>");
    assert!((0..6).all(|index| document.is_styled(StyleTag::Bold, index)));

    assert_eq!(document.toggle_style(StyleTag::Bold, 0, 6), Ok(StyleState::Removed));
    assert_eq!(document.rich_text(), "a <i>bc</i> d");
}

#[test]
fn test_toggle_into_foreign_pair_splits_run() {
    let mut document = doc("a <i>bc</i> d");
    document.toggle_style(StyleTag::Bold, 0, 3).unwrap();
    assert_eq!(document.rich_text(), "<b>a </b><i><b>b</b>c</i> d");
    assert!(check_balance(document.rich_text()).is_ok());

    assert_eq!(document.toggle_style(StyleTag::Bold, 0, 3), Ok(StyleState::Removed));
    assert_eq!(document.rich_text(), "a <i>bc</i> d");
}

#[test]
fn test_double_toggle_beside_nested_bold_restores_text() {
    let original = "<b>x<i>y</i>z</b> w";
    let mut document = doc(original);
    assert_eq!(document.toggle_style(StyleTag::Bold, 4, 1), Ok(StyleState::Applied));
    assert_eq!(document.rich_text(), "<b>x<i>y</i>z</b> <b>w</b>");
    assert_eq!(document.toggle_style(StyleTag::Bold, 4, 1), Ok(StyleState::Removed));
    assert_eq!(document.rich_text(), original);
}

#[test]
fn test_partial_removal_keeps_outer_parts() {
    let mut document = doc("<i>abcdef</i>");
    assert_eq!(document.toggle_style(StyleTag::Italic, 2, 2), Ok(StyleState::Removed));
    assert_eq!(document.rich_text(), "<i>ab</i>cd<i>ef</i>");
}

#[test]
fn test_unsplit_toggle_that_would_cross_is_reverted() {
    let config = DocumentConfig {
        enforce_tag_balance: true,
        split_at_foreign_tags: false,
    };
    let mut document: Document<String> = Document::with_config(config);
    document.set_rich_text("a<i>b</i>").unwrap();
    let err = document.toggle_style(StyleTag::Bold, 0, 2).unwrap_err();
    assert!(matches!(err, EditError::StyleApplication(_)));
    assert_eq!(document.rich_text(), "a<i>b</i>");
    assert!(!document.is_styled(StyleTag::Bold, 0));
}

#[test]
fn test_toggle_past_end_is_clamped() {
    let mut document = doc("abc");
    assert_eq!(document.toggle_style(StyleTag::Bold, 1, 50), Ok(StyleState::Applied));
    assert_eq!(document.rich_text(), "a<b>bc</b>");
    assert_eq!(document.toggle_style(StyleTag::Bold, 10, 5), Ok(StyleState::Unchanged));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(proptest_config::cases()))]

    #[test]
    fn prop_double_toggle_restores_text(
        text in balanced_text(5),
        start in 0usize..24,
        len in 1usize..24,
    ) {
        let mut document = doc(&text);
        let end = (start + len).min(document.poor_text().chars().count());
        prop_assume!(start < end);
        prop_assume!(
            document.style_map(StyleTag::Bold).map(|map| map.coverage(start..end))
                == Some(Coverage::Unstyled)
        );

        prop_assert_eq!(document.toggle_style(StyleTag::Bold, start, len), Ok(StyleState::Applied));
        prop_assert!(check_balance(document.rich_text()).is_ok());
        prop_assert_eq!(document.toggle_style(StyleTag::Bold, start, len), Ok(StyleState::Removed));
        prop_assert_eq!(document.rich_text(), text.as_str());
    }

    #[test]
    fn prop_mixed_toggle_styles_whole_range(
        text in balanced_text(5),
        start in 0usize..24,
        len in 1usize..24,
    ) {
        let mut document = doc(&text);
        let poor_text = document.poor_text().to_string();
        let end = (start + len).min(poor_text.chars().count());
        prop_assume!(start < end);

        let before = document
            .style_map(StyleTag::Bold)
            .map(|map| map.coverage(start..end));
        let state = document.toggle_style(StyleTag::Bold, start, len).unwrap();

        prop_assert_eq!(document.poor_text(), poor_text.as_str());
        prop_assert!(check_balance(document.rich_text()).is_ok());
        if before == Some(Coverage::Styled) {
            prop_assert_eq!(state, StyleState::Removed);
            prop_assert!((start..end).all(|index| !document.is_styled(StyleTag::Bold, index)));
        } else {
            prop_assert_eq!(state, StyleState::Applied);
            prop_assert!((start..end).all(|index| document.is_styled(StyleTag::Bold, index)));
        }
    }

    #[test]
    fn prop_style_maps_match_naive_oracle(text in any_text()) {
        let mut engine = StyleSpanEngine::new(true);
        engine.rebuild_from_text(&text);
        for tag in StyleTag::ALL {
            let map = engine.map(tag).unwrap();
            let expected = oracle::style_flags(&text, tag.open_tag(), tag.close_tag());
            prop_assert_eq!(&map.as_slice()[..map.poor_len()], expected.as_slice());
            prop_assert!(!map.as_slice()[map.poor_len()]);
        }
    }
}
