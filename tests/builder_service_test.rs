//! Tests for BuilderService against the tennis elbow SNOMED CT subgraph

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rstest::{fixture, rstest};

use codelist_builder::application::services::{BuilderService, NO_SEARCH_TERM};
use codelist_builder::application::ApplicationError;
use codelist_builder::domain::{
    parse_updates, CodingSystem, DecisionSet, DisplayFilter, DomainError, Draft, SearchSelection,
    Status,
};
use codelist_builder::infrastructure::{load_draft, FileTerminology};
use codelist_builder::util::testing;

const ELBOW_CODES: [&str; 10] = [
    "116309007", // Finding of elbow region
    "128133004", // Disorder of elbow
    "239964003", // Soft tissue lesion of elbow region
    "35185008",  // Enthesopathy of elbow region
    "73583000",  // Epicondylitis
    "202855006", // Lateral epicondylitis
    "429554009", // Arthropathy of elbow
    "439656005", // Arthritis of elbow
    "298869002", // Finding of elbow joint
    "298163003", // Elbow joint inflamed
];

fn resource(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/resources")
        .join(name)
}

#[fixture]
fn service() -> BuilderService {
    testing::init_test_setup();
    let terminology = FileTerminology::load(&resource("elbow.toml")).expect("load terminology");
    BuilderService::new(Arc::new(terminology))
}

#[fixture]
fn draft() -> Draft {
    load_draft(&resource("elbow_draft.toml")).expect("load draft")
}

fn elbow_statuses(statuses: &BTreeMap<String, Status>) -> BTreeMap<&'static str, &'static str> {
    ELBOW_CODES
        .iter()
        .map(|code| (*code, statuses[*code].token()))
        .collect()
}

fn expected(tokens: [&'static str; 10]) -> BTreeMap<&'static str, &'static str> {
    ELBOW_CODES.iter().copied().zip(tokens).collect()
}

#[rstest]
fn given_include_when_updating_then_only_descendants_are_included(service: BuilderService, draft: Draft) {
    let updates = parse_updates(&[("35185008", "+")]).unwrap();

    let outcome = service.update(&draft, &updates).unwrap();

    assert_eq!(
        elbow_statuses(&outcome.statuses),
        expected(["?", "?", "?", "+", "(+)", "(+)", "?", "?", "?", "?"])
    );
}

#[rstest]
fn given_second_batch_when_updating_then_cleared_code_inherits_from_new_include(
    service: BuilderService,
    mut draft: Draft,
) {
    let first = parse_updates(&[("35185008", "+")]).unwrap();
    draft.decisions = service.update(&draft, &first).unwrap().decisions;

    let second = parse_updates(&[("35185008", "-"), ("116309007", "+"), ("35185008", "?")]).unwrap();
    let outcome = service.update(&draft, &second).unwrap();

    assert_eq!(
        elbow_statuses(&outcome.statuses),
        expected(["+", "(+)", "(+)", "(+)", "(+)", "(+)", "(+)", "(+)", "(+)", "(+)"])
    );
    assert_eq!(
        outcome.decisions,
        DecisionSet::new(["116309007"], Vec::<String>::new()).unwrap()
    );
}

#[rstest]
fn given_whole_draft_when_building_view_then_renders_golden_tree(service: BuilderService, draft: Draft) {
    let view = service
        .draft_view(&draft, &SearchSelection::NoSelection, DisplayFilter::All)
        .unwrap();

    let headings: Vec<&str> = view.tree_tables.iter().map(|t| t.heading.as_str()).collect();
    assert_eq!(headings, ["Disorder", "Finding"]);

    let rows: Vec<(String, &str)> = view.tree_tables[1]
        .rows
        .iter()
        .map(|row| (row.prefix(), row.code.as_str()))
        .collect();
    let golden = [
        ("", "116309007"),
        ("├", "128133004"),
        ("│├", "429554009"),
        ("││└", "439656005"),
        ("││ └", "202855006"),
        ("│├", "35185008"),
        ("││└", "73583000"),
        ("││ └", "202855006"),
        ("│└", "239964003"),
        ("└", "298869002"),
        (" ├", "429554009"),
        (" │└", "439656005"),
        (" │ └", "202855006"),
        (" └", "298163003"),
        ("  └", "439656005"),
        ("   └", "202855006"),
    ];
    assert_eq!(
        rows,
        golden
            .iter()
            .map(|(prefix, code)| (prefix.to_string(), *code))
            .collect::<Vec<_>>()
    );
    assert_eq!(view.tree_tables[0].rows.len(), 1);
    assert_eq!(view.tree_tables[0].rows[0].code, "76248009");
}

#[rstest]
fn given_draft_with_searches_when_building_view_then_lists_searches_and_unassigned(
    service: BuilderService,
    draft: Draft,
) {
    let selection = SearchSelection::ExplicitSearch("epicondylitis".to_string());

    let view = service.draft_view(&draft, &selection, DisplayFilter::All).unwrap();

    let terms: Vec<(&str, bool)> = view
        .searches
        .iter()
        .map(|s| (s.term.as_str(), s.active))
        .collect();
    assert_eq!(
        terms,
        [("elbow", false), ("epicondylitis", true), (NO_SEARCH_TERM, false)]
    );
    assert_eq!(view.searches[2].slug, None);

    assert_eq!(view.tree_tables.len(), 1);
    let codes: Vec<&str> = view.tree_tables[0].rows.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, ["73583000", "202855006"]);
}

#[rstest]
fn given_unassigned_selection_when_building_view_then_shows_codes_without_search(
    service: BuilderService,
    draft: Draft,
) {
    let view = service
        .draft_view(&draft, &SearchSelection::UnassignedCodes, DisplayFilter::All)
        .unwrap();

    assert_eq!(view.tree_tables.len(), 1);
    assert_eq!(view.tree_tables[0].heading, "Disorder");
    assert_eq!(view.tree_tables[0].rows[0].term, "Enthesopathy (disorder)");
    assert!(view.searches.last().is_some_and(|s| s.active));
}

#[rstest]
fn given_included_filter_when_building_view_then_tree_starts_at_included_ancestor(
    service: BuilderService,
    mut draft: Draft,
) {
    draft.decisions = DecisionSet::new(["35185008"], Vec::<String>::new()).unwrap();

    let view = service
        .draft_view(&draft, &SearchSelection::NoSelection, DisplayFilter::Included)
        .unwrap();

    assert_eq!(view.filter, Some("included"));
    assert_eq!(view.tree_tables.len(), 1);
    assert_eq!(view.tree_tables[0].rows[0].code, "35185008");
    assert!(view.tree_tables[0].rows.iter().all(|r| r.included));
    assert_eq!(view.included_codes, ["202855006", "35185008", "73583000"]);
    assert!(view.excluded_codes.is_empty());
}

#[rstest]
fn given_unknown_search_slug_when_building_view_then_fails(service: BuilderService, draft: Draft) {
    let selection = SearchSelection::ExplicitSearch("nope".to_string());

    let result = service.draft_view(&draft, &selection, DisplayFilter::All);

    assert!(matches!(result, Err(ApplicationError::SearchNotFound(slug)) if slug == "nope"));
}

#[rstest]
fn given_draft_for_other_coding_system_when_building_view_then_fails(
    service: BuilderService,
    mut draft: Draft,
) {
    draft.coding_system = CodingSystem::Ctv3;

    let result = service.draft_view(&draft, &SearchSelection::NoSelection, DisplayFilter::All);

    assert!(matches!(
        result,
        Err(ApplicationError::CodingSystemMismatch {
            draft: CodingSystem::Ctv3,
            terminology: CodingSystem::SnomedCt
        })
    ));
}

#[rstest]
fn given_code_missing_from_terminology_when_updating_then_fails(service: BuilderService, mut draft: Draft) {
    draft.codes.insert("999999".to_string());

    let result = service.update(&draft, &[]);

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::UnknownCode(code))) if code == "999999"
    ));
}

#[rstest]
fn given_include_and_nested_exclude_when_exporting_then_lists_included_codes_by_code(
    service: BuilderService,
    mut draft: Draft,
) {
    draft.decisions = DecisionSet::new(["128133004"], ["35185008", "429554009"]).unwrap();

    let exported = service.export(&draft).unwrap();

    let codes: Vec<&str> = exported.iter().map(|(code, _)| code.as_str()).collect();
    assert_eq!(codes, ["128133004", "239964003"]);
    assert_eq!(exported[1].1, "Soft tissue lesion of elbow region (disorder)");
}

#[rstest]
fn given_include_and_nested_exclude_when_building_definition_then_groups_excludes_under_include(
    service: BuilderService,
    mut draft: Draft,
) {
    draft.decisions = DecisionSet::new(["116309007"], ["35185008"]).unwrap();

    let rows = service.definition(&draft).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].code, "116309007");
    assert_eq!(rows[0].name, "Finding of elbow region (finding)");
    let excluded: Vec<&str> = rows[0]
        .excluded_descendants
        .iter()
        .map(|r| r.code.as_str())
        .collect();
    assert_eq!(excluded, ["35185008"]);
}

#[rstest]
fn given_several_includes_and_excludes_when_building_definition_then_orders_by_name(
    service: BuilderService,
    mut draft: Draft,
) {
    draft.decisions = DecisionSet::new(
        ["298869002", "128133004"],
        ["439656005", "35185008", "298163003"],
    )
    .unwrap();

    let rows = service.definition(&draft).unwrap();

    let summary: Vec<(&str, Vec<&str>)> = rows
        .iter()
        .map(|row| {
            let excluded = row.excluded_descendants.iter().map(|r| r.code.as_str()).collect();
            (row.code.as_str(), excluded)
        })
        .collect();
    assert_eq!(
        summary,
        [
            ("128133004", vec!["439656005", "35185008"]),
            ("298869002", vec!["439656005", "298163003"]),
        ]
    );
}

#[rstest]
fn given_empty_draft_when_adding_searches_then_codes_are_shared_between_them(service: BuilderService) {
    let mut draft = Draft::new("Test Codelist", CodingSystem::SnomedCt);

    let first = service
        .add_search(&mut draft, "Elbow joint", ["298869002", "298163003"].map(String::from).into())
        .unwrap();
    assert_eq!(first.slug, "elbow-joint");
    assert_eq!(first.codes.len(), 2);
    assert_eq!(draft.all_codes().len(), 2);

    let second = service
        .add_search(&mut draft, "inflamed", ["298163003".to_string()].into())
        .unwrap();
    assert_eq!(second.codes.len(), 1);
    assert_eq!(draft.searches.len(), 2);
    assert_eq!(draft.all_codes().len(), 2, "no new codes");

    let view = service
        .draft_view(&draft, &SearchSelection::ExplicitSearch("inflamed".into()), DisplayFilter::All)
        .unwrap();
    let terms: Vec<(&str, bool)> = view.searches.iter().map(|e| (e.term.as_str(), e.active)).collect();
    assert_eq!(terms, [("Elbow joint", false), ("inflamed", true)]);
}

#[rstest]
fn given_existing_slug_when_adding_search_then_fails_with_duplicate_search(
    service: BuilderService,
    mut draft: Draft,
) {
    let result = service.add_search(&mut draft, "Elbow", ["73583000".to_string()].into());

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::DuplicateSearch(slug))) if slug == "elbow"
    ));
    assert_eq!(draft.searches.len(), 2);
}

#[rstest]
fn given_code_outside_terminology_when_adding_search_then_leaves_draft_untouched(
    service: BuilderService,
    mut draft: Draft,
) {
    let before = draft.clone();

    let result = service.add_search(&mut draft, "missing", ["999999".to_string()].into());

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::UnknownCode(code))) if code == "999999"
    ));
    assert_eq!(draft, before);
}

#[test]
fn given_ctv3_terminology_when_drafting_whole_terminology_then_uses_its_coding_system() {
    let terminology = FileTerminology::from_parts(
        CodingSystem::Ctv3,
        ".....",
        [
            (".....".to_string(), "X0003".to_string()),
            ("X0003".to_string(), "X00R2".to_string()),
        ],
        BTreeMap::new(),
    );
    let service = BuilderService::new(Arc::new(terminology));

    let draft = service.terminology_draft("command line");
    let statuses = service.statuses(&draft).expect("draft matches terminology");

    assert_eq!(draft.coding_system, CodingSystem::Ctv3);
    assert_eq!(statuses.len(), 3);
    assert!(statuses.values().all(|s| *s == Status::Unknown));
}
