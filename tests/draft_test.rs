//! Tests for draft documents on disk and their searches

use std::collections::BTreeSet;
use std::path::Path;

use tempfile::TempDir;

use codelist_builder::domain::{CodingSystem, DecisionSet, DomainError, Draft, Search};
use codelist_builder::infrastructure::{load_draft, save_draft, InfraError};

#[test]
fn given_saved_draft_when_loading_then_gets_same_draft_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("draft.toml");
    let mut draft = Draft::new("Beta blockers", CodingSystem::Bnf);
    draft.codes.insert("0204".to_string());
    draft.decisions = DecisionSet::new(["020400"], ["0204000C0"]).unwrap();
    draft.searches.push(Search::new("propranolol", ["0204000R0".to_string()]));

    save_draft(&path, &draft).expect("save draft");
    let loaded = load_draft(&path).expect("load draft");

    assert_eq!(loaded, draft);
}

#[test]
fn given_missing_file_when_loading_then_fails_with_io_error() {
    let result = load_draft(Path::new("/definitely/not/here.toml"));

    assert!(matches!(result, Err(InfraError::Io { .. })));
}

#[test]
fn given_malformed_toml_when_loading_then_fails_with_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("draft.toml");
    std::fs::write(&path, "name = ").unwrap();

    let result = load_draft(&path);

    assert!(matches!(result, Err(InfraError::Parse { path: p, .. }) if p == path));
}

const SWIMMING: &str = "1067731000000107";
const SYNCHRONISED: &str = "1068181000000106";

fn codes(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

#[test]
fn given_search_over_seeded_codes_when_removed_then_its_codes_leave_the_draft() {
    let mut draft = Draft::with_codes("Test Codelist", CodingSystem::SnomedCt, codes(&[SWIMMING, SYNCHRONISED]));
    draft.add_search("synchronised", codes(&[SYNCHRONISED])).unwrap();

    let removed = draft.remove_search("synchronised").expect("search exists");

    assert_eq!(removed.term, "synchronised");
    assert!(draft.searches.is_empty());
    assert_eq!(draft.all_codes(), BTreeSet::from([SWIMMING.to_string()]));
}

#[test]
fn given_overlapping_searches_when_one_removed_then_shared_codes_stay() {
    let mut draft = Draft::new("Test Codelist", CodingSystem::SnomedCt);
    draft.add_search("synchronised", codes(&[SYNCHRONISED])).unwrap();
    draft.add_search("swimming", codes(&[SWIMMING, SYNCHRONISED])).unwrap();

    draft.remove_search("swimming").expect("search exists");
    assert_eq!(draft.searches.len(), 1);
    assert_eq!(draft.all_codes(), BTreeSet::from([SYNCHRONISED.to_string()]));

    draft.add_search("swimming", codes(&[SWIMMING, SYNCHRONISED])).unwrap();
    draft.remove_search("synchronised").expect("search exists");
    assert_eq!(draft.searches.len(), 1);
    assert_eq!(draft.all_codes().len(), 2);
}

#[test]
fn given_decided_code_when_its_search_removed_then_code_stays() {
    let mut draft = Draft::with_codes("Test Codelist", CodingSystem::SnomedCt, codes(&[SWIMMING]));
    draft.add_search("swimming", codes(&[SWIMMING])).unwrap();
    draft.decisions = DecisionSet::new([SWIMMING], Vec::<String>::new()).unwrap();

    draft.remove_search("swimming").expect("search exists");

    assert!(draft.codes.contains(SWIMMING));
    assert!(draft.remove_search("swimming").is_none());
}

#[test]
fn given_existing_slug_when_adding_search_then_fails() {
    let mut draft = Draft::new("Test Codelist", CodingSystem::SnomedCt);
    draft.add_search("Swimming", codes(&[SWIMMING])).unwrap();

    let result = draft.add_search("swimming!", codes(&[SYNCHRONISED]));

    assert_eq!(result, Err(DomainError::DuplicateSearch("swimming".to_string())));
    assert_eq!(draft.all_codes(), BTreeSet::from([SWIMMING.to_string()]));
}
