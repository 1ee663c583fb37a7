//! Snapshot persistence round trip: writing a loaded checklist and reading
//! the file back must reproduce the record set exactly, for both editions.

use avilist_core::test_support::{VecSource, sample_rows, species_row};
use avilist_core::{Checklist, Edition, ExtendedRecord, Query, RawRow, RawValue, ShortRecord};
use avilist_data::{open_snapshot, read_snapshot, write_snapshot, EditionChecklist};
use rstest::rstest;

fn short_checklist(rows: Vec<RawRow>) -> Checklist<ShortRecord> {
    Checklist::new(
        Edition::Short.dataset_version(),
        Box::new(VecSource::new(rows)),
    )
}

fn extended_rows() -> Vec<RawRow> {
    vec![
        species_row(4, "Corvus corone", "Corvidae", "Carrion Crow", "Linnaeus, 1758")
            .with(
                "english_name_clements_v2024",
                RawValue::Text("Carrion Crow".into()),
            )
            .with(
                "birds_of_the_world_url",
                RawValue::Text("https://birdsoftheworld.org/bow/species/carcro1".into()),
            )
            .with("gender_of_genus", RawValue::Text("Masculine".into())),
        species_row(
            22252,
            "Acrocephalus melanopogon",
            "Acrocephalidae",
            "Moustached Warbler",
            "(Temminck, 1823)",
        )
        .with("species_code_cornell_lab", RawValue::Text("mouwar1".into())),
    ]
}

#[rstest]
fn short_snapshot_round_trips_every_record() {
    let mut original = short_checklist(sample_rows());
    original.load().expect("sample rows should load");
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = write_snapshot(&original, dir.path()).expect("snapshot should be written");

    let mut restored: Checklist<ShortRecord> =
        open_snapshot(&path).expect("snapshot name should validate");
    assert_eq!(restored.version(), original.version());
    restored.load().expect("snapshot should load");

    assert_eq!(restored.records(), original.records());
}

#[rstest]
fn extended_snapshot_round_trips_urls_and_extras() {
    let mut original: Checklist<ExtendedRecord> = Checklist::new(
        Edition::Extended.dataset_version(),
        Box::new(VecSource::new(extended_rows())),
    );
    original.load().expect("rows should load");
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = write_snapshot(&original, dir.path()).expect("snapshot should be written");

    let mut restored: Checklist<ExtendedRecord> =
        open_snapshot(&path).expect("snapshot name should validate");
    restored.load().expect("snapshot should load");

    assert_eq!(restored.records(), original.records());
    let crow = &restored.records()[0];
    assert_eq!(
        crow.birds_of_the_world_url.as_ref().map(|url| url.as_str()),
        Some("https://birdsoftheworld.org/bow/species/carcro1")
    );
    assert_eq!(crow.gender_of_genus.as_deref(), Some("Masculine"));
}

#[rstest]
fn snapshot_backed_checklist_loads_implicitly_on_find() {
    let mut original = short_checklist(sample_rows());
    original.load().expect("sample rows should load");
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = write_snapshot(&original, dir.path()).expect("snapshot should be written");

    let mut restored: Checklist<ShortRecord> =
        open_snapshot(&path).expect("snapshot name should validate");
    assert!(!restored.is_loaded());
    let query = Query::new().field("genus", "corvus").field("epithet", "corone");
    let hits: Vec<u32> = restored
        .find(&query)
        .expect("query should run")
        .map(|record| record.sequence)
        .collect();
    assert_eq!(hits, vec![4, 5]);
    assert!(restored.is_loaded());
}

#[rstest]
fn read_snapshot_dispatches_the_edition_from_the_stem() {
    let mut original = short_checklist(sample_rows());
    original.load().expect("sample rows should load");
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = write_snapshot(&original, dir.path()).expect("snapshot should be written");

    let restored = read_snapshot(&path).expect("snapshot name should validate");
    assert_eq!(restored.edition(), Edition::Short);
    let EditionChecklist::Short(mut checklist) = restored else {
        panic!("stem suffix names the short edition");
    };
    checklist.load().expect("snapshot should load");
    assert_eq!(checklist.records().len(), original.records().len());
}
