//! Test-only in-memory row source and canned checklist rows used by unit
//! tests here and by the data crate's integration tests.

use crate::source::{RawRow, RawValue, RowSource, SourceError};

/// In-memory `RowSource` yielding a fixed row set.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    label: String,
    rows: Vec<RawRow>,
}

impl VecSource {
    /// Wrap a fixed row set.
    #[must_use]
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self::labelled("in-memory rows", rows)
    }

    /// Wrap a fixed row set with a custom diagnostic label.
    #[must_use]
    pub fn labelled(label: impl Into<String>, rows: Vec<RawRow>) -> Self {
        Self {
            label: label.into(),
            rows,
        }
    }
}

impl RowSource for VecSource {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn rows(&self) -> Result<Vec<RawRow>, SourceError> {
        Ok(self.rows.clone())
    }
}

/// `RowSource` that always fails, for load-failure paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSource;

impl RowSource for FailingSource {
    fn describe(&self) -> String {
        "failing stub".into()
    }

    fn rows(&self) -> Result<Vec<RawRow>, SourceError> {
        Err(SourceError::Fetch {
            url: "stub://checklist".into(),
            message: "stubbed transport failure".into(),
        })
    }
}

/// Minimal valid row: sequence, scientific name, and rank.
#[must_use]
pub fn taxon_row(sequence: u32, scientific_name: &str, rank: &str) -> RawRow {
    RawRow::new()
        .with("sequence", RawValue::Number(f64::from(sequence)))
        .with("scientific_name", RawValue::Text(scientific_name.into()))
        .with("taxon_rank", RawValue::Text(rank.into()))
}

/// Species row with the commonly exercised optional columns populated.
#[must_use]
pub fn species_row(
    sequence: u32,
    scientific_name: &str,
    family: &str,
    english_name: &str,
    authority: &str,
) -> RawRow {
    taxon_row(sequence, scientific_name, "species")
        .with("order", RawValue::Text("Passeriformes".into()))
        .with("family", RawValue::Text(family.into()))
        .with("english_name_avilist", RawValue::Text(english_name.into()))
        .with("authority", RawValue::Text(authority.into()))
        .with("iucn_red_list_category", RawValue::Text("LC".into()))
        .with("extinct_or_possibly_extinct", RawValue::Text("No".into()))
}

/// A small checklist slice spanning every rank plus two far-apart species.
#[must_use]
pub fn sample_rows() -> Vec<RawRow> {
    vec![
        taxon_row(1, "Passeriformes", "order"),
        taxon_row(2, "Corvidae", "family")
            .with("order", RawValue::Text("Passeriformes".into()))
            .with(
                "family_english_name",
                RawValue::Text("Crows, Jays, and Magpies".into()),
            ),
        taxon_row(3, "Corvus", "genus")
            .with("order", RawValue::Text("Passeriformes".into()))
            .with("family", RawValue::Text("Corvidae".into())),
        species_row(4, "Corvus corone", "Corvidae", "Carrion Crow", "Linnaeus, 1758").with(
            "species_range",
            RawValue::Text("Western Europe east to the Caspian Sea".into()),
        ),
        taxon_row(5, "Corvus corone orientalis", "subspecies")
            .with("order", RawValue::Text("Passeriformes".into()))
            .with("family", RawValue::Text("Corvidae".into())),
        species_row(
            22251,
            "Acridotheres tristis",
            "Sturnidae",
            "Common Myna",
            "Linnaeus, 1766",
        ),
        species_row(
            22252,
            "Acrocephalus melanopogon",
            "Acrocephalidae",
            "Moustached Warbler",
            "(Temminck, 1823)",
        ),
    ]
}
