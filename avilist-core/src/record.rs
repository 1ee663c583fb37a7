//! Typed checklist records: the two edition shapes, the shared base-field
//! template, and the reduced lean projection.
//!
//! The editions form a closed set. `ShortRecord` carries exactly the common
//! base fields; `ExtendedRecord` embeds the same base and adds the extended
//! columns. Both implement [`ChecklistRecord`], the capability set the store
//! and query engine operate through, so no further variants can appear.

use std::{fmt, ops::Deref, str::FromStr};

use thiserror::Error;
use url::Url;

use crate::normalise::{self, SchemaError};
use crate::query::{self, Term};
use crate::source::RawRow;

/// The two published checklist variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Edition {
    /// The reduced-column checklist.
    Short,
    /// The full-column checklist.
    Extended,
}

impl Edition {
    /// Lowercase label used in diagnostics and snapshot metadata.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Extended => "extended",
        }
    }

    /// Suffix the vendor appends to file stems for this edition.
    #[must_use]
    pub const fn stem_suffix(self) -> &'static str {
        match self {
            Self::Short => "-short",
            Self::Extended => "-extended",
        }
    }

    /// Version stem of the current published dataset for this edition.
    #[must_use]
    pub const fn dataset_version(self) -> &'static str {
        match self {
            Self::Short => "AviList-v2025-11Jun-short",
            Self::Extended => "AviList-v2025-11Jun-extended",
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Taxonomic rank of a checklist entry. Closed set; unknown values are
/// rejected during normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TaxonRank {
    Order,
    Family,
    Genus,
    Species,
    Subspecies,
}

impl TaxonRank {
    /// Lowercase label as published in the checklist.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Family => "family",
            Self::Genus => "genus",
            Self::Species => "species",
            Self::Subspecies => "subspecies",
        }
    }

    /// Parse a rank label case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        [
            Self::Order,
            Self::Family,
            Self::Genus,
            Self::Species,
            Self::Subspecies,
        ]
        .into_iter()
        .find(|rank| value.eq_ignore_ascii_case(rank.as_str()))
    }
}

impl fmt::Display for TaxonRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IUCN Red List category code. Closed set of the nine published codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IucnCategory {
    /// Least Concern.
    Lc,
    /// Near Threatened.
    Nt,
    /// Vulnerable.
    Vu,
    /// Endangered.
    En,
    /// Critically Endangered.
    Cr,
    /// Extinct in the Wild.
    Ew,
    /// Extinct.
    Ex,
    /// Data Deficient.
    Dd,
    /// Not Evaluated.
    Ne,
}

impl IucnCategory {
    /// Two-letter code as published in the checklist.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lc => "LC",
            Self::Nt => "NT",
            Self::Vu => "VU",
            Self::En => "EN",
            Self::Cr => "CR",
            Self::Ew => "EW",
            Self::Ex => "EX",
            Self::Dd => "DD",
            Self::Ne => "NE",
        }
    }

    /// Parse a category code case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        [
            Self::Lc,
            Self::Nt,
            Self::Vu,
            Self::En,
            Self::Cr,
            Self::Ew,
            Self::Ex,
            Self::Dd,
            Self::Ne,
        ]
        .into_iter()
        .find(|category| value.eq_ignore_ascii_case(category.as_str()))
    }
}

impl fmt::Display for IucnCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Taxonomic naming authority decomposed from a free-text citation.
///
/// Citations take the shape `Surname, Initials, Year`. Surnames may contain
/// commas (multi-author citations), so parsing splits from the right: the
/// last segment is the year, the segment before it the initials, and
/// everything remaining the surname. Surrounding parentheses are dropped.
///
/// # Examples
/// ```
/// use avilist_core::Authority;
///
/// let authority: Authority = "(Temminck, 1823)".parse().expect("valid citation");
/// assert_eq!(authority.surname, "Temminck");
/// assert_eq!(authority.year, 1823);
/// assert!(authority.initials.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Authority {
    /// Author surname, possibly a joined multi-author string.
    pub surname: String,
    /// Author initials; empty when the citation carries none.
    pub initials: String,
    /// Year of the original description.
    pub year: i32,
}

/// Errors raised when decomposing an authority citation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseAuthorityError {
    /// The citation was blank after trimming.
    #[error("citation is empty")]
    Empty,
    /// No comma-separated year component was present.
    #[error("citation has no year component")]
    MissingYear,
    /// The year component did not parse as an integer.
    #[error("citation year '{0}' is not numeric")]
    NonNumericYear(String),
}

impl FromStr for Authority {
    type Err = ParseAuthorityError;

    fn from_str(citation: &str) -> Result<Self, Self::Err> {
        let cleaned = citation
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .trim();
        if cleaned.is_empty() {
            return Err(ParseAuthorityError::Empty);
        }
        let (name_part, year_part) = cleaned
            .rsplit_once(',')
            .ok_or(ParseAuthorityError::MissingYear)?;
        let year_part = year_part.trim();
        let year: i32 = year_part
            .parse()
            .map_err(|_| ParseAuthorityError::NonNumericYear(year_part.to_owned()))?;
        let (surname, initials) = match name_part.rsplit_once(',') {
            Some((surname, initials)) => (surname.trim(), initials.trim()),
            None => (name_part.trim(), ""),
        };
        Ok(Self {
            surname: surname.to_owned(),
            initials: initials.to_owned(),
            year,
        })
    }
}

impl fmt::Display for Authority {
    /// Canonical citation form; re-parsing it reproduces an equal value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.initials.is_empty() {
            write!(f, "{}, {}", self.surname, self.year)
        } else {
            write!(f, "{}, {}, {}", self.surname, self.initials, self.year)
        }
    }
}

/// The fixed 7-field projection shared by both editions.
///
/// Always derived from a full record via [`ChecklistRecord::to_lean`]; never
/// constructed from raw data. Identity fields are preserved verbatim.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeanRecord {
    pub scientific_name: String,
    pub sequence: u32,
    pub taxon_rank: TaxonRank,
    pub family: Option<String>,
    pub order: Option<String>,
    pub protonym: Option<String>,
    pub english_name_avilist: Option<String>,
}

impl LeanRecord {
    /// First part of the scientific name.
    #[must_use]
    pub fn genus(&self) -> &str {
        name_part(&self.scientific_name, 0).unwrap_or(&self.scientific_name)
    }

    /// Species epithet, absent on records above species rank.
    #[must_use]
    pub fn epithet(&self) -> Option<&str> {
        name_part(&self.scientific_name, 1)
    }

    /// The checklist English name.
    #[must_use]
    pub fn common_name(&self) -> Option<&str> {
        self.english_name_avilist.as_deref()
    }
}

/// The base-field template common to both editions.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordCore {
    /// `"Genus epithet"` binomial (or the bare taxon name above species
    /// rank). Never empty.
    pub scientific_name: String,
    /// Canonical checklist position. Unique and strictly increasing within
    /// one loaded edition.
    pub sequence: u32,
    pub taxon_rank: TaxonRank,
    pub order: Option<String>,
    pub family: Option<String>,
    pub family_english_name: Option<String>,
    pub protonym: Option<String>,
    pub english_name_avilist: Option<String>,
    pub authority: Option<Authority>,
    pub avibase_id: Option<String>,
    pub bibliographic_details: Option<String>,
    pub decision_summary: Option<String>,
    pub extinct_or_possibly_extinct: bool,
    pub iucn_red_list_category: Option<IucnCategory>,
    pub species_range: Option<String>,
}

impl RecordCore {
    pub(crate) fn from_row(row: &RawRow) -> Result<Self, SchemaError> {
        let sequence = normalise::sequence(row)?;
        let scientific_name = normalise::required_text(row, "scientific_name", sequence)?;
        let taxon_rank = normalise::taxon_rank(row, sequence)?;
        Ok(Self {
            scientific_name,
            sequence,
            taxon_rank,
            order: normalise::optional_text(row, "order"),
            family: normalise::optional_text(row, "family"),
            family_english_name: normalise::optional_text(row, "family_english_name"),
            protonym: normalise::optional_text(row, "protonym"),
            english_name_avilist: normalise::optional_text(row, "english_name_avilist"),
            authority: normalise::optional_authority(row, "authority", sequence)?,
            avibase_id: normalise::optional_text(row, "avibase_id"),
            bibliographic_details: normalise::optional_text(row, "bibliographic_details"),
            decision_summary: normalise::optional_text(row, "decision_summary"),
            extinct_or_possibly_extinct: normalise::flag(
                row,
                "extinct_or_possibly_extinct",
                sequence,
            )?,
            iucn_red_list_category: normalise::optional_iucn(
                row,
                "iucn_red_list_category",
                sequence,
            )?,
            species_range: normalise::optional_text(row, "species_range"),
        })
    }

    /// Project onto the shared lean shape. Total and idempotent.
    #[must_use]
    pub fn to_lean(&self) -> LeanRecord {
        LeanRecord {
            scientific_name: self.scientific_name.clone(),
            sequence: self.sequence,
            taxon_rank: self.taxon_rank,
            family: self.family.clone(),
            order: self.order.clone(),
            protonym: self.protonym.clone(),
            english_name_avilist: self.english_name_avilist.clone(),
        }
    }

    /// First part of the scientific name.
    #[must_use]
    pub fn genus(&self) -> &str {
        name_part(&self.scientific_name, 0).unwrap_or(&self.scientific_name)
    }

    /// Species epithet, absent on records above species rank.
    #[must_use]
    pub fn epithet(&self) -> Option<&str> {
        name_part(&self.scientific_name, 1)
    }

    /// Subspecific epithet, present only on trinomials.
    #[must_use]
    pub fn subspecies_epithet(&self) -> Option<&str> {
        name_part(&self.scientific_name, 2)
    }

    /// The checklist English name.
    #[must_use]
    pub fn common_name(&self) -> Option<&str> {
        self.english_name_avilist.as_deref()
    }
}

fn name_part(scientific_name: &str, index: usize) -> Option<&str> {
    scientific_name.split_whitespace().nth(index)
}

/// Capability set shared by the edition record shapes.
///
/// The trait is the seam between the record schema on one side and the store
/// and query engine on the other: construction from a normalised row, access
/// to the shared base fields, the lean projection, and criterion matching.
pub trait ChecklistRecord: Sized + fmt::Debug {
    /// Edition this record shape belongs to.
    const EDITION: Edition;

    /// Assemble a record from one raw row, normalising every field.
    fn from_row(row: &RawRow) -> Result<Self, SchemaError>;

    /// The shared base fields.
    fn core(&self) -> &RecordCore;

    /// Whether `field` is a criterion this edition can be queried by,
    /// including the virtual `genus`, `epithet` and `subspecies` fields.
    fn known_field(field: &str) -> bool;

    /// Evaluate one criterion against this record.
    fn matches(&self, field: &str, term: &Term) -> bool;

    /// Project onto the shared lean shape. Total and idempotent.
    fn to_lean(&self) -> LeanRecord {
        self.core().to_lean()
    }
}

/// A record of the short checklist edition: exactly the base fields.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShortRecord {
    core: RecordCore,
}

impl Deref for ShortRecord {
    type Target = RecordCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

impl ChecklistRecord for ShortRecord {
    const EDITION: Edition = Edition::Short;

    fn from_row(row: &RawRow) -> Result<Self, SchemaError> {
        Ok(Self {
            core: RecordCore::from_row(row)?,
        })
    }

    fn core(&self) -> &RecordCore {
        &self.core
    }

    fn known_field(field: &str) -> bool {
        query::CORE_FIELDS.contains(&field)
    }

    fn matches(&self, field: &str, term: &Term) -> bool {
        query::match_core(&self.core, field, term)
    }
}

/// A record of the extended checklist edition: the base fields plus the
/// extended columns.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtendedRecord {
    core: RecordCore,
    pub english_name_clements_v2024: Option<String>,
    pub english_name_birdlife_v9: Option<String>,
    pub birdlife_datazone_url: Option<Url>,
    pub birds_of_the_world_url: Option<Url>,
    pub original_description_url: Option<Url>,
    pub gender_of_genus: Option<String>,
    pub proposal_number: Option<String>,
    pub species_code_cornell_lab: Option<String>,
    pub title_of_original_description: Option<String>,
    pub type_locality: Option<String>,
    pub type_species_of_genus: Option<String>,
}

impl ExtendedRecord {
    /// First available English name across the three authority lists.
    #[must_use]
    pub fn common_name(&self) -> Option<&str> {
        self.core
            .english_name_avilist
            .as_deref()
            .or(self.english_name_clements_v2024.as_deref())
            .or(self.english_name_birdlife_v9.as_deref())
    }
}

impl Deref for ExtendedRecord {
    type Target = RecordCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

/// Criteria only the extended edition understands.
const EXTENDED_FIELDS: &[&str] = &[
    "english_name_clements_v2024",
    "english_name_birdlife_v9",
    "gender_of_genus",
    "proposal_number",
    "species_code_cornell_lab",
];

impl ChecklistRecord for ExtendedRecord {
    const EDITION: Edition = Edition::Extended;

    fn from_row(row: &RawRow) -> Result<Self, SchemaError> {
        let core = RecordCore::from_row(row)?;
        let sequence = core.sequence;
        Ok(Self {
            core,
            english_name_clements_v2024: normalise::optional_text(
                row,
                "english_name_clements_v2024",
            ),
            english_name_birdlife_v9: normalise::optional_text(row, "english_name_birdlife_v9"),
            birdlife_datazone_url: normalise::optional_url(row, "birdlife_datazone_url", sequence)?,
            birds_of_the_world_url: normalise::optional_url(
                row,
                "birds_of_the_world_url",
                sequence,
            )?,
            original_description_url: normalise::optional_url(
                row,
                "original_description_url",
                sequence,
            )?,
            gender_of_genus: normalise::optional_text(row, "gender_of_genus"),
            proposal_number: normalise::optional_text(row, "proposal_number"),
            species_code_cornell_lab: normalise::optional_text(row, "species_code_cornell_lab"),
            title_of_original_description: normalise::optional_text(
                row,
                "title_of_original_description",
            ),
            type_locality: normalise::optional_text(row, "type_locality"),
            type_species_of_genus: normalise::optional_text(row, "type_species_of_genus"),
        })
    }

    fn core(&self) -> &RecordCore {
        &self.core
    }

    fn known_field(field: &str) -> bool {
        query::CORE_FIELDS.contains(&field) || EXTENDED_FIELDS.contains(&field)
    }

    fn matches(&self, field: &str, term: &Term) -> bool {
        match field {
            // The extended edition checks all three English-name columns.
            "common_name" => {
                query::text_matches(term, self.core.english_name_avilist.as_deref())
                    || query::text_matches(term, self.english_name_clements_v2024.as_deref())
                    || query::text_matches(term, self.english_name_birdlife_v9.as_deref())
            }
            "english_name_clements_v2024" => {
                query::text_matches(term, self.english_name_clements_v2024.as_deref())
            }
            "english_name_birdlife_v9" => {
                query::text_matches(term, self.english_name_birdlife_v9.as_deref())
            }
            "gender_of_genus" => query::text_matches(term, self.gender_of_genus.as_deref()),
            "proposal_number" => query::text_matches(term, self.proposal_number.as_deref()),
            "species_code_cornell_lab" => {
                query::text_matches(term, self.species_code_cornell_lab.as_deref())
            }
            _ => query::match_core(&self.core, field, term),
        }
    }
}
