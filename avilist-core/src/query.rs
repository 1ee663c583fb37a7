//! Field-based filter queries over a loaded record store.
//!
//! A [`Query`] is an ordered set of `(field, term)` criteria combined
//! conjunctively. Field names are validated against the edition's known
//! fields, including the virtual `genus`, `epithet` and `subspecies`
//! criteria derived from `scientific_name`, before any record is produced.
//! Evaluation is lazy and restartable: each call to `find` yields a fresh
//! iterator over the store's immutable records with no shared cursor.

use thiserror::Error;

use crate::record::{ChecklistRecord, Edition, IucnCategory, LeanRecord, RecordCore, TaxonRank};

/// Criterion names understood by both editions, including the virtual ones.
pub(crate) const CORE_FIELDS: &[&str] = &[
    "scientific_name",
    "sequence",
    "taxon_rank",
    "order",
    "family",
    "family_english_name",
    "protonym",
    "english_name_avilist",
    "common_name",
    "authority",
    "avibase_id",
    "iucn_red_list_category",
    "extinct_or_possibly_extinct",
    "species_range",
    "genus",
    "epithet",
    "subspecies",
];

/// One criterion value.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// Matched case-insensitively against textual fields.
    Text(String),
    /// Matched against the checklist `sequence`.
    Sequence(u32),
    /// Matched against boolean fields.
    Flag(bool),
}

impl Term {
    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Sequence(_) | Self::Flag(_) => None,
        }
    }

    fn as_sequence(&self) -> Option<u32> {
        match self {
            Self::Sequence(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
            Self::Flag(_) => None,
        }
    }

    fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(value) => Some(*value),
            Self::Text(text) => {
                if text.eq_ignore_ascii_case("yes") || text.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if text.eq_ignore_ascii_case("no") || text.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    None
                }
            }
            Self::Sequence(_) => None,
        }
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Term {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<u32> for Term {
    fn from(value: u32) -> Self {
        Self::Sequence(value)
    }
}

impl From<bool> for Term {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<TaxonRank> for Term {
    fn from(value: TaxonRank) -> Self {
        Self::Text(value.as_str().to_owned())
    }
}

impl From<IucnCategory> for Term {
    fn from(value: IucnCategory) -> Self {
        Self::Text(value.as_str().to_owned())
    }
}

/// Filter criteria for [`Checklist::find`](crate::Checklist::find).
///
/// Fields not named are unconstrained; an empty query matches every record.
///
/// # Examples
/// ```
/// use avilist_core::Query;
///
/// let query = Query::new()
///     .field("genus", "Corvus")
///     .field("epithet", "corone");
/// assert_eq!(query.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    criteria: Vec<(String, Term)>,
}

impl Query {
    /// An empty query matching every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one criterion. Criteria are combined conjunctively.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Term>) -> Self {
        self.criteria.push((name.into(), value.into()));
        self
    }

    /// Number of criteria.
    #[must_use]
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Whether the query carries no criteria.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub(crate) fn criteria(&self) -> &[(String, Term)] {
        &self.criteria
    }

    /// Reject criterion names the edition does not understand.
    pub(crate) fn validate_for<R: ChecklistRecord>(&self) -> Result<(), QueryError> {
        for (name, _) in &self.criteria {
            if !R::known_field(name) {
                return Err(QueryError::UnknownField {
                    field: name.clone(),
                    edition: R::EDITION,
                });
            }
        }
        Ok(())
    }
}

/// Errors raised before query execution begins.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    /// A criterion named a field the edition does not carry.
    #[error("unknown criterion field '{field}' for the {edition} checklist edition")]
    UnknownField { field: String, edition: Edition },
}

/// Lazy sequence of records satisfying a query, in store order.
///
/// Each instance owns its own cursor; exhausting one has no effect on
/// another. Obtain it through [`Checklist::find`](crate::Checklist::find) or
/// [`ChecklistStore::find`](crate::ChecklistStore::find).
#[derive(Debug)]
pub struct Matches<'a, R> {
    records: std::slice::Iter<'a, R>,
    query: &'a Query,
}

impl<'a, R: ChecklistRecord> Matches<'a, R> {
    pub(crate) fn new(records: std::slice::Iter<'a, R>, query: &'a Query) -> Self {
        Self { records, query }
    }

    /// Project every yielded record onto the lean shape.
    ///
    /// The projection does not change which records match.
    #[must_use]
    pub fn lean(self) -> Lean<'a, R> {
        Lean { matches: self }
    }
}

impl<'a, R: ChecklistRecord> Iterator for Matches<'a, R> {
    type Item = &'a R;

    fn next(&mut self) -> Option<Self::Item> {
        let criteria = self.query.criteria();
        self.records
            .by_ref()
            .find(|record| criteria.iter().all(|(field, term)| record.matches(field, term)))
    }
}

/// [`Matches`] adapted to yield [`LeanRecord`] projections.
#[derive(Debug)]
pub struct Lean<'a, R> {
    matches: Matches<'a, R>,
}

impl<R: ChecklistRecord> Iterator for Lean<'_, R> {
    type Item = LeanRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.matches.next().map(ChecklistRecord::to_lean)
    }
}

/// Case-insensitive equality against an optional textual field.
///
/// Absent fields never match.
pub(crate) fn text_matches(term: &Term, value: Option<&str>) -> bool {
    match (term.as_text(), value) {
        (Some(needle), Some(hay)) => hay.eq_ignore_ascii_case(needle),
        _ => false,
    }
}

fn contains_ci(hay: &str, needle: &str) -> bool {
    hay.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
}

/// Evaluate one criterion against the shared base fields.
///
/// Unknown names evaluate to false; `Query::validate_for` rejects them
/// before evaluation starts.
pub(crate) fn match_core(core: &RecordCore, field: &str, term: &Term) -> bool {
    match field {
        "sequence" => term.as_sequence() == Some(core.sequence),
        "scientific_name" => text_matches(term, Some(&core.scientific_name)),
        "taxon_rank" => text_matches(term, Some(core.taxon_rank.as_str())),
        "order" => text_matches(term, core.order.as_deref()),
        "family" => text_matches(term, core.family.as_deref()),
        "family_english_name" => text_matches(term, core.family_english_name.as_deref()),
        "protonym" => text_matches(term, core.protonym.as_deref()),
        "english_name_avilist" | "common_name" => {
            text_matches(term, core.english_name_avilist.as_deref())
        }
        "authority" => text_matches(
            term,
            core.authority.as_ref().map(|a| a.surname.as_str()),
        ),
        "avibase_id" => text_matches(term, core.avibase_id.as_deref()),
        "iucn_red_list_category" => text_matches(
            term,
            core.iucn_red_list_category.map(IucnCategory::as_str),
        ),
        "extinct_or_possibly_extinct" => {
            term.as_flag() == Some(core.extinct_or_possibly_extinct)
        }
        // Containment rather than equality: ranges are free-form prose.
        "species_range" => match (term.as_text(), core.species_range.as_deref()) {
            (Some(needle), Some(hay)) => contains_ci(hay, needle),
            _ => false,
        },
        "genus" => text_matches(term, Some(core.genus())),
        "epithet" => text_matches(term, core.epithet()),
        "subspecies" => {
            core.taxon_rank == TaxonRank::Subspecies
                && text_matches(term, core.subspecies_epithet())
        }
        _ => false,
    }
}
