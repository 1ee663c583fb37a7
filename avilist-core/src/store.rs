//! The record store and the per-edition checklist client.
//!
//! A [`ChecklistStore`] owns the validated, ordered records of one edition
//! and the load lifecycle (`Unloaded -> Loading -> Loaded`). Loading is
//! all-or-nothing: the incoming row sequence is consumed and validated in
//! full before anything becomes visible, and any failure leaves the store in
//! its prior state. A [`Checklist`] pairs a store with its configured
//! default row source and exposes the public query surface.

use log::{debug, warn};
use thiserror::Error;

use crate::normalise::SchemaError;
use crate::query::{Matches, Query, QueryError};
use crate::record::{ChecklistRecord, Edition, ExtendedRecord, ShortRecord};
use crate::source::{RowSource, SourceError};

/// Lifecycle state of a record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// No records held.
    Unloaded,
    /// A load is consuming and validating a row source.
    Loading,
    /// A full, validated record set is committed.
    Loaded,
}

/// Errors surfaced by [`ChecklistStore::load`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// The row source failed before producing a complete sequence.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// A row failed validation; nothing was committed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Ordered, immutable collection of one edition's records.
#[derive(Debug)]
pub struct ChecklistStore<R> {
    records: Vec<R>,
    state: LoadState,
}

impl<R> Default for ChecklistStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> ChecklistStore<R> {
    /// An empty, unloaded store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
            state: LoadState::Unloaded,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> LoadState {
        self.state
    }

    /// Whether a full record set is committed. Pure; no side effects.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self.state, LoadState::Loaded)
    }

    /// The committed records in checklist `sequence` order.
    #[must_use]
    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// Number of committed records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop all records. Always succeeds; idempotent.
    pub fn unload(&mut self) {
        self.records = Vec::new();
        self.state = LoadState::Unloaded;
    }
}

impl<R: ChecklistRecord> ChecklistStore<R> {
    /// Replace the store's contents with the rows produced by `source`.
    ///
    /// The source is consumed fully and every row validated before anything
    /// is committed, so the `sequence` uniqueness and ordering invariant
    /// holds across the whole set. On failure the store keeps whatever
    /// contents and state it had before the call.
    pub fn load(&mut self, source: &dyn RowSource) -> Result<usize, LoadError> {
        let previous = self.state;
        self.state = LoadState::Loading;
        match Self::collect(source) {
            Ok(records) => {
                let count = records.len();
                self.records = records;
                self.state = LoadState::Loaded;
                debug!(
                    "committed {count} {} records from {}",
                    R::EDITION,
                    source.describe()
                );
                Ok(count)
            }
            Err(error) => {
                self.state = previous;
                Err(error)
            }
        }
    }

    fn collect(source: &dyn RowSource) -> Result<Vec<R>, LoadError> {
        let rows = source.rows()?;
        let mut records = Vec::with_capacity(rows.len());
        let mut previous: Option<u32> = None;
        for row in &rows {
            let record = R::from_row(row)?;
            let sequence = record.core().sequence;
            if let Some(last) = previous
                && sequence <= last
            {
                return Err(SchemaError::SequenceOrder {
                    sequence,
                    previous: last,
                }
                .into());
            }
            previous = Some(sequence);
            records.push(record);
        }
        Ok(records)
    }

    /// Evaluate `query` over the committed records.
    ///
    /// Criterion names are validated before any record is produced. The
    /// returned iterator is lazy, finite, and restartable: calling `find`
    /// again yields an independent sequence.
    pub fn find<'a>(&'a self, query: &'a Query) -> Result<Matches<'a, R>, QueryError> {
        query.validate_for::<R>()?;
        Ok(Matches::new(self.records.iter(), query))
    }
}

/// Errors surfaced by [`Checklist::find`].
#[derive(Debug, Error)]
pub enum FindError {
    /// The implicit load triggered by the query failed.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// The query named an unknown criterion field.
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// One edition's checklist client: a record store plus its configured
/// default row source.
///
/// # Examples
/// ```
/// use avilist_core::{
///     Checklist, Query, RawRow, RawValue, RowSource, ShortRecord, SourceError,
/// };
///
/// #[derive(Debug)]
/// struct CannedRows(Vec<RawRow>);
///
/// impl RowSource for CannedRows {
///     fn describe(&self) -> String {
///         "canned rows".into()
///     }
///
///     fn rows(&self) -> Result<Vec<RawRow>, SourceError> {
///         Ok(self.0.clone())
///     }
/// }
///
/// let rows = vec![
///     RawRow::new()
///         .with("sequence", RawValue::Number(1.0))
///         .with("scientific_name", RawValue::Text("Corvus corone".into()))
///         .with("taxon_rank", RawValue::Text("species".into())),
/// ];
/// let mut checklist: Checklist<ShortRecord> =
///     Checklist::new("example", Box::new(CannedRows(rows)));
///
/// // Querying an unloaded checklist triggers an implicit load.
/// let query = Query::new().field("genus", "corvus");
/// let hits: Vec<_> = checklist.find(&query).expect("query should run").collect();
/// assert_eq!(hits.len(), 1);
/// assert!(checklist.is_loaded());
/// ```
#[derive(Debug)]
pub struct Checklist<R> {
    version: String,
    source: Box<dyn RowSource>,
    store: ChecklistStore<R>,
}

impl<R: ChecklistRecord> Checklist<R> {
    /// Construct a client for `version` backed by `source`.
    #[must_use]
    pub fn new(version: impl Into<String>, source: Box<dyn RowSource>) -> Self {
        Self {
            version: version.into(),
            source,
            store: ChecklistStore::new(),
        }
    }

    /// Edition served by this client.
    #[must_use]
    pub fn edition(&self) -> Edition {
        R::EDITION
    }

    /// Dataset version stem, used for snapshot file names.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Load (or reload) the store from the configured source.
    ///
    /// A reload replaces the prior contents atomically; on failure the
    /// previously loaded set stays intact.
    pub fn load(&mut self) -> Result<usize, LoadError> {
        self.store.load(self.source.as_ref())
    }

    /// Drop all records. Always succeeds; idempotent.
    pub fn unload(&mut self) {
        self.store.unload();
    }

    /// Whether a full record set is committed. Pure; no side effects.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.store.is_loaded()
    }

    /// Current lifecycle state of the underlying store.
    #[must_use]
    pub fn state(&self) -> LoadState {
        self.store.state()
    }

    /// The committed records in checklist `sequence` order.
    #[must_use]
    pub fn records(&self) -> &[R] {
        self.store.records()
    }

    /// Evaluate `query`, loading the store from the configured source first
    /// if nothing is loaded yet.
    ///
    /// The implicit load is the only side effect of this entry point and is
    /// logged at warn level, since callers usually want an explicit
    /// [`Checklist::load`] instead.
    pub fn find<'a>(&'a mut self, query: &'a Query) -> Result<Matches<'a, R>, FindError> {
        if !self.store.is_loaded() {
            warn!(
                "{} checklist queried before load; loading from {}",
                R::EDITION,
                self.source.describe()
            );
            self.store.load(self.source.as_ref())?;
        }
        Ok(self.store.find(query)?)
    }
}

/// Client for the short checklist edition.
pub type ShortChecklist = Checklist<ShortRecord>;
/// Client for the extended checklist edition.
pub type ExtendedChecklist = Checklist<ExtendedRecord>;

#[cfg(test)]
mod tests {
    use super::{Checklist, ChecklistStore, FindError, LoadError, LoadState};
    use crate::normalise::SchemaError;
    use crate::query::{Query, QueryError};
    use crate::record::{ChecklistRecord, ExtendedRecord, ShortRecord};
    use crate::test_support::{FailingSource, VecSource, sample_rows, taxon_row};
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> ChecklistStore<ShortRecord> {
        ChecklistStore::new()
    }

    #[fixture]
    fn loaded() -> ChecklistStore<ShortRecord> {
        let mut store = ChecklistStore::new();
        store
            .load(&VecSource::new(sample_rows()))
            .expect("sample rows should load");
        store
    }

    #[rstest]
    fn load_commits_all_rows_in_sequence_order(mut store: ChecklistStore<ShortRecord>) {
        let count = store
            .load(&VecSource::new(sample_rows()))
            .expect("sample rows should load");
        assert_eq!(count, store.len());
        assert_eq!(store.state(), LoadState::Loaded);
        let sequences: Vec<u32> = store.records().iter().map(|r| r.sequence).collect();
        let mut sorted = sequences.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sequences, sorted, "sequences must be unique and increasing");
    }

    #[rstest]
    fn duplicate_sequence_aborts_the_whole_load(mut store: ChecklistStore<ShortRecord>) {
        let rows = vec![
            taxon_row(10, "Corvus", "genus"),
            taxon_row(10, "Corvus corone", "species"),
        ];
        let err = store
            .load(&VecSource::new(rows))
            .expect_err("duplicate sequence must fail");
        assert!(matches!(
            err,
            LoadError::Schema(SchemaError::SequenceOrder {
                sequence: 10,
                previous: 10,
            })
        ));
        assert_eq!(store.state(), LoadState::Unloaded);
        assert!(store.is_empty());
    }

    #[rstest]
    fn failed_reload_preserves_prior_contents(mut loaded: ChecklistStore<ShortRecord>) {
        let before = loaded.len();
        let bad_rows = vec![
            taxon_row(1, "Struthioniformes", "order"),
            taxon_row(2, "Corvus corone", "species")
                .with("authority", crate::RawValue::Text("Linnaeus".into())),
        ];
        let err = loaded
            .load(&VecSource::new(bad_rows))
            .expect_err("malformed authority must fail");
        assert!(matches!(
            err,
            LoadError::Schema(SchemaError::Authority { row: 2, .. })
        ));
        assert_eq!(loaded.state(), LoadState::Loaded);
        assert_eq!(loaded.len(), before);
    }

    #[rstest]
    fn source_failure_leaves_store_unloaded(mut store: ChecklistStore<ShortRecord>) {
        let err = store
            .load(&FailingSource)
            .expect_err("failing source must fail");
        assert!(matches!(err, LoadError::Source(_)));
        assert_eq!(store.state(), LoadState::Unloaded);
    }

    #[rstest]
    fn unload_is_idempotent(mut loaded: ChecklistStore<ShortRecord>) {
        loaded.unload();
        assert_eq!(loaded.state(), LoadState::Unloaded);
        loaded.unload();
        assert_eq!(loaded.state(), LoadState::Unloaded);
        assert!(loaded.is_empty());
    }

    #[rstest]
    fn reload_replaces_prior_contents(mut loaded: ChecklistStore<ShortRecord>) {
        let replacement = vec![taxon_row(99, "Pica pica", "species")];
        let count = loaded
            .load(&VecSource::new(replacement))
            .expect("replacement rows should load");
        assert_eq!(count, 1);
        assert_eq!(loaded.records()[0].scientific_name, "Pica pica");
    }

    #[fixture]
    fn checklist() -> Checklist<ShortRecord> {
        Checklist::new("sample", Box::new(VecSource::new(sample_rows())))
    }

    #[rstest]
    fn find_without_criteria_yields_everything(mut checklist: Checklist<ShortRecord>) {
        checklist.load().expect("sample rows should load");
        let total = checklist.records().len();
        let query = Query::new();
        let all: Vec<_> = checklist.find(&query).expect("query should run").collect();
        assert_eq!(all.len(), total);
    }

    #[rstest]
    fn find_triggers_implicit_load(mut checklist: Checklist<ShortRecord>) {
        assert!(!checklist.is_loaded());
        let query = Query::new().field("sequence", 22252_u32);
        let hits: Vec<_> = checklist.find(&query).expect("query should run").collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].scientific_name, "Acrocephalus melanopogon");
        assert!(checklist.is_loaded());
    }

    #[rstest]
    fn find_after_unload_reloads_same_results(mut checklist: Checklist<ShortRecord>) {
        let query = Query::new().field("genus", "corvus");
        let first: Vec<String> = checklist
            .find(&query)
            .expect("query should run")
            .map(|r| r.scientific_name.clone())
            .collect();
        checklist.unload();
        assert!(!checklist.is_loaded());
        let second: Vec<String> = checklist
            .find(&query)
            .expect("query should run")
            .map(|r| r.scientific_name.clone())
            .collect();
        assert_eq!(first, second);
    }

    #[rstest]
    fn case_insensitive_criteria_yield_identical_sets(mut checklist: Checklist<ShortRecord>) {
        let lower = Query::new().field("genus", "corvus").field("epithet", "corone");
        let upper = Query::new().field("genus", "CORVUS").field("epithet", "CORONE");
        let first: Vec<u32> = checklist
            .find(&lower)
            .expect("query should run")
            .map(|r| r.sequence)
            .collect();
        let second: Vec<u32> = checklist
            .find(&upper)
            .expect("query should run")
            .map(|r| r.sequence)
            .collect();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[rstest]
    fn unknown_field_fails_before_any_record(mut checklist: Checklist<ShortRecord>) {
        let query = Query::new().field("nonexistent_field", "x");
        let err = checklist
            .find(&query)
            .map(|_| ())
            .expect_err("unknown field must fail");
        assert!(matches!(
            err,
            FindError::Query(QueryError::UnknownField { .. })
        ));
    }

    #[rstest]
    fn lean_projection_preserves_matches(mut checklist: Checklist<ShortRecord>) {
        let query = Query::new().field("family", "Corvidae");
        let full: Vec<u32> = checklist
            .find(&query)
            .expect("query should run")
            .map(|r| r.sequence)
            .collect();
        let lean: Vec<u32> = checklist
            .find(&query)
            .expect("query should run")
            .lean()
            .map(|r| r.sequence)
            .collect();
        assert_eq!(full, lean);
    }

    #[rstest]
    fn matches_are_restartable_and_independent(mut checklist: Checklist<ShortRecord>) {
        checklist.load().expect("sample rows should load");
        let query = Query::new().field("taxon_rank", "species");
        let first_count = checklist.find(&query).expect("query should run").count();
        let second_count = checklist.find(&query).expect("query should run").count();
        assert_eq!(first_count, second_count);
        assert!(first_count > 0);
    }

    #[rstest]
    fn extended_common_name_criterion_spans_all_english_name_lists() {
        let rows = vec![
            taxon_row(1, "Corvus corone", "species").with(
                "english_name_clements_v2024",
                crate::RawValue::Text("Carrion Crow".into()),
            ),
            taxon_row(2, "Corvus cornix", "species").with(
                "english_name_avilist",
                crate::RawValue::Text("Hooded Crow".into()),
            ),
            taxon_row(3, "Corvus frugilegus", "species").with(
                "english_name_birdlife_v9",
                crate::RawValue::Text("Rook".into()),
            ),
        ];
        let mut extended: ChecklistStore<ExtendedRecord> = ChecklistStore::new();
        extended
            .load(&VecSource::new(rows))
            .expect("rows should load");
        for (name, expected) in [("carrion crow", 1), ("hooded crow", 2), ("rook", 3)] {
            let query = Query::new().field("common_name", name);
            let hits: Vec<u32> = extended
                .find(&query)
                .expect("query should run")
                .map(|r| r.sequence)
                .collect();
            assert_eq!(hits, vec![expected], "criterion '{name}'");
        }
    }

    #[rstest]
    fn subspecies_criterion_requires_subspecies_rank(mut checklist: Checklist<ShortRecord>) {
        let query = Query::new()
            .field("genus", "corvus")
            .field("subspecies", "orientalis");
        let hits: Vec<_> = checklist.find(&query).expect("query should run").collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].scientific_name, "Corvus corone orientalis");
    }
}
