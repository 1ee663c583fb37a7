//! Facade crate for typed, queryable access to the AviList taxonomic
//! checklist.
//!
//! This crate re-exports the core record, store, and query types together
//! with the data-access layer: remote and local checklist sources and
//! snapshot persistence.

#![forbid(unsafe_code)]

pub use avilist_core::{
    Authority, Checklist, ChecklistRecord, ChecklistStore, Edition, ExtendedChecklist,
    ExtendedRecord, FindError, IucnCategory, Lean, LeanRecord, LoadError, LoadState, Matches,
    ParseAuthorityError, Query, QueryError, RawRow, RawValue, RecordCore, RowSource, SchemaError,
    ShortChecklist, ShortRecord, SourceError, TaxonRank, Term,
};

pub use avilist_data::{
    CHECKLIST_URL, DEFAULT_USER_AGENT, EditionChecklist, LocalChecklistSource,
    RemoteChecklistSource, SnapshotError,
    SnapshotRecord, SnapshotSource, open_checklist, open_snapshot, read_checklist, read_snapshot,
    remote_checklist, write_snapshot,
};

#[cfg(feature = "test-support")]
pub use avilist_core::test_support;
