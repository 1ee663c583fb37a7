//! Core domain types for typed, queryable access to the AviList taxonomic
//! checklist.
//!
//! Responsibilities:
//! - Normalise raw spreadsheet rows into strongly-typed records.
//! - Hold one edition's validated record set behind an explicit load
//!   lifecycle.
//! - Answer field-based filter queries as lazy, restartable sequences.
//!
//! Boundaries:
//! - Row retrieval and decoding live in `avilist-data`; this crate only
//!   consumes the [`RowSource`] capability.
//! - No taxonomic reasoning, no write-back, no joins.

#![forbid(unsafe_code)]

mod normalise;
mod query;
mod record;
mod source;
mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use normalise::SchemaError;
pub use query::{Lean, Matches, Query, QueryError, Term};
pub use record::{
    Authority, ChecklistRecord, Edition, ExtendedRecord, IucnCategory, LeanRecord,
    ParseAuthorityError, RecordCore, ShortRecord, TaxonRank,
};
pub use source::{RawRow, RawValue, RowSource, SourceError};
pub use store::{
    Checklist, ChecklistStore, ExtendedChecklist, FindError, LoadError, LoadState, ShortChecklist,
};
