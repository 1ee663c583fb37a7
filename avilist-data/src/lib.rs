//! Data access for the AviList checklist: fetching and decoding the
//! published `.xlsx` workbooks, and snapshot persistence.
//!
//! Responsibilities:
//! - Fetch the published checklist over HTTPS or read a downloaded copy,
//!   validating the vendor file name.
//! - Decode worksheet rows into the raw row shape `avilist-core` normalises.
//! - Persist a loaded checklist as a local snapshot and read it back.
//!
//! Boundaries:
//! - No record semantics: field normalisation, the load lifecycle, and the
//!   query engine live in `avilist-core`. This crate only produces
//!   [`avilist_core::RawRow`] values and wraps them in `RowSource`s.

#![forbid(unsafe_code)]

mod checklist;
mod sheet;
mod snapshot;

pub use checklist::{
    CHECKLIST_URL, DEFAULT_USER_AGENT, EditionChecklist, LocalChecklistSource,
    RemoteChecklistSource, open_checklist, read_checklist, remote_checklist,
};
pub use snapshot::{
    SnapshotError, SnapshotRecord, SnapshotSource, open_snapshot, read_snapshot, write_snapshot,
};
