//! Raw row access for checklist ingestion.
//!
//! The `RowSource` trait defines the boundary between the record store and
//! the collaborators that know how to obtain checklist data (remote fetch,
//! local spreadsheet, persisted snapshot). From the store's perspective a
//! source is a black box that produces one ordered sequence of raw rows.

use std::{collections::HashMap, fmt, io};

use thiserror::Error;

/// One spreadsheet cell as supplied by a row source.
///
/// Sources report cells in whichever shape the underlying format offers;
/// the field normaliser coerces them into typed record fields.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Free text, not yet trimmed or validated.
    Text(String),
    /// A numeric cell. Spreadsheets report integers as floats.
    Number(f64),
    /// A native boolean cell.
    Flag(bool),
    /// An empty cell.
    Blank,
}

/// One raw checklist row: a mapping from normalised column label to cell.
///
/// # Examples
/// ```
/// use avilist_core::{RawRow, RawValue};
///
/// let row = RawRow::new()
///     .with("sequence", RawValue::Number(4.0))
///     .with("scientific_name", RawValue::Text("Corvus corone".into()));
/// assert!(matches!(row.get("sequence"), Some(RawValue::Number(_))));
/// assert!(row.get("family").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: HashMap<String, RawValue>,
}

impl RawRow {
    /// Construct an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cell under `column`, replacing any previous value.
    pub fn insert(&mut self, column: impl Into<String>, value: RawValue) {
        self.cells.insert(column.into(), value);
    }

    /// Builder-style [`RawRow::insert`].
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: RawValue) -> Self {
        self.insert(column, value);
        self
    }

    /// Look up the cell stored under `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.cells.get(column)
    }

    /// Number of populated cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the row holds no cells at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Ordered source of raw checklist rows.
///
/// Implementations must yield rows in checklist order and materialise the
/// full sequence per call; the store validates everything before committing.
///
/// # Examples
/// ```
/// use avilist_core::{RawRow, RawValue, RowSource, SourceError};
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
/// let source = CannedRows(vec![RawRow::new().with("sequence", RawValue::Number(1.0))]);
/// assert_eq!(source.rows().expect("canned rows never fail").len(), 1);
/// ```
pub trait RowSource: fmt::Debug {
    /// Human-readable origin used in diagnostics and log messages.
    fn describe(&self) -> String;

    /// Produce every raw row in checklist order.
    fn rows(&self) -> Result<Vec<RawRow>, SourceError>;
}

/// Errors raised while retrieving raw checklist rows.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    /// The remote checklist could not be fetched.
    #[error("failed to fetch checklist from {url}: {message}")]
    Fetch {
        /// Fully qualified request URL.
        url: String,
        /// Short error description supplied by the transport.
        message: String,
    },
    /// A local checklist file could not be read.
    #[error("failed to read checklist file {path}")]
    Read {
        /// Path of the offending file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The retrieved data could not be decoded into rows.
    #[error("malformed checklist data from {origin}: {message}")]
    Format {
        /// Origin label of the source that produced the data.
        origin: String,
        /// Decoder diagnostic.
        message: String,
    },
    /// A local file name violates the vendor naming contract.
    #[error("unexpected checklist file name '{name}': {reason}")]
    FileName {
        /// The offending file name.
        name: String,
        /// Why the name was rejected.
        reason: String,
    },
    /// A persisted snapshot could not be opened or decoded.
    #[error("failed to read snapshot {path}: {message}")]
    Snapshot {
        /// Path of the snapshot file.
        path: String,
        /// Database diagnostic.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::{RawRow, RawValue};
    use rstest::rstest;

    #[rstest]
    fn replaces_cells_on_repeated_insert() {
        let row = RawRow::new()
            .with("order", RawValue::Text("Passeriformes".into()))
            .with("order", RawValue::Blank);
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("order"), Some(&RawValue::Blank));
    }

    #[rstest]
    fn empty_row_reports_no_cells() {
        let row = RawRow::new();
        assert!(row.is_empty());
        assert!(row.get("sequence").is_none());
    }
}
