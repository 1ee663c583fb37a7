//! Local snapshot persistence for loaded checklists.
//!
//! A snapshot is a single SQLite file named `{version}.sqlite`. It holds one
//! metadata row (snapshot format version, edition, dataset stem) and one
//! `records` table keyed by `sequence`, with every other field stored as the
//! text form the normaliser accepts back. The file format is an internal
//! detail; the contract is that [`write_snapshot`] followed by
//! [`open_snapshot`] reproduces the loaded record set exactly.

use std::path::{Path, PathBuf};

use log::info;
use rusqlite::{Connection, OpenFlags, params, types::Value};
use thiserror::Error;

use avilist_core::{
    Checklist, ChecklistRecord, Edition, ExtendedRecord, RawRow, RawValue, RecordCore, RowSource,
    ShortRecord, SourceError,
};

use crate::checklist::edition_of_stem;

/// Bumped whenever the snapshot layout changes incompatibly.
const SNAPSHOT_VERSION: i64 = 1;

/// Base-field columns stored for both editions, in table order. `sequence`
/// is the primary key and listed separately.
const CORE_COLUMNS: &[&str] = &[
    "scientific_name",
    "taxon_rank",
    "order",
    "family",
    "family_english_name",
    "protonym",
    "english_name_avilist",
    "authority",
    "avibase_id",
    "bibliographic_details",
    "decision_summary",
    "extinct_or_possibly_extinct",
    "iucn_red_list_category",
    "species_range",
];

/// Columns only the extended edition stores, appended after the core set.
const EXTENDED_COLUMNS: &[&str] = &[
    "english_name_clements_v2024",
    "english_name_birdlife_v9",
    "birdlife_datazone_url",
    "birds_of_the_world_url",
    "original_description_url",
    "gender_of_genus",
    "proposal_number",
    "species_code_cornell_lab",
    "title_of_original_description",
    "type_locality",
    "type_species_of_genus",
];

fn snapshot_columns(edition: Edition) -> Vec<&'static str> {
    let mut columns = CORE_COLUMNS.to_vec();
    if edition == Edition::Extended {
        columns.extend_from_slice(EXTENDED_COLUMNS);
    }
    columns
}

/// Errors surfaced by [`write_snapshot`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapshotError {
    /// The checklist holds no committed records to persist.
    #[error("checklist is not loaded; nothing to snapshot")]
    NotLoaded,
    /// The snapshot file could not be created or opened.
    #[error("failed to open snapshot '{path}'")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    /// A write step failed after the file was opened.
    #[error("snapshot write failed during {step}")]
    Sqlite {
        step: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

fn sqlite_step(step: &'static str) -> impl Fn(rusqlite::Error) -> SnapshotError {
    move |source| SnapshotError::Sqlite { step, source }
}

/// Record shape that can be flattened into snapshot table cells.
///
/// `cells` yields the non-`sequence` columns in the order
/// `snapshot_columns(Self::EDITION)` declares them; each cell is the text
/// form the field normaliser accepts back, so writing and reloading a
/// snapshot reproduces an equal record.
pub trait SnapshotRecord: ChecklistRecord {
    fn cells(&self) -> Vec<Option<String>>;
}

fn core_cells(core: &RecordCore) -> Vec<Option<String>> {
    vec![
        Some(core.scientific_name.clone()),
        Some(core.taxon_rank.as_str().to_owned()),
        core.order.clone(),
        core.family.clone(),
        core.family_english_name.clone(),
        core.protonym.clone(),
        core.english_name_avilist.clone(),
        core.authority.as_ref().map(ToString::to_string),
        core.avibase_id.clone(),
        core.bibliographic_details.clone(),
        core.decision_summary.clone(),
        Some(if core.extinct_or_possibly_extinct {
            "Yes".to_owned()
        } else {
            "No".to_owned()
        }),
        core.iucn_red_list_category
            .map(|category| category.as_str().to_owned()),
        core.species_range.clone(),
    ]
}

impl SnapshotRecord for ShortRecord {
    fn cells(&self) -> Vec<Option<String>> {
        core_cells(self.core())
    }
}

impl SnapshotRecord for ExtendedRecord {
    fn cells(&self) -> Vec<Option<String>> {
        let mut cells = core_cells(self.core());
        cells.push(self.english_name_clements_v2024.clone());
        cells.push(self.english_name_birdlife_v9.clone());
        cells.push(
            self.birdlife_datazone_url
                .as_ref()
                .map(|url| url.as_str().to_owned()),
        );
        cells.push(
            self.birds_of_the_world_url
                .as_ref()
                .map(|url| url.as_str().to_owned()),
        );
        cells.push(
            self.original_description_url
                .as_ref()
                .map(|url| url.as_str().to_owned()),
        );
        cells.push(self.gender_of_genus.clone());
        cells.push(self.proposal_number.clone());
        cells.push(self.species_code_cornell_lab.clone());
        cells.push(self.title_of_original_description.clone());
        cells.push(self.type_locality.clone());
        cells.push(self.type_species_of_genus.clone());
        cells
    }
}

fn create_tables_sql(columns: &[&str]) -> String {
    let mut sql = String::from(
        "DROP TABLE IF EXISTS snapshot_meta;\n\
         DROP TABLE IF EXISTS records;\n\
         CREATE TABLE snapshot_meta (\n\
             snapshot_version INTEGER NOT NULL,\n\
             edition TEXT NOT NULL,\n\
             dataset TEXT NOT NULL\n\
         );\n\
         CREATE TABLE records (\n\
             sequence INTEGER PRIMARY KEY CHECK (sequence > 0)",
    );
    for column in columns {
        sql.push_str(",\n    \"");
        sql.push_str(column);
        sql.push_str("\" TEXT");
    }
    sql.push_str("\n);");
    sql
}

fn insert_sql(columns: &[&str]) -> String {
    let mut sql = String::from("INSERT INTO records (sequence");
    for column in columns {
        sql.push_str(", \"");
        sql.push_str(column);
        sql.push('"');
    }
    sql.push_str(") VALUES (?");
    for index in 2..=columns.len() + 1 {
        sql.push_str(&format!(", ?{index}"));
    }
    sql.push(')');
    sql
}

fn select_sql(columns: &[&str]) -> String {
    let mut sql = String::from("SELECT sequence");
    for column in columns {
        sql.push_str(", \"");
        sql.push_str(column);
        sql.push('"');
    }
    sql.push_str(" FROM records ORDER BY sequence");
    sql
}

/// Persist a loaded checklist to `dir` as `{version}.sqlite`.
///
/// Fails with [`SnapshotError::NotLoaded`] when nothing is committed. An
/// existing snapshot of the same version is replaced in one transaction.
pub fn write_snapshot<R: SnapshotRecord>(
    checklist: &Checklist<R>,
    dir: &Path,
) -> Result<PathBuf, SnapshotError> {
    if !checklist.is_loaded() {
        return Err(SnapshotError::NotLoaded);
    }
    let columns = snapshot_columns(R::EDITION);
    let path = dir.join(format!("{}.sqlite", checklist.version()));
    let mut connection = Connection::open(&path).map_err(|source| SnapshotError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let tx = connection
        .transaction()
        .map_err(sqlite_step("begin transaction"))?;
    tx.execute_batch(&create_tables_sql(&columns))
        .map_err(sqlite_step("create tables"))?;
    tx.execute(
        "INSERT INTO snapshot_meta (snapshot_version, edition, dataset) VALUES (?1, ?2, ?3)",
        params![SNAPSHOT_VERSION, R::EDITION.as_str(), checklist.version()],
    )
    .map_err(sqlite_step("write metadata"))?;
    {
        let mut insert = tx
            .prepare(&insert_sql(&columns))
            .map_err(sqlite_step("prepare insert"))?;
        for record in checklist.records() {
            let mut values = Vec::with_capacity(columns.len() + 1);
            values.push(Value::Integer(i64::from(record.core().sequence)));
            values.extend(record.cells().into_iter().map(Value::from));
            insert
                .execute(rusqlite::params_from_iter(values))
                .map_err(sqlite_step("insert record"))?;
        }
    }
    tx.commit().map_err(sqlite_step("commit"))?;
    info!(
        "wrote {} records to snapshot {}",
        checklist.records().len(),
        path.display()
    );
    Ok(path)
}

/// `RowSource` reading a previously written snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    path: PathBuf,
    edition: Edition,
}

impl SnapshotSource {
    /// Wrap a snapshot file expected to hold `edition` records.
    ///
    /// Metadata is validated on every read, not here, so a stale handle to a
    /// replaced file still fails cleanly.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, edition: Edition) -> Self {
        Self {
            path: path.into(),
            edition,
        }
    }

    fn snapshot_error(&self, message: impl Into<String>) -> SourceError {
        SourceError::Snapshot {
            path: self.path.display().to_string(),
            message: message.into(),
        }
    }

    fn validate_meta(&self, connection: &Connection) -> Result<(), SourceError> {
        let (version, edition): (i64, String) = connection
            .query_row(
                "SELECT snapshot_version, edition FROM snapshot_meta",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|err| self.snapshot_error(format!("missing metadata: {err}")))?;
        if version != SNAPSHOT_VERSION {
            return Err(self.snapshot_error(format!(
                "snapshot format version {version} is not supported (expected {SNAPSHOT_VERSION})"
            )));
        }
        if edition != self.edition.as_str() {
            return Err(self.snapshot_error(format!(
                "snapshot holds the {edition} edition, not {}",
                self.edition
            )));
        }
        Ok(())
    }
}

impl RowSource for SnapshotSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn rows(&self) -> Result<Vec<RawRow>, SourceError> {
        let connection = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|err| self.snapshot_error(err.to_string()))?;
        self.validate_meta(&connection)?;

        let columns = snapshot_columns(self.edition);
        let mut statement = connection
            .prepare(&select_sql(&columns))
            .map_err(|err| self.snapshot_error(err.to_string()))?;
        let mut rows = Vec::new();
        let mut cursor = statement
            .query([])
            .map_err(|err| self.snapshot_error(err.to_string()))?;
        while let Some(sql_row) = cursor
            .next()
            .map_err(|err| self.snapshot_error(err.to_string()))?
        {
            let sequence: i64 = sql_row
                .get(0)
                .map_err(|err| self.snapshot_error(err.to_string()))?;
            let sequence = u32::try_from(sequence).map_err(|_| {
                self.snapshot_error(format!("sequence {sequence} is out of range"))
            })?;
            let mut row = RawRow::new().with("sequence", RawValue::Number(f64::from(sequence)));
            for (index, column) in columns.iter().enumerate() {
                let cell: Option<String> = sql_row
                    .get(index + 1)
                    .map_err(|err| self.snapshot_error(err.to_string()))?;
                if let Some(text) = cell {
                    row.insert((*column).to_owned(), RawValue::Text(text));
                }
            }
            rows.push(row);
        }
        Ok(rows)
    }
}

/// Client for `R`'s edition backed by a snapshot file.
///
/// The file name must be the one [`write_snapshot`] produced: the dataset
/// version stem with the edition suffix, and a `.sqlite` extension.
pub fn open_snapshot<R: SnapshotRecord>(
    path: impl Into<PathBuf>,
) -> Result<Checklist<R>, SourceError> {
    let path = path.into();
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if path.extension().and_then(|ext| ext.to_str()) != Some("sqlite") {
        return Err(SourceError::FileName {
            name,
            reason: "snapshots use the .sqlite extension".to_owned(),
        });
    }
    let Some(stem) = path.file_stem().map(|stem| stem.to_string_lossy().into_owned()) else {
        return Err(SourceError::FileName {
            name,
            reason: "snapshot file name has no stem".to_owned(),
        });
    };
    if !stem.ends_with(R::EDITION.stem_suffix()) {
        return Err(SourceError::FileName {
            name,
            reason: format!(
                "the {} edition stem must end with '{}'",
                R::EDITION,
                R::EDITION.stem_suffix()
            ),
        });
    }
    let source = SnapshotSource::new(path, R::EDITION);
    Ok(Checklist::new(stem, Box::new(source)))
}

/// A snapshot-backed checklist of either edition, dispatched on the stem.
pub fn read_snapshot(
    path: impl Into<PathBuf>,
) -> Result<crate::checklist::EditionChecklist, SourceError> {
    let path = path.into();
    match edition_of_stem(&path) {
        Some(Edition::Short) => Ok(crate::checklist::EditionChecklist::Short(open_snapshot(
            path,
        )?)),
        Some(Edition::Extended) => Ok(crate::checklist::EditionChecklist::Extended(
            open_snapshot(path)?,
        )),
        None => Err(SourceError::FileName {
            name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            reason: "the stem carries neither edition suffix".to_owned(),
        }),
    }
}
