//! Row sources for the published checklist: remote fetch and local files.
//!
//! The vendor distributes each edition as an `.xlsx` workbook under a
//! versioned file name. Local files must keep that name unmodified; the
//! suffix tells the two editions apart.

use std::{
    fs::File,
    io::{BufReader, Cursor},
    path::{Path, PathBuf},
    time::Duration,
};

use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

use avilist_core::{
    Checklist, ChecklistRecord, Edition, ExtendedChecklist, RawRow, RowSource, ShortChecklist,
    SourceError,
};

use crate::sheet;

/// Landing page documenting the download contract.
pub const CHECKLIST_URL: &str = "https://www.avilist.org/checklist";
/// Base URL the versioned workbooks are published under.
const UPLOADS_URL: &str = "https://www.avilist.org/wp-content/uploads";
/// Upload path segment of the current dataset.
const UPLOAD_PREFIX: &str = "2025/06";

/// Default User-Agent for checklist downloads.
///
/// The vendor's host rejects bare library agents, so this mimics a browser
/// the way the published client does.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// `RowSource` fetching the published workbook for one edition over HTTPS.
#[derive(Debug, Clone)]
pub struct RemoteChecklistSource {
    edition: Edition,
    url: String,
    user_agent: String,
}

impl RemoteChecklistSource {
    /// Source for the current published dataset of `edition`.
    #[must_use]
    pub fn new(edition: Edition) -> Self {
        Self {
            edition,
            url: format!(
                "{UPLOADS_URL}/{UPLOAD_PREFIX}/{}.xlsx",
                edition.dataset_version()
            ),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    /// Override the default user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Fully qualified download URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        let fetch_error = |message: String| SourceError::Fetch {
            url: self.url.clone(),
            message,
        };
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| fetch_error(err.to_string()))?;
        info!("downloading {} checklist from {}", self.edition, self.url);
        let response = client
            .get(&self.url)
            .header(USER_AGENT, self.user_agent.as_str())
            .send()
            .map_err(|err| fetch_error(err.to_string()))?
            .error_for_status()
            .map_err(|err| fetch_error(err.to_string()))?;
        let body = response
            .bytes()
            .map_err(|err| fetch_error(err.to_string()))?;
        debug!("downloaded {} bytes from {}", body.len(), self.url);
        Ok(body.to_vec())
    }
}

impl RowSource for RemoteChecklistSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn rows(&self) -> Result<Vec<RawRow>, SourceError> {
        let body = self.fetch()?;
        sheet::rows_from_xlsx(Cursor::new(body), &self.url)
    }
}

/// `RowSource` reading a locally downloaded checklist workbook.
#[derive(Debug, Clone)]
pub struct LocalChecklistSource {
    path: PathBuf,
    version: String,
}

impl LocalChecklistSource {
    /// Validate the vendor file name and wrap the file.
    ///
    /// The name must keep its `.xlsx` suffix and the edition's stem suffix;
    /// anything else means the file was renamed after download.
    pub fn open(path: impl Into<PathBuf>, edition: Edition) -> Result<Self, SourceError> {
        let path = path.into();
        let version = validate_vendor_name(&path, edition)?;
        Ok(Self { path, version })
    }

    /// Dataset version stem taken from the file name.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl RowSource for LocalChecklistSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn rows(&self) -> Result<Vec<RawRow>, SourceError> {
        let origin = self.describe();
        let file = File::open(&self.path).map_err(|source| SourceError::Read {
            path: origin.clone(),
            source,
        })?;
        sheet::rows_from_xlsx(BufReader::new(file), &origin)
    }
}

fn validate_vendor_name(path: &Path, edition: Edition) -> Result<String, SourceError> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name_error = |reason: String| SourceError::FileName {
        name: name.clone(),
        reason,
    };
    if path.extension().and_then(|ext| ext.to_str()) != Some("xlsx") {
        return Err(file_name_error(format!(
            "expected an .xlsx checklist as published at {CHECKLIST_URL}"
        )));
    }
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !stem.ends_with(edition.stem_suffix()) {
        return Err(file_name_error(format!(
            "the {edition} edition stem must end with '{}'; \
             the file name must not be modified after download",
            edition.stem_suffix()
        )));
    }
    Ok(stem)
}

/// Client for `R`'s edition backed by the published remote workbook.
#[must_use]
pub fn remote_checklist<R: ChecklistRecord>() -> Checklist<R> {
    Checklist::new(
        R::EDITION.dataset_version(),
        Box::new(RemoteChecklistSource::new(R::EDITION)),
    )
}

/// Client for `R`'s edition backed by a locally downloaded workbook.
pub fn open_checklist<R: ChecklistRecord>(
    path: impl Into<PathBuf>,
) -> Result<Checklist<R>, SourceError> {
    let source = LocalChecklistSource::open(path, R::EDITION)?;
    let version = source.version().to_owned();
    Ok(Checklist::new(version, Box::new(source)))
}

/// A checklist client of either edition, as dispatched from a file name.
#[derive(Debug)]
pub enum EditionChecklist {
    Short(ShortChecklist),
    Extended(ExtendedChecklist),
}

impl EditionChecklist {
    /// Edition of the wrapped client.
    #[must_use]
    pub fn edition(&self) -> Edition {
        match self {
            Self::Short(_) => Edition::Short,
            Self::Extended(_) => Edition::Extended,
        }
    }
}

/// Open a local checklist workbook, dispatching the edition on the stem.
pub fn read_checklist(path: impl Into<PathBuf>) -> Result<EditionChecklist, SourceError> {
    let path = path.into();
    match edition_of_stem(&path) {
        Some(Edition::Short) => Ok(EditionChecklist::Short(open_checklist(path)?)),
        Some(Edition::Extended) => Ok(EditionChecklist::Extended(open_checklist(path)?)),
        None => Err(SourceError::FileName {
            name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            reason: format!(
                "the stem carries neither edition suffix; \
                 the file name must not be modified after download ({CHECKLIST_URL})"
            ),
        }),
    }
}

pub(crate) fn edition_of_stem(path: &Path) -> Option<Edition> {
    let stem = path.file_stem()?.to_string_lossy();
    if stem.ends_with(Edition::Short.stem_suffix()) {
        Some(Edition::Short)
    } else if stem.ends_with(Edition::Extended.stem_suffix()) {
        Some(Edition::Extended)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{
        LocalChecklistSource, RemoteChecklistSource, edition_of_stem, read_checklist,
    };
    use avilist_core::{Edition, SourceError};
    use rstest::rstest;
    use std::path::Path;

    #[rstest]
    fn remote_source_builds_versioned_url() {
        let source = RemoteChecklistSource::new(Edition::Short);
        assert_eq!(
            source.url(),
            "https://www.avilist.org/wp-content/uploads/2025/06/AviList-v2025-11Jun-short.xlsx"
        );
    }

    #[rstest]
    #[case("AviList-v2025-11Jun-short.xlsx", Some(Edition::Short))]
    #[case("AviList-v2025-11Jun-extended.xlsx", Some(Edition::Extended))]
    #[case("renamed.xlsx", None)]
    fn dispatches_edition_on_stem(#[case] name: &str, #[case] expected: Option<Edition>) {
        assert_eq!(edition_of_stem(Path::new(name)), expected);
    }

    #[rstest]
    #[case("AviList-v2025-11Jun-short.csv")]
    #[case("my-renamed-checklist.xlsx")]
    fn rejects_modified_vendor_names(#[case] name: &str) {
        let outcome = LocalChecklistSource::open(name, Edition::Short);
        assert!(matches!(outcome, Err(SourceError::FileName { .. })));
    }

    #[rstest]
    fn accepts_vendor_name_and_takes_version_from_stem() {
        let source = LocalChecklistSource::open("AviList-v2025-11Jun-short.xlsx", Edition::Short)
            .expect("vendor name should validate");
        assert_eq!(source.version(), "AviList-v2025-11Jun-short");
    }

    #[rstest]
    fn read_checklist_rejects_unknown_stems() {
        let outcome = read_checklist("whatever.xlsx");
        assert!(matches!(outcome, Err(SourceError::FileName { .. })));
    }
}
