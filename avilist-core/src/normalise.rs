//! Per-column coercion and validation of raw cells into typed field values.
//!
//! Every helper is a pure function of one row. Empty strings and the `NA`
//! sentinel normalise to absent rather than empty, so downstream code never
//! distinguishes the two. Failures carry the row's sequence and the
//! offending column for diagnosability.

use thiserror::Error;
use url::Url;

use crate::record::{Authority, IucnCategory, ParseAuthorityError, TaxonRank};
use crate::source::{RawRow, RawValue};

/// Cell contents that normalise to absent.
const ABSENT_SENTINEL: &str = "NA";

/// Case-insensitive textual tokens accepted by boolean columns.
const TRUTHY_TOKENS: &[&str] = &["yes", "true"];
const FALSY_TOKENS: &[&str] = &["no", "false"];

/// Errors raised when a row fails field validation.
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum SchemaError {
    /// The row carries no `sequence` cell at all.
    #[error("row is missing the required 'sequence' column")]
    MissingSequence,
    /// The `sequence` cell is not a positive integer.
    #[error("column 'sequence' must be a positive integer, got '{value}'")]
    InvalidSequence {
        /// The offending cell rendered as text.
        value: String,
    },
    /// A required column was absent or blank.
    #[error("row {row}: required column '{column}' is missing or blank")]
    MissingColumn { row: u32, column: &'static str },
    /// A closed-enumeration or boolean column held an unrecognised value.
    #[error("row {row}: column '{column}' value '{value}' is not a recognised {expected}")]
    UnknownVariant {
        row: u32,
        column: &'static str,
        value: String,
        expected: &'static str,
    },
    /// An authority citation could not be decomposed.
    #[error("row {row}: column '{column}' holds a malformed authority citation '{value}'")]
    Authority {
        row: u32,
        column: &'static str,
        value: String,
        #[source]
        source: ParseAuthorityError,
    },
    /// A URL column held invalid URI syntax.
    #[error("row {row}: column '{column}' holds an invalid URL '{value}'")]
    Url {
        row: u32,
        column: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
    /// A row's sequence repeated or regressed during a load.
    #[error("sequence {sequence} is not strictly greater than the previous sequence {previous}")]
    SequenceOrder { sequence: u32, previous: u32 },
}

/// Render a cell as trimmed text, mapping blanks and sentinels to absent.
fn cell_text(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed == ABSENT_SENTINEL {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        RawValue::Number(number) => Some(render_number(*number)),
        RawValue::Flag(flag) => Some(flag.to_string()),
        RawValue::Blank => None,
    }
}

/// Spreadsheets report integers as floats; render them without a fraction.
fn render_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{number:.0}")
    } else {
        number.to_string()
    }
}

/// A textual field that may be absent.
pub(crate) fn optional_text(row: &RawRow, column: &str) -> Option<String> {
    row.get(column).and_then(cell_text)
}

/// A textual field that must be present and non-blank.
pub(crate) fn required_text(
    row: &RawRow,
    column: &'static str,
    sequence: u32,
) -> Result<String, SchemaError> {
    optional_text(row, column).ok_or(SchemaError::MissingColumn {
        row: sequence,
        column,
    })
}

/// The row's canonical checklist position.
pub(crate) fn sequence(row: &RawRow) -> Result<u32, SchemaError> {
    let cell = row.get("sequence").ok_or(SchemaError::MissingSequence)?;
    match cell {
        RawValue::Number(number) => {
            let rounded = number.round();
            if number.is_finite()
                && (number - rounded).abs() < f64::EPSILON
                && rounded >= 1.0
                && rounded <= f64::from(u32::MAX)
            {
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    reason = "range checked above"
                )]
                let value = rounded as u32;
                Ok(value)
            } else {
                Err(SchemaError::InvalidSequence {
                    value: number.to_string(),
                })
            }
        }
        RawValue::Text(text) => {
            let trimmed = text.trim();
            match trimmed.parse::<u32>() {
                Ok(value) if value > 0 => Ok(value),
                _ => Err(SchemaError::InvalidSequence {
                    value: trimmed.to_owned(),
                }),
            }
        }
        RawValue::Flag(flag) => Err(SchemaError::InvalidSequence {
            value: flag.to_string(),
        }),
        RawValue::Blank => Err(SchemaError::MissingSequence),
    }
}

/// The row's taxonomic rank; required on every row.
pub(crate) fn taxon_rank(row: &RawRow, sequence: u32) -> Result<TaxonRank, SchemaError> {
    let label = required_text(row, "taxon_rank", sequence)?;
    TaxonRank::parse(&label).ok_or(SchemaError::UnknownVariant {
        row: sequence,
        column: "taxon_rank",
        value: label,
        expected: "taxon rank",
    })
}

/// An optional IUCN Red List category code.
pub(crate) fn optional_iucn(
    row: &RawRow,
    column: &'static str,
    sequence: u32,
) -> Result<Option<IucnCategory>, SchemaError> {
    optional_text(row, column)
        .map(|code| {
            IucnCategory::parse(&code).ok_or(SchemaError::UnknownVariant {
                row: sequence,
                column,
                value: code,
                expected: "IUCN Red List category",
            })
        })
        .transpose()
}

/// An optional authority citation decomposed into (surname, initials, year).
pub(crate) fn optional_authority(
    row: &RawRow,
    column: &'static str,
    sequence: u32,
) -> Result<Option<Authority>, SchemaError> {
    optional_text(row, column)
        .map(|citation| {
            citation
                .parse::<Authority>()
                .map_err(|source| SchemaError::Authority {
                    row: sequence,
                    column,
                    value: citation,
                    source,
                })
        })
        .transpose()
}

/// An optional URL field parsed into a structured value.
pub(crate) fn optional_url(
    row: &RawRow,
    column: &'static str,
    sequence: u32,
) -> Result<Option<Url>, SchemaError> {
    optional_text(row, column)
        .map(|text| {
            Url::parse(&text).map_err(|source| SchemaError::Url {
                row: sequence,
                column,
                value: text,
                source,
            })
        })
        .transpose()
}

/// A boolean column; absent cells normalise to `false`.
pub(crate) fn flag(
    row: &RawRow,
    column: &'static str,
    sequence: u32,
) -> Result<bool, SchemaError> {
    match row.get(column) {
        None | Some(RawValue::Blank) => Ok(false),
        Some(RawValue::Flag(value)) => Ok(*value),
        Some(RawValue::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed == ABSENT_SENTINEL {
                Ok(false)
            } else {
                parse_flag_token(trimmed).ok_or(SchemaError::UnknownVariant {
                    row: sequence,
                    column,
                    value: trimmed.to_owned(),
                    expected: "yes/no flag",
                })
            }
        }
        Some(RawValue::Number(number)) => Err(SchemaError::UnknownVariant {
            row: sequence,
            column,
            value: number.to_string(),
            expected: "yes/no flag",
        }),
    }
}

fn parse_flag_token(token: &str) -> Option<bool> {
    if TRUTHY_TOKENS.iter().any(|t| token.eq_ignore_ascii_case(t)) {
        Some(true)
    } else if FALSY_TOKENS.iter().any(|t| token.eq_ignore_ascii_case(t)) {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{SchemaError, flag, optional_text, optional_url, required_text, sequence};
    use crate::source::{RawRow, RawValue};
    use rstest::rstest;

    #[rstest]
    #[case(RawValue::Text("  Corvidae  ".into()), Some("Corvidae"))]
    #[case(RawValue::Text("".into()), None)]
    #[case(RawValue::Text("   ".into()), None)]
    #[case(RawValue::Text("NA".into()), None)]
    #[case(RawValue::Blank, None)]
    fn normalises_text_cells(#[case] cell: RawValue, #[case] expected: Option<&str>) {
        let row = RawRow::new().with("family", cell);
        assert_eq!(optional_text(&row, "family").as_deref(), expected);
    }

    #[rstest]
    fn required_text_reports_row_and_column() {
        let row = RawRow::new().with("scientific_name", RawValue::Blank);
        let err = required_text(&row, "scientific_name", 7).expect_err("blank must fail");
        assert_eq!(
            err,
            SchemaError::MissingColumn {
                row: 7,
                column: "scientific_name",
            }
        );
    }

    #[rstest]
    #[case(RawValue::Number(42.0), Ok(42))]
    #[case(RawValue::Text("42".into()), Ok(42))]
    #[case(RawValue::Number(0.0), Err(()))]
    #[case(RawValue::Number(4.5), Err(()))]
    #[case(RawValue::Text("-3".into()), Err(()))]
    fn validates_sequence_cells(#[case] cell: RawValue, #[case] expected: Result<u32, ()>) {
        let row = RawRow::new().with("sequence", cell);
        match expected {
            Ok(value) => assert_eq!(sequence(&row).expect("valid sequence"), value),
            Err(()) => assert!(matches!(
                sequence(&row),
                Err(SchemaError::InvalidSequence { .. })
            )),
        }
    }

    #[rstest]
    fn missing_sequence_cell_is_its_own_error() {
        assert_eq!(sequence(&RawRow::new()), Err(SchemaError::MissingSequence));
    }

    #[rstest]
    #[case(Some(RawValue::Text("Yes".into())), true)]
    #[case(Some(RawValue::Text("NO".into())), false)]
    #[case(Some(RawValue::Text("true".into())), true)]
    #[case(Some(RawValue::Flag(true)), true)]
    #[case(Some(RawValue::Blank), false)]
    #[case(None, false)]
    fn maps_flag_tokens(#[case] cell: Option<RawValue>, #[case] expected: bool) {
        let mut row = RawRow::new();
        if let Some(cell) = cell {
            row.insert("extinct_or_possibly_extinct", cell);
        }
        let value = flag(&row, "extinct_or_possibly_extinct", 1).expect("token should map");
        assert_eq!(value, expected);
    }

    #[rstest]
    fn rejects_unknown_flag_tokens() {
        let row = RawRow::new().with("extinct_or_possibly_extinct", RawValue::Text("maybe".into()));
        let err = flag(&row, "extinct_or_possibly_extinct", 9).expect_err("token must fail");
        assert!(matches!(
            err,
            SchemaError::UnknownVariant {
                row: 9,
                column: "extinct_or_possibly_extinct",
                ..
            }
        ));
    }

    #[rstest]
    fn parses_urls_and_rejects_bad_syntax() {
        let row = RawRow::new()
            .with(
                "birds_of_the_world_url",
                RawValue::Text("https://birdsoftheworld.org/bow/species/carcro1".into()),
            )
            .with("birdlife_datazone_url", RawValue::Text("not a url".into()));
        let url = optional_url(&row, "birds_of_the_world_url", 3)
            .expect("valid url")
            .expect("present");
        assert_eq!(url.host_str(), Some("birdsoftheworld.org"));
        assert!(matches!(
            optional_url(&row, "birdlife_datazone_url", 3),
            Err(SchemaError::Url { row: 3, .. })
        ));
    }
}
