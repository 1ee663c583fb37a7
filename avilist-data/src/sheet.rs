//! Spreadsheet decoding: turn the vendor's `.xlsx` worksheet into raw rows.
//!
//! Column labels are normalised to snake_case and remapped to the canonical
//! names the schema expects, so the rest of the pipeline never sees the
//! vendor's header spelling.

use std::io::{Read, Seek};

use calamine::{Data, Range, Reader, Xlsx};

use avilist_core::{RawRow, RawValue, SourceError};

/// Vendor headers whose snake_case form differs from the schema name.
const LABEL_REMAP: &[(&str, &str)] = &[("avibaseid", "avibase_id"), ("range", "species_range")];

/// Lowercase a header and collapse every non-alphanumeric run to one `_`.
pub(crate) fn normalise_label(raw: &str) -> String {
    let mut label = String::with_capacity(raw.len());
    let mut pending_separator = false;
    for ch in raw.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_separator && !label.is_empty() {
                label.push('_');
            }
            pending_separator = false;
            label.extend(ch.to_lowercase());
        } else {
            pending_separator = true;
        }
    }
    for (vendor, canonical) in LABEL_REMAP {
        if label == *vendor {
            return (*canonical).to_owned();
        }
    }
    label
}

fn cell_value(cell: &Data) -> RawValue {
    match cell {
        Data::Empty | Data::Error(_) => RawValue::Blank,
        Data::String(text) => RawValue::Text(text.clone()),
        Data::Float(number) => RawValue::Number(*number),
        #[allow(clippy::cast_precision_loss, reason = "sequence values are small")]
        Data::Int(number) => RawValue::Number(*number as f64),
        Data::Bool(flag) => RawValue::Flag(*flag),
        Data::DateTime(datetime) => RawValue::Number(datetime.as_f64()),
        Data::DateTimeIso(text) | Data::DurationIso(text) => RawValue::Text(text.clone()),
    }
}

/// Decode a worksheet range into ordered raw rows.
///
/// The first row is the header; fully blank data rows are skipped.
pub(crate) fn rows_from_range(range: &Range<Data>, origin: &str) -> Result<Vec<RawRow>, SourceError> {
    let mut sheet_rows = range.rows();
    let header = sheet_rows.next().ok_or_else(|| SourceError::Format {
        origin: origin.to_owned(),
        message: "worksheet is empty".to_owned(),
    })?;
    let labels: Vec<String> = header
        .iter()
        .map(|cell| match cell {
            Data::String(text) => normalise_label(text),
            other => normalise_label(&other.to_string()),
        })
        .collect();
    if labels.iter().all(String::is_empty) {
        return Err(SourceError::Format {
            origin: origin.to_owned(),
            message: "worksheet has no header row".to_owned(),
        });
    }

    let mut rows = Vec::new();
    for sheet_row in sheet_rows {
        if sheet_row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }
        let mut row = RawRow::new();
        for (label, cell) in labels.iter().zip(sheet_row.iter()) {
            if !label.is_empty() {
                row.insert(label.clone(), cell_value(cell));
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Decode the first worksheet of an `.xlsx` stream into ordered raw rows.
pub(crate) fn rows_from_xlsx<RS: Read + Seek>(
    reader: RS,
    origin: &str,
) -> Result<Vec<RawRow>, SourceError> {
    let mut workbook = Xlsx::new(reader).map_err(|err| SourceError::Format {
        origin: origin.to_owned(),
        message: err.to_string(),
    })?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SourceError::Format {
            origin: origin.to_owned(),
            message: "workbook has no worksheets".to_owned(),
        })?
        .map_err(|err| SourceError::Format {
            origin: origin.to_owned(),
            message: err.to_string(),
        })?;
    rows_from_range(&range, origin)
}

#[cfg(test)]
mod tests {
    use super::{normalise_label, rows_from_range};
    use avilist_core::{RawValue, SourceError};
    use calamine::{Data, Range};
    use rstest::rstest;

    #[rstest]
    #[case("Scientific name", "scientific_name")]
    #[case("  Taxon rank ", "taxon_rank")]
    #[case("IUCN Red List Category", "iucn_red_list_category")]
    #[case("English name (AviList)", "english_name_avilist")]
    #[case("AvibaseID", "avibase_id")]
    #[case("Range", "species_range")]
    fn normalises_vendor_headers(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalise_label(raw), expected);
    }

    fn sheet() -> Range<Data> {
        let mut range = Range::new((0, 0), (3, 3));
        range.set_value((0, 0), Data::String("Sequence".into()));
        range.set_value((0, 1), Data::String("Scientific name".into()));
        range.set_value((0, 2), Data::String("Taxon rank".into()));
        range.set_value((0, 3), Data::String("Range".into()));
        range.set_value((1, 0), Data::Float(1.0));
        range.set_value((1, 1), Data::String("Corvus corone".into()));
        range.set_value((1, 2), Data::String("species".into()));
        range.set_value((1, 3), Data::String("Western Europe".into()));
        // Row 2 left fully blank; it must be skipped.
        range.set_value((3, 0), Data::Int(2));
        range.set_value((3, 1), Data::String("Pica pica".into()));
        range.set_value((3, 2), Data::String("species".into()));
        range
    }

    #[rstest]
    fn decodes_header_and_skips_blank_rows() {
        let rows = rows_from_range(&sheet(), "test sheet").expect("sheet should decode");
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].get("scientific_name"),
            Some(&RawValue::Text("Corvus corone".into()))
        );
        assert_eq!(
            rows[0].get("species_range"),
            Some(&RawValue::Text("Western Europe".into()))
        );
        assert_eq!(rows[1].get("sequence"), Some(&RawValue::Number(2.0)));
    }

    #[rstest]
    fn empty_sheet_is_a_format_error() {
        let range: Range<Data> = Range::new((0, 0), (0, 0));
        let outcome = rows_from_range(&range, "test sheet");
        assert!(matches!(outcome, Err(SourceError::Format { .. })));
    }
}
