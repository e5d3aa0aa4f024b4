use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::types::{DatasetKind, RawRecord};
use crate::util::{non_empty, parse_count_safe, parse_date_safe};

const REQUIRED_COLUMNS: [&str; 4] = ["date", "state", "district", "pincode"];

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub files: usize,
    pub total_rows: usize,
    pub parse_errors: usize,
}

/// Read every CSV file for `kind` under `input_root`, concatenated in file
/// name order.
///
/// A missing directory, an empty directory or a file without the expected
/// columns fails the whole kind. Individual rows that cannot be parsed are
/// skipped and counted.
pub fn load_kind(input_root: &Path, kind: DatasetKind) -> Result<(Vec<RawRecord>, LoadReport)> {
    let files = source_files(input_root, kind)?;
    let mut rows = Vec::new();
    let mut report = LoadReport {
        files: files.len(),
        ..Default::default()
    };

    for path in &files {
        let before = rows.len();
        let (read, errors) = load_file(path, kind, &mut rows)?;
        report.total_rows += read;
        report.parse_errors += errors;
        debug!(file = %path.display(), rows = rows.len() - before, skipped = errors, "loaded file");
    }

    if report.parse_errors > 0 {
        warn!(%kind, skipped = report.parse_errors, "rows skipped due to parse errors");
    }
    info!(%kind, files = report.files, rows = rows.len(), "loaded source files");
    Ok((rows, report))
}

fn source_files(input_root: &Path, kind: DatasetKind) -> Result<Vec<PathBuf>> {
    let dir = input_root.join(kind.source_dir());
    if !dir.is_dir() {
        return Err(PipelineError::MissingInputDir { kind, path: dir });
    }
    let mut files: Vec<PathBuf> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        })
        .collect();
    if files.is_empty() {
        return Err(PipelineError::NoInputFiles { kind, path: dir });
    }
    files.sort();
    Ok(files)
}

/// Append the file's rows to `out`; returns `(rows read, rows skipped)`.
fn load_file(path: &Path, kind: DatasetKind, out: &mut Vec<RawRecord>) -> Result<(usize, usize)> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| PipelineError::csv(path, e))?;
    let headers = rdr.headers().map_err(|e| PipelineError::csv(path, e))?.clone();
    let header_map = build_header_map(&headers);

    for column in REQUIRED_COLUMNS.iter().chain(kind.count_columns()) {
        if !header_map.contains_key(*column) {
            return Err(PipelineError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let mut read = 0usize;
    let mut errors = 0usize;
    for (idx, result) in rdr.records().enumerate() {
        read += 1;
        // +2: header line, 1-based
        let line = idx + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(file = %path.display(), line, error = %e, "csv parse error");
                errors += 1;
                continue;
            }
        };
        match parse_row(&record, &header_map, kind) {
            Ok(row) => out.push(row),
            Err(msg) => {
                debug!(file = %path.display(), line, "{msg}");
                errors += 1;
            }
        }
    }
    Ok((read, errors))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn parse_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    kind: DatasetKind,
) -> std::result::Result<RawRecord, String> {
    let field = |name: &str| header_map.get(name).and_then(|&i| record.get(i));

    let date = parse_date_safe(field("date"))
        .ok_or_else(|| format!("invalid date '{}'", field("date").unwrap_or_default()))?;
    let counts = kind
        .count_columns()
        .iter()
        .map(|&c| parse_count_safe(field(c)).map_err(|e| format!("{c}: {e}")))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(RawRecord {
        date,
        state: non_empty(field("state")),
        district: field("district").unwrap_or_default().to_string(),
        pincode: non_empty(field("pincode")),
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn loads_files_in_name_order_and_skips_bad_rows() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(DatasetKind::Biometric.source_dir());
        fs::create_dir_all(&dir).unwrap();
        write(
            &dir,
            "b.csv",
            "date,state,district,pincode,bio_age_5_17,bio_age_17_\n02-03-2025,Goa,North Goa,403001,4,5\n",
        );
        write(
            &dir,
            "a.csv",
            "\u{feff}date,state,district,pincode,bio_age_5_17,bio_age_17_\n\
             01-03-2025,Kerala,Kochi,682001,1,\n\
             not-a-date,Kerala,Kochi,682001,1,2\n\
             01-03-2025,Kerala,Kochi,682001,x,2\n\
             01-03-2025,,Kochi,,3,3\n",
        );
        write(&dir, "notes.txt", "ignored");

        let (rows, report) = load_kind(root.path(), DatasetKind::Biometric).unwrap();
        assert_eq!(report.files, 2);
        assert_eq!(report.total_rows, 5);
        assert_eq!(report.parse_errors, 2);
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(rows[0].counts, vec![Some(1), None]);
        assert_eq!(rows[1].state, None);
        assert_eq!(rows[1].pincode, None);
        assert_eq!(rows[2].state.as_deref(), Some("Goa"));
    }

    #[test]
    fn missing_column_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(DatasetKind::Enrolment.source_dir());
        fs::create_dir_all(&dir).unwrap();
        write(&dir, "e.csv", "date,state,district,pincode,age_0_5,age_5_17\n01-01-2025,Goa,x,1,1,1\n");

        let err = load_kind(root.path(), DatasetKind::Enrolment).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { ref column, .. } if column == "age_18_greater"));
    }

    #[test]
    fn missing_or_empty_directory_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let err = load_kind(root.path(), DatasetKind::Demographic).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInputDir { .. }));

        fs::create_dir_all(root.path().join(DatasetKind::Demographic.source_dir())).unwrap();
        let err = load_kind(root.path(), DatasetKind::Demographic).unwrap_err();
        assert!(matches!(err, PipelineError::NoInputFiles { .. }));
    }
}
