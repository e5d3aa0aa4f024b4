use serde::Serialize;
use std::fs;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

use crate::error::Result;
use crate::types::{CleanRecord, DatasetKind};
use crate::util::DAYFIRST_FORMAT;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    info!(file = %path.display(), rows = rows.len(), "wrote csv");
    Ok(())
}

/// Cleaned rows in the source layout with `total` appended.
pub fn write_cleaned(path: &Path, kind: DatasetKind, records: &[CleanRecord]) -> Result<()> {
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec!["date", "state", "district", "pincode"];
    header.extend_from_slice(kind.count_columns());
    header.push("total");
    wtr.write_record(&header)?;

    for r in records {
        let mut row = vec![
            r.date.format(DAYFIRST_FORMAT).to_string(),
            r.state.clone(),
            r.district.clone(),
            r.pincode.clone().unwrap_or_default(),
        ];
        row.extend(r.counts.iter().map(u64::to_string));
        row.push(r.total.to_string());
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    info!(file = %path.display(), rows = records.len(), "wrote cleaned dataset");
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s)?;
    info!(file = %path.display(), "wrote json");
    Ok(())
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\n{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
