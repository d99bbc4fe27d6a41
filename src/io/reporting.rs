// src/io/reporting.rs

//! CSV and JSON file helpers shared by the data lake.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing::debug;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Writes `rows` to a CSV file, replacing it.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    debug!(rows = rows.len(), path = %path.display(), "wrote csv");
    Ok(())
}

/// Appends `rows` to a CSV file. The header is only written when the file is new.
pub fn append_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    ensure_parent(path)?;
    let exists = path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!exists)
        .from_writer(file);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    debug!(rows = rows.len(), path = %path.display(), "appended csv");
    Ok(())
}

/// Reads every row of a CSV file; a missing file reads as `None`.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut rdr = csv::Reader::from_path(path)?;
    let rows = rdr.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    Ok(Some(rows))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text)?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&text)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: u32,
        name: String,
    }

    #[test]
    fn append_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/rows.csv");
        let first = [Row {
            id: 1,
            name: "a".into(),
        }];
        let second = [Row {
            id: 2,
            name: "b".into(),
        }];
        append_rows(&path, &first).unwrap();
        append_rows(&path, &second).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("id,name").count(), 1);
        let rows: Vec<Row> = read_rows(&path).unwrap().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "b");
    }

    #[test]
    fn missing_files_read_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let rows: Option<Vec<Row>> = read_rows(&dir.path().join("absent.csv")).unwrap();
        assert!(rows.is_none());
        let doc: Option<Row> = read_json(&dir.path().join("absent.json")).unwrap();
        assert!(doc.is_none());
    }
}
