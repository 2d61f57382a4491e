//! Header-addressed CSV tables and atomic file writes.
//!
//! Ledgers are read with the `csv` crate into a [`Table`]: the header row is
//! kept as written and every column is looked up by name or alias, so column
//! order and extra metadata columns are free. Writes go to a temporary file in
//! the destination directory and are renamed over the target.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::LedgerError;

/// A named column and the legacy names accepted for it.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub required: bool,
}

impl Column {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            aliases: &[],
            required: true,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            aliases: &[],
            required: false,
        }
    }

    pub const fn alias(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }
}

/// One data row and its physical line in the file.
///
/// `unreadable` holds the reason a row could not be decoded; its `fields` are
/// then a lossy UTF-8 rendering kept so rewrites do not drop the row.
#[derive(Debug, Clone)]
pub struct TableRow {
    pub line: usize,
    pub fields: Vec<String>,
    pub unreadable: Option<String>,
}

impl TableRow {
    /// Trimmed value at `index`; empty when the column or field is absent.
    pub fn get(&self, index: Option<usize>) -> &str {
        index
            .and_then(|i| self.fields.get(i))
            .map(|v| v.trim())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl Table {
    /// Position of `column` (by name first, then aliases) in the header.
    pub fn index(&self, column: &Column) -> Option<usize> {
        std::iter::once(column.name)
            .chain(column.aliases.iter().copied())
            .find_map(|name| self.headers.iter().position(|h| h == name))
    }
}

/// Reads `path`, failing when a required column is absent under every name.
pub fn read_table(path: &Path, columns: &[Column]) -> Result<Table, LedgerError> {
    let file = File::open(path).map_err(|e| LedgerError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| LedgerError::csv(path, e))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = match record {
            Ok(record) => record,
            Err(e) => match e.position() {
                Some(pos) => {
                    rows.push(TableRow {
                        line: pos.line() as usize,
                        fields: Vec::new(),
                        unreadable: Some(e.to_string()),
                    });
                    continue;
                }
                None => return Err(LedgerError::csv(path, e)),
            },
        };
        let line = record.position().map_or(0, |p| p.line() as usize);
        match csv::StringRecord::from_byte_record(record) {
            Ok(record) => {
                if record.iter().all(|f| f.trim().is_empty()) {
                    continue;
                }
                rows.push(TableRow {
                    line,
                    fields: record.iter().map(str::to_string).collect(),
                    unreadable: None,
                });
            }
            Err(e) => {
                let reason = format!(
                    "field {} is not valid UTF-8",
                    e.utf8_error().field() + 1
                );
                rows.push(TableRow {
                    line,
                    fields: e
                        .into_byte_record()
                        .iter()
                        .map(|f| String::from_utf8_lossy(f).into_owned())
                        .collect(),
                    unreadable: Some(reason),
                });
            }
        }
    }

    let table = Table {
        path: path.to_path_buf(),
        headers,
        rows,
    };
    let missing: Vec<String> = columns
        .iter()
        .filter(|c| c.required && table.index(c).is_none())
        .map(|c| c.name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LedgerError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        });
    }
    Ok(table)
}

fn temp_beside(path: &Path) -> Result<NamedTempFile, LedgerError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| LedgerError::io(dir, e))?;
    NamedTempFile::new_in(dir).map_err(|e| LedgerError::io(path, e))
}

/// Replaces `path` with a CSV of `headers` and `rows`.
pub fn write_table<I>(path: &Path, headers: &[String], rows: I) -> Result<(), LedgerError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut tmp = temp_beside(path)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(tmp.as_file_mut());
        writer
            .write_record(headers)
            .map_err(|e| LedgerError::csv(path, e))?;
        for row in rows {
            writer
                .write_record(&row)
                .map_err(|e| LedgerError::csv(path, e))?;
        }
        writer.flush().map_err(|e| LedgerError::io(path, e))?;
    }
    tmp.persist(path)
        .map_err(|e| LedgerError::io(path, e.error))?;
    Ok(())
}

/// Replaces (or creates) `path` with `contents`.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), LedgerError> {
    let mut tmp = temp_beside(path)?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| LedgerError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| LedgerError::io(path, e.error))?;
    Ok(())
}

/// Creates `path` with `contents`, failing if it already exists.
pub fn write_new(path: &Path, contents: &str) -> Result<(), LedgerError> {
    let mut tmp = temp_beside(path)?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| LedgerError::io(path, e))?;
    tmp.persist_noclobber(path).map_err(|e| {
        if e.error.kind() == std::io::ErrorKind::AlreadyExists {
            LedgerError::AlreadyExists {
                path: path.to_path_buf(),
            }
        } else {
            LedgerError::io(path, e.error)
        }
    })?;
    Ok(())
}
