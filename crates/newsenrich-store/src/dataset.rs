//! CSV-backed dataset of news records

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Stable identifier of a record: its row position in the file.
pub type RecordId = usize;

/// UTF-8 byte-order mark written in front of every flushed file
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Names of the two columns the pipeline cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Columns {
    pub text: String,
    pub result: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            text: "text".to_string(),
            result: "result".to_string(),
        }
    }
}

/// The full ordered collection of records.
///
/// Every column is kept as a string cell so passthrough columns survive a
/// load/flush cycle unchanged. An empty cell means "absent".
#[derive(Debug, Clone)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    text_idx: usize,
    result_idx: usize,
}

impl Dataset {
    /// Load a dataset from a CSV file.
    ///
    /// Fails with [`StoreError::Format`] if the text column is missing. A
    /// missing result column is appended, empty for every row.
    pub fn load(path: &Path, columns: &Columns) -> Result<Self, StoreError> {
        let bytes = fs::read(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::from_reader(bytes.as_slice(), columns)?;
        log::debug!(
            "Loaded {} records ({} columns) from {}",
            dataset.len(),
            dataset.headers.len(),
            path.display()
        );
        Ok(dataset)
    }

    /// Parse a dataset from any CSV source. A leading BOM is ignored.
    pub fn from_reader(mut reader: impl Read, columns: &Columns) -> Result<Self, StoreError> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw).map_err(csv::Error::from)?;
        let body = raw.strip_prefix(UTF8_BOM).unwrap_or(&raw);

        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(body);

        let mut headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        let text_idx = headers
            .iter()
            .position(|h| *h == columns.text)
            .ok_or_else(|| StoreError::Format(format!("missing required column {:?}", columns.text)))?;

        let (result_idx, append_result) = match headers.iter().position(|h| *h == columns.result) {
            Some(i) => (i, false),
            None => {
                headers.push(columns.result.clone());
                (headers.len() - 1, true)
            }
        };

        let width = headers.len();
        let mut rows = Vec::new();
        for (line, record) in csv_reader.records().enumerate() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            let expected = if append_result { width - 1 } else { width };
            if row.len() > expected {
                return Err(StoreError::Format(format!(
                    "row {line} has {} fields, header has {expected}",
                    row.len()
                )));
            }
            row.resize(width, String::new());
            rows.push(row);
        }

        if append_result {
            log::info!("Column {:?} not found, adding it", columns.result);
        }

        Ok(Self {
            headers,
            rows,
            text_idx,
            result_idx,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Every record's text in dataset order; `None` for an empty cell.
    pub fn texts(&self) -> impl DoubleEndedIterator<Item = (RecordId, Option<&str>)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(|(id, row)| (id, non_empty(&row[self.text_idx])))
    }

    pub fn text(&self, id: RecordId) -> Option<&str> {
        self.rows.get(id).and_then(|row| non_empty(&row[self.text_idx]))
    }

    /// String-encoded payload of a record, if it has been enriched.
    pub fn result(&self, id: RecordId) -> Option<&str> {
        self.rows.get(id).and_then(|row| non_empty(&row[self.result_idx]))
    }

    pub fn has_result(&self, id: RecordId) -> bool {
        self.result(id).is_some()
    }

    /// Number of records with a non-empty result.
    pub fn enriched_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| !row[self.result_idx].is_empty())
            .count()
    }

    /// Write a record's result in place.
    ///
    /// Does not check whether a result is already present: callers only pass
    /// ids handed out by the selector, which never selects enriched records.
    pub fn set_result(&mut self, id: RecordId, payload: impl Into<String>) -> Result<(), StoreError> {
        let idx = self.result_idx;
        let row = self.rows.get_mut(id).ok_or(StoreError::UnknownRecord(id))?;
        row[idx] = payload.into();
        Ok(())
    }

    /// Keep only the first `len` records; no-op when already shorter.
    pub fn truncate(&mut self, len: usize) {
        self.rows.truncate(len);
    }

    /// Serialize the full dataset as CSV, without BOM.
    pub fn write_csv(&self, writer: impl Write) -> csv::Result<()> {
        let mut w = csv::Writer::from_writer(writer);
        w.write_record(&self.headers)?;
        for row in &self.rows {
            w.write_record(row)?;
        }
        w.flush()?;
        Ok(())
    }

    /// Persist the dataset to `dest`, BOM-prefixed, atomically.
    ///
    /// Writes `<dest>.tmp`, syncs it, then renames over `dest`. On failure the
    /// tmp file is removed and `dest` still holds the previous checkpoint.
    /// Must not run while the dataset is being mutated.
    pub fn flush(&self, dest: &Path) -> Result<(), StoreError> {
        let tmp = tmp_path(dest);
        let result = self.write_tmp(&tmp).and_then(|()| fs::rename(&tmp, dest));
        match result {
            Ok(()) => {
                log::debug!("Flushed {} records to {}", self.len(), dest.display());
                Ok(())
            }
            Err(source) => {
                let _ = fs::remove_file(&tmp);
                Err(StoreError::Persistence {
                    path: dest.to_path_buf(),
                    source,
                })
            }
        }
    }

    fn write_tmp(&self, tmp: &Path) -> io::Result<()> {
        let file = File::create(tmp)?;
        let mut out = BufWriter::new(file);
        out.write_all(UTF8_BOM)?;
        self.write_csv(&mut out).map_err(io::Error::other)?;
        let file = out.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}

fn non_empty(cell: &str) -> Option<&str> {
    if cell.is_empty() { None } else { Some(cell) }
}

fn tmp_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    dest.with_file_name(name)
}
