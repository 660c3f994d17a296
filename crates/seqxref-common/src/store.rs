//! Local cache files
//!
//! `DataStore` reads and writes the JSON, CSV and TSV files the providers use
//! to persist fetched reference data between runs.

use crate::error::{Result, XrefError};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// On-disk format of a cache file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Json,
    Csv,
    Tsv,
}

impl DataFormat {
    fn delimiter(self) -> Option<u8> {
        match self {
            DataFormat::Json => None,
            DataFormat::Csv => Some(b','),
            DataFormat::Tsv => Some(b'\t'),
        }
    }
}

impl std::str::FromStr for DataFormat {
    type Err = XrefError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(DataFormat::Json),
            "csv" => Ok(DataFormat::Csv),
            "tsv" | "tdd" => Ok(DataFormat::Tsv),
            other => Err(XrefError::unsupported("format", other)),
        }
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataFormat::Json => "json",
            DataFormat::Csv => "csv",
            DataFormat::Tsv => "tsv",
        };
        f.write_str(name)
    }
}

/// A cached payload together with the time it was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    pub created: DateTime<Utc>,
    pub data: T,
}

impl<T> Stamped<T> {
    pub fn now(data: T) -> Self {
        Self {
            created: Utc::now(),
            data,
        }
    }
}

/// File-backed cache store
#[derive(Debug, Clone)]
pub struct DataStore {
    pretty: bool,
}

impl Default for DataStore {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write compact JSON instead of indented JSON
    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref().exists()
    }

    /// Create a directory and any missing parents
    pub fn mkdir(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::create_dir_all(path.as_ref())?;
        Ok(())
    }

    /// Read a cache file.
    ///
    /// JSON files are returned as-is. CSV and TSV files must carry a header
    /// row and are returned as an array of header-keyed string objects.
    pub fn do_import(&self, path: impl AsRef<Path>, format: DataFormat) -> Result<Value> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(XrefError::NotFound(path.display().to_string()));
        }
        debug!(path = %path.display(), %format, "Importing cache file");

        match format.delimiter() {
            None => {
                let reader = BufReader::new(File::open(path)?);
                Ok(serde_json::from_reader(reader)?)
            },
            Some(delimiter) => {
                let mut reader = csv::ReaderBuilder::new()
                    .delimiter(delimiter)
                    .flexible(true)
                    .from_path(path)?;
                let headers = reader.headers()?.clone();
                let mut rows = Vec::new();
                for record in reader.records() {
                    let record = record?;
                    let row: Map<String, Value> = headers
                        .iter()
                        .zip(record.iter())
                        .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
                        .collect();
                    rows.push(Value::Object(row));
                }
                Ok(Value::Array(rows))
            },
        }
    }

    /// Write a cache file, creating parent directories as needed.
    ///
    /// CSV and TSV output requires `data` to serialize as an array of flat
    /// objects; the header is taken from the keys of the first row.
    pub fn do_export<T: Serialize + ?Sized>(
        &self,
        path: impl AsRef<Path>,
        data: &T,
        format: DataFormat,
    ) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.mkdir(parent)?;
        }
        debug!(path = %path.display(), %format, "Exporting cache file");

        match format.delimiter() {
            None => {
                let mut writer = BufWriter::new(File::create(path)?);
                if self.pretty {
                    serde_json::to_writer_pretty(&mut writer, data)?;
                } else {
                    serde_json::to_writer(&mut writer, data)?;
                }
                writer.flush()?;
            },
            Some(delimiter) => {
                let rows = match serde_json::to_value(data)? {
                    Value::Array(rows) => rows,
                    _ => return Err(XrefError::unsupported("export of non-list data", format)),
                };
                let mut writer = csv::WriterBuilder::new()
                    .delimiter(delimiter)
                    .from_path(path)?;
                let header: Vec<String> = match rows.first() {
                    Some(Value::Object(first)) => first.keys().cloned().collect(),
                    Some(_) => {
                        return Err(XrefError::unsupported("export of non-object rows", format))
                    },
                    None => Vec::new(),
                };
                if !header.is_empty() {
                    writer.write_record(&header)?;
                }
                for row in &rows {
                    let fields: Vec<String> =
                        header.iter().map(|key| cell_text(row.get(key))).collect();
                    writer.write_record(&fields)?;
                }
                writer.flush()?;
            },
        }
        Ok(())
    }

    pub fn import_json<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> Result<T> {
        let value = self.do_import(path, DataFormat::Json)?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn export_json<T: Serialize + ?Sized>(&self, path: impl AsRef<Path>, data: &T) -> Result<()> {
        self.do_export(path, data, DataFormat::Json)
    }
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_json_export_then_typed_import() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("taxa.json");
        let store = DataStore::new();

        let mut taxa = BTreeMap::new();
        taxa.insert("P69905".to_string(), 9606_i64);
        store.export_json(&path, &taxa).unwrap();

        assert!(store.exists(&path));
        let restored: BTreeMap<String, i64> = store.import_json(&path).unwrap();
        assert_eq!(restored, taxa);
    }

    #[test]
    fn test_tsv_import_keys_rows_by_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pfam.tsv");
        std::fs::write(&path, "accession\tpfam\nP69905\tPF00042\nP68871\tPF00042\n").unwrap();

        let rows = DataStore::new().do_import(&path, DataFormat::Tsv).unwrap();
        assert_eq!(
            rows,
            json!([
                {"accession": "P69905", "pfam": "PF00042"},
                {"accession": "P68871", "pfam": "PF00042"}
            ])
        );
    }

    #[test]
    fn test_csv_export_writes_header_from_first_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rows.csv");
        let data = json!([{"id": "P1", "tax": 9606}, {"id": "P2", "tax": null}]);

        DataStore::new().do_export(&path, &data, DataFormat::Csv).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "id,tax\nP1,9606\nP2,\n");
    }

    #[test]
    fn test_csv_export_rejects_scalar() {
        let dir = TempDir::new().unwrap();
        let err = DataStore::new()
            .do_export(dir.path().join("x.csv"), &json!("text"), DataFormat::Csv)
            .unwrap_err();
        assert!(matches!(err, XrefError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_import_missing_file() {
        let err = DataStore::new()
            .do_import("/nonexistent/cache.json", DataFormat::Json)
            .unwrap_err();
        assert!(matches!(err, XrefError::NotFound(_)));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("TSV".parse::<DataFormat>().unwrap(), DataFormat::Tsv);
        assert!("xml".parse::<DataFormat>().is_err());
    }

    #[test]
    fn test_stamped_round_trips_through_json() {
        let stamped = Stamped::now(vec!["A".to_string()]);
        let text = serde_json::to_string(&stamped).unwrap();
        let back: Stamped<Vec<String>> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, stamped);
    }
}
