//! CSV-backed identifier and feature provider.
//!
//! Rows hold `ids_num` identifier columns followed by zero or more
//! unsigned 64-bit feature columns. Reads are batched; the provider keeps
//! a cursor across calls.

use crate::Error;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::path::Path;

/// A batched CSV reader plus a static writer for result files.
pub struct CsvDataProvider {
    records: Vec<StringRecord>,
    columns_num: usize,
    items_columns_num: usize,
    cursor: usize,
}

impl CsvDataProvider {
    /// Open `file_path`, counting rows and columns up front.
    pub fn new<P: AsRef<Path>>(
        file_path: P,
        has_header: bool,
        items_columns_num: usize,
    ) -> Result<Self, Error> {
        let path = file_path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidArgument("file path is empty".to_string()));
        }
        let mut reader = ReaderBuilder::new()
            .has_headers(has_header)
            .flexible(true)
            .from_path(path)?;
        let records = reader
            .records()
            .collect::<Result<Vec<StringRecord>, csv::Error>>()?;
        let columns_num = records.first().map(StringRecord::len).unwrap_or(0);
        Ok(CsvDataProvider {
            records,
            columns_num,
            items_columns_num,
            cursor: 0,
        })
    }

    /// Total number of data rows.
    pub fn rows_num(&self) -> usize {
        self.records.len()
    }

    /// Number of columns in a row.
    pub fn columns_num(&self) -> usize {
        self.columns_num
    }

    /// Rewind the cursor to the first data row.
    pub fn seek_begin(&mut self) {
        self.cursor = 0;
    }

    fn take_batch(&mut self, batch_size: usize) -> &[StringRecord] {
        let start = self.cursor;
        let end = (start + batch_size).min(self.records.len());
        self.cursor = end;
        &self.records[start..end]
    }

    /// Read up to `batch_size` rows as whole-line identifiers.
    pub fn get_next_batch(&mut self, batch_size: usize, items: &mut Vec<String>) {
        for record in self.take_batch(batch_size) {
            let mut fields = record.iter();
            let mut line = fields.next().unwrap_or("").to_string();
            for field in fields {
                line.push(',');
                line.push_str(field);
            }
            items.push(line);
        }
    }

    /// Read up to `batch_size` rows into one container per identifier
    /// column.
    pub fn get_next_batch_2d(&mut self, batch_size: usize, items: &mut Vec<Vec<String>>) {
        items.resize(self.items_columns_num, Vec::new());
        let columns = self.items_columns_num;
        for record in self.take_batch(batch_size) {
            for idx in 0..columns {
                items[idx].push(record.get(idx).unwrap_or("").to_string());
            }
        }
    }

    /// Read up to `batch_size` rows as a single identifier column plus
    /// one 64-bit feature.
    pub fn get_next_batch_with_features(
        &mut self,
        batch_size: usize,
        items: &mut Vec<String>,
        features: &mut Vec<u64>,
    ) -> Result<(), Error> {
        for record in self.take_batch(batch_size) {
            items.push(record.get(0).unwrap_or("").to_string());
            let raw = record.get(1).unwrap_or("");
            let value = raw.parse::<u64>().map_err(|e| {
                Error::InvalidArgument(format!("feature column {:?} is not a u64: {}", raw, e))
            })?;
            features.push(value);
        }
        Ok(())
    }

    /// Read up to `batch_size` rows into identifier columns and 64-bit
    /// feature columns.
    pub fn get_next_batch_with_features_2d(
        &mut self,
        batch_size: usize,
        items: &mut Vec<Vec<String>>,
        features: &mut Vec<Vec<u64>>,
    ) -> Result<(), Error> {
        let item_columns = self.items_columns_num;
        let feature_columns = self.columns_num.saturating_sub(item_columns);
        items.resize(item_columns, Vec::new());
        features.resize(feature_columns, Vec::new());
        for record in self.take_batch(batch_size) {
            for idx in 0..item_columns {
                items[idx].push(record.get(idx).unwrap_or("").to_string());
            }
            for idx in 0..feature_columns {
                let raw = record.get(item_columns + idx).unwrap_or("");
                let value = raw.parse::<u64>().map_err(|e| {
                    Error::InvalidArgument(format!("feature column {:?} is not a u64: {}", raw, e))
                })?;
                features[idx].push(value);
            }
        }
        Ok(())
    }

    /// Write identifier columns plus feature columns to `file_path`,
    /// with an optional header row.
    pub fn write_data_to_file<P: AsRef<Path>>(
        items: &[Vec<String>],
        features: &[Vec<u64>],
        file_path: P,
        has_header: bool,
        header: &[String],
    ) -> Result<(), Error> {
        if items.is_empty() {
            return Err(Error::InvalidArgument("items can not be empty".to_string()));
        }
        let mut writer = WriterBuilder::new().from_path(file_path.as_ref())?;
        if has_header {
            writer.write_record(header)?;
        }
        for row in 0..items[0].len() {
            let mut record = StringRecord::new();
            for column in items.iter() {
                record.push_field(&column[row]);
            }
            for column in features.iter() {
                record.push_field(&column[row].to_string());
            }
            writer.write_record(&record)?;
        }
        writer.flush().map_err(Error::IoError)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("setops-csv-{}-{}", std::process::id(), name));
        path
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let path = temp_path("roundtrip.csv");
        let items = vec![vec!["c".to_string(), "e".to_string(), "g".to_string()]];
        let features = vec![vec![1u64, 2, 3], vec![4u64, 5, 6]];
        CsvDataProvider::write_data_to_file(&items, &features, &path, false, &[]).unwrap();

        let mut provider = CsvDataProvider::new(&path, false, 1).unwrap();
        assert_eq!(provider.rows_num(), 3);
        assert_eq!(provider.columns_num(), 3);

        let mut keys = Vec::new();
        let mut payloads = Vec::new();
        provider
            .get_next_batch_with_features_2d(10, &mut keys, &mut payloads)
            .unwrap();
        assert_eq!(keys, vec![vec!["c", "e", "g"]]);
        assert_eq!(payloads, features);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_batched_cursor() {
        let path = temp_path("cursor.csv");
        let items = vec![(0..5).map(|i| format!("k{}", i)).collect::<Vec<String>>()];
        CsvDataProvider::write_data_to_file(&items, &[], &path, false, &[]).unwrap();

        let mut provider = CsvDataProvider::new(&path, false, 1).unwrap();
        let mut first = Vec::new();
        provider.get_next_batch(2, &mut first);
        assert_eq!(first, vec!["k0", "k1"]);
        let mut rest = Vec::new();
        provider.get_next_batch(10, &mut rest);
        assert_eq!(rest, vec!["k2", "k3", "k4"]);
        provider.seek_begin();
        let mut again = Vec::new();
        provider.get_next_batch(10, &mut again);
        assert_eq!(again.len(), 5);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_header_row_skipped() {
        let path = temp_path("header.csv");
        let items = vec![vec!["a".to_string(), "b".to_string()]];
        CsvDataProvider::write_data_to_file(
            &items,
            &[],
            &path,
            true,
            &["id".to_string()],
        )
        .unwrap();
        let mut provider = CsvDataProvider::new(&path, true, 1).unwrap();
        assert_eq!(provider.rows_num(), 2);
        let mut keys = Vec::new();
        provider.get_next_batch(10, &mut keys);
        assert_eq!(keys, vec!["a", "b"]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_empty_path_rejected() {
        match CsvDataProvider::new("", false, 1) {
            Err(Error::InvalidArgument(_)) => (),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}
